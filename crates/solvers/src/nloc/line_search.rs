use tracing::debug;
use trajopt_core::{Cost, Dynamics, Norm, difference_norm};

use super::{Algorithm, Candidate, Core, WorkerId};

/// Progress of a backtracking line search.
#[derive(Debug, Clone, Copy, PartialEq)]
enum SearchState {
    Searching { alpha: f64, iteration: usize },
    Accepted { alpha: f64 },
    Failed,
}

/// Backtracks along the stored LQ step until the merit strictly decreases.
///
/// Each attempt generates a candidate into fresh buffers. An accepted
/// candidate is moved into the live state; rejected ones are dropped, so the
/// live state is untouched unless a step is accepted.
///
/// Returns the accepted step size, or `0.0` once the iteration budget is
/// exhausted.
pub(super) fn line_search<D, C, const N: usize, const M: usize>(
    core: &mut Core<D, C, N, M>,
    worker: WorkerId,
) -> f64
where
    D: Dynamics<N, M>,
    C: Cost<N, M>,
{
    let settings = *core.problem.settings();
    let config = settings.line_search();

    let mut search = SearchState::Searching {
        alpha: config.alpha_0(),
        iteration: 0,
    };

    loop {
        search = match search {
            SearchState::Searching { iteration, .. } if iteration >= config.max_iterations() => {
                SearchState::Failed
            }

            SearchState::Searching { alpha, iteration } => {
                let live = &core.state.trajectory;
                let mut candidate = Candidate::seeded(live);

                let costs = match settings.algorithm() {
                    Algorithm::MultipleShooting => core
                        .problem
                        .execute_line_search_multiple_shooting(
                            worker,
                            alpha,
                            live,
                            &core.step,
                            &mut candidate,
                        ),
                    Algorithm::SingleShooting => core.problem.execute_line_search_single_shooting(
                        worker,
                        alpha,
                        live,
                        &core.step,
                        &mut candidate,
                    ),
                };
                let merit = costs.merit(settings.merit_rho());
                let lowest = core.state.lowest_cost;

                if config.debug_print() {
                    debug!(
                        iteration,
                        alpha,
                        merit,
                        lowest,
                        intermediate = costs.intermediate,
                        terminal = costs.terminal,
                        defect_norm = costs.defect_norm,
                        "line search candidate"
                    );
                }

                if !merit.is_finite() || merit >= lowest {
                    SearchState::Searching {
                        alpha: alpha * config.contraction(),
                        iteration: iteration + 1,
                    }
                } else {
                    let norms = if settings.print_summary() {
                        (
                            difference_norm(Norm::L2, candidate.trajectory.x(), live.x()),
                            difference_norm(Norm::L2, candidate.trajectory.u(), live.u()),
                        )
                    } else {
                        (0.0, 0.0)
                    };

                    core.state.commit(candidate, costs, merit, norms);
                    SearchState::Accepted { alpha }
                }
            }

            SearchState::Accepted { alpha } => return alpha,

            SearchState::Failed => {
                if config.debug_print() {
                    debug!(
                        iterations = config.max_iterations(),
                        "line search found no improving step"
                    );
                }
                return 0.0;
            }
        };
    }
}
