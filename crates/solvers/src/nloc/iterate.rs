use tracing::info;
use trajopt_core::{Cost, Dynamics, Observer};

use crate::lq;

use super::{Action, Algorithm, Backend, Core, Error, Event, Solution, Status};

/// Outer solver loop.
///
/// One iteration linearizes and quadratizes the whole horizon, rolls out the
/// shots for multiple shooting, solves the LQ subproblem, and runs the line
/// search.
pub(super) fn iterate<B, Obs, const N: usize, const M: usize>(
    backend: &mut B,
    lq_config: &lq::Config,
    mut observer: Obs,
) -> Result<Solution<N, M>, Error>
where
    B: Backend<N, M>,
    Obs: for<'a> Observer<Event<'a, N, M>, Action>,
{
    let settings = *backend.core().settings();
    let last = backend.core().horizon() - 1;

    for iter in 1..=settings.max_iterations() {
        let previous_merit = backend.core().state().lowest_cost();

        backend.linearize_trajectory(0, last);
        backend.quadratize_trajectory(0, last);
        if settings.algorithm() == Algorithm::MultipleShooting {
            backend.rollout_shots(0, last);
        }
        backend.core_mut().solve_lq(lq_config)?;

        let alpha = backend.line_search();
        if alpha <= 0.0 {
            return Ok(solution(backend.core(), Status::NoDescent, iter));
        }

        let state = backend.core().state();
        let merit = state.lowest_cost();

        if settings.print_summary() {
            info!(
                iter,
                alpha,
                merit,
                intermediate_cost = state.intermediate_cost(),
                final_cost = state.final_cost(),
                defect_norm = state.defect_norm(),
                lx_norm = state.lx_norm(),
                lu_norm = state.lu_norm(),
                "iteration summary"
            );
        }

        let event = Event {
            iter,
            alpha,
            merit,
            intermediate_cost: state.intermediate_cost(),
            final_cost: state.final_cost(),
            defect_norm: state.defect_norm(),
            lx_norm: state.lx_norm(),
            lu_norm: state.lu_norm(),
            trajectory: state.trajectory(),
        };
        match observer.observe(&event) {
            Some(Action::StopEarly) => {
                return Ok(solution(backend.core(), Status::StoppedByObserver, iter));
            }
            None => {}
        }

        let improvement = (previous_merit - merit) / previous_merit.abs().max(f64::MIN_POSITIVE);
        if improvement <= settings.min_cost_improvement()
            && state.defect_norm() <= settings.max_defect_sum()
        {
            return Ok(solution(backend.core(), Status::Converged, iter));
        }
    }

    Ok(solution(
        backend.core(),
        Status::MaxIters,
        settings.max_iterations(),
    ))
}

fn solution<D, C, const N: usize, const M: usize>(
    core: &Core<D, C, N, M>,
    status: Status,
    iters: usize,
) -> Solution<N, M>
where
    D: Dynamics<N, M>,
    C: Cost<N, M>,
{
    let state = core.state();
    Solution {
        status,
        trajectory: state.trajectory().clone(),
        gains: core.step().gains.clone(),
        merit: state.lowest_cost(),
        defect_norm: state.defect_norm(),
        iters,
    }
}
