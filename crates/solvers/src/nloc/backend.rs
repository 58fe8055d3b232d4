use trajopt_core::{Cost, Dynamics, Norm, State, Trajectory, sequence_norm};

use crate::lq::{self, LqProblem, LqSolution, riccati};

use super::{Algorithm, BackendState, Problem, Settings, line_search::line_search};

/// Storage shared by every backend: the primitives, the live buffers, and the
/// LQ subproblem built around the live trajectory.
#[derive(Debug, Clone)]
pub struct Core<D, C, const N: usize, const M: usize> {
    pub(super) problem: Problem<D, C>,
    pub(super) state: BackendState<N, M>,
    pub(super) lq: LqProblem<N, M>,
    pub(super) step: LqSolution<N, M>,
}

impl<D, C, const N: usize, const M: usize> Core<D, C, N, M>
where
    D: Dynamics<N, M>,
    C: Cost<N, M>,
{
    fn new(problem: Problem<D, C>, initial: Trajectory<N, M>) -> Self {
        let horizon = initial.horizon();
        Self {
            problem,
            state: BackendState::new(initial),
            lq: LqProblem::new(horizon),
            step: LqSolution::zeros(horizon),
        }
    }

    #[must_use]
    pub fn problem(&self) -> &Problem<D, C> {
        &self.problem
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        self.problem.settings()
    }

    #[must_use]
    pub fn state(&self) -> &BackendState<N, M> {
        &self.state
    }

    /// Returns the LQ subproblem assembled by the stages.
    #[must_use]
    pub fn lq_problem(&self) -> &LqProblem<N, M> {
        &self.lq
    }

    /// Returns the most recent LQ step.
    #[must_use]
    pub fn step(&self) -> &LqSolution<N, M> {
        &self.step
    }

    /// Returns the number of stages `K`.
    #[must_use]
    pub fn horizon(&self) -> usize {
        self.state.trajectory.horizon()
    }

    /// Solves the LQ subproblem and stores the step for the line search.
    ///
    /// The defect of the shot starting at `s` becomes the gap of the
    /// transition that closes the shot.
    ///
    /// # Errors
    ///
    /// Returns an error if the Riccati recursion fails.
    pub fn solve_lq(&mut self, config: &lq::Config) -> Result<(), lq::Error> {
        let horizon = self.horizon();
        self.lq.gaps.fill(State::zeros());

        if self.settings().algorithm() == Algorithm::MultipleShooting {
            for s in self.problem.shot_starts(horizon) {
                let closing = self.problem.shot_end(s, horizon) - 1;
                self.lq.gaps[closing] = self.state.defects[s];
            }
        }

        self.step = riccati::solve(&self.lq, config)?;
        Ok(())
    }

    /// Evaluates the live trajectory and makes its merit the one to beat.
    pub fn evaluate_nominal(&mut self) {
        let worker = self.problem.main_worker();
        let (intermediate, terminal) =
            self.problem.trajectory_costs(worker, &self.state.trajectory);
        let defect_norm = match self.settings().algorithm() {
            Algorithm::MultipleShooting => sequence_norm(Norm::L1, &self.state.defects),
            Algorithm::SingleShooting => 0.0,
        };

        let rho = self.settings().merit_rho();

        let state = &mut self.state;
        state.intermediate_cost = intermediate;
        state.final_cost = terminal;
        state.defect_norm = defect_norm;
        state.lowest_cost = intermediate + terminal + rho * defect_norm;
    }
}

/// The stages of one solver iteration over a live trajectory.
///
/// Index ranges are inclusive. A sequential backend processes them in
/// ascending order; a parallel backend may split them across workers since
/// stages write disjoint, index-scoped storage.
pub trait Backend<const N: usize, const M: usize> {
    type Dynamics: Dynamics<N, M>;
    type Cost: Cost<N, M>;

    fn core(&self) -> &Core<Self::Dynamics, Self::Cost, N, M>;

    fn core_mut(&mut self) -> &mut Core<Self::Dynamics, Self::Cost, N, M>;

    /// Computes `A_k` and `B_k` for every `k` in `[first, last]`.
    fn linearize_trajectory(&mut self, first: usize, last: usize);

    /// Computes the running cost expansions for every `k` in `[first, last]`.
    ///
    /// When `last` is the final stage, the terminal cost-to-go is initialized
    /// first.
    fn quadratize_trajectory(&mut self, first: usize, last: usize);

    /// Integrates every shot starting in `[first, last]` and writes its
    /// terminal state and defect.
    fn rollout_shots(&mut self, first: usize, last: usize);

    /// Runs the backtracking line search along the stored LQ step.
    ///
    /// Returns the accepted step size, or `0.0` if no step improved the merit.
    fn line_search(&mut self) -> f64;

    /// Replaces the live trajectory with an initial guess, rolls it out and
    /// evaluates its merit.
    ///
    /// Multiple shooting integrates each shot from the guess's own state at
    /// its start; single shooting integrates the whole horizon from `x_0`.
    fn initialize(&mut self, trajectory: Trajectory<N, M>) {
        let horizon = trajectory.horizon();
        let core = self.core_mut();
        core.state = BackendState::new(trajectory);
        core.lq = LqProblem::new(horizon);
        core.step = LqSolution::zeros(horizon);

        self.rollout_shots(0, horizon - 1);

        let core = self.core_mut();
        core.evaluate_nominal();
        core.state.previous = core.state.trajectory.clone();
    }
}

/// Backend that runs every stage on the calling thread.
#[derive(Debug, Clone)]
pub struct SingleThreaded<D, C, const N: usize, const M: usize> {
    pub(super) core: Core<D, C, N, M>,
}

impl<D, C, const N: usize, const M: usize> SingleThreaded<D, C, N, M>
where
    D: Dynamics<N, M> + Clone,
    C: Cost<N, M> + Clone,
{
    /// Creates a backend and initializes it with `initial`.
    #[must_use]
    pub fn new(dynamics: D, cost: C, settings: Settings, initial: Trajectory<N, M>) -> Self {
        let problem = Problem::new(dynamics, cost, settings);
        let mut backend = Self {
            core: Core::new(problem, initial.clone()),
        };
        backend.initialize(initial);
        backend
    }
}

impl<D, C, const N: usize, const M: usize> Backend<N, M> for SingleThreaded<D, C, N, M>
where
    D: Dynamics<N, M>,
    C: Cost<N, M>,
{
    type Dynamics = D;
    type Cost = C;

    fn core(&self) -> &Core<D, C, N, M> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut Core<D, C, N, M> {
        &mut self.core
    }

    fn linearize_trajectory(&mut self, first: usize, last: usize) {
        let Core {
            problem, state, lq, ..
        } = &mut self.core;
        let worker = problem.main_worker();

        for k in first..=last {
            problem.compute_linearized_dynamics(worker, k, &state.trajectory, lq);
        }
    }

    fn quadratize_trajectory(&mut self, first: usize, last: usize) {
        let Core {
            problem, state, lq, ..
        } = &mut self.core;
        let worker = problem.main_worker();

        if last + 1 == state.trajectory.horizon() {
            problem.initialize_cost_to_go(&state.trajectory, lq);
        }

        for k in first..=last {
            problem.compute_quadratic_costs(worker, k, &state.trajectory, lq);
        }
    }

    fn rollout_shots(&mut self, first: usize, last: usize) {
        let Core { problem, state, .. } = &mut self.core;
        let worker = problem.main_worker();
        let shot_length = problem.shot_length(state.trajectory.horizon());

        for k in (first..=last).step_by(shot_length) {
            let (x, u) = state.trajectory.parts_mut();
            problem.rollout_single_shot(worker, k, u, x, &mut state.x_shot, &mut state.substeps);
            problem.compute_single_defect(k, x, &state.x_shot, &mut state.defects);
        }
    }

    fn line_search(&mut self) -> f64 {
        let worker = self.core.problem.main_worker();
        line_search(&mut self.core, worker)
    }
}
