use trajopt_core::{
    Control, Cost, Dynamics, Norm, State, StateArray, Substeps, Trajectory, sequence_norm,
};

use crate::lq::{LqProblem, LqSolution};

use super::{Algorithm, Settings};

/// Identifies the worker slot whose model copies a primitive uses.
///
/// A problem owns `workers + 1` slots: one per helper of a parallel backend
/// and a last one for the calling thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerId(usize);

impl WorkerId {
    /// Returns the slot index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Dynamics and cost instances owned by one worker.
#[derive(Debug, Clone)]
struct Worker<D, C> {
    dynamics: D,
    cost: C,
}

/// Buffers filled by one line search candidate.
///
/// A candidate starts out as zeros apart from the fixed initial state, so the
/// horizon invariants hold while it is being written.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate<const N: usize, const M: usize> {
    pub trajectory: Trajectory<N, M>,

    /// Terminal state of the shot starting at each shot start index.
    pub x_shot: StateArray<N>,

    /// Continuity defect of the shot starting at each shot start index.
    pub defects: StateArray<N>,

    pub substeps: Substeps<N, M>,
}

impl<const N: usize, const M: usize> Candidate<N, M> {
    /// Creates empty candidate buffers for the horizon of `live`, seeded with
    /// its initial state.
    #[must_use]
    pub fn seeded(live: &Trajectory<N, M>) -> Self {
        let horizon = live.horizon();
        Self {
            trajectory: live.seeded_like(),
            x_shot: vec![State::zeros(); horizon + 1],
            defects: vec![State::zeros(); horizon + 1],
            substeps: Substeps::new(horizon),
        }
    }
}

/// Costs of a candidate trajectory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateCosts {
    pub intermediate: f64,
    pub terminal: f64,

    /// L1 norm of the defect sequence; exactly zero for single shooting.
    pub defect_norm: f64,
}

impl CandidateCosts {
    /// Returns `intermediate + terminal + rho · defect_norm`.
    #[must_use]
    pub fn merit(&self, rho: f64) -> f64 {
        self.intermediate + self.terminal + rho * self.defect_norm
    }
}

/// Per-stage computation primitives shared by every backend.
///
/// Each primitive touches a single stage (or a single shot) and writes only
/// storage indexed by it, so a backend is free to run them over index ranges
/// in any order or in parallel.
#[derive(Debug, Clone)]
pub struct Problem<D, C> {
    workers: Vec<Worker<D, C>>,
    settings: Settings,
}

impl<D: Clone, C: Clone> Problem<D, C> {
    /// Creates a problem with one model copy per worker slot.
    #[must_use]
    pub fn new(dynamics: D, cost: C, settings: Settings) -> Self {
        let workers = vec![Worker { dynamics, cost }; settings.workers() + 1];
        Self { workers, settings }
    }
}

impl<D, C> Problem<D, C> {
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Returns the slot used by the calling thread.
    #[must_use]
    pub fn main_worker(&self) -> WorkerId {
        WorkerId(self.settings.workers())
    }

    /// Returns the number of stages per shot for a horizon of `horizon`.
    ///
    /// Single shooting integrates the whole horizon as one shot.
    #[must_use]
    pub fn shot_length(&self, horizon: usize) -> usize {
        match self.settings.algorithm() {
            Algorithm::MultipleShooting => self.settings.shot_length(),
            Algorithm::SingleShooting => horizon.max(1),
        }
    }

    /// Returns the index one past the last stage of the shot starting at `k`.
    #[must_use]
    pub fn shot_end(&self, k: usize, horizon: usize) -> usize {
        (k + self.shot_length(horizon)).min(horizon)
    }

    /// Returns the shot start indices in `[0, horizon)`.
    pub fn shot_starts(&self, horizon: usize) -> impl Iterator<Item = usize> {
        (0..horizon).step_by(self.shot_length(horizon))
    }

    fn worker(&self, id: WorkerId) -> &Worker<D, C> {
        &self.workers[id.0]
    }

    /// Writes `A_k` and `B_k` of the stage map at the nominal `(x_k, u_k)`.
    pub fn compute_linearized_dynamics<const N: usize, const M: usize>(
        &self,
        worker: WorkerId,
        k: usize,
        nominal: &Trajectory<N, M>,
        lq: &mut LqProblem<N, M>,
    ) where
        D: Dynamics<N, M>,
    {
        let (a, b) = self.settings.discretization().sensitivities(
            &self.worker(worker).dynamics,
            k,
            &nominal.x()[k],
            &nominal.u()[k],
        );
        lq.a[k] = a;
        lq.b[k] = b;
    }

    /// Writes the quadratic expansion of the running cost of stage `k`.
    pub fn compute_quadratic_costs<const N: usize, const M: usize>(
        &self,
        worker: WorkerId,
        k: usize,
        nominal: &Trajectory<N, M>,
        lq: &mut LqProblem<N, M>,
    ) where
        C: Cost<N, M>,
    {
        lq.stage[k] = self.worker(worker).cost.quadratize_intermediate(
            k,
            &nominal.x()[k],
            &nominal.u()[k],
        );
    }

    /// Writes the terminal cost-to-go, the expansion of the terminal cost at
    /// the nominal final state.
    pub fn initialize_cost_to_go<const N: usize, const M: usize>(
        &self,
        nominal: &Trajectory<N, M>,
        lq: &mut LqProblem<N, M>,
    ) where
        C: Cost<N, M>,
    {
        lq.terminal = self
            .worker(self.main_worker())
            .cost
            .quadratize_terminal(nominal.terminal_state());
    }

    /// Integrates the shot starting at `k` from the stored state `x[k]`.
    ///
    /// States inside the shot are overwritten and the shot terminal state is
    /// written to `x_shot[k]`. The final shot also writes `x[K]`.
    pub fn rollout_single_shot<const N: usize, const M: usize>(
        &self,
        worker: WorkerId,
        k: usize,
        u: &[Control<M>],
        x: &mut [State<N>],
        x_shot: &mut [State<N>],
        substeps: &mut Substeps<N, M>,
    ) where
        D: Dynamics<N, M>,
    {
        let horizon = u.len();
        let end = self.shot_end(k, horizon);
        let dynamics = &self.worker(worker).dynamics;
        let disc = self.settings.discretization();

        let mut state = x[k];
        for j in k..end {
            x[j] = state;
            state = disc.propagate(dynamics, j, &state, &u[j], Some(&mut *substeps));
        }

        x_shot[k] = state;
        if end == horizon {
            x[horizon] = state;
        }
    }

    /// Writes the defect of the shot starting at `k`: its terminal state minus
    /// the stored state where the next shot starts.
    pub fn compute_single_defect<const N: usize>(
        &self,
        k: usize,
        x: &[State<N>],
        x_shot: &[State<N>],
        defects: &mut [State<N>],
    ) {
        let horizon = x.len() - 1;
        defects[k] = x_shot[k] - x[self.shot_end(k, horizon)];
    }

    /// Generates a multiple shooting candidate for step size `alpha`.
    ///
    /// Every shot starts at `x̄_s + α·lx_s` and is integrated under the policy
    /// `u_k = ū_k + α·lu_k + L_k (x_k - x̄_k - α·lx_k)`. The defects left
    /// between shots enter the returned defect norm.
    pub fn execute_line_search_multiple_shooting<const N: usize, const M: usize>(
        &self,
        worker: WorkerId,
        alpha: f64,
        nominal: &Trajectory<N, M>,
        step: &LqSolution<N, M>,
        candidate: &mut Candidate<N, M>,
    ) -> CandidateCosts
    where
        D: Dynamics<N, M>,
        C: Cost<N, M>,
    {
        let horizon = nominal.horizon();
        let (intermediate, terminal) = self.simulate(worker, alpha, nominal, step, candidate);

        for k in self.shot_starts(horizon) {
            self.compute_single_defect(
                k,
                candidate.trajectory.x(),
                &candidate.x_shot,
                &mut candidate.defects,
            );
        }

        CandidateCosts {
            intermediate,
            terminal,
            defect_norm: sequence_norm(Norm::L1, &candidate.defects),
        }
    }

    /// Generates a single shooting candidate for step size `alpha`.
    ///
    /// The whole horizon is integrated from the initial state under the
    /// feedback policy, so the candidate is feasible and has no defects.
    pub fn execute_line_search_single_shooting<const N: usize, const M: usize>(
        &self,
        worker: WorkerId,
        alpha: f64,
        nominal: &Trajectory<N, M>,
        step: &LqSolution<N, M>,
        candidate: &mut Candidate<N, M>,
    ) -> CandidateCosts
    where
        D: Dynamics<N, M>,
        C: Cost<N, M>,
    {
        let (intermediate, terminal) = self.simulate(worker, alpha, nominal, step, candidate);

        CandidateCosts {
            intermediate,
            terminal,
            defect_norm: 0.0,
        }
    }

    /// Returns the running and terminal cost of a trajectory.
    pub fn trajectory_costs<const N: usize, const M: usize>(
        &self,
        worker: WorkerId,
        trajectory: &Trajectory<N, M>,
    ) -> (f64, f64)
    where
        C: Cost<N, M>,
    {
        let cost = &self.worker(worker).cost;
        let intermediate = trajectory
            .x()
            .iter()
            .zip(trajectory.u())
            .enumerate()
            .map(|(k, (x, u))| cost.intermediate(k, x, u))
            .sum();
        (intermediate, cost.terminal(trajectory.terminal_state()))
    }

    /// Forward simulation shared by both candidate generators.
    fn simulate<const N: usize, const M: usize>(
        &self,
        worker: WorkerId,
        alpha: f64,
        nominal: &Trajectory<N, M>,
        step: &LqSolution<N, M>,
        candidate: &mut Candidate<N, M>,
    ) -> (f64, f64)
    where
        D: Dynamics<N, M>,
        C: Cost<N, M>,
    {
        let horizon = nominal.horizon();
        let dynamics = &self.worker(worker).dynamics;
        let disc = self.settings.discretization();
        let (x_nom, u_nom) = (nominal.x(), nominal.u());
        let (x, u) = candidate.trajectory.parts_mut();

        for s in self.shot_starts(horizon) {
            if s > 0 {
                x[s] = x_nom[s] + step.lx[s] * alpha;
            }

            let end = self.shot_end(s, horizon);
            let mut state = x[s];
            for k in s..end {
                x[k] = state;
                let dx = state - x_nom[k] - step.lx[k] * alpha;
                u[k] = u_nom[k] + step.lu[k] * alpha + step.gains[k] * dx;
                state = disc.propagate(dynamics, k, &state, &u[k], Some(&mut candidate.substeps));
            }

            candidate.x_shot[s] = state;
            if end == horizon {
                x[horizon] = state;
            }
        }

        self.trajectory_costs(worker, &candidate.trajectory)
    }
}
