use std::mem;

use trajopt_core::{State, StateArray, Substeps, Trajectory};

use super::{Candidate, CandidateCosts};

/// Live buffers of a backend.
///
/// Stages overwrite range-scoped parts of these buffers in place. The line
/// search replaces them wholesale through [`BackendState::commit`] and never
/// touches them otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendState<const N: usize, const M: usize> {
    pub(super) trajectory: Trajectory<N, M>,
    pub(super) previous: Trajectory<N, M>,
    pub(super) x_shot: StateArray<N>,
    pub(super) defects: StateArray<N>,
    pub(super) substeps: Substeps<N, M>,
    pub(super) lowest_cost: f64,
    pub(super) intermediate_cost: f64,
    pub(super) final_cost: f64,
    pub(super) defect_norm: f64,
    pub(super) lx_norm: f64,
    pub(super) lu_norm: f64,
}

impl<const N: usize, const M: usize> BackendState<N, M> {
    /// Creates live buffers around an initial guess.
    ///
    /// Costs start out infinite until the guess has been evaluated.
    pub(super) fn new(trajectory: Trajectory<N, M>) -> Self {
        let horizon = trajectory.horizon();
        Self {
            previous: trajectory.clone(),
            trajectory,
            x_shot: vec![State::zeros(); horizon + 1],
            defects: vec![State::zeros(); horizon + 1],
            substeps: Substeps::new(horizon),
            lowest_cost: f64::INFINITY,
            intermediate_cost: f64::INFINITY,
            final_cost: f64::INFINITY,
            defect_norm: 0.0,
            lx_norm: 0.0,
            lu_norm: 0.0,
        }
    }

    /// Adopts an accepted candidate.
    ///
    /// The candidate's buffers are moved in and the replaced live trajectory
    /// becomes the previous one.
    pub(super) fn commit(
        &mut self,
        candidate: Candidate<N, M>,
        costs: CandidateCosts,
        merit: f64,
        (lx_norm, lu_norm): (f64, f64),
    ) {
        let Candidate {
            trajectory,
            x_shot,
            defects,
            substeps,
        } = candidate;

        self.previous = mem::replace(&mut self.trajectory, trajectory);
        self.x_shot = x_shot;
        self.defects = defects;
        self.substeps = substeps;

        self.lowest_cost = merit;
        self.intermediate_cost = costs.intermediate;
        self.final_cost = costs.terminal;
        self.defect_norm = costs.defect_norm;
        self.lx_norm = lx_norm;
        self.lu_norm = lu_norm;
    }

    /// Returns the current nominal trajectory.
    #[must_use]
    pub fn trajectory(&self) -> &Trajectory<N, M> {
        &self.trajectory
    }

    /// Returns the previously accepted trajectory.
    #[must_use]
    pub fn previous(&self) -> &Trajectory<N, M> {
        &self.previous
    }

    /// Returns the shot terminal states, indexed by shot start.
    #[must_use]
    pub fn x_shot(&self) -> &[State<N>] {
        &self.x_shot
    }

    /// Returns the defects, indexed by shot start.
    #[must_use]
    pub fn defects(&self) -> &[State<N>] {
        &self.defects
    }

    #[must_use]
    pub fn substeps(&self) -> &Substeps<N, M> {
        &self.substeps
    }

    /// Returns the merit of the current trajectory, the value a candidate
    /// must beat to be accepted.
    #[must_use]
    pub fn lowest_cost(&self) -> f64 {
        self.lowest_cost
    }

    #[must_use]
    pub fn intermediate_cost(&self) -> f64 {
        self.intermediate_cost
    }

    #[must_use]
    pub fn final_cost(&self) -> f64 {
        self.final_cost
    }

    #[must_use]
    pub fn defect_norm(&self) -> f64 {
        self.defect_norm
    }

    /// Returns the L2 change of the states at the last accepted step.
    ///
    /// Only computed when summaries are enabled, zero otherwise.
    #[must_use]
    pub fn lx_norm(&self) -> f64 {
        self.lx_norm
    }

    /// Returns the L2 change of the controls at the last accepted step.
    ///
    /// Only computed when summaries are enabled, zero otherwise.
    #[must_use]
    pub fn lu_norm(&self) -> f64 {
        self.lu_norm
    }
}
