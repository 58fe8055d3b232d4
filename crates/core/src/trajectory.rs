use thiserror::Error;

use crate::types::{Control, ControlArray, State, StateArray};

/// Errors that can occur when constructing a trajectory.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TrajectoryError {
    #[error("trajectory horizon must contain at least one stage")]
    EmptyHorizon,

    #[error("expected {expected} states for {controls} controls, got {states}")]
    LengthMismatch {
        states: usize,
        controls: usize,
        expected: usize,
    },
}

/// A discrete-time state/control trajectory over a horizon of `K` stages.
///
/// Invariants:
/// - `K >= 1`.
/// - There are always `K + 1` states and `K` controls.
///
/// The fields are private and mutable access is only handed out as slices,
/// so the lengths cannot change after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory<const N: usize, const M: usize> {
    x: StateArray<N>,
    u: ControlArray<M>,
}

impl<const N: usize, const M: usize> Trajectory<N, M> {
    /// Creates a trajectory from states and controls.
    ///
    /// # Errors
    ///
    /// Returns an error if `u` is empty or if `x.len() != u.len() + 1`.
    pub fn new(x: StateArray<N>, u: ControlArray<M>) -> Result<Self, TrajectoryError> {
        if u.is_empty() {
            return Err(TrajectoryError::EmptyHorizon);
        }
        if x.len() != u.len() + 1 {
            return Err(TrajectoryError::LengthMismatch {
                states: x.len(),
                controls: u.len(),
                expected: u.len() + 1,
            });
        }
        Ok(Self { x, u })
    }

    /// Creates a trajectory that holds `x0` and `u0` at every stage.
    ///
    /// # Errors
    ///
    /// Returns an error if `horizon` is zero.
    pub fn constant(x0: State<N>, u0: Control<M>, horizon: usize) -> Result<Self, TrajectoryError> {
        Self::new(vec![x0; horizon + 1], vec![u0; horizon])
    }

    /// Returns a buffer with this horizon and initial state, zeros elsewhere.
    #[must_use]
    pub fn seeded_like(&self) -> Self {
        let mut x = vec![State::<N>::zeros(); self.x.len()];
        x[0] = self.x[0];
        Self {
            x,
            u: vec![Control::<M>::zeros(); self.u.len()],
        }
    }

    /// Returns the number of stages `K`.
    #[must_use]
    pub fn horizon(&self) -> usize {
        self.u.len()
    }

    /// Returns the `K + 1` states.
    #[must_use]
    pub fn x(&self) -> &[State<N>] {
        &self.x
    }

    /// Returns the `K` controls.
    #[must_use]
    pub fn u(&self) -> &[Control<M>] {
        &self.u
    }

    /// Returns mutable views of states and controls.
    pub fn parts_mut(&mut self) -> (&mut [State<N>], &mut [Control<M>]) {
        (&mut self.x, &mut self.u)
    }

    /// Returns the fixed initial state.
    #[must_use]
    pub fn initial_state(&self) -> &State<N> {
        &self.x[0]
    }

    /// Returns the terminal state at stage `K`.
    #[must_use]
    pub fn terminal_state(&self) -> &State<N> {
        &self.x[self.u.len()]
    }
}

/// Dense samples recorded while integrating each stage.
///
/// `x[k]` and `u[k]` hold the states and (held) controls visited inside stage
/// `k`. There are `K + 1` lists; the last one stays empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Substeps<const N: usize, const M: usize> {
    pub x: Vec<StateArray<N>>,
    pub u: Vec<ControlArray<M>>,
}

impl<const N: usize, const M: usize> Substeps<N, M> {
    /// Creates empty recordings for a horizon of `horizon` stages.
    #[must_use]
    pub fn new(horizon: usize) -> Self {
        Self {
            x: vec![Vec::new(); horizon + 1],
            u: vec![Vec::new(); horizon + 1],
        }
    }

    /// Clears the samples of stage `k`.
    pub fn clear_stage(&mut self, k: usize) {
        self.x[k].clear();
        self.u[k].clear();
    }

    /// Appends one sample to stage `k`.
    pub fn record(&mut self, k: usize, x: State<N>, u: Control<M>) {
        self.x[k].push(x);
        self.u[k].push(u);
    }
}
