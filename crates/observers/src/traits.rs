//! Capability traits for cross-solver observers.
//!
//! These traits abstract over solver-specific event and action types, enabling
//! observers to work generically across different solvers.
//!
//! # Event traits
//!
//! - [`HasMerit`] — events that carry the merit of the current iterate
//! - [`HasStepSize`] — events that carry an accepted step size
//! - [`HasDefectNorm`] — events that carry a feasibility measure
//!
//! # Action traits
//!
//! - [`CanStopEarly`] — actions that can signal early termination
//!
//! # Example
//!
//! ```rust
//! use trajopt_core::Observer;
//! use trajopt_observers::traits::{CanStopEarly, HasDefectNorm};
//!
//! struct Feasible {
//!     tolerance: f64,
//! }
//!
//! impl<E: HasDefectNorm, A: CanStopEarly> Observer<E, A> for Feasible {
//!     fn observe(&mut self, event: &E) -> Option<A> {
//!         (event.defect_norm() < self.tolerance).then(A::stop_early)
//!     }
//! }
//! ```

use trajopt_solvers::nloc;

/// An event that carries the merit of the current iterate.
pub trait HasMerit {
    /// Returns the merit for this event.
    fn merit(&self) -> f64;

    /// Returns the iteration number of this event.
    fn iteration(&self) -> usize;
}

/// An event that carries an accepted step size.
pub trait HasStepSize {
    /// Returns the step size taken to reach the current iterate.
    fn step_size(&self) -> f64;
}

/// An event that carries a feasibility measure.
pub trait HasDefectNorm {
    /// Returns the norm of the continuity defects, zero when feasible.
    fn defect_norm(&self) -> f64;
}

/// An action type that can signal early termination.
pub trait CanStopEarly {
    /// Returns the action that stops the solver early.
    fn stop_early() -> Self;
}

// --- nloc::Event ---

impl<const N: usize, const M: usize> HasMerit for nloc::Event<'_, N, M> {
    fn merit(&self) -> f64 {
        self.merit
    }

    fn iteration(&self) -> usize {
        self.iter
    }
}

impl<const N: usize, const M: usize> HasStepSize for nloc::Event<'_, N, M> {
    fn step_size(&self) -> f64 {
        self.alpha
    }
}

impl<const N: usize, const M: usize> HasDefectNorm for nloc::Event<'_, N, M> {
    fn defect_norm(&self) -> f64 {
        self.defect_norm
    }
}

// --- nloc::Action ---

impl CanStopEarly for nloc::Action {
    fn stop_early() -> Self {
        Self::StopEarly
    }
}
