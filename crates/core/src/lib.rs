//! Core traits and types for trajopt.
//!
//! This crate defines the shared abstractions that solvers, observers, and
//! user problems build on:
//!
//! - [`Dynamics`] — continuous-time system dynamics `ẋ = f(t, x, u)`
//! - [`Cost`] — running and terminal cost with quadratic expansions
//! - [`Trajectory`] — a state/control sequence with horizon invariants
//! - [`Substeps`] — dense intra-stage samples recorded during integration
//! - [`Norm`] — vector norms lifted to sequences of vectors
//! - [`Observer`] — receives solver events and optionally returns control actions
//!
//! State and control dimensions are const generics, so a dimension mismatch
//! between a model and a trajectory is a compile error.

mod cost;
mod dynamics;
mod norm;
mod observer;
mod trajectory;
mod types;

pub use cost::{Cost, QuadraticCost, StageQuadratic, TerminalQuadratic};
pub use dynamics::Dynamics;
pub use norm::{Norm, difference_norm, sequence_norm};
pub use observer::Observer;
pub use trajectory::{Substeps, Trajectory, TrajectoryError};
pub use types::{
    Control, ControlArray, ControlMatrix, FeedbackArray, FeedbackMatrix, InputMatrix, State,
    StateArray, StateMatrix,
};
