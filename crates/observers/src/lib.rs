//! Reusable observers for trajopt solvers.
//!
//! This crate provides [`Observer`] implementations and capability traits that
//! work with any solver whose events and actions implement them.
//!
//! # Modules
//!
//! - [`traits`] — Capability traits for cross-solver observers
//!   ([`HasMerit`], [`HasStepSize`], [`HasDefectNorm`], [`CanStopEarly`])
//!
//! # Observers
//!
//! - [`TracingObserver`] — logs every event through `tracing`
//! - [`StallObserver`] — stops a solver whose merit has stopped improving
//!
//! [`Observer`]: trajopt_core::Observer
//! [`HasMerit`]: traits::HasMerit
//! [`HasStepSize`]: traits::HasStepSize
//! [`HasDefectNorm`]: traits::HasDefectNorm
//! [`CanStopEarly`]: traits::CanStopEarly

mod log;
mod stall;

pub mod traits;

pub use log::TracingObserver;
pub use stall::StallObserver;
