//! Nonlinear optimal control by Gauss-Newton multiple shooting and iLQR.
//!
//! # Algorithm
//!
//! Each iteration works around the current nominal trajectory:
//!
//! 1. **Linearize** the discretized dynamics at every stage.
//! 2. **Quadratize** the running costs, after initializing the terminal
//!    cost-to-go.
//! 3. **Roll out** the shots (multiple shooting only). Each shot is integrated
//!    from the trajectory's own state at its start, and the mismatch with the
//!    next shot's start becomes a defect.
//! 4. Solve the **LQ subproblem** (see [`crate::lq`]), feeding the defects in
//!    as gaps.
//! 5. **Line search** on the merit `intermediate + final + ρ·‖defects‖₁`,
//!    backtracking from `alpha_0` by a fixed contraction until the merit
//!    strictly decreases.
//!
//! Single shooting treats the whole horizon as one shot, so its candidates are
//! always feasible and their defect norm is exactly zero.
//!
//! The stages run behind the [`Backend`] trait. [`SingleThreaded`] runs them on
//! the calling thread; the per-stage primitives on [`Problem`] take a
//! [`WorkerId`] so that a parallel backend can share them.
//!
//! # Observer Events
//!
//! [`solve`] emits one [`Event`] per accepted step. Observers can return
//! [`Action::StopEarly`] to halt and keep the current trajectory.
//!
//! # Logging
//!
//! With [`LineSearchSettings::debug_print`] every candidate is logged at
//! `DEBUG`. With [`Settings::print_summary`] every iteration is logged at
//! `INFO`, including the L2 change of the trajectory.

mod action;
mod backend;
mod error;
mod event;
mod iterate;
mod line_search;
mod problem;
mod settings;
mod solution;
mod state;

#[cfg(test)]
mod tests;

pub use action::Action;
pub use backend::{Backend, Core, SingleThreaded};
pub use error::Error;
pub use event::Event;
pub use problem::{Candidate, CandidateCosts, Problem, WorkerId};
pub use settings::{Algorithm, ConfigError, LineSearchSettings, Settings};
pub use solution::{Solution, Status};
pub use state::BackendState;

use trajopt_core::Observer;

use crate::lq;

use iterate::iterate;

/// Iterates `backend` until convergence, stagnation, or the iteration limit.
///
/// The observer receives an [`Event`] after every accepted step.
/// A failed line search ends the solve with [`Status::NoDescent`].
///
/// # Errors
///
/// Returns an error if an LQ subproblem cannot be solved, typically because a
/// control Hessian is not positive definite. Raising the regularization in
/// `lq_config` usually helps.
pub fn solve<B, Obs, const N: usize, const M: usize>(
    backend: &mut B,
    lq_config: &lq::Config,
    observer: Obs,
) -> Result<Solution<N, M>, Error>
where
    B: Backend<N, M>,
    Obs: for<'a> Observer<Event<'a, N, M>, Action>,
{
    iterate(backend, lq_config, observer)
}

/// Iterates `backend` without observation.
///
/// # Errors
///
/// Returns an error if an LQ subproblem cannot be solved.
pub fn solve_unobserved<B, const N: usize, const M: usize>(
    backend: &mut B,
    lq_config: &lq::Config,
) -> Result<Solution<N, M>, Error>
where
    B: Backend<N, M>,
{
    solve(backend, lq_config, ())
}
