//! Solvers for discrete-time nonlinear optimal control.
//!
//! - [`transient`] discretizes continuous dynamics into stage maps.
//! - [`lq`] solves the linear-quadratic subproblem with a Riccati recursion.
//! - [`nloc`] drives the nonlinear iteration: linearization, quadratic cost
//!   expansion, shooting rollouts, and the merit line search, for both
//!   multiple shooting and single shooting (iLQR).

pub mod lq;
pub mod nloc;
pub mod transient;
