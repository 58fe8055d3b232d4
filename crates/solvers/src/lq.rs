//! Linear-quadratic subproblems and their solution.
//!
//! Around a nominal trajectory, the nonlinear problem reduces to
//!
//! ```text
//! min  Σ_k ½ dxᵀ Q dx + duᵀ P dx + ½ duᵀ R du + qᵀ dx + rᵀ du  +  ½ dxᵀ Q_f dx + q_fᵀ dx
//! s.t. dx_{k+1} = A_k dx_k + B_k du_k + g_k,    dx_0 = 0
//! ```
//!
//! where `g_k` are the gaps left by multiple shooting. [`riccati::solve`]
//! returns the affine policy `du_k = l_k + L_k dx_k` together with the state
//! and control increments it produces.

mod config;
mod error;
mod problem;
mod solution;

pub mod riccati;

pub use config::{Config, ConfigError};
pub use error::Error;
pub use problem::LqProblem;
pub use solution::LqSolution;
