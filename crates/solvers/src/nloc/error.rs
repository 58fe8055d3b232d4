use thiserror::Error;

use crate::lq;

/// Errors that can occur while solving.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The LQ subproblem around the current trajectory could not be solved.
    #[error("LQ subproblem failed: {0}")]
    Lq(#[from] lq::Error),
}
