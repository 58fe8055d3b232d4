/// Errors that can occur while solving an LQ subproblem.
#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("control Hessian is not positive definite at stage {stage}")]
    NotPositiveDefinite { stage: usize },
}
