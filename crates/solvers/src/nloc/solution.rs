use trajopt_core::{FeedbackArray, Trajectory};

/// Indicates why the solver stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The merit stopped improving and the defects are within tolerance.
    Converged,

    /// The line search found no step that decreased the merit.
    NoDescent,

    /// Reached the iteration limit without converging.
    MaxIters,

    /// Stopped early due to an observer decision.
    StoppedByObserver,
}

/// The result of a nonlinear optimal control solve.
#[derive(Debug, Clone)]
pub struct Solution<const N: usize, const M: usize> {
    /// Final solver status.
    pub status: Status,

    /// Best trajectory found.
    pub trajectory: Trajectory<N, M>,

    /// Feedback gains of the last LQ step, usable as a tracking controller
    /// around `trajectory`.
    pub gains: FeedbackArray<N, M>,

    /// Merit of `trajectory`.
    pub merit: f64,

    /// Defect norm of `trajectory`.
    pub defect_norm: f64,

    /// Iteration count when the solver finished.
    pub iters: usize,
}
