use trajopt_core::Trajectory;

/// Emitted after every iteration that accepted a step.
#[derive(Debug, Clone, Copy)]
pub struct Event<'a, const N: usize, const M: usize> {
    /// Iteration number, starting at one.
    pub iter: usize,

    /// Accepted line search step size.
    pub alpha: f64,

    /// Merit of the accepted trajectory.
    pub merit: f64,

    pub intermediate_cost: f64,
    pub final_cost: f64,
    pub defect_norm: f64,

    /// L2 change of the states, zero unless summaries are enabled.
    pub lx_norm: f64,

    /// L2 change of the controls, zero unless summaries are enabled.
    pub lu_norm: f64,

    /// The accepted trajectory.
    pub trajectory: &'a Trajectory<N, M>,
}
