use trajopt_core::{Control, ControlArray, FeedbackArray, FeedbackMatrix, State, StateArray};

/// Solution of an LQ subproblem.
#[derive(Debug, Clone, PartialEq)]
pub struct LqSolution<const N: usize, const M: usize> {
    /// Feedback gains `L_k` (`K` entries).
    pub gains: FeedbackArray<N, M>,

    /// Feed-forward terms `l_k` of the policy (`K` entries).
    pub feedforward: ControlArray<M>,

    /// State increments `dx_k` (`K + 1` entries, `dx_0 = 0`).
    pub lx: StateArray<N>,

    /// Control increments `du_k = l_k + L_k dx_k` (`K` entries).
    pub lu: ControlArray<M>,
}

impl<const N: usize, const M: usize> LqSolution<N, M> {
    /// Creates the zero step for `horizon` stages.
    #[must_use]
    pub fn zeros(horizon: usize) -> Self {
        Self {
            gains: vec![FeedbackMatrix::zeros(); horizon],
            feedforward: vec![Control::zeros(); horizon],
            lx: vec![State::zeros(); horizon + 1],
            lu: vec![Control::zeros(); horizon],
        }
    }
}
