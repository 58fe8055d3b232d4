use trajopt_core::{InputMatrix, StageQuadratic, State, StateArray, StateMatrix, TerminalQuadratic};

/// Per-stage data of an LQ subproblem over a horizon of `K` stages.
///
/// Every per-stage vector has `K` entries. Stages fill their own index only,
/// so the linearization and quadratic cost stages can be run over disjoint
/// index ranges in any order.
#[derive(Debug, Clone, PartialEq)]
pub struct LqProblem<const N: usize, const M: usize> {
    /// State sensitivities `A_k`.
    pub a: Vec<StateMatrix<N>>,

    /// Control sensitivities `B_k`.
    pub b: Vec<InputMatrix<N, M>>,

    /// Affine terms `g_k` of the linearized transitions.
    pub gaps: StateArray<N>,

    /// Quadratic expansions of the running cost.
    pub stage: Vec<StageQuadratic<N, M>>,

    /// Quadratic expansion of the terminal cost (the cost-to-go boundary).
    pub terminal: TerminalQuadratic<N>,
}

impl<const N: usize, const M: usize> LqProblem<N, M> {
    /// Creates an all-zero problem for `horizon` stages.
    #[must_use]
    pub fn new(horizon: usize) -> Self {
        Self {
            a: vec![StateMatrix::zeros(); horizon],
            b: vec![InputMatrix::zeros(); horizon],
            gaps: vec![State::zeros(); horizon],
            stage: vec![StageQuadratic::zeros(); horizon],
            terminal: TerminalQuadratic::zeros(),
        }
    }

    /// Returns the number of stages `K`.
    #[must_use]
    pub fn horizon(&self) -> usize {
        self.a.len()
    }
}
