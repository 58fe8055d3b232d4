use crate::types::{Control, ControlMatrix, FeedbackMatrix, State, StateMatrix};

/// Second-order expansion of a running cost at one stage.
///
/// The model is
///
/// ```text
/// l(x + dx, u + du) ≈ value + grad_xᵀ dx + grad_uᵀ du
///                   + ½ dxᵀ hess_xx dx + duᵀ hess_ux dx + ½ duᵀ hess_uu du
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageQuadratic<const N: usize, const M: usize> {
    pub value: f64,
    pub grad_x: State<N>,
    pub grad_u: Control<M>,
    pub hess_xx: StateMatrix<N>,
    pub hess_ux: FeedbackMatrix<N, M>,
    pub hess_uu: ControlMatrix<M>,
}

impl<const N: usize, const M: usize> StageQuadratic<N, M> {
    /// Returns an all-zero expansion.
    #[must_use]
    pub fn zeros() -> Self {
        Self {
            value: 0.0,
            grad_x: State::zeros(),
            grad_u: Control::zeros(),
            hess_xx: StateMatrix::zeros(),
            hess_ux: FeedbackMatrix::zeros(),
            hess_uu: ControlMatrix::zeros(),
        }
    }
}

/// Second-order expansion of the terminal cost.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerminalQuadratic<const N: usize> {
    pub value: f64,
    pub grad_x: State<N>,
    pub hess_xx: StateMatrix<N>,
}

impl<const N: usize> TerminalQuadratic<N> {
    /// Returns an all-zero expansion.
    #[must_use]
    pub fn zeros() -> Self {
        Self {
            value: 0.0,
            grad_x: State::zeros(),
            hess_xx: StateMatrix::zeros(),
        }
    }
}

/// Running and terminal cost of a discrete-time optimal control problem.
///
/// The total cost of a trajectory is `Σ_k intermediate(k, x_k, u_k) +
/// terminal(x_K)`. Stage weights such as the step size belong inside the
/// implementation.
pub trait Cost<const N: usize, const M: usize> {
    /// Running cost of stage `k`.
    fn intermediate(&self, k: usize, x: &State<N>, u: &Control<M>) -> f64;

    /// Terminal cost at the last state.
    fn terminal(&self, x: &State<N>) -> f64;

    /// Quadratic expansion of the running cost of stage `k` at `(x, u)`.
    fn quadratize_intermediate(&self, k: usize, x: &State<N>, u: &Control<M>)
    -> StageQuadratic<N, M>;

    /// Quadratic expansion of the terminal cost at `x`.
    fn quadratize_terminal(&self, x: &State<N>) -> TerminalQuadratic<N>;
}

/// Quadratic tracking cost.
///
/// ```text
/// l(x, u) = ½ (x - x_ref)ᵀ Q (x - x_ref) + ½ (u - u_ref)ᵀ R (u - u_ref)
/// φ(x)    = ½ (x - x_ref)ᵀ Q_f (x - x_ref)
/// ```
///
/// Its expansions are exact.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadraticCost<const N: usize, const M: usize> {
    q: StateMatrix<N>,
    r: ControlMatrix<M>,
    q_final: StateMatrix<N>,
    x_ref: State<N>,
    u_ref: Control<M>,
}

impl<const N: usize, const M: usize> QuadraticCost<N, M> {
    /// Creates a cost that regulates towards the origin.
    #[must_use]
    pub fn new(q: StateMatrix<N>, r: ControlMatrix<M>, q_final: StateMatrix<N>) -> Self {
        Self {
            q,
            r,
            q_final,
            x_ref: State::zeros(),
            u_ref: Control::zeros(),
        }
    }

    /// Sets the state and control references.
    #[must_use]
    pub fn with_reference(mut self, x_ref: State<N>, u_ref: Control<M>) -> Self {
        self.x_ref = x_ref;
        self.u_ref = u_ref;
        self
    }
}

impl<const N: usize, const M: usize> Cost<N, M> for QuadraticCost<N, M> {
    fn intermediate(&self, _k: usize, x: &State<N>, u: &Control<M>) -> f64 {
        let dx = x - self.x_ref;
        let du = u - self.u_ref;
        0.5 * (dx.dot(&(self.q * dx)) + du.dot(&(self.r * du)))
    }

    fn terminal(&self, x: &State<N>) -> f64 {
        let dx = x - self.x_ref;
        0.5 * dx.dot(&(self.q_final * dx))
    }

    fn quadratize_intermediate(
        &self,
        k: usize,
        x: &State<N>,
        u: &Control<M>,
    ) -> StageQuadratic<N, M> {
        StageQuadratic {
            value: self.intermediate(k, x, u),
            grad_x: self.q * (x - self.x_ref),
            grad_u: self.r * (u - self.u_ref),
            hess_xx: self.q,
            hess_ux: FeedbackMatrix::zeros(),
            hess_uu: self.r,
        }
    }

    fn quadratize_terminal(&self, x: &State<N>) -> TerminalQuadratic<N> {
        TerminalQuadratic {
            value: self.terminal(x),
            grad_x: self.q_final * (x - self.x_ref),
            hess_xx: self.q_final,
        }
    }
}
