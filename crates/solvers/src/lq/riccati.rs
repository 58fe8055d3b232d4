//! Backward Riccati recursion with gaps.
//!
//! The backward pass propagates the quadratic cost-to-go `½ dxᵀ S dx + sᵀ dx`
//! from the terminal expansion towards stage 0:
//!
//! ```text
//! H = R + Bᵀ S B + μ I        G = P + Bᵀ S A        g = r + Bᵀ (s + S gap)
//! L = -H⁻¹ G                  l = -H⁻¹ g
//! S ← Q + Aᵀ S A + Gᵀ L       s ← q + Aᵀ (s + S gap) + Gᵀ l
//! ```
//!
//! The forward pass then applies the policy from `dx_0 = 0`.

use nalgebra::Cholesky;
use trajopt_core::{Control, ControlMatrix, State};

use super::{Config, Error, LqProblem, LqSolution};

/// Solves the LQ subproblem.
///
/// # Errors
///
/// Returns [`Error::NotPositiveDefinite`] if the regularized control Hessian
/// `H` of any stage has no Cholesky factorization.
pub fn solve<const N: usize, const M: usize>(
    problem: &LqProblem<N, M>,
    config: &Config,
) -> Result<LqSolution<N, M>, Error> {
    let horizon = problem.horizon();
    let mut solution = LqSolution::zeros(horizon);

    let mut s_mat = problem.terminal.hess_xx;
    let mut s_vec = problem.terminal.grad_x;

    for k in (0..horizon).rev() {
        let a = &problem.a[k];
        let b = &problem.b[k];
        let cost = &problem.stage[k];

        let s_gap = s_vec + s_mat * problem.gaps[k];

        let h = cost.hess_uu
            + b.transpose() * s_mat * b
            + ControlMatrix::<M>::identity() * config.control_regularization();
        let g_mat = cost.hess_ux + b.transpose() * s_mat * a;
        let g_vec = cost.grad_u + b.transpose() * s_gap;

        let chol = Cholesky::new(h).ok_or(Error::NotPositiveDefinite { stage: k })?;
        let gain = -chol.solve(&g_mat);
        let feedforward = -chol.solve(&g_vec);

        let next_s = cost.hess_xx + a.transpose() * s_mat * a + g_mat.transpose() * gain;
        s_mat = 0.5 * (next_s + next_s.transpose());
        s_vec = cost.grad_x + a.transpose() * s_gap + g_mat.transpose() * feedforward;

        solution.gains[k] = gain;
        solution.feedforward[k] = feedforward;
    }

    solution.lx[0] = State::zeros();
    for k in 0..horizon {
        let du: Control<M> = solution.feedforward[k] + solution.gains[k] * solution.lx[k];
        solution.lu[k] = du;
        solution.lx[k + 1] = problem.a[k] * solution.lx[k] + problem.b[k] * du + problem.gaps[k];
    }

    Ok(solution)
}
