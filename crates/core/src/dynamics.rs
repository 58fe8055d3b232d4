use crate::types::{Control, State};

/// Continuous-time system dynamics `ẋ = f(t, x, u)`.
///
/// Solvers discretize the dynamics over one stage and differentiate the
/// resulting stage map themselves, so an implementation only has to evaluate
/// the right-hand side. Evaluation is assumed not to fail; numerical trouble
/// shows up as non-finite states and is handled by the solver's merit checks.
///
/// Closures of the form `Fn(f64, &State<N>, &Control<M>) -> State<N>`
/// implement this trait.
pub trait Dynamics<const N: usize, const M: usize> {
    /// Returns the state derivative at time `t`.
    fn derivative(&self, t: f64, x: &State<N>, u: &Control<M>) -> State<N>;
}

impl<F, const N: usize, const M: usize> Dynamics<N, M> for F
where
    F: Fn(f64, &State<N>, &Control<M>) -> State<N>,
{
    fn derivative(&self, t: f64, x: &State<N>, u: &Control<M>) -> State<N> {
        self(t, x, u)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use nalgebra::{Vector1, Vector2};

    /// Double integrator: position, velocity driven by acceleration.
    struct DoubleIntegrator;

    impl Dynamics<2, 1> for DoubleIntegrator {
        fn derivative(&self, _t: f64, x: &State<2>, u: &Control<1>) -> State<2> {
            Vector2::new(x[1], u[0])
        }
    }

    fn evaluate<D: Dynamics<2, 1>>(dynamics: &D) -> State<2> {
        dynamics.derivative(0.0, &Vector2::new(1.0, 2.0), &Vector1::new(3.0))
    }

    #[test]
    fn struct_implementation() {
        let xdot = evaluate(&DoubleIntegrator);
        assert_relative_eq!(xdot, Vector2::new(2.0, 3.0));
    }

    #[test]
    fn closure_implementation() {
        let damping = 0.5;
        let damped = move |_t: f64, x: &State<2>, u: &Control<1>| {
            Vector2::new(x[1], u[0] - damping * x[1])
        };

        let xdot = evaluate(&damped);
        assert_relative_eq!(xdot, Vector2::new(2.0, 2.0));
    }
}
