//! Stage discretization of continuous-time dynamics.
//!
//! A stage `k` covers the time interval `[k·dt, (k+1)·dt)`. The control is
//! held constant over the stage and the dynamics are integrated with a fixed
//! number of substeps:
//!
//! ```text
//! Euler: x_{i+1} = x_i + h · f(t_i, x_i, u)
//! RK4:   x_{i+1} = x_i + h/6 · (k1 + 2 k2 + 2 k3 + k4)
//! ```
//!
//! with `h = dt / steps`. The resulting stage map `x_{k+1} = F_k(x_k, u_k)` is
//! what shooting rollouts evaluate and what [`Discretization::sensitivities`]
//! differentiates, so linearization and rollout always agree.

use std::str::FromStr;

use thiserror::Error;
use trajopt_core::{Control, Dynamics, InputMatrix, State, StateMatrix, Substeps};

/// Fixed-step integration scheme used within a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Integrator {
    /// Explicit forward Euler.
    Euler,

    /// Classic fourth-order Runge-Kutta.
    #[default]
    Rk4,
}

impl Integrator {
    /// Advances `x` by one substep of size `h`.
    fn step<D, const N: usize, const M: usize>(
        self,
        dynamics: &D,
        t: f64,
        x: &State<N>,
        u: &Control<M>,
        h: f64,
    ) -> State<N>
    where
        D: Dynamics<N, M>,
    {
        match self {
            Self::Euler => x + dynamics.derivative(t, x, u) * h,
            Self::Rk4 => {
                let half = 0.5 * h;
                let k1 = dynamics.derivative(t, x, u);
                let k2 = dynamics.derivative(t + half, &(x + k1 * half), u);
                let k3 = dynamics.derivative(t + half, &(x + k2 * half), u);
                let k4 = dynamics.derivative(t + h, &(x + k3 * h), u);
                x + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (h / 6.0)
            }
        }
    }
}

impl FromStr for Integrator {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "euler" => Ok(Self::Euler),
            "rk4" => Ok(Self::Rk4),
            _ => Err(ConfigError::UnknownIntegrator(s.to_owned())),
        }
    }
}

/// Errors that can occur when validating a discretization.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("dt must be finite and positive")]
    StepSize,

    #[error("steps per stage must be at least one")]
    Substeps,

    #[error("unknown integrator `{0}`")]
    UnknownIntegrator(String),
}

/// Time discretization of a stage: step size, substeps, and scheme.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Discretization {
    dt: f64,
    steps: usize,
    integrator: Integrator,
}

impl Default for Discretization {
    fn default() -> Self {
        // Known-good values, unwrap is safe
        Self::new(0.01, 1, Integrator::Rk4).unwrap()
    }
}

impl Discretization {
    /// Creates a validated discretization.
    ///
    /// # Errors
    ///
    /// Returns an error if `dt` is not finite and positive or if `steps` is zero.
    pub fn new(dt: f64, steps: usize, integrator: Integrator) -> Result<Self, ConfigError> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(ConfigError::StepSize);
        }
        if steps == 0 {
            return Err(ConfigError::Substeps);
        }

        Ok(Self {
            dt,
            steps,
            integrator,
        })
    }

    /// Returns the stage duration.
    #[must_use]
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Returns the number of integration substeps per stage.
    #[must_use]
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Returns the integration scheme.
    #[must_use]
    pub fn integrator(&self) -> Integrator {
        self.integrator
    }

    /// Integrates stage `k` from `x` under the held control `u`.
    ///
    /// When `substeps` is given, the stage's previous samples are replaced by
    /// the state at the start of every substep.
    pub fn propagate<D, const N: usize, const M: usize>(
        &self,
        dynamics: &D,
        k: usize,
        x: &State<N>,
        u: &Control<M>,
        mut substeps: Option<&mut Substeps<N, M>>,
    ) -> State<N>
    where
        D: Dynamics<N, M>,
    {
        #[allow(clippy::cast_precision_loss)]
        let t0 = k as f64 * self.dt;
        let h = self.dt / self.steps as f64;

        if let Some(record) = substeps.as_deref_mut() {
            record.clear_stage(k);
        }

        let mut x = *x;
        for i in 0..self.steps {
            if let Some(record) = substeps.as_deref_mut() {
                record.record(k, x, *u);
            }
            #[allow(clippy::cast_precision_loss)]
            let t = t0 + i as f64 * h;
            x = self.integrator.step(dynamics, t, &x, u, h);
        }
        x
    }

    /// Sensitivities `(∂F/∂x, ∂F/∂u)` of the stage map at `(x, u)`.
    ///
    /// Uses central differences with a step scaled to each coordinate.
    pub fn sensitivities<D, const N: usize, const M: usize>(
        &self,
        dynamics: &D,
        k: usize,
        x: &State<N>,
        u: &Control<M>,
    ) -> (StateMatrix<N>, InputMatrix<N, M>)
    where
        D: Dynamics<N, M>,
    {
        let mut a = StateMatrix::<N>::zeros();
        for i in 0..N {
            let h = perturbation(x[i]);
            let mut plus = *x;
            let mut minus = *x;
            plus[i] += h;
            minus[i] -= h;
            let column = (self.propagate(dynamics, k, &plus, u, None)
                - self.propagate(dynamics, k, &minus, u, None))
                / (2.0 * h);
            a.set_column(i, &column);
        }

        let mut b = InputMatrix::<N, M>::zeros();
        for i in 0..M {
            let h = perturbation(u[i]);
            let mut plus = *u;
            let mut minus = *u;
            plus[i] += h;
            minus[i] -= h;
            let column = (self.propagate(dynamics, k, x, &plus, None)
                - self.propagate(dynamics, k, x, &minus, None))
                / (2.0 * h);
            b.set_column(i, &column);
        }

        (a, b)
    }
}

/// Central difference step for a coordinate of magnitude `value`.
fn perturbation(value: f64) -> f64 {
    f64::EPSILON.cbrt() * value.abs().max(1.0)
}
