//! Pendulum swing-up with multiple shooting and single shooting.
//!
//! Run with `cargo run -p trajopt-solvers --example pendulum`.

use std::f64::consts::PI;

use nalgebra::{Matrix1, Matrix2, Vector1, Vector2};
use tracing_subscriber::fmt::SubscriberBuilder;
use trajopt_core::{Control, Dynamics, QuadraticCost, State, Trajectory};
use trajopt_solvers::{
    lq,
    nloc::{self, Algorithm, Event, LineSearchSettings, Settings, SingleThreaded},
    transient::{Discretization, Integrator},
};

const HORIZON: usize = 150;

/// Damped pendulum with a torque input; `θ = 0` hangs down.
#[derive(Debug, Clone)]
struct Pendulum {
    gravity: f64,
    length: f64,
    damping: f64,
}

impl Dynamics<2, 1> for Pendulum {
    fn derivative(&self, _t: f64, x: &State<2>, u: &Control<1>) -> State<2> {
        let theta_ddot = -self.gravity / self.length * x[0].sin() - self.damping * x[1] + u[0];
        Vector2::new(x[1], theta_ddot)
    }
}

/// States interpolated from hanging to upright, which only multiple shooting
/// can make use of.
fn initial_guess() -> Result<Trajectory<2, 1>, trajopt_core::TrajectoryError> {
    #[allow(clippy::cast_precision_loss)]
    let x = (0..=HORIZON)
        .map(|k| Vector2::new(PI * k as f64 / HORIZON as f64, 0.0))
        .collect();
    Trajectory::new(x, vec![Vector1::zeros(); HORIZON])
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    SubscriberBuilder::default().with_target(false).init();

    let pendulum = Pendulum {
        gravity: 9.81,
        length: 1.0,
        damping: 0.1,
    };
    let cost = QuadraticCost::new(
        Matrix2::new(1.0, 0.0, 0.0, 0.1) * 0.02,
        Matrix1::new(0.01) * 0.02,
        Matrix2::identity() * 100.0,
    )
    .with_reference(Vector2::new(PI, 0.0), Vector1::zeros());

    let discretization = Discretization::new(0.02, 2, Integrator::Rk4)?;
    let line_search = LineSearchSettings::new(1.0, 12, 0.5)?;
    let lq_config = lq::Config::new(1e-6)?;

    for algorithm in [Algorithm::MultipleShooting, Algorithm::SingleShooting] {
        let settings = Settings::new(algorithm, discretization)
            .with_shot_length(10)?
            .with_merit_rho(10.0)?
            .with_line_search(line_search)
            .with_print_summary(true)
            .with_max_iterations(50);

        let mut backend =
            SingleThreaded::new(pendulum.clone(), cost.clone(), settings, initial_guess()?);
        let mut merits = Vec::new();
        let solution = nloc::solve(&mut backend, &lq_config, |event: &Event<'_, 2, 1>| {
            merits.push(event.merit);
            None
        })?;

        let x_final = solution.trajectory.terminal_state();
        println!("{algorithm}:");
        println!("  status      {:?} after {} iterations", solution.status, solution.iters);
        println!("  merit       {:.6}", solution.merit);
        println!("  defect norm {:.3e}", solution.defect_norm);
        println!("  final state θ = {:.4}, ω = {:.4}", x_final[0], x_final[1]);
        println!("  accepted    {} steps", merits.len());
    }

    Ok(())
}
