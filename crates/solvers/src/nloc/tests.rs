use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use approx::assert_relative_eq;
use nalgebra::{Matrix1, Matrix2, Vector1, Vector2};
use proptest::prelude::*;
use trajopt_core::{
    Control, Cost, Dynamics, Norm, QuadraticCost, StageQuadratic, State, TerminalQuadratic,
    Trajectory, difference_norm,
};

use crate::{
    lq::{self, LqSolution},
    transient::{Discretization, Integrator},
};

use super::{
    Action, Algorithm, Backend, Event, LineSearchSettings, Settings, SingleThreaded, Status,
    solve, solve_unobserved,
};

/// `ẋ = u`: with unit Euler stages, `x_{k+1} = x_k + u_k`.
#[derive(Debug, Clone)]
struct Drift;

impl Dynamics<1, 1> for Drift {
    fn derivative(&self, _t: f64, _x: &State<1>, u: &Control<1>) -> State<1> {
        *u
    }
}

/// Double integrator `ẋ = (v, a)`.
#[derive(Debug, Clone)]
struct DoubleIntegrator;

impl Dynamics<2, 1> for DoubleIntegrator {
    fn derivative(&self, _t: f64, x: &State<2>, u: &Control<1>) -> State<2> {
        Vector2::new(x[1], u[0])
    }
}

/// Damped pendulum driven by a torque.
#[derive(Debug, Clone)]
struct Pendulum;

impl Dynamics<2, 1> for Pendulum {
    fn derivative(&self, _t: f64, x: &State<2>, u: &Control<1>) -> State<2> {
        Vector2::new(x[1], -9.81 * x[0].sin() - 0.1 * x[1] + u[0])
    }
}

/// Unit quadratic cost that records how it is called.
#[derive(Debug, Clone)]
struct Probe {
    inner: QuadraticCost<1, 1>,

    /// Control applied at stage 0 on every running cost evaluation.
    first_controls: Rc<RefCell<Vec<f64>>>,

    /// Expansion calls in order: `Some(k)` for stage `k`, `None` for terminal.
    expansions: Rc<RefCell<Vec<Option<usize>>>>,

    /// Replaces every cost evaluation when set.
    poison: Rc<Cell<Option<f64>>>,
}

impl Probe {
    fn new() -> Self {
        Self {
            inner: QuadraticCost::new(Matrix1::new(1.0), Matrix1::new(1.0), Matrix1::new(1.0)),
            first_controls: Rc::default(),
            expansions: Rc::default(),
            poison: Rc::default(),
        }
    }
}

impl Cost<1, 1> for Probe {
    fn intermediate(&self, k: usize, x: &State<1>, u: &Control<1>) -> f64 {
        if k == 0 {
            self.first_controls.borrow_mut().push(u[0]);
        }
        self.poison
            .get()
            .unwrap_or_else(|| self.inner.intermediate(k, x, u))
    }

    fn terminal(&self, x: &State<1>) -> f64 {
        self.poison.get().unwrap_or_else(|| self.inner.terminal(x))
    }

    fn quadratize_intermediate(
        &self,
        k: usize,
        x: &State<1>,
        u: &Control<1>,
    ) -> StageQuadratic<1, 1> {
        self.expansions.borrow_mut().push(Some(k));
        self.inner.quadratize_intermediate(k, x, u)
    }

    fn quadratize_terminal(&self, x: &State<1>) -> TerminalQuadratic<1> {
        self.expansions.borrow_mut().push(None);
        self.inner.quadratize_terminal(x)
    }
}

fn unit_euler() -> Discretization {
    Discretization::new(1.0, 1, Integrator::Euler).expect("valid discretization")
}

fn settings(algorithm: Algorithm, shot_length: usize) -> Settings {
    Settings::new(algorithm, unit_euler())
        .with_shot_length(shot_length)
        .expect("valid shot length")
}

fn drift_backend(
    settings: Settings,
    initial: Trajectory<1, 1>,
    probe: &Probe,
) -> SingleThreaded<Drift, Probe, 1, 1> {
    SingleThreaded::new(Drift, probe.clone(), settings, initial)
}

fn constant(x0: f64, u0: f64, horizon: usize) -> Trajectory<1, 1> {
    Trajectory::constant(Vector1::new(x0), Vector1::new(u0), horizon).expect("valid horizon")
}

fn regulator() -> QuadraticCost<2, 1> {
    QuadraticCost::new(
        Matrix2::identity(),
        Matrix1::new(0.1),
        Matrix2::identity() * 10.0,
    )
}

/// Runs the stages of one iteration up to the LQ solve.
fn prepare<B: Backend<N, M>, const N: usize, const M: usize>(backend: &mut B) {
    let last = backend.core().horizon() - 1;
    backend.linearize_trajectory(0, last);
    backend.quadratize_trajectory(0, last);
    if backend.core().settings().algorithm() == Algorithm::MultipleShooting {
        backend.rollout_shots(0, last);
    }
    backend
        .core_mut()
        .solve_lq(&lq::Config::default())
        .expect("positive definite");
}

/// Line search where every candidate evaluates to `poison`.
fn search_with_poisoned_costs(algorithm: Algorithm, poison: f64) {
    let probe = Probe::new();
    let line_search = LineSearchSettings::new(1.0, 3, 0.5).expect("valid");
    let settings = settings(algorithm, 1).with_line_search(line_search);
    let mut backend = drift_backend(settings, constant(1.0, 0.0, 3), &probe);

    let mut step = LqSolution::<1, 1>::zeros(3);
    step.lu.fill(Vector1::new(1.0));
    backend.core.step = step;

    probe.poison.set(Some(poison));
    probe.first_controls.borrow_mut().clear();
    let before = backend.core.state.clone();

    assert_eq!(backend.line_search(), 0.0);
    assert_eq!(*probe.first_controls.borrow(), vec![1.0, 0.5, 0.25]);
    assert_eq!(backend.core.state, before);
}

#[test]
fn tries_contracting_step_sizes_then_fails() {
    for algorithm in [Algorithm::MultipleShooting, Algorithm::SingleShooting] {
        search_with_poisoned_costs(algorithm, f64::NAN);
    }
}

#[test]
fn rejects_infinite_costs() {
    for algorithm in [Algorithm::MultipleShooting, Algorithm::SingleShooting] {
        search_with_poisoned_costs(algorithm, f64::NEG_INFINITY);
        search_with_poisoned_costs(algorithm, f64::INFINITY);
    }
}

#[test]
fn zero_iteration_budget_fails_immediately() {
    let probe = Probe::new();
    let line_search = LineSearchSettings::new(1.0, 0, 0.5).expect("valid");
    let settings = settings(Algorithm::SingleShooting, 1).with_line_search(line_search);
    let mut backend = drift_backend(settings, constant(1.0, 0.0, 2), &probe);
    prepare(&mut backend);

    let before = backend.core.state.clone();
    assert_eq!(backend.line_search(), 0.0);
    assert_eq!(backend.core.state, before);
}

#[test]
fn accepted_merit_strictly_decreases() {
    for algorithm in [Algorithm::MultipleShooting, Algorithm::SingleShooting] {
        let settings = Settings::new(
            algorithm,
            Discretization::new(0.05, 2, Integrator::Rk4).expect("valid"),
        )
        .with_shot_length(4)
        .and_then(|s| s.with_merit_rho(1.0))
        .expect("valid");
        let initial = Trajectory::constant(Vector2::new(0.5, 0.0), Vector1::new(0.0), 40)
            .expect("valid");
        let mut backend = SingleThreaded::new(Pendulum, regulator(), settings, initial);

        for _ in 0..8 {
            prepare(&mut backend);
            let before = backend.core().state().lowest_cost();
            let alpha = backend.line_search();
            if alpha == 0.0 {
                break;
            }
            let after = backend.core().state().lowest_cost();
            assert!(after < before, "{algorithm}: {after} >= {before}");
        }
    }
}

#[test]
fn single_shooting_never_has_defects() {
    let probe = Probe::new();
    let settings = settings(Algorithm::SingleShooting, 2);
    // Inconsistent guess: stored states ignore the dynamics.
    let initial = Trajectory::new(
        [1.0, 5.0, -3.0, 2.0].map(Vector1::new).to_vec(),
        vec![Vector1::new(0.5); 3],
    )
    .expect("valid");
    let mut backend = drift_backend(settings, initial, &probe);

    // Initialization re-integrates the whole horizon from x_0.
    assert_eq!(backend.core().state().defect_norm(), 0.0);
    assert_relative_eq!(backend.core().state().trajectory().x()[2][0], 2.0);

    for _ in 0..3 {
        prepare(&mut backend);
        backend.line_search();
        let state = backend.core().state();
        assert_eq!(state.defect_norm(), 0.0);
        assert!(state.defects().iter().all(|d| d == &Vector1::zeros()));
    }
}

#[test]
fn zero_merit_weight_ignores_defects() {
    // Feasible nominal with merit 1.5; the step pulls every shot start to the
    // origin, which halves the cost but opens a unit defect after stage 0.
    let run = |rho: f64| {
        let probe = Probe::new();
        let settings = settings(Algorithm::MultipleShooting, 1)
            .with_merit_rho(rho)
            .expect("valid");
        let mut backend = drift_backend(settings, constant(1.0, 0.0, 2), &probe);
        assert_relative_eq!(backend.core().state().lowest_cost(), 1.5);

        let mut step = LqSolution::<1, 1>::zeros(2);
        step.lx[1] = Vector1::new(-1.0);
        step.lx[2] = Vector1::new(-1.0);
        backend.core.step = step;

        let alpha = backend.line_search();
        (alpha, backend)
    };

    let (alpha, backend) = run(0.0);
    assert_eq!(alpha, 1.0);
    assert_relative_eq!(backend.core().state().lowest_cost(), 0.5);
    assert_relative_eq!(backend.core().state().defect_norm(), 1.0);

    let (alpha, backend) = run(10.0);
    assert_eq!(alpha, 0.0);
    assert_relative_eq!(backend.core().state().lowest_cost(), 1.5);
}

#[test]
fn rollout_writes_one_defect_per_shot() {
    let probe = Probe::new();
    let settings = settings(Algorithm::MultipleShooting, 5);
    let mut backend = drift_backend(settings, constant(1.0, 0.1, 10), &probe);

    let sentinel = Vector1::new(99.0);
    backend.core.state.defects.fill(sentinel);
    backend.rollout_shots(0, 9);

    let defects = backend.core().state().defects();
    let written: Vec<usize> = (0..defects.len())
        .filter(|&k| defects[k] != sentinel)
        .collect();
    assert_eq!(written, vec![0, 5]);

    // First shot ends at 1.5 while the second starts from the stored 1.0.
    assert_relative_eq!(defects[0][0], 0.5, epsilon = 1e-12);
    assert_relative_eq!(defects[5][0], 0.0);
}

#[test]
fn terminal_cost_to_go_initialized_once_per_sweep() {
    let probe = Probe::new();
    let settings = settings(Algorithm::MultipleShooting, 1);
    let mut backend = drift_backend(settings, constant(1.0, 0.0, 4), &probe);

    backend.quadratize_trajectory(0, 3);
    assert_eq!(
        *probe.expansions.borrow(),
        vec![None, Some(0), Some(1), Some(2), Some(3)]
    );

    probe.expansions.borrow_mut().clear();
    backend.quadratize_trajectory(0, 2);
    assert_eq!(*probe.expansions.borrow(), vec![Some(0), Some(1), Some(2)]);

    probe.expansions.borrow_mut().clear();
    backend.quadratize_trajectory(3, 3);
    assert_eq!(*probe.expansions.borrow(), vec![None, Some(3)]);
}

#[test]
fn linearization_writes_only_its_range() {
    let probe = Probe::new();
    let settings = settings(Algorithm::MultipleShooting, 1);
    let mut backend = drift_backend(settings, constant(1.0, 0.0, 4), &probe);

    backend.linearize_trajectory(1, 2);

    let lq = backend.core().lq_problem();
    assert_eq!(lq.a[0], Matrix1::zeros());
    assert_eq!(lq.a[3], Matrix1::zeros());
    for k in 1..=2 {
        assert_relative_eq!(lq.a[k][0], 1.0, epsilon = 1e-9);
        assert_relative_eq!(lq.b[k][0], 1.0, epsilon = 1e-9);
    }
}

#[test]
fn defects_become_gaps_of_closing_transitions() {
    let probe = Probe::new();
    let settings = settings(Algorithm::MultipleShooting, 2);
    let initial = Trajectory::new(
        [0.0, 0.0, 3.0, 3.0, 3.0].map(Vector1::new).to_vec(),
        vec![Vector1::new(1.0); 4],
    )
    .expect("valid");
    let mut backend = drift_backend(settings, initial, &probe);
    prepare(&mut backend);

    // Shot [0, 2) ends at 2 but the next shot starts at 3.
    let gaps = &backend.core().lq_problem().gaps;
    assert_relative_eq!(gaps[1][0], -1.0, epsilon = 1e-12);
    assert_eq!(gaps[0], Vector1::zeros());
    assert_eq!(gaps[2], Vector1::zeros());
    assert_eq!(gaps[3], Vector1::zeros());
}

#[test]
fn summary_norms_measure_the_accepted_change() {
    for print_summary in [false, true] {
        let settings = Settings::new(Algorithm::SingleShooting, Discretization::default())
            .with_print_summary(print_summary);
        let initial = Trajectory::constant(Vector2::new(1.0, 0.0), Vector1::new(0.0), 20)
            .expect("valid");
        let mut backend = SingleThreaded::new(DoubleIntegrator, regulator(), settings, initial);

        prepare(&mut backend);
        assert!(backend.line_search() > 0.0);

        let state = backend.core().state();
        if print_summary {
            let lx = difference_norm(Norm::L2, state.trajectory().x(), state.previous().x());
            let lu = difference_norm(Norm::L2, state.trajectory().u(), state.previous().u());
            assert!(state.lu_norm() > 0.0);
            assert_relative_eq!(state.lx_norm(), lx);
            assert_relative_eq!(state.lu_norm(), lu);
        } else {
            assert_eq!(state.lx_norm(), 0.0);
            assert_eq!(state.lu_norm(), 0.0);
        }
    }
}

#[test]
fn both_algorithms_find_the_linear_quadratic_optimum() {
    let disc = Discretization::new(0.1, 1, Integrator::Rk4).expect("valid");
    let initial =
        Trajectory::constant(Vector2::new(1.0, 0.0), Vector1::new(0.0), 30).expect("valid");

    let solve_with = |algorithm| {
        let settings = Settings::new(algorithm, disc)
            .with_shot_length(5)
            .and_then(|s| s.with_merit_rho(1.0))
            .expect("valid");
        let mut backend =
            SingleThreaded::new(DoubleIntegrator, regulator(), settings, initial.clone());
        solve_unobserved(&mut backend, &lq::Config::default()).expect("solves")
    };

    let gnms = solve_with(Algorithm::MultipleShooting);
    let ilqr = solve_with(Algorithm::SingleShooting);

    for solution in [&gnms, &ilqr] {
        // A linear model is solved by the first full step; the next line
        // search can only match that merit up to rounding.
        assert!(matches!(solution.status, Status::Converged | Status::NoDescent));
        assert!(solution.defect_norm < 1e-6);
    }
    assert_relative_eq!(gnms.merit, ilqr.merit, epsilon = 1e-6);
    for (a, b) in gnms.trajectory.u().iter().zip(ilqr.trajectory.u()) {
        assert_relative_eq!(*a, *b, epsilon = 1e-6);
    }
}

#[test]
fn observer_can_stop_early() {
    let settings = Settings::new(Algorithm::SingleShooting, Discretization::default());
    let initial =
        Trajectory::constant(Vector2::new(1.0, 0.0), Vector1::new(0.0), 20).expect("valid");
    let mut backend = SingleThreaded::new(DoubleIntegrator, regulator(), settings, initial);

    let mut seen = Vec::new();
    let solution = solve(
        &mut backend,
        &lq::Config::default(),
        |event: &Event<'_, 2, 1>| {
            seen.push((event.iter, event.alpha, event.merit));
            Some(Action::StopEarly)
        },
    )
    .expect("solves");

    assert_eq!(solution.status, Status::StoppedByObserver);
    assert_eq!(solution.iters, 1);
    assert_eq!(seen.len(), 1);
    assert_relative_eq!(seen[0].2, solution.merit);
}

#[test]
fn nonlinear_solve_reduces_merit() {
    for algorithm in [Algorithm::MultipleShooting, Algorithm::SingleShooting] {
        let settings = Settings::new(
            algorithm,
            Discretization::new(0.05, 2, Integrator::Rk4).expect("valid"),
        )
        .with_shot_length(5)
        .and_then(|s| s.with_merit_rho(100.0))
        .expect("valid")
        .with_max_iterations(30);
        let initial =
            Trajectory::constant(Vector2::new(1.0, 0.0), Vector1::new(0.0), 60).expect("valid");
        let mut backend = SingleThreaded::new(Pendulum, regulator(), settings, initial);
        let initial_merit = backend.core().state().lowest_cost();

        let solution = solve_unobserved(&mut backend, &lq::Config::default()).expect("solves");

        assert!(solution.iters >= 1);
        assert!(solution.merit < initial_merit, "{algorithm}");
        assert!(solution.trajectory.x().iter().all(|x| x.iter().all(|v| v.is_finite())));
        assert_eq!(solution.gains.len(), 60);
    }
}

#[test]
fn singular_control_hessian_is_an_error() {
    let cost = QuadraticCost::new(Matrix2::identity(), Matrix1::new(0.0), Matrix2::zeros());
    let settings = Settings::new(Algorithm::SingleShooting, Discretization::default());
    let initial =
        Trajectory::constant(Vector2::new(1.0, 0.0), Vector1::new(0.0), 1).expect("valid");
    let mut backend =
        SingleThreaded::new(DoubleIntegrator, cost.clone(), settings, initial.clone());

    let result = solve_unobserved(&mut backend, &lq::Config::default());
    assert_eq!(
        result.map(|s| s.status),
        Err(super::Error::Lq(lq::Error::NotPositiveDefinite { stage: 0 }))
    );

    let mut backend = SingleThreaded::new(DoubleIntegrator, cost, settings, initial);
    let regularized = lq::Config::new(1e-3).expect("valid");
    assert!(solve_unobserved(&mut backend, &regularized).is_ok());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn buffer_lengths_hold_across_stages(
        horizon in 1usize..30,
        shot_length in 1usize..8,
        single in any::<bool>(),
        u0 in -1.0..1.0_f64,
    ) {
        let algorithm = if single {
            Algorithm::SingleShooting
        } else {
            Algorithm::MultipleShooting
        };
        let probe = Probe::new();
        let settings = settings(algorithm, shot_length);
        let mut backend = drift_backend(settings, constant(1.0, u0, horizon), &probe);

        let check = |backend: &SingleThreaded<Drift, Probe, 1, 1>| {
            let state = backend.core().state();
            prop_assert_eq!(state.trajectory().x().len(), horizon + 1);
            prop_assert_eq!(state.trajectory().u().len(), horizon);
            prop_assert_eq!(state.previous().x().len(), horizon + 1);
            prop_assert_eq!(state.defects().len(), horizon + 1);
            prop_assert_eq!(state.x_shot().len(), horizon + 1);
            prop_assert_eq!(state.substeps().x.len(), horizon + 1);
            Ok(())
        };

        check(&backend)?;
        backend.linearize_trajectory(0, horizon - 1);
        check(&backend)?;
        backend.quadratize_trajectory(0, horizon - 1);
        check(&backend)?;
        backend.rollout_shots(0, horizon - 1);
        check(&backend)?;
        backend.core_mut().solve_lq(&lq::Config::default()).expect("positive definite");
        let alpha = backend.line_search();
        check(&backend)?;
        prop_assert!((0.0..=1.0).contains(&alpha));
    }
}
