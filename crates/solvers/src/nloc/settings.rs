use std::{fmt, str::FromStr};

use thiserror::Error;

use crate::transient::{self, Discretization};

/// Errors that can occur when validating solver settings.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("unknown algorithm `{0}`")]
    UnknownAlgorithm(String),

    #[error("worker count must be at least one")]
    Workers,

    #[error("shot length must be at least one stage")]
    ShotLength,

    #[error("initial step size must be finite and positive")]
    InitialStepSize,

    #[error("contraction factor must lie in (0, 1)")]
    Contraction,

    #[error("merit_rho must be finite and non-negative")]
    MeritRho,

    #[error("min_cost_improvement must be finite and non-negative")]
    MinCostImprovement,

    #[error("max_defect_sum must be finite and non-negative")]
    MaxDefectSum,

    #[error("invalid discretization: {0}")]
    Discretization(#[from] transient::ConfigError),
}

/// Nonlinear optimal control algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    /// Gauss-Newton multiple shooting: shots are integrated independently and
    /// their continuity defects enter the LQ subproblem and the merit.
    #[default]
    MultipleShooting,

    /// Iterative LQR: a single shot over the whole horizon, always feasible.
    SingleShooting,
}

impl FromStr for Algorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "multiple_shooting" | "gnms" => Ok(Self::MultipleShooting),
            "single_shooting" | "ilqr" => Ok(Self::SingleShooting),
            _ => Err(ConfigError::UnknownAlgorithm(s.to_owned())),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MultipleShooting => f.write_str("multiple_shooting"),
            Self::SingleShooting => f.write_str("single_shooting"),
        }
    }
}

/// Settings of the backtracking line search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSearchSettings {
    alpha_0: f64,
    max_iterations: usize,
    contraction: f64,
    debug_print: bool,
}

impl Default for LineSearchSettings {
    fn default() -> Self {
        // Known-good values, unwrap is safe
        Self::new(1.0, 10, 0.5).unwrap()
    }
}

impl LineSearchSettings {
    /// Creates validated line search settings with debug logging off.
    ///
    /// # Errors
    ///
    /// Returns an error if `alpha_0` is not finite and positive or if
    /// `contraction` is outside `(0, 1)`.
    pub fn new(alpha_0: f64, max_iterations: usize, contraction: f64) -> Result<Self, ConfigError> {
        if !alpha_0.is_finite() || alpha_0 <= 0.0 {
            return Err(ConfigError::InitialStepSize);
        }
        if !(contraction > 0.0 && contraction < 1.0) {
            return Err(ConfigError::Contraction);
        }

        Ok(Self {
            alpha_0,
            max_iterations,
            contraction,
            debug_print: false,
        })
    }

    /// Enables or disables per-candidate debug logging.
    #[must_use]
    pub fn with_debug_print(mut self, debug_print: bool) -> Self {
        self.debug_print = debug_print;
        self
    }

    /// Returns the first step size tried.
    #[must_use]
    pub fn alpha_0(&self) -> f64 {
        self.alpha_0
    }

    /// Returns the maximum number of candidates per line search.
    #[must_use]
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Returns the factor applied to the step size after a rejection.
    #[must_use]
    pub fn contraction(&self) -> f64 {
        self.contraction
    }

    /// Returns whether every candidate is logged.
    #[must_use]
    pub fn debug_print(&self) -> bool {
        self.debug_print
    }
}

/// Settings of the nonlinear optimal control solver.
///
/// Start from [`Settings::new`] and adjust with the `with_*` methods. Every
/// method that takes a number validates it, so a `Settings` value is always
/// usable by a backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    algorithm: Algorithm,
    discretization: Discretization,
    workers: usize,
    shot_length: usize,
    line_search: LineSearchSettings,
    merit_rho: f64,
    print_summary: bool,
    max_iterations: usize,
    min_cost_improvement: f64,
    max_defect_sum: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self::new(Algorithm::default(), Discretization::default())
    }
}

impl Settings {
    /// Creates settings with default values for everything but the algorithm
    /// and the discretization.
    #[must_use]
    pub fn new(algorithm: Algorithm, discretization: Discretization) -> Self {
        Self {
            algorithm,
            discretization,
            workers: 1,
            shot_length: 1,
            line_search: LineSearchSettings::default(),
            merit_rho: 0.0,
            print_summary: false,
            max_iterations: 100,
            min_cost_improvement: 1e-4,
            max_defect_sum: 1e-5,
        }
    }

    /// Sets the number of helper workers of a parallel backend.
    ///
    /// The single-threaded backend owns the slot after the helpers.
    ///
    /// # Errors
    ///
    /// Returns an error if `workers` is zero.
    pub fn with_workers(mut self, workers: usize) -> Result<Self, ConfigError> {
        if workers == 0 {
            return Err(ConfigError::Workers);
        }
        self.workers = workers;
        Ok(self)
    }

    /// Sets the number of stages per shot.
    ///
    /// # Errors
    ///
    /// Returns an error if `shot_length` is zero.
    pub fn with_shot_length(mut self, shot_length: usize) -> Result<Self, ConfigError> {
        if shot_length == 0 {
            return Err(ConfigError::ShotLength);
        }
        self.shot_length = shot_length;
        Ok(self)
    }

    /// Sets the line search settings.
    #[must_use]
    pub fn with_line_search(mut self, line_search: LineSearchSettings) -> Self {
        self.line_search = line_search;
        self
    }

    /// Sets the weight of the defect norm in the merit function.
    ///
    /// # Errors
    ///
    /// Returns an error if `merit_rho` is negative or non-finite.
    pub fn with_merit_rho(mut self, merit_rho: f64) -> Result<Self, ConfigError> {
        if !merit_rho.is_finite() || merit_rho < 0.0 {
            return Err(ConfigError::MeritRho);
        }
        self.merit_rho = merit_rho;
        Ok(self)
    }

    /// Enables per-iteration summaries and the step diagnostics they report.
    #[must_use]
    pub fn with_print_summary(mut self, print_summary: bool) -> Self {
        self.print_summary = print_summary;
        self
    }

    /// Sets the iteration limit of the outer solver loop.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the convergence thresholds of the outer solver loop.
    ///
    /// The solver has converged once the relative merit decrease of an
    /// iteration is at most `min_cost_improvement` and the defect norm is at
    /// most `max_defect_sum`.
    ///
    /// # Errors
    ///
    /// Returns an error if either threshold is negative or non-finite.
    pub fn with_convergence(
        mut self,
        min_cost_improvement: f64,
        max_defect_sum: f64,
    ) -> Result<Self, ConfigError> {
        if !min_cost_improvement.is_finite() || min_cost_improvement < 0.0 {
            return Err(ConfigError::MinCostImprovement);
        }
        if !max_defect_sum.is_finite() || max_defect_sum < 0.0 {
            return Err(ConfigError::MaxDefectSum);
        }
        self.min_cost_improvement = min_cost_improvement;
        self.max_defect_sum = max_defect_sum;
        Ok(self)
    }

    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    #[must_use]
    pub fn discretization(&self) -> &Discretization {
        &self.discretization
    }

    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Returns the configured shot length.
    ///
    /// Single shooting ignores it and integrates the whole horizon as one shot.
    #[must_use]
    pub fn shot_length(&self) -> usize {
        self.shot_length
    }

    #[must_use]
    pub fn line_search(&self) -> &LineSearchSettings {
        &self.line_search
    }

    #[must_use]
    pub fn merit_rho(&self) -> f64 {
        self.merit_rho
    }

    #[must_use]
    pub fn print_summary(&self) -> bool {
        self.print_summary
    }

    #[must_use]
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    #[must_use]
    pub fn min_cost_improvement(&self) -> f64 {
        self.min_cost_improvement
    }

    #[must_use]
    pub fn max_defect_sum(&self) -> f64 {
        self.max_defect_sum
    }
}

#[cfg(feature = "serde")]
mod de {
    use serde::Deserialize;

    use super::{Algorithm, ConfigError, LineSearchSettings, Settings};
    use crate::transient::{Discretization, Integrator};

    /// Unvalidated mirror of [`Settings`] as it appears in settings files.
    #[derive(Deserialize)]
    #[serde(default, deny_unknown_fields)]
    pub(super) struct RawSettings {
        algorithm: String,
        dt: f64,
        integration_steps: usize,
        integrator: String,
        workers: usize,
        shot_length: usize,
        line_search: RawLineSearch,
        merit_rho: f64,
        print_summary: bool,
        max_iterations: usize,
        min_cost_improvement: f64,
        max_defect_sum: f64,
    }

    #[derive(Deserialize)]
    #[serde(default, deny_unknown_fields)]
    struct RawLineSearch {
        alpha_0: f64,
        max_iterations: usize,
        contraction: f64,
        debug_print: bool,
    }

    impl Default for RawSettings {
        fn default() -> Self {
            let settings = Settings::default();
            let disc = settings.discretization();
            Self {
                algorithm: settings.algorithm().to_string(),
                dt: disc.dt(),
                integration_steps: disc.steps(),
                integrator: match disc.integrator() {
                    Integrator::Euler => "euler",
                    Integrator::Rk4 => "rk4",
                }
                .to_owned(),
                workers: settings.workers(),
                shot_length: settings.shot_length(),
                line_search: RawLineSearch::default(),
                merit_rho: settings.merit_rho(),
                print_summary: settings.print_summary(),
                max_iterations: settings.max_iterations(),
                min_cost_improvement: settings.min_cost_improvement(),
                max_defect_sum: settings.max_defect_sum(),
            }
        }
    }

    impl Default for RawLineSearch {
        fn default() -> Self {
            let line_search = LineSearchSettings::default();
            Self {
                alpha_0: line_search.alpha_0(),
                max_iterations: line_search.max_iterations(),
                contraction: line_search.contraction(),
                debug_print: line_search.debug_print(),
            }
        }
    }

    impl TryFrom<RawSettings> for Settings {
        type Error = ConfigError;

        fn try_from(raw: RawSettings) -> Result<Self, Self::Error> {
            let algorithm: Algorithm = raw.algorithm.parse()?;
            let integrator: Integrator = raw.integrator.parse()?;
            let discretization = Discretization::new(raw.dt, raw.integration_steps, integrator)?;
            let line_search = LineSearchSettings::new(
                raw.line_search.alpha_0,
                raw.line_search.max_iterations,
                raw.line_search.contraction,
            )?
            .with_debug_print(raw.line_search.debug_print);

            let settings = Settings::new(algorithm, discretization)
                .with_workers(raw.workers)?
                .with_shot_length(raw.shot_length)?
                .with_merit_rho(raw.merit_rho)?
                .with_convergence(raw.min_cost_improvement, raw.max_defect_sum)?
                .with_line_search(line_search)
                .with_print_summary(raw.print_summary)
                .with_max_iterations(raw.max_iterations);

            Ok(settings)
        }
    }

    impl<'de> Deserialize<'de> for Settings {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: serde::Deserializer<'de>,
        {
            let raw = RawSettings::deserialize(deserializer)?;
            Settings::try_from(raw).map_err(serde::de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::transient::Integrator;

    #[test]
    fn parses_algorithm_names() {
        assert_eq!("gnms".parse::<Algorithm>(), Ok(Algorithm::MultipleShooting));
        assert_eq!(
            "Multiple_Shooting".parse::<Algorithm>(),
            Ok(Algorithm::MultipleShooting)
        );
        assert_eq!("ilqr".parse::<Algorithm>(), Ok(Algorithm::SingleShooting));
        assert_eq!(
            "single_shooting".parse::<Algorithm>(),
            Ok(Algorithm::SingleShooting)
        );
    }

    #[test]
    fn unknown_algorithm_is_a_config_error() {
        let result = "sqp".parse::<Algorithm>();
        assert_eq!(result, Err(ConfigError::UnknownAlgorithm("sqp".to_owned())));
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for algorithm in [Algorithm::MultipleShooting, Algorithm::SingleShooting] {
            assert_eq!(algorithm.to_string().parse::<Algorithm>(), Ok(algorithm));
        }
    }

    #[test]
    fn line_search_validation() {
        assert_eq!(
            LineSearchSettings::new(0.0, 5, 0.5),
            Err(ConfigError::InitialStepSize)
        );
        assert_eq!(
            LineSearchSettings::new(1.0, 5, 1.0),
            Err(ConfigError::Contraction)
        );
        assert_eq!(
            LineSearchSettings::new(1.0, 5, f64::NAN),
            Err(ConfigError::Contraction)
        );

        let ls = LineSearchSettings::new(0.8, 5, 0.3)
            .expect("valid")
            .with_debug_print(true);
        assert_eq!(ls.max_iterations(), 5);
        assert!(ls.debug_print());
    }

    #[test]
    fn settings_validation() {
        let settings = Settings::default();
        assert_eq!(settings.with_workers(0), Err(ConfigError::Workers));
        assert_eq!(settings.with_shot_length(0), Err(ConfigError::ShotLength));
        assert_eq!(settings.with_merit_rho(-1.0), Err(ConfigError::MeritRho));
        assert_eq!(
            settings.with_convergence(f64::NAN, 0.0),
            Err(ConfigError::MinCostImprovement)
        );
        assert_eq!(
            settings.with_convergence(0.0, -1.0),
            Err(ConfigError::MaxDefectSum)
        );
    }

    #[test]
    fn builder_keeps_values() {
        let disc = Discretization::new(0.05, 2, Integrator::Euler).expect("valid");
        let settings = Settings::new(Algorithm::SingleShooting, disc)
            .with_shot_length(5)
            .and_then(|s| s.with_merit_rho(2.5))
            .expect("valid")
            .with_print_summary(true);

        assert_eq!(settings.algorithm(), Algorithm::SingleShooting);
        assert_eq!(settings.discretization(), &disc);
        assert_eq!(settings.shot_length(), 5);
        assert!((settings.merit_rho() - 2.5).abs() < f64::EPSILON);
        assert!(settings.print_summary());
    }

    #[cfg(feature = "serde")]
    mod from_toml {
        use super::*;

        #[test]
        fn parses_toml() {
            let settings: Settings = toml::from_str(
                r#"
                algorithm = "gnms"
                dt = 0.02
                integration_steps = 4
                integrator = "euler"
                shot_length = 5
                merit_rho = 10.0

                [line_search]
                alpha_0 = 0.5
                max_iterations = 7
                contraction = 0.25
                debug_print = true
                "#,
            )
            .expect("valid settings");

            assert_eq!(settings.algorithm(), Algorithm::MultipleShooting);
            assert_eq!(settings.discretization().steps(), 4);
            assert_eq!(settings.discretization().integrator(), Integrator::Euler);
            assert_eq!(settings.shot_length(), 5);
            assert_eq!(settings.line_search().max_iterations(), 7);
            assert!(settings.line_search().debug_print());
            assert_eq!(settings.workers(), 1);
        }

        #[test]
        fn empty_document_gives_defaults() {
            let settings: Settings = toml::from_str("").expect("defaults");
            assert_eq!(settings, Settings::default());
        }

        #[test]
        fn unknown_algorithm_fails_to_parse() {
            let result: Result<Settings, _> = toml::from_str(r#"algorithm = "newton""#);
            let message = result.expect_err("unknown algorithm").to_string();
            assert!(message.contains("unknown algorithm `newton`"), "{message}");
        }

        #[test]
        fn invalid_values_fail_to_parse() {
            let result: Result<Settings, _> = toml::from_str("shot_length = 0");
            assert!(result.is_err());

            let result: Result<Settings, _> = toml::from_str("dt = -1.0");
            assert!(result.is_err());
        }
    }
}
