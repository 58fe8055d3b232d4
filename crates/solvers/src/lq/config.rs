use thiserror::Error;

/// Configuration for the Riccati solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    control_regularization: f64,
}

/// Errors that can occur when validating an LQ solver config.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("control_regularization must be finite and non-negative")]
    ControlRegularization,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            control_regularization: 0.0,
        }
    }
}

impl Config {
    /// Creates a new config.
    ///
    /// `control_regularization` is added to the diagonal of the control
    /// Hessian at every stage.
    ///
    /// # Errors
    ///
    /// Returns an error if the regularization is negative or non-finite.
    pub fn new(control_regularization: f64) -> Result<Self, ConfigError> {
        if !control_regularization.is_finite() || control_regularization < 0.0 {
            return Err(ConfigError::ControlRegularization);
        }
        Ok(Self {
            control_regularization,
        })
    }

    /// Returns the control Hessian regularization.
    #[must_use]
    pub fn control_regularization(&self) -> f64 {
        self.control_regularization
    }
}
