//! Error types for the precession crate.
//!
//! Every failure here is fatal for the run that raised it: there are no
//! retries, and no partial trajectory is returned as a final result.

use thiserror::Error;

/// Result alias used throughout the library.
pub type SimResult<T> = Result<T, PrecessionError>;

#[derive(Debug, Error)]
pub enum PrecessionError {
    /// Orbital elements that cannot describe a bound orbit.
    #[error("invalid orbit parameters for '{body}': {reason}")]
    InvalidOrbitParameters { body: String, reason: String },

    /// Solver method identifier other than the supported RK4.
    #[error("unknown integration method '{0}' (supported: RungeKutta4)")]
    UnknownIntegrationMethod(String),

    /// A derivative stage or the next state contained NaN or Inf.
    #[error("numerical divergence at t = {time:.9}: non-finite {stage}")]
    NumericalDivergence { time: f64, stage: &'static str },

    /// The parsed document was not a mapping of named fields.
    #[error("configuration type error: expected a mapping of named fields, found {found}")]
    ConfigType { found: &'static str },

    /// Parameter outside its admissible range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PrecessionError {
    pub fn invalid_orbit(body: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOrbitParameters {
            body: body.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}
