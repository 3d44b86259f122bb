//! Error types for histogram fitting and quantum error bar extraction
//!
//! Provides a unified error type for all quantum error bars crates. The
//! variants follow the failure classes of the analysis pipeline:
//! configuration problems are rejected up front, numerical infeasibility is
//! reported as a fit failure, and a model without a converter is reported as
//! a capability error distinct from both.

use thiserror::Error;

/// Core error type for histogram analysis operations
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid configuration supplied to the analysis (fatal at construction)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid parameter provided to a function
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Insufficient data for the requested operation
    #[error("Insufficient data: expected at least {expected} points, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    /// The least-squares solver could not produce a fit
    #[error("Fit failed: {0}")]
    FitFailed(String),

    /// The fit model has no converter to quantum error bars
    #[error(
        "No converter available for fit model '{model}': quantum error bars cannot be computed"
    )]
    MissingConverter { model: String },

    /// The fitted coefficients describe a curve with the wrong curvature sign
    #[error("Invalid curvature: {0}")]
    InvalidCurvature(String),

    /// Numerical computation error
    #[error("Computation error: {0}")]
    Computation(String),

    /// Malformed text input (CSV cells and the like)
    #[error("Parse error: {0}")]
    Parse(String),

    /// IO error (for file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

// Helper functions for common error patterns

impl Error {
    /// Create an error for size mismatch
    pub fn size_mismatch(expected: usize, actual: usize, context: &str) -> Self {
        Self::InvalidInput(format!(
            "Size mismatch in {context}: expected {expected}, got {actual}"
        ))
    }

    /// Create an error for NaN/Inf values
    pub fn non_finite(context: &str) -> Self {
        Self::Computation(format!("{context} contains NaN or infinite values"))
    }

    /// Create an error for an unknown built-in fit model name
    pub fn unknown_model(name: &str) -> Self {
        Self::Configuration(format!("Invalid fit model name: {name}"))
    }

    /// Create an error for an `ftox=(h,s)` scale outside {+1, -1}
    pub fn invalid_scale(s: f64) -> Self {
        Self::Configuration(format!(
            "Invalid value of `s` in `ftox=(h,s)`: s={s} (must be +1 or -1)"
        ))
    }

    /// Create a capability error for a converterless model
    pub fn missing_converter(model: &str) -> Self {
        Self::MissingConverter {
            model: model.to_string(),
        }
    }

    /// Whether this error was raised while validating configuration
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}
