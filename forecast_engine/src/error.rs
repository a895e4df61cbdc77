//! Error types for the forecast_engine crate

use thiserror::Error;
use timeline::TimelineError;

/// Custom error types for the forecast_engine crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Error from the canonical timeline (unparseable dates, bad offsets)
    #[error("Timeline error: {0}")]
    Timeline(#[from] TimelineError),

    /// Not enough observations to synthesize a forecast
    #[error("Insufficient history: need at least {required} observations, have {actual}")]
    InsufficientHistory { required: usize, actual: usize },

    /// Error related to request validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Error from the remote statistical backend or its transport
    #[error("Remote call error: {0}")]
    RemoteCall(String),

    /// Error in the local synthesis path
    #[error("Synthesis error: {0}")]
    Synthesis(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error from configuration loading or validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from JSON (de)serialization
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<toml::de::Error> for ForecastError {
    fn from(err: toml::de::Error) -> Self {
        ForecastError::Config(err.to_string())
    }
}

impl ForecastError {
    /// Whether the error is a validation failure reported before any work starts
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ForecastError::InsufficientHistory { .. }
                | ForecastError::Validation(_)
                | ForecastError::InvalidParameter(_)
        )
    }
}
