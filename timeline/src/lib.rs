//! # Timeline
//!
//! Canonical timeline handling for forecasting series.
//! This crate turns heterogeneous date encodings into calendar days,
//! infers how often a series is sampled and enumerates the future
//! periods a forecast may cover:
//! - Date normalization (spreadsheet serials, `DD/MM/YYYY`, `YYYY-MM-DD`)
//! - Sampling frequency inference
//! - Forecast horizon generation
//!
//! Everything here is deterministic. Randomness lives in the forecast
//! engine, never in date math.

use thiserror::Error;

pub mod date;
pub mod frequency;
pub mod horizon;

pub use date::{normalize, CanonicalTimestamp, RawDateValue};
pub use frequency::{infer, infer_detailed, FrequencyKind, FrequencyProfile, InferenceReport};
pub use horizon::{HorizonCandidate, HorizonGenerator, HorizonLimits};

/// Errors that can occur while building a timeline
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimelineError {
    #[error("Unparseable date: {raw}")]
    UnparseableDate { raw: String },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type for timeline operations
pub type Result<T> = std::result::Result<T, TimelineError>;

impl TimelineError {
    pub(crate) fn unparseable(raw: impl ToString) -> Self {
        TimelineError::UnparseableDate {
            raw: raw.to_string(),
        }
    }
}
