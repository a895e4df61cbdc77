//! Forecast synthesis
//!
//! A forecast is produced by an [`Estimator`]. The built-in
//! [`SyntheticEstimator`] builds a structurally consistent trajectory for
//! each model family (level, family-specific trend and seasonality, bounded
//! noise, confidence bounds, plausible fit metrics and parameter estimates)
//! without fitting anything. A genuine statistical estimator implements the
//! same trait and replaces it without touching callers.

use crate::config::SynthesisConfig;
use crate::error::{ForecastError, Result};
use crate::family::{FamilyOrder, ModelFamily};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use std::fmt::Debug;
use timeline::{FrequencyProfile, HorizonCandidate};
use tracing::warn;

pub mod arima;
pub mod exponential_smoothing;
pub mod noise;
pub mod prophet;
pub mod sarima;

pub use noise::{FixedNoise, NoiseSource, RandomNoise};

/// Minimum number of observations any family accepts
pub const MIN_HISTORY: usize = 2;

/// A future period a forecast point is produced for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastPeriod {
    pub label: String,
    pub date: Option<NaiveDate>,
}

impl ForecastPeriod {
    /// Period known only by its position after the last observation
    pub fn generic(offset: usize) -> Self {
        Self {
            label: format!("Período +{}", offset),
            date: None,
        }
    }
}

impl From<HorizonCandidate> for ForecastPeriod {
    fn from(candidate: HorizonCandidate) -> Self {
        Self {
            label: candidate.label,
            date: Some(candidate.starts_on),
        }
    }
}

/// One forecast step with its confidence bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub period: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub point_estimate: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

impl ForecastPoint {
    /// Point with symmetric bounds `margin × |estimate|` around the estimate
    pub fn with_margin(period: &ForecastPeriod, estimate: f64, margin: f64) -> Self {
        let spread = estimate.abs() * margin.abs();
        Self {
            period: period.label.clone(),
            date: period.date,
            point_estimate: estimate,
            lower_bound: estimate - spread,
            upper_bound: estimate + spread,
        }
    }

    /// Point with arbitrary bounds, reordered so that lower ≤ estimate ≤ upper
    pub fn with_bounds(
        period: impl Into<String>,
        date: Option<NaiveDate>,
        estimate: f64,
        lower: f64,
        upper: f64,
    ) -> Self {
        Self {
            period: period.into(),
            date,
            point_estimate: estimate,
            lower_bound: lower.min(upper).min(estimate),
            upper_bound: upper.max(lower).max(estimate),
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.lower_bound <= self.point_estimate && self.point_estimate <= self.upper_bound
    }
}

/// Fit metrics; families report different subsets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FitMetrics {
    #[serde(default)]
    pub mape: Option<f64>,
    #[serde(default)]
    pub rmse: Option<f64>,
    #[serde(default)]
    pub mae: Option<f64>,
    #[serde(default)]
    pub r2: Option<f64>,
    #[serde(default)]
    pub aic: Option<f64>,
    #[serde(default)]
    pub bic: Option<f64>,
}

impl FitMetrics {
    /// Drop non-finite values and clamp `mape ≥ 0`, `0 ≤ r2 ≤ 1`
    pub fn sanitized(self) -> Self {
        let finite = |value: Option<f64>| value.filter(|v| v.is_finite());
        Self {
            mape: finite(self.mape).map(|v| v.max(0.0)),
            rmse: finite(self.rmse).map(|v| v.max(0.0)),
            mae: finite(self.mae).map(|v| v.max(0.0)),
            r2: finite(self.r2).map(|v| v.clamp(0.0, 1.0)),
            aic: finite(self.aic),
            bic: finite(self.bic),
        }
    }

    /// Flat name → value projection of the metrics that are present
    pub fn flatten(&self) -> BTreeMap<String, f64> {
        [
            ("mape", self.mape),
            ("rmse", self.rmse),
            ("mae", self.mae),
            ("r2", self.r2),
            ("aic", self.aic),
            ("bic", self.bic),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name.to_string(), v)))
        .collect()
    }
}

/// Parameter estimates reported for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum ParamEstimates {
    Arima {
        ar: Vec<f64>,
        ma: Vec<f64>,
        intercept: f64,
        sigma2: f64,
    },
    Sarima {
        ar: Vec<f64>,
        ma: Vec<f64>,
        seasonal_ar: Vec<f64>,
        seasonal_ma: Vec<f64>,
        seasonal_period: usize,
        sigma2: f64,
    },
    ExponentialSmoothing {
        alpha: f64,
        beta: Option<f64>,
        gamma: Option<f64>,
        phi: Option<f64>,
        initial_level: f64,
    },
    Prophet {
        growth_rate: f64,
        offset: f64,
        capacity: Option<f64>,
        seasonal_period: Option<usize>,
        changepoint_prior_scale: f64,
    },
}

/// Everything an estimator needs to forecast one series
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    pub history: Vec<f64>,
    pub order: FamilyOrder,
    pub profile: FrequencyProfile,
    /// One entry per forecast step
    pub periods: Vec<ForecastPeriod>,
}

impl SynthesisRequest {
    pub fn new(
        history: Vec<f64>,
        order: FamilyOrder,
        profile: FrequencyProfile,
        periods: Vec<ForecastPeriod>,
    ) -> Self {
        Self {
            history,
            order,
            profile,
            periods,
        }
    }

    /// Request whose periods are labelled by position only
    pub fn with_generic_periods(
        history: Vec<f64>,
        order: FamilyOrder,
        profile: FrequencyProfile,
        horizon: usize,
    ) -> Self {
        let periods = (1..=horizon).map(ForecastPeriod::generic).collect();
        Self::new(history, order, profile, periods)
    }

    pub fn horizon_length(&self) -> usize {
        self.periods.len()
    }
}

/// Forecast, metrics and parameters produced by an estimator
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    pub forecast: Vec<ForecastPoint>,
    pub fit_metrics: FitMetrics,
    pub params: ParamEstimates,
    /// Soft-guard messages (e.g. short history for a seasonal family)
    pub warnings: Vec<String>,
}

/// Common interface for anything that turns a history into a forecast
pub trait Estimator: Debug + Send + Sync {
    /// Name of the estimator
    fn name(&self) -> &str;

    /// Produce a forecast for every period of the request
    fn estimate(&self, request: &SynthesisRequest, noise: &mut dyn NoiseSource)
        -> Result<Synthesis>;
}

/// Per-family synthesis strategy
pub trait ForecastSynthesizer {
    fn family(&self) -> ModelFamily;

    fn synthesize(
        &self,
        series: &SeriesSummary,
        request: &SynthesisRequest,
        tuning: &SynthesisConfig,
        noise: &mut dyn NoiseSource,
    ) -> Result<Synthesis>;
}

/// Estimator that synthesizes trajectories instead of fitting models
#[derive(Debug, Clone, Default)]
pub struct SyntheticEstimator {
    tuning: SynthesisConfig,
}

impl SyntheticEstimator {
    pub fn new(tuning: SynthesisConfig) -> Self {
        Self { tuning }
    }

    fn strategy(order: &FamilyOrder) -> &dyn ForecastSynthesizer {
        match order {
            FamilyOrder::Arima(order) => order,
            FamilyOrder::Sarima(order) => order,
            FamilyOrder::ExponentialSmoothing(order) => order,
            FamilyOrder::Prophet(order) => order,
        }
    }
}

impl Estimator for SyntheticEstimator {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn estimate(
        &self,
        request: &SynthesisRequest,
        noise: &mut dyn NoiseSource,
    ) -> Result<Synthesis> {
        let series = validate_request(request)?;
        let synthesis =
            Self::strategy(&request.order).synthesize(&series, request, &self.tuning, noise)?;

        if let Some(point) = synthesis.forecast.iter().find(|p| !p.is_consistent()) {
            return Err(ForecastError::Synthesis(format!(
                "Inconsistent bounds for {}: {} <= {} <= {} does not hold",
                point.period, point.lower_bound, point.point_estimate, point.upper_bound
            )));
        }
        Ok(synthesis)
    }
}

/// Check the shared preconditions and summarize the history
pub fn validate_request(request: &SynthesisRequest) -> Result<SeriesSummary> {
    request.order.validate()?;
    if request.periods.is_empty() {
        return Err(ForecastError::Validation(
            "Forecast horizon must contain at least one period".to_string(),
        ));
    }
    SeriesSummary::from_history(&request.history)
}

/// Summary statistics of a history
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesSummary {
    pub first: f64,
    pub last: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub len: usize,
}

impl SeriesSummary {
    pub fn from_history(history: &[f64]) -> Result<Self> {
        if history.len() < MIN_HISTORY {
            return Err(ForecastError::InsufficientHistory {
                required: MIN_HISTORY,
                actual: history.len(),
            });
        }
        if let Some(index) = history.iter().position(|v| !v.is_finite()) {
            return Err(ForecastError::Validation(format!(
                "Invalid value at index {}: {}",
                index, history[index]
            )));
        }

        Ok(Self {
            first: history[0],
            last: history[history.len() - 1],
            mean: history.mean(),
            std_dev: history.std_dev(),
            len: history.len(),
        })
    }

    /// Magnitude used to scale noise and metrics; never zero
    pub fn scale(&self) -> f64 {
        let scale = self.mean.abs().max(self.last.abs());
        if scale > f64::EPSILON {
            scale
        } else {
            1.0
        }
    }
}

/// Sinusoidal seasonal factor in [-1, 1] for `step` on a cycle of `period`
pub(crate) fn seasonal_wave(step: usize, period: usize) -> f64 {
    if period <= 1 {
        return 0.0;
    }
    (2.0 * std::f64::consts::PI * step as f64 / period as f64).sin()
}

/// Ranges fit metrics are drawn from
#[derive(Debug, Clone, Copy)]
pub(crate) struct MetricRanges {
    pub mape: (f64, f64),
    pub r2: (f64, f64),
    pub information_criteria: bool,
}

/// Draw plausible fit metrics for a history of `summary.len` points
///
/// `parameter_count` feeds the AIC/BIC penalty terms.
pub(crate) fn draw_metrics(
    summary: &SeriesSummary,
    ranges: MetricRanges,
    parameter_count: usize,
    noise: &mut dyn NoiseSource,
) -> FitMetrics {
    let mape = noise.uniform(ranges.mape.0, ranges.mape.1);
    let r2 = noise.uniform(ranges.r2.0, ranges.r2.1);
    let mae = summary.scale() * mape / 100.0;
    let rmse = mae * noise.uniform(1.1, 1.3);

    let (aic, bic) = if ranges.information_criteria {
        let n = summary.len as f64;
        let k = parameter_count as f64;
        let log_likelihood_term = n * rmse.powi(2).max(f64::MIN_POSITIVE).ln();
        (
            Some(log_likelihood_term + 2.0 * k),
            Some(log_likelihood_term + k * n.ln()),
        )
    } else {
        (None, None)
    };

    FitMetrics {
        mape: Some(mape),
        rmse: Some(rmse),
        mae: Some(mae),
        r2: Some(r2),
        aic,
        bic,
    }
    .sanitized()
}

/// Draw `count` coefficients with magnitudes decaying by lag
pub(crate) fn draw_coefficients(
    count: usize,
    low: f64,
    high: f64,
    noise: &mut dyn NoiseSource,
) -> Vec<f64> {
    (0..count)
        .map(|lag| noise.uniform(low, high) / (lag + 1) as f64)
        .collect()
}

/// Warn when a seasonal family sees fewer than two full cycles
pub(crate) fn seasonal_history_warning(
    family: ModelFamily,
    summary: &SeriesSummary,
    period: usize,
) -> Option<String> {
    if period > 1 && summary.len < 2 * period {
        let message = format!(
            "{} with seasonal period {} works best with at least {} observations, got {}",
            family,
            period,
            2 * period,
            summary.len
        );
        warn!(family = %family, period, observations = summary.len, "Short history for seasonal model");
        Some(message)
    } else {
        None
    }
}
