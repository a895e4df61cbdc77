//! Three-tier model execution: remote backend, local fallback, emergency fallback
//!
//! ```text
//! IDLE -> CALLING_REMOTE -> SUCCEEDED (REMOTE)
//!              |
//!              v
//!         FALLING_BACK -> SUCCEEDED (LOCAL_FALLBACK)
//!              |
//!              v
//!   EMERGENCY_FALLING_BACK -> SUCCEEDED (EMERGENCY_FALLBACK) | FAILED
//! ```
//!
//! Validation failures are reported before any of this starts. Transport and
//! backend failures are absorbed by the local fallback; a failure while
//! preparing the request, handling the response or synthesizing locally
//! moves to the emergency path, which works from the raw rows with lenient
//! parsing. Only a failure of the emergency path itself reaches the caller.

use crate::config::EngineConfig;
use crate::error::{ForecastError, Result};
use crate::family::{FamilyOrder, ModelFamily};
use crate::quality::{classify, QualityLabel};
use crate::remote::{request_parameters, RemoteBackend, RemotePayload, RemoteResponse, Row};
use crate::synthesis::{
    Estimator, FitMetrics, ForecastPeriod, ForecastPoint, ParamEstimates, RandomNoise, Synthesis,
    SynthesisRequest, SyntheticEstimator, MIN_HISTORY,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use timeline::{infer_detailed, normalize, FrequencyProfile, HorizonGenerator, RawDateValue};
use tracing::{debug, info, warn};

/// Where a result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultSource {
    Remote,
    LocalFallback,
    EmergencyFallback,
}

impl ResultSource {
    /// Human-facing label
    pub fn label(self) -> &'static str {
        match self {
            ResultSource::Remote => "Servidor",
            ResultSource::LocalFallback => "Local",
            ResultSource::EmergencyFallback => "Emergência",
        }
    }

    /// Whether the result was synthesized rather than fitted remotely
    pub fn is_fallback(self) -> bool {
        !matches!(self, ResultSource::Remote)
    }
}

impl fmt::Display for ResultSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Execution state of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Idle,
    CallingRemote,
    FallingBack,
    EmergencyFallingBack,
    Succeeded,
    Failed,
}

impl RunnerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunnerState::Succeeded | RunnerState::Failed)
    }
}

impl fmt::Display for RunnerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunnerState::Idle => "IDLE",
            RunnerState::CallingRemote => "CALLING_REMOTE",
            RunnerState::FallingBack => "FALLING_BACK",
            RunnerState::EmergencyFallingBack => "EMERGENCY_FALLING_BACK",
            RunnerState::Succeeded => "SUCCEEDED",
            RunnerState::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Parameters as reported by whoever produced the forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelParams {
    Estimated(ParamEstimates),
    Remote(Map<String, Value>),
}

/// Outcome of one model run; immutable once returned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResult {
    pub family: ModelFamily,
    pub order: FamilyOrder,
    pub params: ModelParams,
    pub forecast: Vec<ForecastPoint>,
    pub fit_metrics: FitMetrics,
    pub quality: QualityLabel,
    pub source: ResultSource,
    pub frequency: FrequencyProfile,
    #[serde(default)]
    pub warnings: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// A request to run one model on a table of rows
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub order: FamilyOrder,
    pub rows: Vec<Row>,
    /// Column holding the series values
    pub value_column: String,
    /// Column holding the observation dates, if the table has one
    pub date_column: Option<String>,
    pub horizon_length: usize,
    /// Periods between the last observation and the first forecast period
    pub start_offset: u32,
}

impl ModelRequest {
    pub fn new(
        order: FamilyOrder,
        rows: Vec<Row>,
        value_column: impl Into<String>,
        horizon_length: usize,
    ) -> Self {
        Self {
            order,
            rows,
            value_column: value_column.into(),
            date_column: None,
            horizon_length,
            start_offset: 1,
        }
    }

    pub fn with_date_column(mut self, column: impl Into<String>) -> Self {
        self.date_column = Some(column.into());
        self
    }

    pub fn with_start_offset(mut self, offset: u32) -> Self {
        self.start_offset = offset;
        self
    }

    /// Checks that must pass before any work starts
    pub fn validate(&self) -> Result<()> {
        if self.value_column.trim().is_empty() {
            return Err(ForecastError::Validation(
                "A value column must be selected".to_string(),
            ));
        }
        if self.horizon_length == 0 {
            return Err(ForecastError::Validation(
                "Forecast horizon must contain at least one period".to_string(),
            ));
        }
        if self.start_offset == 0 {
            return Err(ForecastError::Validation(
                "Forecast must start after the last observation".to_string(),
            ));
        }
        self.order.validate()?;

        let usable = self.numeric_rows().len();
        if usable < MIN_HISTORY {
            return Err(ForecastError::InsufficientHistory {
                required: MIN_HISTORY,
                actual: usable,
            });
        }
        Ok(())
    }

    /// Every value must be numeric; ordered by observation date
    fn strict_values(&self) -> Result<Vec<f64>> {
        let indexed = self
            .rows
            .iter()
            .enumerate()
            .map(|(index, row)| {
                row.get(&self.value_column)
                    .and_then(numeric_value)
                    .map(|value| (index, value))
                    .ok_or_else(|| {
                        ForecastError::Validation(format!(
                            "Row {} has no numeric value in column '{}'",
                            index, self.value_column
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(self.in_date_order(indexed))
    }

    /// Non-numeric values are skipped; row order is kept when too few dates parse
    fn lenient_values(&self) -> Vec<f64> {
        let indexed = self.numeric_rows();
        let ordered = self.in_date_order(indexed.clone());
        if ordered.len() >= MIN_HISTORY {
            ordered
        } else {
            indexed.into_iter().map(|(_, value)| value).collect()
        }
    }

    /// Row index and value of every row with a numeric value
    fn numeric_rows(&self) -> Vec<(usize, f64)> {
        self.rows
            .iter()
            .enumerate()
            .filter_map(|(index, row)| {
                row.get(&self.value_column)
                    .and_then(numeric_value)
                    .map(|value| (index, value))
            })
            .collect()
    }

    /// Sort values by their row's date, dropping rows whose date does not parse
    ///
    /// Without a date column the row order is the observation order.
    fn in_date_order(&self, indexed: Vec<(usize, f64)>) -> Vec<f64> {
        if self.date_column.is_none() {
            return indexed.into_iter().map(|(_, value)| value).collect();
        }

        let dates = self.raw_dates();
        let mut dated: Vec<(i64, f64)> = indexed
            .into_iter()
            .filter_map(|(index, value)| {
                let timestamp = normalize(dates.get(index)?).ok()?;
                Some((timestamp.epoch_millis(), value))
            })
            .collect();
        dated.sort_by_key(|(millis, _)| *millis);
        dated.into_iter().map(|(_, value)| value).collect()
    }

    fn raw_dates(&self) -> Vec<RawDateValue> {
        let Some(column) = &self.date_column else {
            return Vec::new();
        };
        self.rows
            .iter()
            .map(|row| match row.get(column) {
                Some(Value::Number(n)) => RawDateValue::Serial(n.as_f64().unwrap_or(f64::NAN)),
                Some(Value::String(s)) => RawDateValue::Text(s.clone()),
                Some(other) => RawDateValue::Text(other.to_string()),
                None => RawDateValue::Text(String::new()),
            })
            .collect()
    }
}

fn numeric_value(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<f64>()
                .ok()
                .or_else(|| trimmed.replace(',', ".").parse::<f64>().ok())
        }
        _ => None,
    };
    number.filter(|v| v.is_finite())
}

/// History, frequency and labelled periods ready for an estimator or backend
#[derive(Debug, Clone)]
struct PreparedSeries {
    history: Vec<f64>,
    profile: FrequencyProfile,
    periods: Vec<ForecastPeriod>,
}

/// Tracks and logs state transitions of one run
struct Transitions {
    family: ModelFamily,
    state: RunnerState,
}

impl Transitions {
    fn new(family: ModelFamily) -> Self {
        Self {
            family,
            state: RunnerState::Idle,
        }
    }

    fn advance(&mut self, next: RunnerState) {
        debug_assert!(
            !self.state.is_terminal(),
            "no transition leaves {}",
            self.state
        );
        debug!(family = %self.family, from = %self.state, to = %next, "Runner state transition");
        self.state = next;
    }
}

/// Runs models through the remote → fallback → emergency chain
#[derive(Clone)]
pub struct ModelRunner {
    backend: Option<Arc<dyn RemoteBackend>>,
    estimator: Arc<dyn Estimator>,
    horizon: HorizonGenerator,
    config: EngineConfig,
}

impl fmt::Debug for ModelRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRunner")
            .field("has_backend", &self.backend.is_some())
            .field("estimator", &self.estimator.name())
            .field("config", &self.config)
            .finish()
    }
}

impl Default for ModelRunner {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl ModelRunner {
    /// Runner with the synthetic estimator and no backend
    pub fn new(config: EngineConfig) -> Self {
        Self {
            backend: None,
            estimator: Arc::new(SyntheticEstimator::new(config.synthesis.clone())),
            horizon: HorizonGenerator::new(config.horizon.clone()),
            config,
        }
    }

    pub fn with_backend(mut self, backend: Arc<dyn RemoteBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Replace the synthetic estimator, e.g. with a genuine statistical fit
    pub fn with_estimator(mut self, estimator: Arc<dyn Estimator>) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one model
    ///
    /// `reachable` gates the remote call; when false (or when no backend is
    /// configured) the run goes straight to the local fallback.
    pub async fn run(&self, request: &ModelRequest, reachable: bool) -> Result<ModelResult> {
        request.validate()?;
        self.check_horizon(request)?;

        let family = request.order.family();
        let mut transitions = Transitions::new(family);

        let primary = match self.prepare(request) {
            Ok(prepared) => {
                self.remote_or_fallback(request, prepared, reachable, &mut transitions)
                    .await
            }
            Err(err) => Err(err),
        };

        let result = match primary {
            Ok(result) => result,
            Err(err) => {
                warn!(family = %family, error = %err, "Entering emergency fallback");
                transitions.advance(RunnerState::EmergencyFallingBack);
                match self.emergency(request) {
                    Ok(result) => result,
                    Err(emergency_err) => {
                        transitions.advance(RunnerState::Failed);
                        return Err(ForecastError::Synthesis(format!(
                            "Emergency fallback failed for {}: {}",
                            family, emergency_err
                        )));
                    }
                }
            }
        };

        transitions.advance(RunnerState::Succeeded);
        info!(
            family = %family,
            source = ?result.source,
            fallback = result.source.is_fallback(),
            quality = %result.quality,
            periods = result.forecast.len(),
            "Model run completed"
        );
        Ok(result)
    }

    /// Horizon length must stay within the limit of the series frequency
    fn check_horizon(&self, request: &ModelRequest) -> Result<()> {
        let profile = match request.date_column {
            Some(_) => infer_detailed(&request.raw_dates()).profile,
            None => FrequencyProfile::default(),
        };
        let limit = self.horizon.limits().limit_for(profile.kind);
        if request.horizon_length > limit {
            return Err(ForecastError::Validation(format!(
                "Horizon of {} periods exceeds the {} limit of {}",
                request.horizon_length, profile.kind, limit
            )));
        }
        Ok(())
    }

    async fn remote_or_fallback(
        &self,
        request: &ModelRequest,
        prepared: PreparedSeries,
        reachable: bool,
        transitions: &mut Transitions,
    ) -> Result<ModelResult> {
        match (&self.backend, reachable) {
            (Some(backend), true) => {
                transitions.advance(RunnerState::CallingRemote);
                match self.call_remote(backend.as_ref(), request).await {
                    Ok(response) if response.success => {
                        let payload = response.into_payload(&prepared.periods)?;
                        return Ok(self.remote_result(request, prepared, payload));
                    }
                    Ok(response) => {
                        warn!(
                            error = response.error.as_deref().unwrap_or("no success flag"),
                            "Remote backend did not succeed, falling back"
                        );
                    }
                    Err(err) => {
                        warn!(error = %err, "Remote call failed, falling back");
                    }
                }
            }
            (Some(_), false) => debug!("Backend unreachable, skipping remote call"),
            (None, _) => debug!("No remote backend configured"),
        }

        transitions.advance(RunnerState::FallingBack);
        let synthesis = self.synthesize(request, &prepared)?;
        Ok(self.synthesized_result(
            request,
            prepared.profile,
            synthesis,
            ResultSource::LocalFallback,
        ))
    }

    async fn call_remote(
        &self,
        backend: &dyn RemoteBackend,
        request: &ModelRequest,
    ) -> Result<RemoteResponse> {
        let parameters = request_parameters(
            &request.order,
            &request.value_column,
            request.date_column.as_deref(),
            request.horizon_length,
            request.start_offset,
        );
        let call = backend.run_model(request.order.model_kind(), &request.rows, &parameters);

        match self.config.remote.timeout() {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                ForecastError::RemoteCall(format!(
                    "No response within {} ms",
                    self.config.remote.timeout_ms
                ))
            })?,
            None => call.await,
        }
    }

    /// Strict preparation: every value numeric, a parseable last date
    fn prepare(&self, request: &ModelRequest) -> Result<PreparedSeries> {
        let history = request.strict_values()?;
        if request.date_column.is_none() {
            return Ok(PreparedSeries {
                history,
                profile: FrequencyProfile::default(),
                periods: generic_periods(request)?,
            });
        }

        let report = infer_detailed(&request.raw_dates());
        let last = report.last_date.ok_or_else(|| {
            ForecastError::Validation("No parseable date in the date column".to_string())
        })?;
        let periods = self
            .horizon
            .periods(
                &report.profile,
                &RawDateValue::Native(last.date()),
                request.start_offset,
                request.horizon_length,
            )?
            .into_iter()
            .map(ForecastPeriod::from)
            .collect();

        Ok(PreparedSeries {
            history,
            profile: report.profile,
            periods,
        })
    }

    /// Lenient preparation from the raw rows; never fails on dates
    fn prepare_leniently(&self, request: &ModelRequest) -> PreparedSeries {
        let history = request.lenient_values();
        let report = infer_detailed(&request.raw_dates());
        let periods = report.last_date.and_then(|last| {
            self.horizon
                .periods(
                    &report.profile,
                    &RawDateValue::Native(last.date()),
                    request.start_offset,
                    request.horizon_length,
                )
                .ok()
        });

        match periods {
            Some(periods) => PreparedSeries {
                history,
                profile: report.profile,
                periods: periods.into_iter().map(ForecastPeriod::from).collect(),
            },
            None => PreparedSeries {
                history,
                profile: FrequencyProfile::default(),
                periods: generic_periods(request).unwrap_or_default(),
            },
        }
    }

    fn synthesize(&self, request: &ModelRequest, prepared: &PreparedSeries) -> Result<Synthesis> {
        let synthesis_request = SynthesisRequest::new(
            prepared.history.clone(),
            request.order.clone(),
            prepared.profile.clone(),
            prepared.periods.clone(),
        );
        let mut noise = RandomNoise::from_seed(self.config.synthesis.seed);
        self.estimator.estimate(&synthesis_request, &mut noise)
    }

    fn emergency(&self, request: &ModelRequest) -> Result<ModelResult> {
        let prepared = self.prepare_leniently(request);
        let synthesis = self.synthesize(request, &prepared)?;
        Ok(self.synthesized_result(
            request,
            prepared.profile,
            synthesis,
            ResultSource::EmergencyFallback,
        ))
    }

    fn remote_result(
        &self,
        request: &ModelRequest,
        prepared: PreparedSeries,
        payload: RemotePayload,
    ) -> ModelResult {
        let family = request.order.family();
        ModelResult {
            family,
            order: request.order.clone(),
            params: ModelParams::Remote(payload.params),
            quality: classify(&payload.fit_metrics, family),
            forecast: payload.forecast,
            fit_metrics: payload.fit_metrics,
            source: ResultSource::Remote,
            frequency: prepared.profile,
            warnings: Vec::new(),
            generated_at: Utc::now(),
        }
    }

    fn synthesized_result(
        &self,
        request: &ModelRequest,
        profile: FrequencyProfile,
        synthesis: Synthesis,
        source: ResultSource,
    ) -> ModelResult {
        let family = request.order.family();
        ModelResult {
            family,
            order: request.order.clone(),
            params: ModelParams::Estimated(synthesis.params),
            quality: classify(&synthesis.fit_metrics, family),
            forecast: synthesis.forecast,
            fit_metrics: synthesis.fit_metrics,
            source,
            frequency: profile,
            warnings: synthesis.warnings,
            generated_at: Utc::now(),
        }
    }
}

fn generic_periods(request: &ModelRequest) -> Result<Vec<ForecastPeriod>> {
    let first = request.start_offset as usize;
    let end = first.checked_add(request.horizon_length).ok_or_else(|| {
        ForecastError::Validation(format!(
            "Horizon of {} periods from offset {} is out of range",
            request.horizon_length, first
        ))
    })?;
    Ok((first..end).map(ForecastPeriod::generic).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::ArimaOrder;
    use serde_json::json;

    fn rows(values: &[Value]) -> Vec<Row> {
        values
            .iter()
            .map(|v| {
                let mut row = Row::new();
                row.insert("valor".to_string(), v.clone());
                row
            })
            .collect()
    }

    #[test]
    fn test_validation_counts_usable_values() {
        let request = ModelRequest::new(
            FamilyOrder::Arima(ArimaOrder::default()),
            rows(&[json!(1.0), json!("abc"), json!(null)]),
            "valor",
            3,
        );
        assert!(matches!(
            request.validate(),
            Err(ForecastError::InsufficientHistory {
                required: 2,
                actual: 1
            })
        ));

        let empty_column = ModelRequest::new(
            FamilyOrder::Arima(ArimaOrder::default()),
            rows(&[json!(1.0), json!(2.0)]),
            " ",
            3,
        );
        assert!(empty_column.validate().unwrap_err().is_validation());
    }

    #[test]
    fn test_numeric_values_accept_decimal_comma() {
        assert_eq!(numeric_value(&json!("12,5")), Some(12.5));
        assert_eq!(numeric_value(&json!(" 7 ")), Some(7.0));
        assert_eq!(numeric_value(&json!(true)), None);
    }

    #[test]
    fn test_generic_periods_follow_start_offset() {
        let request = ModelRequest::new(
            FamilyOrder::Arima(ArimaOrder::default()),
            rows(&[json!(1.0), json!(2.0)]),
            "valor",
            2,
        )
        .with_start_offset(3);
        let labels: Vec<String> = generic_periods(&request)
            .unwrap()
            .into_iter()
            .map(|p| p.label)
            .collect();
        assert_eq!(labels, vec!["Período +3", "Período +4"]);
    }

    #[test]
    fn test_generic_periods_reject_overflowing_horizon() {
        let request = ModelRequest::new(
            FamilyOrder::Arima(ArimaOrder::default()),
            rows(&[json!(1.0), json!(2.0)]),
            "valor",
            usize::MAX,
        )
        .with_start_offset(3);
        assert!(matches!(
            generic_periods(&request),
            Err(ForecastError::Validation(_))
        ));
    }

    #[test]
    fn test_transitions_end_in_terminal_state() {
        let mut transitions = Transitions::new(ModelFamily::Arima);
        transitions.advance(RunnerState::CallingRemote);
        transitions.advance(RunnerState::FallingBack);
        assert!(!transitions.state.is_terminal());
        transitions.advance(RunnerState::Succeeded);
        assert!(transitions.state.is_terminal());
    }

    #[test]
    fn test_terminal_states() {
        assert!(RunnerState::Succeeded.is_terminal());
        assert!(RunnerState::Failed.is_terminal());
        assert!(!RunnerState::FallingBack.is_terminal());
        assert_eq!(
            RunnerState::EmergencyFallingBack.to_string(),
            "EMERGENCY_FALLING_BACK"
        );
    }
}
