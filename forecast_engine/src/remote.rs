//! Remote statistical backend port
//!
//! The backend is an opaque request/response boundary: it receives the
//! input rows, a model kind and a flat parameter map, and answers with a
//! success flag plus a family-specific payload. This module defines the
//! port and turns a successful payload into forecast points and metrics.

use crate::error::{ForecastError, Result};
use crate::family::{FamilyOrder, ParamValue, Parameters};
use crate::synthesis::{FitMetrics, ForecastPeriod, ForecastPoint};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// One input row, keyed by column name
pub type Row = Map<String, Value>;

/// Response column parameter name
pub const RESPONSE_COLUMN_PARAM: &str = "y";
/// Date column parameter name
pub const DATE_COLUMN_PARAM: &str = "ds";
/// Number of periods to forecast
pub const HORIZON_LENGTH_PARAM: &str = "periodos";
/// Offset of the first forecast period after the last observation
pub const START_OFFSET_PARAM: &str = "inicio";

/// Port to the remote statistical backend
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    /// Fit `model_kind` on `rows` and forecast
    async fn run_model(
        &self,
        model_kind: &str,
        rows: &[Row],
        parameters: &Parameters,
    ) -> Result<RemoteResponse>;
}

/// Raw backend answer
///
/// A missing `success` flag deserializes as `false`, so only an explicit
/// success counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteResponse {
    #[serde(default)]
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Family-specific fields (`previsao`, `metricas`, `parametros`, ...)
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Forecast, metrics and parameters extracted from a successful response
#[derive(Debug, Clone, PartialEq)]
pub struct RemotePayload {
    pub forecast: Vec<ForecastPoint>,
    pub fit_metrics: FitMetrics,
    pub params: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RemotePoint {
    periodo: Value,
    valor: f64,
    #[serde(default)]
    limite_inferior: Option<f64>,
    #[serde(default)]
    limite_superior: Option<f64>,
}

impl RemoteResponse {
    pub fn succeeded(fields: Map<String, Value>) -> Self {
        Self {
            success: true,
            error: None,
            fields,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            fields: Map::new(),
        }
    }

    /// Extract the forecast payload
    ///
    /// Points are matched to `periods` by position to recover their dates.
    /// Bounds are reordered so `lower ≤ estimate ≤ upper` always holds and
    /// metrics are sanitized; a missing or empty `previsao` is an error.
    pub fn into_payload(mut self, periods: &[ForecastPeriod]) -> Result<RemotePayload> {
        let mut points: Vec<RemotePoint> = match self.fields.remove("previsao") {
            Some(value) => serde_json::from_value(value)?,
            None => Vec::new(),
        };
        if points.is_empty() {
            return Err(ForecastError::RemoteCall(
                "Response reported success without a forecast".to_string(),
            ));
        }
        if !periods.is_empty() && points.len() > periods.len() {
            warn!(
                returned = points.len(),
                requested = periods.len(),
                "Backend returned more periods than requested, truncating"
            );
            points.truncate(periods.len());
        }

        let forecast = points
            .into_iter()
            .enumerate()
            .map(|(i, point)| {
                let label = match point.periodo {
                    Value::String(label) => label,
                    other => other.to_string(),
                };
                let date = periods.get(i).and_then(|p| p.date);
                ForecastPoint::with_bounds(
                    label,
                    date,
                    point.valor,
                    point.limite_inferior.unwrap_or(point.valor),
                    point.limite_superior.unwrap_or(point.valor),
                )
            })
            .collect();

        let fit_metrics = match self.fields.remove("metricas") {
            Some(Value::Null) | None => FitMetrics::default(),
            Some(value) => serde_json::from_value::<FitMetrics>(value)?.sanitized(),
        };

        let params = match self.fields.remove("parametros") {
            Some(Value::Object(params)) => params,
            _ => Map::new(),
        };

        Ok(RemotePayload {
            forecast,
            fit_metrics,
            params,
        })
    }
}

/// Full parameter map for a remote call: order fields plus column names
pub fn request_parameters(
    order: &FamilyOrder,
    value_column: &str,
    date_column: Option<&str>,
    horizon_length: usize,
    start_offset: u32,
) -> Parameters {
    let mut params = order.parameters();
    params.insert(
        RESPONSE_COLUMN_PARAM.to_string(),
        ParamValue::from(value_column),
    );
    if let Some(column) = date_column {
        params.insert(DATE_COLUMN_PARAM.to_string(), ParamValue::from(column));
    }
    params.insert(
        HORIZON_LENGTH_PARAM.to_string(),
        ParamValue::from(horizon_length),
    );
    params.insert(
        START_OFFSET_PARAM.to_string(),
        ParamValue::from(start_offset as usize),
    );
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::ArimaOrder;
    use serde_json::json;

    fn periods() -> Vec<ForecastPeriod> {
        (1..=2).map(ForecastPeriod::generic).collect()
    }

    #[test]
    fn test_missing_success_flag_is_failure() {
        let response: RemoteResponse =
            serde_json::from_value(json!({ "previsao": [] })).unwrap();
        assert!(!response.success);
        assert!(response.fields.contains_key("previsao"));

        let response: RemoteResponse =
            serde_json::from_value(json!({ "success": false, "error": "modelo falhou" }))
                .unwrap();
        assert_eq!(response.error.as_deref(), Some("modelo falhou"));
    }

    #[test]
    fn test_payload_reorders_bounds() {
        let response: RemoteResponse = serde_json::from_value(json!({
            "success": true,
            "previsao": [
                { "periodo": "01/2025", "valor": 10.0, "limite_inferior": 12.0, "limite_superior": 8.0 },
                { "periodo": 2, "valor": 11.0 }
            ],
            "metricas": { "mape": 7.5, "r2": 1.4 },
            "parametros": { "ar": [0.4] }
        }))
        .unwrap();

        let payload = response.into_payload(&periods()).unwrap();
        assert_eq!(payload.forecast.len(), 2);
        assert!(payload.forecast.iter().all(ForecastPoint::is_consistent));
        assert_eq!(payload.forecast[0].lower_bound, 8.0);
        assert_eq!(payload.forecast[1].period, "2");
        assert_eq!(payload.fit_metrics.r2, Some(1.0));
        assert_eq!(payload.params["ar"], json!([0.4]));
    }

    #[test]
    fn test_payload_without_forecast_is_error() {
        let response = RemoteResponse::succeeded(Map::new());
        assert!(matches!(
            response.into_payload(&periods()),
            Err(ForecastError::RemoteCall(_))
        ));

        let malformed: RemoteResponse = serde_json::from_value(json!({
            "success": true,
            "previsao": "not a list"
        }))
        .unwrap();
        assert!(matches!(
            malformed.into_payload(&periods()),
            Err(ForecastError::Serialization(_))
        ));
    }

    #[test]
    fn test_payload_keeps_requested_periods_only() {
        let response: RemoteResponse = serde_json::from_value(json!({
            "success": true,
            "previsao": [
                { "periodo": "01/2025", "valor": 10.0 },
                { "periodo": "02/2025", "valor": 11.0 },
                { "periodo": "03/2025", "valor": 12.0 }
            ]
        }))
        .unwrap();

        let payload = response.into_payload(&periods()).unwrap();
        assert_eq!(payload.forecast.len(), 2);
        assert_eq!(payload.forecast[1].period, "02/2025");
    }

    #[test]
    fn test_request_parameters_include_columns() {
        let order = FamilyOrder::Arima(ArimaOrder { p: 1, d: 1, q: 1 });
        let params = request_parameters(&order, "vendas", Some("data"), 12, 2);
        assert_eq!(params["y"], ParamValue::Text("vendas".into()));
        assert_eq!(params["ds"], ParamValue::Text("data".into()));
        assert_eq!(params["p"], ParamValue::Number(1.0));
        assert_eq!(params["periodos"], ParamValue::Number(12.0));
        assert_eq!(params["inicio"], ParamValue::Number(2.0));

        let without_date = request_parameters(&order, "vendas", None, 1, 1);
        assert!(!without_date.contains_key("ds"));
    }
}
