//! # Timeline Forecast
//!
//! Time series preparation and forecast synthesis for forecasting dashboards.
//!
//! - [`timeline`]: date normalization, frequency inference, horizon generation
//! - [`forecast_engine`]: per-family forecast synthesis, quality rating and
//!   the remote → local → emergency execution chain
//!
//! ## Example
//!
//! ```
//! use timeline_forecast::timeline::{infer, HorizonGenerator, RawDateValue};
//!
//! let dates: Vec<RawDateValue> = ["2024-10-01", "2024-11-01", "2024-12-01"]
//!     .into_iter()
//!     .map(RawDateValue::from)
//!     .collect();
//! let profile = infer(&dates);
//! assert_eq!(profile.period_length, 12);
//!
//! let next = HorizonGenerator::default()
//!     .label_for(&profile, &dates[2], 1)
//!     .unwrap();
//! assert_eq!(next, "Janeiro de 2025");
//! ```

pub use forecast_engine;
pub use timeline;

pub use forecast_engine::{
    DashboardRecord, EngineConfig, FamilyOrder, ForecastError, ModelRequest, ModelResult,
    ModelRunner, QualityLabel, ResultSource,
};
pub use timeline::{FrequencyKind, FrequencyProfile, HorizonGenerator, RawDateValue};

#[cfg(test)]
mod tests {
    use super::*;
    use forecast_engine::{ArimaOrder, Row};
    use serde_json::json;

    #[tokio::test]
    async fn test_facade_runs_a_model() {
        let rows: Vec<Row> = (1..=6)
            .map(|day| {
                let mut row = Row::new();
                row.insert("dia".into(), json!(format!("{:02}/01/2024", day)));
                row.insert("valor".into(), json!(10.0 * day as f64));
                row
            })
            .collect();
        let request = ModelRequest::new(
            FamilyOrder::Arima(ArimaOrder { p: 1, d: 0, q: 0 }),
            rows,
            "valor",
            3,
        )
        .with_date_column("dia");

        let result = ModelRunner::default().run(&request, false).await.unwrap();
        assert_eq!(result.frequency.kind, FrequencyKind::Daily);
        assert_eq!(result.forecast[0].period, "07/01/2024");
        assert_eq!(result.source, ResultSource::LocalFallback);
    }
}
