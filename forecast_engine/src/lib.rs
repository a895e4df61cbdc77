//! # Forecast Engine
//!
//! Forecast synthesis and model execution for time series dashboards.
//!
//! ## Features
//!
//! - Four model families (ARIMA, SARIMA, exponential smoothing, Prophet-like)
//!   behind one [`Estimator`] interface
//! - Structurally consistent fallback forecasts with confidence bounds, fit
//!   metrics and parameter estimates
//! - Per-family quality rating
//! - Remote backend execution with local and emergency fallbacks
//! - Dashboard record projection of every result
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use forecast_engine::{
//!     ArimaOrder, DashboardRecord, EngineConfig, FamilyOrder, ModelRequest, ModelRunner, Row,
//! };
//! use serde_json::json;
//!
//! # async fn demo() -> forecast_engine::Result<()> {
//! let rows: Vec<Row> = (0..24)
//!     .map(|i| {
//!         let mut row = Row::new();
//!         row.insert("data".into(), json!(format!("{}-{:02}-01", 2023 + i / 12, i % 12 + 1)));
//!         row.insert("vendas".into(), json!(100.0 + i as f64));
//!         row
//!     })
//!     .collect();
//!
//! let runner = ModelRunner::new(EngineConfig::default());
//! let request = ModelRequest::new(FamilyOrder::Arima(ArimaOrder { p: 1, d: 1, q: 1 }), rows, "vendas", 12)
//!     .with_date_column("data");
//!
//! // No backend configured: the local fallback produces the forecast
//! let result = runner.run(&request, false).await?;
//! let record = DashboardRecord::from_result("Vendas", &result);
//! println!("{} ({})", record.classificacao, record.fonte);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dashboard;
pub mod error;
pub mod family;
pub mod quality;
pub mod remote;
pub mod runner;
pub mod synthesis;

// Re-export commonly used types
pub use crate::config::{EngineConfig, RemoteConfig, SynthesisConfig};
pub use crate::dashboard::{DashboardRecord, DashboardSink};
pub use crate::error::{ForecastError, Result};
pub use crate::family::{
    ArimaOrder, ErrorType, EtsOrder, FamilyOrder, Growth, ModelFamily, ParamValue, Parameters,
    ProphetOrder, ProphetSeasonality, SarimaOrder, SeasonalType, TrendType,
};
pub use crate::quality::{classify, QualityLabel};
pub use crate::remote::{RemoteBackend, RemoteResponse, Row};
pub use crate::runner::{ModelParams, ModelRequest, ModelResult, ModelRunner, ResultSource};
pub use crate::synthesis::{
    Estimator, FitMetrics, FixedNoise, ForecastPoint, NoiseSource, ParamEstimates, RandomNoise,
    SyntheticEstimator,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
