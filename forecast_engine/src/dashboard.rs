//! Dashboard record projection of a model result

use crate::error::Result;
use crate::family::Parameters;
use crate::runner::ModelResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Category every time series record is filed under
pub const TIME_SERIES_CATEGORY: &str = "series_temporais";

/// Normalized record handed to a dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardRecord {
    pub nome: String,
    /// Remote model kind (`arima`, `sarima`, `ets`, `prophet`)
    pub tipo: String,
    pub dados: ModelResult,
    pub parametros: Parameters,
    /// Quality label
    pub classificacao: String,
    pub timestamp: DateTime<Utc>,
    pub metrics: BTreeMap<String, f64>,
    pub categoria: String,
    /// Result source label
    pub fonte: String,
}

impl DashboardRecord {
    pub fn from_result(name: impl Into<String>, result: &ModelResult) -> Self {
        Self {
            nome: name.into(),
            tipo: result.family.model_kind().to_string(),
            dados: result.clone(),
            parametros: result.order.parameters(),
            classificacao: result.quality.label().to_string(),
            timestamp: result.generated_at,
            metrics: result.fit_metrics.flatten(),
            categoria: TIME_SERIES_CATEGORY.to_string(),
            fonte: result.source.label().to_string(),
        }
    }
}

/// Anything that persists dashboard records
pub trait DashboardSink {
    fn save(&mut self, record: DashboardRecord) -> Result<()>;
}

impl DashboardSink for Vec<DashboardRecord> {
    fn save(&mut self, record: DashboardRecord) -> Result<()> {
        self.push(record);
        Ok(())
    }
}
