//! Ordinal quality rating of a fitted (or synthesized) model

use crate::family::ModelFamily;
use crate::synthesis::FitMetrics;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Forecast reliability, best first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QualityLabel {
    High,
    Moderate,
    Low,
    VeryLow,
}

impl QualityLabel {
    /// Human-facing label
    pub fn label(self) -> &'static str {
        match self {
            QualityLabel::High => "Alta",
            QualityLabel::Moderate => "Moderada",
            QualityLabel::Low => "Baixa",
            QualityLabel::VeryLow => "Muito baixa",
        }
    }
}

impl fmt::Display for QualityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Upper MAPE and lower R² a label requires; both are strict
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold {
    pub max_mape: f64,
    pub min_r2: f64,
}

const fn threshold(max_mape: f64, min_r2: f64) -> Threshold {
    Threshold { max_mape, min_r2 }
}

/// Thresholds for HIGH, MODERATE and LOW, in that order
pub fn thresholds(family: ModelFamily) -> [Threshold; 3] {
    match family {
        ModelFamily::Arima => [
            threshold(10.0, 0.85),
            threshold(15.0, 0.75),
            threshold(25.0, 0.60),
        ],
        ModelFamily::Sarima => [
            threshold(8.0, 0.88),
            threshold(15.0, 0.75),
            threshold(25.0, 0.60),
        ],
        ModelFamily::ExponentialSmoothing => [
            threshold(10.0, 0.80),
            threshold(20.0, 0.70),
            threshold(30.0, 0.50),
        ],
        ModelFamily::Prophet => [
            threshold(10.0, 0.80),
            threshold(20.0, 0.65),
            threshold(30.0, 0.50),
        ],
    }
}

/// Rate a model's fit
///
/// Total over every input: a missing or non-finite MAPE counts as infinitely
/// bad and a missing or non-finite R² as zero, so incomplete metrics simply
/// land on [`QualityLabel::VeryLow`].
pub fn classify(metrics: &FitMetrics, family: ModelFamily) -> QualityLabel {
    let mape = metrics
        .mape
        .filter(|v| v.is_finite())
        .unwrap_or(f64::INFINITY);
    let r2 = metrics.r2.filter(|v| v.is_finite()).unwrap_or(0.0);

    let labels = [QualityLabel::High, QualityLabel::Moderate, QualityLabel::Low];
    thresholds(family)
        .iter()
        .zip(labels)
        .find(|(t, _)| mape < t.max_mape && r2 > t.min_r2)
        .map_or(QualityLabel::VeryLow, |(_, label)| label)
}
