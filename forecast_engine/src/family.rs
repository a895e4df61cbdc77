//! Model families and their order parameters

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Largest AR/MA order accepted from a request
pub const MAX_ORDER: usize = 10;
/// Largest differencing order accepted from a request
pub const MAX_DIFFERENCING: usize = 2;

/// The four time series model families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    Arima,
    Sarima,
    ExponentialSmoothing,
    Prophet,
}

impl ModelFamily {
    /// Model kind string understood by the remote backend
    pub fn model_kind(self) -> &'static str {
        match self {
            ModelFamily::Arima => "arima",
            ModelFamily::Sarima => "sarima",
            ModelFamily::ExponentialSmoothing => "ets",
            ModelFamily::Prophet => "prophet",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ModelFamily::Arima => "ARIMA",
            ModelFamily::Sarima => "SARIMA",
            ModelFamily::ExponentialSmoothing => "ETS",
            ModelFamily::Prophet => "Prophet",
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A remote parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Text(String),
}

impl From<usize> for ParamValue {
    fn from(value: usize) -> Self {
        ParamValue::Number(value as f64)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Number(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

/// Parameters sent to the remote backend, keyed by backend field name
pub type Parameters = BTreeMap<String, ParamValue>;

/// Autoregressive-integrated order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

/// Seasonal autoregressive-integrated order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SarimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    #[serde(rename = "P")]
    pub seasonal_p: usize,
    #[serde(rename = "D")]
    pub seasonal_d: usize,
    #[serde(rename = "Q")]
    pub seasonal_q: usize,
    /// Seasonal period; the series frequency decides when absent
    #[serde(rename = "s", default)]
    pub period: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    #[default]
    Additive,
    Multiplicative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendType {
    #[default]
    None,
    Additive,
    Multiplicative,
    DampedAdditive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonalType {
    #[default]
    None,
    Additive,
    Multiplicative,
}

/// Exponential smoothing components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EtsOrder {
    pub error: ErrorType,
    pub trend: TrendType,
    pub seasonal: SeasonalType,
    #[serde(default)]
    pub period: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Growth {
    #[default]
    Linear,
    Logistic,
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProphetSeasonality {
    Weekly,
    #[default]
    Yearly,
    None,
}

impl ProphetSeasonality {
    pub fn period(self) -> Option<usize> {
        match self {
            ProphetSeasonality::Weekly => Some(7),
            ProphetSeasonality::Yearly => Some(12),
            ProphetSeasonality::None => None,
        }
    }
}

/// Additive trend/seasonal components
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProphetOrder {
    pub growth: Growth,
    pub seasonality: ProphetSeasonality,
    /// Width of the uncertainty interval, in (0, 1)
    pub interval_width: f64,
}

impl Default for ProphetOrder {
    fn default() -> Self {
        Self {
            growth: Growth::default(),
            seasonality: ProphetSeasonality::default(),
            interval_width: 0.8,
        }
    }
}

/// Order parameters of one model family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum FamilyOrder {
    Arima(ArimaOrder),
    Sarima(SarimaOrder),
    ExponentialSmoothing(EtsOrder),
    Prophet(ProphetOrder),
}

impl FamilyOrder {
    pub fn family(&self) -> ModelFamily {
        match self {
            FamilyOrder::Arima(_) => ModelFamily::Arima,
            FamilyOrder::Sarima(_) => ModelFamily::Sarima,
            FamilyOrder::ExponentialSmoothing(_) => ModelFamily::ExponentialSmoothing,
            FamilyOrder::Prophet(_) => ModelFamily::Prophet,
        }
    }

    pub fn model_kind(&self) -> &'static str {
        self.family().model_kind()
    }

    /// Reject orders no estimator would accept
    pub fn validate(&self) -> Result<()> {
        let check_order = |name: &str, value: usize, max: usize| {
            if value > max {
                Err(ForecastError::InvalidParameter(format!(
                    "{} must be at most {}, got {}",
                    name, max, value
                )))
            } else {
                Ok(())
            }
        };

        match self {
            FamilyOrder::Arima(order) => {
                check_order("p", order.p, MAX_ORDER)?;
                check_order("d", order.d, MAX_DIFFERENCING)?;
                check_order("q", order.q, MAX_ORDER)
            }
            FamilyOrder::Sarima(order) => {
                check_order("p", order.p, MAX_ORDER)?;
                check_order("d", order.d, MAX_DIFFERENCING)?;
                check_order("q", order.q, MAX_ORDER)?;
                check_order("P", order.seasonal_p, MAX_ORDER)?;
                check_order("D", order.seasonal_d, MAX_DIFFERENCING)?;
                check_order("Q", order.seasonal_q, MAX_ORDER)?;
                match order.period {
                    Some(0) => Err(ForecastError::InvalidParameter(
                        "Seasonal period must be greater than zero".to_string(),
                    )),
                    _ => Ok(()),
                }
            }
            FamilyOrder::ExponentialSmoothing(order) => match order.period {
                Some(0) => Err(ForecastError::InvalidParameter(
                    "Seasonal period must be greater than zero".to_string(),
                )),
                _ => Ok(()),
            },
            FamilyOrder::Prophet(order) => {
                if order.interval_width > 0.0 && order.interval_width < 1.0 {
                    Ok(())
                } else {
                    Err(ForecastError::InvalidParameter(format!(
                        "Interval width must be between 0 and 1, got {}",
                        order.interval_width
                    )))
                }
            }
        }
    }

    /// Family-specific fields of the remote parameter map
    pub fn parameters(&self) -> Parameters {
        let mut params = Parameters::new();
        match self {
            FamilyOrder::Arima(order) => {
                params.insert("p".into(), order.p.into());
                params.insert("d".into(), order.d.into());
                params.insert("q".into(), order.q.into());
            }
            FamilyOrder::Sarima(order) => {
                params.insert("p".into(), order.p.into());
                params.insert("d".into(), order.d.into());
                params.insert("q".into(), order.q.into());
                params.insert("P".into(), order.seasonal_p.into());
                params.insert("D".into(), order.seasonal_d.into());
                params.insert("Q".into(), order.seasonal_q.into());
                if let Some(period) = order.period {
                    params.insert("s".into(), period.into());
                }
            }
            FamilyOrder::ExponentialSmoothing(order) => {
                params.insert("erro".into(), error_name(order.error).into());
                params.insert("tendencia".into(), trend_name(order.trend).into());
                params.insert("sazonalidade".into(), seasonal_name(order.seasonal).into());
                if let Some(period) = order.period {
                    params.insert("periodo".into(), period.into());
                }
            }
            FamilyOrder::Prophet(order) => {
                let growth = match order.growth {
                    Growth::Linear => "linear",
                    Growth::Logistic => "logistic",
                    Growth::Flat => "flat",
                };
                let seasonality = match order.seasonality {
                    ProphetSeasonality::Weekly => "weekly",
                    ProphetSeasonality::Yearly => "yearly",
                    ProphetSeasonality::None => "none",
                };
                params.insert("crescimento".into(), growth.into());
                params.insert("sazonalidade".into(), seasonality.into());
                params.insert("intervalo_confianca".into(), order.interval_width.into());
            }
        }
        params
    }
}

fn error_name(error: ErrorType) -> &'static str {
    match error {
        ErrorType::Additive => "add",
        ErrorType::Multiplicative => "mul",
    }
}

fn trend_name(trend: TrendType) -> &'static str {
    match trend {
        TrendType::None => "none",
        TrendType::Additive => "add",
        TrendType::Multiplicative => "mul",
        TrendType::DampedAdditive => "add_damped",
    }
}

fn seasonal_name(seasonal: SeasonalType) -> &'static str {
    match seasonal {
        SeasonalType::None => "none",
        SeasonalType::Additive => "add",
        SeasonalType::Multiplicative => "mul",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_arima_parameters() {
        let order = FamilyOrder::Arima(ArimaOrder { p: 2, d: 1, q: 1 });
        let params = order.parameters();
        assert_eq!(params.get("p"), Some(&ParamValue::Number(2.0)));
        assert_eq!(params.get("d"), Some(&ParamValue::Number(1.0)));
        assert_eq!(params.get("q"), Some(&ParamValue::Number(1.0)));
        assert_eq!(order.model_kind(), "arima");
    }

    #[test]
    fn test_ets_parameters_use_backend_names() {
        let order = FamilyOrder::ExponentialSmoothing(EtsOrder {
            error: ErrorType::Multiplicative,
            trend: TrendType::DampedAdditive,
            seasonal: SeasonalType::Additive,
            period: Some(12),
        });
        let params = order.parameters();
        let keys: Vec<&str> = params.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["erro", "periodo", "sazonalidade", "tendencia"]);
        assert_eq!(params["tendencia"], ParamValue::Text("add_damped".into()));
    }

    #[test]
    fn test_validation() {
        assert!(FamilyOrder::Arima(ArimaOrder { p: 1, d: 3, q: 0 })
            .validate()
            .is_err());
        assert!(FamilyOrder::Prophet(ProphetOrder {
            interval_width: 1.0,
            ..ProphetOrder::default()
        })
        .validate()
        .is_err());
        assert!(FamilyOrder::Sarima(SarimaOrder {
            period: Some(0),
            ..SarimaOrder::default()
        })
        .validate()
        .is_err());
        assert!(FamilyOrder::Sarima(SarimaOrder::default()).validate().is_ok());
    }

    #[test]
    fn test_order_serde_is_tagged() {
        let order = FamilyOrder::Sarima(SarimaOrder {
            p: 1,
            d: 1,
            q: 1,
            seasonal_p: 1,
            seasonal_d: 0,
            seasonal_q: 1,
            period: Some(12),
        });
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["family"], "sarima");
        assert_eq!(json["P"], 1);
        assert_eq!(json["s"], 12);
        let back: FamilyOrder = serde_json::from_value(json).unwrap();
        assert_eq!(back, order);
    }
}
