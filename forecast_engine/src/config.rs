//! Engine configuration, loadable from TOML

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use timeline::HorizonLimits;

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub synthesis: SynthesisConfig,

    #[serde(default)]
    pub horizon: HorizonLimits,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Timeout for the remote call in milliseconds; 0 waits indefinitely
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl RemoteConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Seed for the fallback noise source; `None` draws from entropy
    #[serde(default)]
    pub seed: Option<u64>,

    /// Noise amplitude as a fraction of the level
    #[serde(default = "default_noise_fraction")]
    pub noise_fraction: f64,

    #[serde(default = "default_arima_margin")]
    pub arima_margin: f64,

    #[serde(default = "default_sarima_margin")]
    pub sarima_margin: f64,

    #[serde(default = "default_ets_margin")]
    pub ets_margin: f64,

    #[serde(default = "default_prophet_margin")]
    pub prophet_margin: f64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            seed: None,
            noise_fraction: default_noise_fraction(),
            arima_margin: default_arima_margin(),
            sarima_margin: default_sarima_margin(),
            ets_margin: default_ets_margin(),
            prophet_margin: default_prophet_margin(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    30_000
}
fn default_noise_fraction() -> f64 {
    0.02
}
fn default_arima_margin() -> f64 {
    0.10
}
fn default_sarima_margin() -> f64 {
    0.12
}
fn default_ets_margin() -> f64 {
    0.15
}
fn default_prophet_margin() -> f64 {
    0.08
}

impl EngineConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<()> {
        let synthesis = &self.synthesis;
        let fractions = [
            ("noise_fraction", synthesis.noise_fraction),
            ("arima_margin", synthesis.arima_margin),
            ("sarima_margin", synthesis.sarima_margin),
            ("ets_margin", synthesis.ets_margin),
            ("prophet_margin", synthesis.prophet_margin),
        ];
        for (name, value) in fractions {
            if !value.is_finite() || value <= 0.0 || value >= 1.0 {
                return Err(ForecastError::Config(format!(
                    "synthesis.{} must be in (0, 1), got {}",
                    name, value
                )));
            }
        }

        let limits = &self.horizon;
        let counts = [
            ("daily", limits.daily),
            ("weekly", limits.weekly),
            ("monthly", limits.monthly),
            ("quarterly", limits.quarterly),
            ("yearly", limits.yearly),
        ];
        for (name, value) in counts {
            if value == 0 {
                return Err(ForecastError::Config(format!(
                    "horizon.{} must be greater than zero",
                    name
                )));
            }
        }

        Ok(())
    }
}
