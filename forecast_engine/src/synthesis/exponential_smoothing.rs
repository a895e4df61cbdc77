//! Exponential smoothing synthesis

use crate::config::SynthesisConfig;
use crate::error::Result;
use crate::family::{ErrorType, EtsOrder, ModelFamily, SeasonalType, TrendType};
use crate::synthesis::{
    draw_metrics, seasonal_history_warning, seasonal_wave, ForecastPoint, ForecastSynthesizer,
    MetricRanges, NoiseSource, ParamEstimates, SeriesSummary, Synthesis, SynthesisRequest,
};

/// Per-step trend rate, as a fraction of level
const TREND_RATE: f64 = 0.02;
/// Attenuation applied per step to a damped trend
const DAMPING: f64 = 0.5;
/// Seasonal amplitude, as a fraction of level
const SEASONAL_AMPLITUDE: f64 = 0.10;

const METRICS: MetricRanges = MetricRanges {
    mape: (5.0, 25.0),
    r2: (0.65, 0.93),
    information_criteria: true,
};

impl EtsOrder {
    /// Seasonal period, falling back to the series frequency
    pub fn resolved_period(&self, profile_period: usize) -> usize {
        self.period.unwrap_or(profile_period)
    }

    fn trend_component(&self, level: f64, step: usize) -> f64 {
        let steps = step as f64;
        match self.trend {
            TrendType::None => level,
            TrendType::Additive => level + steps * TREND_RATE * level,
            // Multiplicative growth compounds per step
            TrendType::Multiplicative => level * (1.0 + TREND_RATE).powi(step as i32),
            TrendType::DampedAdditive => {
                level + steps * TREND_RATE * level * DAMPING.powi(step as i32)
            }
        }
    }

    fn seasonal_component(&self, base: f64, level: f64, step: usize, period: usize) -> f64 {
        let wave = seasonal_wave(step, period);
        match self.seasonal {
            SeasonalType::None => base,
            SeasonalType::Additive => base + SEASONAL_AMPLITUDE * level.abs() * wave,
            SeasonalType::Multiplicative => base * (1.0 + SEASONAL_AMPLITUDE * wave),
        }
    }

    fn parameter_count(&self, period: usize) -> usize {
        let trend = match self.trend {
            TrendType::None => 0,
            TrendType::Additive | TrendType::Multiplicative => 1,
            TrendType::DampedAdditive => 2,
        };
        let seasonal = match self.seasonal {
            SeasonalType::None => 0,
            _ => period.min(12),
        };
        2 + trend + seasonal
    }
}

impl ForecastSynthesizer for EtsOrder {
    fn family(&self) -> ModelFamily {
        ModelFamily::ExponentialSmoothing
    }

    fn synthesize(
        &self,
        series: &SeriesSummary,
        request: &SynthesisRequest,
        tuning: &SynthesisConfig,
        noise: &mut dyn NoiseSource,
    ) -> Result<Synthesis> {
        let period = self.resolved_period(request.profile.period_length);
        let warnings: Vec<String> = match self.seasonal {
            SeasonalType::None => Vec::new(),
            _ => seasonal_history_warning(self.family(), series, period)
                .into_iter()
                .collect(),
        };

        let level = series.last;
        let forecast = request
            .periods
            .iter()
            .enumerate()
            .map(|(i, period_label)| {
                let step = i + 1;
                let trended = self.trend_component(level, step);
                let seasonal = self.seasonal_component(trended, level, step, period);
                let error = noise.jitter(tuning.noise_fraction);
                let estimate = match self.error {
                    ErrorType::Additive => seasonal + error * series.scale(),
                    ErrorType::Multiplicative => seasonal * (1.0 + error),
                };
                ForecastPoint::with_margin(period_label, estimate, tuning.ets_margin)
            })
            .collect();

        let fit_metrics = draw_metrics(series, METRICS, self.parameter_count(period), noise);
        let alpha = noise.uniform(0.1, 0.9);
        let beta = match self.trend {
            TrendType::None => None,
            _ => Some(noise.uniform(0.01, 0.3)),
        };
        let gamma = match self.seasonal {
            SeasonalType::None => None,
            _ => Some(noise.uniform(0.01, 0.3)),
        };
        let phi = match self.trend {
            TrendType::DampedAdditive => Some(noise.uniform(0.8, 0.98)),
            _ => None,
        };

        Ok(Synthesis {
            forecast,
            fit_metrics,
            params: ParamEstimates::ExponentialSmoothing {
                alpha,
                beta,
                gamma,
                phi,
                initial_level: series.first,
            },
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::FamilyOrder;
    use crate::synthesis::{Estimator, FixedNoise, SyntheticEstimator};
    use approx::assert_relative_eq;
    use rstest::rstest;
    use timeline::{FrequencyKind, FrequencyProfile};

    fn run(order: EtsOrder, horizon: usize) -> Synthesis {
        let request = SynthesisRequest::with_generic_periods(
            vec![50.0, 75.0, 100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 100.0],
            FamilyOrder::ExponentialSmoothing(order),
            FrequencyProfile::new(FrequencyKind::Quarterly),
            horizon,
        );
        SyntheticEstimator::default()
            .estimate(&request, &mut FixedNoise)
            .unwrap()
    }

    #[rstest]
    #[case(TrendType::None, 100.0)]
    #[case(TrendType::Additive, 106.0)]
    #[case(TrendType::Multiplicative, 106.1208)]
    #[case(TrendType::DampedAdditive, 100.75)]
    fn test_trend_shapes(#[case] trend: TrendType, #[case] expected_third_step: f64) {
        let synthesis = run(
            EtsOrder {
                trend,
                ..EtsOrder::default()
            },
            3,
        );
        assert_relative_eq!(
            synthesis.forecast[2].point_estimate,
            expected_third_step,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_multiplicative_seasonality_uses_quarterly_cycle() {
        let synthesis = run(
            EtsOrder {
                seasonal: SeasonalType::Multiplicative,
                error: ErrorType::Multiplicative,
                ..EtsOrder::default()
            },
            4,
        );
        assert_relative_eq!(synthesis.forecast[0].point_estimate, 110.0, epsilon = 1e-9);
        assert_relative_eq!(synthesis.forecast[2].point_estimate, 90.0, epsilon = 1e-9);
        assert!(synthesis.warnings.is_empty());
    }

    #[test]
    fn test_smoothing_constants_match_components() {
        let synthesis = run(
            EtsOrder {
                trend: TrendType::DampedAdditive,
                seasonal: SeasonalType::Additive,
                ..EtsOrder::default()
            },
            2,
        );
        match synthesis.params {
            ParamEstimates::ExponentialSmoothing {
                alpha,
                beta,
                gamma,
                phi,
                initial_level,
            } => {
                for value in [Some(alpha), beta, gamma, phi] {
                    let value = value.unwrap();
                    assert!(value > 0.0 && value < 1.0);
                }
                assert_eq!(initial_level, 50.0);
            }
            other => panic!("Unexpected params: {:?}", other),
        }

        let plain = run(EtsOrder::default(), 2);
        match plain.params {
            ParamEstimates::ExponentialSmoothing {
                beta, gamma, phi, ..
            } => assert_eq!((beta, gamma, phi), (None, None, None)),
            other => panic!("Unexpected params: {:?}", other),
        }
    }
}
