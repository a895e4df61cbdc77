//! Additive trend/seasonal synthesis

use crate::config::SynthesisConfig;
use crate::error::Result;
use crate::family::{Growth, ModelFamily, ProphetOrder};
use crate::synthesis::{
    draw_metrics, seasonal_history_warning, seasonal_wave, ForecastPoint, ForecastSynthesizer,
    MetricRanges, NoiseSource, ParamEstimates, SeriesSummary, Synthesis, SynthesisRequest,
};

/// Linear growth per step, as a fraction of the last value
const LINEAR_RATE: f64 = 0.02;
/// Logistic capacity as a multiple of the last value
const CAPACITY_FACTOR: f64 = 2.0;
/// Seasonal amplitude, as a fraction of the last value
const SEASONAL_AMPLITUDE: f64 = 0.05;
/// Interval width the configured margin corresponds to
const REFERENCE_INTERVAL: f64 = 0.8;

const METRICS: MetricRanges = MetricRanges {
    mape: (6.0, 22.0),
    r2: (0.65, 0.92),
    information_criteria: false,
};

impl ProphetOrder {
    /// Steepness of the logistic curve; saturates over the horizon
    fn logistic_rate(horizon: usize) -> f64 {
        10.0 / horizon.max(1) as f64
    }

    fn growth_component(&self, last: f64, step: usize, horizon: usize) -> f64 {
        match self.growth {
            Growth::Linear => last * (1.0 + LINEAR_RATE * step as f64),
            Growth::Logistic => {
                let capacity = CAPACITY_FACTOR * last;
                let midpoint = horizon as f64 / 2.0;
                let k = Self::logistic_rate(horizon);
                last + (capacity - last) / (1.0 + (-k * (step as f64 - midpoint)).exp())
            }
            Growth::Flat => last,
        }
    }

    /// Bound margin scaled by the requested interval width
    fn margin(&self, base: f64) -> f64 {
        (base * self.interval_width / REFERENCE_INTERVAL).clamp(0.0, 1.0)
    }
}

impl ForecastSynthesizer for ProphetOrder {
    fn family(&self) -> ModelFamily {
        ModelFamily::Prophet
    }

    fn synthesize(
        &self,
        series: &SeriesSummary,
        request: &SynthesisRequest,
        tuning: &SynthesisConfig,
        noise: &mut dyn NoiseSource,
    ) -> Result<Synthesis> {
        let seasonal_period = self.seasonality.period();
        let warnings: Vec<String> = seasonal_period
            .and_then(|period| seasonal_history_warning(self.family(), series, period))
            .into_iter()
            .collect();

        let horizon = request.horizon_length();
        let last = series.last;
        let amplitude = SEASONAL_AMPLITUDE * last.abs();
        let margin = self.margin(tuning.prophet_margin);

        let forecast = request
            .periods
            .iter()
            .enumerate()
            .map(|(i, period_label)| {
                let step = i + 1;
                let seasonal = seasonal_period
                    .map_or(0.0, |period| amplitude * seasonal_wave(step, period));
                let estimate = self.growth_component(last, step, horizon)
                    + seasonal
                    + noise.jitter(tuning.noise_fraction * series.scale());
                ForecastPoint::with_margin(period_label, estimate, margin)
            })
            .collect();

        let fit_metrics = draw_metrics(series, METRICS, 0, noise);
        let growth_rate = match self.growth {
            Growth::Linear => LINEAR_RATE,
            Growth::Logistic => Self::logistic_rate(horizon),
            Growth::Flat => 0.0,
        };
        let capacity = match self.growth {
            Growth::Logistic => Some(CAPACITY_FACTOR * last),
            _ => None,
        };

        Ok(Synthesis {
            forecast,
            fit_metrics,
            params: ParamEstimates::Prophet {
                growth_rate,
                offset: last,
                capacity,
                seasonal_period,
                changepoint_prior_scale: noise.uniform(0.01, 0.5),
            },
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::{FamilyOrder, ProphetSeasonality};
    use crate::synthesis::{Estimator, FixedNoise, SyntheticEstimator};
    use approx::assert_relative_eq;
    use rstest::rstest;
    use timeline::{FrequencyKind, FrequencyProfile};

    fn run(order: ProphetOrder, history_len: usize, horizon: usize) -> Synthesis {
        let request = SynthesisRequest::with_generic_periods(
            vec![100.0; history_len],
            FamilyOrder::Prophet(order),
            FrequencyProfile::new(FrequencyKind::Monthly),
            horizon,
        );
        SyntheticEstimator::default()
            .estimate(&request, &mut FixedNoise)
            .unwrap()
    }

    fn flat_season(growth: Growth) -> ProphetOrder {
        ProphetOrder {
            growth,
            seasonality: ProphetSeasonality::None,
            ..ProphetOrder::default()
        }
    }

    #[rstest]
    #[case(Growth::Linear, 104.0)]
    #[case(Growth::Logistic, 150.0)]
    #[case(Growth::Flat, 100.0)]
    fn test_growth_modes_at_midpoint(#[case] growth: Growth, #[case] expected: f64) {
        let synthesis = run(flat_season(growth), 30, 4);
        assert_relative_eq!(synthesis.forecast[1].point_estimate, expected, epsilon = 1e-9);
    }

    #[test]
    fn test_logistic_growth_approaches_capacity() {
        let synthesis = run(flat_season(Growth::Logistic), 30, 12);
        let estimates: Vec<f64> = synthesis.forecast.iter().map(|p| p.point_estimate).collect();
        assert!(estimates.windows(2).all(|w| w[1] > w[0]));
        assert!(estimates.iter().all(|&v| v < 200.0));
        match synthesis.params {
            ParamEstimates::Prophet { capacity, .. } => assert_eq!(capacity, Some(200.0)),
            other => panic!("Unexpected params: {:?}", other),
        }
    }

    #[test]
    fn test_weekly_seasonality_and_interval_width() {
        let order = ProphetOrder {
            growth: Growth::Flat,
            seasonality: ProphetSeasonality::Weekly,
            interval_width: 0.96,
        };
        let synthesis = run(order, 30, 7);
        assert!(synthesis.warnings.is_empty());
        assert_relative_eq!(synthesis.forecast[6].point_estimate, 100.0, epsilon = 1e-9);

        let point = &synthesis.forecast[6];
        // 0.08 × 0.96 / 0.8
        assert_relative_eq!(point.upper_bound - point.point_estimate, 9.6, epsilon = 1e-9);
        assert_eq!(synthesis.fit_metrics.aic, None);
    }

    #[test]
    fn test_yearly_seasonality_warns_on_short_history() {
        let synthesis = run(ProphetOrder::default(), 10, 3);
        assert_eq!(synthesis.warnings.len(), 1);
        assert_eq!(synthesis.forecast.len(), 3);
    }
}
