//! Autoregressive-integrated synthesis

use crate::config::SynthesisConfig;
use crate::error::Result;
use crate::family::{ArimaOrder, ModelFamily};
use crate::synthesis::{
    draw_coefficients, draw_metrics, ForecastPoint, ForecastSynthesizer, MetricRanges,
    NoiseSource, ParamEstimates, SeriesSummary, Synthesis, SynthesisRequest,
};

/// Drift over the full horizon when both AR and MA terms are present
const BLENDED_DRIFT: f64 = 0.10;
/// Drift over the full horizon with AR terms only
const AR_DRIFT: f64 = 0.08;
/// Bound on the per-step differencing perturbation, as a fraction of level
const DIFFERENCING_NOISE: f64 = 0.01;

const METRICS: MetricRanges = MetricRanges {
    mape: (5.0, 20.0),
    r2: (0.70, 0.95),
    information_criteria: true,
};

/// Non-seasonal trajectory shared by the autoregressive families
///
/// Returns the noisy point for `step` (1-based) of a `horizon`-long forecast.
#[allow(clippy::too_many_arguments)]
pub(crate) fn autoregressive_point(
    p: usize,
    d: usize,
    q: usize,
    series: &SeriesSummary,
    step: usize,
    horizon: usize,
    noise_fraction: f64,
    noise: &mut dyn NoiseSource,
) -> f64 {
    let progress = step as f64 / horizon as f64;
    let (base, anchor) = match (p > 0, q > 0) {
        (true, true) => (series.last * (1.0 + BLENDED_DRIFT * progress), series.last),
        (true, false) => (series.last * (1.0 + AR_DRIFT * progress), series.last),
        (false, true) => (series.last, series.last),
        (false, false) => (series.mean, series.mean),
    };
    let scale = if anchor.abs() > f64::EPSILON {
        anchor.abs()
    } else {
        series.scale()
    };

    let mut point = base;
    if d > 0 {
        point += noise.jitter(DIFFERENCING_NOISE * scale);
    }
    point + noise.jitter(noise_fraction * scale)
}

/// Intercept implied by a stationary AR process around the mean
fn ar_intercept(series: &SeriesSummary, ar: &[f64], d: usize) -> f64 {
    if d > 0 {
        0.0
    } else {
        series.mean * (1.0 - ar.iter().sum::<f64>())
    }
}

impl ForecastSynthesizer for ArimaOrder {
    fn family(&self) -> ModelFamily {
        ModelFamily::Arima
    }

    fn synthesize(
        &self,
        series: &SeriesSummary,
        request: &SynthesisRequest,
        tuning: &SynthesisConfig,
        noise: &mut dyn NoiseSource,
    ) -> Result<Synthesis> {
        let horizon = request.horizon_length();
        let forecast = request
            .periods
            .iter()
            .enumerate()
            .map(|(i, period)| {
                let estimate = autoregressive_point(
                    self.p,
                    self.d,
                    self.q,
                    series,
                    i + 1,
                    horizon,
                    tuning.noise_fraction,
                    noise,
                );
                ForecastPoint::with_margin(period, estimate, tuning.arima_margin)
            })
            .collect();

        let fit_metrics = draw_metrics(series, METRICS, self.p + self.q + 1, noise);
        let ar = draw_coefficients(self.p, 0.1, 0.7, noise);
        let ma = draw_coefficients(self.q, -0.5, 0.5, noise);
        let sigma2 = fit_metrics.rmse.map_or(0.0, |rmse| rmse.powi(2));

        Ok(Synthesis {
            forecast,
            params: ParamEstimates::Arima {
                intercept: ar_intercept(series, &ar, self.d),
                ar,
                ma,
                sigma2,
            },
            fit_metrics,
            warnings: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::FamilyOrder;
    use crate::synthesis::{Estimator, FixedNoise, RandomNoise, SyntheticEstimator};
    use approx::assert_relative_eq;
    use timeline::FrequencyProfile;

    fn request(order: ArimaOrder, horizon: usize) -> SynthesisRequest {
        SynthesisRequest::with_generic_periods(
            vec![80.0, 90.0, 100.0, 110.0, 120.0],
            FamilyOrder::Arima(order),
            FrequencyProfile::default(),
            horizon,
        )
    }

    #[test]
    fn test_blended_drift_reaches_ten_percent() {
        let synthesis = SyntheticEstimator::default()
            .estimate(&request(ArimaOrder { p: 1, d: 0, q: 1 }, 4), &mut FixedNoise)
            .unwrap();
        let last = synthesis.forecast.last().unwrap();
        assert_relative_eq!(last.point_estimate, 132.0, epsilon = 1e-9);
        assert_relative_eq!(last.lower_bound, 132.0 * 0.9, epsilon = 1e-9);
    }

    #[test]
    fn test_ar_only_and_ma_only_drift() {
        let estimator = SyntheticEstimator::default();
        let ar_only = estimator
            .estimate(&request(ArimaOrder { p: 2, d: 0, q: 0 }, 2), &mut FixedNoise)
            .unwrap();
        assert_relative_eq!(ar_only.forecast[1].point_estimate, 129.6, epsilon = 1e-9);

        let ma_only = estimator
            .estimate(&request(ArimaOrder { p: 0, d: 0, q: 2 }, 2), &mut FixedNoise)
            .unwrap();
        assert!(ma_only
            .forecast
            .iter()
            .all(|p| (p.point_estimate - 120.0).abs() < 1e-9));
    }

    #[test]
    fn test_white_noise_order_centres_on_mean() {
        let synthesis = SyntheticEstimator::default()
            .estimate(&request(ArimaOrder::default(), 3), &mut FixedNoise)
            .unwrap();
        assert!(synthesis
            .forecast
            .iter()
            .all(|p| (p.point_estimate - 100.0).abs() < 1e-9));
    }

    /// Records the half-width of every jitter drawn, answering the upper edge
    #[derive(Default)]
    struct RecordingNoise {
        magnitudes: Vec<f64>,
    }

    impl NoiseSource for RecordingNoise {
        fn uniform(&mut self, low: f64, high: f64) -> f64 {
            self.magnitudes.push((high - low) / 2.0);
            high
        }
    }

    fn summary() -> SeriesSummary {
        SeriesSummary::from_history(&[80.0, 90.0, 100.0, 110.0, 120.0]).unwrap()
    }

    #[test]
    fn test_differencing_adds_bounded_perturbation() {
        let series = summary();

        let mut undifferenced = RecordingNoise::default();
        let point = autoregressive_point(0, 0, 1, &series, 1, 4, 0.02, &mut undifferenced);
        assert_eq!(undifferenced.magnitudes.len(), 1);
        assert_relative_eq!(point, 120.0 + 0.02 * 120.0, epsilon = 1e-9);

        let mut differenced = RecordingNoise::default();
        let point = autoregressive_point(0, 1, 1, &series, 1, 4, 0.02, &mut differenced);
        assert_eq!(differenced.magnitudes.len(), 2);
        assert_relative_eq!(
            differenced.magnitudes[0],
            DIFFERENCING_NOISE * 120.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            point,
            120.0 + (DIFFERENCING_NOISE + 0.02) * 120.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_differencing_noise_stays_within_bound() {
        let series = summary();
        let bound = (DIFFERENCING_NOISE + 0.02) * 120.0;
        let mut noise = RandomNoise::seeded(11);
        for step in 1..=50 {
            let point = autoregressive_point(0, 2, 1, &series, step, 50, 0.02, &mut noise);
            assert!((point - 120.0).abs() <= bound, "step {}: {}", step, point);
        }
    }

    #[test]
    fn test_params_sized_to_order() {
        let synthesis = SyntheticEstimator::default()
            .estimate(&request(ArimaOrder { p: 3, d: 1, q: 2 }, 6), &mut FixedNoise)
            .unwrap();
        match synthesis.params {
            ParamEstimates::Arima {
                ar, ma, intercept, ..
            } => {
                assert_eq!(ar.len(), 3);
                assert_eq!(ma.len(), 2);
                assert_eq!(intercept, 0.0);
            }
            other => panic!("Unexpected params: {:?}", other),
        }
    }
}
