//! Seasonal autoregressive-integrated synthesis

use crate::config::SynthesisConfig;
use crate::error::Result;
use crate::family::{ModelFamily, SarimaOrder};
use crate::synthesis::arima::autoregressive_point;
use crate::synthesis::{
    draw_coefficients, draw_metrics, seasonal_history_warning, seasonal_wave, ForecastPoint,
    ForecastSynthesizer, MetricRanges, NoiseSource, ParamEstimates, SeriesSummary, Synthesis,
    SynthesisRequest,
};

/// Seasonal amplitude as a fraction of level
const SEASONAL_AMPLITUDE: f64 = 0.10;

const METRICS: MetricRanges = MetricRanges {
    mape: (4.0, 18.0),
    r2: (0.72, 0.96),
    information_criteria: true,
};

impl SarimaOrder {
    /// Seasonal period, falling back to the series frequency
    pub fn resolved_period(&self, profile_period: usize) -> usize {
        self.period.unwrap_or(profile_period)
    }
}

impl ForecastSynthesizer for SarimaOrder {
    fn family(&self) -> ModelFamily {
        ModelFamily::Sarima
    }

    fn synthesize(
        &self,
        series: &SeriesSummary,
        request: &SynthesisRequest,
        tuning: &SynthesisConfig,
        noise: &mut dyn NoiseSource,
    ) -> Result<Synthesis> {
        let period = self.resolved_period(request.profile.period_length);
        let warnings: Vec<String> = seasonal_history_warning(self.family(), series, period)
            .into_iter()
            .collect();

        let horizon = request.horizon_length();
        let differencing = self.d + self.seasonal_d;
        let level = if self.p > 0 || self.q > 0 {
            series.last
        } else {
            series.mean
        };
        let amplitude = SEASONAL_AMPLITUDE * level.abs();

        let forecast = request
            .periods
            .iter()
            .enumerate()
            .map(|(i, period_label)| {
                let step = i + 1;
                let estimate = autoregressive_point(
                    self.p,
                    differencing,
                    self.q,
                    series,
                    step,
                    horizon,
                    tuning.noise_fraction,
                    noise,
                ) + amplitude * seasonal_wave(step, period);
                ForecastPoint::with_margin(period_label, estimate, tuning.sarima_margin)
            })
            .collect();

        let parameter_count = self.p + self.q + self.seasonal_p + self.seasonal_q + 1;
        let fit_metrics = draw_metrics(series, METRICS, parameter_count, noise);
        let ar = draw_coefficients(self.p, 0.1, 0.7, noise);
        let ma = draw_coefficients(self.q, -0.5, 0.5, noise);
        let seasonal_ar = draw_coefficients(self.seasonal_p, 0.05, 0.5, noise);
        let seasonal_ma = draw_coefficients(self.seasonal_q, -0.5, 0.0, noise);
        let sigma2 = fit_metrics.rmse.map_or(0.0, |rmse| rmse.powi(2));

        Ok(Synthesis {
            forecast,
            fit_metrics,
            params: ParamEstimates::Sarima {
                ar,
                ma,
                seasonal_ar,
                seasonal_ma,
                seasonal_period: period,
                sigma2,
            },
            warnings,
        })
    }
}
