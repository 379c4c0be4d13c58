//! Forecasting collaborator for the daily revenue series.
//!
//! Every model implements [`Forecaster`]. The pipeline only asks for a point
//! forecast over a horizon plus the in-sample one-step residuals, which the
//! [`interval`] module turns into prediction bounds. When the configured model
//! cannot be fitted, [`forecast_with_fallback`] retries with simple
//! exponential smoothing and finally the naive model.

pub mod arima;
pub mod baseline;
pub mod exponential_smoothing;
pub mod interval;

pub use arima::Arima;
pub use baseline::{LinearTrend, Naive};
pub use exponential_smoothing::{Holt, HoltWinters, SimpleExponentialSmoothing};
pub use interval::{prediction_interval, IntervalBounds};

use crate::error::{PipelineError, Result};
use crate::schema::{ForecastModel, IntervalMethod};
use crate::series::DailySeries;
use chrono::{Days, NaiveDate};
use log::{info, warn};
use serde::{Deserialize, Serialize};

pub trait Forecaster {
    fn name(&self) -> String;

    fn fit(&mut self, data: &[f64]) -> Result<()>;

    fn predict(&self, steps: usize) -> Result<Vec<f64>>;

    /// One-step-ahead in-sample errors from the last fit.
    fn residuals(&self) -> &[f64];
}

pub(crate) fn require_len(data: &[f64], required: usize) -> Result<()> {
    if data.len() < required {
        return Err(PipelineError::InsufficientData {
            required,
            actual: data.len(),
        });
    }
    Ok(())
}

impl ForecastModel {
    pub fn build(&self) -> Result<Box<dyn Forecaster>> {
        let model: Box<dyn Forecaster> = match *self {
            ForecastModel::Naive => Box::new(Naive::new()),
            ForecastModel::LinearTrend => Box::new(LinearTrend::new()),
            ForecastModel::SimpleExponentialSmoothing { alpha: Some(alpha) } => {
                Box::new(SimpleExponentialSmoothing::new(alpha)?)
            }
            ForecastModel::SimpleExponentialSmoothing { alpha: None } => {
                Box::new(SimpleExponentialSmoothing::auto())
            }
            ForecastModel::Holt { alpha, beta } => Box::new(Holt::new(alpha, beta)?),
            ForecastModel::HoltWinters {
                alpha,
                beta,
                gamma,
                period,
            } => Box::new(HoltWinters::new(alpha, beta, gamma, period)?),
            ForecastModel::Arima { p, d, q } => Box::new(Arima::new(p, d, q)?),
        };
        Ok(model)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forecast {
    pub model: String,
    pub dates: Vec<NaiveDate>,
    pub point: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    pub confidence_level: f64,
}

impl Forecast {
    pub fn horizon(&self) -> usize {
        self.point.len()
    }

    pub fn total_point(&self) -> f64 {
        self.point.iter().sum()
    }

    pub fn total_lower(&self) -> f64 {
        self.lower.iter().sum()
    }

    pub fn total_upper(&self) -> f64 {
        self.upper.iter().sum()
    }
}

fn run_model(
    kind: &ForecastModel,
    values: &[f64],
    horizon: usize,
    confidence_level: f64,
    interval: &IntervalMethod,
) -> Result<(String, Vec<f64>, IntervalBounds)> {
    let mut model = kind.build()?;
    model.fit(values)?;
    let point = model.predict(horizon)?;
    if point.iter().any(|v| !v.is_finite()) {
        return Err(PipelineError::NumericalError(format!(
            "{} produced non-finite forecasts",
            model.name()
        )));
    }
    let bounds = prediction_interval(&point, model.residuals(), confidence_level, interval)?;
    Ok((model.name(), point, bounds))
}

/// Forecasts `horizon` days past the end of `series`, falling back to simpler
/// models when the configured one fails.
pub fn forecast_with_fallback(
    series: &DailySeries,
    model: &ForecastModel,
    horizon: usize,
    confidence_level: f64,
    interval: &IntervalMethod,
) -> Result<Forecast> {
    let values = series.values();

    let mut candidates = vec![model.clone()];
    for fallback in [
        ForecastModel::SimpleExponentialSmoothing { alpha: None },
        ForecastModel::Naive,
    ] {
        if !candidates.contains(&fallback) {
            candidates.push(fallback);
        }
    }

    let mut last_error = None;
    for candidate in &candidates {
        match run_model(candidate, &values, horizon, confidence_level, interval) {
            Ok((name, point, bounds)) => {
                let dates = (1..=horizon as u64)
                    .filter_map(|h| series.end.checked_add_days(Days::new(h)))
                    .collect();
                info!(
                    "Forecast {} days with {} at {:.0}% confidence",
                    horizon,
                    name,
                    confidence_level * 100.0
                );
                // Daily revenue is never negative.
                let floor =
                    |v: Vec<f64>| -> Vec<f64> { v.into_iter().map(|x| x.max(0.0)).collect() };
                return Ok(Forecast {
                    model: name,
                    dates,
                    point: floor(point),
                    lower: floor(bounds.lower),
                    upper: floor(bounds.upper),
                    confidence_level,
                });
            }
            Err(e) => {
                warn!("Forecast model {:?} failed: {}", candidate, e);
                last_error = Some(e);
            }
        }
    }

    Err(PipelineError::Forecast(
        last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no model attempted".to_string()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DailyPoint, DataOrigin};
    use std::collections::BTreeMap;

    fn series_from(values: &[f64]) -> DailySeries {
        let start = NaiveDate::from_ymd_opt(2011, 11, 1).unwrap();
        let mut points = BTreeMap::new();
        let mut end = start;
        for (i, v) in values.iter().enumerate() {
            end = start.checked_add_days(Days::new(i as u64)).unwrap();
            points.insert(
                end,
                DailyPoint {
                    value: *v,
                    origin: DataOrigin::Observed,
                    logic: String::new(),
                },
            );
        }
        DailySeries { start, end, points }
    }

    #[test]
    fn test_configured_model_is_used_when_it_fits() {
        let values: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let series = series_from(&values);

        let forecast = forecast_with_fallback(
            &series,
            &ForecastModel::LinearTrend,
            3,
            0.95,
            &IntervalMethod::Analytic,
        )
        .unwrap();

        assert_eq!(forecast.model, "LinearTrend");
        assert_eq!(forecast.horizon(), 3);
        assert_eq!(
            forecast.dates,
            vec![
                NaiveDate::from_ymd_opt(2011, 12, 1).unwrap(),
                NaiveDate::from_ymd_opt(2011, 12, 2).unwrap(),
                NaiveDate::from_ymd_opt(2011, 12, 3).unwrap(),
            ]
        );
        assert!((forecast.point[0] - 130.0).abs() < 1e-9);
    }

    #[test]
    fn test_forecast_is_floored_at_zero() {
        let values: Vec<f64> = (0..30).map(|i| 60.0 - 2.0 * i as f64).collect();
        let series = series_from(&values);

        let forecast = forecast_with_fallback(
            &series,
            &ForecastModel::LinearTrend,
            5,
            0.95,
            &IntervalMethod::Analytic,
        )
        .unwrap();

        assert!((forecast.point[0] - 0.0).abs() < 1e-9);
        for h in 0..5 {
            assert!(forecast.point[h] >= 0.0);
            assert!(forecast.lower[h] >= 0.0);
            assert!(forecast.lower[h] <= forecast.point[h]);
            assert!(forecast.point[h] <= forecast.upper[h]);
        }
        assert_eq!(forecast.point[4], 0.0);
    }

    #[test]
    fn test_falls_back_when_series_too_short() {
        // Holt-Winters with a weekly season needs 14 points.
        let series = series_from(&[10.0, 12.0, 11.0, 13.0, 12.0]);

        let forecast = forecast_with_fallback(
            &series,
            &ForecastModel::default(),
            4,
            0.95,
            &IntervalMethod::Analytic,
        )
        .unwrap();

        assert!(forecast.model.starts_with("SimpleExponentialSmoothing"));
        assert_eq!(forecast.point.len(), 4);
        for h in 0..4 {
            assert!(forecast.lower[h] <= forecast.point[h]);
            assert!(forecast.point[h] <= forecast.upper[h]);
        }
    }

    #[test]
    fn test_invalid_parameters_fall_back() {
        let series = series_from(&[5.0; 20]);
        let forecast = forecast_with_fallback(
            &series,
            &ForecastModel::Holt {
                alpha: 1.5,
                beta: 0.1,
            },
            2,
            0.95,
            &IntervalMethod::Analytic,
        )
        .unwrap();
        assert!(forecast.model.starts_with("SimpleExponentialSmoothing"));
    }

    #[test]
    fn test_all_models_failing_is_an_error() {
        let series = series_from(&[5.0]);
        let err = forecast_with_fallback(
            &series,
            &ForecastModel::Naive,
            2,
            0.95,
            &IntervalMethod::Analytic,
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Forecast(_)));
    }
}
