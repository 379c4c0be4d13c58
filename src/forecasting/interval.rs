//! Prediction intervals around a point forecast.

use crate::error::{PipelineError, Result};
use crate::schema::IntervalMethod;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

#[derive(Debug, Clone, PartialEq)]
pub struct IntervalBounds {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

/// Standard normal quantile (Acklam's rational approximation, |error| < 1.2e-9).
pub fn normal_quantile(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e1,
        2.209460984245205e2,
        -2.759285104469687e2,
        1.383577518672690e2,
        -3.066479806614716e1,
        2.506628277459239,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e1,
        1.615858368580409e2,
        -1.556989798598866e2,
        6.680131188771972e1,
        -1.328068155288572e1,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-3,
        -3.223964580411365e-1,
        -2.400758277161838,
        -2.549732539343734,
        4.374664141464968,
        2.938163982698783,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-3,
        3.224671290700398e-1,
        2.445134137142996,
        3.754408661907416,
    ];
    const P_LOW: f64 = 0.02425;

    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        -normal_quantile(1.0 - p)
    }
}

/// Population standard deviation of the in-sample residuals.
pub fn residual_std_dev(residuals: &[f64]) -> f64 {
    if residuals.is_empty() {
        return 0.0;
    }
    let n = residuals.len() as f64;
    let mean = residuals.iter().sum::<f64>() / n;
    let variance = residuals.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

pub fn prediction_interval(
    point: &[f64],
    residuals: &[f64],
    confidence_level: f64,
    method: &IntervalMethod,
) -> Result<IntervalBounds> {
    let sigma = residual_std_dev(residuals);
    if !sigma.is_finite() {
        return Err(PipelineError::NumericalError(
            "Residual standard deviation is not finite".to_string(),
        ));
    }

    match method {
        IntervalMethod::Analytic => Ok(analytic(point, sigma, confidence_level)),
        IntervalMethod::Simulated { paths, seed } => {
            simulated(point, sigma, confidence_level, *paths, *seed)
        }
    }
}

// Error variance grows linearly with the horizon.
fn analytic(point: &[f64], sigma: f64, confidence_level: f64) -> IntervalBounds {
    let z = normal_quantile(0.5 + confidence_level / 2.0);
    let (lower, upper): (Vec<f64>, Vec<f64>) = point
        .iter()
        .enumerate()
        .map(|(h, &f)| {
            let half_width = z * sigma * ((h + 1) as f64).sqrt();
            (f - half_width, f + half_width)
        })
        .unzip();
    IntervalBounds { lower, upper }
}

fn simulated(
    point: &[f64],
    sigma: f64,
    confidence_level: f64,
    paths: usize,
    seed: u64,
) -> Result<IntervalBounds> {
    let steps = point.len();
    if paths == 0 || steps == 0 {
        return Ok(IntervalBounds {
            lower: point.to_vec(),
            upper: point.to_vec(),
        });
    }

    let innovation =
        Normal::new(0.0, sigma).map_err(|e| PipelineError::NumericalError(e.to_string()))?;
    let mut rng = StdRng::seed_from_u64(seed);

    // samples[h] holds every path's value at step h
    let mut samples: Vec<Vec<f64>> = vec![Vec::with_capacity(paths); steps];
    for _ in 0..paths {
        let mut accumulated = 0.0;
        for (h, &f) in point.iter().enumerate() {
            accumulated += innovation.sample(&mut rng);
            samples[h].push(f + accumulated);
        }
    }

    let alpha = 1.0 - confidence_level;
    let lower_idx = ((alpha / 2.0) * paths as f64).floor() as usize;
    let upper_idx = (((1.0 - alpha / 2.0) * paths as f64).ceil() as usize).min(paths - 1);

    let mut lower = Vec::with_capacity(steps);
    let mut upper = Vec::with_capacity(steps);
    for values in samples.iter_mut() {
        values.sort_by(|a, b| a.total_cmp(b));
        lower.push(values[lower_idx]);
        upper.push(values[upper_idx]);
    }

    Ok(IntervalBounds { lower, upper })
}
