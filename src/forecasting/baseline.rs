//! Baseline forecasters: last-value naive and an OLS trend on the day index.

use super::{require_len, Forecaster};
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Default)]
pub struct Naive {
    last: Option<f64>,
    residuals: Vec<f64>,
}

impl Naive {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Forecaster for Naive {
    fn name(&self) -> String {
        "Naive".to_string()
    }

    fn fit(&mut self, data: &[f64]) -> Result<()> {
        require_len(data, 2)?;
        self.residuals = data.windows(2).map(|w| w[1] - w[0]).collect();
        self.last = data.last().copied();
        Ok(())
    }

    fn predict(&self, steps: usize) -> Result<Vec<f64>> {
        let last = self.last.ok_or(PipelineError::NotFitted)?;
        Ok(vec![last; steps])
    }

    fn residuals(&self) -> &[f64] {
        &self.residuals
    }
}

/// Fits `y = intercept + slope * t` where `t` is the observation index.
#[derive(Debug, Clone, Default)]
pub struct LinearTrend {
    intercept: f64,
    slope: f64,
    n_observations: usize,
    residuals: Vec<f64>,
    fitted: bool,
}

impl LinearTrend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slope(&self) -> f64 {
        self.slope
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

impl Forecaster for LinearTrend {
    fn name(&self) -> String {
        "LinearTrend".to_string()
    }

    fn fit(&mut self, data: &[f64]) -> Result<()> {
        require_len(data, 2)?;

        let n = data.len() as f64;
        let sum_t: f64 = (0..data.len()).map(|i| i as f64).sum();
        let sum_y: f64 = data.iter().sum();
        let sum_t2: f64 = (0..data.len()).map(|i| (i * i) as f64).sum();
        let sum_ty: f64 = data.iter().enumerate().map(|(i, &y)| i as f64 * y).sum();

        let denominator = n * sum_t2 - sum_t * sum_t;
        if denominator.abs() < 1e-10 {
            return Err(PipelineError::NumericalError(
                "Singular matrix in regression".to_string(),
            ));
        }

        self.slope = (n * sum_ty - sum_t * sum_y) / denominator;
        self.intercept = (sum_y - self.slope * sum_t) / n;
        self.n_observations = data.len();
        self.residuals = data
            .iter()
            .enumerate()
            .map(|(i, &y)| y - (self.intercept + self.slope * i as f64))
            .collect();
        self.fitted = true;
        Ok(())
    }

    fn predict(&self, steps: usize) -> Result<Vec<f64>> {
        if !self.fitted {
            return Err(PipelineError::NotFitted);
        }
        Ok((0..steps)
            .map(|i| self.intercept + self.slope * (self.n_observations + i) as f64)
            .collect())
    }

    fn residuals(&self) -> &[f64] {
        &self.residuals
    }
}
