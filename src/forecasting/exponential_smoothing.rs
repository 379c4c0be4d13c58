//! Exponential smoothing: simple (level), Holt (level + trend) and additive
//! Holt-Winters (level + trend + season).

use super::{require_len, Forecaster};
use crate::error::{PipelineError, Result};

fn check_unit(name: &str, value: f64) -> Result<()> {
    if !(0.0 < value && value < 1.0) {
        return Err(PipelineError::InvalidParameter {
            name: name.to_string(),
            reason: format!("must be between 0 and 1 (exclusive), got {}", value),
        });
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct SimpleExponentialSmoothing {
    alpha: Option<f64>,
    level: f64,
    residuals: Vec<f64>,
    fitted: bool,
}

impl SimpleExponentialSmoothing {
    pub fn new(alpha: f64) -> Result<Self> {
        check_unit("alpha", alpha)?;
        Ok(Self {
            alpha: Some(alpha),
            level: 0.0,
            residuals: Vec::new(),
            fitted: false,
        })
    }

    /// Alpha chosen at fit time by grid search over one-step squared error.
    pub fn auto() -> Self {
        Self {
            alpha: None,
            level: 0.0,
            residuals: Vec::new(),
            fitted: false,
        }
    }

    pub fn alpha(&self) -> Option<f64> {
        self.alpha
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    /// Returns (final level, one-step residuals).
    fn run(alpha: f64, data: &[f64]) -> (f64, Vec<f64>) {
        let mut level = data[0];
        let mut residuals = Vec::with_capacity(data.len() - 1);
        for &y in &data[1..] {
            residuals.push(y - level);
            level = alpha * y + (1.0 - alpha) * level;
        }
        (level, residuals)
    }

    fn best_alpha(data: &[f64]) -> f64 {
        let mut best_alpha = 0.5;
        let mut best_sse = f64::MAX;
        for step in 1..100 {
            let alpha = step as f64 / 100.0;
            let (_, residuals) = Self::run(alpha, data);
            let sse: f64 = residuals.iter().map(|e| e * e).sum();
            if sse < best_sse {
                best_sse = sse;
                best_alpha = alpha;
            }
        }
        best_alpha
    }
}

impl Forecaster for SimpleExponentialSmoothing {
    fn name(&self) -> String {
        match self.alpha {
            Some(alpha) if self.fitted => format!("SimpleExponentialSmoothing(alpha={:.2})", alpha),
            _ => "SimpleExponentialSmoothing".to_string(),
        }
    }

    fn fit(&mut self, data: &[f64]) -> Result<()> {
        require_len(data, 2)?;
        let alpha = match self.alpha {
            Some(alpha) => alpha,
            None => Self::best_alpha(data),
        };
        let (level, residuals) = Self::run(alpha, data);
        self.alpha = Some(alpha);
        self.level = level;
        self.residuals = residuals;
        self.fitted = true;
        Ok(())
    }

    fn predict(&self, steps: usize) -> Result<Vec<f64>> {
        if !self.fitted {
            return Err(PipelineError::NotFitted);
        }
        Ok(vec![self.level; steps])
    }

    fn residuals(&self) -> &[f64] {
        &self.residuals
    }
}

#[derive(Debug, Clone)]
pub struct Holt {
    alpha: f64,
    beta: f64,
    level: f64,
    trend: f64,
    residuals: Vec<f64>,
    fitted: bool,
}

impl Holt {
    pub fn new(alpha: f64, beta: f64) -> Result<Self> {
        check_unit("alpha", alpha)?;
        check_unit("beta", beta)?;
        Ok(Self {
            alpha,
            beta,
            level: 0.0,
            trend: 0.0,
            residuals: Vec::new(),
            fitted: false,
        })
    }
}

impl Forecaster for Holt {
    fn name(&self) -> String {
        format!("Holt(alpha={}, beta={})", self.alpha, self.beta)
    }

    fn fit(&mut self, data: &[f64]) -> Result<()> {
        require_len(data, 3)?;

        let mut level = data[0];
        let mut trend = data[1] - data[0];
        let mut residuals = Vec::with_capacity(data.len() - 1);

        for &y in &data[1..] {
            residuals.push(y - (level + trend));
            let prev_level = level;
            level = self.alpha * y + (1.0 - self.alpha) * (level + trend);
            trend = self.beta * (level - prev_level) + (1.0 - self.beta) * trend;
        }

        self.level = level;
        self.trend = trend;
        self.residuals = residuals;
        self.fitted = true;
        Ok(())
    }

    fn predict(&self, steps: usize) -> Result<Vec<f64>> {
        if !self.fitted {
            return Err(PipelineError::NotFitted);
        }
        Ok((1..=steps)
            .map(|h| self.level + h as f64 * self.trend)
            .collect())
    }

    fn residuals(&self) -> &[f64] {
        &self.residuals
    }
}

#[derive(Debug, Clone)]
pub struct HoltWinters {
    alpha: f64,
    beta: f64,
    gamma: f64,
    period: usize,
    level: f64,
    trend: f64,
    /// Indexed by `t % period`.
    seasonal: Vec<f64>,
    n_observations: usize,
    residuals: Vec<f64>,
    fitted: bool,
}

impl HoltWinters {
    pub fn new(alpha: f64, beta: f64, gamma: f64, period: usize) -> Result<Self> {
        check_unit("alpha", alpha)?;
        check_unit("beta", beta)?;
        check_unit("gamma", gamma)?;
        if period < 2 {
            return Err(PipelineError::InvalidParameter {
                name: "period".to_string(),
                reason: "must be at least 2".to_string(),
            });
        }
        Ok(Self {
            alpha,
            beta,
            gamma,
            period,
            level: 0.0,
            trend: 0.0,
            seasonal: vec![0.0; period],
            n_observations: 0,
            residuals: Vec::new(),
            fitted: false,
        })
    }

    pub fn seasonal_factors(&self) -> &[f64] {
        &self.seasonal
    }
}

impl Forecaster for HoltWinters {
    fn name(&self) -> String {
        format!(
            "HoltWinters(alpha={}, beta={}, gamma={}, period={})",
            self.alpha, self.beta, self.gamma, self.period
        )
    }

    fn fit(&mut self, data: &[f64]) -> Result<()> {
        let p = self.period;
        require_len(data, 2 * p)?;

        let first_mean = data[..p].iter().sum::<f64>() / p as f64;
        let second_mean = data[p..2 * p].iter().sum::<f64>() / p as f64;

        let mut level = first_mean;
        let mut trend = (second_mean - first_mean) / p as f64;
        let mut seasonal: Vec<f64> = data[..p].iter().map(|y| y - first_mean).collect();
        let mut residuals = Vec::with_capacity(data.len() - p);

        for (t, &y) in data.iter().enumerate().skip(p) {
            let s = seasonal[t % p];
            residuals.push(y - (level + trend + s));

            let prev_level = level;
            level = self.alpha * (y - s) + (1.0 - self.alpha) * (level + trend);
            trend = self.beta * (level - prev_level) + (1.0 - self.beta) * trend;
            seasonal[t % p] = self.gamma * (y - level) + (1.0 - self.gamma) * s;
        }

        self.level = level;
        self.trend = trend;
        self.seasonal = seasonal;
        self.n_observations = data.len();
        self.residuals = residuals;
        self.fitted = true;
        Ok(())
    }

    fn predict(&self, steps: usize) -> Result<Vec<f64>> {
        if !self.fitted {
            return Err(PipelineError::NotFitted);
        }
        Ok((1..=steps)
            .map(|h| {
                let season = self.seasonal[(self.n_observations + h - 1) % self.period];
                self.level + h as f64 * self.trend + season
            })
            .collect())
    }

    fn residuals(&self) -> &[f64] {
        &self.residuals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ses_constant_series() {
        let mut model = SimpleExponentialSmoothing::new(0.3).unwrap();
        model.fit(&[5.0; 10]).unwrap();
        assert_eq!(model.predict(2).unwrap(), vec![5.0, 5.0]);
        assert!(model.residuals().iter().all(|r| *r == 0.0));
    }

    #[test]
    fn test_ses_rejects_bad_alpha() {
        assert!(SimpleExponentialSmoothing::new(0.0).is_err());
        assert!(SimpleExponentialSmoothing::new(1.0).is_err());
    }

    #[test]
    fn test_ses_auto_prefers_high_alpha_on_random_walk_step() {
        let data = [1.0, 1.0, 1.0, 1.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0];
        let mut model = SimpleExponentialSmoothing::auto();
        model.fit(&data).unwrap();
        let alpha = model.alpha().unwrap();
        assert!(alpha > 0.9, "alpha was {}", alpha);
        assert!((model.level() - 10.0).abs() < 0.01);
    }

    #[test]
    fn test_holt_follows_linear_trend() {
        let data: Vec<f64> = (0..30).map(|i| 100.0 + 3.0 * i as f64).collect();
        let mut model = Holt::new(0.5, 0.3).unwrap();
        model.fit(&data).unwrap();

        let forecast = model.predict(2).unwrap();
        assert!((forecast[0] - 190.0).abs() < 1e-6);
        assert!((forecast[1] - 193.0).abs() < 1e-6);
    }

    #[test]
    fn test_holt_winters_reproduces_weekly_pattern() {
        let pattern = [50.0, 60.0, 70.0, 65.0, 80.0, 0.0, 40.0];
        let data: Vec<f64> = (0..70).map(|i| pattern[i % 7]).collect();

        let mut model = HoltWinters::new(0.3, 0.05, 0.2, 7).unwrap();
        model.fit(&data).unwrap();

        let forecast = model.predict(7).unwrap();
        for (h, value) in forecast.iter().enumerate() {
            let expected = pattern[(70 + h) % 7];
            assert!(
                (value - expected).abs() < 1e-6,
                "step {} expected {}, got {}",
                h,
                expected,
                value
            );
        }
    }

    #[test]
    fn test_holt_winters_needs_two_seasons() {
        let mut model = HoltWinters::new(0.3, 0.05, 0.2, 7).unwrap();
        assert!(matches!(
            model.fit(&[1.0; 13]),
            Err(PipelineError::InsufficientData {
                required: 14,
                actual: 13
            })
        ));
        assert!(HoltWinters::new(0.3, 0.05, 0.2, 1).is_err());
    }
}
