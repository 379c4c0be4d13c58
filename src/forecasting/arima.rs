//! ARIMA(p, d, q) with `d` of 0 or 1.
//!
//! AR coefficients come from the Yule-Walker equations (Levinson-Durbin), MA
//! coefficients from the autocorrelation of the AR residuals.

use super::{require_len, Forecaster};
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone)]
pub struct Arima {
    p: usize,
    d: usize,
    q: usize,
    ar_coeffs: Vec<f64>,
    ma_coeffs: Vec<f64>,
    mean: f64,
    last_value: f64,
    differenced: Vec<f64>,
    /// One residual per differenced observation; the first `p` are zero.
    aligned_residuals: Vec<f64>,
    residuals: Vec<f64>,
    fitted: bool,
}

impl Arima {
    pub fn new(p: usize, d: usize, q: usize) -> Result<Self> {
        if p > 10 {
            return Err(PipelineError::InvalidParameter {
                name: "p".to_string(),
                reason: "AR order must be <= 10".to_string(),
            });
        }
        if d > 1 {
            return Err(PipelineError::InvalidParameter {
                name: "d".to_string(),
                reason: "differencing order must be 0 or 1".to_string(),
            });
        }
        if q > 10 {
            return Err(PipelineError::InvalidParameter {
                name: "q".to_string(),
                reason: "MA order must be <= 10".to_string(),
            });
        }

        Ok(Self {
            p,
            d,
            q,
            ar_coeffs: vec![0.0; p],
            ma_coeffs: vec![0.0; q],
            mean: 0.0,
            last_value: 0.0,
            differenced: Vec::new(),
            aligned_residuals: Vec::new(),
            residuals: Vec::new(),
            fitted: false,
        })
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar_coeffs
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma_coeffs
    }

    fn autocovariance(centered: &[f64], max_lag: usize) -> Vec<f64> {
        let n = centered.len() as f64;
        (0..=max_lag)
            .map(|k| {
                centered
                    .iter()
                    .skip(k)
                    .zip(centered.iter())
                    .map(|(a, b)| a * b)
                    .sum::<f64>()
                    / n
            })
            .collect()
    }

    fn yule_walker(autocov: &[f64], p: usize) -> Vec<f64> {
        let mut phi = vec![0.0; p];
        let mut error = autocov[0];
        if error.abs() < 1e-12 {
            return phi;
        }

        for k in 0..p {
            let mut acc = autocov[k + 1];
            for j in 0..k {
                acc -= phi[j] * autocov[k - j];
            }
            let reflection = acc / error;

            let previous = phi.clone();
            phi[k] = reflection;
            for j in 0..k {
                phi[j] = previous[j] - reflection * previous[k - 1 - j];
            }

            error *= 1.0 - reflection * reflection;
            if error.abs() < 1e-12 {
                break;
            }
        }

        phi
    }

    fn estimate_ma(residuals: &[f64], q: usize) -> Vec<f64> {
        if q == 0 || residuals.is_empty() {
            return vec![0.0; q];
        }
        let mean = residuals.iter().sum::<f64>() / residuals.len() as f64;
        let centered: Vec<f64> = residuals.iter().map(|r| r - mean).collect();
        let autocov = Self::autocovariance(&centered, q);
        if autocov[0].abs() < 1e-12 {
            return vec![0.0; q];
        }
        autocov[1..]
            .iter()
            .map(|c| (c / autocov[0]).clamp(-0.99, 0.99))
            .collect()
    }
}

impl Forecaster for Arima {
    fn name(&self) -> String {
        format!("Arima({}, {}, {})", self.p, self.d, self.q)
    }

    fn fit(&mut self, data: &[f64]) -> Result<()> {
        require_len(data, self.p + self.d + self.q + 10)?;
        if data.iter().any(|x| !x.is_finite()) {
            return Err(PipelineError::NumericalError(
                "Series contains NaN or infinite values".to_string(),
            ));
        }

        self.differenced = if self.d == 1 {
            data.windows(2).map(|w| w[1] - w[0]).collect()
        } else {
            data.to_vec()
        };
        self.last_value = data[data.len() - 1];

        let n = self.differenced.len();
        self.mean = self.differenced.iter().sum::<f64>() / n as f64;
        let centered: Vec<f64> = self.differenced.iter().map(|x| x - self.mean).collect();

        let autocov = Self::autocovariance(&centered, self.p);
        self.ar_coeffs = Self::yule_walker(&autocov, self.p);

        self.aligned_residuals = vec![0.0; n];
        for i in self.p..n {
            let prediction: f64 = self
                .ar_coeffs
                .iter()
                .enumerate()
                .map(|(j, phi)| phi * centered[i - j - 1])
                .sum();
            self.aligned_residuals[i] = centered[i] - prediction;
        }
        self.residuals = self.aligned_residuals[self.p..].to_vec();
        self.ma_coeffs = Self::estimate_ma(&self.residuals, self.q);

        self.fitted = true;
        Ok(())
    }

    fn predict(&self, steps: usize) -> Result<Vec<f64>> {
        if !self.fitted {
            return Err(PipelineError::NotFitted);
        }

        let mut centered: Vec<f64> = self.differenced.iter().map(|x| x - self.mean).collect();
        let mut shocks = self.aligned_residuals.clone();
        let mut forecasts = Vec::with_capacity(steps);

        for _ in 0..steps {
            let len = centered.len();
            let ar: f64 = self
                .ar_coeffs
                .iter()
                .enumerate()
                .map(|(j, phi)| phi * centered[len - j - 1])
                .sum();
            let ma: f64 = self
                .ma_coeffs
                .iter()
                .enumerate()
                .filter(|(j, _)| *j < shocks.len())
                .map(|(j, theta)| theta * shocks[shocks.len() - j - 1])
                .sum();

            let next = ar + ma;
            centered.push(next);
            shocks.push(0.0);
            forecasts.push(next + self.mean);
        }

        if self.d == 1 {
            let mut level = self.last_value;
            for value in forecasts.iter_mut() {
                level += *value;
                *value = level;
            }
        }

        Ok(forecasts)
    }

    fn residuals(&self) -> &[f64] {
        &self.residuals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    #[test]
    fn test_order_validation() {
        assert!(Arima::new(1, 1, 1).is_ok());
        assert!(Arima::new(11, 0, 0).is_err());
        assert!(Arima::new(1, 2, 0).is_err());
        assert!(Arima::new(1, 0, 11).is_err());
    }

    #[test]
    fn test_recovers_ar1_coefficient() {
        let mut rng = StdRng::seed_from_u64(42);
        let noise = Normal::new(0.0, 1.0).unwrap();
        let mut data = vec![0.0];
        for _ in 0..2000 {
            let prev = *data.last().unwrap();
            data.push(0.7 * prev + noise.sample(&mut rng));
        }

        let mut model = Arima::new(1, 0, 0).unwrap();
        model.fit(&data).unwrap();
        let phi = model.ar_coefficients()[0];
        assert!((phi - 0.7).abs() < 0.08, "phi was {}", phi);
        assert!(model.ma_coefficients().is_empty());

        let mut mixed = Arima::new(1, 0, 1).unwrap();
        mixed.fit(&data).unwrap();
        assert_eq!(mixed.ar_coefficients().len(), 1);
        assert_eq!(mixed.ma_coefficients().len(), 1);
        assert!(mixed.ma_coefficients()[0].is_finite());
    }

    #[test]
    fn test_differenced_forecast_continues_trend() {
        let data: Vec<f64> = (1..=60)
            .map(|x| 2.0 * x as f64 + (x as f64 * 0.7).sin())
            .collect();
        let mut model = Arima::new(1, 1, 1).unwrap();
        model.fit(&data).unwrap();

        let forecast = model.predict(5).unwrap();
        assert_eq!(forecast.len(), 5);
        assert!(forecast.iter().all(|v| v.is_finite()));
        // Mean step is about 2 per observation.
        assert!(forecast[4] > data[59] + 5.0);
        assert!(forecast[4] < data[59] + 15.0);
    }

    #[test]
    fn test_rejects_short_or_non_finite_series() {
        let mut model = Arima::new(2, 1, 1).unwrap();
        assert!(matches!(
            model.fit(&[1.0; 5]),
            Err(PipelineError::InsufficientData { .. })
        ));

        let mut data = vec![1.0; 30];
        data[10] = f64::NAN;
        assert!(matches!(
            model.fit(&data),
            Err(PipelineError::NumericalError(_))
        ));
    }
}
