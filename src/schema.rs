use crate::error::{PipelineError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One line of the retail transaction log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub invoice: String,
    pub stock_code: String,
    pub description: String,
    /// Negative quantities are returns.
    pub quantity: i64,
    pub invoice_date: NaiveDateTime,
    pub price: f64,
    pub customer_id: Option<u64>,
    pub country: String,
}

impl Transaction {
    pub fn revenue(&self) -> f64 {
        self.quantity as f64 * self.price
    }

    pub fn date(&self) -> NaiveDate {
        self.invoice_date.date()
    }

    pub fn is_return(&self) -> bool {
        self.quantity < 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct OutlierBounds {
    #[schemars(description = "Exclusive lower bound on quantity")]
    pub min_quantity: i64,

    #[schemars(description = "Exclusive upper bound on quantity")]
    pub max_quantity: i64,

    #[schemars(description = "Inclusive lower bound on unit price")]
    pub min_price: f64,

    #[schemars(description = "Exclusive upper bound on unit price")]
    pub max_price: f64,
}

impl Default for OutlierBounds {
    fn default() -> Self {
        Self {
            min_quantity: -300,
            max_quantity: 300,
            min_price: 0.0,
            max_price: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase", tag = "model")]
pub enum ForecastModel {
    #[schemars(description = "Repeats the last observed value.")]
    Naive,

    #[schemars(description = "Ordinary least squares trend on the day index.")]
    LinearTrend,

    #[schemars(
        description = "Simple exponential smoothing. Leave alpha empty to pick it by grid search."
    )]
    SimpleExponentialSmoothing { alpha: Option<f64> },

    #[schemars(description = "Holt's linear trend method.")]
    Holt { alpha: f64, beta: f64 },

    #[schemars(description = "Additive Holt-Winters with a fixed seasonal period (7 = weekly).")]
    HoltWinters {
        alpha: f64,
        beta: f64,
        gamma: f64,
        period: usize,
    },

    #[schemars(description = "ARIMA(p, d, q) with d of 0 or 1.")]
    Arima { p: usize, d: usize, q: usize },
}

impl Default for ForecastModel {
    fn default() -> Self {
        Self::HoltWinters {
            alpha: 0.3,
            beta: 0.02,
            gamma: 0.2,
            period: 7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase", tag = "method")]
pub enum IntervalMethod {
    #[schemars(description = "Point forecast plus/minus z * sigma * sqrt(h) from in-sample residuals.")]
    Analytic,

    #[schemars(
        description = "Monte Carlo paths with normal innovations; bounds are empirical quantiles."
    )]
    Simulated { paths: usize, seed: u64 },
}

impl Default for IntervalMethod {
    fn default() -> Self {
        Self::Analytic
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PipelineConfig {
    #[schemars(description = "Delimited transaction log to read")]
    pub input_path: Option<PathBuf>,

    #[schemars(description = "Where to write the cleaned table after reconciliation")]
    pub cleaned_output: Option<PathBuf>,

    pub outlier_bounds: OutlierBounds,

    #[schemars(description = "First date of the daily revenue series (inclusive)")]
    pub start_date: NaiveDate,

    #[schemars(description = "Last date of the daily revenue series (inclusive)")]
    pub end_date: NaiveDate,

    #[schemars(
        description = "Days to forecast past end_date. Defaults to the rest of end_date's month."
    )]
    pub horizon_days: Option<usize>,

    #[schemars(description = "Prediction interval coverage, e.g. 0.95")]
    pub confidence_level: f64,

    pub model: ForecastModel,

    pub interval: IntervalMethod,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_path: None,
            cleaned_output: None,
            outlier_bounds: OutlierBounds::default(),
            start_date: NaiveDate::from_ymd_opt(2009, 12, 1).unwrap_or_default(),
            end_date: NaiveDate::from_ymd_opt(2011, 12, 9).unwrap_or_default(),
            horizon_days: None,
            confidence_level: 0.95,
            model: ForecastModel::default(),
            interval: IntervalMethod::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.start_date > self.end_date {
            return Err(PipelineError::InvalidDateRange {
                start: self.start_date,
                end: self.end_date,
            });
        }

        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "confidence_level must be between 0 and 1 (exclusive), got {}",
                self.confidence_level
            )));
        }

        let bounds = &self.outlier_bounds;
        if bounds.min_quantity >= bounds.max_quantity {
            return Err(PipelineError::InvalidConfig(format!(
                "min_quantity ({}) must be below max_quantity ({})",
                bounds.min_quantity, bounds.max_quantity
            )));
        }
        if bounds.min_price >= bounds.max_price {
            return Err(PipelineError::InvalidConfig(format!(
                "min_price ({}) must be below max_price ({})",
                bounds.min_price, bounds.max_price
            )));
        }

        if self.horizon_days == Some(0) {
            return Err(PipelineError::InvalidConfig(
                "horizon_days must be at least 1".to_string(),
            ));
        }

        if let IntervalMethod::Simulated { paths, .. } = self.interval {
            if paths < 10 {
                return Err(PipelineError::InvalidConfig(format!(
                    "Simulated intervals need at least 10 paths, got {}",
                    paths
                )));
            }
        }

        Ok(())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(PipelineConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
