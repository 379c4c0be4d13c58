//! # Retail Revenue Pipeline
//!
//! Turns a retail transaction log into a dense daily revenue series and a
//! next-month revenue outlook with a prediction interval.
//!
//! ## Stages
//!
//! - **Outlier Filter**: drops extreme bulk quantities and test/adjustment prices
//! - **Return Reconciliation**: keeps a return only when the table holds the exact
//!   sale it reverses; unmatched returns are assumed to cancel sales made before
//!   the observation window
//! - **Revenue Series Builder**: sums positive revenue per day over a fixed window
//!   and fills missing days by linear interpolation
//! - **Forecasting**: fits a standard model to the series and reports low / expected /
//!   high revenue for the month containing the last observed day
//!
//! ## Example
//!
//! ```rust,ignore
//! use retail_revenue_pipeline::*;
//! use std::path::PathBuf;
//!
//! let config = PipelineConfig {
//!     input_path: Some(PathBuf::from("online_retail_II.csv")),
//!     cleaned_output: Some(PathBuf::from("cleaned.csv")),
//!     ..Default::default()
//! };
//!
//! let outcome = RevenuePipeline::run(&config).unwrap();
//! println!("{}", outcome.report);
//! ```

pub mod cleaning;
pub mod error;
pub mod forecasting;
pub mod ingestion;
pub mod reconciliation;
pub mod report;
pub mod schema;
pub mod series;
pub mod summary;
pub mod utils;

pub use cleaning::filter_outliers;
pub use error::{PipelineError, Result};
pub use forecasting::{forecast_with_fallback, Forecast, Forecaster};
pub use ingestion::*;
pub use reconciliation::{
    reconcile_returns, MatchKey, Reconciliation, ReconciliationReport, ReturnReconciler,
};
pub use report::{default_horizon, MonthlyRevenueReport};
pub use schema::*;
pub use series::{DailyRevenueBuilder, DailySeries};
pub use summary::SalesSummary;

use chrono::NaiveDate;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataOrigin {
    /// Summed from transactions on that day
    Observed,
    /// Filled from the nearest observed days
    Interpolated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyPoint {
    pub value: f64,
    pub origin: DataOrigin,
    /// Human readable explanation of how the value was produced
    pub logic: String,
}

pub type DenseSeries = BTreeMap<NaiveDate, DailyPoint>;

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub cleaned: Vec<Transaction>,
    pub reconciliation: ReconciliationReport,
    pub series: DailySeries,
    pub forecast: Forecast,
    pub report: MonthlyRevenueReport,
}

pub struct RevenuePipeline;

impl RevenuePipeline {
    /// Outlier filter followed by return reconciliation.
    pub fn clean(transactions: &[Transaction], config: &PipelineConfig) -> Reconciliation {
        let filtered = filter_outliers(transactions, &config.outlier_bounds);
        info!(
            "Outlier filter kept {} of {} transactions",
            filtered.len(),
            transactions.len()
        );
        reconcile_returns(&filtered)
    }

    /// Rows the cleaning stages would still remove; zero for a cleaned artifact.
    pub fn uncleaned_count(transactions: &[Transaction], config: &PipelineConfig) -> usize {
        transactions.len() - Self::clean(transactions, config).cleaned.len()
    }

    /// Daily series, forecast and report from an already cleaned table.
    pub fn forecast(
        cleaned: &[Transaction],
        config: &PipelineConfig,
    ) -> Result<(DailySeries, Forecast, MonthlyRevenueReport)> {
        let builder = DailyRevenueBuilder::new(config.start_date, config.end_date)?;
        let series = builder.build(cleaned)?;
        info!(
            "Daily revenue series has {} days ({} interpolated)",
            series.len(),
            series.interpolated_count()
        );

        let horizon = match config.horizon_days {
            Some(days) => days,
            None => default_horizon(config.end_date)?,
        };
        debug!("Forecast horizon: {} days", horizon);

        let forecast = forecast_with_fallback(
            &series,
            &config.model,
            horizon,
            config.confidence_level,
            &config.interval,
        )?;
        let report = MonthlyRevenueReport::from_forecast(&series, &forecast)?;

        Ok((series, forecast, report))
    }

    pub fn process(transactions: &[Transaction], config: &PipelineConfig) -> Result<PipelineOutcome> {
        config.validate()?;

        let Reconciliation { cleaned, report: reconciliation } = Self::clean(transactions, config);
        let (series, forecast, report) = Self::forecast(&cleaned, config)?;

        Ok(PipelineOutcome {
            cleaned,
            reconciliation,
            series,
            forecast,
            report,
        })
    }

    /// Reads `input_path`, runs every stage and writes the cleaned artifact
    /// when `cleaned_output` is set.
    pub fn run(config: &PipelineConfig) -> Result<PipelineOutcome> {
        let input = config.input_path.as_deref().ok_or_else(|| {
            PipelineError::InvalidConfig("input_path is required to run the pipeline".to_string())
        })?;
        let table = read_transactions(input)?;

        let outcome = Self::process(&table.transactions, config)?;

        if let Some(output) = config.cleaned_output.as_deref() {
            write_transactions(output, &outcome.cleaned)?;
        }

        Ok(outcome)
    }
}
