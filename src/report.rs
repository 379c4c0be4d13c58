use crate::error::{PipelineError, Result};
use crate::forecasting::Forecast;
use crate::series::DailySeries;
use crate::utils::{days_remaining_in_month, first_day_of_month, last_day_of_month};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Expected revenue for the month containing the first forecast day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyRevenueReport {
    /// First day of the target month.
    pub target_month: NaiveDate,
    pub observed_through: NaiveDate,
    pub horizon_days: usize,
    /// Forecast days that fall inside the target month.
    pub forecast_days_in_month: usize,
    /// Observed revenue from the first of the target month through
    /// `observed_through`; zero when the series ends on the previous month end.
    pub observed_to_date: f64,
    pub low: f64,
    pub point: f64,
    pub high: f64,
    pub confidence_level: f64,
    pub model: String,
}

impl MonthlyRevenueReport {
    pub fn from_forecast(series: &DailySeries, forecast: &Forecast) -> Result<Self> {
        let first_forecast_day = match forecast.dates.first() {
            Some(date) => *date,
            None => series.end.succ_opt().ok_or_else(|| {
                PipelineError::DateError(format!("No day after {}", series.end))
            })?,
        };
        let target_month = first_day_of_month(first_forecast_day);
        let month_end = last_day_of_month(target_month.year(), target_month.month())?;
        let observed_to_date = series.total_between(target_month, series.end);

        let mut low = observed_to_date;
        let mut point = observed_to_date;
        let mut high = observed_to_date;
        let mut forecast_days_in_month = 0;
        for (i, date) in forecast.dates.iter().enumerate() {
            if *date < target_month || *date > month_end {
                continue;
            }
            low += forecast.lower[i];
            point += forecast.point[i];
            high += forecast.upper[i];
            forecast_days_in_month += 1;
        }

        Ok(Self {
            target_month,
            observed_through: series.end,
            horizon_days: forecast.horizon(),
            forecast_days_in_month,
            observed_to_date,
            low,
            point,
            high,
            confidence_level: forecast.confidence_level,
            model: forecast.model.clone(),
        })
    }
}

/// Days needed to reach the end of the target month: the rest of `end`'s
/// month, or all of the next month when `end` is itself a month end.
pub fn default_horizon(end: NaiveDate) -> Result<usize> {
    let remaining = days_remaining_in_month(end)?;
    if remaining > 0 {
        return Ok(remaining);
    }
    let next = end
        .succ_opt()
        .ok_or_else(|| PipelineError::DateError(format!("No day after {}", end)))?;
    Ok(days_remaining_in_month(next)? + 1)
}

impl fmt::Display for MonthlyRevenueReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Revenue outlook for {}-{:02} ({})",
            self.target_month.year(),
            self.target_month.month(),
            self.model
        )?;
        writeln!(
            f,
            "  observed through {}: {:>14.2}",
            self.observed_through, self.observed_to_date
        )?;
        writeln!(
            f,
            "  forecast days in month:     {:>8} of {}",
            self.forecast_days_in_month, self.horizon_days
        )?;
        writeln!(
            f,
            "  low  ({:.0}% interval):       {:>14.2}",
            self.confidence_level * 100.0,
            self.low
        )?;
        writeln!(f, "  expected:                   {:>14.2}", self.point)?;
        write!(
            f,
            "  high ({:.0}% interval):       {:>14.2}",
            self.confidence_level * 100.0,
            self.high
        )
    }
}
