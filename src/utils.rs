use crate::error::{PipelineError, Result};
use chrono::{Datelike, Days, NaiveDate, NaiveDateTime};

/// Timestamp layouts seen in retail transaction exports.
const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

pub fn last_day_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };

    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.checked_sub_days(Days::new(1)))
        .ok_or_else(|| {
            PipelineError::DateError(format!("No last day for month {}-{:02}", year, month))
        })
}

pub fn first_day_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Every calendar date from `start` to `end`, both inclusive.
pub fn dates_in_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|d| *d <= end).collect()
}

/// Days after `date` that still fall in its month.
pub fn days_remaining_in_month(date: NaiveDate) -> Result<usize> {
    let month_end = last_day_of_month(date.year(), date.month())?;
    Ok((month_end - date).num_days() as usize)
}

pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    let trimmed = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| PipelineError::DateError(format!("Unrecognised timestamp: '{}'", raw)))
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMATS[0]).to_string()
}
