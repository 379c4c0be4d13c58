use crate::error::{PipelineError, Result};
use crate::schema::Transaction;
use crate::utils::dates_in_range;
use crate::{DailyPoint, DataOrigin, DenseSeries};
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};
use splines::{Interpolation, Key, Spline};
use std::collections::BTreeMap;

/// Gap-free daily revenue over `[start, end]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailySeries {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub points: DenseSeries,
}

impl DailySeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.keys().copied().collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.values().map(|p| p.value).collect()
    }

    pub fn get(&self, date: &NaiveDate) -> Option<f64> {
        self.points.get(date).map(|p| p.value)
    }

    pub fn interpolated_count(&self) -> usize {
        self.points
            .values()
            .filter(|p| p.origin == DataOrigin::Interpolated)
            .count()
    }

    /// Sum of values for dates in `[from, to]`.
    pub fn total_between(&self, from: NaiveDate, to: NaiveDate) -> f64 {
        if from > to {
            return 0.0;
        }
        self.points.range(from..=to).map(|(_, p)| p.value).sum()
    }
}

pub struct DailyRevenueBuilder {
    start: NaiveDate,
    end: NaiveDate,
}

impl DailyRevenueBuilder {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(PipelineError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Positive-revenue rows summed per calendar day, limited to the window.
    pub fn aggregate(&self, transactions: &[Transaction]) -> BTreeMap<NaiveDate, f64> {
        let mut daily: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for tx in transactions {
            let revenue = tx.revenue();
            if revenue <= 0.0 {
                continue;
            }
            let date = tx.date();
            if date < self.start || date > self.end {
                continue;
            }
            *daily.entry(date).or_insert(0.0) += revenue;
        }
        daily
    }

    pub fn build(&self, transactions: &[Transaction]) -> Result<DailySeries> {
        let observed = self.aggregate(transactions);
        if observed.is_empty() {
            return Err(PipelineError::EmptySeries {
                start: self.start,
                end: self.end,
            });
        }

        let keys: Vec<Key<f64, f64>> = observed
            .iter()
            .map(|(date, value)| Key::new(self.day_index(*date), *value, Interpolation::Linear))
            .collect();
        let spline = Spline::from_vec(keys);

        let mut points = BTreeMap::new();
        for date in dates_in_range(self.start, self.end) {
            let point = match observed.get(&date) {
                Some(value) => DailyPoint {
                    value: *value,
                    origin: DataOrigin::Observed,
                    logic: "Sum of positive-revenue transactions".to_string(),
                },
                None => {
                    // Clamped sampling carries the nearest known day past either end.
                    let value = spline.clamped_sample(self.day_index(date)).ok_or_else(|| {
                        PipelineError::NumericalError(format!("Could not interpolate {}", date))
                    })?;
                    DailyPoint {
                        value,
                        origin: DataOrigin::Interpolated,
                        logic: "Linear interpolation between nearest observed days".to_string(),
                    }
                }
            };
            points.insert(date, point);
        }

        let series = DailySeries {
            start: self.start,
            end: self.end,
            points,
        };

        debug!(
            "Built daily series {}..={}: {} days, {} interpolated",
            self.start,
            self.end,
            series.len(),
            series.interpolated_count()
        );

        Ok(series)
    }

    fn day_index(&self, date: NaiveDate) -> f64 {
        (date - self.start).num_days() as f64
    }
}
