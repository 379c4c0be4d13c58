use crate::schema::Transaction;
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Descriptive statistics over a transaction table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesSummary {
    pub records: usize,
    pub returns: usize,
    pub invoices: usize,
    pub customers: usize,
    pub products: usize,
    /// Net revenue, returns included.
    pub net_revenue: f64,
    /// Keyed by `YYYY-MM`.
    pub monthly_revenue: BTreeMap<String, f64>,
    /// Monday first.
    pub weekday_revenue: [f64; 7],
    pub top_countries: Vec<(String, f64)>,
}

impl SalesSummary {
    pub fn from_transactions(transactions: &[Transaction], top_n: usize) -> Self {
        let mut invoices = HashSet::new();
        let mut customers = HashSet::new();
        let mut products = HashSet::new();
        let mut monthly_revenue = BTreeMap::new();
        let mut weekday_revenue = [0.0; 7];
        let mut by_country: HashMap<&str, f64> = HashMap::new();
        let mut net_revenue = 0.0;
        let mut returns = 0;

        for tx in transactions {
            let revenue = tx.revenue();
            net_revenue += revenue;
            if tx.is_return() {
                returns += 1;
            }

            invoices.insert(tx.invoice.as_str());
            products.insert(tx.stock_code.as_str());
            if let Some(id) = tx.customer_id {
                customers.insert(id);
            }

            let date = tx.date();
            *monthly_revenue
                .entry(format!("{}-{:02}", date.year(), date.month()))
                .or_insert(0.0) += revenue;
            weekday_revenue[date.weekday().num_days_from_monday() as usize] += revenue;
            *by_country.entry(tx.country.as_str()).or_insert(0.0) += revenue;
        }

        let mut top_countries: Vec<(String, f64)> = by_country
            .into_iter()
            .map(|(country, revenue)| (country.to_string(), revenue))
            .collect();
        top_countries.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_countries.truncate(top_n);

        Self {
            records: transactions.len(),
            returns,
            invoices: invoices.len(),
            customers: customers.len(),
            products: products.len(),
            net_revenue,
            monthly_revenue,
            weekday_revenue,
            top_countries,
        }
    }

    pub fn weekday_table(&self) -> Vec<(&'static str, f64)> {
        WEEKDAYS
            .iter()
            .copied()
            .zip(self.weekday_revenue.iter().copied())
            .collect()
    }
}
