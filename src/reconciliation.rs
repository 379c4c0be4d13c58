//! Return reconciliation.
//!
//! A return (negative quantity) is kept only when the table also holds a sale
//! of the same product, to the same customer, at the same unit price, in the
//! same country, for exactly the returned quantity. Unmatched returns are
//! taken to cancel sales made before the observation window and are dropped.
//!
//! Partial returns (e.g. -3 against a sale of 5) do not match.

use crate::schema::Transaction;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchKey {
    pub stock_code: String,
    pub customer_id: Option<u64>,
    /// Bit pattern of the unit price; `-0.0` is folded into `0.0`.
    pub price_bits: u64,
    pub country: String,
}

impl MatchKey {
    pub fn of(tx: &Transaction) -> Self {
        Self {
            stock_code: tx.stock_code.clone(),
            customer_id: tx.customer_id,
            price_bits: (tx.price + 0.0).to_bits(),
            country: tx.country.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub total_records: usize,
    pub returns_seen: usize,
    pub returns_kept: usize,
    pub returns_dropped: usize,
}

#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub cleaned: Vec<Transaction>,
    pub report: ReconciliationReport,
}

/// Sale quantities grouped by match key.
pub struct ReturnReconciler {
    sales: HashMap<MatchKey, HashSet<i64>>,
}

impl ReturnReconciler {
    pub fn new(transactions: &[Transaction]) -> Self {
        let mut sales: HashMap<MatchKey, HashSet<i64>> = HashMap::new();
        for tx in transactions.iter().filter(|tx| tx.quantity > 0) {
            sales
                .entry(MatchKey::of(tx))
                .or_default()
                .insert(tx.quantity);
        }
        Self { sales }
    }

    pub fn has_match(&self, ret: &Transaction) -> bool {
        let Some(wanted) = ret.quantity.checked_neg() else {
            return false;
        };
        self.sales
            .get(&MatchKey::of(ret))
            .is_some_and(|quantities| quantities.contains(&wanted))
    }

    pub fn reconcile(&self, transactions: &[Transaction]) -> Reconciliation {
        let mut report = ReconciliationReport {
            total_records: transactions.len(),
            ..Default::default()
        };

        let cleaned: Vec<Transaction> = transactions
            .iter()
            .filter(|tx| {
                if !tx.is_return() {
                    return true;
                }
                report.returns_seen += 1;
                let keep = self.has_match(tx);
                if keep {
                    report.returns_kept += 1;
                } else {
                    report.returns_dropped += 1;
                }
                keep
            })
            .cloned()
            .collect();

        info!(
            "Return reconciliation: {} returns seen, {} kept, {} dropped as unmatched",
            report.returns_seen, report.returns_kept, report.returns_dropped
        );

        Reconciliation { cleaned, report }
    }
}

pub fn reconcile_returns(transactions: &[Transaction]) -> Reconciliation {
    ReturnReconciler::new(transactions).reconcile(transactions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn tx(stock: &str, customer: Option<u64>, price: f64, country: &str, qty: i64) -> Transaction {
        Transaction {
            invoice: format!("{}-{}", stock, qty),
            stock_code: stock.to_string(),
            description: String::new(),
            quantity: qty,
            invoice_date: NaiveDate::from_ymd_opt(2011, 11, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            price,
            customer_id: customer,
            country: country.to_string(),
        }
    }

    #[test]
    fn test_exact_magnitude_return_is_kept() {
        let rows = vec![
            tx("A", Some(1), 10.0, "UK", 5),
            tx("A", Some(1), 10.0, "UK", -5),
        ];
        let result = reconcile_returns(&rows);
        assert_eq!(result.cleaned.len(), 2);
        assert_eq!(result.report.returns_kept, 1);
        assert_eq!(result.report.returns_dropped, 0);
    }

    #[test]
    fn test_partial_return_is_dropped() {
        let rows = vec![
            tx("A", Some(1), 10.0, "UK", 5),
            tx("A", Some(1), 10.0, "UK", -3),
        ];
        let result = reconcile_returns(&rows);
        assert_eq!(result.cleaned, vec![rows[0].clone()]);
        assert_eq!(result.report.returns_dropped, 1);
    }

    #[test]
    fn test_every_key_field_must_agree() {
        let sale = tx("A", Some(1), 10.0, "UK", 5);
        let reconciler = ReturnReconciler::new(std::slice::from_ref(&sale));

        assert!(reconciler.has_match(&tx("A", Some(1), 10.0, "UK", -5)));
        assert!(!reconciler.has_match(&tx("B", Some(1), 10.0, "UK", -5)));
        assert!(!reconciler.has_match(&tx("A", Some(2), 10.0, "UK", -5)));
        assert!(!reconciler.has_match(&tx("A", None, 10.0, "UK", -5)));
        assert!(!reconciler.has_match(&tx("A", Some(1), 10.5, "UK", -5)));
        assert!(!reconciler.has_match(&tx("A", Some(1), 10.0, "France", -5)));
    }

    #[test]
    fn test_missing_customer_matches_missing_customer() {
        let rows = vec![tx("A", None, 2.5, "UK", 4), tx("A", None, 2.5, "UK", -4)];
        let result = reconcile_returns(&rows);
        assert_eq!(result.report.returns_kept, 1);
    }

    #[test]
    fn test_return_cannot_match_another_return() {
        let rows = vec![
            tx("A", Some(1), 1.0, "UK", -2),
            tx("A", Some(1), 1.0, "UK", -2),
        ];
        let result = reconcile_returns(&rows);
        assert!(result.cleaned.is_empty());
        assert_eq!(result.report.returns_seen, 2);
    }

    #[test]
    fn test_order_is_preserved_and_sales_untouched() {
        let rows = vec![
            tx("A", Some(1), 1.0, "UK", 3),
            tx("Z", Some(9), 1.0, "UK", -1),
            tx("B", Some(2), 4.0, "UK", 7),
            tx("A", Some(1), 1.0, "UK", -3),
        ];
        let result = reconcile_returns(&rows);
        let stocks: Vec<&str> = result.cleaned.iter().map(|t| t.stock_code.as_str()).collect();
        assert_eq!(stocks, vec!["A", "B", "A"]);
        assert_eq!(
            result.report,
            ReconciliationReport {
                total_records: 4,
                returns_seen: 2,
                returns_kept: 1,
                returns_dropped: 1,
            }
        );
    }
}
