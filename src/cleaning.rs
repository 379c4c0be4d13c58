use crate::schema::{OutlierBounds, Transaction};
use log::debug;

impl OutlierBounds {
    pub fn contains(&self, tx: &Transaction) -> bool {
        tx.quantity > self.min_quantity
            && tx.quantity < self.max_quantity
            && tx.price >= self.min_price
            && tx.price < self.max_price
    }
}

/// Drops bulk-quantity rows and test/adjustment prices.
pub fn filter_outliers(transactions: &[Transaction], bounds: &OutlierBounds) -> Vec<Transaction> {
    let kept: Vec<Transaction> = transactions
        .iter()
        .filter(|tx| bounds.contains(tx))
        .cloned()
        .collect();

    debug!(
        "Outlier filter removed {} of {} rows",
        transactions.len() - kept.len(),
        transactions.len()
    );

    kept
}
