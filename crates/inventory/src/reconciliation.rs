//! Book vs. physical stock comparison.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockroom_core::ProductId;

use crate::aggregator::StockTotals;

/// One (product, unit) whose book and physical totals disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub product_id: ProductId,
    pub unit: String,
    pub book: Decimal,
    pub physical: Decimal,
    /// `book - physical`: positive means stock is missing from the shelves.
    pub diff: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    /// When the physical side was captured. Writes after this instant can
    /// show up as discrepancies.
    pub captured_at: DateTime<Utc>,
    pub matched: usize,
    pub discrepancies: Vec<Discrepancy>,
}

impl ReconciliationReport {
    pub fn is_clean(&self) -> bool {
        self.discrepancies.is_empty()
    }
}

/// Compare every key present on either side; only non-zero diffs are reported,
/// ordered by (product, unit).
pub fn reconcile(book: &StockTotals, physical: &StockTotals, captured_at: DateTime<Utc>) -> ReconciliationReport {
    let keys: BTreeSet<_> = book.keys().chain(physical.keys()).collect();

    let mut matched = 0;
    let mut discrepancies = Vec::new();
    for key in keys {
        let b = book.get(key.product_id, &key.unit);
        let p = physical.get(key.product_id, &key.unit);
        let diff = b - p;

        if diff.is_zero() {
            matched += 1;
        } else {
            discrepancies.push(Discrepancy {
                product_id: key.product_id,
                unit: key.unit.clone(),
                book: b,
                physical: p,
                diff,
            });
        }
    }

    ReconciliationReport {
        captured_at,
        matched,
        discrepancies,
    }
}
