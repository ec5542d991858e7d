//! Physical stock totals from lot records.
//!
//! Lots are folded into one total per (product, unit). Quantities are summed
//! as fixed-point decimals, so the result does not depend on lot order.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use stockroom_core::{ProductId, TenantId, to_fixed};
use stockroom_products::ProductCatalog;
use stockroom_units::{UnitConversionResolver, normalize_unit_name};

use crate::lot::{Lot, LotContents, LotLine};

/// Label used when neither the line nor the product names a unit ("piece").
pub const DEFAULT_UNIT_LABEL: &str = "Cái";

/// Composite key of a stock total. `unit` is the normalized unit label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StockKey {
    pub product_id: ProductId,
    pub unit: String,
}

impl StockKey {
    pub fn new(product_id: ProductId, unit: &str) -> Self {
        Self {
            product_id,
            unit: normalize_unit_name(unit),
        }
    }
}

/// Quantity per (product, unit).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StockTotals {
    totals: BTreeMap<StockKey, Decimal>,
}

impl StockTotals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, product_id: ProductId, unit: &str, quantity: Decimal) {
        *self.totals.entry(StockKey::new(product_id, unit)).or_default() += quantity;
    }

    /// Total for a product/unit; zero when absent.
    pub fn get(&self, product_id: ProductId, unit: &str) -> Decimal {
        self.totals
            .get(&StockKey::new(product_id, unit))
            .copied()
            .unwrap_or_default()
    }

    /// Same as [`get`](Self::get), as `f64` for rate arithmetic.
    pub fn get_f64(&self, product_id: ProductId, unit: &str) -> f64 {
        self.get(product_id, unit).to_f64().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StockKey, &Decimal)> {
        self.totals.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &StockKey> {
        self.totals.keys()
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    /// Fold every unit of a product into its base unit.
    ///
    /// Totals whose unit cannot be converted (unknown unit, undeclared rate,
    /// product without a base unit) stay under their own unit rather than
    /// being merged at an assumed 1:1 rate.
    pub fn consolidate_to_base(&self, resolver: &UnitConversionResolver<'_>, products: &ProductCatalog) -> StockTotals {
        let mut out = StockTotals::new();
        for (key, qty) in &self.totals {
            let base = products.base_unit(key.product_id);
            let amount = qty.to_f64().unwrap_or(0.0);
            let conversion = resolver.to_base_amount(Some(key.product_id), Some(&key.unit), amount, base);

            match (base, conversion.is_passthrough()) {
                (Some(base), false) => match to_fixed(conversion.quantity()) {
                    Ok(fixed) => out.add(key.product_id, base, fixed),
                    Err(_) => out.add(key.product_id, &key.unit, *qty),
                },
                _ => {
                    if let Some(reason) = conversion.passthrough_reason() {
                        tracing::debug!(product_id = %key.product_id, unit = %key.unit, ?reason, "kept unit as recorded");
                    }
                    out.add(key.product_id, &key.unit, *qty)
                }
            }
        }
        out
    }
}

/// Physical stock of one tenant (optionally one warehouse) at a point in time.
///
/// Captured without blocking writers: treat it as eventually consistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalSnapshot {
    pub tenant_id: TenantId,
    pub warehouse: Option<String>,
    pub captured_at: DateTime<Utc>,
    pub totals: StockTotals,
}

/// Aggregate lots with the default unit label.
pub fn aggregate_lot_data<'a>(lots: impl IntoIterator<Item = &'a Lot>) -> StockTotals {
    aggregate_lot_data_with_default(lots, DEFAULT_UNIT_LABEL)
}

/// Aggregate lots into per-(product, unit) totals.
///
/// - `MultiItem` lots contribute each item, keyed by the item's unit or else the
///   product's unit; the parent lot's own fields are not consulted.
/// - `SingleItem` lots contribute their own quantity under the product's unit.
/// - Lines without a product are skipped, as are non-finite quantities.
pub fn aggregate_lot_data_with_default<'a>(lots: impl IntoIterator<Item = &'a Lot>, default_unit: &str) -> StockTotals {
    let mut totals = StockTotals::new();

    for lot in lots {
        match &lot.contents {
            LotContents::MultiItem(items) => {
                for item in items {
                    let unit = item.unit.as_deref().or(item.product_unit.as_deref());
                    add_line(&mut totals, lot, item, unit, default_unit);
                }
            }
            LotContents::SingleItem(line) => {
                add_line(&mut totals, lot, line, line.product_unit.as_deref(), default_unit);
            }
        }
    }

    totals
}

fn add_line(totals: &mut StockTotals, lot: &Lot, line: &LotLine, unit: Option<&str>, default_unit: &str) {
    let Some(product_id) = line.product_id else {
        return;
    };

    let quantity = match to_fixed(line.quantity) {
        Ok(q) => q,
        Err(err) => {
            tracing::warn!(lot_id = %lot.id, %product_id, error = %err, "skipping lot line");
            return;
        }
    };

    let unit = unit.filter(|u| !u.trim().is_empty()).unwrap_or(default_unit);
    totals.add(product_id, unit, quantity);
}
