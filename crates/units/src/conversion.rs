use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use stockroom_core::{ProductId, UnitId, ValueObject};

/// One row of the `product_units` relation: `1 unit = conversion_rate × base unit`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProductUnit {
    pub product_id: ProductId,
    pub unit_id: UnitId,
    pub conversion_rate: f64,
}

/// Per-product map from alternate unit to its multiplier relative to the base unit.
///
/// Rates are stored as declared. Zero or negative rates are kept here and
/// rejected by the code that divides by them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConversionTable {
    // Declaration order is kept so alternate units are scanned deterministically.
    rates: HashMap<ProductId, Vec<(UnitId, f64)>>,
}

impl ConversionTable {
    /// Build the table. A repeated (product, unit) pair replaces the earlier rate.
    pub fn from_rows(rows: impl IntoIterator<Item = ProductUnit>) -> Self {
        let mut rates: HashMap<ProductId, Vec<(UnitId, f64)>> = HashMap::new();
        for row in rows {
            let units = rates.entry(row.product_id).or_default();
            match units.iter_mut().find(|(id, _)| *id == row.unit_id) {
                Some(existing) => existing.1 = row.conversion_rate,
                None => units.push((row.unit_id, row.conversion_rate)),
            }
        }
        Self { rates }
    }

    /// Declared rate of `unit_id` for `product_id`, if any.
    pub fn rate(&self, product_id: ProductId, unit_id: UnitId) -> Option<f64> {
        self.rates
            .get(&product_id)?
            .iter()
            .find(|(id, _)| *id == unit_id)
            .map(|(_, rate)| *rate)
    }

    /// Alternate units configured for a product, in declaration order.
    pub fn alternate_units(&self, product_id: ProductId) -> impl Iterator<Item = (UnitId, f64)> + '_ {
        self.rates
            .get(&product_id)
            .into_iter()
            .flat_map(|units| units.iter().copied())
    }

    pub fn has_product(&self, product_id: ProductId) -> bool {
        self.rates.contains_key(&product_id)
    }
}

impl ValueObject for ConversionTable {}
