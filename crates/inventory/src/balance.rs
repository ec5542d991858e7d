//! Book stock: what the order ledger says should be on hand.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use stockroom_core::{ProductId, to_fixed};
use stockroom_products::ProductCatalog;
use stockroom_units::{UnitConversionResolver, normalize_unit_name};

use crate::aggregator::StockTotals;
use crate::order::{Order, OrderDirection};

/// Unit label used for kilogram rows.
const KILOGRAM_LABEL: &str = "kg";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalanceMode {
    /// Keyed by each line's own unit.
    Native,
    /// Converted to kilograms where the product has a kilogram path.
    Kilograms,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceRow {
    pub product_id: ProductId,
    pub warehouse: String,
    pub unit: String,
    pub qty_in: Decimal,
    pub qty_out: Decimal,
    pub balance: Decimal,
    /// Set in kilogram mode when the row stayed in its native unit.
    pub unconvertible: bool,
}

type RowKey = (ProductId, String, String);

/// Per (product, warehouse, unit) inbound/outbound totals of completed orders.
#[derive(Debug, Clone, PartialEq)]
pub struct BookBalances {
    mode: BalanceMode,
    rows: BTreeMap<RowKey, BalanceRow>,
}

impl BookBalances {
    /// Balances in each line's native unit.
    pub fn from_orders<'a>(orders: impl IntoIterator<Item = &'a Order>) -> Self {
        let mut book = Self::empty(BalanceMode::Native);
        for order in completed(orders) {
            for line in &order.lines {
                book.post(order, line.product_id, &line.unit, line.quantity, false);
            }
        }
        book
    }

    /// Balances converted to kilograms. Lines without a kilogram path keep
    /// their native unit and are flagged `unconvertible`.
    pub fn in_kilograms<'a>(
        orders: impl IntoIterator<Item = &'a Order>,
        resolver: &UnitConversionResolver<'_>,
        products: &ProductCatalog,
    ) -> Self {
        let mut book = Self::empty(BalanceMode::Kilograms);
        for order in completed(orders) {
            for line in &order.lines {
                let base = products.base_unit(line.product_id);
                let qty = line.quantity.to_f64().unwrap_or(0.0);
                let kg = resolver
                    .kilogram_amount(Some(line.product_id), Some(&line.unit), qty, base)
                    .and_then(|kg| to_fixed(kg).ok());

                match kg {
                    Some(kg) => book.post(order, line.product_id, KILOGRAM_LABEL, kg, false),
                    None => {
                        tracing::debug!(product_id = %line.product_id, unit = %line.unit, "no kilogram path");
                        book.post(order, line.product_id, &line.unit, line.quantity, true);
                    }
                }
            }
        }
        book
    }

    fn empty(mode: BalanceMode) -> Self {
        Self {
            mode,
            rows: BTreeMap::new(),
        }
    }

    fn post(&mut self, order: &Order, product_id: ProductId, unit: &str, quantity: Decimal, unconvertible: bool) {
        let warehouse = order.warehouse.trim().to_string();
        let key = (product_id, warehouse.clone(), normalize_unit_name(unit));
        let row = self.rows.entry(key).or_insert_with(|| BalanceRow {
            product_id,
            warehouse,
            unit: unit.trim().to_string(),
            qty_in: Decimal::ZERO,
            qty_out: Decimal::ZERO,
            balance: Decimal::ZERO,
            unconvertible,
        });

        match order.direction {
            OrderDirection::Inbound => row.qty_in += quantity,
            OrderDirection::Outbound => row.qty_out += quantity,
        }
        row.balance = row.qty_in - row.qty_out;
        row.unconvertible |= unconvertible;
    }

    pub fn mode(&self) -> BalanceMode {
        self.mode
    }

    /// Rows ordered by (product, warehouse, unit).
    pub fn rows(&self) -> impl Iterator<Item = &BalanceRow> {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Balance per (product, unit), summed over one warehouse or all of them.
    pub fn liquidity(&self, warehouse: Option<&str>) -> StockTotals {
        let warehouse = warehouse.map(str::trim);
        let mut totals = StockTotals::new();
        for row in self.rows.values() {
            if warehouse.is_some_and(|w| w != row.warehouse) {
                continue;
            }
            totals.add(row.product_id, &row.unit, row.balance);
        }
        totals
    }
}

fn completed<'a>(orders: impl IntoIterator<Item = &'a Order>) -> impl Iterator<Item = &'a Order> {
    orders.into_iter().filter(|o| o.is_completed())
}
