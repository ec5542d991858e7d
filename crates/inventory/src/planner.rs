//! Decides whether a request needs unbundling and what to break.

use serde::{Deserialize, Serialize};

use stockroom_core::QTY_EPSILON;
use stockroom_products::Product;
use stockroom_units::{UnitConversionResolver, normalize_unit_name, same_unit};

use crate::aggregator::StockTotals;
use crate::unbundle::units_to_break;

/// A source unit to break so the requested unit covers the shortfall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnbundlePlan {
    pub source_unit: String,
    /// Requested units produced per source unit.
    pub rate: f64,
    pub units_to_break: f64,
    pub source_available: f64,
    pub summary: String,
}

/// Plan an unbundle for `qty` of `requested_unit`, or `None` if none is needed
/// or no single source unit has enough stock.
///
/// The product's base unit is tried first, then its other alternate units in
/// declaration order.
pub fn plan_unbundle(
    product: &Product,
    requested_unit: &str,
    qty: f64,
    resolver: &UnitConversionResolver<'_>,
    liquidity: &StockTotals,
) -> Option<UnbundlePlan> {
    let product_id = product.id_typed();
    if requested_unit.trim().is_empty() {
        return None;
    }

    let liquid = liquidity.get_f64(product_id, requested_unit);
    if liquid >= qty - QTY_EPSILON {
        return None;
    }
    let deficit = qty - liquid;

    if let Some(base) = product.base_unit().filter(|b| !same_unit(b, requested_unit)) {
        let available = liquidity.get_f64(product_id, base);
        let declared = resolver.declared_rate(product_id, requested_unit).ok();

        if let Some(requested_to_base) = declared.filter(|r| available > 0.0 && *r > 0.0) {
            let rate = 1.0 / requested_to_base;
            if let Some(plan) = candidate(base, rate, deficit, available, requested_unit) {
                return Some(plan);
            }
        }
    }

    let requested_to_base = if product.is_base_unit(requested_unit) {
        1.0
    } else {
        resolver
            .declared_rate(product_id, requested_unit)
            .ok()
            .filter(|r| *r > 0.0)
            .unwrap_or(1.0)
    };

    let requested_key = normalize_unit_name(requested_unit);
    for (unit_id, alt_to_base) in resolver.rates().alternate_units(product_id) {
        let Some(alt_name) = resolver.units().unit_name(unit_id) else {
            continue;
        };
        if normalize_unit_name(alt_name) == requested_key {
            continue;
        }

        let available = liquidity.get_f64(product_id, alt_name);
        if available <= 0.0 {
            continue;
        }

        if let Some(plan) = candidate(alt_name, alt_to_base / requested_to_base, deficit, available, requested_unit) {
            return Some(plan);
        }
    }

    None
}

fn candidate(source: &str, rate: f64, deficit: f64, available: f64, requested_unit: &str) -> Option<UnbundlePlan> {
    let units = units_to_break(deficit, rate).filter(|n| *n > 0.0 && available >= *n)?;
    Some(UnbundlePlan {
        source_unit: source.to_string(),
        rate,
        units_to_break: units,
        source_available: available,
        summary: format!("Auto: break {units} {source} -> {} {requested_unit}", format_amount(units * rate)),
    })
}

/// Two decimals, dropping a trailing `.00`.
fn format_amount(value: f64) -> String {
    let s = format!("{value:.2}");
    match s.strip_suffix(".00") {
        Some(whole) => whole.to_string(),
        None => s,
    }
}
