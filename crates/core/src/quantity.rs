//! Fixed-point quantity rules.
//!
//! Rates and in-flight arithmetic use `f64`; anything persisted or summed across
//! records goes through [`to_fixed`] so repeated conversions cannot drift.

use rust_decimal::Decimal;

use crate::error::{DomainError, DomainResult};

/// Tolerance for floating-point noise at integer boundaries.
pub const QTY_EPSILON: f64 = 1e-6;

/// Decimal places kept on persisted quantities.
pub const QTY_SCALE: u32 = 6;

/// Convert a quantity into its persisted fixed-point form.
pub fn to_fixed(value: f64) -> DomainResult<Decimal> {
    if !value.is_finite() {
        return Err(DomainError::validation(format!("quantity is not finite: {value}")));
    }
    Decimal::from_f64_retain(value)
        .map(|d| d.round_dp(QTY_SCALE).normalize())
        .ok_or_else(|| DomainError::validation(format!("quantity out of range: {value}")))
}

/// Whole packages needed to cover `value`, rounding up.
///
/// A partial package cannot be opened, so this always rounds upward, but values
/// within [`QTY_EPSILON`] above an integer are treated as that integer.
pub fn ceil_units(value: f64) -> f64 {
    (value - QTY_EPSILON).ceil()
}
