//! Quantity conversion between a product's units.
//!
//! Missing configuration is never an error here. An unmapped unit, an
//! undeclared rate or a missing input leaves the quantity unchanged, and the
//! returned [`Conversion`] says which of those happened so callers can warn.

use stockroom_core::{ProductId, UnitId};

use crate::catalog::{UnitCatalog, same_unit};
use crate::conversion::ConversionTable;

/// Unit names recognized as kilograms, in lookup order.
pub const DEFAULT_KILOGRAM_SYNONYMS: [&str; 4] = ["kg", "kilogram", "ki-lo-gam", "kgs"];

/// Why a quantity passed through without conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Passthrough {
    /// Product, unit or base unit was not supplied.
    MissingInput,
    /// The unit name is not in the unit catalog.
    UnknownUnit,
    /// The unit exists but the product declares no usable rate for it.
    UndeclaredRate,
}

/// Outcome of a conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Conversion {
    /// A declared rate was applied. `rate` is the multiplier used.
    Converted { quantity: f64, rate: f64 },
    /// Source and target are the same unit.
    Unchanged { quantity: f64 },
    /// Configuration gap; the quantity is returned as-is.
    Passthrough { quantity: f64, reason: Passthrough },
}

impl Conversion {
    pub fn quantity(&self) -> f64 {
        match *self {
            Conversion::Converted { quantity, .. }
            | Conversion::Unchanged { quantity }
            | Conversion::Passthrough { quantity, .. } => quantity,
        }
    }

    pub fn passthrough_reason(&self) -> Option<Passthrough> {
        match *self {
            Conversion::Passthrough { reason, .. } => Some(reason),
            _ => None,
        }
    }

    pub fn is_passthrough(&self) -> bool {
        self.passthrough_reason().is_some()
    }

    /// Multiplier this outcome applied (1 for unchanged and passthrough).
    fn rate(&self) -> f64 {
        match *self {
            Conversion::Converted { rate, .. } => rate,
            _ => 1.0,
        }
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Converts quantities using a borrowed [`UnitCatalog`] and [`ConversionTable`].
#[derive(Debug, Clone)]
pub struct UnitConversionResolver<'a> {
    units: &'a UnitCatalog,
    rates: &'a ConversionTable,
    kilogram_synonyms: Vec<String>,
}

impl<'a> UnitConversionResolver<'a> {
    pub fn new(units: &'a UnitCatalog, rates: &'a ConversionTable) -> Self {
        Self {
            units,
            rates,
            kilogram_synonyms: DEFAULT_KILOGRAM_SYNONYMS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Replace the kilogram synonym list (lookup order matters).
    pub fn with_kilogram_synonyms<S: Into<String>>(mut self, synonyms: impl IntoIterator<Item = S>) -> Self {
        self.kilogram_synonyms = synonyms.into_iter().map(Into::into).collect();
        self
    }

    pub fn units(&self) -> &'a UnitCatalog {
        self.units
    }

    pub fn rates(&self) -> &'a ConversionTable {
        self.rates
    }

    pub fn resolve_unit_id(&self, name: &str) -> Option<UnitId> {
        self.units.resolve_unit_id(name)
    }

    /// Declared `unit → base` rate for a unit name.
    pub fn declared_rate(&self, product_id: ProductId, unit: &str) -> Result<f64, Passthrough> {
        let unit_id = self.resolve_unit_id(unit).ok_or(Passthrough::UnknownUnit)?;
        self.rates
            .rate(product_id, unit_id)
            .ok_or(Passthrough::UndeclaredRate)
    }

    /// Convert `qty` expressed in `unit` into the product's base unit.
    pub fn to_base_amount(
        &self,
        product_id: Option<ProductId>,
        unit: Option<&str>,
        qty: f64,
        base_unit: Option<&str>,
    ) -> Conversion {
        let (Some(product_id), Some(unit), Some(base_unit)) = (product_id, present(unit), present(base_unit)) else {
            return Conversion::Passthrough {
                quantity: qty,
                reason: Passthrough::MissingInput,
            };
        };

        if same_unit(unit, base_unit) {
            return Conversion::Unchanged { quantity: qty };
        }

        match self.declared_rate(product_id, unit) {
            Ok(rate) => Conversion::Converted {
                quantity: qty * rate,
                rate,
            },
            Err(reason) => Conversion::Passthrough { quantity: qty, reason },
        }
    }

    /// How many kilograms one base unit weighs, or `None` if there is no path.
    ///
    /// A kilogram alternate unit declared with rate `R` means `1 kg = R base`,
    /// so one base unit is `1/R` kg. The first synonym configured for the
    /// product decides; a non-positive rate there means no path.
    pub fn base_to_kg_rate(&self, product_id: Option<ProductId>, base_unit: Option<&str>) -> Option<f64> {
        let product_id = product_id?;
        let base_unit = present(base_unit)?;

        if self.kilogram_synonyms.iter().any(|kg| same_unit(kg, base_unit)) {
            return Some(1.0);
        }

        let kg_rate = self.kilogram_synonyms.iter().find_map(|name| {
            let unit_id = self.resolve_unit_id(name)?;
            self.rates.rate(product_id, unit_id)
        })?;

        if kg_rate <= 0.0 || !kg_rate.is_finite() {
            return None;
        }
        Some(1.0 / kg_rate)
    }

    /// Convert `qty` from one unit to another through the base unit.
    pub fn convert_unit(
        &self,
        product_id: Option<ProductId>,
        from_unit: Option<&str>,
        to_unit: Option<&str>,
        qty: f64,
        base_unit: Option<&str>,
    ) -> Conversion {
        if let (Some(from), Some(to)) = (present(from_unit), present(to_unit)) {
            if same_unit(from, to) {
                return Conversion::Unchanged { quantity: qty };
            }
        }

        let to_base = self.to_base_amount(product_id, from_unit, qty, base_unit);
        let base_qty = to_base.quantity();

        let (Some(product_id), Some(to_unit), Some(base_unit)) = (product_id, present(to_unit), present(base_unit)) else {
            return Conversion::Passthrough {
                quantity: base_qty,
                reason: Passthrough::MissingInput,
            };
        };

        if same_unit(to_unit, base_unit) {
            return to_base;
        }

        let target_rate = match self.declared_rate(product_id, to_unit) {
            Ok(rate) if rate > 0.0 && rate.is_finite() => rate,
            Ok(_) => {
                return Conversion::Passthrough {
                    quantity: base_qty,
                    reason: Passthrough::UndeclaredRate,
                };
            }
            Err(reason) => {
                return Conversion::Passthrough { quantity: base_qty, reason };
            }
        };

        let quantity = base_qty / target_rate;
        match to_base {
            Conversion::Passthrough { reason, .. } => Conversion::Passthrough { quantity, reason },
            _ => Conversion::Converted {
                quantity,
                rate: to_base.rate() / target_rate,
            },
        }
    }

    /// Kilogram equivalent of `qty` in `unit`, or `None` if the product has no kilogram path.
    pub fn kilogram_amount(
        &self,
        product_id: Option<ProductId>,
        unit: Option<&str>,
        qty: f64,
        base_unit: Option<&str>,
    ) -> Option<f64> {
        let per_base = self.base_to_kg_rate(product_id, base_unit)?;
        Some(self.to_base_amount(product_id, unit, qty, base_unit).quantity() * per_base)
    }
}
