//! Units of measure and per-product conversion rates.
//!
//! Everything here is pure: the lookup maps are immutable value objects built
//! per request or session, and [`UnitConversionResolver`] borrows them.

pub mod catalog;
pub mod conversion;
pub mod resolver;

pub use catalog::{Unit, UnitCatalog, normalize_unit_name, same_unit};
pub use conversion::{ConversionTable, ProductUnit};
pub use resolver::{Conversion, DEFAULT_KILOGRAM_SYNONYMS, Passthrough, UnitConversionResolver};
