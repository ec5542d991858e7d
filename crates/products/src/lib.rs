//! Products module.
//!
//! Products are admin-managed reference data. Each product designates exactly
//! one base unit, and all of its stock is ultimately reducible to that unit.

pub mod catalog;
pub mod product;

pub use catalog::ProductCatalog;
pub use product::{NewProduct, Product};
