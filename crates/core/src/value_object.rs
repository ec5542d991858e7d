//! Value object trait: equality by value, not identity.
//!
//! Value objects have **no identity**; they are defined entirely by their
//! attribute values. The lookup maps used for unit conversion (`UnitCatalog`,
//! `ConversionTable`) are value objects: built once per request or session,
//! never mutated afterwards, and passed explicitly to whoever needs them.

/// Marker trait for value objects.
///
/// ## Usage Pattern
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq)]
/// struct ConversionTable { /* ... */ }
///
/// impl ValueObject for ConversionTable {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
