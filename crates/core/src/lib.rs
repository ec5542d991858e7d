//! `stockroom-core`: shared building blocks for the warehouse domain.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the domain error model, optimistic version checks and the
//! fixed-point quantity rules every persisted quantity goes through.

pub mod entity;
pub mod error;
pub mod id;
pub mod quantity;
pub mod value_object;
pub mod version;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{LotId, OrderId, ProductId, TenantId, UnitId};
pub use quantity::{QTY_EPSILON, QTY_SCALE, ceil_units, to_fixed};
pub use value_object::ValueObject;
pub use version::ExpectedVersion;
