//! Store traits for reference data, lots and orders.
//!
//! All traits are synchronous and tenant-scoped. Backends:
//! - [`InMemoryStockStore`] for tests/dev
//! - [`PostgresStockStore`] for production

mod in_memory;
mod postgres;

pub use in_memory::InMemoryStockStore;
pub use postgres::PostgresStockStore;

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockroom_core::{OrderId, ProductId, TenantId};
use stockroom_inventory::{LedgerError, Lot, LotStatus, Order, OrderDirection, PositionKey};
use stockroom_products::{Product, ProductCatalog};
use stockroom_units::{ConversionTable, ProductUnit, Unit, UnitCatalog, UnitConversionResolver};

/// Store operation error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backend failure: {0}")]
    Backend(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("duplicate record: {0}")]
    Duplicate(String),

    #[error("failed to decode row: {0}")]
    Decode(String),

    #[error("invalid record: {0}")]
    Invalid(String),
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        LedgerError::Store(err.to_string())
    }
}

/// Admin-managed reference data: units, product units and products.
pub trait CatalogStore: Send + Sync {
    fn units(&self, tenant_id: TenantId) -> Result<Vec<Unit>, StoreError>;

    fn product_units(&self, tenant_id: TenantId) -> Result<Vec<ProductUnit>, StoreError>;

    fn products(&self, tenant_id: TenantId) -> Result<Vec<Product>, StoreError>;
}

/// Which lots to fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotFilter {
    pub status: Option<LotStatus>,
    pub warehouse: Option<String>,
}

impl LotFilter {
    pub fn active() -> Self {
        Self {
            status: Some(LotStatus::Active),
            warehouse: None,
        }
    }

    pub fn in_warehouse(mut self, warehouse: impl Into<String>) -> Self {
        self.warehouse = Some(warehouse.into());
        self
    }

    pub fn matches(&self, lot: &Lot) -> bool {
        self.status.is_none_or(|s| s == lot.status)
            && self
                .warehouse
                .as_deref()
                .is_none_or(|w| w.trim() == lot.warehouse.trim())
    }
}

/// Lots with their items.
pub trait LotStore: Send + Sync {
    fn lots(&self, tenant_id: TenantId, filter: &LotFilter) -> Result<Vec<Lot>, StoreError>;
}

/// Orders and their lines. Not transactional across calls.
pub trait OrderStore: Send + Sync {
    fn insert_order(&self, order: &Order) -> Result<(), StoreError>;

    fn delete_order(&self, tenant_id: TenantId, order_id: OrderId) -> Result<(), StoreError>;

    /// Orders of a tenant, optionally limited to one warehouse, oldest first.
    fn orders(&self, tenant_id: TenantId, warehouse: Option<&str>) -> Result<Vec<Order>, StoreError>;

    /// Orders created on `day` (UTC) in one direction.
    fn count_orders_on(&self, tenant_id: TenantId, direction: OrderDirection, day: NaiveDate)
    -> Result<u64, StoreError>;
}

/// Positions whose stock version an order write must bump, one per distinct product.
pub(crate) fn stock_positions(
    tenant_id: TenantId,
    warehouse: &str,
    product_ids: impl IntoIterator<Item = ProductId>,
) -> BTreeSet<PositionKey> {
    product_ids
        .into_iter()
        .map(|product_id| PositionKey::new(tenant_id, warehouse, product_id))
        .collect()
}

impl<S> CatalogStore for Arc<S>
where
    S: CatalogStore + ?Sized,
{
    fn units(&self, tenant_id: TenantId) -> Result<Vec<Unit>, StoreError> {
        (**self).units(tenant_id)
    }

    fn product_units(&self, tenant_id: TenantId) -> Result<Vec<ProductUnit>, StoreError> {
        (**self).product_units(tenant_id)
    }

    fn products(&self, tenant_id: TenantId) -> Result<Vec<Product>, StoreError> {
        (**self).products(tenant_id)
    }
}

impl<S> LotStore for Arc<S>
where
    S: LotStore + ?Sized,
{
    fn lots(&self, tenant_id: TenantId, filter: &LotFilter) -> Result<Vec<Lot>, StoreError> {
        (**self).lots(tenant_id, filter)
    }
}

impl<S> OrderStore for Arc<S>
where
    S: OrderStore + ?Sized,
{
    fn insert_order(&self, order: &Order) -> Result<(), StoreError> {
        (**self).insert_order(order)
    }

    fn delete_order(&self, tenant_id: TenantId, order_id: OrderId) -> Result<(), StoreError> {
        (**self).delete_order(tenant_id, order_id)
    }

    fn orders(&self, tenant_id: TenantId, warehouse: Option<&str>) -> Result<Vec<Order>, StoreError> {
        (**self).orders(tenant_id, warehouse)
    }

    fn count_orders_on(
        &self,
        tenant_id: TenantId,
        direction: OrderDirection,
        day: NaiveDate,
    ) -> Result<u64, StoreError> {
        (**self).count_orders_on(tenant_id, direction, day)
    }
}

/// Lookup maps of one tenant, loaded together.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    pub units: UnitCatalog,
    pub rates: ConversionTable,
    pub products: ProductCatalog,
}

impl CatalogSnapshot {
    pub fn load<S: CatalogStore + ?Sized>(store: &S, tenant_id: TenantId) -> Result<Self, StoreError> {
        Ok(Self {
            units: UnitCatalog::from_units(store.units(tenant_id)?),
            rates: ConversionTable::from_rows(store.product_units(tenant_id)?),
            products: ProductCatalog::from_products(store.products(tenant_id)?),
        })
    }

    /// Resolver over this snapshot using the given kilogram synonyms.
    pub fn resolver<S: AsRef<str>>(&self, kilogram_synonyms: &[S]) -> UnitConversionResolver<'_> {
        UnitConversionResolver::new(&self.units, &self.rates)
            .with_kilogram_synonyms(kilogram_synonyms.iter().map(|s| s.as_ref().to_string()))
    }
}
