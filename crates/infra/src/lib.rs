//! Infrastructure layer: stores, ledgers, locks, order codes, config and the
//! services that tie them to the inventory domain.

pub mod codes;
pub mod config;
pub mod locks;
pub mod saga;
pub mod services;
pub mod store;


pub use codes::{DailyOrderCodeGenerator, format_order_code, system_prefix};
pub use config::{DEFAULT_ALL_WAREHOUSES_LABEL, StockroomConfig};
pub use locks::{PositionGuard, UnbundleLocks};
pub use saga::SagaLedger;
pub use services::{Availability, ReconciliationService, ServiceError, SnapshotService, StockRequest, UnbundleService};
pub use store::{
    CatalogSnapshot, CatalogStore, InMemoryStockStore, LotFilter, LotStore, OrderStore, PostgresStockStore, StoreError,
};
