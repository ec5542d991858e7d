//! Inventory domain module.
//!
//! Physical stock (lots), book stock (completed orders), the reconciliation
//! between the two, and automatic unbundling of coarse packaging units.
//! Everything here is deterministic domain logic; persistence sits behind the
//! traits in [`ledger`].

pub mod aggregator;
pub mod balance;
pub mod ledger;
pub mod lot;
pub mod order;
pub mod planner;
pub mod reconciliation;
pub mod unbundle;

pub use aggregator::{
    DEFAULT_UNIT_LABEL, PhysicalSnapshot, StockKey, StockTotals, aggregate_lot_data,
    aggregate_lot_data_with_default,
};
pub use balance::{BalanceMode, BalanceRow, BookBalances};
pub use ledger::{ConversionPair, LedgerError, OrderCodeGenerator, PositionKey, TransactionalLedger};
pub use lot::{Lot, LotContents, LotLine, LotStatus};
pub use order::{CONVERSION_KIND, Order, OrderDirection, OrderLine, OrderStatus};
pub use planner::{UnbundlePlan, plan_unbundle};
pub use reconciliation::{Discrepancy, ReconciliationReport, reconcile};
pub use unbundle::{
    AUTO_CODE_SUFFIX, AutoUnbundleEngine, UnbundleError, UnbundleOutcome, UnbundleRequest,
    units_to_break,
};
