//! Application services wiring stores, locks and the domain together.

pub mod reconciliation;
pub mod snapshot;
pub mod unbundle;

pub use reconciliation::ReconciliationService;
pub use snapshot::SnapshotService;
pub use unbundle::{Availability, StockRequest, UnbundleService};

use thiserror::Error;

use stockroom_core::ProductId;
use stockroom_inventory::{LedgerError, UnbundleError};

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Unbundle(#[from] UnbundleError),

    #[error("unknown product {0}")]
    UnknownProduct(ProductId),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ServiceError {
    /// Another writer changed the position between read and commit.
    pub fn is_conflict(&self) -> bool {
        match self {
            ServiceError::Ledger(LedgerError::Conflict(_)) => true,
            ServiceError::Unbundle(err) => err.is_conflict(),
            _ => false,
        }
    }
}
