//! Persistence seams for conversion pairs.
//!
//! The domain builds a [`ConversionPair`]; a [`TransactionalLedger`] writes
//! both legs or neither. Implementations live in the infra crate.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockroom_core::{DomainError, ExpectedVersion, ProductId, TenantId};

use crate::order::{Order, OrderDirection, OrderStatus};

/// Stock position guarded by the unbundle lock and the optimistic version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PositionKey {
    pub tenant_id: TenantId,
    pub warehouse: String,
    pub product_id: ProductId,
}

impl PositionKey {
    pub fn new(tenant_id: TenantId, warehouse: impl Into<String>, product_id: ProductId) -> Self {
        Self {
            tenant_id,
            warehouse: warehouse.into().trim().to_string(),
            product_id,
        }
    }
}

/// Outbound leg (source units removed) and inbound leg (finer units added).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionPair {
    pub position: PositionKey,
    pub outbound: Order,
    pub inbound: Order,
}

impl ConversionPair {
    /// Both legs must be completed conversion orders on this pair's position.
    pub fn validate(&self) -> Result<(), LedgerError> {
        let legs = [
            (&self.outbound, OrderDirection::Outbound),
            (&self.inbound, OrderDirection::Inbound),
        ];

        for (leg, direction) in legs {
            leg.validate().map_err(|e| LedgerError::InvalidPair(e.to_string()))?;

            if leg.direction != direction {
                return Err(LedgerError::InvalidPair(format!(
                    "{} leg has direction {}",
                    direction.as_str(),
                    leg.direction.as_str()
                )));
            }
            if !leg.is_conversion() || leg.status != OrderStatus::Completed {
                return Err(LedgerError::InvalidPair(format!(
                    "{} must be a completed conversion order",
                    leg.code
                )));
            }
            if leg.tenant_id != self.position.tenant_id || leg.warehouse.trim() != self.position.warehouse {
                return Err(LedgerError::InvalidPair(format!(
                    "{} is outside the pair's tenant/warehouse scope",
                    leg.code
                )));
            }
            if leg.lines.iter().any(|l| l.product_id != self.position.product_id) {
                return Err(LedgerError::InvalidPair(format!(
                    "{} has a line for another product",
                    leg.code
                )));
            }
        }

        if self.outbound.id == self.inbound.id {
            return Err(LedgerError::InvalidPair("legs share an order id".to_string()));
        }
        Ok(())
    }
}

/// Ledger operation error.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("store failure: {0}")]
    Store(String),

    #[error("optimistic concurrency check failed: {0}")]
    Conflict(String),

    #[error("invalid conversion pair: {0}")]
    InvalidPair(String),

    /// One leg was written and the other was not.
    #[error(
        "conversion pair partially written: {committed} committed, {failed} failed ({cause}); compensated: {compensated}"
    )]
    AtomicityGap {
        committed: String,
        failed: String,
        cause: String,
        compensated: bool,
    },
}

impl From<DomainError> for LedgerError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Conflict(msg) => LedgerError::Conflict(msg),
            other => LedgerError::InvalidPair(other.to_string()),
        }
    }
}

/// Writes conversion pairs atomically against a versioned stock position.
///
/// Implementations must:
/// - check `expected_version` against the position's current version
/// - persist both legs or neither
/// - bump the position version once per committed pair and return it
pub trait TransactionalLedger: Send + Sync {
    /// Current version of a stock position (0 if never written).
    fn stock_version(&self, position: &PositionKey) -> Result<u64, LedgerError>;

    fn commit_pair(&self, pair: &ConversionPair, expected_version: ExpectedVersion) -> Result<u64, LedgerError>;
}

impl<S> TransactionalLedger for Arc<S>
where
    S: TransactionalLedger + ?Sized,
{
    fn stock_version(&self, position: &PositionKey) -> Result<u64, LedgerError> {
        (**self).stock_version(position)
    }

    fn commit_pair(&self, pair: &ConversionPair, expected_version: ExpectedVersion) -> Result<u64, LedgerError> {
        (**self).commit_pair(pair, expected_version)
    }
}

/// Source of human-readable order codes (`{PREFIX}-{PXK|PNK}-{DDMMYY}-{NNN}`).
pub trait OrderCodeGenerator: Send + Sync {
    fn next_code(&self, tenant_id: TenantId, direction: OrderDirection) -> Result<String, LedgerError>;
}

impl<G> OrderCodeGenerator for Arc<G>
where
    G: OrderCodeGenerator + ?Sized,
{
    fn next_code(&self, tenant_id: TenantId, direction: OrderDirection) -> Result<String, LedgerError> {
        (**self).next_code(tenant_id, direction)
    }
}
