//! Conversion pairs over a non-transactional order store.
//!
//! The outbound leg is written first, then the inbound leg. If the inbound
//! write fails the outbound leg is deleted again (compensating action). The
//! caller always learns which case happened through
//! [`LedgerError::AtomicityGap`].

use std::collections::HashMap;
use std::sync::Mutex;

use stockroom_core::ExpectedVersion;
use stockroom_inventory::{ConversionPair, LedgerError, PositionKey, TransactionalLedger};

use crate::store::OrderStore;

/// Saga-style [`TransactionalLedger`] over any [`OrderStore`].
///
/// Position versions are tracked in-process, so only commits made through
/// this ledger are seen by the optimistic check.
#[derive(Debug)]
pub struct SagaLedger<S> {
    store: S,
    versions: Mutex<HashMap<PositionKey, u64>>,
}

impl<S: OrderStore> SagaLedger<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            versions: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: OrderStore> TransactionalLedger for SagaLedger<S> {
    fn stock_version(&self, position: &PositionKey) -> Result<u64, LedgerError> {
        let versions = self
            .versions
            .lock()
            .map_err(|_| LedgerError::Store("lock poisoned".to_string()))?;
        Ok(versions.get(position).copied().unwrap_or(0))
    }

    fn commit_pair(&self, pair: &ConversionPair, expected_version: ExpectedVersion) -> Result<u64, LedgerError> {
        pair.validate()?;

        // Held across both writes so commits on this ledger serialize.
        let mut versions = self
            .versions
            .lock()
            .map_err(|_| LedgerError::Store("lock poisoned".to_string()))?;
        let current = versions.get(&pair.position).copied().unwrap_or(0);
        expected_version.check(current)?;

        // Nothing written yet: a failure here is a plain store error.
        self.store.insert_order(&pair.outbound)?;

        if let Err(err) = self.store.insert_order(&pair.inbound) {
            let compensated = match self.store.delete_order(pair.outbound.tenant_id, pair.outbound.id) {
                Ok(()) => true,
                Err(undo_err) => {
                    tracing::error!(
                        outbound = %pair.outbound.code,
                        error = %undo_err,
                        "failed to compensate outbound conversion leg"
                    );
                    false
                }
            };
            tracing::warn!(
                outbound = %pair.outbound.code,
                inbound = %pair.inbound.code,
                error = %err,
                compensated,
                "inbound conversion leg failed"
            );
            return Err(LedgerError::AtomicityGap {
                committed: pair.outbound.code.clone(),
                failed: pair.inbound.code.clone(),
                cause: err.to_string(),
                compensated,
            });
        }

        let version = current + 1;
        versions.insert(pair.position.clone(), version);
        Ok(version)
    }
}
