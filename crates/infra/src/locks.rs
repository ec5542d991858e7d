//! Per-position serialization of unbundle decisions.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};

use stockroom_inventory::PositionKey;

/// Held while a position's read-plan-commit cycle runs. Released on drop.
pub type PositionGuard = ArcMutexGuard<RawMutex, ()>;

/// Registry of one mutex per (tenant, warehouse, product).
#[derive(Debug, Default)]
pub struct UnbundleLocks {
    registry: Mutex<HashMap<PositionKey, Arc<Mutex<()>>>>,
}

impl UnbundleLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until the position is free and take it.
    pub fn lock(&self, position: &PositionKey) -> PositionGuard {
        let slot = {
            let mut registry = self.registry.lock();
            registry.entry(position.clone()).or_default().clone()
        };
        slot.lock_arc()
    }

    /// Take the position only if nobody holds it.
    pub fn try_lock(&self, position: &PositionKey) -> Option<PositionGuard> {
        let slot = {
            let mut registry = self.registry.lock();
            registry.entry(position.clone()).or_default().clone()
        };
        slot.try_lock_arc()
    }

    /// Drop entries nobody is holding or waiting on.
    pub fn prune(&self) {
        self.registry.lock().retain(|_, slot| Arc::strong_count(slot) > 1);
    }

    pub fn len(&self) -> usize {
        self.registry.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.lock().is_empty()
    }
}
