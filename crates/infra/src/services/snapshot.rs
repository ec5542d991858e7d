use chrono::Utc;
use tracing::instrument;

use stockroom_core::TenantId;
use stockroom_inventory::{PhysicalSnapshot, aggregate_lot_data_with_default};

use crate::config::StockroomConfig;
use crate::store::{LotFilter, LotStore, StoreError};

/// Physical stock snapshots from active lots.
#[derive(Debug)]
pub struct SnapshotService<L> {
    lots: L,
    config: StockroomConfig,
}

impl<L: LotStore> SnapshotService<L> {
    pub fn new(lots: L, config: StockroomConfig) -> Self {
        Self { lots, config }
    }

    pub fn store(&self) -> &L {
        &self.lots
    }

    pub fn config(&self) -> &StockroomConfig {
        &self.config
    }

    /// Aggregate the tenant's active lots, optionally in one warehouse.
    ///
    /// The "all warehouses" label and a blank name both mean no filter. A
    /// store failure is returned as-is; there is no partial snapshot.
    #[instrument(skip(self), fields(tenant_id = %tenant_id), err)]
    pub fn get_physical_inventory_snapshot(
        &self,
        tenant_id: TenantId,
        warehouse: Option<&str>,
    ) -> Result<PhysicalSnapshot, StoreError> {
        let warehouse = self.config.warehouse_filter(warehouse);
        let mut filter = LotFilter::active();
        if let Some(w) = warehouse {
            filter = filter.in_warehouse(w);
        }

        let captured_at = Utc::now();
        let lots = self.lots.lots(tenant_id, &filter)?;
        let totals = aggregate_lot_data_with_default(&lots, &self.config.default_unit);

        tracing::debug!(lots = lots.len(), keys = totals.len(), "physical snapshot built");

        Ok(PhysicalSnapshot {
            tenant_id,
            warehouse: warehouse.map(str::to_string),
            captured_at,
            totals,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStockStore;
    use rust_decimal::Decimal;
    use std::sync::Arc;
    use stockroom_core::{LotId, ProductId};
    use stockroom_inventory::{Lot, LotContents, LotLine, LotStatus};

    struct BrokenLots;

    impl LotStore for BrokenLots {
        fn lots(&self, _tenant_id: TenantId, _filter: &LotFilter) -> Result<Vec<Lot>, StoreError> {
            Err(StoreError::Backend("timeout".to_string()))
        }
    }

    fn lot(tenant_id: TenantId, warehouse: &str, status: LotStatus, product_id: ProductId, qty: f64) -> Lot {
        Lot {
            id: LotId::new(),
            tenant_id,
            warehouse: warehouse.to_string(),
            status,
            contents: LotContents::SingleItem(LotLine {
                product_id: Some(product_id),
                quantity: qty,
                unit: None,
                product_unit: None,
            }),
        }
    }

    #[test]
    fn only_active_lots_count() {
        let store = Arc::new(InMemoryStockStore::new());
        let (tenant, p) = (TenantId::new(), ProductId::new());
        store.insert_lot(lot(tenant, "A", LotStatus::Active, p, 3.0)).unwrap();
        store.insert_lot(lot(tenant, "A", LotStatus::Closed, p, 100.0)).unwrap();
        store.insert_lot(lot(tenant, "B", LotStatus::Active, p, 2.0)).unwrap();
        store.insert_lot(lot(TenantId::new(), "A", LotStatus::Active, p, 50.0)).unwrap();

        let service = SnapshotService::new(store, StockroomConfig::default());

        let all = service.get_physical_inventory_snapshot(tenant, None).unwrap();
        assert_eq!(all.totals.get(p, "Cái"), Decimal::from(5));
        assert_eq!(all.warehouse, None);

        let a = service.get_physical_inventory_snapshot(tenant, Some("A")).unwrap();
        assert_eq!(a.totals.get(p, "Cái"), Decimal::from(3));
        assert_eq!(a.warehouse.as_deref(), Some("A"));

        let label = service.get_physical_inventory_snapshot(tenant, Some("Tất cả")).unwrap();
        assert_eq!(label.totals, all.totals);
    }

    #[test]
    fn store_failure_surfaces() {
        let service = SnapshotService::new(BrokenLots, StockroomConfig::default());
        assert!(matches!(
            service.get_physical_inventory_snapshot(TenantId::new(), None),
            Err(StoreError::Backend(_))
        ));
    }
}
