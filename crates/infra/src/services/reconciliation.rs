use tracing::instrument;

use stockroom_core::TenantId;
use stockroom_inventory::{BookBalances, ReconciliationReport, reconcile};

use super::ServiceError;
use crate::config::StockroomConfig;
use crate::services::SnapshotService;
use crate::store::{CatalogSnapshot, CatalogStore, LotStore, OrderStore};

/// Compares order-book balances with the physical lot snapshot.
#[derive(Debug)]
pub struct ReconciliationService<S> {
    snapshots: SnapshotService<S>,
}

impl<S: LotStore + OrderStore> ReconciliationService<S> {
    pub fn new(store: S, config: StockroomConfig) -> Self {
        Self {
            snapshots: SnapshotService::new(store, config),
        }
    }

    pub fn snapshots(&self) -> &SnapshotService<S> {
        &self.snapshots
    }

    /// Book minus physical per (product, unit), in the units each side recorded.
    #[instrument(skip(self), fields(tenant_id = %tenant_id), err)]
    pub fn reconcile(&self, tenant_id: TenantId, warehouse: Option<&str>) -> Result<ReconciliationReport, ServiceError> {
        let warehouse = self.snapshots.config().warehouse_filter(warehouse);
        let physical = self.snapshots.get_physical_inventory_snapshot(tenant_id, warehouse)?;

        let orders = self.snapshots.store().orders(tenant_id, warehouse)?;
        let book = BookBalances::from_orders(&orders).liquidity(warehouse);

        let report = reconcile(&book, &physical.totals, physical.captured_at);
        log_report(&report);
        Ok(report)
    }
}

impl<S: LotStore + OrderStore + CatalogStore> ReconciliationService<S> {
    /// Same as [`reconcile`](Self::reconcile) after folding both sides into
    /// each product's base unit, so "2 Thùng" on one side matches "48 Lon"
    /// on the other.
    #[instrument(skip(self), fields(tenant_id = %tenant_id), err)]
    pub fn reconcile_in_base_units(
        &self,
        tenant_id: TenantId,
        warehouse: Option<&str>,
    ) -> Result<ReconciliationReport, ServiceError> {
        let config = self.snapshots.config();
        let warehouse = config.warehouse_filter(warehouse);
        let physical = self.snapshots.get_physical_inventory_snapshot(tenant_id, warehouse)?;

        let store = self.snapshots.store();
        let orders = store.orders(tenant_id, warehouse)?;
        let catalog = CatalogSnapshot::load(store, tenant_id)?;
        let resolver = catalog.resolver(config.kilogram_synonyms.as_slice());

        let book = BookBalances::from_orders(&orders)
            .liquidity(warehouse)
            .consolidate_to_base(&resolver, &catalog.products);
        let physical_totals = physical.totals.consolidate_to_base(&resolver, &catalog.products);

        let report = reconcile(&book, &physical_totals, physical.captured_at);
        log_report(&report);
        Ok(report)
    }
}

fn log_report(report: &ReconciliationReport) {
    if report.is_clean() {
        tracing::info!(matched = report.matched, "stock reconciled");
    } else {
        tracing::warn!(
            matched = report.matched,
            discrepancies = report.discrepancies.len(),
            "stock discrepancies found"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStockStore;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use std::sync::Arc;
    use stockroom_core::{LotId, OrderId, ProductId, UnitId};
    use stockroom_inventory::{Lot, LotContents, LotLine, LotStatus, Order, OrderDirection, OrderLine, OrderStatus};
    use stockroom_products::{NewProduct, Product};
    use stockroom_units::{ProductUnit, Unit};

    fn inbound(tenant: TenantId, product: ProductId, unit: &str, qty: i64) -> Order {
        Order {
            id: OrderId::new(),
            tenant_id: tenant,
            code: "PNK-1".to_string(),
            direction: OrderDirection::Inbound,
            kind: "Import".to_string(),
            status: OrderStatus::Completed,
            order_type: None,
            warehouse: "A".to_string(),
            description: None,
            lines: vec![OrderLine {
                product_id: product,
                product_name: "Bia".to_string(),
                unit: unit.to_string(),
                quantity: Decimal::from(qty),
                price: Decimal::ZERO,
            }],
            created_at: Utc::now(),
        }
    }

    /// A lot whose item lines name their units explicitly.
    fn lot(tenant: TenantId, product: ProductId, lines: &[(&str, f64)]) -> Lot {
        Lot {
            id: LotId::new(),
            tenant_id: tenant,
            warehouse: "A".to_string(),
            status: LotStatus::Active,
            contents: LotContents::MultiItem(
                lines
                    .iter()
                    .map(|(unit, qty)| LotLine {
                        product_id: Some(product),
                        quantity: *qty,
                        unit: Some(unit.to_string()),
                        product_unit: None,
                    })
                    .collect(),
            ),
        }
    }

    /// Store with "Bia" sold by the can (base) and the case of 24.
    fn beer_store() -> (Arc<InMemoryStockStore>, TenantId, ProductId) {
        let store = Arc::new(InMemoryStockStore::new());
        let (tenant, p, lon, thung) = (TenantId::new(), ProductId::new(), UnitId::new(), UnitId::new());
        store
            .add_units(
                tenant,
                [(lon, "Lon"), (thung, "Thùng")].map(|(id, name)| Unit {
                    id,
                    name: name.to_string(),
                }),
            )
            .unwrap();
        store
            .add_product_units(
                tenant,
                [ProductUnit {
                    product_id: p,
                    unit_id: thung,
                    conversion_rate: 24.0,
                }],
            )
            .unwrap();
        store
            .add_products([Product::new(NewProduct {
                id: p,
                tenant_id: tenant,
                sku: "BIA".to_string(),
                name: "Bia".to_string(),
                base_unit: Some("Lon".to_string()),
            })
            .unwrap()])
            .unwrap();
        (store, tenant, p)
    }

    #[test]
    fn matching_sides_are_clean() {
        let store = Arc::new(InMemoryStockStore::new());
        let (tenant, p) = (TenantId::new(), ProductId::new());
        store.insert_order(&inbound(tenant, p, "Lon", 12)).unwrap();
        store.insert_lot(lot(tenant, p, &[("Lon", 12.0)])).unwrap();

        let report = ReconciliationService::new(store, StockroomConfig::default())
            .reconcile(tenant, Some("A"))
            .unwrap();
        assert!(report.is_clean());
        assert_eq!(report.matched, 1);
    }

    #[test]
    fn missing_stock_shows_as_positive_diff() {
        let store = Arc::new(InMemoryStockStore::new());
        let (tenant, p) = (TenantId::new(), ProductId::new());
        store.insert_order(&inbound(tenant, p, "Lon", 12)).unwrap();
        store.insert_lot(lot(tenant, p, &[("Lon", 9.0)])).unwrap();

        let report = ReconciliationService::new(store, StockroomConfig::default())
            .reconcile(tenant, None)
            .unwrap();
        assert_eq!(report.discrepancies.len(), 1);
        assert_eq!(report.discrepancies[0].diff, Decimal::from(3));
    }

    #[test]
    fn shelf_only_stock_is_reported() {
        let (store, tenant, p) = beer_store();
        store.insert_order(&inbound(tenant, p, "Lon", 12)).unwrap();
        store.insert_lot(lot(tenant, p, &[("Lon", 12.0), ("Thùng", 1.0)])).unwrap();

        let report = ReconciliationService::new(store, StockroomConfig::default())
            .reconcile(tenant, Some("A"))
            .unwrap();
        assert_eq!(report.matched, 1);
        assert_eq!(report.discrepancies.len(), 1);
        let d = &report.discrepancies[0];
        assert_eq!(d.product_id, p);
        assert_eq!(d.book, Decimal::ZERO);
        assert_eq!(d.physical, Decimal::ONE);
        assert_eq!(d.diff, Decimal::NEGATIVE_ONE);
    }

    #[test]
    fn single_item_lots_count_in_the_product_unit() {
        let (store, tenant, p) = beer_store();
        store.insert_order(&inbound(tenant, p, "Lon", 2)).unwrap();
        store
            .insert_lot(Lot {
                id: LotId::new(),
                tenant_id: tenant,
                warehouse: "A".to_string(),
                status: LotStatus::Active,
                contents: LotContents::SingleItem(LotLine {
                    product_id: Some(p),
                    quantity: 2.0,
                    unit: Some("Thùng".to_string()),
                    product_unit: None,
                }),
            })
            .unwrap();

        let report = ReconciliationService::new(store, StockroomConfig::default())
            .reconcile(tenant, None)
            .unwrap();
        assert!(report.is_clean());
    }

    #[test]
    fn base_units_match_across_packagings() {
        let (store, tenant, p) = beer_store();
        store.insert_order(&inbound(tenant, p, "Thùng", 2)).unwrap();
        store.insert_lot(lot(tenant, p, &[("Lon", 48.0)])).unwrap();

        let service = ReconciliationService::new(store, StockroomConfig::default());
        assert!(!service.reconcile(tenant, None).unwrap().is_clean());
        assert!(service.reconcile_in_base_units(tenant, None).unwrap().is_clean());
    }

    #[test]
    fn mixed_packaging_lots_reconcile_in_base_units() {
        let (store, tenant, p) = beer_store();
        store.insert_order(&inbound(tenant, p, "Thùng", 3)).unwrap();
        store.insert_order(&inbound(tenant, p, "Lon", 6)).unwrap();
        store.insert_lot(lot(tenant, p, &[("Thùng", 2.0), ("Lon", 18.0)])).unwrap();
        store.insert_lot(lot(tenant, p, &[("Lon", 12.0)])).unwrap();

        let service = ReconciliationService::new(store, StockroomConfig::default());
        let report = service.reconcile_in_base_units(tenant, Some("A")).unwrap();
        assert!(report.is_clean(), "unexpected discrepancies: {:?}", report.discrepancies);
        assert_eq!(report.matched, 1);
        assert!(!service.reconcile(tenant, Some("A")).unwrap().is_clean());
    }
}
