use std::collections::HashMap;
use std::sync::RwLock;

use chrono::NaiveDate;

use stockroom_core::{ExpectedVersion, OrderId, ProductId, TenantId};
use stockroom_inventory::{
    ConversionPair, LedgerError, Lot, LotContents, LotLine, Order, OrderDirection, PositionKey, TransactionalLedger,
};
use stockroom_products::Product;
use stockroom_units::{ProductUnit, Unit};

use super::{CatalogStore, LotFilter, LotStore, OrderStore, StoreError, stock_positions};

#[derive(Debug, Default)]
struct State {
    units: HashMap<TenantId, Vec<Unit>>,
    product_units: HashMap<TenantId, Vec<ProductUnit>>,
    products: HashMap<TenantId, Vec<Product>>,
    lots: Vec<Lot>,
    orders: Vec<Order>,
    versions: HashMap<PositionKey, u64>,
}

impl State {
    fn bump(&mut self, order: &Order) {
        let product_ids = order.lines.iter().map(|l| l.product_id);
        for position in stock_positions(order.tenant_id, &order.warehouse, product_ids) {
            *self.versions.entry(position).or_default() += 1;
        }
    }

    fn contains_order(&self, order_id: OrderId) -> bool {
        self.orders.iter().any(|o| o.id == order_id)
    }
}

/// In-memory store implementing every store trait and an atomic ledger.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryStockStore {
    state: RwLock<State>,
}

impl InMemoryStockStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, State>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, State>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    pub fn add_units(&self, tenant_id: TenantId, units: impl IntoIterator<Item = Unit>) -> Result<(), StoreError> {
        self.write()?.units.entry(tenant_id).or_default().extend(units);
        Ok(())
    }

    pub fn add_product_units(
        &self,
        tenant_id: TenantId,
        rows: impl IntoIterator<Item = ProductUnit>,
    ) -> Result<(), StoreError> {
        self.write()?.product_units.entry(tenant_id).or_default().extend(rows);
        Ok(())
    }

    pub fn add_products(&self, products: impl IntoIterator<Item = Product>) -> Result<(), StoreError> {
        let mut state = self.write()?;
        for product in products {
            state.products.entry(product.tenant_id()).or_default().push(product);
        }
        Ok(())
    }

    pub fn insert_lot(&self, lot: Lot) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if state.lots.iter().any(|l| l.id == lot.id) {
            return Err(StoreError::Duplicate(format!("lot {}", lot.id)));
        }
        state.lots.push(lot);
        Ok(())
    }
}

impl CatalogStore for InMemoryStockStore {
    fn units(&self, tenant_id: TenantId) -> Result<Vec<Unit>, StoreError> {
        Ok(self.read()?.units.get(&tenant_id).cloned().unwrap_or_default())
    }

    fn product_units(&self, tenant_id: TenantId) -> Result<Vec<ProductUnit>, StoreError> {
        Ok(self.read()?.product_units.get(&tenant_id).cloned().unwrap_or_default())
    }

    fn products(&self, tenant_id: TenantId) -> Result<Vec<Product>, StoreError> {
        Ok(self.read()?.products.get(&tenant_id).cloned().unwrap_or_default())
    }
}

impl LotStore for InMemoryStockStore {
    fn lots(&self, tenant_id: TenantId, filter: &LotFilter) -> Result<Vec<Lot>, StoreError> {
        let state = self.read()?;
        let base_units: HashMap<ProductId, Option<String>> = state
            .products
            .get(&tenant_id)
            .map(|products| {
                products
                    .iter()
                    .map(|p| (p.id_typed(), p.base_unit().map(str::to_string)))
                    .collect()
            })
            .unwrap_or_default();

        // Each line's product unit comes from the catalog, like the SQL join.
        let join = |line: &mut LotLine| {
            line.product_unit = line
                .product_id
                .and_then(|id| base_units.get(&id).cloned().flatten());
        };

        Ok(state
            .lots
            .iter()
            .filter(|l| l.tenant_id == tenant_id && filter.matches(l))
            .cloned()
            .map(|mut lot| {
                match &mut lot.contents {
                    LotContents::SingleItem(line) => join(line),
                    LotContents::MultiItem(items) => {
                        for item in items {
                            join(item);
                        }
                    }
                }
                lot
            })
            .collect())
    }
}

impl OrderStore for InMemoryStockStore {
    fn insert_order(&self, order: &Order) -> Result<(), StoreError> {
        order.validate().map_err(|e| StoreError::Invalid(e.to_string()))?;

        let mut state = self.write()?;
        if state.contains_order(order.id) {
            return Err(StoreError::Duplicate(format!("order {}", order.id)));
        }
        state.bump(order);
        state.orders.push(order.clone());
        Ok(())
    }

    fn delete_order(&self, tenant_id: TenantId, order_id: OrderId) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let idx = state
            .orders
            .iter()
            .position(|o| o.id == order_id && o.tenant_id == tenant_id)
            .ok_or_else(|| StoreError::NotFound(format!("order {order_id}")))?;
        let removed = state.orders.remove(idx);
        state.bump(&removed);
        Ok(())
    }

    fn orders(&self, tenant_id: TenantId, warehouse: Option<&str>) -> Result<Vec<Order>, StoreError> {
        let warehouse = warehouse.map(str::trim);
        Ok(self
            .read()?
            .orders
            .iter()
            .filter(|o| o.tenant_id == tenant_id)
            .filter(|o| warehouse.is_none_or(|w| w == o.warehouse.trim()))
            .cloned()
            .collect())
    }

    fn count_orders_on(
        &self,
        tenant_id: TenantId,
        direction: OrderDirection,
        day: NaiveDate,
    ) -> Result<u64, StoreError> {
        Ok(self
            .read()?
            .orders
            .iter()
            .filter(|o| o.tenant_id == tenant_id && o.direction == direction && o.created_at.date_naive() == day)
            .count() as u64)
    }
}

impl TransactionalLedger for InMemoryStockStore {
    fn stock_version(&self, position: &PositionKey) -> Result<u64, LedgerError> {
        Ok(self.read()?.versions.get(position).copied().unwrap_or(0))
    }

    fn commit_pair(&self, pair: &ConversionPair, expected_version: ExpectedVersion) -> Result<u64, LedgerError> {
        pair.validate()?;

        // Both legs and the version bump happen under one write lock.
        let mut state = self.write()?;
        let current = state.versions.get(&pair.position).copied().unwrap_or(0);
        expected_version.check(current)?;

        for leg in [&pair.outbound, &pair.inbound] {
            if state.contains_order(leg.id) {
                return Err(StoreError::Duplicate(format!("order {}", leg.id)).into());
            }
        }

        state.orders.push(pair.outbound.clone());
        state.orders.push(pair.inbound.clone());
        let version = current + 1;
        state.versions.insert(pair.position.clone(), version);
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use stockroom_core::LotId;
    use stockroom_inventory::{CONVERSION_KIND, LotStatus, OrderLine, OrderStatus, aggregate_lot_data};
    use stockroom_products::NewProduct;

    fn order(tenant_id: TenantId, warehouse: &str, product_id: ProductId, direction: OrderDirection) -> Order {
        Order {
            id: OrderId::new(),
            tenant_id,
            code: format!("KC-{}-011024-001", direction.code_prefix()),
            direction,
            kind: CONVERSION_KIND.to_string(),
            status: OrderStatus::Completed,
            order_type: None,
            warehouse: warehouse.to_string(),
            description: None,
            lines: vec![OrderLine {
                product_id,
                product_name: "Bia".to_string(),
                unit: "Lon".to_string(),
                quantity: Decimal::ONE,
                price: Decimal::ZERO,
            }],
            created_at: Utc::now(),
        }
    }

    fn pair(tenant_id: TenantId, product_id: ProductId) -> ConversionPair {
        ConversionPair {
            position: PositionKey::new(tenant_id, "A", product_id),
            outbound: order(tenant_id, "A", product_id, OrderDirection::Outbound),
            inbound: order(tenant_id, "A", product_id, OrderDirection::Inbound),
        }
    }

    #[test]
    fn commit_pair_writes_both_legs_and_bumps_version() {
        let store = InMemoryStockStore::new();
        let (tenant, product) = (TenantId::new(), ProductId::new());
        let p = pair(tenant, product);

        assert_eq!(store.commit_pair(&p, ExpectedVersion::Exact(0)).unwrap(), 1);
        assert_eq!(store.stock_version(&p.position).unwrap(), 1);
        assert_eq!(store.orders(tenant, Some("A")).unwrap().len(), 2);
    }

    #[test]
    fn stale_version_writes_nothing() {
        let store = InMemoryStockStore::new();
        let (tenant, product) = (TenantId::new(), ProductId::new());
        store.commit_pair(&pair(tenant, product), ExpectedVersion::Any).unwrap();

        let err = store
            .commit_pair(&pair(tenant, product), ExpectedVersion::Exact(0))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));
        assert_eq!(store.orders(tenant, None).unwrap().len(), 2);
    }

    #[test]
    fn replayed_pair_is_rejected_whole() {
        let store = InMemoryStockStore::new();
        let p = pair(TenantId::new(), ProductId::new());
        store.commit_pair(&p, ExpectedVersion::Any).unwrap();

        let err = store.commit_pair(&p, ExpectedVersion::Any).unwrap_err();
        assert!(matches!(err, LedgerError::Store(_)));
        assert_eq!(store.orders(p.position.tenant_id, None).unwrap().len(), 2);
    }

    #[test]
    fn plain_orders_bump_the_position_version() {
        let store = InMemoryStockStore::new();
        let (tenant, product) = (TenantId::new(), ProductId::new());
        let o = order(tenant, "A", product, OrderDirection::Outbound);
        let position = PositionKey::new(tenant, "A", product);

        store.insert_order(&o).unwrap();
        assert_eq!(store.stock_version(&position).unwrap(), 1);
        store.delete_order(tenant, o.id).unwrap();
        assert_eq!(store.stock_version(&position).unwrap(), 2);
        assert!(matches!(store.delete_order(tenant, o.id), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn orders_are_tenant_scoped() {
        let store = InMemoryStockStore::new();
        let product = ProductId::new();
        let (a, b) = (TenantId::new(), TenantId::new());
        store.insert_order(&order(a, "A", product, OrderDirection::Inbound)).unwrap();

        assert!(store.orders(b, None).unwrap().is_empty());
        assert_eq!(
            store
                .count_orders_on(a, OrderDirection::Inbound, Utc::now().date_naive())
                .unwrap(),
            1
        );
        assert_eq!(
            store
                .count_orders_on(a, OrderDirection::Outbound, Utc::now().date_naive())
                .unwrap(),
            0
        );
    }

    #[test]
    fn lot_filter_applies_status_and_warehouse() {
        let store = InMemoryStockStore::new();
        let tenant = TenantId::new();
        let lot = |warehouse: &str, status| Lot {
            id: LotId::new(),
            tenant_id: tenant,
            warehouse: warehouse.to_string(),
            status,
            contents: LotContents::SingleItem(LotLine {
                product_id: Some(ProductId::new()),
                quantity: 1.0,
                unit: None,
                product_unit: None,
            }),
        };
        store.insert_lot(lot("A", LotStatus::Active)).unwrap();
        store.insert_lot(lot("A", LotStatus::Exported)).unwrap();
        store.insert_lot(lot("B", LotStatus::Active)).unwrap();

        assert_eq!(store.lots(tenant, &LotFilter::active()).unwrap().len(), 2);
        assert_eq!(store.lots(tenant, &LotFilter::active().in_warehouse("A")).unwrap().len(), 1);
        assert_eq!(store.lots(tenant, &LotFilter::default()).unwrap().len(), 3);
        assert!(store.lots(TenantId::new(), &LotFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn lots_carry_the_product_unit_from_the_catalog() {
        let store = InMemoryStockStore::new();
        let tenant = TenantId::new();
        let (beer, unknown) = (ProductId::new(), ProductId::new());
        store
            .add_products([Product::new(NewProduct {
                id: beer,
                tenant_id: tenant,
                sku: "BIA".to_string(),
                name: "Bia".to_string(),
                base_unit: Some("Lon".to_string()),
            })
            .unwrap()])
            .unwrap();

        let line = |product_id, quantity, unit: Option<&str>| LotLine {
            product_id: Some(product_id),
            quantity,
            unit: unit.map(str::to_string),
            product_unit: Some("stale".to_string()),
        };
        let lot = |contents| Lot {
            id: LotId::new(),
            tenant_id: tenant,
            warehouse: "A".to_string(),
            status: LotStatus::Active,
            contents,
        };
        // A single-item lot is counted in the product's unit, whatever it says.
        store.insert_lot(lot(LotContents::SingleItem(line(beer, 2.0, Some("Thùng"))))).unwrap();
        store
            .insert_lot(lot(LotContents::MultiItem(vec![
                line(beer, 1.0, Some("Thùng")),
                line(beer, 3.0, None),
                line(unknown, 4.0, None),
            ])))
            .unwrap();

        let lots = store.lots(tenant, &LotFilter::active()).unwrap();
        let totals = aggregate_lot_data(&lots);
        assert_eq!(totals.get(beer, "Lon"), Decimal::from(5));
        assert_eq!(totals.get(beer, "Thùng"), Decimal::ONE);
        assert_eq!(totals.get(unknown, "Cái"), Decimal::from(4));
    }
}
