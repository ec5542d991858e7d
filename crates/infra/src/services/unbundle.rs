use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use stockroom_core::{ExpectedVersion, ProductId, QTY_EPSILON, TenantId};
use stockroom_inventory::{
    AutoUnbundleEngine, BookBalances, OrderCodeGenerator, PositionKey, TransactionalLedger, UnbundleOutcome,
    UnbundlePlan, UnbundleRequest, plan_unbundle,
};

use super::ServiceError;
use crate::config::StockroomConfig;
use crate::locks::UnbundleLocks;
use crate::store::{CatalogSnapshot, CatalogStore, OrderStore};

/// Stock an outbound order is about to take from one warehouse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRequest {
    pub tenant_id: TenantId,
    pub warehouse: String,
    pub product_id: ProductId,
    pub unit: String,
    pub quantity: f64,
    pub unit_cost: Decimal,
    /// Code of the order that triggered the check.
    pub origin_order_code: String,
}

impl StockRequest {
    fn validate(&self) -> Result<(), ServiceError> {
        if self.warehouse.trim().is_empty() {
            return Err(ServiceError::InvalidRequest("warehouse is required".to_string()));
        }
        if self.unit.trim().is_empty() {
            return Err(ServiceError::InvalidRequest("unit is required".to_string()));
        }
        if !self.quantity.is_finite() || self.quantity <= 0.0 {
            return Err(ServiceError::InvalidRequest(format!(
                "quantity must be positive, got {}",
                self.quantity
            )));
        }
        Ok(())
    }
}

/// Result of [`UnbundleService::ensure_available`].
#[derive(Debug, Clone)]
pub struct Availability {
    /// Liquid stock in the requested unit once any unbundle is committed.
    pub available: f64,
    pub plan: Option<UnbundlePlan>,
    pub outcome: Option<UnbundleOutcome>,
}

impl Availability {
    pub fn covers(&self, quantity: f64) -> bool {
        self.available >= quantity - QTY_EPSILON
    }

    pub fn unbundled(&self) -> bool {
        self.outcome.is_some()
    }
}

/// Makes sure a requested unit is liquid, breaking larger units when needed.
///
/// The read of book stock, the plan and the commit run under the position's
/// lock and are checked against the position version read at the start.
pub struct UnbundleService<S, G, L> {
    store: S,
    engine: AutoUnbundleEngine<G, L>,
    locks: Arc<UnbundleLocks>,
    config: StockroomConfig,
}

impl<S, G, L> UnbundleService<S, G, L>
where
    S: CatalogStore + OrderStore,
    G: OrderCodeGenerator,
    L: TransactionalLedger,
{
    pub fn new(store: S, engine: AutoUnbundleEngine<G, L>, locks: Arc<UnbundleLocks>, config: StockroomConfig) -> Self {
        Self {
            store,
            engine,
            locks,
            config,
        }
    }

    pub fn locks(&self) -> &Arc<UnbundleLocks> {
        &self.locks
    }

    pub fn engine(&self) -> &AutoUnbundleEngine<G, L> {
        &self.engine
    }

    #[instrument(
        skip(self, request),
        fields(
            tenant_id = %request.tenant_id,
            warehouse = %request.warehouse,
            product_id = %request.product_id,
            unit = %request.unit,
            quantity = request.quantity
        ),
        err
    )]
    pub fn ensure_available(&self, request: &StockRequest) -> Result<Availability, ServiceError> {
        request.validate()?;

        let position = PositionKey::new(request.tenant_id, request.warehouse.as_str(), request.product_id);
        let _guard = self.locks.lock(&position);

        let version = self.engine.ledger().stock_version(&position)?;

        let catalog = CatalogSnapshot::load(&self.store, request.tenant_id)?;
        let product = catalog
            .products
            .get(request.product_id)
            .ok_or(ServiceError::UnknownProduct(request.product_id))?;

        let orders = self.store.orders(request.tenant_id, Some(position.warehouse.as_str()))?;
        let mut liquidity = BookBalances::from_orders(&orders).liquidity(Some(position.warehouse.as_str()));
        let liquid = liquidity.get_f64(request.product_id, &request.unit);

        let resolver = catalog.resolver(self.config.kilogram_synonyms.as_slice());
        let Some(plan) = plan_unbundle(product, &request.unit, request.quantity, &resolver, &liquidity) else {
            tracing::debug!(liquid, "no unbundle planned");
            return Ok(Availability {
                available: liquid,
                plan: None,
                outcome: None,
            });
        };

        tracing::debug!(summary = %plan.summary, "unbundle planned");

        let unbundle = UnbundleRequest {
            tenant_id: request.tenant_id,
            warehouse: position.warehouse.clone(),
            product_id: request.product_id,
            product_name: product.name().to_string(),
            source_unit: plan.source_unit.clone(),
            requested_unit: request.unit.clone(),
            requested_qty: request.quantity,
            current_liquid: liquid,
            unit_cost: request.unit_cost,
            rate: plan.rate,
            origin_order_code: request.origin_order_code.clone(),
            order_type: self.config.conversion_order_type.clone(),
        };

        let outcome = self.engine.execute(&unbundle, ExpectedVersion::Exact(version))?;
        if let Some(outcome) = &outcome {
            outcome.apply_to(&mut liquidity);
        }

        Ok(Availability {
            available: liquidity.get_f64(request.product_id, &request.unit),
            plan: Some(plan),
            outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::DailyOrderCodeGenerator;
    use crate::store::InMemoryStockStore;
    use chrono::Utc;
    use stockroom_core::{OrderId, UnitId};
    use stockroom_inventory::{Order, OrderDirection, OrderLine, OrderStatus};
    use stockroom_products::{NewProduct, Product};
    use stockroom_units::{ProductUnit, Unit};

    type Service = UnbundleService<
        Arc<InMemoryStockStore>,
        DailyOrderCodeGenerator<Arc<InMemoryStockStore>>,
        Arc<InMemoryStockStore>,
    >;

    struct Fixture {
        store: Arc<InMemoryStockStore>,
        tenant: TenantId,
        product: ProductId,
    }

    fn receive(store: &InMemoryStockStore, tenant: TenantId, product: ProductId, unit: &str, qty: i64) {
        store
            .insert_order(&Order {
                id: OrderId::new(),
                tenant_id: tenant,
                code: format!("PNK-{unit}"),
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
            })
            .unwrap();
    }

    fn fixture(cans: i64, cases: i64) -> Fixture {
        let store = Arc::new(InMemoryStockStore::new());
        let tenant = TenantId::new();
        let product = ProductId::new();
        let (lon, thung) = (UnitId::new(), UnitId::new());

        store
            .add_units(
                tenant,
                [
                    Unit {
                        id: lon,
                        name: "Lon".to_string(),
                    },
                    Unit {
                        id: thung,
                        name: "Thùng".to_string(),
                    },
                ],
            )
            .unwrap();
        store
            .add_product_units(
                tenant,
                [ProductUnit {
                    product_id: product,
                    unit_id: thung,
                    conversion_rate: 24.0,
                }],
            )
            .unwrap();
        store
            .add_products([Product::new(NewProduct {
                id: product,
                tenant_id: tenant,
                sku: "BIA-333".to_string(),
                name: "Bia 333".to_string(),
                base_unit: Some("Lon".to_string()),
            })
            .unwrap()])
            .unwrap();

        if cans > 0 {
            receive(&store, tenant, product, "Lon", cans);
        }
        if cases > 0 {
            receive(&store, tenant, product, "Thùng", cases);
        }

        Fixture { store, tenant, product }
    }

    fn service(store: &Arc<InMemoryStockStore>) -> Service {
        let codes = DailyOrderCodeGenerator::new(store.clone(), "Kho Trung Tâm");
        UnbundleService::new(
            store.clone(),
            AutoUnbundleEngine::new(codes, store.clone()),
            Arc::new(UnbundleLocks::new()),
            StockroomConfig::default(),
        )
    }

    fn request(f: &Fixture, unit: &str, quantity: f64) -> StockRequest {
        StockRequest {
            tenant_id: f.tenant,
            warehouse: "A".to_string(),
            product_id: f.product,
            unit: unit.to_string(),
            quantity,
            unit_cost: Decimal::new(12_500, 0),
            origin_order_code: "TT-PXK-011024-001".to_string(),
        }
    }

    #[test]
    fn shortfall_breaks_one_case() {
        let f = fixture(10, 2);
        let availability = service(&f.store).ensure_available(&request(&f, "Lon", 30.0)).unwrap();

        assert!(availability.unbundled());
        assert!(availability.covers(30.0));
        assert!((availability.available - 34.0).abs() < 1e-9);

        let outcome = availability.outcome.unwrap();
        assert_eq!(outcome.units_broken, Decimal::ONE);
        assert_eq!(outcome.pair.outbound.lines[0].unit, "Thùng");
        assert!(outcome.pair.outbound.code.starts_with("TT-PXK-"));
        assert!(outcome.pair.inbound.code.ends_with("-AUTO"));
        assert_eq!(f.store.orders(f.tenant, Some("A")).unwrap().len(), 4);
    }

    #[test]
    fn enough_stock_writes_nothing() {
        let f = fixture(40, 2);
        let availability = service(&f.store).ensure_available(&request(&f, "Lon", 30.0)).unwrap();

        assert!(!availability.unbundled());
        assert!(availability.plan.is_none());
        assert!(availability.covers(30.0));
        assert_eq!(f.store.orders(f.tenant, None).unwrap().len(), 2);
    }

    #[test]
    fn nothing_to_break_reports_the_shortfall() {
        let f = fixture(10, 0);
        let availability = service(&f.store).ensure_available(&request(&f, "Lon", 30.0)).unwrap();

        assert!(!availability.unbundled());
        assert!(!availability.covers(30.0));
        assert!((availability.available - 10.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_product_and_bad_input_are_rejected() {
        let f = fixture(10, 2);
        let svc = service(&f.store);

        let mut unknown = request(&f, "Lon", 30.0);
        unknown.product_id = ProductId::new();
        assert!(matches!(
            svc.ensure_available(&unknown),
            Err(ServiceError::UnknownProduct(_))
        ));

        assert!(matches!(
            svc.ensure_available(&request(&f, "Lon", 0.0)),
            Err(ServiceError::InvalidRequest(_))
        ));
        assert!(matches!(
            svc.ensure_available(&request(&f, " ", 1.0)),
            Err(ServiceError::InvalidRequest(_))
        ));
    }

    #[test]
    fn repeated_requests_do_not_break_twice() {
        let f = fixture(10, 2);
        let svc = service(&f.store);

        assert!(svc.ensure_available(&request(&f, "Lon", 30.0)).unwrap().unbundled());
        let second = svc.ensure_available(&request(&f, "Lon", 30.0)).unwrap();
        assert!(!second.unbundled());
        assert!((second.available - 34.0).abs() < 1e-9);
    }
}
