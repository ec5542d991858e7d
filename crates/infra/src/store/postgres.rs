//! Postgres-backed stock store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `Duplicate` | Order id or code already stored |
//! | Database (foreign key violation) | `23503` | `Invalid` | Line references a missing order/product |
//! | Database (other) | Any other | `Backend` | Other database errors |
//! | RowNotFound | N/A | `NotFound` | Unexpected missing row |
//! | Other | N/A | `Backend` | Network errors, pool closed, etc. |
//!
//! ## Atomicity
//!
//! `commit_pair` writes both legs and the stock version inside one
//! transaction. The version row is locked with `SELECT ... FOR UPDATE`, so
//! concurrent commits on the same position serialize and the loser sees a
//! version mismatch. Plain order inserts and deletes bump the version of
//! every position they touch in the same transaction as the write.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use stockroom_core::{ExpectedVersion, LotId, OrderId, ProductId, TenantId, UnitId};
use stockroom_inventory::{
    ConversionPair, LedgerError, Lot, LotContents, LotLine, LotStatus, Order, OrderDirection, OrderLine, OrderStatus,
    PositionKey, TransactionalLedger,
};
use stockroom_products::{NewProduct, Product};
use stockroom_units::{ProductUnit, Unit};

use super::{CatalogStore, LotFilter, LotStore, OrderStore, StoreError, stock_positions};

/// Tables used by the store. Applied by [`PostgresStockStore::ensure_schema`].
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS units (
    id          UUID PRIMARY KEY,
    tenant_id   UUID NOT NULL,
    name        TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS products (
    id          UUID PRIMARY KEY,
    tenant_id   UUID NOT NULL,
    sku         TEXT NOT NULL,
    name        TEXT NOT NULL,
    base_unit   TEXT NULL
);
CREATE TABLE IF NOT EXISTS product_units (
    tenant_id       UUID NOT NULL,
    product_id      UUID NOT NULL REFERENCES products(id),
    unit_id         UUID NOT NULL REFERENCES units(id),
    conversion_rate DOUBLE PRECISION NOT NULL,
    PRIMARY KEY (product_id, unit_id)
);
CREATE TABLE IF NOT EXISTS lots (
    id          UUID PRIMARY KEY,
    tenant_id   UUID NOT NULL,
    warehouse   TEXT NOT NULL,
    status      TEXT NOT NULL,
    product_id  UUID NULL,
    quantity    DOUBLE PRECISION NOT NULL DEFAULT 0,
    unit        TEXT NULL
);
CREATE TABLE IF NOT EXISTS lot_items (
    id          UUID PRIMARY KEY,
    lot_id      UUID NOT NULL REFERENCES lots(id) ON DELETE CASCADE,
    product_id  UUID NULL,
    quantity    DOUBLE PRECISION NOT NULL,
    unit        TEXT NULL
);
CREATE TABLE IF NOT EXISTS orders (
    id          UUID PRIMARY KEY,
    tenant_id   UUID NOT NULL,
    code        TEXT NOT NULL,
    direction   TEXT NOT NULL,
    kind        TEXT NOT NULL,
    status      TEXT NOT NULL,
    order_type  TEXT NULL,
    warehouse   TEXT NOT NULL,
    description TEXT NULL,
    created_at  TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS orders_tenant_day ON orders (tenant_id, direction, created_at);
CREATE TABLE IF NOT EXISTS order_lines (
    order_id     UUID NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
    line_no      INT NOT NULL,
    product_id   UUID NOT NULL,
    product_name TEXT NOT NULL,
    unit         TEXT NOT NULL,
    quantity     NUMERIC(24, 6) NOT NULL,
    price        NUMERIC(24, 6) NOT NULL,
    PRIMARY KEY (order_id, line_no)
);
CREATE TABLE IF NOT EXISTS stock_versions (
    tenant_id   UUID NOT NULL,
    warehouse   TEXT NOT NULL,
    product_id  UUID NOT NULL,
    version     BIGINT NOT NULL,
    PRIMARY KEY (tenant_id, warehouse, product_id)
)
"#;

/// Postgres-backed implementation of every store trait and the ledger.
///
/// Every query is scoped by `tenant_id`.
#[derive(Debug, Clone)]
pub struct PostgresStockStore {
    pool: Arc<PgPool>,
}

impl PostgresStockStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Connect and make sure the schema exists.
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .context("failed to connect to Postgres")?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    pub async fn ensure_schema(&self) -> anyhow::Result<()> {
        for statement in SCHEMA.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .with_context(|| format!("failed to apply schema statement: {statement}"))?;
        }
        Ok(())
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id), err)]
    pub async fn load_units(&self, tenant_id: TenantId) -> Result<Vec<Unit>, StoreError> {
        let rows = sqlx::query("SELECT id, name FROM units WHERE tenant_id = $1 ORDER BY name")
            .bind(tenant_id.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("load_units", e))?;

        rows.iter()
            .map(|row| {
                Ok(Unit {
                    id: UnitId::from_uuid(get(row, "id")?),
                    name: get(row, "name")?,
                })
            })
            .collect()
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id), err)]
    pub async fn load_product_units(&self, tenant_id: TenantId) -> Result<Vec<ProductUnit>, StoreError> {
        let rows = sqlx::query(
            "SELECT product_id, unit_id, conversion_rate FROM product_units WHERE tenant_id = $1",
        )
        .bind(tenant_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_product_units", e))?;

        rows.iter()
            .map(|row| {
                Ok(ProductUnit {
                    product_id: ProductId::from_uuid(get(row, "product_id")?),
                    unit_id: UnitId::from_uuid(get(row, "unit_id")?),
                    conversion_rate: get(row, "conversion_rate")?,
                })
            })
            .collect()
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id), err)]
    pub async fn load_products(&self, tenant_id: TenantId) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query("SELECT id, sku, name, base_unit FROM products WHERE tenant_id = $1")
            .bind(tenant_id.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("load_products", e))?;

        rows.iter()
            .map(|row| {
                Product::new(NewProduct {
                    id: ProductId::from_uuid(get(row, "id")?),
                    tenant_id,
                    sku: get(row, "sku")?,
                    name: get(row, "name")?,
                    base_unit: get(row, "base_unit")?,
                })
                .map_err(|e| StoreError::Decode(format!("product row: {e}")))
            })
            .collect()
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, filter = ?filter), err)]
    pub async fn load_lots(&self, tenant_id: TenantId, filter: &LotFilter) -> Result<Vec<Lot>, StoreError> {
        let parents = sqlx::query(
            r#"
            SELECT l.id, l.warehouse, l.status, l.product_id, l.quantity, l.unit, p.base_unit AS product_unit
            FROM lots l
            LEFT JOIN products p ON p.id = l.product_id
            WHERE l.tenant_id = $1
                AND ($2::text IS NULL OR l.status = $2)
                AND ($3::text IS NULL OR l.warehouse = $3)
            ORDER BY l.id
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(filter.status.map(LotStatus::as_str))
        .bind(filter.warehouse.as_deref().map(str::trim))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_lots", e))?;

        let lot_ids = parents
            .iter()
            .map(|row| get::<Uuid>(row, "id"))
            .collect::<Result<Vec<_>, _>>()?;

        let item_rows = sqlx::query(
            r#"
            SELECT li.lot_id, li.product_id, li.quantity, li.unit, p.base_unit AS product_unit
            FROM lot_items li
            LEFT JOIN products p ON p.id = li.product_id
            WHERE li.lot_id = ANY($1)
            ORDER BY li.lot_id, li.id
            "#,
        )
        .bind(&lot_ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_lot_items", e))?;

        let mut items: HashMap<Uuid, Vec<LotLine>> = HashMap::new();
        for row in &item_rows {
            items.entry(get(row, "lot_id")?).or_default().push(lot_line(row)?);
        }

        parents
            .iter()
            .map(|row| {
                let id: Uuid = get(row, "id")?;
                let status: String = get(row, "status")?;
                let status = LotStatus::parse(&status)
                    .ok_or_else(|| StoreError::Decode(format!("unknown lot status '{status}'")))?;
                Ok(Lot {
                    id: LotId::from_uuid(id),
                    tenant_id,
                    warehouse: get(row, "warehouse")?,
                    status,
                    contents: LotContents::resolve(lot_line(row)?, items.remove(&id).unwrap_or_default()),
                })
            })
            .collect()
    }

    #[instrument(skip(self, order), fields(tenant_id = %order.tenant_id, code = %order.code), err)]
    pub async fn insert_order_async(&self, order: &Order) -> Result<(), StoreError> {
        order.validate().map_err(|e| StoreError::Invalid(e.to_string()))?;

        let mut tx = self.begin().await?;
        write_order(&mut tx, order).await?;
        let product_ids = order.lines.iter().map(|l| l.product_id);
        bump_stock_versions(&mut tx, &stock_positions(order.tenant_id, &order.warehouse, product_ids)).await?;
        tx.commit().await.map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    /// Deletes the order and bumps the version of every position its lines touched.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, order_id = %order_id), err)]
    pub async fn delete_order_async(&self, tenant_id: TenantId, order_id: OrderId) -> Result<(), StoreError> {
        let mut tx = self.begin().await?;

        let warehouse: String =
            sqlx::query_scalar("SELECT warehouse FROM orders WHERE tenant_id = $1 AND id = $2 FOR UPDATE")
                .bind(tenant_id.as_uuid())
                .bind(order_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("lock_order", e))?
                .ok_or_else(|| StoreError::NotFound(format!("order {order_id}")))?;

        let product_ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT DISTINCT product_id FROM order_lines WHERE order_id = $1")
                .bind(order_id.as_uuid())
                .fetch_all(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("load_order_products", e))?;

        // order_lines go with the order (ON DELETE CASCADE).
        sqlx::query("DELETE FROM orders WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id.as_uuid())
            .bind(order_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_order", e))?;

        let positions = stock_positions(tenant_id, &warehouse, product_ids.into_iter().map(ProductId::from_uuid));
        bump_stock_versions(&mut tx, &positions).await?;
        tx.commit().await.map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id), err)]
    pub async fn load_orders(&self, tenant_id: TenantId, warehouse: Option<&str>) -> Result<Vec<Order>, StoreError> {
        let headers = sqlx::query(
            r#"
            SELECT id, code, direction, kind, status, order_type, warehouse, description, created_at
            FROM orders
            WHERE tenant_id = $1 AND ($2::text IS NULL OR warehouse = $2)
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(warehouse.map(str::trim))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_orders", e))?;

        let ids = headers
            .iter()
            .map(|row| get::<Uuid>(row, "id"))
            .collect::<Result<Vec<_>, _>>()?;

        let line_rows = sqlx::query(
            r#"
            SELECT order_id, product_id, product_name, unit, quantity, price
            FROM order_lines
            WHERE order_id = ANY($1)
            ORDER BY order_id, line_no
            "#,
        )
        .bind(&ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_order_lines", e))?;

        let mut lines: HashMap<Uuid, Vec<OrderLine>> = HashMap::new();
        for row in &line_rows {
            lines.entry(get(row, "order_id")?).or_default().push(OrderLine {
                product_id: ProductId::from_uuid(get(row, "product_id")?),
                product_name: get(row, "product_name")?,
                unit: get(row, "unit")?,
                quantity: get::<Decimal>(row, "quantity")?,
                price: get::<Decimal>(row, "price")?,
            });
        }

        headers
            .iter()
            .map(|row| {
                let id: Uuid = get(row, "id")?;
                let direction: String = get(row, "direction")?;
                let status: String = get(row, "status")?;
                Ok(Order {
                    id: OrderId::from_uuid(id),
                    tenant_id,
                    code: get(row, "code")?,
                    direction: OrderDirection::parse(&direction)
                        .ok_or_else(|| StoreError::Decode(format!("unknown order direction '{direction}'")))?,
                    kind: get(row, "kind")?,
                    status: OrderStatus::parse(&status)
                        .ok_or_else(|| StoreError::Decode(format!("unknown order status '{status}'")))?,
                    order_type: get(row, "order_type")?,
                    warehouse: get(row, "warehouse")?,
                    description: get(row, "description")?,
                    lines: lines.remove(&id).unwrap_or_default(),
                    created_at: get(row, "created_at")?,
                })
            })
            .collect()
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id), err)]
    pub async fn count_orders(
        &self,
        tenant_id: TenantId,
        direction: OrderDirection,
        day: NaiveDate,
    ) -> Result<u64, StoreError> {
        let start: DateTime<Utc> = day.and_time(NaiveTime::MIN).and_utc();
        let end = start + chrono::Duration::days(1);

        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total
            FROM orders
            WHERE tenant_id = $1 AND direction = $2 AND created_at >= $3 AND created_at < $4
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(direction.as_str())
        .bind(start)
        .bind(end)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_orders", e))?;

        let total: i64 = get(&row, "total")?;
        Ok(total.max(0) as u64)
    }

    #[instrument(skip(self), fields(tenant_id = %position.tenant_id, product_id = %position.product_id), err)]
    pub async fn load_stock_version(&self, position: &PositionKey) -> Result<u64, StoreError> {
        let version: Option<i64> = sqlx::query_scalar(
            "SELECT version FROM stock_versions WHERE tenant_id = $1 AND warehouse = $2 AND product_id = $3",
        )
        .bind(position.tenant_id.as_uuid())
        .bind(&position.warehouse)
        .bind(position.product_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_stock_version", e))?;

        Ok(version.unwrap_or(0).max(0) as u64)
    }

    /// Write both legs and bump the position version in one transaction.
    #[instrument(
        skip(self, pair),
        fields(
            tenant_id = %pair.position.tenant_id,
            product_id = %pair.position.product_id,
            outbound = %pair.outbound.code,
            inbound = %pair.inbound.code,
            expected_version = ?expected_version
        ),
        err
    )]
    pub async fn commit_pair_async(
        &self,
        pair: &ConversionPair,
        expected_version: ExpectedVersion,
    ) -> Result<u64, LedgerError> {
        pair.validate()?;
        let position = &pair.position;

        let mut tx = self.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO stock_versions (tenant_id, warehouse, product_id, version)
            VALUES ($1, $2, $3, 0)
            ON CONFLICT (tenant_id, warehouse, product_id) DO NOTHING
            "#,
        )
        .bind(position.tenant_id.as_uuid())
        .bind(&position.warehouse)
        .bind(position.product_id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("init_stock_version", e))?;

        let current: i64 = sqlx::query_scalar(
            r#"
            SELECT version FROM stock_versions
            WHERE tenant_id = $1 AND warehouse = $2 AND product_id = $3
            FOR UPDATE
            "#,
        )
        .bind(position.tenant_id.as_uuid())
        .bind(&position.warehouse)
        .bind(position.product_id.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("lock_stock_version", e))?;
        let current = current.max(0) as u64;

        if !expected_version.matches(current) {
            tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(LedgerError::Conflict(format!(
                "expected {expected_version:?}, found {current}"
            )));
        }

        write_order(&mut tx, &pair.outbound).await?;
        write_order(&mut tx, &pair.inbound).await?;

        let version = current + 1;
        sqlx::query(
            "UPDATE stock_versions SET version = $4 WHERE tenant_id = $1 AND warehouse = $2 AND product_id = $3",
        )
        .bind(position.tenant_id.as_uuid())
        .bind(&position.warehouse)
        .bind(position.product_id.as_uuid())
        .bind(version as i64)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_stock_version", e))?;

        tx.commit().await.map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(version)
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, StoreError> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }
}

async fn write_order(tx: &mut Transaction<'_, Postgres>, order: &Order) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO orders (
            id, tenant_id, code, direction, kind, status, order_type, warehouse, description, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(order.id.as_uuid())
    .bind(order.tenant_id.as_uuid())
    .bind(&order.code)
    .bind(order.direction.as_str())
    .bind(&order.kind)
    .bind(order.status.as_str())
    .bind(order.order_type.as_deref())
    .bind(order.warehouse.trim())
    .bind(order.description.as_deref())
    .bind(order.created_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_order", e))?;

    for (line_no, line) in order.lines.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO order_lines (order_id, line_no, product_id, product_name, unit, quantity, price)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(line_no as i32)
        .bind(line.product_id.as_uuid())
        .bind(&line.product_name)
        .bind(&line.unit)
        .bind(line.quantity)
        .bind(line.price)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order_line", e))?;
    }
    Ok(())
}

async fn bump_stock_versions(
    tx: &mut Transaction<'_, Postgres>,
    positions: &BTreeSet<PositionKey>,
) -> Result<(), StoreError> {
    for position in positions {
        sqlx::query(
            r#"
            INSERT INTO stock_versions (tenant_id, warehouse, product_id, version)
            VALUES ($1, $2, $3, 1)
            ON CONFLICT (tenant_id, warehouse, product_id)
            DO UPDATE SET version = stock_versions.version + 1
            "#,
        )
        .bind(position.tenant_id.as_uuid())
        .bind(&position.warehouse)
        .bind(position.product_id.as_uuid())
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("bump_stock_version", e))?;
    }
    Ok(())
}

fn lot_line(row: &PgRow) -> Result<LotLine, StoreError> {
    Ok(LotLine {
        product_id: get::<Option<Uuid>>(row, "product_id")?.map(ProductId::from_uuid),
        quantity: get(row, "quantity")?,
        unit: get(row, "unit")?,
        product_unit: get(row, "product_unit")?,
    })
}

fn get<'r, T>(row: &'r PgRow, column: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(column)
        .map_err(|e| StoreError::Decode(format!("column {column}: {e}")))
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Duplicate(msg),
                Some("23503") | Some("23514") => StoreError::Invalid(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::RowNotFound => StoreError::NotFound(format!("unexpected row not found in {operation}")),
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {operation}")),
        _ => StoreError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}

/// Run an async store call from the synchronous traits.
///
/// Must be called from within a tokio runtime context.
fn block_on<T, E>(fut: impl Future<Output = Result<T, E>>) -> Result<T, E>
where
    E: From<StoreError>,
{
    let handle = tokio::runtime::Handle::try_current().map_err(|_| {
        E::from(StoreError::Backend(
            "PostgresStockStore requires async runtime (tokio)".to_string(),
        ))
    })?;
    handle.block_on(fut)
}

impl CatalogStore for PostgresStockStore {
    fn units(&self, tenant_id: TenantId) -> Result<Vec<Unit>, StoreError> {
        block_on(self.load_units(tenant_id))
    }

    fn product_units(&self, tenant_id: TenantId) -> Result<Vec<ProductUnit>, StoreError> {
        block_on(self.load_product_units(tenant_id))
    }

    fn products(&self, tenant_id: TenantId) -> Result<Vec<Product>, StoreError> {
        block_on(self.load_products(tenant_id))
    }
}

impl LotStore for PostgresStockStore {
    fn lots(&self, tenant_id: TenantId, filter: &LotFilter) -> Result<Vec<Lot>, StoreError> {
        block_on(self.load_lots(tenant_id, filter))
    }
}

impl OrderStore for PostgresStockStore {
    fn insert_order(&self, order: &Order) -> Result<(), StoreError> {
        block_on(self.insert_order_async(order))
    }

    fn delete_order(&self, tenant_id: TenantId, order_id: OrderId) -> Result<(), StoreError> {
        block_on(self.delete_order_async(tenant_id, order_id))
    }

    fn orders(&self, tenant_id: TenantId, warehouse: Option<&str>) -> Result<Vec<Order>, StoreError> {
        block_on(self.load_orders(tenant_id, warehouse))
    }

    fn count_orders_on(
        &self,
        tenant_id: TenantId,
        direction: OrderDirection,
        day: NaiveDate,
    ) -> Result<u64, StoreError> {
        block_on(self.count_orders(tenant_id, direction, day))
    }
}

impl TransactionalLedger for PostgresStockStore {
    fn stock_version(&self, position: &PositionKey) -> Result<u64, LedgerError> {
        Ok(block_on(self.load_stock_version(position))?)
    }

    fn commit_pair(&self, pair: &ConversionPair, expected_version: ExpectedVersion) -> Result<u64, LedgerError> {
        block_on(self.commit_pair_async(pair, expected_version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_declares_every_table() {
        for table in [
            "units",
            "product_units",
            "products",
            "lots",
            "lot_items",
            "orders",
            "order_lines",
            "stock_versions",
        ] {
            assert!(
                SCHEMA.contains(&format!("CREATE TABLE IF NOT EXISTS {table} (")),
                "missing table {table}"
            );
        }
    }

    #[test]
    fn order_lines_are_removed_with_their_order() {
        let order_lines = &SCHEMA[SCHEMA.find("CREATE TABLE IF NOT EXISTS order_lines").unwrap()..];
        let order_lines = &order_lines[..order_lines.find(");").unwrap()];
        assert!(order_lines.contains("REFERENCES orders(id) ON DELETE CASCADE"));
    }

    #[test]
    fn sync_calls_outside_a_runtime_fail_cleanly() {
        let result: Result<(), StoreError> = block_on(async { Ok(()) });
        assert!(matches!(result, Err(StoreError::Backend(_))));
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        assert!(matches!(
            map_sqlx_error("load", sqlx::Error::RowNotFound),
            StoreError::NotFound(_)
        ));
        assert!(matches!(
            map_sqlx_error("load", sqlx::Error::PoolClosed),
            StoreError::Backend(_)
        ));
    }
}
