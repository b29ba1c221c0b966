use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderKey, ProductKey, PublicOrderId};
use domain::{Order, OrderStatus, PaymentStatus, StockLedger, StockStatus};
use serde::de::DeserializeOwned;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Result, StoreError,
    store::{LedgerStore, OrderStore, PaymentUpdate, StatusRow},
};

/// PostgreSQL-backed order and ledger store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

/// Parses a wire string column (`status`, `payment_status`, `stock_status`)
/// through the same serde names used everywhere else.
fn parse_wire<T: DeserializeOwned>(value: String) -> Result<T> {
    serde_json::from_value(serde_json::Value::String(value)).map_err(StoreError::Serialization)
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let colors: serde_json::Value = row.try_get("colors")?;
        Ok(Order {
            key: OrderKey::from_uuid(row.try_get::<Uuid, _>("key")?),
            public_id: PublicOrderId::new(row.try_get::<String, _>("public_id")?),
            status: parse_wire(row.try_get("status")?)?,
            payment_status: parse_wire(row.try_get("payment_status")?)?,
            product: row
                .try_get::<Option<Uuid>, _>("product")?
                .map(ProductKey::from_uuid),
            product_name: row.try_get("product_name")?,
            quantity: row.try_get::<i32, _>("quantity")?.max(0) as u32,
            colors: serde_json::from_value(colors)?,
            amount: row.try_get("amount")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_status(row: PgRow) -> Result<StatusRow> {
        Ok(StatusRow {
            key: OrderKey::from_uuid(row.try_get::<Uuid, _>("key")?),
            public_id: PublicOrderId::new(row.try_get::<String, _>("public_id")?),
            status: parse_wire(row.try_get("status")?)?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_ledger(row: PgRow) -> Result<StockLedger> {
        let color_stock: serde_json::Value = row.try_get("color_stock")?;
        let color_size_stock: Option<serde_json::Value> = row.try_get("color_size_stock")?;
        Ok(StockLedger {
            total_stock: row.try_get::<i32, _>("total_stock")?.max(0) as u32,
            color_stock: serde_json::from_value(color_stock)?,
            color_size_stock: color_size_stock.map(serde_json::from_value).transpose()?,
            stock_status: parse_wire::<StockStatus>(row.try_get("stock_status")?)?,
            version: row.try_get("version")?,
        })
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn insert_order(&self, order: Order) -> Result<Order> {
        let colors = serde_json::to_value(&order.colors)?;

        sqlx::query(
            r#"
            INSERT INTO orders (key, public_id, status, payment_status, product, product_name,
                                quantity, colors, amount, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(order.key.as_uuid())
        .bind(order.public_id.as_str())
        .bind(order.status.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.product.map(|p| p.as_uuid()))
        .bind(&order.product_name)
        .bind(order.quantity as i32)
        .bind(colors)
        .bind(order.amount)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            // Unique violation on the public id means the caller should
            // regenerate and retry the insert.
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("orders_public_id_key")
            {
                return StoreError::DuplicatePublicId(order.public_id.as_str().to_string());
            }
            StoreError::Database(e)
        })?;

        Ok(order)
    }

    async fn get_order(&self, key: OrderKey) -> Result<Option<Order>> {
        let row = sqlx::query("SELECT * FROM orders WHERE key = $1")
            .bind(key.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn find_by_public_id(&self, public_id: &PublicOrderId) -> Result<Option<Order>> {
        let row = sqlx::query("SELECT * FROM orders WHERE public_id = $1")
            .bind(public_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn read_status(&self, key: OrderKey) -> Result<StatusRow> {
        let row =
            sqlx::query("SELECT key, public_id, status, updated_at FROM orders WHERE key = $1")
                .bind(key.as_uuid())
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| StoreError::NotFound(format!("order {key}")))?;

        Self::row_to_status(row)
    }

    async fn read_status_bulk(&self, keys: &[OrderKey]) -> Result<Vec<StatusRow>> {
        let uuids: Vec<Uuid> = keys.iter().map(|k| k.as_uuid()).collect();
        let rows = sqlx::query(
            "SELECT key, public_id, status, updated_at FROM orders WHERE key = ANY($1)",
        )
        .bind(&uuids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_status).collect()
    }

    async fn write_status(
        &self,
        key: OrderKey,
        status: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<StatusRow> {
        let row = sqlx::query(
            r#"
            UPDATE orders SET status = $2, updated_at = $3
            WHERE key = $1
            RETURNING key, public_id, status, updated_at
            "#,
        )
        .bind(key.as_uuid())
        .bind(status.as_str())
        .bind(updated_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("order {key}")))?;

        Self::row_to_status(row)
    }

    async fn write_status_bulk(
        &self,
        keys: &[OrderKey],
        status: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Vec<StatusRow>> {
        let uuids: Vec<Uuid> = keys.iter().map(|k| k.as_uuid()).collect();
        let rows = sqlx::query(
            r#"
            UPDATE orders SET status = $2, updated_at = $3
            WHERE key = ANY($1)
            RETURNING key, public_id, status, updated_at
            "#,
        )
        .bind(&uuids)
        .bind(status.as_str())
        .bind(updated_at)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_status).collect()
    }

    async fn write_payment(&self, key: OrderKey, update: PaymentUpdate) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE orders SET
                payment_status = $2,
                status = COALESCE($3, status),
                payment_method = COALESCE($4, payment_method),
                transaction_id = COALESCE($5, transaction_id)
            WHERE key = $1
            "#,
        )
        .bind(key.as_uuid())
        .bind(update.payment_status.as_str())
        .bind(update.status.map(|s| s.as_str()))
        .bind(update.payment_method)
        .bind(update.transaction_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("order {key}")));
        }
        Ok(())
    }

    async fn write_payment_core(&self, key: OrderKey, payment_status: PaymentStatus) -> Result<()> {
        let result = sqlx::query("UPDATE orders SET payment_status = $2 WHERE key = $1")
            .bind(key.as_uuid())
            .bind(payment_status.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("order {key}")));
        }
        Ok(())
    }

    async fn next_public_sequence(&self) -> Result<u32> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM orders WHERE created_at >= date_trunc('month', now())",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(count as u32 + 1)
    }
}

#[async_trait]
impl LedgerStore for PostgresStore {
    async fn insert_ledger(&self, product: ProductKey, ledger: StockLedger) -> Result<()> {
        let color_stock = serde_json::to_value(&ledger.color_stock)?;
        let color_size_stock = ledger
            .color_size_stock
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO product_ledgers (product, total_stock, color_stock, color_size_stock,
                                         stock_status, version)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(product.as_uuid())
        .bind(ledger.total_stock as i32)
        .bind(color_stock)
        .bind(color_size_stock)
        .bind(ledger.stock_status.as_str())
        .bind(ledger.version)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_ledger(&self, product: ProductKey) -> Result<Option<StockLedger>> {
        let row = sqlx::query("SELECT * FROM product_ledgers WHERE product = $1")
            .bind(product.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_ledger).transpose()
    }

    async fn put_ledger(&self, product: ProductKey, ledger: StockLedger) -> Result<()> {
        let color_stock = serde_json::to_value(&ledger.color_stock)?;
        let color_size_stock = ledger
            .color_size_stock
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        let result = sqlx::query(
            r#"
            UPDATE product_ledgers SET
                total_stock = $3,
                color_stock = $4,
                color_size_stock = $5,
                stock_status = $6,
                version = version + 1
            WHERE product = $1 AND version = $2
            "#,
        )
        .bind(product.as_uuid())
        .bind(ledger.version)
        .bind(ledger.total_stock as i32)
        .bind(color_stock)
        .bind(color_size_stock)
        .bind(ledger.stock_status.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Distinguish a lost race from a missing row.
            let actual: Option<i64> =
                sqlx::query_scalar("SELECT version FROM product_ledgers WHERE product = $1")
                    .bind(product.as_uuid())
                    .fetch_optional(&self.pool)
                    .await?;

            return match actual {
                Some(actual) => Err(StoreError::VersionConflict {
                    product,
                    expected: ledger.version,
                    actual,
                }),
                None => Err(StoreError::NotFound(format!(
                    "ledger for product {product}"
                ))),
            };
        }
        Ok(())
    }
}
