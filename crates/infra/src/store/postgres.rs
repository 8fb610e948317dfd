//! Postgres-backed ledger store implementation.
//!
//! Persists the stock pool and the request ledger in PostgreSQL, enforcing
//! the consistency-gate contract at the database level: every commit runs in
//! one transaction, the stock adjustment is a conditional `UPDATE`, and each
//! ledger write is guarded by the expected prior row state. Zero rows
//! affected on any guarded statement rolls the whole transaction back.
//!
//! ## Expected schema
//!
//! ```sql
//! CREATE TABLE products (
//!     id          UUID PRIMARY KEY,
//!     name        TEXT NOT NULL DEFAULT '',
//!     category_id UUID REFERENCES categories(id),
//!     quantity    BIGINT NOT NULL CHECK (quantity >= 0),
//!     created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
//! );
//!
//! CREATE TABLE product_requests (
//!     id           UUID PRIMARY KEY,
//!     user_id      UUID NOT NULL,
//!     product_id   UUID NOT NULL REFERENCES products(id),
//!     quantity     BIGINT NOT NULL CHECK (quantity > 0),
//!     created_at   TIMESTAMPTZ NOT NULL,
//!     delivered    BOOLEAN NOT NULL DEFAULT FALSE,
//!     delivered_at TIMESTAMPTZ
//! );
//! ```
//!
//! ## Error mapping
//!
//! | SQLx error | PostgreSQL code | StoreError | Scenario |
//! |------------|-----------------|------------|----------|
//! | Database (unique violation) | `23505` | `Conflict` | Concurrent insert of the same entry id |
//! | Database (check violation)  | `23514` | `Conflict` | Quantity constraint raced past the guard |
//! | Database (other)            | any     | `Backend`  | Other database failures |
//! | Pool/network/decode         | n/a     | `Backend`  | Connection failures, row decode errors |
//!
//! ## Thread safety
//!
//! `PostgresLedgerStore` is `Send + Sync`; all operations go through the
//! SQLx connection pool.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tracing::instrument;

use almox_core::{ProductId, RequestId, UserId};
use almox_ledger::{DeliveryState, LedgerEntry};

use super::r#trait::{Commit, LedgerStore, LedgerWrite, StoreError};

/// Postgres-backed ledger store.
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: Arc<PgPool>,
}

impl PostgresLedgerStore {
    /// Create a new store on top of an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if matches!(db.code().as_deref(), Some("23505") | Some("23514")) {
            return StoreError::Conflict(format!("{operation}: {db}"));
        }
    }
    StoreError::Backend(format!("{operation}: {err}"))
}

fn entry_from_row(row: &sqlx::postgres::PgRow) -> Result<LedgerEntry, StoreError> {
    let decode = |e: sqlx::Error| StoreError::Backend(format!("failed to decode entry row: {e}"));

    let delivered: bool = row.try_get("delivered").map_err(decode)?;
    let delivered_at: Option<DateTime<Utc>> = row.try_get("delivered_at").map_err(decode)?;
    let delivery = DeliveryState::from_columns(delivered, delivered_at)
        .map_err(|e| StoreError::Backend(format!("corrupt delivery columns: {e}")))?;

    Ok(LedgerEntry {
        id: RequestId::from_uuid(row.try_get("id").map_err(decode)?),
        user_id: UserId::from_uuid(row.try_get("user_id").map_err(decode)?),
        product_id: ProductId::from_uuid(row.try_get("product_id").map_err(decode)?),
        quantity: row.try_get("quantity").map_err(decode)?,
        created_at: row.try_get("created_at").map_err(decode)?,
        delivery,
    })
}

const ENTRY_COLUMNS: &str = "id, user_id, product_id, quantity, created_at, delivered, delivered_at";

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn product_quantity(&self, product_id: ProductId) -> Result<Option<i64>, StoreError> {
        let row = sqlx::query("SELECT quantity FROM products WHERE id = $1")
            .bind(product_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("product_quantity", e))?;

        row.map(|r| {
            r.try_get::<i64, _>("quantity")
                .map_err(|e| StoreError::Backend(format!("failed to decode quantity: {e}")))
        })
        .transpose()
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn put_product(&self, product_id: ProductId, quantity: i64) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO products (id, quantity)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET quantity = EXCLUDED.quantity
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(quantity)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("put_product", e))?;

        Ok(())
    }

    #[instrument(skip(self), fields(request_id = %id), err)]
    async fn fetch(&self, id: RequestId) -> Result<Option<LedgerEntry>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM product_requests WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("fetch", e))?;

        row.as_ref().map(entry_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list(&self) -> Result<Vec<LedgerEntry>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM product_requests ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list", e))?;

        rows.iter().map(entry_from_row).collect()
    }

    #[instrument(
        skip(self, commit),
        fields(
            product_id = %commit.product_id,
            request_id = %commit.write.request_id(),
            delta = commit.delta,
        ),
        err
    )]
    async fn commit(&self, commit: Commit) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("commit.begin", e))?;

        // Conditional stock adjustment. Zero rows means the product row is
        // gone or the adjustment would drive the quantity negative; either
        // way the caller must re-read and re-validate.
        if commit.delta != 0 {
            let result = sqlx::query(
                "UPDATE products SET quantity = quantity + $1 WHERE id = $2 AND quantity + $1 >= 0",
            )
            .bind(commit.delta)
            .bind(commit.product_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("commit.adjust_stock", e))?;

            if result.rows_affected() == 0 {
                return Err(StoreError::Conflict(format!(
                    "stock adjustment rejected for product {} ({:+})",
                    commit.product_id, commit.delta
                )));
            }
        }

        let result = match &commit.write {
            LedgerWrite::Insert(entry) => sqlx::query(&format!(
                "INSERT INTO product_requests ({ENTRY_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)"
            ))
            .bind(entry.id.as_uuid())
            .bind(entry.user_id.as_uuid())
            .bind(entry.product_id.as_uuid())
            .bind(entry.quantity)
            .bind(entry.created_at)
            .bind(entry.delivery.is_delivered())
            .bind(entry.delivery.delivered_at())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("commit.insert", e))?,

            LedgerWrite::SetQuantity {
                id,
                expected_quantity,
                quantity,
            } => sqlx::query("UPDATE product_requests SET quantity = $1 WHERE id = $2 AND quantity = $3")
                .bind(quantity)
                .bind(id.as_uuid())
                .bind(expected_quantity)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("commit.set_quantity", e))?,

            LedgerWrite::Remove {
                id,
                expected_quantity,
            } => sqlx::query("DELETE FROM product_requests WHERE id = $1 AND quantity = $2")
                .bind(id.as_uuid())
                .bind(expected_quantity)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("commit.remove", e))?,

            LedgerWrite::SetDelivery {
                id,
                expected_delivered,
                delivery,
            } => sqlx::query(
                "UPDATE product_requests SET delivered = $1, delivered_at = $2 WHERE id = $3 AND delivered = $4",
            )
            .bind(delivery.is_delivered())
            .bind(delivery.delivered_at())
            .bind(id.as_uuid())
            .bind(expected_delivered)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("commit.set_delivery", e))?,
        };

        if result.rows_affected() == 0 {
            // Dropping `tx` rolls back, but be explicit about the contract:
            // the stock adjustment above must not survive.
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("commit.rollback", e))?;
            return Err(StoreError::Conflict(format!(
                "entry {} changed underneath the caller",
                commit.write.request_id()
            )));
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit.commit", e))?;

        Ok(())
    }
}
