//! Postgres-backed directory adapter.
//!
//! Reads the catalog/identity tables owned by the external collaborators.
//! Joins mirror the source system: a user always resolves with its sector, a
//! product with its category; a missing join partner makes the record absent.
//!
//! ## Expected schema
//!
//! ```sql
//! CREATE TABLE sectors (
//!     id         UUID PRIMARY KEY,
//!     name       TEXT NOT NULL,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT now()
//! );
//!
//! CREATE TABLE categories (
//!     id   UUID PRIMARY KEY,
//!     name TEXT NOT NULL
//! );
//!
//! CREATE TABLE users (
//!     id        UUID PRIMARY KEY,
//!     name      TEXT NOT NULL,
//!     sector_id UUID NOT NULL REFERENCES sectors(id)
//! );
//! ```
//!
//! (`products.name`/`products.category_id` live on the stock table, see the
//! ledger store schema.)

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tracing::instrument;

use almox_core::{CategoryId, ProductId, SectorId, UserId};
use almox_directory::{Category, Directory, DirectoryError, ProductRecord, Sector, UserRecord};

/// Postgres-backed reference-data directory.
#[derive(Debug, Clone)]
pub struct PostgresDirectory {
    pool: Arc<PgPool>,
}

impl PostgresDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Upsert a user profile and its sector (registration surface).
    #[instrument(skip(self, record), fields(user_id = %record.id), err)]
    pub async fn put_user(&self, record: &UserRecord) -> Result<(), DirectoryError> {
        let mut tx = self.pool.begin().await.map_err(unavailable)?;

        sqlx::query(
            r#"
            INSERT INTO sectors (id, name, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name
            "#,
        )
        .bind(record.sector.id.as_uuid())
        .bind(&record.sector.name)
        .bind(record.sector.created_at)
        .execute(&mut *tx)
        .await
        .map_err(unavailable)?;

        sqlx::query(
            r#"
            INSERT INTO users (id, name, sector_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, sector_id = EXCLUDED.sector_id
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(&record.name)
        .bind(record.sector.id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(unavailable)?;

        tx.commit().await.map_err(unavailable)
    }

    /// Upsert product display metadata and its category (registration surface).
    #[instrument(skip(self, record), fields(product_id = %record.id), err)]
    pub async fn put_product(&self, record: &ProductRecord) -> Result<(), DirectoryError> {
        let mut tx = self.pool.begin().await.map_err(unavailable)?;

        sqlx::query(
            r#"
            INSERT INTO categories (id, name)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name
            "#,
        )
        .bind(record.category.id.as_uuid())
        .bind(&record.category.name)
        .execute(&mut *tx)
        .await
        .map_err(unavailable)?;

        sqlx::query(
            r#"
            INSERT INTO products (id, name, category_id, quantity)
            VALUES ($1, $2, $3, 0)
            ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, category_id = EXCLUDED.category_id
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(&record.name)
        .bind(record.category.id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(unavailable)?;

        tx.commit().await.map_err(unavailable)
    }
}

fn unavailable(err: sqlx::Error) -> DirectoryError {
    DirectoryError::Unavailable(err.to_string())
}

#[async_trait]
impl Directory for PostgresDirectory {
    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn user(&self, id: UserId) -> Result<Option<UserRecord>, DirectoryError> {
        let row = sqlx::query(
            r#"
            SELECT u.id, u.name,
                   s.id AS sector_id, s.name AS sector_name, s.created_at AS sector_created_at
            FROM users u
            JOIN sectors s ON u.sector_id = s.id
            WHERE u.id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(unavailable)?;

        row.map(|r| -> Result<UserRecord, DirectoryError> {
            let decode = |e: sqlx::Error| DirectoryError::Unavailable(format!("decode user row: {e}"));
            Ok(UserRecord {
                id: UserId::from_uuid(r.try_get("id").map_err(decode)?),
                name: r.try_get("name").map_err(decode)?,
                sector: Sector {
                    id: SectorId::from_uuid(r.try_get("sector_id").map_err(decode)?),
                    name: r.try_get("sector_name").map_err(decode)?,
                    created_at: r.try_get("sector_created_at").map_err(decode)?,
                },
            })
        })
        .transpose()
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn product(&self, id: ProductId) -> Result<Option<ProductRecord>, DirectoryError> {
        let row = sqlx::query(
            r#"
            SELECT p.id, p.name,
                   c.id AS category_id, c.name AS category_name
            FROM products p
            JOIN categories c ON p.category_id = c.id
            WHERE p.id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(unavailable)?;

        row.map(|r| -> Result<ProductRecord, DirectoryError> {
            let decode =
                |e: sqlx::Error| DirectoryError::Unavailable(format!("decode product row: {e}"));
            Ok(ProductRecord {
                id: ProductId::from_uuid(r.try_get("id").map_err(decode)?),
                name: r.try_get("name").map_err(decode)?,
                category: Category {
                    id: CategoryId::from_uuid(r.try_get("category_id").map_err(decode)?),
                    name: r.try_get("category_name").map_err(decode)?,
                },
            })
        })
        .transpose()
    }
}
