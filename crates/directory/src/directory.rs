use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use almox_core::{CategoryId, ProductId, SectorId, UserId};

/// A sector a user belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sector {
    pub id: SectorId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// User profile fields the ledger needs for display joins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub name: String,
    pub sector: Sector,
}

/// Product display metadata. Availability lives in the ledger store, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: ProductId,
    pub name: String,
    pub category: Category,
}

/// Directory lookup error (infrastructure-level).
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Read-only view of the reference data owned by external collaborators.
///
/// A missing record is `Ok(None)`, not an error: the caller decides whether
/// absence is a precondition failure (create) or a dropped row (list joins).
#[async_trait]
pub trait Directory: Send + Sync {
    async fn user(&self, id: UserId) -> Result<Option<UserRecord>, DirectoryError>;

    async fn product(&self, id: ProductId) -> Result<Option<ProductRecord>, DirectoryError>;
}

#[async_trait]
impl<D> Directory for Arc<D>
where
    D: Directory + ?Sized,
{
    async fn user(&self, id: UserId) -> Result<Option<UserRecord>, DirectoryError> {
        (**self).user(id).await
    }

    async fn product(&self, id: ProductId) -> Result<Option<ProductRecord>, DirectoryError> {
        (**self).product(id).await
    }
}
