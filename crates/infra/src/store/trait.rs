use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use almox_core::{ProductId, RequestId};
use almox_ledger::{DeliveryState, LedgerEntry};

/// A ledger write to apply atomically with a stock delta.
///
/// Every mutation carries the expected prior state of the entry it touches
/// (its current quantity, or its current delivered flag). A store must reject
/// the whole commit with [`StoreError::Conflict`] when the row no longer
/// matches — the state-row analogue of an expected stream version, so that a
/// read-validate-write sequence cannot interleave with another writer's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerWrite {
    /// Insert a freshly opened entry.
    Insert(LedgerEntry),

    /// Set the entry's quantity, conditional on its current quantity.
    SetQuantity {
        id: RequestId,
        expected_quantity: i64,
        quantity: i64,
    },

    /// Remove the entry, conditional on its current quantity.
    Remove {
        id: RequestId,
        expected_quantity: i64,
    },

    /// Flip the delivery state, conditional on the current delivered flag.
    SetDelivery {
        id: RequestId,
        expected_delivered: bool,
        delivery: DeliveryState,
    },
}

impl LedgerWrite {
    /// Identifier of the entry this write touches.
    pub fn request_id(&self) -> RequestId {
        match self {
            LedgerWrite::Insert(entry) => entry.id,
            LedgerWrite::SetQuantity { id, .. }
            | LedgerWrite::Remove { id, .. }
            | LedgerWrite::SetDelivery { id, .. } => *id,
        }
    }
}

/// One atomic unit of work against the ledger: a conditional stock
/// adjustment on a product plus one ledger write.
///
/// Both writes commit together or not at all. The stock adjustment is
/// conditional: the product row must exist and the resulting quantity must
/// stay non-negative, otherwise the commit fails with
/// [`StoreError::Conflict`] and nothing is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub product_id: ProductId,
    /// Signed adjustment to the product's available quantity. Zero skips the
    /// product write entirely (delivery transitions have no stock effect).
    pub delta: i64,
    pub write: LedgerWrite,
}

/// Ledger store operation error.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A conditional write found the row changed (or gone) underneath the
    /// caller. Retrying the whole read-validate-commit sequence is safe.
    #[error("conditional write conflict: {0}")]
    Conflict(String),

    /// The underlying storage failed; any partial work was rolled back.
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Persistent home of the stock pool and the request ledger.
///
/// Implementations must guarantee, for [`LedgerStore::commit`]:
/// - the stock adjustment and the ledger write are atomic (all or nothing);
/// - the stock adjustment is conditional on the resulting quantity staying
///   non-negative;
/// - ledger writes are conditional on the expected prior entry state;
/// - a failed condition surfaces as [`StoreError::Conflict`] with no
///   observable partial effect.
///
/// Under concurrent commits against the same product, exactly one of two
/// conflicting writers observes the pre-conflict state (first committer
/// wins); callers retry from a fresh read.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Current available quantity of a product, `None` if unknown.
    async fn product_quantity(&self, product_id: ProductId) -> Result<Option<i64>, StoreError>;

    /// Register a product in the stock pool, or reset its availability.
    async fn put_product(&self, product_id: ProductId, quantity: i64) -> Result<(), StoreError>;

    /// Fetch a single ledger entry.
    async fn fetch(&self, id: RequestId) -> Result<Option<LedgerEntry>, StoreError>;

    /// All ledger entries, oldest first.
    async fn list(&self) -> Result<Vec<LedgerEntry>, StoreError>;

    /// Apply one commit atomically (see the trait-level contract).
    async fn commit(&self, commit: Commit) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    async fn product_quantity(&self, product_id: ProductId) -> Result<Option<i64>, StoreError> {
        (**self).product_quantity(product_id).await
    }

    async fn put_product(&self, product_id: ProductId, quantity: i64) -> Result<(), StoreError> {
        (**self).put_product(product_id, quantity).await
    }

    async fn fetch(&self, id: RequestId) -> Result<Option<LedgerEntry>, StoreError> {
        (**self).fetch(id).await
    }

    async fn list(&self) -> Result<Vec<LedgerEntry>, StoreError> {
        (**self).list().await
    }

    async fn commit(&self, commit: Commit) -> Result<(), StoreError> {
        (**self).commit(commit).await
    }
}
