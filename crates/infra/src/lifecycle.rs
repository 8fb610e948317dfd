//! Request lifecycle orchestration (application-level).
//!
//! `RequestLifecycle` owns the state machine over ledger entries and is the
//! only writer of the stock pool. Every stock-affecting operation follows the
//! same pipeline:
//!
//! ```text
//! Intent
//!   ↓
//! 1. Read current state (product quantity, entry) from the store
//!   ↓
//! 2. Validate with pure domain logic (stock accounting, entry transitions)
//!   ↓
//! 3. Commit the stock delta + ledger write as one conditional atomic unit
//!   ↓
//! 4. On a conditional conflict, retry from a fresh read (bounded)
//! ```
//!
//! The conditional commit is the consistency gate: a naive read-then-write
//! would let two concurrent creates against the same product both observe
//! `quantity = 5`, both request 5, and drive the pool negative. With the
//! gate, exactly one of two conflicting writers observes the pre-conflict
//! state; the other re-reads and either succeeds against the new state or
//! fails deterministically (`InsufficientStock`). Retries are bounded;
//! exhaustion surfaces as `Busy` and the caller may try again.
//!
//! Deterministic validation failures are never retried — they are reported
//! synchronously before any write happens.

use chrono::Utc;
use thiserror::Error;

use almox_core::{DomainError, ProductId, RequestId, UserId};
use almox_directory::{Category, Directory, DirectoryError, Sector};
use almox_ledger::{stock, DeliveryState, LedgerEntry};

use crate::store::{Commit, LedgerStore, LedgerWrite, StoreError};

/// How many times a conflicted commit is re-attempted from a fresh read
/// before the operation gives up with `Busy`.
const DEFAULT_MAX_ATTEMPTS: u32 = 4;

/// Lifecycle operation error.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("product not found")]
    ProductNotFound,

    #[error("user not found")]
    UserNotFound,

    #[error("product request not found")]
    RequestNotFound,

    #[error("requested quantity exceeds available stock (requested {requested}, available {available})")]
    InsufficientStock { requested: i64, available: i64 },

    #[error("invalid delivery state: {0}")]
    InvalidState(String),

    #[error("validation failed: {0}")]
    Validation(String),

    /// Gate contention: retries exhausted without observing a stable state.
    #[error("operation is contended, try again: {0}")]
    Busy(String),

    #[error("storage failure: {0}")]
    Store(#[from] StoreError),

    #[error("directory failure: {0}")]
    Directory(#[from] DirectoryError),
}

impl From<DomainError> for LifecycleError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => LifecycleError::Validation(msg),
            DomainError::InsufficientStock {
                requested,
                available,
            } => LifecycleError::InsufficientStock {
                requested,
                available,
            },
            DomainError::InvalidState(msg) => LifecycleError::InvalidState(msg),
            DomainError::InvalidId(msg) => LifecycleError::Validation(msg),
            DomainError::NotFound => LifecycleError::RequestNotFound,
        }
    }
}

/// Read-only projection of an entry joined with its reference data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestView {
    pub id: RequestId,
    pub user_name: String,
    pub user_sector: Sector,
    pub product_name: String,
    pub quantity: i64,
    pub created_at: chrono::DateTime<Utc>,
    pub category: Category,
    pub delivery: DeliveryState,
}

/// Orchestrates create/update/delete/deliver/cancel-delivery over the ledger.
#[derive(Debug)]
pub struct RequestLifecycle<S, D> {
    store: S,
    directory: D,
    max_attempts: u32,
}

impl<S, D> RequestLifecycle<S, D> {
    pub fn new(store: S, directory: D) -> Self {
        Self {
            store,
            directory,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Override the retry budget (tests exercise the `Busy` path with 1).
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }
}

impl<S, D> RequestLifecycle<S, D>
where
    S: LedgerStore,
    D: Directory,
{
    /// Open a new request: debit the product, insert the entry, atomically.
    pub async fn create(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<LedgerEntry, LifecycleError> {
        // Deterministic validation first; the entry id stays stable across
        // commit retries.
        let entry = LedgerEntry::open(user_id, product_id, quantity, Utc::now())?;

        let mut attempt = 0;
        loop {
            attempt += 1;

            let available = self
                .store
                .product_quantity(product_id)
                .await?
                .ok_or(LifecycleError::ProductNotFound)?;
            stock::debit(available, quantity)?;

            if self.directory.user(user_id).await?.is_none() {
                return Err(LifecycleError::UserNotFound);
            }

            match self
                .store
                .commit(Commit {
                    product_id,
                    delta: -quantity,
                    write: LedgerWrite::Insert(entry.clone()),
                })
                .await
            {
                Ok(()) => return Ok(entry),
                Err(StoreError::Conflict(reason)) => {
                    self.check_attempts(attempt, &reason, "create")?;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Re-quantify an entry, adjusting the product by the implied delta.
    pub async fn update(
        &self,
        id: RequestId,
        quantity: i64,
    ) -> Result<LedgerEntry, LifecycleError> {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let entry = self.fetch_entry(id).await?;
            let updated = entry.requantify(quantity)?;
            let delta = entry.requantify_delta(quantity);

            let available = self
                .store
                .product_quantity(entry.product_id)
                .await?
                .ok_or(LifecycleError::ProductNotFound)?;
            stock::adjust_by_delta(available, delta)?;

            match self
                .store
                .commit(Commit {
                    product_id: entry.product_id,
                    delta,
                    write: LedgerWrite::SetQuantity {
                        id,
                        expected_quantity: entry.quantity,
                        quantity,
                    },
                })
                .await
            {
                Ok(()) => return Ok(updated),
                Err(StoreError::Conflict(reason)) => {
                    self.check_attempts(attempt, &reason, "update")?;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Remove an entry and return its quantity to the pool, regardless of
    /// delivery state (matches the source system; see DESIGN notes).
    pub async fn delete(&self, id: RequestId) -> Result<(), LifecycleError> {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let entry = self.fetch_entry(id).await?;

            match self
                .store
                .commit(Commit {
                    product_id: entry.product_id,
                    delta: entry.quantity,
                    write: LedgerWrite::Remove {
                        id,
                        expected_quantity: entry.quantity,
                    },
                })
                .await
            {
                Ok(()) => return Ok(()),
                Err(StoreError::Conflict(reason)) => {
                    self.check_attempts(attempt, &reason, "delete")?;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Transition `Pending -> Delivered`. No stock effect.
    pub async fn mark_delivered(&self, id: RequestId) -> Result<LedgerEntry, LifecycleError> {
        self.transition_delivery(id, "mark_delivered", |entry| {
            entry.mark_delivered(Utc::now())
        })
        .await
    }

    /// Transition `Delivered -> Pending`. No stock effect.
    pub async fn cancel_delivery(&self, id: RequestId) -> Result<LedgerEntry, LifecycleError> {
        self.transition_delivery(id, "cancel_delivery", |entry| entry.cancel_delivery())
            .await
    }

    /// Single entry joined with its reference data.
    pub async fn get(&self, id: RequestId) -> Result<RequestView, LifecycleError> {
        let entry = self.fetch_entry(id).await?;
        self.view_of(&entry)
            .await?
            .ok_or(LifecycleError::RequestNotFound)
    }

    /// All entries joined with their reference data, oldest first.
    ///
    /// Entries whose user or product record is gone are skipped, like the
    /// inner joins of the source system.
    pub async fn list(&self) -> Result<Vec<RequestView>, LifecycleError> {
        let entries = self.store.list().await?;
        let mut views = Vec::with_capacity(entries.len());
        for entry in &entries {
            match self.view_of(entry).await? {
                Some(view) => views.push(view),
                None => {
                    tracing::warn!(request_id = %entry.id, "skipping entry with missing reference data");
                }
            }
        }
        Ok(views)
    }

    /// Register a product in the stock pool (collaborator seed surface).
    pub async fn register_product(
        &self,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<(), LifecycleError> {
        if quantity < 0 {
            return Err(LifecycleError::Validation(
                "initial quantity must be non-negative".to_string(),
            ));
        }
        Ok(self.store.put_product(product_id, quantity).await?)
    }

    /// Current availability of a product.
    pub async fn product_availability(
        &self,
        product_id: ProductId,
    ) -> Result<i64, LifecycleError> {
        self.store
            .product_quantity(product_id)
            .await?
            .ok_or(LifecycleError::ProductNotFound)
    }

    async fn transition_delivery(
        &self,
        id: RequestId,
        operation: &'static str,
        transition: impl Fn(&LedgerEntry) -> Result<LedgerEntry, DomainError>,
    ) -> Result<LedgerEntry, LifecycleError> {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let entry = self.fetch_entry(id).await?;
            let next = transition(&entry)?;

            match self
                .store
                .commit(Commit {
                    product_id: entry.product_id,
                    delta: 0,
                    write: LedgerWrite::SetDelivery {
                        id,
                        expected_delivered: entry.delivery.is_delivered(),
                        delivery: next.delivery,
                    },
                })
                .await
            {
                Ok(()) => return Ok(next),
                Err(StoreError::Conflict(reason)) => {
                    self.check_attempts(attempt, &reason, operation)?;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn fetch_entry(&self, id: RequestId) -> Result<LedgerEntry, LifecycleError> {
        self.store
            .fetch(id)
            .await?
            .ok_or(LifecycleError::RequestNotFound)
    }

    async fn view_of(&self, entry: &LedgerEntry) -> Result<Option<RequestView>, LifecycleError> {
        let Some(user) = self.directory.user(entry.user_id).await? else {
            return Ok(None);
        };
        let Some(product) = self.directory.product(entry.product_id).await? else {
            return Ok(None);
        };

        Ok(Some(RequestView {
            id: entry.id,
            user_name: user.name,
            user_sector: user.sector,
            product_name: product.name,
            quantity: entry.quantity,
            created_at: entry.created_at,
            category: product.category,
            delivery: entry.delivery,
        }))
    }

    fn check_attempts(
        &self,
        attempt: u32,
        reason: &str,
        operation: &'static str,
    ) -> Result<(), LifecycleError> {
        if attempt >= self.max_attempts {
            return Err(LifecycleError::Busy(reason.to_string()));
        }
        tracing::debug!(operation, attempt, "commit conflict, retrying: {reason}");
        Ok(())
    }
}
