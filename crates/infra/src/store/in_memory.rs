use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use almox_core::{ProductId, RequestId};
use almox_ledger::LedgerEntry;

use super::r#trait::{Commit, LedgerStore, LedgerWrite, StoreError};

#[derive(Debug, Default)]
struct Tables {
    products: HashMap<ProductId, i64>,
    entries: HashMap<RequestId, LedgerEntry>,
}

/// In-memory ledger store.
///
/// Intended for tests/dev. A single lock over both tables makes every commit
/// trivially atomic; the conditional checks still run under the write lock so
/// the concurrency contract matches the persistent implementation.
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    tables: RwLock<Tables>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Backend("lock poisoned".to_string())
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn product_quantity(&self, product_id: ProductId) -> Result<Option<i64>, StoreError> {
        let tables = self.tables.read().map_err(poisoned)?;
        Ok(tables.products.get(&product_id).copied())
    }

    async fn put_product(&self, product_id: ProductId, quantity: i64) -> Result<(), StoreError> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        tables.products.insert(product_id, quantity);
        Ok(())
    }

    async fn fetch(&self, id: RequestId) -> Result<Option<LedgerEntry>, StoreError> {
        let tables = self.tables.read().map_err(poisoned)?;
        Ok(tables.entries.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<LedgerEntry>, StoreError> {
        let tables = self.tables.read().map_err(poisoned)?;
        let mut entries: Vec<_> = tables.entries.values().cloned().collect();
        entries.sort_by_key(|e| (e.created_at, *e.id.as_uuid()));
        Ok(entries)
    }

    async fn commit(&self, commit: Commit) -> Result<(), StoreError> {
        let mut tables = self.tables.write().map_err(poisoned)?;

        // Validate every condition before touching anything, so a failed
        // commit leaves both tables unchanged.
        let current = tables
            .products
            .get(&commit.product_id)
            .copied()
            .ok_or_else(|| StoreError::Conflict("product row is gone".to_string()))?;

        let adjusted = current + commit.delta;
        if adjusted < 0 {
            return Err(StoreError::Conflict(format!(
                "stock adjustment would drive quantity negative ({current} {:+})",
                commit.delta
            )));
        }

        match &commit.write {
            LedgerWrite::Insert(entry) => {
                if tables.entries.contains_key(&entry.id) {
                    return Err(StoreError::Conflict(format!(
                        "entry {} already exists",
                        entry.id
                    )));
                }
            }
            LedgerWrite::SetQuantity {
                id,
                expected_quantity,
                ..
            }
            | LedgerWrite::Remove {
                id,
                expected_quantity,
            } => {
                let entry = tables
                    .entries
                    .get(id)
                    .ok_or_else(|| StoreError::Conflict(format!("entry {id} is gone")))?;
                if entry.quantity != *expected_quantity {
                    return Err(StoreError::Conflict(format!(
                        "entry {id} quantity changed (expected {expected_quantity}, found {})",
                        entry.quantity
                    )));
                }
            }
            LedgerWrite::SetDelivery {
                id,
                expected_delivered,
                ..
            } => {
                let entry = tables
                    .entries
                    .get(id)
                    .ok_or_else(|| StoreError::Conflict(format!("entry {id} is gone")))?;
                if entry.delivery.is_delivered() != *expected_delivered {
                    return Err(StoreError::Conflict(format!(
                        "entry {id} delivery flag changed"
                    )));
                }
            }
        }

        // All conditions hold; apply both writes.
        tables.products.insert(commit.product_id, adjusted);
        match commit.write {
            LedgerWrite::Insert(entry) => {
                tables.entries.insert(entry.id, entry);
            }
            LedgerWrite::SetQuantity { id, quantity, .. } => {
                if let Some(entry) = tables.entries.get_mut(&id) {
                    entry.quantity = quantity;
                }
            }
            LedgerWrite::Remove { id, .. } => {
                tables.entries.remove(&id);
            }
            LedgerWrite::SetDelivery { id, delivery, .. } => {
                if let Some(entry) = tables.entries.get_mut(&id) {
                    entry.delivery = delivery;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use almox_core::UserId;
    use almox_ledger::DeliveryState;

    use super::*;

    fn entry_against(product_id: ProductId, quantity: i64) -> LedgerEntry {
        LedgerEntry::open(UserId::new(), product_id, quantity, Utc::now()).unwrap()
    }

    async fn store_with_product(quantity: i64) -> (MemoryLedgerStore, ProductId) {
        let store = MemoryLedgerStore::new();
        let product_id = ProductId::new();
        store.put_product(product_id, quantity).await.unwrap();
        (store, product_id)
    }

    #[tokio::test]
    async fn commit_applies_stock_delta_and_insert_together() {
        let (store, product_id) = store_with_product(10).await;
        let entry = entry_against(product_id, 3);

        store
            .commit(Commit {
                product_id,
                delta: -3,
                write: LedgerWrite::Insert(entry.clone()),
            })
            .await
            .unwrap();

        assert_eq!(store.product_quantity(product_id).await.unwrap(), Some(7));
        assert_eq!(store.fetch(entry.id).await.unwrap(), Some(entry));
    }

    #[tokio::test]
    async fn overdraw_conflicts_and_leaves_both_tables_untouched() {
        let (store, product_id) = store_with_product(4).await;
        let entry = entry_against(product_id, 5);

        let err = store
            .commit(Commit {
                product_id,
                delta: -5,
                write: LedgerWrite::Insert(entry.clone()),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.product_quantity(product_id).await.unwrap(), Some(4));
        assert_eq!(store.fetch(entry.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn stale_expected_quantity_conflicts() {
        let (store, product_id) = store_with_product(10).await;
        let entry = entry_against(product_id, 3);
        store
            .commit(Commit {
                product_id,
                delta: -3,
                write: LedgerWrite::Insert(entry.clone()),
            })
            .await
            .unwrap();

        // A writer that read quantity=2 (stale) must not win.
        let err = store
            .commit(Commit {
                product_id,
                delta: 1,
                write: LedgerWrite::SetQuantity {
                    id: entry.id,
                    expected_quantity: 2,
                    quantity: 1,
                },
            })
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.product_quantity(product_id).await.unwrap(), Some(7));
        assert_eq!(store.fetch(entry.id).await.unwrap().unwrap().quantity, 3);
    }

    #[tokio::test]
    async fn stale_delivery_flag_conflicts() {
        let (store, product_id) = store_with_product(10).await;
        let entry = entry_against(product_id, 3);
        store
            .commit(Commit {
                product_id,
                delta: -3,
                write: LedgerWrite::Insert(entry.clone()),
            })
            .await
            .unwrap();

        let err = store
            .commit(Commit {
                product_id,
                delta: 0,
                write: LedgerWrite::SetDelivery {
                    id: entry.id,
                    expected_delivered: true,
                    delivery: DeliveryState::Pending,
                },
            })
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn missing_product_row_conflicts() {
        let store = MemoryLedgerStore::new();
        let product_id = ProductId::new();
        let entry = entry_against(product_id, 1);

        let err = store
            .commit(Commit {
                product_id,
                delta: -1,
                write: LedgerWrite::Insert(entry),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn list_returns_entries_oldest_first() {
        let (store, product_id) = store_with_product(10).await;
        let older = LedgerEntry::open(
            UserId::new(),
            product_id,
            1,
            Utc::now() - chrono::Duration::minutes(5),
        )
        .unwrap();
        let newer = entry_against(product_id, 2);

        for entry in [newer.clone(), older.clone()] {
            store
                .commit(Commit {
                    product_id,
                    delta: -entry.quantity,
                    write: LedgerWrite::Insert(entry),
                })
                .await
                .unwrap();
        }

        let listed = store.list().await.unwrap();
        assert_eq!(listed, vec![older, newer]);
    }
}
