use std::sync::Arc;

use sqlx::PgPool;

use almox_core::{ProductId, RequestId, UserId};
use almox_directory::{Directory, ProductRecord, UserRecord};
use almox_infra::{
    directory::{MemoryDirectory, PostgresDirectory},
    lifecycle::{LifecycleError, RequestLifecycle, RequestView},
    store::{MemoryLedgerStore, PostgresLedgerStore},
};
use almox_ledger::LedgerEntry;

type MemoryLifecycle = RequestLifecycle<Arc<MemoryLedgerStore>, Arc<MemoryDirectory>>;
type PersistentLifecycle = RequestLifecycle<Arc<PostgresLedgerStore>, Arc<PostgresDirectory>>;

/// Application services behind the HTTP handlers.
///
/// The in-memory wiring backs dev and tests; the persistent wiring is
/// selected at startup via `USE_PERSISTENT_STORE=true` + `DATABASE_URL`.
pub enum AppServices {
    InMemory {
        lifecycle: Arc<MemoryLifecycle>,
        directory: Arc<MemoryDirectory>,
    },
    Persistent {
        lifecycle: Arc<PersistentLifecycle>,
        directory: Arc<PostgresDirectory>,
    },
}

pub async fn build_services() -> AppServices {
    let use_persistent = std::env::var("USE_PERSISTENT_STORE")
        .unwrap_or_else(|_| "false".to_string())
        .parse::<bool>()
        .unwrap_or(false);

    if use_persistent {
        return build_persistent_services().await;
    }

    build_in_memory_services()
}

fn build_in_memory_services() -> AppServices {
    let store = Arc::new(MemoryLedgerStore::new());
    let directory = Arc::new(MemoryDirectory::new());
    let lifecycle = Arc::new(RequestLifecycle::new(store, directory.clone()));

    AppServices::InMemory {
        lifecycle,
        directory,
    }
}

async fn build_persistent_services() -> AppServices {
    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set when USE_PERSISTENT_STORE=true");

    let pool = PgPool::connect(&database_url)
        .await
        .expect("failed to connect to Postgres");

    let store = Arc::new(PostgresLedgerStore::new(pool.clone()));
    let directory = Arc::new(PostgresDirectory::new(pool));
    let lifecycle = Arc::new(RequestLifecycle::new(store, directory.clone()));

    AppServices::Persistent {
        lifecycle,
        directory,
    }
}

impl AppServices {
    pub async fn create(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<LedgerEntry, LifecycleError> {
        match self {
            AppServices::InMemory { lifecycle, .. } => {
                lifecycle.create(user_id, product_id, quantity).await
            }
            AppServices::Persistent { lifecycle, .. } => {
                lifecycle.create(user_id, product_id, quantity).await
            }
        }
    }

    pub async fn list(&self) -> Result<Vec<RequestView>, LifecycleError> {
        match self {
            AppServices::InMemory { lifecycle, .. } => lifecycle.list().await,
            AppServices::Persistent { lifecycle, .. } => lifecycle.list().await,
        }
    }

    pub async fn get(&self, id: RequestId) -> Result<RequestView, LifecycleError> {
        match self {
            AppServices::InMemory { lifecycle, .. } => lifecycle.get(id).await,
            AppServices::Persistent { lifecycle, .. } => lifecycle.get(id).await,
        }
    }

    pub async fn update(&self, id: RequestId, quantity: i64) -> Result<LedgerEntry, LifecycleError> {
        match self {
            AppServices::InMemory { lifecycle, .. } => lifecycle.update(id, quantity).await,
            AppServices::Persistent { lifecycle, .. } => lifecycle.update(id, quantity).await,
        }
    }

    pub async fn delete(&self, id: RequestId) -> Result<(), LifecycleError> {
        match self {
            AppServices::InMemory { lifecycle, .. } => lifecycle.delete(id).await,
            AppServices::Persistent { lifecycle, .. } => lifecycle.delete(id).await,
        }
    }

    pub async fn mark_delivered(&self, id: RequestId) -> Result<LedgerEntry, LifecycleError> {
        match self {
            AppServices::InMemory { lifecycle, .. } => lifecycle.mark_delivered(id).await,
            AppServices::Persistent { lifecycle, .. } => lifecycle.mark_delivered(id).await,
        }
    }

    pub async fn cancel_delivery(&self, id: RequestId) -> Result<LedgerEntry, LifecycleError> {
        match self {
            AppServices::InMemory { lifecycle, .. } => lifecycle.cancel_delivery(id).await,
            AppServices::Persistent { lifecycle, .. } => lifecycle.cancel_delivery(id).await,
        }
    }

    /// Collaborator seed surface: register a user profile.
    pub async fn register_user(&self, record: UserRecord) -> Result<(), LifecycleError> {
        match self {
            AppServices::InMemory { directory, .. } => {
                directory.put_user(record);
                Ok(())
            }
            AppServices::Persistent { directory, .. } => Ok(directory.put_user(&record).await?),
        }
    }

    /// Collaborator seed surface: register product metadata + initial stock.
    pub async fn register_product(
        &self,
        record: ProductRecord,
        quantity: i64,
    ) -> Result<(), LifecycleError> {
        match self {
            AppServices::InMemory {
                lifecycle,
                directory,
            } => {
                directory.put_product(record.clone());
                lifecycle.register_product(record.id, quantity).await
            }
            AppServices::Persistent {
                lifecycle,
                directory,
            } => {
                directory.put_product(&record).await?;
                lifecycle.register_product(record.id, quantity).await
            }
        }
    }

    pub async fn product_record(
        &self,
        id: ProductId,
    ) -> Result<Option<ProductRecord>, LifecycleError> {
        match self {
            AppServices::InMemory { directory, .. } => Ok(directory.product(id).await?),
            AppServices::Persistent { directory, .. } => Ok(directory.product(id).await?),
        }
    }

    pub async fn product_availability(&self, id: ProductId) -> Result<i64, LifecycleError> {
        match self {
            AppServices::InMemory { lifecycle, .. } => lifecycle.product_availability(id).await,
            AppServices::Persistent { lifecycle, .. } => lifecycle.product_availability(id).await,
        }
    }
}
