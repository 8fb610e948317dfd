use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use almox_core::{ProductId, UserId};
use almox_directory::{Directory, DirectoryError, ProductRecord, UserRecord};

/// In-memory reference data for tests/dev.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    users: RwLock<HashMap<UserId, UserRecord>>,
    products: RwLock<HashMap<ProductId, ProductRecord>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_user(&self, record: UserRecord) {
        if let Ok(mut users) = self.users.write() {
            users.insert(record.id, record);
        }
    }

    pub fn put_product(&self, record: ProductRecord) {
        if let Ok(mut products) = self.products.write() {
            products.insert(record.id, record);
        }
    }

    pub fn remove_user(&self, id: UserId) {
        if let Ok(mut users) = self.users.write() {
            users.remove(&id);
        }
    }
}

fn poisoned<T>(_: T) -> DirectoryError {
    DirectoryError::Unavailable("lock poisoned".to_string())
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn user(&self, id: UserId) -> Result<Option<UserRecord>, DirectoryError> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users.get(&id).cloned())
    }

    async fn product(&self, id: ProductId) -> Result<Option<ProductRecord>, DirectoryError> {
        let products = self.products.read().map_err(poisoned)?;
        Ok(products.get(&id).cloned())
    }
}
