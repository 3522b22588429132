//! Store (tenant) repository.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, Set,
};
use uuid::Uuid;

use super::entities::store::{self, ActiveModel, Entity as StoreEntity};
use crate::domain::store::slugify;
use crate::domain::Store;
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait StoreRepository: Send + Sync {
    /// Find an active store
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Store>>;
}

pub struct StoreStore {
    db: DatabaseConnection,
}

impl StoreStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl StoreRepository for StoreStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Store>> {
        let result = StoreEntity::find_by_id(id)
            .filter(store::Column::IsActive.eq(true))
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(Store::from))
    }
}

/// Transaction-aware store repository.
pub struct TxStoreRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TxStoreRepository<'a> {
    pub(crate) fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    /// Create a store; the slug is derived from the name.
    pub async fn create(&self, name: String, currency: String) -> AppResult<Store> {
        let id = Uuid::new_v4();
        let now = chrono::Utc::now();
        let active_model = ActiveModel {
            id: Set(id),
            slug: Set(slugify(&name, id)),
            name: Set(name),
            currency: Set(currency),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = active_model.insert(self.txn).await.map_err(AppError::from)?;
        Ok(Store::from(model))
    }
}
