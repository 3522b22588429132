//! Warehouse repository.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use super::entities::warehouse::{self, ActiveModel, Entity as WarehouseEntity};
use crate::domain::Warehouse;
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Fields that can change on an existing warehouse
#[derive(Debug, Clone, Default)]
pub struct WarehouseChanges {
    pub name: Option<String>,
    pub location: Option<String>,
    pub is_active: Option<bool>,
}

/// Warehouse repository. Every query is scoped to a store.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait WarehouseRepository: Send + Sync {
    async fn find_by_id(&self, store_id: Uuid, id: Uuid) -> AppResult<Option<Warehouse>>;

    /// Default first, then by name
    async fn list(&self, store_id: Uuid) -> AppResult<Vec<Warehouse>>;

    async fn create(
        &self,
        store_id: Uuid,
        name: String,
        location: Option<String>,
    ) -> AppResult<Warehouse>;

    async fn update(&self, store_id: Uuid, id: Uuid, changes: WarehouseChanges)
        -> AppResult<Warehouse>;
}

pub struct WarehouseStore {
    db: DatabaseConnection,
}

impl WarehouseStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl WarehouseRepository for WarehouseStore {
    async fn find_by_id(&self, store_id: Uuid, id: Uuid) -> AppResult<Option<Warehouse>> {
        find_by_id(&self.db, store_id, id).await
    }

    async fn list(&self, store_id: Uuid) -> AppResult<Vec<Warehouse>> {
        let models = WarehouseEntity::find()
            .filter(warehouse::Column::StoreId.eq(store_id))
            .order_by_desc(warehouse::Column::IsDefault)
            .order_by_asc(warehouse::Column::Name)
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(models.into_iter().map(Warehouse::from).collect())
    }

    async fn create(
        &self,
        store_id: Uuid,
        name: String,
        location: Option<String>,
    ) -> AppResult<Warehouse> {
        create(&self.db, store_id, name, location, false).await
    }

    async fn update(
        &self,
        store_id: Uuid,
        id: Uuid,
        changes: WarehouseChanges,
    ) -> AppResult<Warehouse> {
        update(&self.db, store_id, id, changes).await
    }
}

/// Transaction-aware warehouse repository.
pub struct TxWarehouseRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TxWarehouseRepository<'a> {
    pub(crate) fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    pub async fn find_by_id(&self, store_id: Uuid, id: Uuid) -> AppResult<Option<Warehouse>> {
        find_by_id(self.txn, store_id, id).await
    }

    /// The store's default warehouse
    pub async fn find_default(&self, store_id: Uuid) -> AppResult<Option<Warehouse>> {
        let result = WarehouseEntity::find()
            .filter(warehouse::Column::StoreId.eq(store_id))
            .filter(warehouse::Column::IsDefault.eq(true))
            .one(self.txn)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(Warehouse::from))
    }

    pub async fn update(
        &self,
        store_id: Uuid,
        id: Uuid,
        changes: WarehouseChanges,
    ) -> AppResult<Warehouse> {
        update(self.txn, store_id, id, changes).await
    }

    pub async fn create_default(&self, store_id: Uuid, name: String) -> AppResult<Warehouse> {
        create(self.txn, store_id, name, None, true).await
    }

    /// Make `id` the only default warehouse of the store.
    pub async fn set_default(&self, store_id: Uuid, id: Uuid) -> AppResult<Warehouse> {
        use sea_orm::sea_query::Expr;

        WarehouseEntity::update_many()
            .col_expr(warehouse::Column::IsDefault, Expr::value(false))
            .filter(warehouse::Column::StoreId.eq(store_id))
            .filter(warehouse::Column::IsDefault.eq(true))
            .exec(self.txn)
            .await?;

        let model = WarehouseEntity::find_by_id(id)
            .filter(warehouse::Column::StoreId.eq(store_id))
            .one(self.txn)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut active: ActiveModel = model.into();
        active.is_default = Set(true);
        active.updated_at = Set(chrono::Utc::now());

        let model = active.update(self.txn).await.map_err(AppError::from)?;
        Ok(Warehouse::from(model))
    }
}

async fn find_by_id<C: ConnectionTrait>(
    conn: &C,
    store_id: Uuid,
    id: Uuid,
) -> AppResult<Option<Warehouse>> {
    let result = WarehouseEntity::find_by_id(id)
        .filter(warehouse::Column::StoreId.eq(store_id))
        .one(conn)
        .await
        .map_err(AppError::from)?;

    Ok(result.map(Warehouse::from))
}

async fn create<C: ConnectionTrait>(
    conn: &C,
    store_id: Uuid,
    name: String,
    location: Option<String>,
    is_default: bool,
) -> AppResult<Warehouse> {
    let now = chrono::Utc::now();
    let active_model = ActiveModel {
        id: Set(Uuid::new_v4()),
        store_id: Set(store_id),
        name: Set(name),
        location: Set(location),
        is_default: Set(is_default),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let model = active_model.insert(conn).await.map_err(AppError::from)?;
    Ok(Warehouse::from(model))
}

async fn update<C: ConnectionTrait>(
    conn: &C,
    store_id: Uuid,
    id: Uuid,
    changes: WarehouseChanges,
) -> AppResult<Warehouse> {
    let model = WarehouseEntity::find_by_id(id)
        .filter(warehouse::Column::StoreId.eq(store_id))
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ActiveModel = model.into();
    if let Some(name) = changes.name {
        active.name = Set(name);
    }
    if let Some(location) = changes.location {
        active.location = Set(Some(location));
    }
    if let Some(is_active) = changes.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(chrono::Utc::now());

    let model = active.update(conn).await.map_err(AppError::from)?;
    Ok(Warehouse::from(model))
}
