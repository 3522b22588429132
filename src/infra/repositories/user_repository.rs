//! User repository implementation with soft delete support.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use super::entities::user::{self, ActiveModel, Entity as UserEntity};
use crate::domain::{NewUser, StaffPermissions, User, UserRole};
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// User repository trait for dependency injection.
///
/// By default, all query methods exclude soft-deleted records.
/// Use `*_with_deleted` variants to include them.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find active user by ID (excludes soft-deleted)
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Find user by ID including soft-deleted
    async fn find_by_id_with_deleted(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Find active user by email address (excludes soft-deleted)
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Find user by email including soft-deleted
    async fn find_by_email_with_deleted(&self, email: &str) -> AppResult<Option<User>>;

    /// Create a new user
    async fn create(&self, user: NewUser) -> AppResult<User>;

    /// Update name and/or permission flags of an active user
    async fn update(
        &self,
        id: Uuid,
        name: Option<String>,
        permissions: Option<StaffPermissions>,
    ) -> AppResult<User>;

    /// Soft delete user by ID (sets deleted_at timestamp)
    async fn delete(&self, id: Uuid) -> AppResult<()>;

    /// Restore a soft-deleted user
    async fn restore(&self, id: Uuid) -> AppResult<User>;

    /// Users of a store, oldest first
    async fn list_by_store(&self, store_id: Uuid, include_deleted: bool) -> AppResult<Vec<User>>;

    /// Owner of a store
    async fn find_owner(&self, store_id: Uuid) -> AppResult<Option<User>>;
}

/// Concrete implementation of UserRepository with soft delete
pub struct UserStore {
    db: DatabaseConnection,
}

impl UserStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for UserStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        find_by_id(&self.db, id, false).await
    }

    async fn find_by_id_with_deleted(&self, id: Uuid) -> AppResult<Option<User>> {
        find_by_id(&self.db, id, true).await
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        find_by_email(&self.db, email, false).await
    }

    async fn find_by_email_with_deleted(&self, email: &str) -> AppResult<Option<User>> {
        find_by_email(&self.db, email, true).await
    }

    async fn create(&self, user: NewUser) -> AppResult<User> {
        create(&self.db, user).await
    }

    async fn update(
        &self,
        id: Uuid,
        name: Option<String>,
        permissions: Option<StaffPermissions>,
    ) -> AppResult<User> {
        let user = UserEntity::find_by_id(id)
            .filter(user::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut active: ActiveModel = user.into();

        if let Some(name) = name {
            active.name = Set(name);
        }
        if let Some(permissions) = permissions {
            active.permissions = Set(permissions.to_json());
        }
        active.updated_at = Set(chrono::Utc::now());

        let model = active.update(&self.db).await.map_err(AppError::from)?;
        Ok(User::from(model))
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let user = UserEntity::find_by_id(id)
            .filter(user::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut active: ActiveModel = user.into();
        let now = chrono::Utc::now();
        active.deleted_at = Set(Some(now));
        active.updated_at = Set(now);

        active.update(&self.db).await.map_err(AppError::from)?;
        Ok(())
    }

    async fn restore(&self, id: Uuid) -> AppResult<User> {
        let user = UserEntity::find_by_id(id)
            .filter(user::Column::DeletedAt.is_not_null())
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::validation("User is not deleted or does not exist"))?;

        let mut active: ActiveModel = user.into();
        active.deleted_at = Set(None);
        active.updated_at = Set(chrono::Utc::now());

        let model = active.update(&self.db).await.map_err(AppError::from)?;
        Ok(User::from(model))
    }

    async fn list_by_store(&self, store_id: Uuid, include_deleted: bool) -> AppResult<Vec<User>> {
        let mut query = UserEntity::find().filter(user::Column::StoreId.eq(store_id));
        if !include_deleted {
            query = query.filter(user::Column::DeletedAt.is_null());
        }

        let models = query
            .order_by_asc(user::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(models.into_iter().map(User::from).collect())
    }

    async fn find_owner(&self, store_id: Uuid) -> AppResult<Option<User>> {
        let result = UserEntity::find()
            .filter(user::Column::StoreId.eq(store_id))
            .filter(user::Column::Role.eq(UserRole::Owner.to_string()))
            .filter(user::Column::DeletedAt.is_null())
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(User::from))
    }
}

/// Transaction-aware user repository.
pub struct TxUserRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TxUserRepository<'a> {
    pub(crate) fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    /// Find user by email including soft-deleted
    pub async fn find_by_email_with_deleted(&self, email: &str) -> AppResult<Option<User>> {
        find_by_email(self.txn, email, true).await
    }

    /// Create a new user
    pub async fn create(&self, user: NewUser) -> AppResult<User> {
        create(self.txn, user).await
    }
}

async fn find_by_id<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    with_deleted: bool,
) -> AppResult<Option<User>> {
    let mut query = UserEntity::find_by_id(id);
    if !with_deleted {
        query = query.filter(user::Column::DeletedAt.is_null());
    }
    let result = query.one(conn).await.map_err(AppError::from)?;
    Ok(result.map(User::from))
}

async fn find_by_email<C: ConnectionTrait>(
    conn: &C,
    email: &str,
    with_deleted: bool,
) -> AppResult<Option<User>> {
    let mut query = UserEntity::find().filter(user::Column::Email.eq(email));
    if !with_deleted {
        query = query.filter(user::Column::DeletedAt.is_null());
    }
    let result = query.one(conn).await.map_err(AppError::from)?;
    Ok(result.map(User::from))
}

async fn create<C: ConnectionTrait>(conn: &C, user: NewUser) -> AppResult<User> {
    let now = chrono::Utc::now();
    let active_model = ActiveModel {
        id: Set(Uuid::new_v4()),
        store_id: Set(user.store_id),
        email: Set(user.email),
        password_hash: Set(user.password_hash),
        name: Set(user.name),
        role: Set(user.role.to_string()),
        permissions: Set(user.permissions.to_json()),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    };

    let model = active_model.insert(conn).await.map_err(AppError::from)?;
    Ok(User::from(model))
}
