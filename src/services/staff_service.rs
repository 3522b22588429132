//! Staff service - Store owners manage their staff accounts.
//!
//! Staff of another store are reported as missing rather than forbidden so
//! ids do not leak across tenants.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use super::Actor;
use crate::domain::{NewUser, Password, StaffPermissions, User, UserRole};
use crate::errors::{AppError, AppResult};
use crate::infra::UnitOfWork;

/// Input for a new staff account
#[derive(Debug, Clone)]
pub struct NewStaff {
    pub email: String,
    pub password: String,
    pub name: String,
    pub permissions: StaffPermissions,
}

#[async_trait]
pub trait StaffService: Send + Sync {
    /// The caller's own account
    async fn me(&self, actor: &Actor) -> AppResult<User>;

    async fn list_staff(&self, actor: &Actor, include_deleted: bool) -> AppResult<Vec<User>>;

    async fn create_staff(&self, actor: &Actor, staff: NewStaff) -> AppResult<User>;

    /// Rename and/or replace the permission set
    async fn update_staff(
        &self,
        actor: &Actor,
        id: Uuid,
        name: Option<String>,
        permissions: Option<StaffPermissions>,
    ) -> AppResult<User>;

    /// Soft delete
    async fn delete_staff(&self, actor: &Actor, id: Uuid) -> AppResult<()>;

    async fn restore_staff(&self, actor: &Actor, id: Uuid) -> AppResult<User>;
}

pub struct StaffManager<U: UnitOfWork> {
    uow: Arc<U>,
}

impl<U: UnitOfWork> StaffManager<U> {
    pub fn new(uow: Arc<U>) -> Self {
        Self { uow }
    }

    /// Load a staff member of the owner's store, optionally including deleted rows.
    async fn staff_of(&self, store_id: Uuid, id: Uuid, with_deleted: bool) -> AppResult<User> {
        let users = self.uow.users();
        let user = if with_deleted {
            users.find_by_id_with_deleted(id).await?
        } else {
            users.find_by_id(id).await?
        };

        match user {
            Some(user) if user.store_id == Some(store_id) => {
                if user.role != UserRole::Staff {
                    return Err(AppError::invalid_state(
                        "The store owner account cannot be managed here",
                    ));
                }
                Ok(user)
            }
            _ => Err(AppError::NotFound),
        }
    }
}

#[async_trait]
impl<U: UnitOfWork> StaffService for StaffManager<U> {
    async fn me(&self, actor: &Actor) -> AppResult<User> {
        self.uow
            .users()
            .find_by_id(actor.user_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn list_staff(&self, actor: &Actor, include_deleted: bool) -> AppResult<Vec<User>> {
        let store_id = actor.require_owner()?;
        let users = self
            .uow
            .users()
            .list_by_store(store_id, include_deleted)
            .await?;
        Ok(users
            .into_iter()
            .filter(|u| u.role == UserRole::Staff)
            .collect())
    }

    async fn create_staff(&self, actor: &Actor, staff: NewStaff) -> AppResult<User> {
        let store_id = actor.require_owner()?;
        let email = staff.email.trim().to_lowercase();

        let users = self.uow.users();
        if users.find_by_email_with_deleted(&email).await?.is_some() {
            return Err(AppError::conflict("User"));
        }

        let password_hash = Password::new(&staff.password)?.into_string();
        let user = users
            .create(NewUser {
                store_id: Some(store_id),
                email,
                password_hash,
                name: staff.name,
                role: UserRole::Staff,
                permissions: staff.permissions,
            })
            .await?;

        tracing::info!(store_id = %store_id, staff_id = %user.id, "Staff account created");
        Ok(user)
    }

    async fn update_staff(
        &self,
        actor: &Actor,
        id: Uuid,
        name: Option<String>,
        permissions: Option<StaffPermissions>,
    ) -> AppResult<User> {
        let store_id = actor.require_owner()?;
        self.staff_of(store_id, id, false).await?;
        self.uow.users().update(id, name, permissions).await
    }

    async fn delete_staff(&self, actor: &Actor, id: Uuid) -> AppResult<()> {
        let store_id = actor.require_owner()?;
        self.staff_of(store_id, id, false).await?;
        self.uow.users().delete(id).await?;
        tracing::info!(store_id = %store_id, staff_id = %id, "Staff account deleted");
        Ok(())
    }

    async fn restore_staff(&self, actor: &Actor, id: Uuid) -> AppResult<User> {
        let store_id = actor.require_owner()?;
        let user = self.staff_of(store_id, id, true).await?;
        if !user.is_deleted() {
            return Err(AppError::invalid_state("Staff account is not deleted"));
        }
        self.uow.users().restore(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::repositories::MockUserRepository;
    use crate::services::test_support::TestUow;
    use chrono::Utc;

    fn owner_actor(store_id: Uuid) -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            store_id: Some(store_id),
            email: "owner@shop.example".into(),
            role: UserRole::Owner,
            permissions: StaffPermissions::all(),
        }
    }

    fn staff_user(store_id: Uuid) -> User {
        User {
            id: Uuid::new_v4(),
            store_id: Some(store_id),
            email: "clerk@shop.example".into(),
            password_hash: "x".into(),
            name: "Clerk".into(),
            role: UserRole::Staff,
            permissions: StaffPermissions::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    fn manager(users: MockUserRepository) -> StaffManager<TestUow> {
        StaffManager::new(Arc::new(TestUow {
            users: Arc::new(users),
            ..Default::default()
        }))
    }

    #[tokio::test]
    async fn test_other_store_staff_is_not_found() {
        let foreign = staff_user(Uuid::new_v4());
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .returning(move |_| Ok(Some(foreign.clone())));
        users.expect_delete().never();

        let result = manager(users)
            .delete_staff(&owner_actor(Uuid::new_v4()), Uuid::new_v4())
            .await;
        assert!(matches!(result, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn test_staff_cannot_manage_staff() {
        let store_id = Uuid::new_v4();
        let mut actor = owner_actor(store_id);
        actor.role = UserRole::Staff;

        let result = manager(MockUserRepository::new())
            .list_staff(&actor, false)
            .await;
        assert!(matches!(result, Err(AppError::Forbidden)));
    }

    #[tokio::test]
    async fn test_list_hides_owner() {
        let store_id = Uuid::new_v4();
        let clerk = staff_user(store_id);
        let mut owner = staff_user(store_id);
        owner.role = UserRole::Owner;

        let mut users = MockUserRepository::new();
        users
            .expect_list_by_store()
            .returning(move |_, _| Ok(vec![owner.clone(), clerk.clone()]));

        let staff = manager(users)
            .list_staff(&owner_actor(store_id), false)
            .await
            .unwrap();
        assert_eq!(staff.len(), 1);
        assert_eq!(staff[0].role, UserRole::Staff);
    }

    #[tokio::test]
    async fn test_create_rejects_taken_email() {
        let store_id = Uuid::new_v4();
        let existing = staff_user(store_id);
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email_with_deleted()
            .returning(move |_| Ok(Some(existing.clone())));
        users.expect_create().never();

        let result = manager(users)
            .create_staff(
                &owner_actor(store_id),
                NewStaff {
                    email: "Clerk@Shop.example".into(),
                    password: "long-enough-pass".into(),
                    name: "Clerk".into(),
                    permissions: StaffPermissions::default(),
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_restore_requires_deleted() {
        let store_id = Uuid::new_v4();
        let live = staff_user(store_id);
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id_with_deleted()
            .returning(move |_| Ok(Some(live.clone())));
        users.expect_restore().never();

        let result = manager(users)
            .restore_staff(&owner_actor(store_id), Uuid::new_v4())
            .await;
        assert!(matches!(result, Err(AppError::InvalidState(_))));
    }
}
