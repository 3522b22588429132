//! Panel user (store owner, staff member, or platform admin).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::permissions::{Permission, StaffPermissions};
use crate::config::{ROLE_ADMIN, ROLE_OWNER, ROLE_STAFF};

/// User roles enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Owner,
    Staff,
    Admin,
}

impl UserRole {
    /// Check if this role has platform admin privileges
    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

impl From<&str> for UserRole {
    fn from(s: &str) -> Self {
        match s {
            ROLE_ADMIN => UserRole::Admin,
            ROLE_OWNER => UserRole::Owner,
            _ => UserRole::Staff,
        }
    }
}

impl From<UserRole> for String {
    fn from(role: UserRole) -> Self {
        role.to_string()
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::Admin => write!(f, "{}", ROLE_ADMIN),
            UserRole::Owner => write!(f, "{}", ROLE_OWNER),
            UserRole::Staff => write!(f, "{}", ROLE_STAFF),
        }
    }
}

/// User domain entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Owning store; `None` for platform admins
    pub store_id: Option<Uuid>,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub role: UserRole,
    pub permissions: StaffPermissions,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Soft delete timestamp (None = active, Some = deleted)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    /// Effective permissions: owners hold every flag, admins hold none.
    pub fn effective_permissions(&self) -> StaffPermissions {
        match self.role {
            UserRole::Owner => StaffPermissions::all(),
            UserRole::Staff => self.permissions,
            UserRole::Admin => StaffPermissions::default(),
        }
    }

    /// Check whether the user may act on a store area
    pub fn can(&self, permission: Permission) -> bool {
        self.effective_permissions().allows(permission)
    }

    /// Check if user is soft deleted
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Fields for a new user row
#[derive(Debug, Clone)]
pub struct NewUser {
    pub store_id: Option<Uuid>,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: UserRole,
    pub permissions: StaffPermissions,
}

/// User response (safe to return to client)
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserResponse {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,
    pub store_id: Option<Uuid>,
    #[schema(example = "owner@shop.example")]
    pub email: String,
    #[schema(example = "Dana Seller")]
    pub name: String,
    #[schema(example = "owner")]
    pub role: String,
    pub permissions: StaffPermissions,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        let permissions = user.effective_permissions();
        Self {
            id: user.id,
            store_id: user.store_id,
            email: user.email,
            name: user.name,
            role: user.role.to_string(),
            permissions,
            created_at: user.created_at,
        }
    }
}
