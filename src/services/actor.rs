//! Authenticated caller as seen by the services.

use uuid::Uuid;

use crate::domain::{Permission, SenderSide, StaffPermissions, UserRole};
use crate::errors::{AppError, AppResult};

/// Identity resolved from a verified token
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: Uuid,
    pub store_id: Option<Uuid>,
    pub email: String,
    pub role: UserRole,
    pub permissions: StaffPermissions,
}

impl Actor {
    /// Store the caller belongs to; platform admins have none.
    pub fn store(&self) -> AppResult<Uuid> {
        self.store_id.ok_or(AppError::Forbidden)
    }

    pub fn require(&self, permission: Permission) -> AppResult<()> {
        let allowed = match self.role {
            UserRole::Owner => true,
            UserRole::Staff => self.permissions.allows(permission),
            UserRole::Admin => false,
        };
        if allowed {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    pub fn require_owner(&self) -> AppResult<Uuid> {
        match self.role {
            UserRole::Owner => self.store(),
            _ => Err(AppError::Forbidden),
        }
    }

    pub fn side(&self) -> SenderSide {
        SenderSide::for_role(self.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: UserRole, permissions: StaffPermissions) -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            store_id: (role != UserRole::Admin).then(Uuid::new_v4),
            email: "x@shop.example".into(),
            role,
            permissions,
        }
    }

    #[test]
    fn test_staff_needs_flag() {
        let staff = actor(
            UserRole::Staff,
            StaffPermissions {
                orders: true,
                ..Default::default()
            },
        );
        assert!(staff.require(Permission::Orders).is_ok());
        assert!(matches!(
            staff.require(Permission::Inventory),
            Err(AppError::Forbidden)
        ));
        assert!(staff.require_owner().is_err());
    }

    #[test]
    fn test_admin_has_no_store() {
        let admin = actor(UserRole::Admin, StaffPermissions::all());
        assert!(admin.store().is_err());
        assert!(admin.require(Permission::Products).is_err());
        assert_eq!(admin.side(), SenderSide::Admin);
    }

    #[test]
    fn test_owner_passes_everything() {
        let owner = actor(UserRole::Owner, StaffPermissions::default());
        assert!(owner.require(Permission::Reports).is_ok());
        assert!(owner.require_owner().is_ok());
    }
}
