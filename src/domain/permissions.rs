//! Staff permission flags.
//!
//! Stored as a JSON object on the user row. Flags missing from the stored
//! blob deserialize as `false`, so adding a new flag never grants access to
//! existing staff.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Area of the panel guarded by a permission flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Products,
    Orders,
    Inventory,
    Pos,
    Marketing,
    Messages,
    Reports,
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Permission::Products => "products",
            Permission::Orders => "orders",
            Permission::Inventory => "inventory",
            Permission::Pos => "pos",
            Permission::Marketing => "marketing",
            Permission::Messages => "messages",
            Permission::Reports => "reports",
        };
        f.write_str(name)
    }
}

/// Per-staff permission set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct StaffPermissions {
    pub products: bool,
    pub orders: bool,
    pub inventory: bool,
    pub pos: bool,
    pub marketing: bool,
    pub messages: bool,
    pub reports: bool,
}

impl StaffPermissions {
    /// Every flag set (store owners)
    pub fn all() -> Self {
        Self {
            products: true,
            orders: true,
            inventory: true,
            pos: true,
            marketing: true,
            messages: true,
            reports: true,
        }
    }

    /// Check a single flag
    pub fn allows(&self, permission: Permission) -> bool {
        match permission {
            Permission::Products => self.products,
            Permission::Orders => self.orders,
            Permission::Inventory => self.inventory,
            Permission::Pos => self.pos,
            Permission::Marketing => self.marketing,
            Permission::Messages => self.messages,
            Permission::Reports => self.reports,
        }
    }

    /// Decode the stored JSON blob; malformed blobs grant nothing.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match serde_json::from_value(value.clone()) {
            Ok(perms) => perms,
            Err(e) => {
                tracing::warn!(error = %e, "Malformed permission blob, denying all");
                Self::default()
            }
        }
    }

    /// Encode for storage
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_flags_default_to_false() {
        let perms = StaffPermissions::from_json(&json!({ "orders": true }));
        assert!(perms.allows(Permission::Orders));
        assert!(!perms.allows(Permission::Products));
        assert!(!perms.allows(Permission::Reports));
    }

    #[test]
    fn test_malformed_blob_denies_everything() {
        let perms = StaffPermissions::from_json(&json!("not-an-object"));
        assert_eq!(perms, StaffPermissions::default());
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let perms = StaffPermissions::from_json(&json!({ "pos": true, "legacy_flag": true }));
        assert!(perms.allows(Permission::Pos));
    }

    #[test]
    fn test_all_roundtrips_through_json() {
        let stored = StaffPermissions::all().to_json();
        assert_eq!(StaffPermissions::from_json(&stored), StaffPermissions::all());
    }
}
