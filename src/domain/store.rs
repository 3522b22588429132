//! Store (tenant) entity.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};

static CURRENCY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{3}$").unwrap());
static SLUG_STRIP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Every panel row except platform admins belongs to exactly one store.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Store {
    pub id: Uuid,
    #[schema(example = "Corner Shop")]
    pub name: String,
    #[schema(example = "corner-shop")]
    pub slug: String,
    #[schema(example = "USD")]
    pub currency: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Upper-case and check an ISO 4217 style code.
pub fn normalize_currency(code: &str) -> AppResult<String> {
    let code = code.trim().to_uppercase();
    if CURRENCY_RE.is_match(&code) {
        Ok(code)
    } else {
        Err(AppError::validation(format!(
            "Invalid currency code '{}'",
            code
        )))
    }
}

/// URL-friendly store handle. A short id suffix keeps it unique.
pub fn slugify(name: &str, id: Uuid) -> String {
    let lower = name.to_lowercase();
    let base = SLUG_STRIP_RE.replace_all(&lower, "-");
    let base = base.trim_matches('-');
    let suffix = &id.simple().to_string()[..6];
    if base.is_empty() {
        format!("store-{}", suffix)
    } else {
        format!("{}-{}", base, suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency() {
        assert_eq!(normalize_currency("eur").unwrap(), "EUR");
        assert!(normalize_currency("EURO").is_err());
        assert!(normalize_currency("E1R").is_err());
    }

    #[test]
    fn test_slugify() {
        let id = Uuid::parse_str("abcdef12-0000-4000-8000-000000000000").unwrap();
        assert_eq!(slugify("Corner Shop & Co.", id), "corner-shop-co-abcdef");
        assert_eq!(slugify("!!!", id), "store-abcdef");
    }
}
