//! Discount codes.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PromotionKind {
    Percentage,
    FixedAmount,
}

impl PromotionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromotionKind::Percentage => "percentage",
            PromotionKind::FixedAmount => "fixed_amount",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "percentage" => Some(PromotionKind::Percentage),
            "fixed_amount" => Some(PromotionKind::FixedAmount),
            _ => None,
        }
    }

    /// Check a value is in range for this kind.
    pub fn validate_value(&self, value: Decimal) -> AppResult<()> {
        match self {
            PromotionKind::Percentage if value <= Decimal::ZERO || value > Decimal::ONE_HUNDRED => {
                Err(AppError::validation(
                    "Percentage must be greater than 0 and at most 100",
                ))
            }
            PromotionKind::FixedAmount if value <= Decimal::ZERO => {
                Err(AppError::validation("Fixed amount must be greater than 0"))
            }
            _ => Ok(()),
        }
    }
}

/// Promotion entity
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Promotion {
    pub id: Uuid,
    pub store_id: Uuid,
    #[schema(example = "SUMMER10")]
    pub code: String,
    pub name: String,
    pub kind: PromotionKind,
    #[schema(value_type = String, example = "10")]
    pub value: Decimal,
    #[schema(value_type = Option<String>)]
    pub min_order_amount: Option<Decimal>,
    pub max_uses: Option<i32>,
    pub used_count: i32,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Promotion {
    /// Check the promotion can be applied to `subtotal` at `now`.
    pub fn check_applicable(&self, subtotal: Decimal, now: DateTime<Utc>) -> AppResult<()> {
        if !self.is_active {
            return Err(AppError::validation(format!(
                "Promotion {} is not active",
                self.code
            )));
        }
        if now < self.starts_at {
            return Err(AppError::validation(format!(
                "Promotion {} has not started",
                self.code
            )));
        }
        if self.ends_at.is_some_and(|end| now >= end) {
            return Err(AppError::validation(format!(
                "Promotion {} has expired",
                self.code
            )));
        }
        if self.max_uses.is_some_and(|max| self.used_count >= max) {
            return Err(AppError::validation(format!(
                "Promotion {} has reached its usage limit",
                self.code
            )));
        }
        if let Some(min) = self.min_order_amount {
            if subtotal < min {
                return Err(AppError::validation(format!(
                    "Promotion {} requires a minimum order of {}",
                    self.code, min
                )));
            }
        }
        Ok(())
    }

    /// Discount for `subtotal`, never more than the subtotal itself.
    pub fn discount_for(&self, subtotal: Decimal) -> Decimal {
        let raw = match self.kind {
            PromotionKind::Percentage => (subtotal * self.value / Decimal::ONE_HUNDRED)
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
            PromotionKind::FixedAmount => self.value,
        };
        raw.min(subtotal).max(Decimal::ZERO)
    }
}

/// Result of pricing a subtotal against a code
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DiscountPreview {
    pub code: String,
    #[schema(value_type = String)]
    pub subtotal: Decimal,
    #[schema(value_type = String)]
    pub discount: Decimal,
    #[schema(value_type = String)]
    pub total: Decimal,
}

/// Codes are compared and stored upper-case without surrounding whitespace.
pub fn normalize_code(code: &str) -> AppResult<String> {
    let code = code.trim().to_uppercase();
    if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(AppError::validation(
            "Promotion code must be letters, digits, '-' or '_'",
        ));
    }
    Ok(code)
}

/// Fields accepted when creating a promotion
#[derive(Debug, Clone)]
pub struct NewPromotion {
    pub code: String,
    pub name: String,
    pub kind: PromotionKind,
    pub value: Decimal,
    pub min_order_amount: Option<Decimal>,
    pub max_uses: Option<i32>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

/// Partial update
#[derive(Debug, Clone, Default)]
pub struct PromotionChanges {
    pub name: Option<String>,
    pub value: Option<Decimal>,
    pub min_order_amount: Option<Decimal>,
    pub max_uses: Option<i32>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

/// Reject windows that end before they start.
pub fn validate_window(starts_at: DateTime<Utc>, ends_at: Option<DateTime<Utc>>) -> AppResult<()> {
    match ends_at {
        Some(end) if end <= starts_at => Err(AppError::validation(
            "Promotion must end after it starts",
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn promo(kind: PromotionKind, value: Decimal) -> Promotion {
        let now = Utc::now();
        Promotion {
            id: Uuid::new_v4(),
            store_id: Uuid::new_v4(),
            code: "SAVE".into(),
            name: "Save".into(),
            kind,
            value,
            min_order_amount: None,
            max_uses: None,
            used_count: 0,
            starts_at: now - Duration::days(1),
            ends_at: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_percentage_rounds_half_up() {
        let p = promo(PromotionKind::Percentage, dec!(15));
        // 15% of 33.30 = 4.995
        assert_eq!(p.discount_for(dec!(33.30)), dec!(5.00));
    }

    #[test]
    fn test_fixed_is_capped_at_subtotal() {
        let p = promo(PromotionKind::FixedAmount, dec!(25));
        assert_eq!(p.discount_for(dec!(10)), dec!(10));
        assert_eq!(p.discount_for(dec!(40)), dec!(25));
    }

    #[test]
    fn test_value_ranges() {
        assert!(PromotionKind::Percentage.validate_value(dec!(0)).is_err());
        assert!(PromotionKind::Percentage.validate_value(dec!(100)).is_ok());
        assert!(PromotionKind::Percentage.validate_value(dec!(100.01)).is_err());
        assert!(PromotionKind::FixedAmount.validate_value(dec!(-1)).is_err());
        assert!(PromotionKind::FixedAmount.validate_value(dec!(0.01)).is_ok());
    }

    #[test]
    fn test_window_is_half_open() {
        let now = Utc::now();
        let mut p = promo(PromotionKind::Percentage, dec!(10));
        p.starts_at = now;
        p.ends_at = Some(now + Duration::hours(1));
        assert!(p.check_applicable(dec!(10), now).is_ok());
        assert!(p.check_applicable(dec!(10), now + Duration::hours(1)).is_err());
        assert!(p.check_applicable(dec!(10), now - Duration::seconds(1)).is_err());
    }

    #[test]
    fn test_usage_limit_and_minimum() {
        let now = Utc::now();
        let mut p = promo(PromotionKind::FixedAmount, dec!(5));
        p.max_uses = Some(2);
        p.used_count = 2;
        assert!(p.check_applicable(dec!(50), now).is_err());

        p.used_count = 1;
        p.min_order_amount = Some(dec!(30));
        assert!(p.check_applicable(dec!(29.99), now).is_err());
        assert!(p.check_applicable(dec!(30), now).is_ok());
    }

    #[test]
    fn test_inactive_rejected() {
        let mut p = promo(PromotionKind::FixedAmount, dec!(5));
        p.is_active = false;
        assert!(p.check_applicable(dec!(50), Utc::now()).is_err());
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code(" summer-10 ").unwrap(), "SUMMER-10");
        assert!(normalize_code("").is_err());
        assert!(normalize_code("50% OFF").is_err());
    }

    #[test]
    fn test_window_validation() {
        let now = Utc::now();
        assert!(validate_window(now, Some(now)).is_err());
        assert!(validate_window(now, None).is_ok());
    }
}
