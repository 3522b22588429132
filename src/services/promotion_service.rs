//! Promotion service - Discount codes and their lifecycle.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::promotion::{normalize_code, validate_window};
use crate::domain::{DiscountPreview, NewPromotion, Promotion, PromotionChanges};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::UnitOfWork;
use crate::types::PaginationParams;

#[async_trait]
pub trait PromotionService: Send + Sync {
    async fn create(&self, store_id: Uuid, promotion: NewPromotion) -> AppResult<Promotion>;

    async fn list(
        &self,
        store_id: Uuid,
        pagination: PaginationParams,
    ) -> AppResult<(Vec<Promotion>, u64)>;

    async fn get(&self, store_id: Uuid, id: Uuid) -> AppResult<Promotion>;

    async fn update(
        &self,
        store_id: Uuid,
        id: Uuid,
        changes: PromotionChanges,
    ) -> AppResult<Promotion>;

    async fn set_active(&self, store_id: Uuid, id: Uuid, active: bool) -> AppResult<Promotion>;

    /// Only promotions that were never used can be deleted
    async fn delete(&self, store_id: Uuid, id: Uuid) -> AppResult<()>;

    /// Price `subtotal` against `code` without consuming a use
    async fn preview(&self, store_id: Uuid, code: &str, subtotal: Decimal)
        -> AppResult<DiscountPreview>;
}

pub struct PromotionManager<U: UnitOfWork> {
    uow: Arc<U>,
}

impl<U: UnitOfWork> PromotionManager<U> {
    pub fn new(uow: Arc<U>) -> Self {
        Self { uow }
    }
}

fn validate_max_uses(max_uses: Option<i32>) -> AppResult<()> {
    match max_uses {
        Some(max) if max < 1 => Err(AppError::validation("max_uses must be at least 1")),
        _ => Ok(()),
    }
}

fn validate_min_amount(min: Option<Decimal>) -> AppResult<()> {
    match min {
        Some(min) if min.is_sign_negative() => Err(AppError::validation(
            "Minimum order amount must not be negative",
        )),
        _ => Ok(()),
    }
}

#[async_trait]
impl<U: UnitOfWork> PromotionService for PromotionManager<U> {
    async fn create(&self, store_id: Uuid, mut promotion: NewPromotion) -> AppResult<Promotion> {
        promotion.code = normalize_code(&promotion.code)?;
        promotion.kind.validate_value(promotion.value)?;
        validate_window(promotion.starts_at, promotion.ends_at)?;
        validate_max_uses(promotion.max_uses)?;
        validate_min_amount(promotion.min_order_amount)?;

        let repo = self.uow.promotions();
        if repo
            .find_by_code(store_id, &promotion.code)
            .await?
            .is_some()
        {
            return Err(AppError::conflict("Promotion code"));
        }

        let created = repo.create(store_id, promotion).await?;
        tracing::info!(store_id = %store_id, code = %created.code, "Promotion created");
        Ok(created)
    }

    async fn list(
        &self,
        store_id: Uuid,
        pagination: PaginationParams,
    ) -> AppResult<(Vec<Promotion>, u64)> {
        self.uow.promotions().list(store_id, pagination).await
    }

    async fn get(&self, store_id: Uuid, id: Uuid) -> AppResult<Promotion> {
        self.uow
            .promotions()
            .find_by_id(store_id, id)
            .await?
            .ok_or_not_found()
    }

    async fn update(
        &self,
        store_id: Uuid,
        id: Uuid,
        changes: PromotionChanges,
    ) -> AppResult<Promotion> {
        let current = self.get(store_id, id).await?;

        if let Some(value) = changes.value {
            current.kind.validate_value(value)?;
        }
        validate_window(
            changes.starts_at.unwrap_or(current.starts_at),
            changes.ends_at.or(current.ends_at),
        )?;
        validate_max_uses(changes.max_uses)?;
        validate_min_amount(changes.min_order_amount)?;
        if changes.max_uses.is_some_and(|max| max < current.used_count) {
            return Err(AppError::validation(
                "max_uses cannot be lower than the current usage",
            ));
        }

        self.uow.promotions().update(store_id, id, changes).await
    }

    async fn set_active(&self, store_id: Uuid, id: Uuid, active: bool) -> AppResult<Promotion> {
        let promotion = self
            .uow
            .promotions()
            .set_active(store_id, id, active)
            .await?;
        tracing::info!(store_id = %store_id, code = %promotion.code, active, "Promotion toggled");
        Ok(promotion)
    }

    async fn delete(&self, store_id: Uuid, id: Uuid) -> AppResult<()> {
        let promotion = self.get(store_id, id).await?;
        let repo = self.uow.promotions();

        if promotion.used_count > 0 || repo.is_referenced(id).await? {
            return Err(AppError::invalid_state(
                "Promotion has been used; deactivate it instead",
            ));
        }

        repo.delete(store_id, id).await?;
        tracing::info!(store_id = %store_id, code = %promotion.code, "Promotion deleted");
        Ok(())
    }

    async fn preview(
        &self,
        store_id: Uuid,
        code: &str,
        subtotal: Decimal,
    ) -> AppResult<DiscountPreview> {
        if subtotal.is_sign_negative() {
            return Err(AppError::validation("Subtotal must not be negative"));
        }
        let code = normalize_code(code)?;
        let promotion = self
            .uow
            .promotions()
            .find_by_code(store_id, &code)
            .await?
            .ok_or_not_found()?;

        promotion.check_applicable(subtotal, Utc::now())?;
        let discount = promotion.discount_for(subtotal);

        Ok(DiscountPreview {
            code: promotion.code,
            subtotal,
            discount,
            total: subtotal - discount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PromotionKind;
    use crate::infra::repositories::MockPromotionRepository;
    use crate::services::test_support::TestUow;
    use chrono::Duration;
    use mockall::predicate::eq;
    use rust_decimal_macros::dec;

    fn promotion(kind: PromotionKind, value: Decimal, used: i32) -> Promotion {
        let now = Utc::now();
        Promotion {
            id: Uuid::new_v4(),
            store_id: Uuid::new_v4(),
            code: "SUMMER10".into(),
            name: "Summer".into(),
            kind,
            value,
            min_order_amount: None,
            max_uses: None,
            used_count: used,
            starts_at: now - Duration::days(1),
            ends_at: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn new_promotion(code: &str, kind: PromotionKind, value: Decimal) -> NewPromotion {
        NewPromotion {
            code: code.into(),
            name: "Promo".into(),
            kind,
            value,
            min_order_amount: None,
            max_uses: None,
            starts_at: Utc::now(),
            ends_at: None,
            is_active: true,
        }
    }

    fn manager(repo: MockPromotionRepository) -> PromotionManager<TestUow> {
        PromotionManager::new(Arc::new(TestUow {
            promotions: Arc::new(repo),
            ..Default::default()
        }))
    }

    #[tokio::test]
    async fn test_create_normalizes_code() {
        let mut repo = MockPromotionRepository::new();
        repo.expect_find_by_code()
            .with(mockall::predicate::always(), eq("SUMMER10"))
            .returning(|_, _| Ok(None));
        repo.expect_create()
            .withf(|_, p| p.code == "SUMMER10")
            .returning(|_, p| Ok(promotion(p.kind, p.value, 0)));

        let created = manager(repo)
            .create(
                Uuid::new_v4(),
                new_promotion(" summer10 ", PromotionKind::Percentage, dec!(10)),
            )
            .await
            .unwrap();
        assert_eq!(created.code, "SUMMER10");
    }

    #[tokio::test]
    async fn test_create_duplicate_code_conflicts() {
        let mut repo = MockPromotionRepository::new();
        repo.expect_find_by_code()
            .returning(|_, _| Ok(Some(promotion(PromotionKind::Percentage, dec!(10), 0))));

        let result = manager(repo)
            .create(
                Uuid::new_v4(),
                new_promotion("SUMMER10", PromotionKind::Percentage, dec!(10)),
            )
            .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_out_of_range_percentage() {
        let result = manager(MockPromotionRepository::new())
            .create(
                Uuid::new_v4(),
                new_promotion("BIG", PromotionKind::Percentage, dec!(150)),
            )
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_delete_used_promotion_rejected() {
        let mut repo = MockPromotionRepository::new();
        repo.expect_find_by_id()
            .returning(|_, _| Ok(Some(promotion(PromotionKind::FixedAmount, dec!(5), 3))));
        repo.expect_delete().never();

        let result = manager(repo).delete(Uuid::new_v4(), Uuid::new_v4()).await;
        assert!(matches!(result, Err(AppError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_delete_unused_promotion() {
        let mut repo = MockPromotionRepository::new();
        repo.expect_find_by_id()
            .returning(|_, _| Ok(Some(promotion(PromotionKind::FixedAmount, dec!(5), 0))));
        repo.expect_is_referenced().returning(|_| Ok(false));
        repo.expect_delete().times(1).returning(|_, _| Ok(()));

        assert!(manager(repo)
            .delete(Uuid::new_v4(), Uuid::new_v4())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_preview_percentage() {
        let mut repo = MockPromotionRepository::new();
        repo.expect_find_by_code()
            .returning(|_, _| Ok(Some(promotion(PromotionKind::Percentage, dec!(15), 0))));

        let preview = manager(repo)
            .preview(Uuid::new_v4(), "summer10", dec!(33.33))
            .await
            .unwrap();
        assert_eq!(preview.discount, dec!(5.00));
        assert_eq!(preview.total, dec!(28.33));
    }

    #[tokio::test]
    async fn test_preview_fixed_capped_at_subtotal() {
        let mut repo = MockPromotionRepository::new();
        repo.expect_find_by_code()
            .returning(|_, _| Ok(Some(promotion(PromotionKind::FixedAmount, dec!(20), 0))));

        let preview = manager(repo)
            .preview(Uuid::new_v4(), "SUMMER10", dec!(12))
            .await
            .unwrap();
        assert_eq!(preview.discount, dec!(12));
        assert_eq!(preview.total, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_update_cannot_undercut_usage() {
        let mut repo = MockPromotionRepository::new();
        repo.expect_find_by_id()
            .returning(|_, _| Ok(Some(promotion(PromotionKind::Percentage, dec!(10), 5))));
        repo.expect_update().never();

        let result = manager(repo)
            .update(
                Uuid::new_v4(),
                Uuid::new_v4(),
                PromotionChanges {
                    max_uses: Some(3),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
