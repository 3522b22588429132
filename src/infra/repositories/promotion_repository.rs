//! Promotion repository.

use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use super::entities::order::{self, Entity as OrderEntity};
use super::entities::promotion::{self, ActiveModel, Entity as PromotionEntity};
use crate::domain::{NewPromotion, Promotion, PromotionChanges};
use crate::errors::{AppError, AppResult};
use crate::types::PaginationParams;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Promotion repository. Every query is scoped to a store.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait PromotionRepository: Send + Sync {
    async fn find_by_id(&self, store_id: Uuid, id: Uuid) -> AppResult<Option<Promotion>>;

    /// Lookup by normalized (upper-case) code
    async fn find_by_code(&self, store_id: Uuid, code: &str) -> AppResult<Option<Promotion>>;

    /// Newest first
    async fn list(
        &self,
        store_id: Uuid,
        pagination: PaginationParams,
    ) -> AppResult<(Vec<Promotion>, u64)>;

    async fn create(&self, store_id: Uuid, promotion: NewPromotion) -> AppResult<Promotion>;

    async fn update(
        &self,
        store_id: Uuid,
        id: Uuid,
        changes: PromotionChanges,
    ) -> AppResult<Promotion>;

    async fn set_active(&self, store_id: Uuid, id: Uuid, active: bool) -> AppResult<Promotion>;

    /// Whether any order was placed with the promotion
    async fn is_referenced(&self, id: Uuid) -> AppResult<bool>;

    async fn delete(&self, store_id: Uuid, id: Uuid) -> AppResult<()>;
}

pub struct PromotionStore {
    db: DatabaseConnection,
}

impl PromotionStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find_model(&self, store_id: Uuid, id: Uuid) -> AppResult<promotion::Model> {
        PromotionEntity::find_by_id(id)
            .filter(promotion::Column::StoreId.eq(store_id))
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }
}

#[async_trait]
impl PromotionRepository for PromotionStore {
    async fn find_by_id(&self, store_id: Uuid, id: Uuid) -> AppResult<Option<Promotion>> {
        let result = PromotionEntity::find_by_id(id)
            .filter(promotion::Column::StoreId.eq(store_id))
            .one(&self.db)
            .await?;

        result.map(Promotion::try_from).transpose()
    }

    async fn find_by_code(&self, store_id: Uuid, code: &str) -> AppResult<Option<Promotion>> {
        let result = PromotionEntity::find()
            .filter(promotion::Column::StoreId.eq(store_id))
            .filter(promotion::Column::Code.eq(code))
            .one(&self.db)
            .await?;

        result.map(Promotion::try_from).transpose()
    }

    async fn list(
        &self,
        store_id: Uuid,
        pagination: PaginationParams,
    ) -> AppResult<(Vec<Promotion>, u64)> {
        let paginator = PromotionEntity::find()
            .filter(promotion::Column::StoreId.eq(store_id))
            .order_by_desc(promotion::Column::CreatedAt)
            .paginate(&self.db, pagination.limit());
        let total = paginator.num_items().await?;
        let models = paginator.fetch_page(pagination.page.saturating_sub(1)).await?;

        let promotions = models
            .into_iter()
            .map(Promotion::try_from)
            .collect::<AppResult<Vec<_>>>()?;
        Ok((promotions, total))
    }

    async fn create(&self, store_id: Uuid, promotion: NewPromotion) -> AppResult<Promotion> {
        let now = chrono::Utc::now();
        let active_model = ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(store_id),
            code: Set(promotion.code),
            name: Set(promotion.name),
            kind: Set(promotion.kind.as_str().to_string()),
            value: Set(promotion.value),
            min_order_amount: Set(promotion.min_order_amount),
            max_uses: Set(promotion.max_uses),
            used_count: Set(0),
            starts_at: Set(promotion.starts_at),
            ends_at: Set(promotion.ends_at),
            is_active: Set(promotion.is_active),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = active_model.insert(&self.db).await?;
        Promotion::try_from(model)
    }

    async fn update(
        &self,
        store_id: Uuid,
        id: Uuid,
        changes: PromotionChanges,
    ) -> AppResult<Promotion> {
        let mut active: ActiveModel = self.find_model(store_id, id).await?.into();

        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(value) = changes.value {
            active.value = Set(value);
        }
        if let Some(min) = changes.min_order_amount {
            active.min_order_amount = Set(Some(min));
        }
        if let Some(max) = changes.max_uses {
            active.max_uses = Set(Some(max));
        }
        if let Some(starts_at) = changes.starts_at {
            active.starts_at = Set(starts_at);
        }
        if let Some(ends_at) = changes.ends_at {
            active.ends_at = Set(Some(ends_at));
        }
        active.updated_at = Set(chrono::Utc::now());

        let model = active.update(&self.db).await?;
        Promotion::try_from(model)
    }

    async fn set_active(&self, store_id: Uuid, id: Uuid, is_active: bool) -> AppResult<Promotion> {
        let mut active: ActiveModel = self.find_model(store_id, id).await?.into();
        active.is_active = Set(is_active);
        active.updated_at = Set(chrono::Utc::now());

        let model = active.update(&self.db).await?;
        Promotion::try_from(model)
    }

    async fn is_referenced(&self, id: Uuid) -> AppResult<bool> {
        let count = OrderEntity::find()
            .filter(order::Column::PromotionId.eq(id))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn delete(&self, store_id: Uuid, id: Uuid) -> AppResult<()> {
        let result = PromotionEntity::delete_many()
            .filter(promotion::Column::Id.eq(id))
            .filter(promotion::Column::StoreId.eq(store_id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}

/// Transaction-aware promotion repository.
pub struct TxPromotionRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TxPromotionRepository<'a> {
    pub(crate) fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    /// Load and lock a promotion by code.
    pub async fn lock_by_code(&self, store_id: Uuid, code: &str) -> AppResult<Option<Promotion>> {
        let result = PromotionEntity::find()
            .filter(promotion::Column::StoreId.eq(store_id))
            .filter(promotion::Column::Code.eq(code))
            .lock_exclusive()
            .one(self.txn)
            .await?;

        result.map(Promotion::try_from).transpose()
    }

    pub async fn increment_use(&self, id: Uuid) -> AppResult<()> {
        self.shift_use(id, Expr::col(promotion::Column::UsedCount).add(1))
            .await
    }

    /// Give back one use; never drops below zero.
    pub async fn release_use(&self, id: Uuid) -> AppResult<()> {
        self.shift_use(
            id,
            Expr::cust_with_exprs(
                "GREATEST($1 - 1, 0)",
                [Expr::col(promotion::Column::UsedCount).into()],
            ),
        )
        .await
    }

    async fn shift_use(&self, id: Uuid, value: sea_orm::sea_query::SimpleExpr) -> AppResult<()> {
        PromotionEntity::update_many()
            .col_expr(promotion::Column::UsedCount, value)
            .col_expr(promotion::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
            .filter(promotion::Column::Id.eq(id))
            .exec(self.txn)
            .await?;
        Ok(())
    }
}
