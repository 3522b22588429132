//! Stock levels and the stock movement ledger.
//!
//! Writes only go through [`TxStockRepository::apply`], which locks the
//! level row, moves the product total by the same delta and appends the
//! ledger entry inside the caller's transaction.

use async_trait::async_trait;
use sea_orm::sea_query::{Alias, Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbBackend,
    EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    Statement,
};
use uuid::Uuid;

use super::entities::product::{self, Entity as ProductEntity};
use super::entities::stock_level::{self, Entity as StockLevelEntity};
use super::entities::stock_movement::{self, Entity as StockMovementEntity};
use crate::domain::inventory::{LatestBalance, LedgerTotal};
use crate::domain::{LedgerFilter, StockChange, StockLevel, StockMovement};
use crate::errors::{AppError, AppResult};
use crate::types::PaginationParams;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Read side of the stock ledger
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait StockRepository: Send + Sync {
    /// Levels of one product across warehouses
    async fn levels_for_product(&self, store_id: Uuid, product_id: Uuid)
        -> AppResult<Vec<StockLevel>>;

    /// Ledger page, newest first
    async fn ledger(
        &self,
        store_id: Uuid,
        filter: LedgerFilter,
        pagination: PaginationParams,
    ) -> AppResult<(Vec<StockMovement>, u64)>;
}

pub struct StockStore {
    db: DatabaseConnection,
}

impl StockStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl StockRepository for StockStore {
    async fn levels_for_product(
        &self,
        store_id: Uuid,
        product_id: Uuid,
    ) -> AppResult<Vec<StockLevel>> {
        let models = StockLevelEntity::find()
            .filter(stock_level::Column::StoreId.eq(store_id))
            .filter(stock_level::Column::ProductId.eq(product_id))
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(StockLevel::from).collect())
    }

    async fn ledger(
        &self,
        store_id: Uuid,
        filter: LedgerFilter,
        pagination: PaginationParams,
    ) -> AppResult<(Vec<StockMovement>, u64)> {
        let mut query =
            StockMovementEntity::find().filter(stock_movement::Column::StoreId.eq(store_id));

        if let Some(product_id) = filter.product_id {
            query = query.filter(stock_movement::Column::ProductId.eq(product_id));
        }
        if let Some(warehouse_id) = filter.warehouse_id {
            query = query.filter(stock_movement::Column::WarehouseId.eq(warehouse_id));
        }
        if let Some(kind) = filter.kind {
            query = query.filter(stock_movement::Column::Kind.eq(kind.as_str()));
        }
        if let Some(reference) = filter.reference {
            query = query.filter(stock_movement::Column::Reference.eq(reference));
        }

        let paginator = query
            .order_by_desc(stock_movement::Column::CreatedAt)
            .paginate(&self.db, pagination.limit());
        let total = paginator.num_items().await?;
        let models = paginator.fetch_page(pagination.page.saturating_sub(1)).await?;

        let movements = models
            .into_iter()
            .map(StockMovement::try_from)
            .collect::<AppResult<Vec<_>>>()?;
        Ok((movements, total))
    }
}

#[derive(Debug, FromQueryResult)]
struct LatestRow {
    product_id: Uuid,
    warehouse_id: Uuid,
    balance_after: i32,
}

/// Outcome of one applied stock change
#[derive(Debug, Clone)]
pub struct AppliedChange {
    pub movement: StockMovement,
    /// Product total across warehouses after the change
    pub product_total: i32,
}

/// Transaction-aware stock repository.
pub struct TxStockRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TxStockRepository<'a> {
    pub(crate) fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    /// Apply one change: lock the level, check the new balance, update level
    /// and product total, then append the ledger entry.
    ///
    /// `sku` is only used to label an insufficient-stock error.
    pub async fn apply(
        &self,
        store_id: Uuid,
        sku: &str,
        change: StockChange,
    ) -> AppResult<AppliedChange> {
        let level = self
            .lock_level(store_id, change.product_id, change.warehouse_id)
            .await?;

        let balance = change.apply_to(level.quantity).map_err(|e| match e {
            AppError::InsufficientStock {
                requested,
                available,
                ..
            } => AppError::InsufficientStock {
                sku: sku.to_string(),
                requested,
                available,
            },
            other => other,
        })?;

        let now = chrono::Utc::now();
        let mut active: stock_level::ActiveModel = level.into();
        active.quantity = Set(balance);
        active.updated_at = Set(now);
        active.update(self.txn).await?;

        ProductEntity::update_many()
            .col_expr(
                product::Column::StockQuantity,
                Expr::col(product::Column::StockQuantity).add(change.delta),
            )
            .col_expr(product::Column::UpdatedAt, Expr::value(now))
            .filter(product::Column::Id.eq(change.product_id))
            .exec(self.txn)
            .await?;

        let product_total: i32 = ProductEntity::find_by_id(change.product_id)
            .select_only()
            .column(product::Column::StockQuantity)
            .into_tuple()
            .one(self.txn)
            .await?
            .ok_or(AppError::NotFound)?;

        let movement = stock_movement::ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(store_id),
            product_id: Set(change.product_id),
            warehouse_id: Set(change.warehouse_id),
            delta: Set(change.delta),
            balance_after: Set(balance),
            kind: Set(change.kind.as_str().to_string()),
            reference: Set(change.reference),
            note: Set(change.note),
            created_by: Set(change.actor),
            created_at: Set(now),
        }
        .insert(self.txn)
        .await?;

        Ok(AppliedChange {
            movement: StockMovement::try_from(movement)?,
            product_total,
        })
    }

    /// Every level of the store, locked.
    pub async fn lock_levels(&self, store_id: Uuid) -> AppResult<Vec<StockLevel>> {
        let models = StockLevelEntity::find()
            .filter(stock_level::Column::StoreId.eq(store_id))
            .order_by_asc(stock_level::Column::ProductId)
            .order_by_asc(stock_level::Column::WarehouseId)
            .lock_exclusive()
            .all(self.txn)
            .await?;

        Ok(models.into_iter().map(StockLevel::from).collect())
    }

    /// Sum of ledger deltas per (product, warehouse)
    pub async fn ledger_totals(&self, store_id: Uuid) -> AppResult<Vec<LedgerTotal>> {
        let rows: Vec<(Uuid, Uuid, i64)> = StockMovementEntity::find()
            .select_only()
            .column(stock_movement::Column::ProductId)
            .column(stock_movement::Column::WarehouseId)
            .column_as(
                Expr::col(stock_movement::Column::Delta).sum().cast_as(Alias::new("bigint")),
                "delta_sum",
            )
            .filter(stock_movement::Column::StoreId.eq(store_id))
            .group_by(stock_movement::Column::ProductId)
            .group_by(stock_movement::Column::WarehouseId)
            .into_tuple()
            .all(self.txn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(product_id, warehouse_id, delta_sum)| LedgerTotal {
                product_id,
                warehouse_id,
                delta_sum,
            })
            .collect())
    }

    /// `balance_after` of the newest ledger entry per (product, warehouse)
    pub async fn latest_balances(&self, store_id: Uuid) -> AppResult<Vec<LatestBalance>> {
        let rows = LatestRow::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"SELECT DISTINCT ON (product_id, warehouse_id)
                   product_id, warehouse_id, balance_after
               FROM stock_movements
               WHERE store_id = $1
               ORDER BY product_id, warehouse_id, created_at DESC"#,
            [store_id.into()],
        ))
        .all(self.txn)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| LatestBalance {
                product_id: row.product_id,
                warehouse_id: row.warehouse_id,
                balance_after: row.balance_after,
            })
            .collect())
    }

    /// Whether a warehouse still holds any stock
    pub async fn warehouse_has_stock(&self, store_id: Uuid, warehouse_id: Uuid) -> AppResult<bool> {
        let count = StockLevelEntity::find()
            .filter(stock_level::Column::StoreId.eq(store_id))
            .filter(stock_level::Column::WarehouseId.eq(warehouse_id))
            .filter(stock_level::Column::Quantity.gt(0))
            .count(self.txn)
            .await?;
        Ok(count > 0)
    }

    /// Lock the level row, creating an empty one first if needed.
    async fn lock_level(
        &self,
        store_id: Uuid,
        product_id: Uuid,
        warehouse_id: Uuid,
    ) -> AppResult<stock_level::Model> {
        if let Some(level) = self.select_level(product_id, warehouse_id).await? {
            return Ok(level);
        }

        let empty = stock_level::ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(store_id),
            product_id: Set(product_id),
            warehouse_id: Set(warehouse_id),
            quantity: Set(0),
            updated_at: Set(chrono::Utc::now()),
        };
        StockLevelEntity::insert(empty)
            .on_conflict(
                OnConflict::columns([
                    stock_level::Column::ProductId,
                    stock_level::Column::WarehouseId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(self.txn)
            .await?;

        self.select_level(product_id, warehouse_id)
            .await?
            .ok_or_else(|| AppError::internal("Stock level vanished after insert"))
    }

    async fn select_level(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
    ) -> AppResult<Option<stock_level::Model>> {
        StockLevelEntity::find()
            .filter(stock_level::Column::ProductId.eq(product_id))
            .filter(stock_level::Column::WarehouseId.eq(warehouse_id))
            .lock_exclusive()
            .one(self.txn)
            .await
            .map_err(AppError::from)
    }
}
