//! Product catalogue repository.

use async_trait::async_trait;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DatabaseTransaction,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use super::entities::order_item::{self, Entity as OrderItemEntity};
use super::entities::product::{self, ActiveModel, Entity as ProductEntity};
use crate::domain::{NewProduct, Product, ProductChanges, ProductFilter, ProductStatus};
use crate::errors::{AppError, AppResult};
use crate::types::PaginationParams;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Product repository. Every query is scoped to a store.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_by_id(&self, store_id: Uuid, id: Uuid) -> AppResult<Option<Product>>;

    async fn find_by_sku(&self, store_id: Uuid, sku: &str) -> AppResult<Option<Product>>;

    async fn find_by_barcode(&self, store_id: Uuid, barcode: &str) -> AppResult<Option<Product>>;

    /// Filtered page plus total count
    async fn list(
        &self,
        store_id: Uuid,
        filter: ProductFilter,
        pagination: PaginationParams,
    ) -> AppResult<(Vec<Product>, u64)>;

    /// All non-archived products ordered by SKU
    async fn list_for_export(&self, store_id: Uuid) -> AppResult<Vec<Product>>;

    /// Active products at or below their threshold, lowest stock first
    async fn list_low_stock(&self, store_id: Uuid) -> AppResult<Vec<Product>>;

    async fn count_low_stock(&self, store_id: Uuid) -> AppResult<u64>;

    async fn create(&self, store_id: Uuid, product: NewProduct) -> AppResult<Product>;

    async fn update(&self, store_id: Uuid, id: Uuid, changes: ProductChanges)
        -> AppResult<Product>;
}

pub struct ProductStore {
    db: DatabaseConnection,
}

impl ProductStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProductRepository for ProductStore {
    async fn find_by_id(&self, store_id: Uuid, id: Uuid) -> AppResult<Option<Product>> {
        let result = ProductEntity::find_by_id(id)
            .filter(product::Column::StoreId.eq(store_id))
            .one(&self.db)
            .await?;

        result.map(Product::try_from).transpose()
    }

    async fn find_by_sku(&self, store_id: Uuid, sku: &str) -> AppResult<Option<Product>> {
        let result = ProductEntity::find()
            .filter(product::Column::StoreId.eq(store_id))
            .filter(product::Column::Sku.eq(sku))
            .one(&self.db)
            .await?;

        result.map(Product::try_from).transpose()
    }

    async fn find_by_barcode(&self, store_id: Uuid, barcode: &str) -> AppResult<Option<Product>> {
        let result = ProductEntity::find()
            .filter(product::Column::StoreId.eq(store_id))
            .filter(product::Column::Barcode.eq(barcode))
            .one(&self.db)
            .await?;

        result.map(Product::try_from).transpose()
    }

    async fn list(
        &self,
        store_id: Uuid,
        filter: ProductFilter,
        pagination: PaginationParams,
    ) -> AppResult<(Vec<Product>, u64)> {
        let mut query = ProductEntity::find().filter(product::Column::StoreId.eq(store_id));

        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", search.to_lowercase());
            let lower = |col: product::Column| Expr::expr(Func::lower(Expr::col(col)));
            query = query.filter(
                Condition::any()
                    .add(lower(product::Column::Name).like(pattern.as_str()))
                    .add(lower(product::Column::Sku).like(pattern.as_str()))
                    .add(product::Column::Barcode.eq(search)),
            );
        }
        if let Some(status) = filter.status {
            query = query.filter(product::Column::Status.eq(status.as_str()));
        }
        if let Some(category) = filter.category {
            query = query.filter(product::Column::Category.eq(category));
        }
        if filter.low_stock {
            query = query.filter(
                Expr::col(product::Column::StockQuantity)
                    .lte(Expr::col(product::Column::LowStockThreshold)),
            );
        }

        let paginator = query
            .order_by_asc(product::Column::Name)
            .paginate(&self.db, pagination.limit());
        let total = paginator.num_items().await?;
        let models = paginator.fetch_page(pagination.page.saturating_sub(1)).await?;

        let products = models
            .into_iter()
            .map(Product::try_from)
            .collect::<AppResult<Vec<_>>>()?;
        Ok((products, total))
    }

    async fn list_for_export(&self, store_id: Uuid) -> AppResult<Vec<Product>> {
        let models = ProductEntity::find()
            .filter(product::Column::StoreId.eq(store_id))
            .filter(product::Column::Status.ne(ProductStatus::Archived.as_str()))
            .order_by_asc(product::Column::Sku)
            .all(&self.db)
            .await?;

        models.into_iter().map(Product::try_from).collect()
    }

    async fn list_low_stock(&self, store_id: Uuid) -> AppResult<Vec<Product>> {
        let models = low_stock_query(store_id)
            .order_by_asc(product::Column::StockQuantity)
            .all(&self.db)
            .await?;

        models.into_iter().map(Product::try_from).collect()
    }

    async fn count_low_stock(&self, store_id: Uuid) -> AppResult<u64> {
        low_stock_query(store_id)
            .count(&self.db)
            .await
            .map_err(AppError::from)
    }

    async fn create(&self, store_id: Uuid, product: NewProduct) -> AppResult<Product> {
        let now = chrono::Utc::now();
        let active_model = ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(store_id),
            sku: Set(product.sku),
            barcode: Set(product.barcode),
            name: Set(product.name),
            description: Set(product.description),
            category: Set(product.category),
            price: Set(product.price),
            cost_price: Set(product.cost_price),
            stock_quantity: Set(0),
            low_stock_threshold: Set(product.low_stock_threshold),
            status: Set(product.status.as_str().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = active_model.insert(&self.db).await?;
        Product::try_from(model)
    }

    async fn update(
        &self,
        store_id: Uuid,
        id: Uuid,
        changes: ProductChanges,
    ) -> AppResult<Product> {
        let model = ProductEntity::find_by_id(id)
            .filter(product::Column::StoreId.eq(store_id))
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut active: ActiveModel = model.into();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(barcode) = changes.barcode {
            active.barcode = Set(Some(barcode));
        }
        if let Some(description) = changes.description {
            active.description = Set(Some(description));
        }
        if let Some(category) = changes.category {
            active.category = Set(Some(category));
        }
        if let Some(price) = changes.price {
            active.price = Set(price);
        }
        if let Some(cost_price) = changes.cost_price {
            active.cost_price = Set(Some(cost_price));
        }
        if let Some(threshold) = changes.low_stock_threshold {
            active.low_stock_threshold = Set(threshold);
        }
        if let Some(status) = changes.status {
            active.status = Set(status.as_str().to_string());
        }
        active.updated_at = Set(chrono::Utc::now());

        let model = active.update(&self.db).await?;
        Product::try_from(model)
    }
}

/// Transaction-aware product repository. Reads take row locks.
pub struct TxProductRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TxProductRepository<'a> {
    pub(crate) fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    /// Load and lock one product (`SELECT ... FOR UPDATE`).
    pub async fn lock(&self, store_id: Uuid, id: Uuid) -> AppResult<Option<Product>> {
        let result = ProductEntity::find_by_id(id)
            .filter(product::Column::StoreId.eq(store_id))
            .lock_exclusive()
            .one(self.txn)
            .await?;

        result.map(Product::try_from).transpose()
    }

    /// Load and lock several products in id order.
    pub async fn lock_many(&self, store_id: Uuid, ids: Vec<Uuid>) -> AppResult<Vec<Product>> {
        let models = ProductEntity::find()
            .filter(product::Column::StoreId.eq(store_id))
            .filter(product::Column::Id.is_in(ids))
            .order_by_asc(product::Column::Id)
            .lock_exclusive()
            .all(self.txn)
            .await?;

        models.into_iter().map(Product::try_from).collect()
    }

    /// `(id, sku, stock_quantity)` for every product of the store, locked.
    pub async fn lock_totals(&self, store_id: Uuid) -> AppResult<Vec<(Uuid, String, i32)>> {
        let models = ProductEntity::find()
            .filter(product::Column::StoreId.eq(store_id))
            .order_by_asc(product::Column::Id)
            .lock_exclusive()
            .all(self.txn)
            .await?;

        Ok(models
            .into_iter()
            .map(|m| (m.id, m.sku, m.stock_quantity))
            .collect())
    }

    pub async fn set_stock_quantity(&self, id: Uuid, quantity: i32) -> AppResult<()> {
        ProductEntity::update_many()
            .col_expr(product::Column::StockQuantity, Expr::value(quantity))
            .col_expr(product::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
            .filter(product::Column::Id.eq(id))
            .exec(self.txn)
            .await?;
        Ok(())
    }

    /// Whether any order line references the product
    pub async fn has_orders(&self, id: Uuid) -> AppResult<bool> {
        let count = OrderItemEntity::find()
            .filter(order_item::Column::ProductId.eq(id))
            .count(self.txn)
            .await?;
        Ok(count > 0)
    }

    /// Hard delete; levels and ledger rows cascade.
    pub async fn delete(&self, store_id: Uuid, id: Uuid) -> AppResult<()> {
        let result = ProductEntity::delete_many()
            .filter(product::Column::Id.eq(id))
            .filter(product::Column::StoreId.eq(store_id))
            .exec(self.txn)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}

fn low_stock_query(store_id: Uuid) -> sea_orm::Select<ProductEntity> {
    ProductEntity::find()
        .filter(product::Column::StoreId.eq(store_id))
        .filter(product::Column::Status.eq(ProductStatus::Active.as_str()))
        .filter(
            Expr::col(product::Column::StockQuantity)
                .lte(Expr::col(product::Column::LowStockThreshold)),
        )
}
