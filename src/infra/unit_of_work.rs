//! Unit of Work pattern implementation.
//!
//! Centralizes access to the pooled repositories and runs multi-step
//! workflows (order placement, status changes, stock moves) inside one
//! database transaction that commits on `Ok` and rolls back on `Err`.

use async_trait::async_trait;
use sea_orm::{
    AccessMode, DatabaseConnection, DatabaseTransaction, IsolationLevel, TransactionTrait,
};
use std::sync::Arc;

use super::repositories::{
    MessageRepository, MessageStore, OrderRepository, OrderStore, ProductRepository, ProductStore,
    PromotionRepository, PromotionStore, StockRepository, StockStore, StoreRepository, StoreStore,
    TxOrderRepository, TxProductRepository, TxPromotionRepository, TxStockRepository,
    TxStoreRepository, TxUserRepository, TxWarehouseRepository, UserRepository, UserStore,
    WarehouseRepository, WarehouseStore,
};
use crate::errors::{AppError, AppResult};

/// Unit of Work trait for dependency injection.
///
/// Note: This trait is not object safe due to the generic transaction
/// methods. Services are generic over it; tests supply their own
/// implementation backed by mocked repositories.
#[async_trait]
pub trait UnitOfWork: Send + Sync + 'static {
    fn users(&self) -> Arc<dyn UserRepository>;
    fn stores(&self) -> Arc<dyn StoreRepository>;
    fn warehouses(&self) -> Arc<dyn WarehouseRepository>;
    fn products(&self) -> Arc<dyn ProductRepository>;
    fn stock(&self) -> Arc<dyn StockRepository>;
    fn orders(&self) -> Arc<dyn OrderRepository>;
    fn promotions(&self) -> Arc<dyn PromotionRepository>;
    fn messages(&self) -> Arc<dyn MessageRepository>;

    /// Execute a closure within a transaction.
    ///
    /// The transaction is automatically committed on success or rolled back on error.
    /// Row locks taken through the context are held until then.
    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> std::pin::Pin<
                Box<dyn std::future::Future<Output = AppResult<T>> + Send + 'a>,
            > + Send,
        T: Send;
}

/// Transaction context providing repository access within a transaction.
///
/// All repository operations performed through this context are part
/// of the same database transaction.
pub struct TransactionContext<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TransactionContext<'a> {
    fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    pub fn users(&self) -> TxUserRepository<'_> {
        TxUserRepository::new(self.txn)
    }

    pub fn stores(&self) -> TxStoreRepository<'_> {
        TxStoreRepository::new(self.txn)
    }

    pub fn warehouses(&self) -> TxWarehouseRepository<'_> {
        TxWarehouseRepository::new(self.txn)
    }

    pub fn products(&self) -> TxProductRepository<'_> {
        TxProductRepository::new(self.txn)
    }

    pub fn stock(&self) -> TxStockRepository<'_> {
        TxStockRepository::new(self.txn)
    }

    pub fn orders(&self) -> TxOrderRepository<'_> {
        TxOrderRepository::new(self.txn)
    }

    pub fn promotions(&self) -> TxPromotionRepository<'_> {
        TxPromotionRepository::new(self.txn)
    }
}

/// Concrete implementation of UnitOfWork
pub struct Persistence {
    db: DatabaseConnection,
    user_repo: Arc<UserStore>,
    store_repo: Arc<StoreStore>,
    warehouse_repo: Arc<WarehouseStore>,
    product_repo: Arc<ProductStore>,
    stock_repo: Arc<StockStore>,
    order_repo: Arc<OrderStore>,
    promotion_repo: Arc<PromotionStore>,
    message_repo: Arc<MessageStore>,
}

impl Persistence {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            user_repo: Arc::new(UserStore::new(db.clone())),
            store_repo: Arc::new(StoreStore::new(db.clone())),
            warehouse_repo: Arc::new(WarehouseStore::new(db.clone())),
            product_repo: Arc::new(ProductStore::new(db.clone())),
            stock_repo: Arc::new(StockStore::new(db.clone())),
            order_repo: Arc::new(OrderStore::new(db.clone())),
            promotion_repo: Arc::new(PromotionStore::new(db.clone())),
            message_repo: Arc::new(MessageStore::new(db.clone())),
            db,
        }
    }
}

#[async_trait]
impl UnitOfWork for Persistence {
    fn users(&self) -> Arc<dyn UserRepository> {
        self.user_repo.clone()
    }

    fn stores(&self) -> Arc<dyn StoreRepository> {
        self.store_repo.clone()
    }

    fn warehouses(&self) -> Arc<dyn WarehouseRepository> {
        self.warehouse_repo.clone()
    }

    fn products(&self) -> Arc<dyn ProductRepository> {
        self.product_repo.clone()
    }

    fn stock(&self) -> Arc<dyn StockRepository> {
        self.stock_repo.clone()
    }

    fn orders(&self) -> Arc<dyn OrderRepository> {
        self.order_repo.clone()
    }

    fn promotions(&self) -> Arc<dyn PromotionRepository> {
        self.promotion_repo.clone()
    }

    fn messages(&self) -> Arc<dyn MessageRepository> {
        self.message_repo.clone()
    }

    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> std::pin::Pin<
                Box<dyn std::future::Future<Output = AppResult<T>> + Send + 'a>,
            > + Send,
        T: Send,
    {
        // ReadCommitted is enough: stock rows are locked explicitly
        let txn = self
            .db
            .begin_with_config(
                Some(IsolationLevel::ReadCommitted),
                Some(AccessMode::ReadWrite),
            )
            .await
            .map_err(AppError::from)?;

        let ctx = TransactionContext::new(&txn);

        match f(ctx).await {
            Ok(result) => {
                txn.commit().await.map_err(AppError::from)?;
                Ok(result)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::error!("Transaction rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }
}

/// Simpler API for executing transactional operations.
///
/// This helper macro reduces boilerplate when using transactions.
#[macro_export]
macro_rules! with_transaction {
    ($uow:expr, |$ctx:ident| $body:expr) => {
        $uow.transaction(|$ctx| Box::pin(async move { $body })).await
    };
}
