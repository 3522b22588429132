//! Unit of Work double for service unit tests.
//!
//! Pooled repositories are mockall mocks; `transaction` always fails. The
//! transactional paths run against a mock database in `ledger_flows`.

use async_trait::async_trait;
use std::sync::Arc;

use crate::errors::{AppError, AppResult};
use crate::infra::repositories::{
    MessageRepository, MockMessageRepository, MockOrderRepository, MockProductRepository,
    MockPromotionRepository, MockStockRepository, MockStoreRepository, MockUserRepository,
    MockWarehouseRepository, OrderRepository, ProductRepository, PromotionRepository,
    StockRepository, StoreRepository, UserRepository, WarehouseRepository,
};
use crate::infra::{TransactionContext, UnitOfWork};

pub(crate) struct TestUow {
    pub users: Arc<MockUserRepository>,
    pub stores: Arc<MockStoreRepository>,
    pub warehouses: Arc<MockWarehouseRepository>,
    pub products: Arc<MockProductRepository>,
    pub stock: Arc<MockStockRepository>,
    pub orders: Arc<MockOrderRepository>,
    pub promotions: Arc<MockPromotionRepository>,
    pub messages: Arc<MockMessageRepository>,
}

impl Default for TestUow {
    fn default() -> Self {
        Self {
            users: Arc::new(MockUserRepository::new()),
            stores: Arc::new(MockStoreRepository::new()),
            warehouses: Arc::new(MockWarehouseRepository::new()),
            products: Arc::new(MockProductRepository::new()),
            stock: Arc::new(MockStockRepository::new()),
            orders: Arc::new(MockOrderRepository::new()),
            promotions: Arc::new(MockPromotionRepository::new()),
            messages: Arc::new(MockMessageRepository::new()),
        }
    }
}

#[async_trait]
impl UnitOfWork for TestUow {
    fn users(&self) -> Arc<dyn UserRepository> {
        self.users.clone()
    }

    fn stores(&self) -> Arc<dyn StoreRepository> {
        self.stores.clone()
    }

    fn warehouses(&self) -> Arc<dyn WarehouseRepository> {
        self.warehouses.clone()
    }

    fn products(&self) -> Arc<dyn ProductRepository> {
        self.products.clone()
    }

    fn stock(&self) -> Arc<dyn StockRepository> {
        self.stock.clone()
    }

    fn orders(&self) -> Arc<dyn OrderRepository> {
        self.orders.clone()
    }

    fn promotions(&self) -> Arc<dyn PromotionRepository> {
        self.promotions.clone()
    }

    fn messages(&self) -> Arc<dyn MessageRepository> {
        self.messages.clone()
    }

    async fn transaction<F, T>(&self, _f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> std::pin::Pin<
                Box<dyn std::future::Future<Output = AppResult<T>> + Send + 'a>,
            > + Send,
        T: Send,
    {
        Err(AppError::internal("transactions are unavailable in unit tests"))
    }
}
