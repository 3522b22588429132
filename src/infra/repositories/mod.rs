//! Repository layer - Data access abstraction
//!
//! Each aggregate has a pooled `*Store` behind a mockable trait and a
//! `Tx*Repository` that runs inside a Unit of Work transaction.

pub(crate) mod entities;
mod message_repository;
mod order_repository;
mod product_repository;
mod promotion_repository;
mod stock_repository;
mod store_repository;
mod user_repository;
mod warehouse_repository;

pub use message_repository::{MessageRepository, MessageStore};
pub use order_repository::{OrderRepository, OrderStore, TxOrderRepository};
pub use product_repository::{ProductRepository, ProductStore, TxProductRepository};
pub use promotion_repository::{PromotionRepository, PromotionStore, TxPromotionRepository};
pub use stock_repository::{AppliedChange, StockRepository, StockStore, TxStockRepository};
pub use store_repository::{StoreRepository, StoreStore, TxStoreRepository};
pub use user_repository::{TxUserRepository, UserRepository, UserStore};
pub use warehouse_repository::{
    TxWarehouseRepository, WarehouseChanges, WarehouseRepository, WarehouseStore,
};

// Export mocks for tests (both unit and integration)
#[cfg(any(test, feature = "test-utils"))]
pub use message_repository::MockMessageRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use order_repository::MockOrderRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use product_repository::MockProductRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use promotion_repository::MockPromotionRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use stock_repository::MockStockRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use store_repository::MockStoreRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use user_repository::MockUserRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use warehouse_repository::MockWarehouseRepository;
