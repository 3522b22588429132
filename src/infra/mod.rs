//! Infrastructure layer - External systems integration
//!
//! This module handles all external system concerns:
//! - PostgreSQL connections, migrations and repositories
//! - Redis for sessions, rate limiting and dashboard snapshots
//! - Unit of Work for transaction management

pub mod cache;
pub mod db;
pub mod repositories;
pub mod unit_of_work;

pub use cache::{Cache, CacheStore};
pub use db::{Database, Migrator};
pub use repositories::{
    MessageRepository, OrderRepository, ProductRepository, PromotionRepository, StockRepository,
    StoreRepository, UserRepository, WarehouseRepository,
};
pub use unit_of_work::{Persistence, TransactionContext, UnitOfWork};

#[cfg(any(test, feature = "test-utils"))]
pub use cache::MockCacheStore;
