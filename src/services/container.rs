//! Service Container - Centralized service access with parallel execution support.
//!
//! Handlers reach every use case through [`ServiceContainer`]; the
//! concrete [`Services`] wires them over one shared [`Persistence`].

use std::future::Future;
use std::sync::Arc;

use super::{
    AuthService, InventoryService, MessageService, OrderService, PosService, ProductService,
    PromotionService, ReportService, StaffService,
};
use crate::config::Config;
use crate::errors::AppResult;
use crate::infra::{CacheStore, Persistence};
use crate::jobs::Notifier;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Service container trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
pub trait ServiceContainer: Send + Sync {
    fn auth(&self) -> Arc<dyn AuthService>;

    fn staff(&self) -> Arc<dyn StaffService>;

    fn products(&self) -> Arc<dyn ProductService>;

    fn inventory(&self) -> Arc<dyn InventoryService>;

    fn orders(&self) -> Arc<dyn OrderService>;

    fn pos(&self) -> Arc<dyn PosService>;

    fn promotions(&self) -> Arc<dyn PromotionService>;

    fn messages(&self) -> Arc<dyn MessageService>;

    fn reports(&self) -> Arc<dyn ReportService>;
}

/// Concrete implementation of ServiceContainer
pub struct Services {
    auth_service: Arc<dyn AuthService>,
    staff_service: Arc<dyn StaffService>,
    product_service: Arc<dyn ProductService>,
    inventory_service: Arc<dyn InventoryService>,
    order_service: Arc<dyn OrderService>,
    pos_service: Arc<dyn PosService>,
    promotion_service: Arc<dyn PromotionService>,
    message_service: Arc<dyn MessageService>,
    report_service: Arc<dyn ReportService>,
}

impl Services {
    /// Build every service over one database connection.
    pub fn from_connection(
        db: sea_orm::DatabaseConnection,
        cache: Arc<dyn CacheStore>,
        notifier: Arc<dyn Notifier>,
        config: Config,
    ) -> Self {
        use super::{
            Authenticator, InventoryManager, MessageManager, OrderManager, PosManager,
            ProductManager, PromotionManager, ReportManager, StaffManager,
        };

        let uow = Arc::new(Persistence::new(db));

        Self {
            auth_service: Arc::new(Authenticator::new(uow.clone(), cache.clone(), config)),
            staff_service: Arc::new(StaffManager::new(uow.clone())),
            product_service: Arc::new(ProductManager::new(uow.clone())),
            inventory_service: Arc::new(InventoryManager::new(uow.clone(), notifier.clone())),
            order_service: Arc::new(OrderManager::new(uow.clone(), notifier.clone())),
            pos_service: Arc::new(PosManager::new(uow.clone(), notifier.clone())),
            promotion_service: Arc::new(PromotionManager::new(uow.clone())),
            message_service: Arc::new(MessageManager::new(uow.clone(), notifier)),
            report_service: Arc::new(ReportManager::new(uow, cache)),
        }
    }
}

impl ServiceContainer for Services {
    fn auth(&self) -> Arc<dyn AuthService> {
        self.auth_service.clone()
    }

    fn staff(&self) -> Arc<dyn StaffService> {
        self.staff_service.clone()
    }

    fn products(&self) -> Arc<dyn ProductService> {
        self.product_service.clone()
    }

    fn inventory(&self) -> Arc<dyn InventoryService> {
        self.inventory_service.clone()
    }

    fn orders(&self) -> Arc<dyn OrderService> {
        self.order_service.clone()
    }

    fn pos(&self) -> Arc<dyn PosService> {
        self.pos_service.clone()
    }

    fn promotions(&self) -> Arc<dyn PromotionService> {
        self.promotion_service.clone()
    }

    fn messages(&self) -> Arc<dyn MessageService> {
        self.message_service.clone()
    }

    fn reports(&self) -> Arc<dyn ReportService> {
        self.report_service.clone()
    }
}

/// Helpers for running independent queries concurrently.
pub mod parallel {
    use super::*;
    use tokio::try_join;

    /// Execute two independent async operations in parallel.
    ///
    /// Both operations run concurrently and the function returns when both complete.
    /// If either operation fails, the error is returned immediately.
    pub async fn join2<F1, F2, T1, T2>(f1: F1, f2: F2) -> AppResult<(T1, T2)>
    where
        F1: Future<Output = AppResult<T1>>,
        F2: Future<Output = AppResult<T2>>,
    {
        try_join!(f1, f2)
    }

    /// Execute four independent async operations in parallel.
    pub async fn join4<F1, F2, F3, F4, T1, T2, T3, T4>(
        f1: F1,
        f2: F2,
        f3: F3,
        f4: F4,
    ) -> AppResult<(T1, T2, T3, T4)>
    where
        F1: Future<Output = AppResult<T1>>,
        F2: Future<Output = AppResult<T2>>,
        F3: Future<Output = AppResult<T3>>,
        F4: Future<Output = AppResult<T4>>,
    {
        try_join!(f1, f2, f3, f4)
    }
}
