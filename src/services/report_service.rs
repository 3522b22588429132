//! Report service - Store dashboard and low-stock listing.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::container::parallel;
use crate::config::DASHBOARD_CACHE_TTL_SECONDS;
use crate::domain::{Channel, OrderStatus, Product, SenderSide};
use crate::errors::AppResult;
use crate::infra::cache::{dashboard_key, get_json, set_json};
use crate::infra::{CacheStore, UnitOfWork};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: u64,
}

/// Store overview
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Dashboard {
    /// One entry per status, zero counts included
    pub orders_by_status: Vec<StatusCount>,
    pub total_orders: u64,
    /// Excludes cancelled, returned and refunded orders
    #[schema(value_type = String)]
    pub revenue: Decimal,
    #[schema(value_type = String)]
    pub online_revenue: Decimal,
    #[schema(value_type = String)]
    pub pos_revenue: Decimal,
    pub low_stock_products: u64,
    pub unread_messages: u64,
}

impl Dashboard {
    fn assemble(
        counts: Vec<(OrderStatus, u64)>,
        revenue: Vec<(Channel, Decimal)>,
        low_stock_products: u64,
        unread_messages: u64,
    ) -> Self {
        let orders_by_status: Vec<StatusCount> = OrderStatus::ALL
            .iter()
            .map(|status| StatusCount {
                status: *status,
                count: counts
                    .iter()
                    .filter(|(s, _)| s == status)
                    .map(|(_, n)| *n)
                    .sum(),
            })
            .collect();

        let by_channel = |channel: Channel| -> Decimal {
            revenue
                .iter()
                .filter(|(c, _)| *c == channel)
                .map(|(_, amount)| *amount)
                .sum()
        };
        let online_revenue = by_channel(Channel::Online);
        let pos_revenue = by_channel(Channel::Pos);

        Self {
            total_orders: orders_by_status.iter().map(|s| s.count).sum(),
            orders_by_status,
            revenue: online_revenue + pos_revenue,
            online_revenue,
            pos_revenue,
            low_stock_products,
            unread_messages,
        }
    }
}

#[async_trait]
pub trait ReportService: Send + Sync {
    /// Served from cache for up to a minute
    async fn dashboard(&self, store_id: Uuid) -> AppResult<Dashboard>;

    /// Active products at or below their threshold, emptiest first
    async fn low_stock(&self, store_id: Uuid) -> AppResult<Vec<Product>>;
}

pub struct ReportManager<U: UnitOfWork> {
    uow: Arc<U>,
    cache: Arc<dyn CacheStore>,
}

impl<U: UnitOfWork> ReportManager<U> {
    pub fn new(uow: Arc<U>, cache: Arc<dyn CacheStore>) -> Self {
        Self { uow, cache }
    }
}

#[async_trait]
impl<U: UnitOfWork> ReportService for ReportManager<U> {
    async fn dashboard(&self, store_id: Uuid) -> AppResult<Dashboard> {
        let key = dashboard_key(store_id);
        match get_json::<Dashboard>(self.cache.as_ref(), &key).await {
            Ok(Some(cached)) => return Ok(cached),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Dashboard cache read failed"),
        }

        let orders = self.uow.orders();
        let products = self.uow.products();
        let messages = self.uow.messages();
        let (counts, revenue, low_stock, unread) = parallel::join4(
            orders.count_by_status(store_id),
            orders.revenue_by_channel(store_id),
            products.count_low_stock(store_id),
            messages.unread_count(store_id, SenderSide::Seller),
        )
        .await?;

        let dashboard = Dashboard::assemble(counts, revenue, low_stock, unread);
        if let Err(e) = set_json(
            self.cache.as_ref(),
            &key,
            &dashboard,
            DASHBOARD_CACHE_TTL_SECONDS,
        )
        .await
        {
            tracing::warn!(error = %e, "Dashboard cache write failed");
        }

        Ok(dashboard)
    }

    async fn low_stock(&self, store_id: Uuid) -> AppResult<Vec<Product>> {
        self.uow.products().list_low_stock(store_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use crate::infra::repositories::{
        MockMessageRepository, MockOrderRepository, MockProductRepository,
    };
    use crate::infra::MockCacheStore;
    use crate::services::test_support::TestUow;
    use rust_decimal_macros::dec;

    #[test]
    fn test_assemble_fills_missing_statuses() {
        let dashboard = Dashboard::assemble(
            vec![(OrderStatus::Pending, 2), (OrderStatus::Delivered, 3)],
            vec![(Channel::Online, dec!(120.50)), (Channel::Pos, dec!(30))],
            1,
            4,
        );

        assert_eq!(dashboard.orders_by_status.len(), OrderStatus::ALL.len());
        assert_eq!(dashboard.total_orders, 5);
        assert_eq!(dashboard.revenue, dec!(150.50));
        assert_eq!(dashboard.online_revenue, dec!(120.50));
        assert_eq!(dashboard.pos_revenue, dec!(30));
        let shipped = dashboard
            .orders_by_status
            .iter()
            .find(|s| s.status == OrderStatus::Shipped)
            .unwrap();
        assert_eq!(shipped.count, 0);
    }

    #[tokio::test]
    async fn test_dashboard_served_from_cache() {
        let cached = Dashboard::assemble(vec![], vec![], 0, 7);
        let json = serde_json::to_string(&cached).unwrap();

        let mut cache = MockCacheStore::new();
        cache
            .expect_get_raw()
            .returning(move |_| Ok(Some(json.clone())));
        cache.expect_set_raw().never();

        let manager = ReportManager::new(Arc::new(TestUow::default()), Arc::new(cache));
        let dashboard = manager.dashboard(Uuid::new_v4()).await.unwrap();
        assert_eq!(dashboard.unread_messages, 7);
    }

    #[tokio::test]
    async fn test_dashboard_computed_and_cached() {
        let mut orders = MockOrderRepository::new();
        orders
            .expect_count_by_status()
            .returning(|_| Ok(vec![(OrderStatus::Pending, 1)]));
        orders
            .expect_revenue_by_channel()
            .returning(|_| Ok(vec![(Channel::Online, dec!(10))]));
        let mut products = MockProductRepository::new();
        products.expect_count_low_stock().returning(|_| Ok(2));
        let mut messages = MockMessageRepository::new();
        messages
            .expect_unread_count()
            .withf(|_, side| *side == SenderSide::Seller)
            .returning(|_, _| Ok(0));

        let mut cache = MockCacheStore::new();
        // A broken cache must not fail the request
        cache
            .expect_get_raw()
            .returning(|_| Err(AppError::internal("redis down")));
        cache
            .expect_set_raw()
            .withf(|key, _, ttl| key.starts_with("dashboard:") && *ttl == 60)
            .times(1)
            .returning(|_, _, _| Ok(()));

        let uow = TestUow {
            orders: Arc::new(orders),
            products: Arc::new(products),
            messages: Arc::new(messages),
            ..Default::default()
        };
        let dashboard = ReportManager::new(Arc::new(uow), Arc::new(cache))
            .dashboard(Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(dashboard.total_orders, 1);
        assert_eq!(dashboard.revenue, dec!(10));
        assert_eq!(dashboard.low_stock_products, 2);
    }
}
