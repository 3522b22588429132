//! Order service - Placement and the order-status workflow.
//!
//! Placement and every status change run in a single transaction. Product
//! rows are locked in id order before any stock level is touched; the same
//! order is used when restocking, so two workflows on overlapping products
//! cannot deadlock.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use super::alerts::{self, LowStock};
use super::container::parallel;
use super::inventory_service::active_warehouse;
use crate::config::MAX_ORDER_LINES;
use crate::domain::order::{
    self, order_number, plan_transition, validate_lines, LineRequest, PricedLine,
};
use crate::domain::pos::{settle, PaymentMethod};
use crate::domain::promotion::normalize_code;
use crate::domain::{
    Channel, Customer, NewOrder, Order, OrderFilter, OrderStatus, StatusChange, StockChange,
};
use crate::errors::{AppError, AppResult};
use crate::infra::{TransactionContext, UnitOfWork};
use crate::jobs::Notifier;
use crate::types::PaginationParams;
use crate::with_transaction;

/// Online order request
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub customer: Customer,
    pub items: Vec<LineRequest>,
    /// Fulfilment warehouse; the store default when absent
    pub warehouse_id: Option<Uuid>,
    pub promotion_code: Option<String>,
    pub note: Option<String>,
}

#[async_trait]
pub trait OrderService: Send + Sync {
    /// Validate, price, discount and reserve stock for a new online order
    async fn place_order(&self, store_id: Uuid, actor: Uuid, request: PlaceOrder)
        -> AppResult<Order>;

    async fn get(&self, store_id: Uuid, id: Uuid) -> AppResult<Order>;

    async fn list(
        &self,
        store_id: Uuid,
        filter: OrderFilter,
        pagination: PaginationParams,
    ) -> AppResult<(Vec<Order>, u64)>;

    /// Move an order along the status table, restocking where required
    async fn transition(
        &self,
        store_id: Uuid,
        actor: Uuid,
        id: Uuid,
        to: OrderStatus,
        note: Option<String>,
    ) -> AppResult<Order>;

    async fn history(&self, store_id: Uuid, id: Uuid) -> AppResult<Vec<StatusChange>>;
}

/// Channel-independent sale, shared by online placement and POS checkout
#[derive(Debug, Clone)]
pub(crate) struct Sale {
    pub channel: Channel,
    pub customer: Customer,
    pub lines: Vec<LineRequest>,
    pub warehouse_id: Option<Uuid>,
    pub promotion_code: Option<String>,
    pub payment: Option<(PaymentMethod, Option<Decimal>)>,
    pub note: Option<String>,
    pub actor: Uuid,
}

/// A committed sale and the products it pushed below their threshold
pub(crate) struct SaleOutcome {
    pub order: Order,
    pub low_stock: Vec<LowStock>,
}

/// Record a sale: lock products, price lines, apply the promotion, settle
/// payment, write the order and take the stock. All or nothing.
pub(crate) async fn record_sale<U: UnitOfWork>(
    uow: &U,
    store_id: Uuid,
    mut sale: Sale,
) -> AppResult<SaleOutcome> {
    if sale.lines.len() as u64 > MAX_ORDER_LINES {
        return Err(AppError::validation(format!(
            "An order may contain at most {} lines",
            MAX_ORDER_LINES
        )));
    }
    validate_lines(&sale.lines)?;
    let promotion_code = sale
        .promotion_code
        .take()
        .map(|c| normalize_code(&c))
        .transpose()?;
    sale.lines.sort_by_key(|l| l.product_id);

    with_transaction!(uow, |ctx| {
        let now = Utc::now();
        let warehouse = match sale.warehouse_id {
            Some(id) => active_warehouse(&ctx, store_id, id).await?,
            None => {
                let default = ctx
                    .warehouses()
                    .find_default(store_id)
                    .await?
                    .ok_or_else(|| AppError::invalid_state("Store has no default warehouse"))?;
                active_warehouse(&ctx, store_id, default.id).await?
            }
        };

        let ids: Vec<Uuid> = sale.lines.iter().map(|l| l.product_id).collect();
        let products = ctx.products().lock_many(store_id, ids).await?;

        let mut priced = Vec::with_capacity(sale.lines.len());
        for line in &sale.lines {
            let product = products
                .iter()
                .find(|p| p.id == line.product_id)
                .ok_or(AppError::NotFound)?;
            if !product.is_sellable() {
                return Err(AppError::validation(format!(
                    "Product {} is not available for sale",
                    product.sku
                )));
            }
            priced.push(PricedLine {
                product_id: product.id,
                sku: product.sku.clone(),
                name: product.name.clone(),
                unit_price: product.price,
                quantity: line.quantity,
            });
        }
        let subtotal = order::subtotal(&priced);

        let promotion = match &promotion_code {
            Some(code) => {
                let promotion = ctx
                    .promotions()
                    .lock_by_code(store_id, code)
                    .await?
                    .ok_or_else(|| AppError::validation(format!("Unknown promotion code {}", code)))?;
                promotion.check_applicable(subtotal, now)?;
                ctx.promotions().increment_use(promotion.id).await?;
                Some(promotion)
            }
            None => None,
        };
        let discount = promotion
            .as_ref()
            .map(|p| p.discount_for(subtotal))
            .unwrap_or(Decimal::ZERO);
        let total = (subtotal - discount).max(Decimal::ZERO);

        let settlement = match sale.payment {
            Some((method, tendered)) => Some((method, settle(method, total, tendered)?)),
            None => None,
        };

        let id = Uuid::new_v4();
        let number = order_number(sale.channel, now, id);
        let status = OrderStatus::initial(sale.channel);
        let order = ctx
            .orders()
            .create(
                id,
                number.clone(),
                status,
                NewOrder {
                    store_id,
                    channel: sale.channel,
                    warehouse_id: warehouse.id,
                    customer: sale.customer,
                    subtotal,
                    discount_total: discount,
                    total,
                    promotion_id: promotion.as_ref().map(|p| p.id),
                    promotion_code: promotion.map(|p| p.code),
                    payment_method: settlement.map(|(m, _)| m),
                    amount_tendered: settlement.map(|(_, s)| s.tendered),
                    change_due: settlement.map(|(_, s)| s.change),
                    note: sale.note.clone(),
                    created_by: Some(sale.actor),
                },
                &priced,
            )
            .await?;

        let mut low_stock = Vec::new();
        for line in &priced {
            let applied = ctx
                .stock()
                .apply(
                    store_id,
                    &line.sku,
                    StockChange {
                        product_id: line.product_id,
                        warehouse_id: warehouse.id,
                        delta: -line.quantity,
                        kind: sale.channel.sale_movement(),
                        reference: Some(number.clone()),
                        note: None,
                        actor: Some(sale.actor),
                    },
                )
                .await?;
            if let Some(product) = products.iter().find(|p| p.id == line.product_id) {
                low_stock.extend(LowStock::crossing(
                    product,
                    product.stock_quantity,
                    applied.product_total,
                ));
            }
        }

        ctx.orders()
            .record_status(order.id, None, status, Some(sale.actor), sale.note)
            .await?;

        Ok(SaleOutcome { order, low_stock })
    })
}

/// Apply a status change, restocking and releasing the promotion per the plan.
pub(crate) async fn apply_transition<U: UnitOfWork>(
    uow: &U,
    store_id: Uuid,
    actor: Uuid,
    id: Uuid,
    to: OrderStatus,
    note: Option<String>,
) -> AppResult<Order> {
    with_transaction!(uow, |ctx| {
        let mut order = ctx
            .orders()
            .lock(store_id, id)
            .await?
            .ok_or(AppError::NotFound)?;
        let plan = plan_transition(order.status, to)?;

        if let Some(kind) = plan.restock {
            restock(&ctx, store_id, &order, kind, actor).await?;
        }
        if plan.release_promotion {
            if let Some(promotion_id) = order.promotion_id {
                ctx.promotions().release_use(promotion_id).await?;
            }
        }

        ctx.orders().set_status(order.id, to).await?;
        ctx.orders()
            .record_status(order.id, Some(plan.from), to, Some(actor), note)
            .await?;

        order.status = to;
        order.updated_at = Utc::now();
        Ok(order)
    })
}

/// Put an order's lines back into its fulfilment warehouse.
async fn restock(
    ctx: &TransactionContext<'_>,
    store_id: Uuid,
    order: &Order,
    kind: crate::domain::MovementKind,
    actor: Uuid,
) -> AppResult<()> {
    let mut items: Vec<_> = order.items.iter().collect();
    items.sort_by_key(|i| i.product_id);

    let ids = items.iter().map(|i| i.product_id).collect();
    ctx.products().lock_many(store_id, ids).await?;

    for item in items {
        ctx.stock()
            .apply(
                store_id,
                &item.sku,
                StockChange {
                    product_id: item.product_id,
                    warehouse_id: order.warehouse_id,
                    delta: item.quantity,
                    kind,
                    reference: Some(order.order_number.clone()),
                    note: None,
                    actor: Some(actor),
                },
            )
            .await?;
    }
    Ok(())
}

/// Queue the low-stock alert for a committed sale.
pub(crate) async fn alert_low_stock<U: UnitOfWork>(
    uow: &U,
    notifier: &dyn Notifier,
    store_id: Uuid,
    low_stock: &[LowStock],
) {
    if !low_stock.is_empty() {
        alerts::notify_owner(uow, notifier, store_id, alerts::low_stock(low_stock)).await;
    }
}

pub struct OrderManager<U: UnitOfWork> {
    uow: Arc<U>,
    notifier: Arc<dyn Notifier>,
}

impl<U: UnitOfWork> OrderManager<U> {
    pub fn new(uow: Arc<U>, notifier: Arc<dyn Notifier>) -> Self {
        Self { uow, notifier }
    }
}

#[async_trait]
impl<U: UnitOfWork> OrderService for OrderManager<U> {
    async fn place_order(
        &self,
        store_id: Uuid,
        actor: Uuid,
        request: PlaceOrder,
    ) -> AppResult<Order> {
        if request.customer.name.trim().is_empty() {
            return Err(AppError::validation("Customer name is required"));
        }

        let outcome = record_sale(
            self.uow.as_ref(),
            store_id,
            Sale {
                channel: Channel::Online,
                customer: request.customer,
                lines: request.items,
                warehouse_id: request.warehouse_id,
                promotion_code: request.promotion_code,
                payment: None,
                note: request.note,
                actor,
            },
        )
        .await?;

        let order = outcome.order;
        tracing::info!(
            store_id = %store_id,
            order = %order.order_number,
            total = %order.total,
            lines = order.items.len(),
            "Order placed"
        );

        alerts::notify_owner(
            self.uow.as_ref(),
            self.notifier.as_ref(),
            store_id,
            alerts::order_placed(&order),
        )
        .await;
        alert_low_stock(
            self.uow.as_ref(),
            self.notifier.as_ref(),
            store_id,
            &outcome.low_stock,
        )
        .await;

        Ok(order)
    }

    async fn get(&self, store_id: Uuid, id: Uuid) -> AppResult<Order> {
        self.uow
            .orders()
            .find_by_id(store_id, id)
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn list(
        &self,
        store_id: Uuid,
        filter: OrderFilter,
        pagination: PaginationParams,
    ) -> AppResult<(Vec<Order>, u64)> {
        if let (Some(from), Some(to)) = (filter.from, filter.to) {
            if from >= to {
                return Err(AppError::validation("'from' must be before 'to'"));
            }
        }
        self.uow.orders().list(store_id, filter, pagination).await
    }

    async fn transition(
        &self,
        store_id: Uuid,
        actor: Uuid,
        id: Uuid,
        to: OrderStatus,
        note: Option<String>,
    ) -> AppResult<Order> {
        let order = apply_transition(self.uow.as_ref(), store_id, actor, id, to, note).await?;
        tracing::info!(
            store_id = %store_id,
            order = %order.order_number,
            status = %order.status,
            "Order status changed"
        );
        Ok(order)
    }

    async fn history(&self, store_id: Uuid, id: Uuid) -> AppResult<Vec<StatusChange>> {
        // The order must belong to the store
        let orders = self.uow.orders();
        let (_, history) =
            parallel::join2(self.get(store_id, id), orders.history(id)).await?;
        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::repositories::MockOrderRepository;
    use crate::jobs::MockNotifier;
    use crate::services::test_support::TestUow;
    use chrono::Duration;

    fn manager(uow: TestUow) -> OrderManager<TestUow> {
        OrderManager::new(Arc::new(uow), Arc::new(MockNotifier::new()))
    }

    fn request(items: Vec<LineRequest>) -> PlaceOrder {
        PlaceOrder {
            customer: Customer {
                name: "Alex Buyer".into(),
                ..Default::default()
            },
            items,
            warehouse_id: None,
            promotion_code: None,
            note: None,
        }
    }

    #[tokio::test]
    async fn test_empty_order_rejected() {
        let result = manager(TestUow::default())
            .place_order(Uuid::new_v4(), Uuid::new_v4(), request(vec![]))
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_duplicate_lines_rejected() {
        let product_id = Uuid::new_v4();
        let line = LineRequest {
            product_id,
            quantity: 1,
        };
        let result = manager(TestUow::default())
            .place_order(Uuid::new_v4(), Uuid::new_v4(), request(vec![line, line]))
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_line_cap_checked_before_duplicates() {
        let line = LineRequest {
            product_id: Uuid::new_v4(),
            quantity: 1,
        };
        let lines = vec![line; MAX_ORDER_LINES as usize + 1];
        let result = manager(TestUow::default())
            .place_order(Uuid::new_v4(), Uuid::new_v4(), request(lines))
            .await;
        match result {
            Err(AppError::Validation(msg)) => assert!(msg.contains("at most"), "{}", msg),
            other => panic!("expected line cap error, got {:?}", other.map(|o| o.id)),
        }
    }

    #[tokio::test]
    async fn test_customer_name_required() {
        let mut req = request(vec![LineRequest {
            product_id: Uuid::new_v4(),
            quantity: 1,
        }]);
        req.customer.name = "  ".into();
        let result = manager(TestUow::default())
            .place_order(Uuid::new_v4(), Uuid::new_v4(), req)
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_malformed_promotion_code_rejected_before_transaction() {
        let mut req = request(vec![LineRequest {
            product_id: Uuid::new_v4(),
            quantity: 1,
        }]);
        req.promotion_code = Some("bad code!".into());
        let result = manager(TestUow::default())
            .place_order(Uuid::new_v4(), Uuid::new_v4(), req)
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_history_is_store_scoped() {
        let mut orders = MockOrderRepository::new();
        orders.expect_find_by_id().returning(|_, _| Ok(None));
        orders.expect_history().returning(|_| Ok(vec![]));

        let result = manager(TestUow {
            orders: Arc::new(orders),
            ..Default::default()
        })
        .history(Uuid::new_v4(), Uuid::new_v4())
        .await;
        assert!(matches!(result, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn test_list_rejects_inverted_range() {
        let now = Utc::now();
        let filter = OrderFilter {
            from: Some(now),
            to: Some(now - Duration::days(1)),
            ..Default::default()
        };
        let result = manager(TestUow::default())
            .list(Uuid::new_v4(), filter, PaginationParams::default())
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
