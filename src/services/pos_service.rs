//! POS service - Till checkout, refunds and the daily summary.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use super::order_service::{alert_low_stock, apply_transition, record_sale, Sale};
use crate::domain::order::LineRequest;
use crate::domain::{Channel, Customer, DailySummary, Order, OrderStatus, PaymentMethod};
use crate::errors::{AppError, AppResult};
use crate::infra::UnitOfWork;
use crate::jobs::Notifier;

/// Customer name recorded on anonymous till sales
const WALK_IN_CUSTOMER: &str = "Walk-in customer";

#[derive(Debug, Clone)]
pub struct Checkout {
    pub items: Vec<LineRequest>,
    pub payment_method: PaymentMethod,
    pub amount_tendered: Option<Decimal>,
    pub warehouse_id: Option<Uuid>,
    pub promotion_code: Option<String>,
    pub customer_name: Option<String>,
    pub note: Option<String>,
}

#[async_trait]
pub trait PosService: Send + Sync {
    /// Ring up a sale; the order is created already completed
    async fn checkout(&self, store_id: Uuid, actor: Uuid, checkout: Checkout) -> AppResult<Order>;

    /// `completed -> refunded`, restocking the sold items
    async fn refund(
        &self,
        store_id: Uuid,
        actor: Uuid,
        order_id: Uuid,
        note: Option<String>,
    ) -> AppResult<Order>;

    /// Till totals for one UTC day
    async fn daily_summary(&self, store_id: Uuid, date: NaiveDate) -> AppResult<DailySummary>;
}

pub struct PosManager<U: UnitOfWork> {
    uow: Arc<U>,
    notifier: Arc<dyn Notifier>,
}

impl<U: UnitOfWork> PosManager<U> {
    pub fn new(uow: Arc<U>, notifier: Arc<dyn Notifier>) -> Self {
        Self { uow, notifier }
    }
}

#[async_trait]
impl<U: UnitOfWork> PosService for PosManager<U> {
    async fn checkout(&self, store_id: Uuid, actor: Uuid, checkout: Checkout) -> AppResult<Order> {
        if checkout.amount_tendered.is_some_and(|t| t.is_sign_negative()) {
            return Err(AppError::validation("Amount tendered must not be negative"));
        }
        let name = checkout
            .customer_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| WALK_IN_CUSTOMER.to_string());

        let outcome = record_sale(
            self.uow.as_ref(),
            store_id,
            Sale {
                channel: Channel::Pos,
                customer: Customer {
                    name,
                    ..Default::default()
                },
                lines: checkout.items,
                warehouse_id: checkout.warehouse_id,
                promotion_code: checkout.promotion_code,
                payment: Some((checkout.payment_method, checkout.amount_tendered)),
                note: checkout.note,
                actor,
            },
        )
        .await?;

        tracing::info!(
            store_id = %store_id,
            order = %outcome.order.order_number,
            total = %outcome.order.total,
            method = %checkout.payment_method.as_str(),
            "POS sale completed"
        );
        alert_low_stock(
            self.uow.as_ref(),
            self.notifier.as_ref(),
            store_id,
            &outcome.low_stock,
        )
        .await;

        Ok(outcome.order)
    }

    async fn refund(
        &self,
        store_id: Uuid,
        actor: Uuid,
        order_id: Uuid,
        note: Option<String>,
    ) -> AppResult<Order> {
        let order = self
            .uow
            .orders()
            .find_by_id(store_id, order_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if order.channel != Channel::Pos {
            return Err(AppError::invalid_state(
                "Only POS sales can be refunded at the till",
            ));
        }

        let order = apply_transition(
            self.uow.as_ref(),
            store_id,
            actor,
            order_id,
            OrderStatus::Refunded,
            note,
        )
        .await?;
        tracing::info!(store_id = %store_id, order = %order.order_number, "POS sale refunded");
        Ok(order)
    }

    async fn daily_summary(&self, store_id: Uuid, date: NaiveDate) -> AppResult<DailySummary> {
        let from = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| AppError::validation("Invalid date"))?
            .and_utc();
        let to = from + Duration::days(1);

        let orders = self
            .uow
            .orders()
            .list_created_between(store_id, Channel::Pos, from, to)
            .await?;
        Ok(DailySummary::from_orders(date, &orders))
    }
}
