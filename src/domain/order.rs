//! Orders and the order-status workflow.
//!
//! Stock is taken when an order is placed (online) or rung up (POS). The
//! status table below decides which transitions are legal and which of them
//! put stock back.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::inventory::MovementKind;
use super::pos::PaymentMethod;
use crate::config::{ORDER_PREFIX_ONLINE, ORDER_PREFIX_POS};
use crate::errors::{AppError, AppResult};

/// Sales channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Online,
    Pos,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Online => "online",
            Channel::Pos => "pos",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "online" => Some(Channel::Online),
            "pos" => Some(Channel::Pos),
            _ => None,
        }
    }

    /// Ledger kind used when stock leaves for this channel
    pub fn sale_movement(&self) -> MovementKind {
        match self {
            Channel::Online => MovementKind::OrderReserve,
            Channel::Pos => MovementKind::PosSale,
        }
    }

    fn number_prefix(&self) -> &'static str {
        match self {
            Channel::Online => ORDER_PREFIX_ONLINE,
            Channel::Pos => ORDER_PREFIX_POS,
        }
    }
}

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    /// POS sale settled at the till
    Completed,
    Cancelled,
    Returned,
    Refunded,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 9] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
        OrderStatus::Returned,
        OrderStatus::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Returned => "returned",
            OrderStatus::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }

    /// Statuses reachable in one step
    pub fn next_statuses(&self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            Pending => &[Confirmed, Cancelled],
            Confirmed => &[Processing, Cancelled],
            Processing => &[Shipped, Cancelled],
            Shipped => &[Delivered, Returned],
            Delivered => &[Returned],
            Completed => &[Refunded],
            Cancelled | Returned | Refunded => &[],
        }
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        self.next_statuses().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        self.next_statuses().is_empty()
    }

    /// Orders in these statuses no longer count towards revenue
    pub fn is_reversed(&self) -> bool {
        matches!(
            self,
            OrderStatus::Cancelled | OrderStatus::Returned | OrderStatus::Refunded
        )
    }

    /// Ledger kind written when entering this status, if stock comes back
    pub fn restock_movement(&self) -> Option<MovementKind> {
        match self {
            OrderStatus::Cancelled => Some(MovementKind::OrderCancel),
            OrderStatus::Returned => Some(MovementKind::OrderReturn),
            OrderStatus::Refunded => Some(MovementKind::PosRefund),
            _ => None,
        }
    }

    /// Status a freshly created order starts in
    pub fn initial(channel: Channel) -> Self {
        match channel {
            Channel::Online => OrderStatus::Pending,
            Channel::Pos => OrderStatus::Completed,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a validated transition has to do besides updating the status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionPlan {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub restock: Option<MovementKind>,
    /// Give back the promotion use consumed at placement
    pub release_promotion: bool,
}

/// Validate a status change and derive its side effects.
pub fn plan_transition(from: OrderStatus, to: OrderStatus) -> AppResult<TransitionPlan> {
    if from == to {
        return Err(AppError::invalid_state(format!("Order is already {}", from)));
    }
    if !from.can_transition_to(to) {
        return Err(AppError::invalid_state(format!(
            "Cannot move order from {} to {}",
            from, to
        )));
    }
    Ok(TransitionPlan {
        from,
        to,
        restock: to.restock_movement(),
        release_promotion: to == OrderStatus::Cancelled,
    })
}

/// Customer contact details attached to an order
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct Customer {
    #[schema(example = "Alex Buyer")]
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub shipping_address: Option<String>,
}

/// Order line
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub sku: String,
    pub name: String,
    #[schema(value_type = String)]
    pub unit_price: Decimal,
    pub quantity: i32,
    #[schema(value_type = String)]
    pub line_total: Decimal,
}

/// Order header with its lines
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub store_id: Uuid,
    #[schema(example = "ORD-20240601-1A2B3C4D")]
    pub order_number: String,
    pub channel: Channel,
    pub status: OrderStatus,
    pub warehouse_id: Uuid,
    pub customer: Customer,
    #[schema(value_type = String)]
    pub subtotal: Decimal,
    #[schema(value_type = String)]
    pub discount_total: Decimal,
    #[schema(value_type = String)]
    pub total: Decimal,
    pub promotion_id: Option<Uuid>,
    pub promotion_code: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    #[schema(value_type = Option<String>)]
    pub amount_tendered: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub change_due: Option<Decimal>,
    pub note: Option<String>,
    pub created_by: Option<Uuid>,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Status history row
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusChange {
    pub id: Uuid,
    pub order_id: Uuid,
    pub from_status: Option<OrderStatus>,
    pub to_status: OrderStatus,
    pub changed_by: Option<Uuid>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Order list filter
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub channel: Option<Channel>,
    /// Order number or customer name (case-insensitive)
    pub search: Option<String>,
    /// Inclusive lower bound on `created_at`
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`
    pub to: Option<DateTime<Utc>>,
}

/// Order header ready to be stored
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub store_id: Uuid,
    pub channel: Channel,
    pub warehouse_id: Uuid,
    pub customer: Customer,
    pub subtotal: Decimal,
    pub discount_total: Decimal,
    pub total: Decimal,
    pub promotion_id: Option<Uuid>,
    pub promotion_code: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub amount_tendered: Option<Decimal>,
    pub change_due: Option<Decimal>,
    pub note: Option<String>,
    pub created_by: Option<Uuid>,
}

/// Requested line before pricing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Priced line ready to be stored
#[derive(Debug, Clone)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub sku: String,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

impl PricedLine {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Reject empty orders, non-positive quantities and repeated products.
pub fn validate_lines(lines: &[LineRequest]) -> AppResult<()> {
    if lines.is_empty() {
        return Err(AppError::validation("Order must contain at least one item"));
    }
    for (i, line) in lines.iter().enumerate() {
        if line.quantity <= 0 {
            return Err(AppError::validation("Item quantity must be positive"));
        }
        if lines[..i].iter().any(|l| l.product_id == line.product_id) {
            return Err(AppError::validation(format!(
                "Product {} appears more than once",
                line.product_id
            )));
        }
    }
    Ok(())
}

/// Sum of line totals
pub fn subtotal(lines: &[PricedLine]) -> Decimal {
    lines.iter().map(PricedLine::line_total).sum()
}

/// Build a human-readable order number: `PREFIX-YYYYMMDD-XXXXXXXX`.
pub fn order_number(channel: Channel, at: DateTime<Utc>, id: Uuid) -> String {
    let simple = id.simple().to_string().to_uppercase();
    format!(
        "{}-{}-{}",
        channel.number_prefix(),
        at.format("%Y%m%d"),
        &simple[..8]
    )
}
