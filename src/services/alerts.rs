//! Owner notifications raised by the order, stock and messaging workflows.
//!
//! Sent after the transaction commits; failures are logged and swallowed.

use uuid::Uuid;

use crate::domain::{Conversation, Order, Product};
use crate::infra::UnitOfWork;
use crate::jobs::{NotificationJob, Notifier};

/// A product whose total stock dropped to or below its threshold
#[derive(Debug, Clone)]
pub struct LowStock {
    pub sku: String,
    pub name: String,
    pub quantity: i32,
    pub threshold: i32,
}

impl LowStock {
    /// `Some` when a change from `before` to `after` crosses the threshold.
    pub fn crossing(product: &Product, before: i32, after: i32) -> Option<Self> {
        let threshold = product.low_stock_threshold;
        (before > threshold && after <= threshold).then(|| Self {
            sku: product.sku.clone(),
            name: product.name.clone(),
            quantity: after,
            threshold,
        })
    }
}

pub fn order_placed(order: &Order) -> (String, String) {
    let subject = format!("New order {}", order.order_number);
    let body = format!(
        "Order {} from {} was placed for {} ({} item(s)).",
        order.order_number,
        order.customer.name,
        order.total,
        order.items.len()
    );
    (subject, body)
}

pub fn low_stock(items: &[LowStock]) -> (String, String) {
    let subject = if items.len() == 1 {
        format!("Low stock: {}", items[0].sku)
    } else {
        format!("Low stock: {} products", items.len())
    };
    let body = items
        .iter()
        .map(|i| {
            format!(
                "{} ({}): {} left, threshold {}",
                i.sku, i.name, i.quantity, i.threshold
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    (subject, body)
}

pub fn admin_reply(conversation: &Conversation) -> (String, String) {
    (
        format!("Reply from support: {}", conversation.subject),
        "Platform support replied to your conversation. Sign in to read it.".to_string(),
    )
}

/// Look up the store owner and queue a notification to them.
pub async fn notify_owner<U: UnitOfWork>(
    uow: &U,
    notifier: &dyn Notifier,
    store_id: Uuid,
    (subject, body): (String, String),
) {
    match uow.users().find_owner(store_id).await {
        Ok(Some(owner)) => {
            notifier
                .notify(NotificationJob::new(owner.email, subject, body))
                .await
        }
        Ok(None) => tracing::warn!(store_id = %store_id, "Store has no owner to notify"),
        Err(e) => tracing::error!(store_id = %store_id, error = %e, "Owner lookup failed"),
    }
}
