//! Point-of-sale payment settlement.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::order::{Order, OrderStatus};
use crate::errors::{AppError, AppResult};

/// Tender type accepted at the till
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Transfer => "transfer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cash" => Some(PaymentMethod::Cash),
            "card" => Some(PaymentMethod::Card),
            "transfer" => Some(PaymentMethod::Transfer),
            _ => None,
        }
    }
}

/// Amounts recorded on a settled POS sale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub tendered: Decimal,
    pub change: Decimal,
}

/// Settle a sale total.
///
/// Cash must cover the total and may produce change. Card and transfer
/// payments are taken for the exact total; any tendered amount is ignored.
pub fn settle(
    method: PaymentMethod,
    total: Decimal,
    tendered: Option<Decimal>,
) -> AppResult<Settlement> {
    match method {
        PaymentMethod::Cash => {
            let tendered = tendered
                .ok_or_else(|| AppError::validation("Cash payments require amount_tendered"))?;
            if tendered < total {
                return Err(AppError::validation(format!(
                    "Amount tendered {} is less than total {}",
                    tendered, total
                )));
            }
            Ok(Settlement {
                tendered,
                change: tendered - total,
            })
        }
        PaymentMethod::Card | PaymentMethod::Transfer => Ok(Settlement {
            tendered: total,
            change: Decimal::ZERO,
        }),
    }
}

/// Per-tender totals within a day
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TenderTotal {
    pub method: PaymentMethod,
    pub count: u64,
    #[schema(value_type = String)]
    pub total: Decimal,
}

/// Till summary for one day
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DailySummary {
    #[schema(value_type = String, example = "2024-06-01")]
    pub date: NaiveDate,
    /// Sales rung up that day, refunded or not
    pub sales_count: u64,
    #[schema(value_type = String)]
    pub gross: Decimal,
    pub refund_count: u64,
    #[schema(value_type = String)]
    pub refunds: Decimal,
    #[schema(value_type = String)]
    pub net: Decimal,
    pub by_payment_method: Vec<TenderTotal>,
}

impl DailySummary {
    /// Summarise the POS orders created on `date`.
    pub fn from_orders(date: NaiveDate, orders: &[Order]) -> Self {
        let mut gross = Decimal::ZERO;
        let mut refunds = Decimal::ZERO;
        let mut refund_count = 0;
        let mut by_method: Vec<TenderTotal> = Vec::new();

        for order in orders {
            gross += order.total;
            if order.status == OrderStatus::Refunded {
                refunds += order.total;
                refund_count += 1;
            }
            let Some(method) = order.payment_method else {
                continue;
            };
            match by_method.iter_mut().find(|t| t.method == method) {
                Some(entry) => {
                    entry.count += 1;
                    entry.total += order.total;
                }
                None => by_method.push(TenderTotal {
                    method,
                    count: 1,
                    total: order.total,
                }),
            }
        }
        by_method.sort_by_key(|t| t.method.as_str());

        Self {
            date,
            sales_count: orders.len() as u64,
            gross,
            refund_count,
            refunds,
            net: gross - refunds,
            by_payment_method: by_method,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_cash_with_change() {
        let s = settle(PaymentMethod::Cash, dec!(17.35), Some(dec!(20))).unwrap();
        assert_eq!(s.change, dec!(2.65));
        assert_eq!(s.tendered, dec!(20));
    }

    #[test]
    fn test_cash_exact() {
        let s = settle(PaymentMethod::Cash, dec!(5.00), Some(dec!(5))).unwrap();
        assert_eq!(s.change, Decimal::ZERO);
    }

    #[test]
    fn test_cash_short_rejected() {
        assert!(settle(PaymentMethod::Cash, dec!(10), Some(dec!(9.99))).is_err());
        assert!(settle(PaymentMethod::Cash, dec!(10), None).is_err());
    }

    fn pos_order(total: Decimal, method: PaymentMethod, status: OrderStatus) -> Order {
        use crate::domain::order::{Channel, Customer};
        use chrono::Utc;
        use uuid::Uuid;

        Order {
            id: Uuid::new_v4(),
            store_id: Uuid::new_v4(),
            order_number: "POS-20240601-00000000".into(),
            channel: Channel::Pos,
            status,
            warehouse_id: Uuid::new_v4(),
            customer: Customer::default(),
            subtotal: total,
            discount_total: Decimal::ZERO,
            total,
            promotion_id: None,
            promotion_code: None,
            payment_method: Some(method),
            amount_tendered: Some(total),
            change_due: Some(Decimal::ZERO),
            note: None,
            created_by: None,
            items: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_daily_summary() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let orders = vec![
            pos_order(dec!(10.00), PaymentMethod::Cash, OrderStatus::Completed),
            pos_order(dec!(5.50), PaymentMethod::Card, OrderStatus::Completed),
            pos_order(dec!(4.50), PaymentMethod::Cash, OrderStatus::Refunded),
        ];

        let summary = DailySummary::from_orders(date, &orders);
        assert_eq!(summary.sales_count, 3);
        assert_eq!(summary.gross, dec!(20.00));
        assert_eq!(summary.refunds, dec!(4.50));
        assert_eq!(summary.refund_count, 1);
        assert_eq!(summary.net, dec!(15.50));
        assert_eq!(summary.by_payment_method.len(), 2);
        assert_eq!(summary.by_payment_method[1].method, PaymentMethod::Cash);
        assert_eq!(summary.by_payment_method[1].count, 2);
    }

    #[test]
    fn test_empty_day() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 2).unwrap();
        let summary = DailySummary::from_orders(date, &[]);
        assert_eq!(summary.net, Decimal::ZERO);
        assert!(summary.by_payment_method.is_empty());
    }

    #[test]
    fn test_card_takes_exact_total() {
        let s = settle(PaymentMethod::Card, dec!(42.10), Some(dec!(100))).unwrap();
        assert_eq!(s.tendered, dec!(42.10));
        assert_eq!(s.change, Decimal::ZERO);
    }
}
