//! Order header entity for SeaORM.

use sea_orm::entity::prelude::*;

use super::parse_column;
use crate::domain::{Channel, Customer, Order, OrderItem, OrderStatus, PaymentMethod};
use crate::errors::AppResult;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub store_id: Uuid,
    #[sea_orm(unique)]
    pub order_number: String,
    pub channel: String,
    pub status: String,
    pub warehouse_id: Uuid,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub shipping_address: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub subtotal: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub discount_total: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub total: Decimal,
    pub promotion_id: Option<Uuid>,
    pub promotion_code: Option<String>,
    pub payment_method: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))", nullable)]
    pub amount_tendered: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))", nullable)]
    pub change_due: Option<Decimal>,
    pub note: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn parsed_status(&self) -> AppResult<OrderStatus> {
        parse_column(&self.status, "order status", OrderStatus::parse)
    }

    /// Attach the loaded lines and convert to the domain aggregate.
    pub fn into_domain(self, items: Vec<OrderItem>) -> AppResult<Order> {
        let status = self.parsed_status()?;
        let channel = parse_column(&self.channel, "order channel", Channel::parse)?;
        let payment_method = self
            .payment_method
            .as_deref()
            .map(|m| parse_column(m, "payment method", PaymentMethod::parse))
            .transpose()?;

        Ok(Order {
            id: self.id,
            store_id: self.store_id,
            order_number: self.order_number,
            channel,
            status,
            warehouse_id: self.warehouse_id,
            customer: Customer {
                name: self.customer_name,
                email: self.customer_email,
                phone: self.customer_phone,
                shipping_address: self.shipping_address,
            },
            subtotal: self.subtotal,
            discount_total: self.discount_total,
            total: self.total,
            promotion_id: self.promotion_id,
            promotion_code: self.promotion_code,
            payment_method,
            amount_tendered: self.amount_tendered,
            change_due: self.change_due,
            note: self.note,
            created_by: self.created_by,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
