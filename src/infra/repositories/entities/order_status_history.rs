//! Order status history entity for SeaORM.

use sea_orm::entity::prelude::*;

use super::parse_column;
use crate::domain::{OrderStatus, StatusChange};
use crate::errors::AppError;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "order_status_history")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_id: Uuid,
    pub from_status: Option<String>,
    pub to_status: String,
    pub changed_by: Option<Uuid>,
    pub note: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for StatusChange {
    type Error = AppError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(StatusChange {
            from_status: model
                .from_status
                .as_deref()
                .map(|s| parse_column(s, "order status", OrderStatus::parse))
                .transpose()?,
            to_status: parse_column(&model.to_status, "order status", OrderStatus::parse)?,
            id: model.id,
            order_id: model.order_id,
            changed_by: model.changed_by,
            note: model.note,
            created_at: model.created_at,
        })
    }
}
