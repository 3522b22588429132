//! Stock ledger entity for SeaORM.

use sea_orm::entity::prelude::*;

use super::parse_column;
use crate::domain::{MovementKind, StockMovement};
use crate::errors::AppError;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "stock_movements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub store_id: Uuid,
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub delta: i32,
    pub balance_after: i32,
    pub kind: String,
    pub reference: Option<String>,
    pub note: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for StockMovement {
    type Error = AppError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(StockMovement {
            kind: parse_column(&model.kind, "movement kind", MovementKind::parse)?,
            id: model.id,
            store_id: model.store_id,
            product_id: model.product_id,
            warehouse_id: model.warehouse_id,
            delta: model.delta,
            balance_after: model.balance_after,
            reference: model.reference,
            note: model.note,
            created_by: model.created_by,
            created_at: model.created_at,
        })
    }
}
