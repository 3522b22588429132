//! Per-warehouse stock level entity for SeaORM.

use sea_orm::entity::prelude::*;

use crate::domain::StockLevel;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "stock_levels")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub store_id: Uuid,
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub quantity: i32,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for StockLevel {
    fn from(model: Model) -> Self {
        StockLevel {
            product_id: model.product_id,
            warehouse_id: model.warehouse_id,
            quantity: model.quantity,
            updated_at: model.updated_at,
        }
    }
}
