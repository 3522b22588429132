//! Conversation database entity for SeaORM.

use sea_orm::entity::prelude::*;

use super::parse_column;
use crate::domain::{Conversation, ConversationStatus};
use crate::errors::AppError;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "conversations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub store_id: Uuid,
    pub subject: String,
    pub status: String,
    pub created_by: Uuid,
    pub last_message_at: DateTimeUtc,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Conversation {
    type Error = AppError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Conversation {
            status: parse_column(&model.status, "conversation status", ConversationStatus::parse)?,
            id: model.id,
            store_id: model.store_id,
            subject: model.subject,
            created_by: model.created_by,
            last_message_at: model.last_message_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
