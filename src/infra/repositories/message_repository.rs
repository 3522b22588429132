//! Conversation and message repository.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use super::entities::conversation::{self, Entity as ConversationEntity};
use super::entities::message::{self, Entity as MessageEntity};
use crate::domain::{
    Conversation, ConversationStatus, ConversationSummary, Message, SenderSide,
};
use crate::errors::{AppError, AppResult};
use crate::types::PaginationParams;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Message repository.
///
/// `store_scope` is `Some(store)` for sellers and `None` for platform admins,
/// who may see every store's conversations.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn find_conversation(
        &self,
        store_scope: Option<Uuid>,
        id: Uuid,
    ) -> AppResult<Option<Conversation>>;

    /// Most recently active first, with the viewer's unread count
    async fn list_conversations(
        &self,
        store_scope: Option<Uuid>,
        viewer: SenderSide,
        status: Option<ConversationStatus>,
        pagination: PaginationParams,
    ) -> AppResult<(Vec<ConversationSummary>, u64)>;

    /// Create a conversation with its opening message.
    async fn start(
        &self,
        store_id: Uuid,
        subject: String,
        author_id: Uuid,
        side: SenderSide,
        body: String,
    ) -> AppResult<(Conversation, Message)>;

    /// Oldest first
    async fn messages(&self, conversation_id: Uuid) -> AppResult<Vec<Message>>;

    async fn add_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        side: SenderSide,
        body: String,
    ) -> AppResult<Message>;

    /// Mark the other side's unread messages as read; returns how many changed.
    async fn mark_read(&self, conversation_id: Uuid, reader: SenderSide) -> AppResult<u64>;

    async fn set_status(&self, id: Uuid, status: ConversationStatus) -> AppResult<Conversation>;

    /// Unread messages addressed to `viewer` across a store's conversations
    async fn unread_count(&self, store_id: Uuid, viewer: SenderSide) -> AppResult<u64>;
}

pub struct MessageStore {
    db: DatabaseConnection,
}

impl MessageStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MessageRepository for MessageStore {
    async fn find_conversation(
        &self,
        store_scope: Option<Uuid>,
        id: Uuid,
    ) -> AppResult<Option<Conversation>> {
        let mut query = ConversationEntity::find_by_id(id);
        if let Some(store_id) = store_scope {
            query = query.filter(conversation::Column::StoreId.eq(store_id));
        }

        let result = query.one(&self.db).await?;
        result.map(Conversation::try_from).transpose()
    }

    async fn list_conversations(
        &self,
        store_scope: Option<Uuid>,
        viewer: SenderSide,
        status: Option<ConversationStatus>,
        pagination: PaginationParams,
    ) -> AppResult<(Vec<ConversationSummary>, u64)> {
        let mut query = ConversationEntity::find();
        if let Some(store_id) = store_scope {
            query = query.filter(conversation::Column::StoreId.eq(store_id));
        }
        if let Some(status) = status {
            query = query.filter(conversation::Column::Status.eq(status.as_str()));
        }

        let paginator = query
            .order_by_desc(conversation::Column::LastMessageAt)
            .paginate(&self.db, pagination.limit());
        let total = paginator.num_items().await?;
        let models = paginator.fetch_page(pagination.page.saturating_sub(1)).await?;

        let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
        let unread: Vec<(Uuid, i64)> = if ids.is_empty() {
            Vec::new()
        } else {
            unread_query(viewer)
                .select_only()
                .column(message::Column::ConversationId)
                .column_as(Expr::col(message::Column::Id).count(), "unread")
                .filter(message::Column::ConversationId.is_in(ids))
                .group_by(message::Column::ConversationId)
                .into_tuple()
                .all(&self.db)
                .await?
        };

        let summaries = models
            .into_iter()
            .map(|model| {
                let count = unread
                    .iter()
                    .find(|(id, _)| *id == model.id)
                    .map(|(_, n)| (*n).max(0) as u64)
                    .unwrap_or(0);
                Ok(ConversationSummary {
                    conversation: Conversation::try_from(model)?,
                    unread: count,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok((summaries, total))
    }

    async fn start(
        &self,
        store_id: Uuid,
        subject: String,
        author_id: Uuid,
        side: SenderSide,
        body: String,
    ) -> AppResult<(Conversation, Message)> {
        let txn = self.db.begin().await?;
        let now = Utc::now();

        let conversation = conversation::ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(store_id),
            subject: Set(subject),
            status: Set(ConversationStatus::Open.as_str().to_string()),
            created_by: Set(author_id),
            last_message_at: Set(now),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let message = insert_message(&txn, conversation.id, author_id, side, body).await?;
        txn.commit().await?;

        Ok((Conversation::try_from(conversation)?, message))
    }

    async fn messages(&self, conversation_id: Uuid) -> AppResult<Vec<Message>> {
        let models = MessageEntity::find()
            .filter(message::Column::ConversationId.eq(conversation_id))
            .order_by_asc(message::Column::CreatedAt)
            .all(&self.db)
            .await?;

        models.into_iter().map(Message::try_from).collect()
    }

    async fn add_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        side: SenderSide,
        body: String,
    ) -> AppResult<Message> {
        let txn = self.db.begin().await?;

        let message = insert_message(&txn, conversation_id, sender_id, side, body).await?;
        ConversationEntity::update_many()
            .col_expr(
                conversation::Column::LastMessageAt,
                Expr::value(message.created_at),
            )
            .col_expr(conversation::Column::UpdatedAt, Expr::value(message.created_at))
            .filter(conversation::Column::Id.eq(conversation_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(message)
    }

    async fn mark_read(&self, conversation_id: Uuid, reader: SenderSide) -> AppResult<u64> {
        let result = MessageEntity::update_many()
            .col_expr(message::Column::ReadAt, Expr::value(Some(Utc::now())))
            .filter(message::Column::ConversationId.eq(conversation_id))
            .filter(message::Column::SenderSide.eq(reader.other().as_str()))
            .filter(message::Column::ReadAt.is_null())
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }

    async fn set_status(&self, id: Uuid, status: ConversationStatus) -> AppResult<Conversation> {
        let model = ConversationEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut active: conversation::ActiveModel = model.into();
        active.status = Set(status.as_str().to_string());
        active.updated_at = Set(Utc::now());

        let model = active.update(&self.db).await?;
        Conversation::try_from(model)
    }

    async fn unread_count(&self, store_id: Uuid, viewer: SenderSide) -> AppResult<u64> {
        unread_query(viewer)
            .filter(
                message::Column::ConversationId.in_subquery(
                    Query::select()
                        .column(conversation::Column::Id)
                        .from(ConversationEntity)
                        .and_where(conversation::Column::StoreId.eq(store_id))
                        .to_owned(),
                ),
            )
            .count(&self.db)
            .await
            .map_err(AppError::from)
    }
}

/// Unread messages written by the other side
fn unread_query(viewer: SenderSide) -> sea_orm::Select<MessageEntity> {
    MessageEntity::find()
        .filter(message::Column::SenderSide.eq(viewer.other().as_str()))
        .filter(message::Column::ReadAt.is_null())
}

async fn insert_message<C: ConnectionTrait>(
    conn: &C,
    conversation_id: Uuid,
    sender_id: Uuid,
    side: SenderSide,
    body: String,
) -> AppResult<Message> {
    let model = message::ActiveModel {
        id: Set(Uuid::new_v4()),
        conversation_id: Set(conversation_id),
        sender_id: Set(sender_id),
        sender_side: Set(side.as_str().to_string()),
        body: Set(body),
        read_at: Set(None),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await?;

    Message::try_from(model)
}
