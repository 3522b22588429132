//! Message service - Seller and platform-admin conversations.
//!
//! Sellers only see their own store's conversations; admins see all of them.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use super::actor::Actor;
use super::alerts::{self, notify_owner};
use crate::domain::{
    Conversation, ConversationStatus, ConversationSummary, ConversationThread, Message,
    Permission, SenderSide,
};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::UnitOfWork;
use crate::jobs::Notifier;
use crate::types::PaginationParams;

#[async_trait]
pub trait MessageService: Send + Sync {
    /// Open a conversation with platform support
    async fn start(&self, actor: &Actor, subject: String, body: String)
        -> AppResult<ConversationThread>;

    /// `store_filter` only applies to admins
    async fn list(
        &self,
        actor: &Actor,
        store_filter: Option<Uuid>,
        status: Option<ConversationStatus>,
        pagination: PaginationParams,
    ) -> AppResult<(Vec<ConversationSummary>, u64)>;

    async fn get(&self, actor: &Actor, id: Uuid) -> AppResult<ConversationThread>;

    async fn post(&self, actor: &Actor, id: Uuid, body: String) -> AppResult<Message>;

    /// Mark the other side's messages read; returns how many changed
    async fn mark_read(&self, actor: &Actor, id: Uuid) -> AppResult<u64>;

    async fn close(&self, actor: &Actor, id: Uuid) -> AppResult<Conversation>;

    async fn reopen(&self, actor: &Actor, id: Uuid) -> AppResult<Conversation>;
}

pub struct MessageManager<U: UnitOfWork> {
    uow: Arc<U>,
    notifier: Arc<dyn Notifier>,
}

impl<U: UnitOfWork> MessageManager<U> {
    pub fn new(uow: Arc<U>, notifier: Arc<dyn Notifier>) -> Self {
        Self { uow, notifier }
    }

    /// Store restriction for the caller; `None` means every store.
    fn scope(actor: &Actor) -> AppResult<Option<Uuid>> {
        match actor.side() {
            SenderSide::Admin => Ok(None),
            SenderSide::Seller => {
                actor.require(Permission::Messages)?;
                actor.store().map(Some)
            }
        }
    }

    async fn conversation(&self, actor: &Actor, id: Uuid) -> AppResult<Conversation> {
        let scope = Self::scope(actor)?;
        self.uow
            .messages()
            .find_conversation(scope, id)
            .await?
            .ok_or_not_found()
    }

    async fn change_status(
        &self,
        actor: &Actor,
        id: Uuid,
        next: ConversationStatus,
    ) -> AppResult<Conversation> {
        let conversation = self.conversation(actor, id).await?;
        let next = conversation.transition(next)?;

        let updated = self.uow.messages().set_status(id, next).await?;
        tracing::info!(
            conversation_id = %id,
            status = next.as_str(),
            by = %actor.user_id,
            "Conversation status changed"
        );
        Ok(updated)
    }
}

fn required(text: String, field: &str) -> AppResult<String> {
    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(AppError::validation(format!("{} must not be empty", field)));
    }
    Ok(text)
}

#[async_trait]
impl<U: UnitOfWork> MessageService for MessageManager<U> {
    async fn start(
        &self,
        actor: &Actor,
        subject: String,
        body: String,
    ) -> AppResult<ConversationThread> {
        if actor.side() != SenderSide::Seller {
            return Err(AppError::Forbidden);
        }
        actor.require(Permission::Messages)?;
        let store_id = actor.store()?;
        let subject = required(subject, "Subject")?;
        let body = required(body, "Message")?;

        let (conversation, message) = self
            .uow
            .messages()
            .start(store_id, subject, actor.user_id, SenderSide::Seller, body)
            .await?;
        tracing::info!(store_id = %store_id, conversation_id = %conversation.id, "Conversation started");

        Ok(ConversationThread {
            conversation,
            messages: vec![message],
        })
    }

    async fn list(
        &self,
        actor: &Actor,
        store_filter: Option<Uuid>,
        status: Option<ConversationStatus>,
        pagination: PaginationParams,
    ) -> AppResult<(Vec<ConversationSummary>, u64)> {
        let scope = Self::scope(actor)?.or(store_filter);
        self.uow
            .messages()
            .list_conversations(scope, actor.side(), status, pagination)
            .await
    }

    async fn get(&self, actor: &Actor, id: Uuid) -> AppResult<ConversationThread> {
        let conversation = self.conversation(actor, id).await?;
        let messages = self.uow.messages().messages(id).await?;
        Ok(ConversationThread {
            conversation,
            messages,
        })
    }

    async fn post(&self, actor: &Actor, id: Uuid, body: String) -> AppResult<Message> {
        let conversation = self.conversation(actor, id).await?;
        conversation.ensure_open()?;
        let body = required(body, "Message")?;

        let side = actor.side();
        let message = self
            .uow
            .messages()
            .add_message(id, actor.user_id, side, body)
            .await?;

        if side == SenderSide::Admin {
            notify_owner(
                self.uow.as_ref(),
                self.notifier.as_ref(),
                conversation.store_id,
                alerts::admin_reply(&conversation),
            )
            .await;
        }
        Ok(message)
    }

    async fn mark_read(&self, actor: &Actor, id: Uuid) -> AppResult<u64> {
        self.conversation(actor, id).await?;
        self.uow.messages().mark_read(id, actor.side()).await
    }

    async fn close(&self, actor: &Actor, id: Uuid) -> AppResult<Conversation> {
        self.change_status(actor, id, ConversationStatus::Closed)
            .await
    }

    async fn reopen(&self, actor: &Actor, id: Uuid) -> AppResult<Conversation> {
        self.change_status(actor, id, ConversationStatus::Open)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{StaffPermissions, User, UserRole};
    use crate::infra::repositories::{MockMessageRepository, MockUserRepository};
    use crate::jobs::MockNotifier;
    use crate::services::test_support::TestUow;
    use chrono::Utc;
    use mockall::predicate::eq;

    fn actor(role: UserRole, store_id: Option<Uuid>) -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            store_id,
            email: "someone@shop.example".into(),
            role,
            permissions: StaffPermissions::default(),
        }
    }

    fn conversation(store_id: Uuid, status: ConversationStatus) -> Conversation {
        let now = Utc::now();
        Conversation {
            id: Uuid::new_v4(),
            store_id,
            subject: "Payout delay".into(),
            status,
            created_by: Uuid::new_v4(),
            last_message_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    fn message(side: SenderSide) -> Message {
        Message {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
            sender_side: side,
            body: "hello".into(),
            read_at: None,
            created_at: Utc::now(),
        }
    }

    fn manager(
        messages: MockMessageRepository,
        users: MockUserRepository,
        notifier: MockNotifier,
    ) -> MessageManager<TestUow> {
        MessageManager::new(
            Arc::new(TestUow {
                messages: Arc::new(messages),
                users: Arc::new(users),
                ..Default::default()
            }),
            Arc::new(notifier),
        )
    }

    #[tokio::test]
    async fn test_seller_sees_only_own_store() {
        let store_id = Uuid::new_v4();
        let mut messages = MockMessageRepository::new();
        messages
            .expect_find_conversation()
            .with(eq(Some(store_id)), mockall::predicate::always())
            .returning(|_, _| Ok(None));

        let result = manager(messages, MockUserRepository::new(), MockNotifier::new())
            .get(&actor(UserRole::Owner, Some(store_id)), Uuid::new_v4())
            .await;
        assert!(matches!(result, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn test_admin_cannot_start_conversation() {
        let result = manager(
            MockMessageRepository::new(),
            MockUserRepository::new(),
            MockNotifier::new(),
        )
        .start(&actor(UserRole::Admin, None), "Hi".into(), "Hello".into())
        .await;
        assert!(matches!(result, Err(AppError::Forbidden)));
    }

    #[tokio::test]
    async fn test_staff_without_flag_forbidden() {
        let result = manager(
            MockMessageRepository::new(),
            MockUserRepository::new(),
            MockNotifier::new(),
        )
        .list(
            &actor(UserRole::Staff, Some(Uuid::new_v4())),
            None,
            None,
            PaginationParams::default(),
        )
        .await;
        assert!(matches!(result, Err(AppError::Forbidden)));
    }

    #[tokio::test]
    async fn test_admin_list_honours_store_filter() {
        let store_id = Uuid::new_v4();
        let mut messages = MockMessageRepository::new();
        messages
            .expect_list_conversations()
            .withf(move |scope, side, _, _| *scope == Some(store_id) && *side == SenderSide::Admin)
            .returning(|_, _, _, _| Ok((vec![], 0)));

        let (items, total) = manager(messages, MockUserRepository::new(), MockNotifier::new())
            .list(
                &actor(UserRole::Admin, None),
                Some(store_id),
                None,
                PaginationParams::default(),
            )
            .await
            .unwrap();
        assert!(items.is_empty());
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_post_to_closed_conversation_rejected() {
        let store_id = Uuid::new_v4();
        let mut messages = MockMessageRepository::new();
        messages
            .expect_find_conversation()
            .returning(move |_, _| Ok(Some(conversation(store_id, ConversationStatus::Closed))));
        messages.expect_add_message().never();

        let result = manager(messages, MockUserRepository::new(), MockNotifier::new())
            .post(
                &actor(UserRole::Owner, Some(store_id)),
                Uuid::new_v4(),
                "Any news?".into(),
            )
            .await;
        assert!(matches!(result, Err(AppError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_admin_reply_notifies_owner() {
        let store_id = Uuid::new_v4();
        let mut messages = MockMessageRepository::new();
        messages
            .expect_find_conversation()
            .with(eq(None::<Uuid>), mockall::predicate::always())
            .returning(move |_, _| Ok(Some(conversation(store_id, ConversationStatus::Open))));
        messages
            .expect_add_message()
            .returning(|_, _, side, _| Ok(message(side)));

        let mut users = MockUserRepository::new();
        users.expect_find_owner().with(eq(store_id)).returning(|id| {
            Ok(Some(User {
                id: Uuid::new_v4(),
                store_id: Some(id),
                email: "owner@shop.example".into(),
                password_hash: String::new(),
                name: "Owner".into(),
                role: UserRole::Owner,
                permissions: StaffPermissions::default(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
                deleted_at: None,
            }))
        });

        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(|job| job.to == "owner@shop.example" && job.subject.contains("Payout delay"))
            .times(1)
            .returning(|_| ());

        let sent = manager(messages, users, notifier)
            .post(&actor(UserRole::Admin, None), Uuid::new_v4(), "Fixed".into())
            .await
            .unwrap();
        assert_eq!(sent.sender_side, SenderSide::Admin);
    }

    #[tokio::test]
    async fn test_reopen_open_conversation_rejected() {
        let store_id = Uuid::new_v4();
        let mut messages = MockMessageRepository::new();
        messages
            .expect_find_conversation()
            .returning(move |_, _| Ok(Some(conversation(store_id, ConversationStatus::Open))));
        messages.expect_set_status().never();

        let result = manager(messages, MockUserRepository::new(), MockNotifier::new())
            .reopen(&actor(UserRole::Owner, Some(store_id)), Uuid::new_v4())
            .await;
        assert!(matches!(result, Err(AppError::InvalidState(_))));
    }
}
