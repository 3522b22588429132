//! Seller and platform-admin conversations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::user::UserRole;
use crate::errors::{AppError, AppResult};

/// Which party wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SenderSide {
    Seller,
    Admin,
}

impl SenderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderSide::Seller => "seller",
            SenderSide::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "seller" => Some(SenderSide::Seller),
            "admin" => Some(SenderSide::Admin),
            _ => None,
        }
    }

    pub fn for_role(role: UserRole) -> Self {
        if role.is_admin() {
            SenderSide::Admin
        } else {
            SenderSide::Seller
        }
    }

    pub fn other(&self) -> Self {
        match self {
            SenderSide::Seller => SenderSide::Admin,
            SenderSide::Admin => SenderSide::Seller,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Open,
    Closed,
}

impl ConversationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStatus::Open => "open",
            ConversationStatus::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(ConversationStatus::Open),
            "closed" => Some(ConversationStatus::Closed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Conversation {
    pub id: Uuid,
    pub store_id: Uuid,
    pub subject: String,
    pub status: ConversationStatus,
    pub created_by: Uuid,
    pub last_message_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn ensure_open(&self) -> AppResult<()> {
        match self.status {
            ConversationStatus::Open => Ok(()),
            ConversationStatus::Closed => Err(AppError::invalid_state(
                "Conversation is closed",
            )),
        }
    }

    /// Move to `next`, rejecting no-op changes.
    pub fn transition(&self, next: ConversationStatus) -> AppResult<ConversationStatus> {
        if self.status == next {
            return Err(AppError::invalid_state(format!(
                "Conversation is already {}",
                next.as_str()
            )));
        }
        Ok(next)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub sender_side: SenderSide,
    pub body: String,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Conversation row with the viewer's unread count
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConversationSummary {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub unread: u64,
}

/// Conversation with its messages, oldest first
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConversationThread {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub messages: Vec<Message>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation(status: ConversationStatus) -> Conversation {
        let now = Utc::now();
        Conversation {
            id: Uuid::new_v4(),
            store_id: Uuid::new_v4(),
            subject: "Payout delay".into(),
            status,
            created_by: Uuid::new_v4(),
            last_message_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_closed_conversation_rejects_posts() {
        let err = conversation(ConversationStatus::Closed)
            .ensure_open()
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
        assert!(conversation(ConversationStatus::Open).ensure_open().is_ok());
    }

    #[test]
    fn test_close_twice_rejected() {
        let c = conversation(ConversationStatus::Closed);
        assert!(c.transition(ConversationStatus::Closed).is_err());
        assert_eq!(
            c.transition(ConversationStatus::Open).unwrap(),
            ConversationStatus::Open
        );
    }

    #[test]
    fn test_sides() {
        assert_eq!(SenderSide::for_role(UserRole::Admin), SenderSide::Admin);
        assert_eq!(SenderSide::for_role(UserRole::Staff), SenderSide::Seller);
        assert_eq!(SenderSide::Seller.other(), SenderSide::Admin);
    }
}
