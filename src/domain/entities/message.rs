//! Message entity and repository trait.
//!
//! Maps to the `messages` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::attachment::Attachment;
use crate::shared::error::AppError;

/// Represents a message in a chat.
///
/// Maps to the `messages` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - chat_id: BIGINT NOT NULL REFERENCES chats(id)
/// - sender_id: BIGINT NOT NULL
/// - content: TEXT NULL
/// - attachments: JSONB NOT NULL DEFAULT '[]'
/// - created_at / updated_at: TIMESTAMPTZ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Snowflake ID (primary key)
    pub id: i64,

    /// Chat the message belongs to
    pub chat_id: i64,

    /// Author user ID
    pub sender_id: i64,

    /// Text body, if any
    pub content: Option<String>,

    /// Attached files, in upload order
    pub attachments: Vec<Attachment>,

    /// Timestamp when message was sent
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Message {
    /// A message must carry text or at least one attachment.
    pub fn has_payload(content: Option<&str>, attachments: &[Attachment]) -> bool {
        content.map(|c| !c.trim().is_empty()).unwrap_or(false) || !attachments.is_empty()
    }
}

/// Repository trait for Message data access operations.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// All messages of a chat, newest first.
    async fn find_by_chat(&self, chat_id: i64) -> Result<Vec<Message>, AppError>;

    /// Create a new message. Fails with NotFound if the chat is gone.
    async fn create(&self, message: &Message) -> Result<Message, AppError>;
}
