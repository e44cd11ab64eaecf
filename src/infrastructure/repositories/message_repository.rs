//! Message Repository Implementation
//!
//! PostgreSQL implementation of message storage. Attachments live in a JSONB
//! column on the message row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::domain::{Attachment, Message, MessageRepository};
use crate::shared::error::AppError;

pub(super) const MESSAGE_COLUMNS: &str =
    "id, chat_id, sender_id, content, attachments, created_at, updated_at";

/// Internal row type for message queries.
/// Maps to the messages table schema defined in the migration.
#[derive(Debug, sqlx::FromRow)]
pub(super) struct MessageRow {
    pub id: i64,
    pub chat_id: i64,
    pub sender_id: i64,
    pub content: Option<String>,
    pub attachments: Json<Vec<Attachment>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MessageRow {
    /// Converts database row to domain Message entity.
    pub fn into_message(self) -> Message {
        Message {
            id: self.id,
            chat_id: self.chat_id,
            sender_id: self.sender_id,
            content: self.content,
            attachments: self.attachments.0,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// PostgreSQL message repository implementation.
#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    /// Creates a new PgMessageRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    /// Messages are returned in descending order (newest first).
    async fn find_by_chat(&self, chat_id: i64) -> Result<Vec<Message>, AppError> {
        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
            FROM messages
            WHERE chat_id = $1
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_message()).collect())
    }

    /// The insert reads the chat row under a share lock, so it waits for an
    /// in-flight chat delete and then inserts nothing.
    async fn create(&self, message: &Message) -> Result<Message, AppError> {
        let row = sqlx::query_as::<_, MessageRow>(&format!(
            r#"
            INSERT INTO messages (id, chat_id, sender_id, content, attachments, created_at, updated_at)
            SELECT $1, c.id, $3, $4, $5, $6, $7
            FROM chats c
            WHERE c.id = $2
            FOR SHARE
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(message.id)
        .bind(message.chat_id)
        .bind(message.sender_id)
        .bind(&message.content)
        .bind(Json(&message.attachments))
        .bind(message.created_at)
        .bind(message.updated_at)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_message())
            .ok_or_else(|| AppError::NotFound("Chat does not exist".to_string()))
    }
}
