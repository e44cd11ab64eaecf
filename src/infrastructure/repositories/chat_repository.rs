//! Chat Repository Implementation
//!
//! PostgreSQL implementation of the ChatRepository trait. Membership and
//! last-message changes are single conditional UPDATEs, so concurrent
//! requests are serialized by the row lock instead of a read-modify-write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::message_repository::{MessageRow, MESSAGE_COLUMNS};
use crate::domain::{direct_pair_key, Chat, ChatRepository, DirectChatInsert, Message};
use crate::shared::error::AppError;

pub(super) const CHAT_COLUMNS: &str = "id, name, is_group_chat, participants, admin_id, \
     last_message_id, created_at, updated_at";

/// Database row representation of the chats table.
#[derive(Debug, sqlx::FromRow)]
pub(super) struct ChatRow {
    pub id: i64,
    pub name: Option<String>,
    pub is_group_chat: bool,
    pub participants: Vec<i64>,
    pub admin_id: i64,
    pub last_message_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatRow {
    pub fn into_chat(self) -> Chat {
        Chat {
            id: self.id,
            name: self.name,
            is_group_chat: self.is_group_chat,
            participants: self.participants,
            admin: self.admin_id,
            last_message_id: self.last_message_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// PostgreSQL chat repository implementation.
#[derive(Clone)]
pub struct PgChatRepository {
    pool: PgPool,
}

impl PgChatRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert(&self, chat: &Chat, pair_key: Option<String>) -> Result<Option<Chat>, AppError> {
        let row = sqlx::query_as::<_, ChatRow>(&format!(
            r#"
            INSERT INTO chats (id, name, is_group_chat, participants, admin_id,
                               direct_pair_key, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (direct_pair_key) DO NOTHING
            RETURNING {CHAT_COLUMNS}
            "#
        ))
        .bind(chat.id)
        .bind(&chat.name)
        .bind(chat.is_group_chat)
        .bind(&chat.participants)
        .bind(chat.admin)
        .bind(pair_key)
        .bind(chat.created_at)
        .bind(chat.updated_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_chat()))
    }
}

#[async_trait]
impl ChatRepository for PgChatRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Chat>, AppError> {
        let row = sqlx::query_as::<_, ChatRow>(&format!(
            "SELECT {CHAT_COLUMNS} FROM chats WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_chat()))
    }

    async fn find_direct(&self, user_a: i64, user_b: i64) -> Result<Option<Chat>, AppError> {
        let row = sqlx::query_as::<_, ChatRow>(&format!(
            "SELECT {CHAT_COLUMNS} FROM chats WHERE direct_pair_key = $1"
        ))
        .bind(direct_pair_key(user_a, user_b))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_chat()))
    }

    /// Relies on the unique pair key: a losing concurrent insert does nothing
    /// and the winner's row is returned instead.
    async fn create_direct(&self, chat: &Chat) -> Result<DirectChatInsert, AppError> {
        let (user_a, user_b) = match chat.participants.as_slice() {
            [a, b] if !chat.is_group_chat => (*a, *b),
            _ => return Err(AppError::Internal("Not a direct chat".to_string())),
        };

        if let Some(created) = self.insert(chat, chat.direct_pair_key()).await? {
            return Ok(DirectChatInsert {
                chat: created,
                created: true,
            });
        }

        let existing = self
            .find_direct(user_a, user_b)
            .await?
            .ok_or_else(|| AppError::Internal("Direct chat vanished after conflict".to_string()))?;
        Ok(DirectChatInsert {
            chat: existing,
            created: false,
        })
    }

    async fn create_group(&self, chat: &Chat) -> Result<Chat, AppError> {
        self.insert(chat, None)
            .await?
            .ok_or_else(|| AppError::Internal("Group chat insert returned no row".to_string()))
    }

    async fn rename(&self, id: i64, name: &str) -> Result<Option<Chat>, AppError> {
        let row = sqlx::query_as::<_, ChatRow>(&format!(
            r#"
            UPDATE chats SET name = $2, updated_at = NOW()
            WHERE id = $1 AND is_group_chat
            RETURNING {CHAT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_chat()))
    }

    async fn add_participant(&self, id: i64, user_id: i64) -> Result<Option<Chat>, AppError> {
        let row = sqlx::query_as::<_, ChatRow>(&format!(
            r#"
            UPDATE chats SET participants = array_append(participants, $2), updated_at = NOW()
            WHERE id = $1 AND NOT ($2 = ANY(participants))
            RETURNING {CHAT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_chat()))
    }

    async fn remove_participant(
        &self,
        id: i64,
        user_id: i64,
    ) -> Result<Option<Chat>, AppError> {
        let row = sqlx::query_as::<_, ChatRow>(&format!(
            r#"
            UPDATE chats SET participants = array_remove(participants, $2), updated_at = NOW()
            WHERE id = $1 AND $2 = ANY(participants)
            RETURNING {CHAT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_chat()))
    }

    async fn advance_last_message(&self, id: i64, message_id: i64) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE chats SET last_message_id = $2, updated_at = NOW()
            WHERE id = $1 AND (last_message_id IS NULL OR last_message_id < $2)
            "#,
        )
        .bind(id)
        .bind(message_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_with_messages(&self, id: i64) -> Result<Option<Vec<Message>>, AppError> {
        let mut tx = self.pool.begin().await?;

        // Blocks message inserts, which take a share lock on the same row.
        let locked: Option<i64> = sqlx::query_scalar("SELECT id FROM chats WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Ok(None);
        }

        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            "DELETE FROM messages WHERE chat_id = $1 RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM chats WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some(rows.into_iter().map(|r| r.into_message()).collect()))
    }
}
