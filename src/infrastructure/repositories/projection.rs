//! Chat Projection Implementation
//!
//! Hydrated reads over PostgreSQL. Each read loads the chat or message rows
//! first, then the referenced users and last messages in one batched query
//! each, and joins them in memory.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;

use super::chat_repository::{ChatRow, CHAT_COLUMNS};
use super::message_repository::{MessageRow, MESSAGE_COLUMNS};
use super::user_repository::UserRow;
use crate::domain::projections::{hydrate_chat, hydrate_message};
use crate::domain::{Chat, ChatProjection, ChatView, Message, MessageView, UserSummary};
use crate::shared::error::AppError;

/// PostgreSQL read projection.
#[derive(Clone)]
pub struct PgChatProjection {
    pool: PgPool,
}

impl PgChatProjection {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn summaries(&self, ids: &[i64]) -> Result<HashMap<i64, UserSummary>, AppError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, email, avatar_url, created_at, updated_at
            FROM users
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| {
                let user = r.into_user();
                (user.id, UserSummary::from(&user))
            })
            .collect())
    }

    async fn messages_by_id(&self, ids: &[i64]) -> Result<HashMap<i64, Message>, AppError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| {
                let message = r.into_message();
                (message.id, message)
            })
            .collect())
    }

    async fn hydrate_chats(&self, chats: Vec<Chat>) -> Result<Vec<ChatView>, AppError> {
        let last_ids: Vec<i64> = chats.iter().filter_map(|c| c.last_message_id).collect();
        let last_messages = self.messages_by_id(&last_ids).await?;

        let mut user_ids: Vec<i64> = chats
            .iter()
            .flat_map(|c| c.participants.iter().copied())
            .chain(last_messages.values().map(|m| m.sender_id))
            .collect();
        user_ids.sort_unstable();
        user_ids.dedup();
        let users = self.summaries(&user_ids).await?;

        Ok(chats
            .iter()
            .map(|chat| {
                let last = chat.last_message_id.and_then(|id| last_messages.get(&id));
                hydrate_chat(chat, &users, last)
            })
            .collect())
    }

    async fn hydrate_messages(&self, messages: Vec<Message>) -> Result<Vec<MessageView>, AppError> {
        let mut sender_ids: Vec<i64> = messages.iter().map(|m| m.sender_id).collect();
        sender_ids.sort_unstable();
        sender_ids.dedup();
        let users = self.summaries(&sender_ids).await?;

        Ok(messages
            .iter()
            .map(|m| hydrate_message(m, users.get(&m.sender_id).cloned()))
            .collect())
    }
}

#[async_trait]
impl ChatProjection for PgChatProjection {
    async fn chat_view(&self, chat_id: i64) -> Result<Option<ChatView>, AppError> {
        let row = sqlx::query_as::<_, ChatRow>(&format!(
            "SELECT {CHAT_COLUMNS} FROM chats WHERE id = $1"
        ))
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(chat) = row.map(|r| r.into_chat()) else {
            return Ok(None);
        };
        Ok(self.hydrate_chats(vec![chat]).await?.into_iter().next())
    }

    async fn chat_views_for_user(&self, user_id: i64) -> Result<Vec<ChatView>, AppError> {
        let rows = sqlx::query_as::<_, ChatRow>(&format!(
            r#"
            SELECT {CHAT_COLUMNS}
            FROM chats
            WHERE $1 = ANY(participants)
            ORDER BY updated_at DESC, id DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate_chats(rows.into_iter().map(|r| r.into_chat()).collect())
            .await
    }

    async fn message_view(&self, message_id: i64) -> Result<Option<MessageView>, AppError> {
        let message = self.messages_by_id(&[message_id]).await?.remove(&message_id);
        let Some(message) = message else {
            return Ok(None);
        };
        Ok(self.hydrate_messages(vec![message]).await?.into_iter().next())
    }

    async fn message_views_for_chat(&self, chat_id: i64) -> Result<Vec<MessageView>, AppError> {
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

        self.hydrate_messages(rows.into_iter().map(|r| r.into_message()).collect())
            .await
    }

    async fn user_summaries_except(&self, user_id: i64) -> Result<Vec<UserSummary>, AppError> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, email, avatar_url, created_at, updated_at
            FROM users
            WHERE id <> $1
            ORDER BY username
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| UserSummary::from(&r.into_user()))
            .collect())
    }
}
