//! Read-side projections.
//!
//! Hydrated views expand user ids into profile summaries. They are produced
//! by a [`ChatProjection`] implementation and never written back; mutations go
//! through the repositories in [`crate::domain::entities`].

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entities::{Attachment, Chat, Message, User};
use crate::shared::error::AppError;
use crate::shared::snowflake;

/// Public profile fields of a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    #[serde(with = "snowflake::as_string")]
    pub id: i64,
    pub username: String,
    pub avatar: Option<String>,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            avatar: user.avatar.clone(),
            email: user.email.clone(),
        }
    }
}

/// The last message of a chat, as embedded in a [`ChatView`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastMessageView {
    #[serde(with = "snowflake::as_string")]
    pub id: i64,
    /// None when the sender account no longer exists
    pub sender: Option<UserSummary>,
    pub content: Option<String>,
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
}

/// A chat with participants and last message expanded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatView {
    #[serde(with = "snowflake::as_string")]
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub is_group_chat: bool,
    pub participants: Vec<UserSummary>,
    #[serde(with = "snowflake::as_string")]
    pub admin: i64,
    pub last_message: Option<LastMessageView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatView {
    /// Whether `user_id` appears among the hydrated participants.
    pub fn has_participant(&self, user_id: i64) -> bool {
        self.participants.iter().any(|p| p.id == user_id)
    }
}

/// A message with its sender expanded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    #[serde(with = "snowflake::as_string")]
    pub id: i64,
    pub sender: Option<UserSummary>,
    pub content: Option<String>,
    pub attachments: Vec<Attachment>,
    #[serde(rename = "chat", with = "snowflake::as_string")]
    pub chat_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Join-style reads over the entity store.
#[async_trait]
pub trait ChatProjection: Send + Sync {
    /// Hydrate a single chat.
    async fn chat_view(&self, chat_id: i64) -> Result<Option<ChatView>, AppError>;

    /// Hydrate every chat `user_id` participates in, most recently updated first.
    async fn chat_views_for_user(&self, user_id: i64) -> Result<Vec<ChatView>, AppError>;

    /// Hydrate a single message.
    async fn message_view(&self, message_id: i64) -> Result<Option<MessageView>, AppError>;

    /// Hydrate the messages of a chat, newest first.
    async fn message_views_for_chat(&self, chat_id: i64) -> Result<Vec<MessageView>, AppError>;

    /// Profile summaries of every user except `user_id`.
    async fn user_summaries_except(&self, user_id: i64) -> Result<Vec<UserSummary>, AppError>;
}

/// Join a chat with already-loaded users and last message.
///
/// Participants whose user record is missing are dropped, matching a left
/// join that projects only matched rows.
pub fn hydrate_chat(
    chat: &Chat,
    users: &HashMap<i64, UserSummary>,
    last_message: Option<&Message>,
) -> ChatView {
    ChatView {
        id: chat.id,
        name: chat.name.clone(),
        is_group_chat: chat.is_group_chat,
        participants: chat
            .participants
            .iter()
            .filter_map(|id| users.get(id).cloned())
            .collect(),
        admin: chat.admin,
        last_message: last_message.map(|m| LastMessageView {
            id: m.id,
            sender: users.get(&m.sender_id).cloned(),
            content: m.content.clone(),
            attachments: m.attachments.clone(),
            created_at: m.created_at,
        }),
        created_at: chat.created_at,
        updated_at: chat.updated_at,
    }
}

/// Join a message with its sender.
pub fn hydrate_message(message: &Message, sender: Option<UserSummary>) -> MessageView {
    MessageView {
        id: message.id,
        sender,
        content: message.content.clone(),
        attachments: message.attachments.clone(),
        chat_id: message.chat_id,
        created_at: message.created_at,
        updated_at: message.updated_at,
    }
}

/// Newest first; equal timestamps fall back to the (time-ordered) id.
pub fn sort_newest_first(views: &mut [MessageView]) {
    views.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}
