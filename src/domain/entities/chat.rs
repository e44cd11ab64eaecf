//! Chat entity and repository trait.
//!
//! Maps to the `chats` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Message;
use crate::shared::error::AppError;

/// A one-on-one or group conversation.
///
/// Maps to the `chats` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - name: VARCHAR(100) NULL -- always NULL for direct chats
/// - is_group_chat: BOOLEAN NOT NULL
/// - participants: BIGINT[] NOT NULL -- ordered, no duplicates
/// - admin_id: BIGINT NOT NULL -- member of participants
/// - last_message_id: BIGINT NULL
/// - direct_pair_key: TEXT NULL UNIQUE -- "<low>:<high>" for direct chats
/// - created_at / updated_at: TIMESTAMPTZ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    /// Snowflake ID (primary key)
    pub id: i64,

    /// Group name (None for direct chats)
    pub name: Option<String>,

    /// Whether this is a group chat
    pub is_group_chat: bool,

    /// Participant user IDs, in insertion order
    pub participants: Vec<i64>,

    /// Admin user ID; the creator of the chat
    pub admin: i64,

    /// Most recent message in the chat
    pub last_message_id: Option<i64>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp (bumped by renames, membership changes and sends)
    pub updated_at: DateTime<Utc>,
}

impl Chat {
    /// Build a new direct chat between `actor` and `peer`, administered by `actor`.
    pub fn new_direct(id: i64, actor: i64, peer: i64, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: None,
            is_group_chat: false,
            participants: vec![actor, peer],
            admin: actor,
            last_message_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Build a new group chat. `participants` must already contain `admin`.
    pub fn new_group(
        id: i64,
        name: String,
        admin: i64,
        participants: Vec<i64>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: Some(name),
            is_group_chat: true,
            participants,
            admin,
            last_message_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if a user belongs to this chat.
    pub fn is_participant(&self, user_id: i64) -> bool {
        self.participants.contains(&user_id)
    }

    /// Check if a user administers this chat.
    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin == user_id
    }

    /// Participants other than `user_id`.
    pub fn participants_except(&self, user_id: i64) -> impl Iterator<Item = i64> + '_ {
        self.participants.iter().copied().filter(move |p| *p != user_id)
    }

    /// Unique key of a direct chat's unordered participant pair.
    pub fn direct_pair_key(&self) -> Option<String> {
        match (self.is_group_chat, self.participants.as_slice()) {
            (false, [a, b]) => Some(direct_pair_key(*a, *b)),
            _ => None,
        }
    }
}

/// Canonical key for the unordered pair `{a, b}`.
pub fn direct_pair_key(a: i64, b: i64) -> String {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    format!("{}:{}", low, high)
}

/// Outcome of an idempotent direct chat insert.
#[derive(Debug, Clone)]
pub struct DirectChatInsert {
    pub chat: Chat,
    /// False when a chat for the pair already existed and was returned instead.
    pub created: bool,
}

/// Repository trait for Chat data access operations.
///
/// Membership mutations are single conditional updates so that concurrent
/// requests cannot add a participant twice or remove one that is gone.
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Find a chat by its Snowflake ID.
    async fn find_by_id(&self, id: i64) -> Result<Option<Chat>, AppError>;

    /// Find the direct (non-group) chat between two users.
    async fn find_direct(&self, user_a: i64, user_b: i64) -> Result<Option<Chat>, AppError>;

    /// Insert a direct chat unless one already exists for the pair.
    async fn create_direct(&self, chat: &Chat) -> Result<DirectChatInsert, AppError>;

    /// Insert a group chat.
    async fn create_group(&self, chat: &Chat) -> Result<Chat, AppError>;

    /// Set the name of a group chat.
    async fn rename(&self, id: i64, name: &str) -> Result<Option<Chat>, AppError>;

    /// Append a participant. Returns None if the chat is missing or already
    /// contains the user.
    async fn add_participant(&self, id: i64, user_id: i64) -> Result<Option<Chat>, AppError>;

    /// Remove a participant. Returns None if the chat is missing or does not
    /// contain the user.
    async fn remove_participant(&self, id: i64, user_id: i64)
        -> Result<Option<Chat>, AppError>;

    /// Move the last-message pointer forward.
    ///
    /// Applied only when `message_id` is greater than the current pointer, so
    /// racing senders converge on the newest message. Returns whether the
    /// pointer moved.
    async fn advance_last_message(&self, id: i64, message_id: i64) -> Result<bool, AppError>;

    /// Delete a chat together with every message it owns, as one step.
    ///
    /// A message insert racing with this either lands first and is returned
    /// with the rest, or fails because the chat is gone. Returns None if the
    /// chat does not exist.
    async fn delete_with_messages(&self, id: i64) -> Result<Option<Vec<Message>>, AppError>;
}
