//! In-process entity store.
//!
//! Implements every repository trait and the read projection over
//! `parking_lot` maps. Backs local development (`database.backend = "memory"`)
//! and the test suites. Each mutation runs under a single write lock, which
//! gives it the same atomicity the PostgreSQL conditional updates provide.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::domain::projections::{hydrate_chat, hydrate_message, sort_newest_first};
use crate::domain::{
    Chat, ChatProjection, ChatRepository, ChatView, DirectChatInsert, Message, MessageRepository,
    MessageView, User, UserRepository, UserSummary,
};
use crate::shared::error::AppError;

#[derive(Default)]
pub struct InMemoryStore {
    users: RwLock<HashMap<i64, User>>,
    chats: RwLock<HashMap<i64, Chat>>,
    messages: RwLock<HashMap<i64, Message>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user record. Users are otherwise owned by the account service.
    pub fn insert_user(&self, user: User) {
        self.users.write().insert(user.id, user);
    }

    fn summaries(&self, ids: impl IntoIterator<Item = i64>) -> HashMap<i64, UserSummary> {
        let users = self.users.read();
        ids.into_iter()
            .filter_map(|id| users.get(&id).map(|u| (id, UserSummary::from(u))))
            .collect()
    }

    fn hydrate(&self, chat: &Chat) -> ChatView {
        let last = chat
            .last_message_id
            .and_then(|id| self.messages.read().get(&id).cloned());
        let mut ids = chat.participants.clone();
        if let Some(m) = &last {
            ids.push(m.sender_id);
        }
        let users = self.summaries(ids);
        hydrate_chat(chat, &users, last.as_ref())
    }

    fn hydrate_msg(&self, message: &Message) -> MessageView {
        let sender = self
            .users
            .read()
            .get(&message.sender_id)
            .map(UserSummary::from);
        hydrate_message(message, sender)
    }

    fn update_chat<F>(&self, id: i64, apply: F) -> Option<Chat>
    where
        F: FnOnce(&mut Chat) -> bool,
    {
        let mut chats = self.chats.write();
        let chat = chats.get_mut(&id)?;
        if !apply(chat) {
            return None;
        }
        chat.updated_at = Utc::now();
        Some(chat.clone())
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.users.read().get(&id).cloned())
    }

    async fn existing_ids(&self, ids: &[i64]) -> Result<Vec<i64>, AppError> {
        let users = self.users.read();
        Ok(ids.iter().copied().filter(|id| users.contains_key(id)).collect())
    }
}

#[async_trait]
impl ChatRepository for InMemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Chat>, AppError> {
        Ok(self.chats.read().get(&id).cloned())
    }

    async fn find_direct(&self, user_a: i64, user_b: i64) -> Result<Option<Chat>, AppError> {
        let key = crate::domain::direct_pair_key(user_a, user_b);
        Ok(self
            .chats
            .read()
            .values()
            .find(|c| c.direct_pair_key().as_deref() == Some(key.as_str()))
            .cloned())
    }

    async fn create_direct(&self, chat: &Chat) -> Result<DirectChatInsert, AppError> {
        let key = chat
            .direct_pair_key()
            .ok_or_else(|| AppError::Internal("Not a direct chat".to_string()))?;

        let mut chats = self.chats.write();
        if let Some(existing) = chats
            .values()
            .find(|c| c.direct_pair_key().as_deref() == Some(key.as_str()))
        {
            return Ok(DirectChatInsert {
                chat: existing.clone(),
                created: false,
            });
        }
        chats.insert(chat.id, chat.clone());
        Ok(DirectChatInsert {
            chat: chat.clone(),
            created: true,
        })
    }

    async fn create_group(&self, chat: &Chat) -> Result<Chat, AppError> {
        self.chats.write().insert(chat.id, chat.clone());
        Ok(chat.clone())
    }

    async fn rename(&self, id: i64, name: &str) -> Result<Option<Chat>, AppError> {
        Ok(self.update_chat(id, |chat| {
            chat.name = Some(name.to_string());
            true
        }))
    }

    async fn add_participant(&self, id: i64, user_id: i64) -> Result<Option<Chat>, AppError> {
        Ok(self.update_chat(id, |chat| {
            if chat.participants.contains(&user_id) {
                return false;
            }
            chat.participants.push(user_id);
            true
        }))
    }

    async fn remove_participant(
        &self,
        id: i64,
        user_id: i64,
    ) -> Result<Option<Chat>, AppError> {
        Ok(self.update_chat(id, |chat| {
            let before = chat.participants.len();
            chat.participants.retain(|p| *p != user_id);
            chat.participants.len() != before
        }))
    }

    async fn advance_last_message(&self, id: i64, message_id: i64) -> Result<bool, AppError> {
        Ok(self
            .update_chat(id, |chat| {
                if chat.last_message_id.is_some_and(|current| current >= message_id) {
                    return false;
                }
                chat.last_message_id = Some(message_id);
                true
            })
            .is_some())
    }

    async fn delete_with_messages(&self, id: i64) -> Result<Option<Vec<Message>>, AppError> {
        // Lock order is chats then messages, matching `create`.
        let mut chats = self.chats.write();
        if chats.remove(&id).is_none() {
            return Ok(None);
        }
        let mut messages = self.messages.write();
        let ids: Vec<i64> = messages
            .values()
            .filter(|m| m.chat_id == id)
            .map(|m| m.id)
            .collect();
        Ok(Some(ids.iter().filter_map(|mid| messages.remove(mid)).collect()))
    }
}

#[async_trait]
impl MessageRepository for InMemoryStore {
    async fn find_by_chat(&self, chat_id: i64) -> Result<Vec<Message>, AppError> {
        let mut messages: Vec<Message> = self
            .messages
            .read()
            .values()
            .filter(|m| m.chat_id == chat_id)
            .cloned()
            .collect();
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(messages)
    }

    async fn create(&self, message: &Message) -> Result<Message, AppError> {
        // Held until the insert lands so a concurrent chat delete cannot
        // slip in between the check and the write.
        let chats = self.chats.read();
        if !chats.contains_key(&message.chat_id) {
            return Err(AppError::NotFound("Chat does not exist".to_string()));
        }
        self.messages.write().insert(message.id, message.clone());
        Ok(message.clone())
    }
}

#[async_trait]
impl ChatProjection for InMemoryStore {
    async fn chat_view(&self, chat_id: i64) -> Result<Option<ChatView>, AppError> {
        let chat = self.chats.read().get(&chat_id).cloned();
        Ok(chat.map(|c| self.hydrate(&c)))
    }

    async fn chat_views_for_user(&self, user_id: i64) -> Result<Vec<ChatView>, AppError> {
        let mut chats: Vec<Chat> = self
            .chats
            .read()
            .values()
            .filter(|c| c.is_participant(user_id))
            .cloned()
            .collect();
        chats.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        Ok(chats.iter().map(|c| self.hydrate(c)).collect())
    }

    async fn message_view(&self, message_id: i64) -> Result<Option<MessageView>, AppError> {
        let message = self.messages.read().get(&message_id).cloned();
        Ok(message.map(|m| self.hydrate_msg(&m)))
    }

    async fn message_views_for_chat(&self, chat_id: i64) -> Result<Vec<MessageView>, AppError> {
        let messages: Vec<Message> = self
            .messages
            .read()
            .values()
            .filter(|m| m.chat_id == chat_id)
            .cloned()
            .collect();
        let mut views: Vec<MessageView> = messages.iter().map(|m| self.hydrate_msg(m)).collect();
        sort_newest_first(&mut views);
        Ok(views)
    }

    async fn user_summaries_except(&self, user_id: i64) -> Result<Vec<UserSummary>, AppError> {
        let mut summaries: Vec<UserSummary> = self
            .users
            .read()
            .values()
            .filter(|u| u.id != user_id)
            .map(UserSummary::from)
            .collect();
        summaries.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(summaries)
    }
}
