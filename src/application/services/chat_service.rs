//! Chat Service
//!
//! Creates direct and group chats, manages group membership and tears chats
//! down. Every operation that returns a chat returns its hydrated view, and
//! every change is announced to the affected users' rooms.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::application::events::{to_payload, ChatEvent, EventEmitter};
use crate::application::services::message_service::MessageService;
use crate::domain::services::membership;
use crate::domain::{
    Chat, ChatError, ChatProjection, ChatRepository, ChatView, UserRepository, UserSummary,
};
use crate::shared::snowflake::SnowflakeGenerator;

/// Chat service trait
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Return the direct chat between actor and peer, creating it on first use
    async fn get_or_create_direct_chat(&self, actor: i64, peer: i64)
        -> Result<ChatView, ChatError>;

    /// Create a group chat administered by the actor
    async fn create_group_chat(
        &self,
        actor: i64,
        request: CreateGroupChatDto,
    ) -> Result<ChatView, ChatError>;

    /// Get a group chat the actor belongs to
    async fn get_group_chat_details(&self, actor: i64, chat_id: i64)
        -> Result<ChatView, ChatError>;

    /// Rename a group chat (admin only)
    async fn rename_group_chat(
        &self,
        actor: i64,
        chat_id: i64,
        name: &str,
    ) -> Result<ChatView, ChatError>;

    /// Add a user to a group chat (admin only)
    async fn add_participant(
        &self,
        actor: i64,
        chat_id: i64,
        user_id: i64,
    ) -> Result<ChatView, ChatError>;

    /// Remove a user from a group chat (admin only)
    async fn remove_participant(
        &self,
        actor: i64,
        chat_id: i64,
        user_id: i64,
    ) -> Result<ChatView, ChatError>;

    /// Leave a group chat
    async fn leave_group_chat(&self, actor: i64, chat_id: i64) -> Result<ChatView, ChatError>;

    /// Delete a group chat with all its messages (admin only)
    async fn delete_group_chat(&self, actor: i64, chat_id: i64) -> Result<(), ChatError>;

    /// Delete a direct chat with all its messages
    async fn delete_direct_chat(&self, actor: i64, chat_id: i64) -> Result<(), ChatError>;

    /// Chats the actor participates in, most recently updated first
    async fn list_chats(&self, actor: i64) -> Result<Vec<ChatView>, ChatError>;

    /// Every user the actor could start a chat with
    async fn search_available_users(&self, actor: i64) -> Result<Vec<UserSummary>, ChatError>;
}

/// Create group chat request
#[derive(Debug, Clone)]
pub struct CreateGroupChatDto {
    pub name: String,
    /// Members other than the creator
    pub participants: Vec<i64>,
}

/// ChatService implementation
pub struct ChatServiceImpl<C, U, P>
where
    C: ChatRepository,
    U: UserRepository,
    P: ChatProjection,
{
    chat_repo: Arc<C>,
    user_repo: Arc<U>,
    projection: Arc<P>,
    messages: Arc<dyn MessageService>,
    events: Arc<dyn EventEmitter>,
    id_generator: Arc<SnowflakeGenerator>,
}

impl<C, U, P> ChatServiceImpl<C, U, P>
where
    C: ChatRepository,
    U: UserRepository,
    P: ChatProjection,
{
    pub fn new(
        chat_repo: Arc<C>,
        user_repo: Arc<U>,
        projection: Arc<P>,
        messages: Arc<dyn MessageService>,
        events: Arc<dyn EventEmitter>,
        id_generator: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            chat_repo,
            user_repo,
            projection,
            messages,
            events,
            id_generator,
        }
    }

    /// Hydrated view of a chat that was just written.
    async fn view(&self, chat_id: i64) -> Result<ChatView, ChatError> {
        self.projection
            .chat_view(chat_id)
            .await?
            .ok_or_else(|| ChatError::internal("Internal server error"))
    }

    fn notify(
        &self,
        recipients: impl IntoIterator<Item = i64>,
        event: ChatEvent,
        view: &ChatView,
    ) -> Result<(), ChatError> {
        let payload = to_payload(view)?;
        for user_id in recipients {
            self.events.emit_to_user(user_id, event, payload.clone());
        }
        Ok(())
    }

    async fn load_group(&self, chat_id: i64) -> Result<Chat, ChatError> {
        membership::require_group(self.chat_repo.find_by_id(chat_id).await?)
    }

    /// Explain a conditional membership update that matched nothing.
    async fn membership_conflict(&self, chat_id: i64, reason: ChatError) -> ChatError {
        match self.chat_repo.find_by_id(chat_id).await {
            Ok(Some(_)) => reason,
            Ok(None) => ChatError::not_found("Group chat does not exist"),
            Err(e) => e.into(),
        }
    }

    async fn ensure_user_exists(&self, user_id: i64, message: &str) -> Result<(), ChatError> {
        if self.user_repo.find_by_id(user_id).await?.is_none() {
            return Err(ChatError::not_found(message));
        }
        Ok(())
    }

    /// Snapshot, drop the chat with its messages and files, then announce.
    async fn delete_with_messages(&self, chat: &Chat, actor: i64) -> Result<(), ChatError> {
        let snapshot = self.view(chat.id).await?;

        self.messages.cascade_delete_messages(chat.id).await?;

        self.notify(chat.participants_except(actor), ChatEvent::DeleteChat, &snapshot)?;
        tracing::info!(chat_id = chat.id, actor, group = chat.is_group_chat, "Chat deleted");
        Ok(())
    }
}

#[async_trait]
impl<C, U, P> ChatService for ChatServiceImpl<C, U, P>
where
    C: ChatRepository + 'static,
    U: UserRepository + 'static,
    P: ChatProjection + 'static,
{
    async fn get_or_create_direct_chat(
        &self,
        actor: i64,
        peer: i64,
    ) -> Result<ChatView, ChatError> {
        self.ensure_user_exists(peer, "Receiver does not exist").await?;
        membership::ensure_distinct_peer(actor, peer)?;

        if let Some(existing) = self.chat_repo.find_direct(actor, peer).await? {
            return self.view(existing.id).await;
        }

        let chat = Chat::new_direct(self.id_generator.generate(), actor, peer, Utc::now());
        let insert = self.chat_repo.create_direct(&chat).await?;
        let view = self.view(insert.chat.id).await?;

        if insert.created {
            self.notify(insert.chat.participants_except(actor), ChatEvent::NewChat, &view)?;
            tracing::info!(chat_id = view.id, actor, peer, "Direct chat created");
        }

        Ok(view)
    }

    async fn create_group_chat(
        &self,
        actor: i64,
        request: CreateGroupChatDto,
    ) -> Result<ChatView, ChatError> {
        let name = membership::group_name(&request.name)?;
        let participants = membership::group_participants(actor, &request.participants)?;

        let others = &participants[1..];
        let existing = self.user_repo.existing_ids(others).await?;
        if existing.len() != others.len() {
            return Err(ChatError::not_found("One or more participants do not exist"));
        }

        let chat = Chat::new_group(
            self.id_generator.generate(),
            name,
            actor,
            participants,
            Utc::now(),
        );
        let chat = self.chat_repo.create_group(&chat).await?;
        let view = self.view(chat.id).await?;

        self.notify(chat.participants_except(actor), ChatEvent::NewChat, &view)?;
        tracing::info!(chat_id = chat.id, actor, members = chat.participants.len(), "Group chat created");

        Ok(view)
    }

    async fn get_group_chat_details(
        &self,
        actor: i64,
        chat_id: i64,
    ) -> Result<ChatView, ChatError> {
        let chat = self.load_group(chat_id).await?;
        membership::require_participant(&chat, actor)?;
        self.view(chat_id).await
    }

    async fn rename_group_chat(
        &self,
        actor: i64,
        chat_id: i64,
        name: &str,
    ) -> Result<ChatView, ChatError> {
        let name = membership::group_name(name)?;
        let chat = self.load_group(chat_id).await?;
        membership::require_admin(&chat, actor)?;

        let chat = self
            .chat_repo
            .rename(chat_id, &name)
            .await?
            .ok_or_else(|| ChatError::not_found("Group chat does not exist"))?;
        let view = self.view(chat_id).await?;

        self.notify(chat.participants.iter().copied(), ChatEvent::UpdateGroupName, &view)?;
        Ok(view)
    }

    async fn add_participant(
        &self,
        actor: i64,
        chat_id: i64,
        user_id: i64,
    ) -> Result<ChatView, ChatError> {
        let chat = self.load_group(chat_id).await?;
        membership::require_admin(&chat, actor)?;
        self.ensure_user_exists(user_id, "User does not exist").await?;
        membership::check_add(&chat, actor, user_id)?;

        if self.chat_repo.add_participant(chat_id, user_id).await?.is_none() {
            return Err(self
                .membership_conflict(
                    chat_id,
                    ChatError::invalid("Participant already in a group chat"),
                )
                .await);
        }
        let view = self.view(chat_id).await?;

        self.notify([user_id], ChatEvent::NewChat, &view)?;
        tracing::debug!(chat_id, actor, user_id, "Participant added");
        Ok(view)
    }

    async fn remove_participant(
        &self,
        actor: i64,
        chat_id: i64,
        user_id: i64,
    ) -> Result<ChatView, ChatError> {
        let chat = self.load_group(chat_id).await?;
        membership::check_remove(&chat, actor, user_id)?;

        if self
            .chat_repo
            .remove_participant(chat_id, user_id)
            .await?
            .is_none()
        {
            return Err(self
                .membership_conflict(
                    chat_id,
                    ChatError::invalid("Participant does not exist in the group chat"),
                )
                .await);
        }
        let view = self.view(chat_id).await?;

        self.notify([user_id], ChatEvent::LeaveChat, &view)?;
        tracing::debug!(chat_id, actor, user_id, "Participant removed");
        Ok(view)
    }

    async fn leave_group_chat(&self, actor: i64, chat_id: i64) -> Result<ChatView, ChatError> {
        let chat = self.load_group(chat_id).await?;
        membership::check_leave(&chat, actor)?;

        if self
            .chat_repo
            .remove_participant(chat_id, actor)
            .await?
            .is_none()
        {
            return Err(self
                .membership_conflict(
                    chat_id,
                    ChatError::forbidden("You are not a part of this chat"),
                )
                .await);
        }

        tracing::debug!(chat_id, actor, "Participant left");
        self.view(chat_id).await
    }

    async fn delete_group_chat(&self, actor: i64, chat_id: i64) -> Result<(), ChatError> {
        let chat = self.load_group(chat_id).await?;
        membership::check_delete_group(&chat, actor)?;
        self.delete_with_messages(&chat, actor).await
    }

    async fn delete_direct_chat(&self, actor: i64, chat_id: i64) -> Result<(), ChatError> {
        let chat = membership::require_direct(self.chat_repo.find_by_id(chat_id).await?)?;
        membership::check_delete_direct(&chat, actor)?;
        self.delete_with_messages(&chat, actor).await
    }

    async fn list_chats(&self, actor: i64) -> Result<Vec<ChatView>, ChatError> {
        Ok(self.projection.chat_views_for_user(actor).await?)
    }

    async fn search_available_users(&self, actor: i64) -> Result<Vec<UserSummary>, ChatError> {
        Ok(self.projection.user_summaries_except(actor).await?)
    }
}
