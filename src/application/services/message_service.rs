//! Message Service
//!
//! Appends messages to chats, lists a chat's history and removes a chat
//! together with its messages and their files.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;

use crate::application::events::{to_payload, ChatEvent, EventEmitter};
use crate::domain::services::membership;
use crate::domain::{
    Attachment, AttachmentStore, ChatError, ChatProjection, ChatRepository, Message,
    MessageRepository, MessageView,
};
use crate::infrastructure::metrics;
use crate::shared::snowflake::SnowflakeGenerator;

/// Message service trait
#[async_trait]
pub trait MessageService: Send + Sync {
    /// Messages of a chat the actor belongs to, newest first
    async fn list_messages(&self, actor: i64, chat_id: i64)
        -> Result<Vec<MessageView>, ChatError>;

    /// Send a message to a chat
    async fn send_message(
        &self,
        actor: i64,
        chat_id: i64,
        request: SendMessageDto,
    ) -> Result<MessageView, ChatError>;

    /// Delete a chat together with every message in it, then try to remove
    /// the attachment files of those messages.
    ///
    /// The records go in one store step, so a message sent concurrently is
    /// either purged with the rest or rejected with NotFound. File removal is
    /// best effort and never fails the call.
    async fn cascade_delete_messages(&self, chat_id: i64) -> Result<CascadeReport, ChatError>;
}

/// Send message request
#[derive(Debug, Clone, Default)]
pub struct SendMessageDto {
    pub content: Option<String>,
    /// Files already written to attachment storage
    pub attachments: Vec<Attachment>,
}

/// Outcome of a cascade delete
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeReport {
    pub deleted_messages: u64,
    pub removed_files: usize,
    pub failed_files: usize,
}

/// MessageService implementation
pub struct MessageServiceImpl<M, C, P>
where
    M: MessageRepository,
    C: ChatRepository,
    P: ChatProjection,
{
    message_repo: Arc<M>,
    chat_repo: Arc<C>,
    projection: Arc<P>,
    files: Arc<dyn AttachmentStore>,
    events: Arc<dyn EventEmitter>,
    id_generator: Arc<SnowflakeGenerator>,
}

impl<M, C, P> MessageServiceImpl<M, C, P>
where
    M: MessageRepository,
    C: ChatRepository,
    P: ChatProjection,
{
    pub fn new(
        message_repo: Arc<M>,
        chat_repo: Arc<C>,
        projection: Arc<P>,
        files: Arc<dyn AttachmentStore>,
        events: Arc<dyn EventEmitter>,
        id_generator: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            message_repo,
            chat_repo,
            projection,
            files,
            events,
            id_generator,
        }
    }
}

#[async_trait]
impl<M, C, P> MessageService for MessageServiceImpl<M, C, P>
where
    M: MessageRepository + 'static,
    C: ChatRepository + 'static,
    P: ChatProjection + 'static,
{
    async fn list_messages(
        &self,
        actor: i64,
        chat_id: i64,
    ) -> Result<Vec<MessageView>, ChatError> {
        let chat = self
            .chat_repo
            .find_by_id(chat_id)
            .await?
            .ok_or_else(|| ChatError::not_found("Chat does not exist"))?;
        membership::require_participant(&chat, actor)?;

        Ok(self.projection.message_views_for_chat(chat_id).await?)
    }

    async fn send_message(
        &self,
        actor: i64,
        chat_id: i64,
        request: SendMessageDto,
    ) -> Result<MessageView, ChatError> {
        if !Message::has_payload(request.content.as_deref(), &request.attachments) {
            return Err(ChatError::invalid("Message content or attachment is required"));
        }

        let chat = self
            .chat_repo
            .find_by_id(chat_id)
            .await?
            .ok_or_else(|| ChatError::not_found("Chat does not exist"))?;
        membership::require_participant(&chat, actor)?;

        let now = Utc::now();
        let message = Message {
            id: self.id_generator.generate(),
            chat_id,
            sender_id: actor,
            content: request.content.filter(|c| !c.trim().is_empty()),
            attachments: request.attachments,
            created_at: now,
            updated_at: now,
        };
        let message = self.message_repo.create(&message).await?;

        if !self
            .chat_repo
            .advance_last_message(chat_id, message.id)
            .await?
        {
            tracing::debug!(chat_id, message_id = message.id, "Newer last message already recorded");
        }

        let view = self
            .projection
            .message_view(message.id)
            .await?
            .ok_or_else(|| ChatError::internal("Internal server error"))?;

        let payload = to_payload(&view)?;
        for participant in chat.participants_except(actor) {
            self.events
                .emit_to_user(participant, ChatEvent::MessageReceived, payload.clone());
        }

        metrics::record_message_sent();
        tracing::debug!(chat_id, message_id = view.id, sender_id = actor, "Message sent");

        Ok(view)
    }

    async fn cascade_delete_messages(&self, chat_id: i64) -> Result<CascadeReport, ChatError> {
        let messages = self
            .chat_repo
            .delete_with_messages(chat_id)
            .await?
            .ok_or_else(|| ChatError::not_found("Chat does not exist"))?;

        let paths: Vec<&str> = messages
            .iter()
            .flat_map(|m| m.attachments.iter())
            .map(|a| a.local_path.as_str())
            .collect();

        let outcomes = join_all(paths.iter().map(|path| self.files.remove(path))).await;

        let mut report = CascadeReport {
            deleted_messages: messages.len() as u64,
            ..Default::default()
        };
        for (path, outcome) in paths.iter().zip(outcomes) {
            match outcome {
                Ok(()) => report.removed_files += 1,
                Err(e) => {
                    report.failed_files += 1;
                    metrics::record_file_removal_failure();
                    tracing::warn!(chat_id, path = %path, error = %e, "Failed to remove attachment file");
                }
            }
        }

        tracing::info!(
            chat_id,
            deleted = report.deleted_messages,
            files_removed = report.removed_files,
            files_failed = report.failed_files,
            "Cascade deleted chat"
        );

        Ok(report)
    }
}
