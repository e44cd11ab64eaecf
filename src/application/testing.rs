//! Service fixtures over the in-memory store.

use std::sync::Arc;

use chrono::Utc;
use fake::faker::internet::en::{SafeEmail, Username};
use fake::Fake;

use crate::application::events::testing::RecordingEmitter;
use crate::application::services::{ChatServiceImpl, MessageService, MessageServiceImpl};
use crate::domain::{
    AttachmentStore, Chat, ChatRepository, Message, MessageRepository, MockAttachmentStore, User,
};
use crate::infrastructure::memory::InMemoryStore;
use crate::shared::snowflake::SnowflakeGenerator;

pub type TestMessageService = MessageServiceImpl<InMemoryStore, InMemoryStore, InMemoryStore>;
pub type TestChatService = ChatServiceImpl<InMemoryStore, InMemoryStore, InMemoryStore>;

/// Users 1 through 6 exist; everything else starts empty.
pub struct Fixture {
    pub store: Arc<InMemoryStore>,
    pub events: Arc<RecordingEmitter>,
    pub ids: Arc<SnowflakeGenerator>,
}

impl Fixture {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        for id in 1..=6 {
            let username: String = Username().fake();
            store.insert_user(User {
                id,
                username: format!("{username}{id}"),
                email: SafeEmail().fake(),
                ..Default::default()
            });
        }
        Self {
            store,
            events: Arc::new(RecordingEmitter::default()),
            ids: Arc::new(SnowflakeGenerator::new(1, 1)),
        }
    }

    fn accepting_files() -> Arc<dyn AttachmentStore> {
        let mut files = MockAttachmentStore::new();
        files.expect_remove().returning(|_| Ok(()));
        Arc::new(files)
    }

    pub fn message_service(&self) -> TestMessageService {
        self.message_service_with_files(Self::accepting_files())
    }

    pub fn message_service_with_files(&self, files: Arc<dyn AttachmentStore>) -> TestMessageService {
        MessageServiceImpl::new(
            self.store.clone(),
            self.store.clone(),
            self.store.clone(),
            files,
            self.events.clone(),
            self.ids.clone(),
        )
    }

    pub fn chat_service(&self) -> TestChatService {
        self.chat_service_with_files(Self::accepting_files())
    }

    pub fn chat_service_with_files(&self, files: Arc<dyn AttachmentStore>) -> TestChatService {
        let messages: Arc<dyn MessageService> = Arc::new(self.message_service_with_files(files));
        ChatServiceImpl::new(
            self.store.clone(),
            self.store.clone(),
            self.store.clone(),
            messages,
            self.events.clone(),
            self.ids.clone(),
        )
    }

    /// Insert a direct chat without going through a service.
    pub async fn direct_chat(&self, actor: i64, peer: i64) -> Chat {
        let chat = Chat::new_direct(self.ids.generate(), actor, peer, Utc::now());
        self.store.create_direct(&chat).await.unwrap().chat
    }

    /// Insert a group chat administered by `admin`.
    pub async fn group_chat(&self, admin: i64, others: &[i64]) -> Chat {
        let mut participants = vec![admin];
        participants.extend_from_slice(others);
        let chat = Chat::new_group(
            self.ids.generate(),
            "fixture group".to_string(),
            admin,
            participants,
            Utc::now(),
        );
        self.store.create_group(&chat).await.unwrap()
    }

    pub async fn chat(&self, id: i64) -> Option<Chat> {
        ChatRepository::find_by_id(&*self.store, id).await.unwrap()
    }

    pub async fn messages(&self, chat_id: i64) -> Vec<Message> {
        self.store.find_by_chat(chat_id).await.unwrap()
    }
}
