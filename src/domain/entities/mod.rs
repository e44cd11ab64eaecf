//! # Domain Entities
//!
//! Core domain entities of the chat core. All entities map directly to
//! their corresponding database tables.
//!
//! - **User**: Profile of an account owned by the account service (read-only)
//! - **Chat**: A direct or group conversation that owns its participant list
//! - **Message**: A message in a chat, owned exclusively by that chat
//! - **Attachment**: A file reference embedded in a message, plus its file store
//!
//! ## Repository Traits
//!
//! Each entity has an associated repository trait defining data access operations.
//! These traits are implemented in the infrastructure layer, following the
//! dependency inversion principle.

mod attachment;
mod chat;
mod message;
mod user;

pub use attachment::{Attachment, AttachmentStore};
#[cfg(test)]
pub use attachment::MockAttachmentStore;
pub use chat::{direct_pair_key, Chat, ChatRepository, DirectChatInsert};
pub use message::{Message, MessageRepository};
pub use user::{User, UserRepository};
