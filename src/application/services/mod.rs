//! Application Services
//!
//! Business logic services that coordinate domain operations.
//!
//! ## Available Services
//!
//! - **AuthService**: Access token verification for HTTP and socket sessions
//! - **ChatService**: Direct and group chats, membership, deletion
//! - **MessageService**: Sending, listing and cascade deletion of messages

pub mod auth_service;
pub mod chat_service;
pub mod message_service;

// Re-export auth service types
pub use auth_service::{AuthError, Claims, JwtTokenVerifier, SessionAuthenticator, TokenVerifier};

// Re-export chat service types
pub use chat_service::{ChatService, ChatServiceImpl, CreateGroupChatDto};

// Re-export message service types
pub use message_service::{CascadeReport, MessageService, MessageServiceImpl, SendMessageDto};
