//! # Domain Layer
//!
//! The domain layer contains the core business logic of the chat core.
//! It is independent of any external frameworks or infrastructure concerns.
//!
//! ## Structure
//!
//! - **entities**: Core domain entities (User, Chat, Message) and repository traits
//! - **projections**: Hydrated read models and the join-style query trait
//! - **services**: Membership rules
//! - **error**: The `ChatError` kinds every core operation fails with

pub mod entities;
pub mod error;
pub mod projections;
pub mod services;

// Re-export commonly used types
pub use entities::*;
pub use error::ChatError;
pub use projections::{ChatProjection, ChatView, LastMessageView, MessageView, UserSummary};
