//! Repository Implementations
//!
//! PostgreSQL implementations of domain repository traits.
//!
//! ## Available Repositories
//!
//! - **UserRepository** - Read-only user profiles
//! - **ChatRepository** - Chats and their participant lists
//! - **MessageRepository** - Messages with embedded attachments
//! - **ChatProjection** - Hydrated chat and message reads
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use sqlx::PgPool;
//! use crate::infrastructure::repositories::{
//!     PgChatProjection, PgChatRepository, PgMessageRepository, PgUserRepository,
//! };
//!
//! async fn setup_repositories(pool: PgPool) {
//!     let user_repo = PgUserRepository::new(pool.clone());
//!     let chat_repo = PgChatRepository::new(pool.clone());
//!     let message_repo = PgMessageRepository::new(pool.clone());
//!     let projection = PgChatProjection::new(pool);
//! }
//! ```

pub mod chat_repository;
pub mod message_repository;
pub mod projection;
pub mod user_repository;

pub use chat_repository::PgChatRepository;
pub use message_repository::PgMessageRepository;
pub use projection::PgChatProjection;
pub use user_repository::PgUserRepository;
