//! Data Transfer Objects
//!
//! DTOs for API request/response serialization.

pub mod request;
pub mod response;

pub use request::{CreateGroupChatRequest, RenameGroupChatRequest};
pub use response::ApiResponse;
