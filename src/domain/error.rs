//! Chat core error type.

use crate::shared::error::AppError;

/// Failure of a chat or message operation.
///
/// Every variant carries a message meant for the end user. The core never
/// renders responses itself; HTTP handlers convert into [`AppError`] and the
/// socket layer into a `socketError` frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    /// Referenced chat, user or message does not exist
    #[error("{0}")]
    NotFound(String),

    /// Actor lacks the admin or membership right for the operation
    #[error("{0}")]
    Forbidden(String),

    /// Semantically invalid request (self chat, duplicate participant, ...)
    #[error("{0}")]
    InvalidOperation(String),

    /// Missing, invalid or expired credential
    #[error("{0}")]
    Unauthorized(String),

    /// Store failure or a re-fetch that came back empty after a mutation
    #[error("{0}")]
    Internal(String),
}

impl ChatError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<AppError> for ChatError {
    fn from(err: AppError) -> Self {
        ChatError::Internal(err.to_string())
    }
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::NotFound(msg) => AppError::NotFound(msg),
            ChatError::Forbidden(msg) => AppError::Forbidden(msg),
            ChatError::InvalidOperation(msg) => AppError::BadRequest(msg),
            ChatError::Unauthorized(msg) => AppError::Unauthorized(msg),
            ChatError::Internal(msg) => AppError::Internal(msg),
        }
    }
}
