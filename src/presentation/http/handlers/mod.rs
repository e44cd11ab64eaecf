//! HTTP Handlers
//!
//! Request handlers for all HTTP endpoints.

pub mod chat;
pub mod health;
pub mod message;

use crate::shared::error::AppError;
use crate::shared::snowflake;

/// Parse a Snowflake path segment.
pub(crate) fn parse_id(raw: &str, what: &str) -> Result<i64, AppError> {
    snowflake::from_string(raw).map_err(|_| AppError::BadRequest(format!("Invalid {} id", what)))
}
