//! Request DTOs
//!
//! Data structures for API request bodies.

use serde::Deserialize;
use validator::Validate;

use crate::shared::snowflake;

/// Create group chat request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateGroupChatRequest {
    #[validate(
        custom(function = "crate::shared::validation::not_blank"),
        length(max = 100, message = "Name must be at most 100 characters")
    )]
    pub name: String,

    /// Members other than the creator, as Snowflake strings
    #[validate(length(min = 2, message = "At least two other participants are required"))]
    pub participants: Vec<String>,
}

impl CreateGroupChatRequest {
    /// Parse participant ids, rejecting malformed ones.
    pub fn participant_ids(&self) -> Result<Vec<i64>, String> {
        self.participants
            .iter()
            .map(|raw| {
                snowflake::from_string(raw).map_err(|_| format!("Invalid participant id: {}", raw))
            })
            .collect()
    }
}

/// Rename group chat request
#[derive(Debug, Deserialize, Validate)]
pub struct RenameGroupChatRequest {
    #[validate(
        custom(function = "crate::shared::validation::not_blank"),
        length(max = 100, message = "Name must be at most 100 characters")
    )]
    pub name: String,
}
