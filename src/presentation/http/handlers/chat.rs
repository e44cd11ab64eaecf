//! Chat Handlers

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};
use validator::Validate;

use super::parse_id;
use crate::application::dto::{ApiResponse, CreateGroupChatRequest, RenameGroupChatRequest};
use crate::application::services::CreateGroupChatDto;
use crate::domain::{ChatView, UserSummary};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::validation::validation_error;
use crate::startup::AppState;

/// List the caller's chats, most recently active first
pub async fn list_chats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<ApiResponse<Vec<ChatView>>, AppError> {
    let chats = state.chats.list_chats(auth.user_id).await?;
    Ok(ApiResponse::ok(chats, "User chats fetched successfully!"))
}

/// Users the caller can start a chat with
pub async fn search_available_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<ApiResponse<Vec<UserSummary>>, AppError> {
    let users = state.chats.search_available_users(auth.user_id).await?;
    Ok(ApiResponse::ok(users, "Users fetched successfully"))
}

/// Get or create the direct chat with a receiver
pub async fn get_or_create_direct_chat(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(receiver_id): Path<String>,
) -> Result<ApiResponse<ChatView>, AppError> {
    let receiver_id = parse_id(&receiver_id, "receiver")?;
    let chat = state
        .chats
        .get_or_create_direct_chat(auth.user_id, receiver_id)
        .await?;
    Ok(ApiResponse::ok(chat, "Chat retrieved successfully"))
}

/// Create a group chat
pub async fn create_group_chat(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CreateGroupChatRequest>,
) -> Result<ApiResponse<ChatView>, AppError> {
    body.validate().map_err(validation_error)?;
    let participants = body.participant_ids().map_err(AppError::BadRequest)?;

    let chat = state
        .chats
        .create_group_chat(
            auth.user_id,
            CreateGroupChatDto {
                name: body.name.trim().to_string(),
                participants,
            },
        )
        .await?;
    Ok(ApiResponse::created(chat, "Group chat created successfully"))
}

/// Get group chat details
pub async fn get_group_chat_details(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(chat_id): Path<String>,
) -> Result<ApiResponse<ChatView>, AppError> {
    let chat_id = parse_id(&chat_id, "chat")?;
    let chat = state
        .chats
        .get_group_chat_details(auth.user_id, chat_id)
        .await?;
    Ok(ApiResponse::ok(chat, "Group chat fetched successfully"))
}

/// Rename a group chat
pub async fn rename_group_chat(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(chat_id): Path<String>,
    Json(body): Json<RenameGroupChatRequest>,
) -> Result<ApiResponse<ChatView>, AppError> {
    let chat_id = parse_id(&chat_id, "chat")?;
    body.validate().map_err(validation_error)?;

    let chat = state
        .chats
        .rename_group_chat(auth.user_id, chat_id, body.name.trim())
        .await?;
    Ok(ApiResponse::ok(chat, "Group chat name updated successfully"))
}

/// Delete a group chat and its messages
pub async fn delete_group_chat(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(chat_id): Path<String>,
) -> Result<ApiResponse<Value>, AppError> {
    let chat_id = parse_id(&chat_id, "chat")?;
    state.chats.delete_group_chat(auth.user_id, chat_id).await?;
    Ok(ApiResponse::ok(json!({}), "Group chat deleted successfully"))
}

/// Add a participant to a group chat
pub async fn add_participant(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path((chat_id, participant_id)): Path<(String, String)>,
) -> Result<ApiResponse<ChatView>, AppError> {
    let chat_id = parse_id(&chat_id, "chat")?;
    let participant_id = parse_id(&participant_id, "participant")?;

    let chat = state
        .chats
        .add_participant(auth.user_id, chat_id, participant_id)
        .await?;
    Ok(ApiResponse::ok(chat, "Participant added successfully"))
}

/// Remove a participant from a group chat
pub async fn remove_participant(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path((chat_id, participant_id)): Path<(String, String)>,
) -> Result<ApiResponse<ChatView>, AppError> {
    let chat_id = parse_id(&chat_id, "chat")?;
    let participant_id = parse_id(&participant_id, "participant")?;

    let chat = state
        .chats
        .remove_participant(auth.user_id, chat_id, participant_id)
        .await?;
    Ok(ApiResponse::ok(chat, "Participant removed successfully"))
}

/// Leave a group chat
pub async fn leave_group_chat(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(chat_id): Path<String>,
) -> Result<ApiResponse<ChatView>, AppError> {
    let chat_id = parse_id(&chat_id, "chat")?;
    let chat = state.chats.leave_group_chat(auth.user_id, chat_id).await?;
    Ok(ApiResponse::ok(chat, "Left the group successfully"))
}

/// Delete a direct chat and its messages
pub async fn delete_direct_chat(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(chat_id): Path<String>,
) -> Result<ApiResponse<Value>, AppError> {
    let chat_id = parse_id(&chat_id, "chat")?;
    state.chats.delete_direct_chat(auth.user_id, chat_id).await?;
    Ok(ApiResponse::ok(json!({}), "Chat deleted successfully"))
}
