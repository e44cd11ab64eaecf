//! Message Handlers

use axum::{
    body::Bytes,
    extract::{multipart::Field, Extension, Multipart, Path, State},
};

use super::parse_id;
use crate::application::dto::ApiResponse;
use crate::application::services::SendMessageDto;
use crate::config::UploadSettings;
use crate::domain::{Attachment, AttachmentStore, MessageView};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

const CONTENT_FIELD: &str = "content";
const ATTACHMENTS_FIELD: &str = "attachments";

/// File part read from a multipart body
struct Upload {
    file_name: Option<String>,
    data: Bytes,
}

/// Parsed `sendMessage` form
#[derive(Default)]
struct MessageForm {
    content: Option<String>,
    uploads: Vec<Upload>,
}

/// Get all messages of a chat, newest first
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(chat_id): Path<String>,
) -> Result<ApiResponse<Vec<MessageView>>, AppError> {
    let chat_id = parse_id(&chat_id, "chat")?;
    let messages = state.messages.list_messages(auth.user_id, chat_id).await?;
    Ok(ApiResponse::ok(messages, "Messages fetched successfully"))
}

/// Send a message with optional attachments
pub async fn send_message(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(chat_id): Path<String>,
    multipart: Multipart,
) -> Result<ApiResponse<MessageView>, AppError> {
    let chat_id = parse_id(&chat_id, "chat")?;
    let form = read_form(multipart, &state.settings.uploads).await?;

    let mut attachments: Vec<Attachment> = Vec::with_capacity(form.uploads.len());
    for upload in &form.uploads {
        match state.uploads.save(upload.file_name.as_deref(), &upload.data).await {
            Ok(attachment) => attachments.push(attachment),
            Err(e) => {
                discard(&state, &attachments).await;
                return Err(AppError::Internal(format!("Failed to store attachment: {}", e)));
            }
        }
    }

    let dto = SendMessageDto {
        content: form.content,
        attachments: attachments.clone(),
    };

    match state.messages.send_message(auth.user_id, chat_id, dto).await {
        Ok(message) => Ok(ApiResponse::created(message, "Message saved successfully")),
        Err(e) => {
            discard(&state, &attachments).await;
            Err(e.into())
        }
    }
}

/// Read the `content` field and up to `max_files_per_message` attachment
/// files, enforcing the per-file size limit while streaming.
async fn read_form(mut multipart: Multipart, limits: &UploadSettings) -> Result<MessageForm, AppError> {
    let mut form = MessageForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(CONTENT_FIELD) => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Invalid content field: {}", e)))?;
                form.content = Some(text);
            }
            Some(ATTACHMENTS_FIELD) => {
                if form.uploads.len() >= limits.max_files_per_message {
                    return Err(AppError::BadRequest(format!(
                        "At most {} attachments are allowed per message",
                        limits.max_files_per_message
                    )));
                }
                let file_name = field.file_name().map(str::to_string);
                let data = read_limited(field, limits.max_file_size).await?;
                form.uploads.push(Upload { file_name, data });
            }
            other => {
                tracing::debug!(field = ?other, "Ignoring unknown multipart field");
            }
        }
    }

    Ok(form)
}

async fn read_limited(mut field: Field<'_>, max_size: usize) -> Result<Bytes, AppError> {
    let mut buf = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read attachment: {}", e)))?
    {
        if buf.len() + chunk.len() > max_size {
            return Err(AppError::BadRequest(format!(
                "Attachment exceeds the {} byte limit",
                max_size
            )));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(Bytes::from(buf))
}

/// Remove files stored for a request that did not produce a message.
async fn discard(state: &AppState, attachments: &[Attachment]) {
    for attachment in attachments {
        if let Err(e) = state.uploads.remove(&attachment.local_path).await {
            tracing::warn!(path = %attachment.local_path, error = %e, "Failed to discard attachment");
        }
    }
}
