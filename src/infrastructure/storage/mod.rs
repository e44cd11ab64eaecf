//! Attachment Storage
//!
//! Uploaded files are stored flat under the configured directory and served
//! back under `/images`.

use std::path::Path;

use async_trait::async_trait;
use tokio::fs;
use uuid::Uuid;

use crate::config::UploadSettings;
use crate::domain::{Attachment, AttachmentStore};

/// Local filesystem storage for attachments.
pub struct LocalAttachmentStore {
    settings: UploadSettings,
}

impl LocalAttachmentStore {
    /// Create the storage directory if needed.
    pub async fn new(settings: UploadSettings) -> std::io::Result<Self> {
        fs::create_dir_all(&settings.local_dir).await?;
        tracing::info!(dir = %settings.local_dir, "Attachment storage directory");
        Ok(Self { settings })
    }

    /// Write an uploaded file and return the attachment referencing it.
    pub async fn save(&self, original_name: Option<&str>, data: &[u8]) -> std::io::Result<Attachment> {
        let filename = stored_filename(original_name);
        let local_path = self.settings.local_path(&filename);
        fs::write(&local_path, data).await?;

        tracing::debug!(path = %local_path, bytes = data.len(), "Stored attachment");
        Ok(Attachment {
            url: self.settings.public_url(&filename),
            local_path,
        })
    }
}

#[async_trait]
impl AttachmentStore for LocalAttachmentStore {
    async fn remove(&self, local_path: &str) -> std::io::Result<()> {
        fs::remove_file(local_path).await
    }
}

/// Unique on-disk name that keeps a sanitized stem and the extension of the
/// uploaded file.
fn stored_filename(original_name: Option<&str>) -> String {
    let path = Path::new(original_name.unwrap_or_default());
    let stem: String = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .take(40)
        .collect();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default();

    let id = Uuid::new_v4().simple();
    if stem.trim_matches('-').is_empty() {
        format!("{id}{ext}")
    } else {
        format!("{}-{id}{ext}", stem.trim_matches('-'))
    }
}
