//! Message attachment value and the file store behind it.
//!
//! Attachments are embedded in the `messages.attachments` JSONB column; the
//! bytes live on the local filesystem.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A stored file attached to a message.
///
/// Only the two resolved locations are kept: where clients download the
/// file and where the server keeps it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Public URL the file is served from
    pub url: String,

    /// Filesystem path of the backing file
    pub local_path: String,
}

/// Backing storage for attachment files.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Delete the file at `local_path`.
    async fn remove(&self, local_path: &str) -> std::io::Result<()>;
}
