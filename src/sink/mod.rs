//! Storage for completed analysis conversations.
//!
//! Each processed job yields one conversation rendered as a JSON file named
//! `{endpoint_id}_{sequence}.json`. Files are written through a temp path
//! and renamed into place, so readers never observe a partial file and a
//! reused sequence number replaces the previous conversation whole.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Errors that can occur while persisting conversations.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Failed to read or write to the filesystem.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to serialize conversation data.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The output directory could not be created.
    #[error("Failed to create output directory: {0}")]
    DirectoryCreationFailed(String),
}

/// A message in a recorded conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender ("user" or "assistant").
    pub role: String,
    /// Content of the message.
    pub content: String,
}

impl ChatMessage {
    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// A prompt/response exchange in training-data form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Ordered messages of the exchange.
    pub messages: Vec<ChatMessage>,
}

impl Conversation {
    /// Builds the two-message conversation for one completed job.
    pub fn from_exchange(prompt: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::user(prompt), ChatMessage::assistant(response)],
        }
    }
}

/// Local file storage for conversations.
#[derive(Debug, Clone)]
pub struct ConversationSink {
    /// Directory where conversation files are written.
    output_dir: PathBuf,
}

impl ConversationSink {
    /// Creates a sink rooted at `output_dir`.
    ///
    /// The directory is created lazily on first save.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Get the output directory.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path a conversation for `endpoint_id` at `sequence` is stored under.
    pub fn conversation_path(&self, endpoint_id: &str, sequence: u64) -> PathBuf {
        self.output_dir
            .join(format!("{}_{}.json", endpoint_id, sequence))
    }

    /// Ensures the output directory exists.
    async fn ensure_directory(&self) -> Result<(), SinkError> {
        if !self.output_dir.exists() {
            fs::create_dir_all(&self.output_dir).await.map_err(|e| {
                SinkError::DirectoryCreationFailed(format!(
                    "Failed to create directory {:?}: {}",
                    self.output_dir, e
                ))
            })?;
        }
        Ok(())
    }

    /// Saves a conversation, replacing any file already at the slot.
    ///
    /// # Returns
    ///
    /// The path where the conversation was saved.
    pub async fn save(
        &self,
        endpoint_id: &str,
        sequence: u64,
        conversation: &Conversation,
    ) -> Result<PathBuf, SinkError> {
        self.ensure_directory().await?;

        let path = self.conversation_path(endpoint_id, sequence);
        let tmp_path = path.with_extension("json.tmp");

        // Serialize to pretty JSON for readability
        let json = serde_json::to_string_pretty(conversation)?;

        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        // Rename is atomic on the same filesystem, so a crash mid-save
        // leaves either the old file or the new one, never a torn write.
        fs::rename(&tmp_path, &path).await?;

        Ok(path)
    }
}
