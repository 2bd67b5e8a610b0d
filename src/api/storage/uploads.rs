//! Attachment file storage.
//!
//! Uploaded files land under a single local directory, named by upload
//! timestamp plus the sanitized original filename. The stored path kept
//! on the form (`uploads/<name>`) doubles as the static-serve path.

use std::path::{Path, PathBuf};

use super::StorageError;

/// URL path prefix the upload directory is served under.
pub const WEB_PREFIX: &str = "uploads";

/// Local file store for form attachments.
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the upload directory if it does not exist yet.
    pub async fn ensure_dir(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StorageError::Other(format!("Failed to create upload dir: {}", e)))
    }

    /// Persist an attachment; returns the stored path to keep on the form.
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<String, StorageError> {
        self.ensure_dir().await?;
        let file_name = format!(
            "{}-{}",
            chrono::Utc::now().timestamp_millis(),
            sanitize_file_name(original_name)
        );
        let path = self.root.join(&file_name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| StorageError::Other(format!("Failed to store attachment: {}", e)))?;
        Ok(format!("{}/{}", WEB_PREFIX, file_name))
    }

    /// Read back a stored attachment by its stored path. Only plain file
    /// names inside the upload directory resolve; anything with path
    /// components is rejected.
    pub async fn read(&self, stored_path: &str) -> Result<Vec<u8>, StorageError> {
        let name = stored_path
            .strip_prefix(&format!("{}/", WEB_PREFIX))
            .unwrap_or(stored_path);
        if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
            return Err(StorageError::Other(format!(
                "Invalid attachment path: {}",
                stored_path
            )));
        }
        tokio::fs::read(self.root.join(name))
            .await
            .map_err(|e| StorageError::Other(format!("Failed to read attachment: {}", e)))
    }
}

fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "attachment".to_string()
    } else {
        cleaned
    }
}
