//! Book cover uploads.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use bookaholic_core::BookId;

/// Errors that can occur while accepting an upload.
#[derive(Debug, Error)]
pub enum UploadError {
    /// No file was attached.
    #[error("Please upload a file")]
    Missing,

    /// The file is not an image.
    #[error("Please upload an image file")]
    NotAnImage,

    /// The file exceeds the configured size limit.
    #[error("Please upload an image less than {max} bytes")]
    TooLarge { max: usize },

    /// The multipart body could not be read.
    #[error("Invalid upload: {0}")]
    Malformed(String),

    /// Writing the file failed.
    #[error("Problem with file upload: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    /// Whether the client caused this error (as opposed to the server).
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}

/// A file received from a multipart form.
#[derive(Debug, Clone)]
pub struct CoverUpload {
    /// Client-supplied file name, used only for its extension.
    pub file_name: Option<String>,
    /// Declared MIME type.
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl CoverUpload {
    /// Check the upload is an image within `max_bytes`.
    ///
    /// # Errors
    ///
    /// Returns `NotAnImage` or `TooLarge`.
    pub fn validate(&self, max_bytes: usize) -> Result<(), UploadError> {
        let is_image = self
            .content_type
            .as_deref()
            .is_some_and(|mime| mime.starts_with("image"));
        if !is_image {
            return Err(UploadError::NotAnImage);
        }
        if self.bytes.len() > max_bytes {
            return Err(UploadError::TooLarge { max: max_bytes });
        }
        Ok(())
    }

    /// Stored name for this upload as the cover of `book`: `photo_<id><ext>`.
    #[must_use]
    pub fn stored_name(&self, book: BookId) -> String {
        let ext = self
            .file_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();
        format!("photo_{book}{ext}")
    }
}

/// Destination for uploaded files.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Store `bytes` under `file_name`, replacing any existing file.
    async fn store(&self, file_name: &str, bytes: &[u8]) -> Result<(), UploadError>;
}

/// File store writing into a local directory.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    /// Create a store rooted at `root`. The directory is created on first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory files are written to.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn store(&self, file_name: &str, bytes: &[u8]) -> Result<(), UploadError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(file_name);
        tokio::fs::write(&path, bytes).await?;
        tracing::info!(path = %path.display(), size = bytes.len(), "stored upload");
        Ok(())
    }
}
