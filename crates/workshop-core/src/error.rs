//! Error types shared across the Workshop core.
//!
//! Most failure paths never reach the caller: storage errors are swallowed at the store
//! boundary and generation errors are converted into the harness fallback. The types here
//! exist so those boundaries can log precisely, and so import can hand the UI one typed error.

use thiserror::Error;

/// Failure of the persistent key-value backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("stored value is not valid UTF-8 for key '{0}'")]
    Encoding(String),

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<sled::Error> for StorageError {
    fn from(e: sled::Error) -> Self {
        StorageError::Backend(e.to_string())
    }
}

/// Failure while producing tokens from a model.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// The consumer's wall-clock guard expired before the stream finished.
    #[error("generation timed out after {0} ms")]
    Timeout(u64),

    /// The engine raised an error mid-stream.
    #[error("engine error: {0}")]
    Engine(String),

    /// The requested model could not be prepared.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),
}

/// A recognizable but unusable project file. The message is safe to show to a child.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct InvalidProjectFileError {
    pub message: String,
}

impl InvalidProjectFileError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failure while building an export file.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("project not found: {0}")]
    ProjectNotFound(String),

    #[error("export serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}
