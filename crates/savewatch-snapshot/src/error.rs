//! Snapshot error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for snapshot operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Errors that can occur during snapshot operations.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The storage root (or its dated/session sub-directories) could not be
    /// created. Fatal for the session: no store is handed out.
    #[error("Failed to initialize snapshot storage at {path}: {source}")]
    Initialization {
        path: PathBuf,
        #[source]
        source: savewatch_storage::StorageError,
    },

    /// Malformed arguments from the caller.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Writing a snapshot record to disk failed. The in-memory snapshot is
    /// still valid.
    #[error("Failed to persist snapshot to {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Persisted record not found.
    #[error("Snapshot record not found: {0}")]
    NotFound(PathBuf),

    /// Storage backend error outside of recording.
    #[error("Storage error: {0}")]
    Storage(#[from] savewatch_storage::StorageError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SnapshotError {
    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create a persistence error.
    pub fn persistence(
        path: impl Into<PathBuf>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Persistence {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Whether this error is a persistence failure (the snapshot itself is fine).
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence { .. })
    }
}
