//! Storage error types.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// IO error (permission denied, disk full, etc.)
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A parent directory or the target itself is missing.
    #[error("Not found: {0}")]
    NotFound(PathBuf),

    /// The target exists but has the wrong kind (file vs directory).
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Lock was poisoned (another thread panicked while holding the lock)
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),

    /// Failure injected by [`crate::MemoryStorage`].
    #[error("Injected failure at {0}")]
    Injected(PathBuf),
}

impl StorageError {
    /// Wrap an IO error with the path it happened on.
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
