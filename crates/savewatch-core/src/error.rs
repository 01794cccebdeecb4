//! Error types for the core crate.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Snapshot store error.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] savewatch_snapshot::SnapshotError),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] savewatch_storage::StorageError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The tracker was used after `dispose`.
    #[error("tracker has been disposed")]
    Disposed,
}

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid JSON/JSONC syntax.
    #[error("invalid config at {path}: {message}")]
    InvalidJson { path: String, message: String },

    /// Invalid path (e.g., could not determine data directory).
    #[error("invalid path: {0}")]
    InvalidPath(String),
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
