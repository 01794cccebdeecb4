//! Storage layer for savewatch.
//!
//! Snapshot records are persisted through a small hierarchical-filesystem
//! abstraction so the snapshot store can be exercised without touching disk:
//! - Filesystem storage (default)
//! - In-memory storage (for testing, with failure injection)

pub mod error;
pub mod fs;
pub mod memory;

pub use error::{StorageError, StorageResult};
pub use fs::FsStorage;
pub use memory::MemoryStorage;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// One entry returned by [`Storage::read_dir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    /// Full path of the entry.
    pub path: PathBuf,
    /// Whether the entry is a directory.
    pub is_dir: bool,
    /// Last modification time.
    pub modified: SystemTime,
}

impl DirEntryInfo {
    /// File name component of the entry as UTF-8 (lossy).
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// A hierarchical storage backend.
///
/// All paths are absolute (or at least rooted the same way for every call).
#[async_trait]
pub trait Storage: Send + Sync {
    /// Create a directory and all missing parents.
    async fn create_dir_all(&self, path: &Path) -> StorageResult<()>;

    /// Write a file, replacing any previous contents.
    ///
    /// The parent directory must already exist.
    async fn write(&self, path: &Path, contents: &[u8]) -> StorageResult<()>;

    /// Read a file.
    ///
    /// Returns `None` if the file doesn't exist.
    async fn read(&self, path: &Path) -> StorageResult<Option<Vec<u8>>>;

    /// List the immediate children of a directory.
    ///
    /// Returns `None` if the directory doesn't exist. Children that cannot
    /// be inspected are left out rather than failing the whole listing.
    async fn read_dir(&self, path: &Path) -> StorageResult<Option<Vec<DirEntryInfo>>>;

    /// Recursively remove a directory. Missing directories are not an error.
    async fn remove_dir_all(&self, path: &Path) -> StorageResult<()>;
}
