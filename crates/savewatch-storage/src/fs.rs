//! Filesystem storage implementation.
//!
//! Files are written atomically: contents go to a sibling `*.tmp` file which
//! is then renamed over the target, so readers never see a partial record.

use crate::{DirEntryInfo, Storage, StorageError, StorageResult};
use async_trait::async_trait;
use std::fs::Metadata;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Storage backed by the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStorage;

impl FsStorage {
    /// Create a new filesystem storage.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Storage for FsStorage {
    async fn create_dir_all(&self, path: &Path) -> StorageResult<()> {
        fs::create_dir_all(path)
            .await
            .map_err(|e| StorageError::io(path, e))
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> StorageResult<()> {
        debug!(path = %path.display(), bytes = contents.len(), "Writing to storage");

        let mut temp_name = path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);

        fs::write(&temp_path, contents)
            .await
            .map_err(|e| StorageError::io(&temp_path, e))?;
        if let Err(e) = fs::rename(&temp_path, path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(StorageError::io(path, e));
        }

        Ok(())
    }

    async fn read(&self, path: &Path) -> StorageResult<Option<Vec<u8>>> {
        debug!(path = %path.display(), "Reading from storage");

        match fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }

    async fn read_dir(&self, path: &Path) -> StorageResult<Option<Vec<DirEntryInfo>>> {
        debug!(path = %path.display(), "Listing storage");

        let mut entries = match fs::read_dir(path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::io(path, e)),
        };

        let mut results = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::io(path, e))?
        {
            let entry_path = entry.path();
            let metadata = entry.metadata().await;
            results.extend(entry_info(entry_path, metadata));
        }

        results.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(Some(results))
    }

    async fn remove_dir_all(&self, path: &Path) -> StorageResult<()> {
        debug!(path = %path.display(), "Removing from storage");

        match fs::remove_dir_all(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }
}

/// Describe one listed entry. Entries that cannot be stat'ed (usually
/// removed since the listing started) are skipped.
fn entry_info(path: PathBuf, metadata: io::Result<Metadata>) -> Option<DirEntryInfo> {
    let stat = metadata.and_then(|m| m.modified().map(|modified| (m.is_dir(), modified)));
    match stat {
        Ok((is_dir, modified)) => Some(DirEntryInfo {
            path,
            is_dir,
            modified,
        }),
        Err(e) => {
            warn!(path = %path.display(), "Skipping unreadable entry: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_write_and_read() {
        let dir = tempdir().unwrap();
        let storage = FsStorage::new();
        let path = dir.path().join("record.json");

        storage.write(&path, b"{\"a\":1}").await.unwrap();

        let read = storage.read(&path).await.unwrap();
        assert_eq!(read.as_deref(), Some(&b"{\"a\":1}"[..]));
        assert!(!dir.path().join("record.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_read_not_found() {
        let dir = tempdir().unwrap();
        let storage = FsStorage::new();

        let read = storage.read(&dir.path().join("nope.json")).await.unwrap();
        assert!(read.is_none());
    }

    #[tokio::test]
    async fn test_write_without_parent_fails() {
        let dir = tempdir().unwrap();
        let storage = FsStorage::new();

        let result = storage
            .write(&dir.path().join("missing/record.json"), b"{}")
            .await;
        assert!(matches!(result, Err(StorageError::Io { .. })));
    }

    #[tokio::test]
    async fn test_read_dir_reports_kinds() {
        let dir = tempdir().unwrap();
        let storage = FsStorage::new();

        storage
            .create_dir_all(&dir.path().join("2024-01-01/ses_a"))
            .await
            .unwrap();
        storage
            .write(&dir.path().join("file.json"), b"{}")
            .await
            .unwrap();

        let entries = storage.read_dir(dir.path()).await.unwrap().unwrap();
        assert_eq!(entries.len(), 2);
        let day = entries.iter().find(|e| e.name() == "2024-01-01").unwrap();
        assert!(day.is_dir);
        let file = entries.iter().find(|e| e.name() == "file.json").unwrap();
        assert!(!file.is_dir);
    }

    #[test]
    fn test_entry_info_skips_unreadable_entry() {
        let dir = tempdir().unwrap();
        let gone = dir.path().join("2000-01-01");

        let vanished = io::Error::from(ErrorKind::NotFound);
        assert!(entry_info(gone.clone(), Err(vanished)).is_none());

        let metadata = std::fs::metadata(dir.path());
        let info = entry_info(dir.path().to_path_buf(), metadata).unwrap();
        assert!(info.is_dir);
        assert_eq!(info.path, dir.path());
    }

    #[tokio::test]
    async fn test_read_dir_missing_is_none() {
        let dir = tempdir().unwrap();
        let storage = FsStorage::new();

        let entries = storage.read_dir(&dir.path().join("absent")).await.unwrap();
        assert!(entries.is_none());
    }

    #[tokio::test]
    async fn test_remove_dir_all() {
        let dir = tempdir().unwrap();
        let storage = FsStorage::new();
        let nested = dir.path().join("old/session");

        storage.create_dir_all(&nested).await.unwrap();
        storage.write(&nested.join("a.json"), b"{}").await.unwrap();

        storage.remove_dir_all(&dir.path().join("old")).await.unwrap();
        assert!(!dir.path().join("old").exists());

        // Removing again is fine
        storage.remove_dir_all(&dir.path().join("old")).await.unwrap();
    }
}
