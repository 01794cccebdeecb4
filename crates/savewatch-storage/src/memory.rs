//! In-memory storage implementation for testing.

use crate::{DirEntryInfo, Storage, StorageError, StorageResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::SystemTime;

#[derive(Debug, Clone)]
enum Node {
    Dir { modified: SystemTime },
    File { contents: Vec<u8>, modified: SystemTime },
}

impl Node {
    fn modified(&self) -> SystemTime {
        match self {
            Node::Dir { modified } | Node::File { modified, .. } => *modified,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    nodes: BTreeMap<PathBuf, Node>,
    /// Writes under any of these prefixes fail.
    failing_writes: Vec<PathBuf>,
    /// Directory creation under any of these prefixes fails.
    failing_dirs: Vec<PathBuf>,
    /// Removal of any of these exact paths fails.
    failing_removes: Vec<PathBuf>,
}

/// In-memory storage for testing.
///
/// Behaves like a tiny filesystem tree. Modification times can be set
/// explicitly and failures can be injected per path prefix.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: RwLock<Inner>,
}

impl MemoryStorage {
    /// Create a new, empty in-memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write under `prefix` fail.
    pub fn fail_writes_under(&self, prefix: impl Into<PathBuf>) {
        if let Ok(mut inner) = self.inner.write() {
            inner.failing_writes.push(prefix.into());
        }
    }

    /// Make every directory creation under `prefix` fail.
    pub fn fail_create_dir_under(&self, prefix: impl Into<PathBuf>) {
        if let Ok(mut inner) = self.inner.write() {
            inner.failing_dirs.push(prefix.into());
        }
    }

    /// Make removal of exactly `path` fail.
    pub fn fail_remove(&self, path: impl Into<PathBuf>) {
        if let Ok(mut inner) = self.inner.write() {
            inner.failing_removes.push(path.into());
        }
    }

    /// Override the modification time of an existing entry.
    pub fn set_modified(&self, path: &Path, time: SystemTime) -> StorageResult<()> {
        let mut inner = self.write_lock()?;
        match inner.nodes.get_mut(path) {
            Some(Node::Dir { modified }) | Some(Node::File { modified, .. }) => {
                *modified = time;
                Ok(())
            }
            None => Err(StorageError::NotFound(path.to_path_buf())),
        }
    }

    /// Whether an entry (file or directory) exists at `path`.
    pub fn exists(&self, path: &Path) -> bool {
        self.inner
            .read()
            .map(|inner| inner.nodes.contains_key(path))
            .unwrap_or(false)
    }

    /// Number of files currently stored.
    pub fn file_count(&self) -> usize {
        self.inner
            .read()
            .map(|inner| {
                inner
                    .nodes
                    .values()
                    .filter(|n| matches!(n, Node::File { .. }))
                    .count()
            })
            .unwrap_or(0)
    }

    fn write_lock(&self) -> StorageResult<std::sync::RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))
    }

    fn read_lock(&self) -> StorageResult<std::sync::RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn create_dir_all(&self, path: &Path) -> StorageResult<()> {
        let mut inner = self.write_lock()?;
        if inner.failing_dirs.iter().any(|p| path.starts_with(p)) {
            return Err(StorageError::Injected(path.to_path_buf()));
        }

        let now = SystemTime::now();
        let mut ancestors: Vec<&Path> = path
            .ancestors()
            .filter(|a| !a.as_os_str().is_empty())
            .collect();
        ancestors.reverse();

        for ancestor in ancestors {
            let is_dir = inner
                .nodes
                .get(ancestor)
                .map(|n| matches!(n, Node::Dir { .. }));
            match is_dir {
                Some(true) => {}
                Some(false) => return Err(StorageError::NotADirectory(ancestor.to_path_buf())),
                None => {
                    inner
                        .nodes
                        .insert(ancestor.to_path_buf(), Node::Dir { modified: now });
                }
            }
        }
        Ok(())
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> StorageResult<()> {
        let mut inner = self.write_lock()?;
        if inner.failing_writes.iter().any(|p| path.starts_with(p)) {
            return Err(StorageError::Injected(path.to_path_buf()));
        }

        let parent = path
            .parent()
            .ok_or_else(|| StorageError::NotFound(path.to_path_buf()))?;
        match inner.nodes.get(parent) {
            Some(Node::Dir { .. }) => {}
            Some(Node::File { .. }) => return Err(StorageError::NotADirectory(parent.to_path_buf())),
            None => return Err(StorageError::NotFound(parent.to_path_buf())),
        }
        if let Some(Node::Dir { .. }) = inner.nodes.get(path) {
            return Err(StorageError::NotADirectory(path.to_path_buf()));
        }

        inner.nodes.insert(
            path.to_path_buf(),
            Node::File {
                contents: contents.to_vec(),
                modified: SystemTime::now(),
            },
        );
        Ok(())
    }

    async fn read(&self, path: &Path) -> StorageResult<Option<Vec<u8>>> {
        let inner = self.read_lock()?;
        match inner.nodes.get(path) {
            Some(Node::File { contents, .. }) => Ok(Some(contents.clone())),
            Some(Node::Dir { .. }) => Err(StorageError::NotADirectory(path.to_path_buf())),
            None => Ok(None),
        }
    }

    async fn read_dir(&self, path: &Path) -> StorageResult<Option<Vec<DirEntryInfo>>> {
        let inner = self.read_lock()?;
        match inner.nodes.get(path) {
            Some(Node::Dir { .. }) => {}
            Some(Node::File { .. }) => return Err(StorageError::NotADirectory(path.to_path_buf())),
            None => return Ok(None),
        }

        let entries = inner
            .nodes
            .iter()
            .filter(|(p, _)| p.parent() == Some(path))
            .map(|(p, node)| DirEntryInfo {
                path: p.clone(),
                is_dir: matches!(node, Node::Dir { .. }),
                modified: node.modified(),
            })
            .collect();
        Ok(Some(entries))
    }

    async fn remove_dir_all(&self, path: &Path) -> StorageResult<()> {
        let mut inner = self.write_lock()?;
        if inner.failing_removes.iter().any(|p| p == path) {
            return Err(StorageError::Injected(path.to_path_buf()));
        }
        inner.nodes.retain(|p, _| !p.starts_with(path));
        Ok(())
    }
}
