//! Snapshot data structures.

use chrono::{DateTime, Utc};
use savewatch_util::Identifier;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Appended to in-memory content that was shrunk to bound memory use.
pub const MEMORY_TRUNCATION_MARKER: &str = "...[memory_optimized]";

/// Appended to persisted content that was shortened before serialization.
pub const DISK_TRUNCATION_MARKER: &str = "...[truncated]";

/// Unique identifier for a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotId(pub String);

impl SnapshotId {
    /// Create a new snapshot ID, unique for the lifetime of the process.
    pub fn new() -> Self {
        Self(Identifier::snapshot())
    }

    /// Create a snapshot ID from a string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the ID as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SnapshotId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hex-encoded SHA-256 of a snapshot's text content.
///
/// Used only for cheap equality checks between snapshots, not for integrity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(pub String);

impl ContentHash {
    /// Hash the given content. Same text always yields the same hash.
    pub fn of(content: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Size and type information captured with a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    /// Size of the content in UTF-8 bytes.
    pub file_size: u64,
    /// Language identifier declared by the document source.
    pub language: String,
    /// Text encoding of the content.
    pub encoding: String,
}

/// The state of one tracked file at one instant.
///
/// Statistics (`line_count`, `character_count`, `hash`, `metadata.file_size`)
/// always describe the original content, even if `content` was later shrunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Unique identifier for this snapshot.
    pub id: SnapshotId,

    /// When the snapshot was taken.
    pub timestamp: DateTime<Utc>,

    /// ID of the session that created this snapshot.
    pub session_id: String,

    /// Absolute path of the file.
    pub file_path: PathBuf,

    /// Logical key: the path relative to the monitored root.
    pub relative_path: String,

    /// Text content (possibly truncated, see [`Snapshot::is_content_truncated`]).
    pub content: String,

    pub line_count: usize,

    /// Number of Unicode scalar values in the original content.
    pub character_count: usize,

    pub hash: ContentHash,

    pub metadata: SnapshotMetadata,
}

impl Snapshot {
    /// Capture a new snapshot of `content`, stamped with the current time.
    pub fn capture(
        session_id: impl Into<String>,
        file_path: impl Into<PathBuf>,
        relative_path: impl Into<String>,
        content: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        let content = content.into();
        Self {
            id: SnapshotId::new(),
            timestamp: Utc::now(),
            session_id: session_id.into(),
            file_path: file_path.into(),
            relative_path: relative_path.into(),
            line_count: count_lines(&content),
            character_count: content.chars().count(),
            hash: ContentHash::of(&content),
            metadata: SnapshotMetadata {
                file_size: content.len() as u64,
                language: language.into(),
                encoding: "utf8".to_string(),
            },
            content,
        }
    }

    /// Logical key this snapshot is grouped under.
    pub fn key(&self) -> &str {
        &self.relative_path
    }

    /// Absolute path of the captured file.
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Whether `content` was shortened (in memory or on disk).
    pub fn is_content_truncated(&self) -> bool {
        self.content.ends_with(MEMORY_TRUNCATION_MARKER)
            || self.content.ends_with(DISK_TRUNCATION_MARKER)
    }

    /// Shrink oversized content in place. Statistics are left untouched.
    ///
    /// Returns `true` if the content was truncated.
    pub(crate) fn shrink_content(&mut self, threshold: usize, keep: usize) -> bool {
        match truncate_chars(&self.content, threshold, keep, MEMORY_TRUNCATION_MARKER) {
            Some(shrunk) => {
                self.content = shrunk;
                true
            }
            None => false,
        }
    }
}

/// A snapshot as written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSnapshot {
    #[serde(flatten)]
    pub snapshot: Snapshot,

    /// Whether `content` was cut before serialization.
    #[serde(default)]
    pub content_truncated: bool,
}

impl PersistedSnapshot {
    /// Build the on-disk form from a snapshot holding its full content.
    pub fn from_full(snapshot: &Snapshot, threshold: usize) -> Self {
        let mut snapshot = snapshot.clone();
        let content_truncated =
            match truncate_chars(&snapshot.content, threshold, threshold, DISK_TRUNCATION_MARKER) {
                Some(cut) => {
                    snapshot.content = cut;
                    true
                }
                None => false,
            };
        Self {
            snapshot,
            content_truncated,
        }
    }
}

/// Count lines the way editors do: `\n`-separated segments, so empty text
/// is one line and a trailing newline opens a new (empty) line.
pub fn count_lines(content: &str) -> usize {
    content.split('\n').count()
}

/// If `content` has more than `threshold` characters, return its first
/// `keep` characters followed by `marker`.
fn truncate_chars(content: &str, threshold: usize, keep: usize, marker: &str) -> Option<String> {
    // Cheap reject: byte length bounds character count from above.
    if content.len() <= threshold {
        return None;
    }
    if content.chars().count() <= threshold {
        return None;
    }
    let cut = content
        .char_indices()
        .nth(keep)
        .map(|(i, _)| i)
        .unwrap_or(content.len());
    let mut out = String::with_capacity(cut + marker.len());
    out.push_str(&content[..cut]);
    out.push_str(marker);
    Some(out)
}
