//! File snapshot store for savewatch.
//!
//! Every save of a tracked file becomes an immutable [`Snapshot`]:
//! - kept in a bounded per-file history in memory
//! - written as a JSON record under `root/YYYY-MM-DD/<session>/`
//! - hashed so consecutive snapshots can be compared cheaply
//!
//! Old dated directories are swept with [`SnapshotStore::purge_expired`].
//!
//! # Example
//!
//! ```no_run
//! use savewatch_snapshot::{SnapshotStore, StoreConfig};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SnapshotStore::open("/tmp/savewatch/snapshots", StoreConfig::default()).await?;
//!
//! let path = Path::new("/project/src/main.rs");
//! let key = SnapshotStore::logical_key(path, Path::new("/project"))?;
//! let previous = store.previous(&key);
//! let recorded = store.record(&key, path, "fn main() {}\n", "rust").await?;
//! if let Err(e) = &recorded.persisted {
//!     eprintln!("snapshot kept in memory only: {e}");
//! }
//! # let _ = previous;
//! # Ok(())
//! # }
//! ```

mod error;
pub mod key;
mod retention;
mod snapshot;
mod store;

pub use error::{SnapshotError, SnapshotResult};
pub use snapshot::{
    count_lines, ContentHash, PersistedSnapshot, Snapshot, SnapshotId, SnapshotMetadata,
    DISK_TRUNCATION_MARKER, MEMORY_TRUNCATION_MARKER,
};
pub use store::{purge_expired, PurgeReport, Recorded, SnapshotStore, StoreConfig, StoreStats};
