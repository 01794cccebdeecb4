//! Logical file keys and collision-safe record file names.

use crate::{SnapshotError, SnapshotResult};
use savewatch_util::path::{relative_to, to_slash};
use std::path::Path;
use tracing::warn;

/// Longest sanitized key kept in a record file name, in characters.
const MAX_STEM_CHARS: usize = 150;

/// Compute the logical key of `absolute_path` under `monitored_root`.
///
/// The key is the root-relative path with `/` separators. If the path cannot
/// be made relative to the root, the file's base name is returned instead;
/// that degraded key is not guaranteed to be unique.
pub fn logical_key(absolute_path: &Path, monitored_root: &Path) -> SnapshotResult<String> {
    if absolute_path.as_os_str().is_empty() || monitored_root.as_os_str().is_empty() {
        return Err(SnapshotError::invalid_input(
            "file path and monitored folder must not be empty",
        ));
    }

    match relative_to(absolute_path, monitored_root).map(|p| to_slash(&p)) {
        Some(key) if !key.is_empty() => Ok(key),
        _ => {
            let fallback = basename(absolute_path);
            warn!(
                path = %absolute_path.display(),
                root = %monitored_root.display(),
                key = %fallback,
                "Could not relativize path, falling back to base name"
            );
            Ok(fallback)
        }
    }
}

fn basename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Turn a logical key into a string safe to use as part of a file name.
///
/// Path separators and characters reserved on common filesystems become `_`,
/// and runs of whitespace or dots collapse to a single `_`.
pub fn sanitize_file_stem(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut last_run: Option<char> = None;

    for c in key.chars() {
        let run = if c.is_whitespace() {
            Some(' ')
        } else if c == '.' {
            Some('.')
        } else {
            None
        };

        match run {
            Some(kind) => {
                if last_run != Some(kind) {
                    out.push('_');
                }
                last_run = Some(kind);
            }
            None => {
                last_run = None;
                let safe = match c {
                    '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
                    c if c.is_control() => '_',
                    c => c,
                };
                out.push(safe);
            }
        }
    }

    if out.chars().count() > MAX_STEM_CHARS {
        out = out.chars().take(MAX_STEM_CHARS).collect();
    }
    out
}

/// File name of a persisted record: `sanitize(key)_<id>.json`.
pub fn record_file_name(key: &str, id: &crate::SnapshotId) -> String {
    format!("{}_{}.json", sanitize_file_stem(key), id)
}
