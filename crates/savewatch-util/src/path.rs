//! Path utilities.
//!
//! This module provides utilities for working with file paths.

use std::path::{Component, Path, PathBuf};

/// Get the savewatch configuration directory.
///
/// This follows XDG conventions on Linux/macOS:
/// - `$XDG_CONFIG_HOME/savewatch` if set
/// - `~/.config/savewatch` otherwise
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("savewatch"))
}

/// Get the savewatch data directory.
///
/// This follows XDG conventions:
/// - `$XDG_DATA_HOME/savewatch` if set
/// - `~/.local/share/savewatch` otherwise
pub fn data_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|p| p.join("savewatch"))
}

/// Default root for persisted snapshot records.
pub fn snapshots_dir() -> Option<PathBuf> {
    data_dir().map(|p| p.join("snapshots"))
}

/// Resolve symlinks and `.`/`..` components.
///
/// A path that does not exist is resolved through its parent directory;
/// if that fails too it is normalized lexically.
pub fn resolve(path: &Path) -> PathBuf {
    if let Ok(resolved) = path.canonicalize() {
        return resolved;
    }
    if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
        if let Ok(parent) = parent.canonicalize() {
            return parent.join(name);
        }
    }
    normalize(path)
}

/// Normalize a path by removing `.` and `..` components.
///
/// Unlike `canonicalize`, this doesn't require the path to exist.
pub fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();

    for component in path.components() {
        match component {
            Component::ParentDir => {
                result.pop();
            }
            Component::CurDir => {}
            _ => {
                result.push(component);
            }
        }
    }

    result
}

/// Make a path relative to a base directory.
///
/// Both paths are normalized first. Returns `None` if the path is not
/// within the base directory.
pub fn relative_to(path: &Path, base: &Path) -> Option<PathBuf> {
    normalize(path)
        .strip_prefix(normalize(base))
        .ok()
        .map(|p| p.to_path_buf())
}

/// Render a relative path with `/` separators regardless of platform.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir() {
        if let Some(dir) = config_dir() {
            assert!(dir.ends_with("savewatch"));
        }
    }

    #[test]
    fn test_resolved_containment() {
        let base = resolve(Path::new("/home/user/project"));
        assert!(resolve(Path::new("/home/user/project/src")).starts_with(&base));
        assert!(!resolve(Path::new("/home/user/other")).starts_with(&base));
        assert!(!resolve(Path::new("/home/user/project/../other")).starts_with(&base));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_follows_symlinked_base() {
        let temp = tempfile::tempdir().unwrap();
        let real = temp.path().join("real");
        std::fs::create_dir_all(real.join("src")).unwrap();
        let link = temp.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let real = real.canonicalize().unwrap();
        assert_eq!(resolve(&link), real);
        // not written yet, resolved through its parent
        assert_eq!(resolve(&link.join("src/new.rs")), real.join("src/new.rs"));
        assert!(resolve(&real.join("src/new.rs")).starts_with(resolve(&link)));
        assert_eq!(
            relative_to(&resolve(&real.join("src/new.rs")), &resolve(&link)),
            Some(PathBuf::from("src/new.rs"))
        );
    }

    #[test]
    fn test_resolve_missing_path_is_lexical() {
        assert_eq!(
            resolve(Path::new("/no/such/dir/./a/../b.rs")),
            PathBuf::from("/no/such/dir/b.rs")
        );
    }

    #[test]
    fn test_normalize() {
        let path = Path::new("/home/user/./project/../project/src");
        let normalized = normalize(path);
        assert_eq!(normalized, PathBuf::from("/home/user/project/src"));
    }

    #[test]
    fn test_relative_to() {
        let base = Path::new("/home/user/project");
        let path = Path::new("/home/user/project/src/main.rs");
        assert_eq!(relative_to(path, base), Some(PathBuf::from("src/main.rs")));
        assert_eq!(relative_to(Path::new("/etc/passwd"), base), None);
    }

    #[test]
    fn test_relative_to_normalizes_both_sides() {
        let base = Path::new("/home/user/./project/");
        let path = Path::new("/home/user/project/src/../lib.rs");
        assert_eq!(relative_to(path, base), Some(PathBuf::from("lib.rs")));
    }

    #[test]
    fn test_to_slash() {
        let path: PathBuf = ["src", "nested", "mod.rs"].iter().collect();
        assert_eq!(to_slash(&path), "src/nested/mod.rs");
        assert_eq!(to_slash(Path::new("")), "");
    }
}
