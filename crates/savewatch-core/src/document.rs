//! Saved documents as seen by the tracker.

use crate::error::CoreResult;
use savewatch_snapshot::count_lines;
use std::path::{Path, PathBuf};

/// A document that was just saved.
pub trait Document: Send + Sync {
    /// Absolute path of the file.
    fn path(&self) -> &Path;

    /// Full current text.
    fn text(&self) -> &str;

    /// Number of lines as the source sees them. Recorded as-is on the
    /// snapshot; defaults to counting `\n`-separated segments of the text.
    fn line_count(&self) -> usize {
        count_lines(self.text())
    }

    /// Declared language identifier (e.g. `rust`, `typescript`).
    fn language_id(&self) -> &str;
}

/// A document read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDocument {
    path: PathBuf,
    text: String,
    language_id: String,
}

impl FileDocument {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let path = path.into();
        let language_id = language_for_path(&path).to_string();
        Self {
            path,
            text: text.into(),
            language_id,
        }
    }

    /// Read `path` from disk. Invalid UTF-8 is replaced lossily.
    pub async fn load(path: impl Into<PathBuf>) -> CoreResult<Self> {
        let path = path.into();
        let bytes = tokio::fs::read(&path).await?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        Ok(Self::new(path, text))
    }

    pub fn with_language(mut self, language_id: impl Into<String>) -> Self {
        self.language_id = language_id.into();
        self
    }
}

impl Document for FileDocument {
    fn path(&self) -> &Path {
        &self.path
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn language_id(&self) -> &str {
        &self.language_id
    }
}

/// Map a file extension to a language identifier.
pub fn language_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "rs" => "rust",
        "ts" => "typescript",
        "tsx" => "typescriptreact",
        "js" => "javascript",
        "jsx" => "javascriptreact",
        "py" => "python",
        "go" => "go",
        "java" => "java",
        "c" | "h" => "c",
        "cpp" | "hpp" | "cc" | "cxx" => "cpp",
        "cs" => "csharp",
        "rb" => "ruby",
        "php" => "php",
        "swift" => "swift",
        "kt" | "kts" => "kotlin",
        "scala" => "scala",
        "lua" => "lua",
        "sh" | "bash" => "shellscript",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "md" => "markdown",
        "html" => "html",
        "css" => "css",
        "scss" => "scss",
        "sql" => "sql",
        _ => "plaintext",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_for_path() {
        assert_eq!(language_for_path(Path::new("src/main.rs")), "rust");
        assert_eq!(language_for_path(Path::new("App.TSX")), "typescriptreact");
        assert_eq!(language_for_path(Path::new("Makefile")), "plaintext");
        assert_eq!(language_for_path(Path::new("notes.txt")), "plaintext");
    }

    #[test]
    fn test_file_document_capabilities() {
        let doc = FileDocument::new("/p/lib.py", "a\nb\nc");
        assert_eq!(doc.path(), Path::new("/p/lib.py"));
        assert_eq!(doc.text(), "a\nb\nc");
        assert_eq!(doc.line_count(), 3);
        assert_eq!(doc.language_id(), "python");

        let doc = doc.with_language("cython");
        assert_eq!(doc.language_id(), "cython");
    }

    #[tokio::test]
    async fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.go");
        tokio::fs::write(&path, b"package main\n\xff").await.unwrap();

        let doc = FileDocument::load(&path).await.unwrap();
        assert_eq!(doc.language_id(), "go");
        assert!(doc.text().starts_with("package main\n"));
        assert_eq!(doc.line_count(), 2);
    }

    #[tokio::test]
    async fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FileDocument::load(dir.path().join("gone.rs")).await.is_err());
    }
}
