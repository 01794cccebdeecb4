//! Configuration management for savewatch.
//!
//! Configuration is loaded from multiple sources and merged:
//! 1. Global config: `~/.config/savewatch/config.json` (or `.jsonc`)
//! 2. Environment variable: `SAVEWATCH_CONFIG_CONTENT`
//! 3. Project config: `savewatch.jsonc` or `savewatch.json` in the monitored directory
//!
//! Files may contain `//` and `/* */` comments. Every field is optional;
//! the accessors fall back to built-in defaults.

use crate::classify::Thresholds;
use crate::error::{ConfigError, CoreResult};
use savewatch_snapshot::StoreConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_RETENTION_DAYS: u32 = 7;
pub const DEFAULT_AI_SCAN_INTERVAL_MS: u64 = 300_000;

const LINE_THRESHOLD_RANGE: std::ops::RangeInclusive<i64> = 10..=1000;
const AI_SCAN_INTERVAL_RANGE: std::ops::RangeInclusive<u64> = 60_000..=3_600_000;

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,

    /// Directory whose saves are tracked. Save handling is inert without it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monitored_folder: Option<PathBuf>,

    /// Root for persisted snapshot records.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_dir: Option<PathBuf>,

    /// Editor extensions directory to scan.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions_dir: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_threshold: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_threshold_ms: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub char_threshold: Option<u64>,

    /// Snapshots kept in memory per file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_file_history_cap: Option<usize>,

    /// Files kept in memory at once.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_set_cap: Option<usize>,

    /// Dated snapshot directories older than this are purged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention_days: Option<u32>,

    /// How often the extension scanner runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_scan_interval_ms: Option<u64>,
}

/// Log levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for savewatch_util::log::LogLevel {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::Trace,
            LogLevel::Debug => Self::Debug,
            LogLevel::Info => Self::Info,
            LogLevel::Warn => Self::Warn,
            LogLevel::Error => Self::Error,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Loading order (later sources override earlier):
    /// 1. Global config from `~/.config/savewatch/`
    /// 2. `SAVEWATCH_CONFIG_CONTENT` environment variable
    /// 3. Project config from `project_dir`
    ///
    /// Returns the merged config and the files it was read from.
    pub async fn load(project_dir: Option<&Path>) -> CoreResult<(Self, Vec<PathBuf>)> {
        let mut config = Config::default();
        let mut sources = Vec::new();

        if let Some(global_dir) = Self::global_config_dir() {
            for name in &["config.json", "config.jsonc"] {
                let path = global_dir.join(name);
                if path.exists() {
                    config = config.merge(Self::load_file(&path).await?);
                    sources.push(path);
                    break;
                }
            }
        }

        if let Ok(content) = std::env::var("SAVEWATCH_CONFIG_CONTENT") {
            config = config.merge(Self::parse_jsonc(&content, "<env>")?);
        }

        if let Some(dir) = project_dir {
            for name in &["savewatch.jsonc", "savewatch.json"] {
                let path = dir.join(name);
                if path.exists() {
                    config = config.merge(Self::load_file(&path).await?);
                    sources.push(path);
                    break;
                }
            }
        }

        tracing::debug!(sources = sources.len(), "Loaded configuration");
        Ok((config, sources))
    }

    /// Get the global config directory.
    pub fn global_config_dir() -> Option<PathBuf> {
        savewatch_util::path::config_dir()
    }

    /// Load configuration from a file.
    pub async fn load_file(path: &Path) -> CoreResult<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse_jsonc(&content, &path.display().to_string())
    }

    /// Parse JSONC (JSON with comments).
    pub fn parse_jsonc(content: &str, source: &str) -> CoreResult<Self> {
        let stripped = strip_comments(content);
        serde_json::from_str(&stripped).map_err(|e| {
            ConfigError::InvalidJson {
                path: source.to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(self, other: Self) -> Self {
        Self {
            log_level: merge_option(self.log_level, other.log_level),
            monitored_folder: merge_option(self.monitored_folder, other.monitored_folder),
            storage_dir: merge_option(self.storage_dir, other.storage_dir),
            extensions_dir: merge_option(self.extensions_dir, other.extensions_dir),
            line_threshold: merge_option(self.line_threshold, other.line_threshold),
            time_threshold_ms: merge_option(self.time_threshold_ms, other.time_threshold_ms),
            char_threshold: merge_option(self.char_threshold, other.char_threshold),
            per_file_history_cap: merge_option(
                self.per_file_history_cap,
                other.per_file_history_cap,
            ),
            working_set_cap: merge_option(self.working_set_cap, other.working_set_cap),
            retention_days: merge_option(self.retention_days, other.retention_days),
            ai_scan_interval_ms: merge_option(self.ai_scan_interval_ms, other.ai_scan_interval_ms),
        }
    }

    /// Check values against their sensible ranges.
    ///
    /// Out-of-range values are still used; each one yields a warning.
    /// Zero caps and a zero scan interval are the exception and fall back
    /// to defaults.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Some(v) = self.line_threshold {
            if !LINE_THRESHOLD_RANGE.contains(&v) {
                warnings.push(format!(
                    "line_threshold {v} is outside {}..={}",
                    LINE_THRESHOLD_RANGE.start(),
                    LINE_THRESHOLD_RANGE.end()
                ));
            }
        }
        if self.ai_scan_interval_ms == Some(0) {
            warnings.push("ai_scan_interval_ms must be positive, using default".to_string());
        } else if let Some(v) = self.ai_scan_interval_ms {
            if !AI_SCAN_INTERVAL_RANGE.contains(&v) {
                warnings.push(format!(
                    "ai_scan_interval_ms {v} is outside {}..={}",
                    AI_SCAN_INTERVAL_RANGE.start(),
                    AI_SCAN_INTERVAL_RANGE.end()
                ));
            }
        }
        if self.per_file_history_cap == Some(0) {
            warnings.push("per_file_history_cap must be positive, using default".to_string());
        }
        if self.working_set_cap == Some(0) {
            warnings.push("working_set_cap must be positive, using default".to_string());
        }

        warnings
    }

    /// Monitored folder, if one is set and non-empty.
    pub fn monitored_folder(&self) -> Option<&Path> {
        self.monitored_folder
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }

    pub fn thresholds(&self) -> Thresholds {
        let defaults = Thresholds::default();
        Thresholds {
            line_threshold: self.line_threshold.unwrap_or(defaults.line_threshold),
            time_threshold_ms: self.time_threshold_ms.unwrap_or(defaults.time_threshold_ms),
            char_threshold: self.char_threshold.unwrap_or(defaults.char_threshold),
        }
    }

    pub fn store_config(&self) -> StoreConfig {
        let defaults = StoreConfig::default();
        StoreConfig {
            per_file_history_cap: self
                .per_file_history_cap
                .filter(|&n| n > 0)
                .unwrap_or(defaults.per_file_history_cap),
            working_set_cap: self
                .working_set_cap
                .filter(|&n| n > 0)
                .unwrap_or(defaults.working_set_cap),
            ..defaults
        }
    }

    pub fn retention_days(&self) -> u32 {
        self.retention_days.unwrap_or(DEFAULT_RETENTION_DAYS)
    }

    pub fn scan_interval(&self) -> Duration {
        let ms = self
            .ai_scan_interval_ms
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_AI_SCAN_INTERVAL_MS);
        Duration::from_millis(ms)
    }

    /// Extensions directory: configured, or `~/.vscode/extensions`.
    pub fn extensions_dir(&self) -> Option<PathBuf> {
        self.extensions_dir
            .clone()
            .or_else(|| dirs::home_dir().map(|h| h.join(".vscode").join("extensions")))
    }

    /// Snapshot storage root: configured, or the user data directory.
    pub fn storage_dir(&self) -> CoreResult<PathBuf> {
        match &self.storage_dir {
            Some(dir) => Ok(dir.clone()),
            None => savewatch_util::path::snapshots_dir().ok_or_else(|| {
                ConfigError::InvalidPath("could not determine data directory".to_string()).into()
            }),
        }
    }
}

/// Strip `//` and `/* */` comments outside of string literals.
fn strip_comments(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;
    let mut escape_next = false;

    while let Some(c) = chars.next() {
        if escape_next {
            result.push(c);
            escape_next = false;
            continue;
        }
        if in_string {
            match c {
                '\\' => escape_next = true,
                '"' => in_string = false,
                _ => {}
            }
            result.push(c);
            continue;
        }
        if c == '"' {
            in_string = true;
            result.push(c);
            continue;
        }

        match (c, chars.peek()) {
            ('/', Some('/')) => {
                chars.next();
                for c in chars.by_ref() {
                    if c == '\n' {
                        result.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = ' ';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    // keep line numbers in parse errors accurate
                    if c == '\n' {
                        result.push('\n');
                    }
                    prev = c;
                }
            }
            _ => result.push(c),
        }
    }

    result
}

fn merge_option<T>(base: Option<T>, other: Option<T>) -> Option<T> {
    other.or(base)
}
