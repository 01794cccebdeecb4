//! AI coding assistant extension scanner.
//!
//! Looks at an editor extensions directory (by default `~/.vscode/extensions`)
//! and reports installed extensions whose id appears in a blocklist. Runs
//! independently of save tracking, once or on an interval via [`ScanTask`].

use crate::error::CoreResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Extension ids of known AI coding assistants, lowercase.
pub const AI_EXTENSIONS: &[&str] = &[
    "github.copilot",
    "github.copilot-chat",
    "microsoft.github-copilot-labs",
    "saoudrizwan.claude-dev",
    "anthropic.claude-3-vscode",
    "tabnine.tabnine-vscode",
    "codeium.codeium",
    "cursor.cursor-vscode",
    "continue.continue",
    "sourcegraph.cody-ai",
    "amazonwebservices.aws-toolkit-vscode",
    "amazon.q-developer",
    "visualstudioexptteam.vscodeintellicode",
    "google.duet-ai",
    "windsurf.windsurf-cascade",
    "openai.openai-vscode",
    "meta.code-llama",
    "kite.kite",
    "deepcode.deepcode",
    "intellij.ai-assistant",
    "stability.stablecode",
    "cohere.cohere-vscode",
    "ai-toolkit.ai-toolkit",
    "blackbox.blackbox-ai",
];

/// Result of one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// Directory that was scanned.
    pub directory: PathBuf,
    /// Number of installed extensions seen.
    pub scanned: usize,
    /// Blocklisted extension ids found, sorted and deduplicated.
    pub detected: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    publisher: Option<String>,
    name: Option<String>,
}

/// Scans one extensions directory against a blocklist.
#[derive(Debug, Clone)]
pub struct ExtensionScanner {
    directory: PathBuf,
    blocklist: Vec<String>,
}

impl ExtensionScanner {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self::with_blocklist(directory, AI_EXTENSIONS.iter().map(|s| s.to_string()))
    }

    pub fn with_blocklist(
        directory: impl Into<PathBuf>,
        blocklist: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            directory: directory.into(),
            blocklist: blocklist.into_iter().map(|s| s.to_lowercase()).collect(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Scan once. A missing directory yields an empty report.
    pub async fn scan(&self) -> CoreResult<ScanReport> {
        let mut report = ScanReport {
            directory: self.directory.clone(),
            ..Default::default()
        };

        let mut entries = match tokio::fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(dir = %self.directory.display(), "No extensions directory");
                return Ok(report);
            }
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let Some(id) = extension_id(&entry.path()).await else {
                continue;
            };
            report.scanned += 1;
            if self.blocklist.contains(&id) {
                debug!(extension = %id, "Detected AI extension");
                report.detected.push(id);
            }
        }

        report.detected.sort();
        report.detected.dedup();
        Ok(report)
    }
}

/// Identify the extension installed in `dir`.
///
/// Prefers `publisher.name` from its `package.json`, falling back to the
/// directory name (`publisher.name-1.2.3`).
pub async fn extension_id(dir: &Path) -> Option<String> {
    if let Ok(bytes) = tokio::fs::read(dir.join("package.json")).await {
        if let Ok(Manifest {
            publisher: Some(publisher),
            name: Some(name),
        }) = serde_json::from_slice::<Manifest>(&bytes)
        {
            return Some(format!("{publisher}.{name}").to_lowercase());
        }
    }
    let name = dir.file_name()?.to_str()?;
    id_from_dir_name(name)
}

/// `github.copilot-chat-0.12.0` -> `github.copilot-chat`
fn id_from_dir_name(name: &str) -> Option<String> {
    if name.starts_with('.') || !name.contains('.') {
        return None;
    }
    let id = name
        .match_indices('-')
        .rev()
        .find(|(i, _)| name[i + 1..].starts_with(|c: char| c.is_ascii_digit()))
        .map(|(i, _)| &name[..i])
        .unwrap_or(name);
    Some(id.to_lowercase())
}

/// Shortest period between two scans.
pub const MIN_SCAN_INTERVAL: Duration = Duration::from_millis(1);

/// Periodic scan running on the tokio runtime until disposed.
#[derive(Debug)]
pub struct ScanTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl ScanTask {
    /// Scan immediately, then every `interval`, sending each report to `tx`.
    ///
    /// Stops on [`ScanTask::dispose`] or when the receiver is dropped.
    /// A zero `interval` is raised to [`MIN_SCAN_INTERVAL`].
    pub fn spawn(
        scanner: ExtensionScanner,
        interval: Duration,
        tx: mpsc::UnboundedSender<ScanReport>,
    ) -> Self {
        let interval = interval.max(MIN_SCAN_INTERVAL);
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            info!(
                dir = %scanner.directory().display(),
                interval_ms = interval.as_millis() as u64,
                "Extension scan started"
            );

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let report = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    report = scanner.scan() => report,
                };
                match report {
                    Ok(report) => {
                        if !report.detected.is_empty() {
                            warn!(
                                count = report.detected.len(),
                                extensions = %report.detected.join(", "),
                                "AI coding extensions installed"
                            );
                        }
                        if tx.send(report).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Extension scan failed: {}", e),
                }
            }
            info!("Extension scan stopped");
        });

        Self { cancel, handle }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stop the task and wait for it to exit.
    pub async fn dispose(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            warn!("Extension scan task ended abnormally: {}", e);
        }
    }
}
