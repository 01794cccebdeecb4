//! `savewatch watch`: record every save under a folder until Ctrl-C.

use crate::debounce;
use anyhow::Context;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use savewatch_core::{
    ChannelSink, Config, FileDocument, Finding, SaveOutcome, ScanReport, Tracker,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

pub struct WatchOptions {
    /// Folder given on the command line.
    pub folder: Option<PathBuf>,
    /// Used when neither the command line nor the config names a folder.
    pub fallback: PathBuf,
    pub debounce: Duration,
    pub scan: bool,
}

pub async fn run_watch(mut config: Config, options: WatchOptions) -> anyhow::Result<()> {
    let folder = options
        .folder
        .or_else(|| config.monitored_folder().map(Path::to_path_buf))
        .unwrap_or(options.fallback);
    let folder = folder
        .canonicalize()
        .with_context(|| format!("cannot watch {}", folder.display()))?;
    config.monitored_folder = Some(folder.clone());

    let (sink, mut findings) = ChannelSink::new();
    let tracker = Tracker::new(config, Arc::new(sink)).await?;
    let storage_root = tracker.store().root().to_path_buf();

    let mut scans = if options.scan {
        tracker.start_extension_scan()
    } else {
        None
    };

    let (raw_tx, raw_rx) = mpsc::unbounded_channel();
    let mut watcher = {
        let root = folder.clone();
        let storage_root = storage_root.clone();
        RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                for path in changed_files(res, &root, &storage_root) {
                    if raw_tx.send(path).is_err() {
                        break;
                    }
                }
            },
            notify::Config::default(),
        )?
    };
    watcher.watch(&folder, RecursiveMode::Recursive)?;
    let mut saves = debounce::spawn(raw_rx, options.debounce);

    println!("Watching {} (Ctrl-C to stop)", folder.display());
    println!("Snapshots: {}", storage_root.display());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break;
            }
            Some(path) = saves.recv() => {
                let tracker = tracker.clone();
                tokio::spawn(async move { handle_save(&tracker, path).await });
            }
            Some(finding) = findings.recv() => print_finding(&finding),
            Some(report) = next_scan(&mut scans) => print_scan(&report),
        }
    }

    drop(watcher);
    tracker.dispose().await;

    let stats = tracker.stats();
    println!(
        "Recorded {} snapshot(s) of {} file(s) in memory",
        stats.total_snapshots, stats.total_tracked_files
    );
    Ok(())
}

/// Files created or modified by a notify event, excluding our own records.
fn changed_files(res: notify::Result<Event>, root: &Path, storage_root: &Path) -> Vec<PathBuf> {
    let event = match res {
        Ok(event) => event,
        Err(e) => {
            error!(error = %e, "File watcher error");
            return Vec::new();
        }
    };
    trace!(kind = ?event.kind, paths = ?event.paths, "Received notify event");

    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
        return Vec::new();
    }

    event
        .paths
        .into_iter()
        .filter(|path| path.starts_with(root) && !path.starts_with(storage_root))
        .filter(|path| !is_ignored(path.strip_prefix(root).unwrap_or(path.as_path())))
        .filter(|path| path.is_file())
        .collect()
}

/// Hidden files and directories (`.git`, editor swap files) are not tracked.
fn is_ignored(relative: &Path) -> bool {
    relative.components().any(|c| {
        c.as_os_str()
            .to_str()
            .is_some_and(|s| s.starts_with('.') || s.ends_with('~'))
    })
}

async fn handle_save(tracker: &Tracker, path: PathBuf) {
    let document = match FileDocument::load(&path).await {
        Ok(document) => document,
        Err(e) => {
            // usually deleted or renamed before the debounce fired
            debug!(path = %path.display(), "Skipping unreadable file: {}", e);
            return;
        }
    };

    match tracker.handle_save(&document).await {
        Ok(SaveOutcome::Recorded(report)) => {
            if let Some(warning) = &report.persist_warning {
                warn!(key = %report.key, "Snapshot kept in memory only: {}", warning);
            }
            debug!(
                key = %report.key,
                snapshot_id = %report.snapshot.id,
                first = report.is_first(),
                "Recorded save"
            );
        }
        Ok(SaveOutcome::Dropped { key }) => debug!(key = %key, "Save dropped"),
        Ok(SaveOutcome::Inert(reason)) => trace!(?reason, "Save ignored"),
        Err(e) => error!(path = %path.display(), "Failed to handle save: {}", e),
    }
}

async fn next_scan(scans: &mut Option<mpsc::UnboundedReceiver<ScanReport>>) -> Option<ScanReport> {
    match scans {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

fn print_finding(finding: &Finding) {
    println!("! suspicious change: {}", finding.summary());
}

fn print_scan(report: &ScanReport) {
    if !report.detected.is_empty() {
        println!(
            "! AI coding extensions installed: {}",
            report.detected.join(", ")
        );
    }
}
