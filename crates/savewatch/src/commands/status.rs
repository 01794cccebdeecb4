//! `savewatch status`: summarize persisted snapshot sessions.

use savewatch_core::Config;
use savewatch_storage::{FsStorage, Storage, StorageResult};
use std::path::Path;

#[derive(Debug, PartialEq, Eq)]
pub struct SessionSummary {
    pub session_id: String,
    pub records: usize,
}

#[derive(Debug, PartialEq, Eq)]
pub struct DaySummary {
    pub day: String,
    pub sessions: Vec<SessionSummary>,
}

impl DaySummary {
    pub fn records(&self) -> usize {
        self.sessions.iter().map(|s| s.records).sum()
    }
}

/// Walk `root/<day>/<session>/*.json`. A missing root yields no days.
pub async fn summarize(storage: &dyn Storage, root: &Path) -> StorageResult<Vec<DaySummary>> {
    let mut days = Vec::new();
    for day in storage.read_dir(root).await?.unwrap_or_default() {
        if !day.is_dir {
            continue;
        }
        let mut sessions = Vec::new();
        for session in storage.read_dir(&day.path).await?.unwrap_or_default() {
            if !session.is_dir {
                continue;
            }
            let records = storage
                .read_dir(&session.path)
                .await?
                .unwrap_or_default()
                .iter()
                .filter(|e| !e.is_dir && e.path.extension().is_some_and(|ext| ext == "json"))
                .count();
            sessions.push(SessionSummary {
                session_id: session.name(),
                records,
            });
        }
        days.push(DaySummary {
            day: day.name(),
            sessions,
        });
    }
    Ok(days)
}

pub async fn show_status(config: &Config) -> anyhow::Result<()> {
    let root = config.storage_dir()?;
    println!("Storage: {}", root.display());
    match config.monitored_folder() {
        Some(folder) => println!("Monitored folder: {}", folder.display()),
        None => println!("Monitored folder: (not configured)"),
    }
    println!();

    let days = summarize(&FsStorage::new(), &root).await?;
    if days.is_empty() {
        println!("No snapshots recorded yet");
        return Ok(());
    }

    let mut total = 0;
    for day in &days {
        println!("{} ({} records)", day.day, day.records());
        for session in &day.sessions {
            println!("  {}  {}", session.session_id, session.records);
        }
        total += day.records();
    }
    println!();
    println!("Total: {total} records in {} day(s)", days.len());
    Ok(())
}
