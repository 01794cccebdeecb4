//! Per-path debouncing of file change events.
//!
//! Editors often touch a file several times per save (truncate, write,
//! rename). A path is forwarded once it has been quiet for the delay.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Forward each path from `input` after `delay` without further events for it.
///
/// Paths still pending when `input` closes are flushed immediately.
pub fn spawn(
    mut input: mpsc::UnboundedReceiver<PathBuf>,
    delay: Duration,
) -> mpsc::UnboundedReceiver<PathBuf> {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut pending: HashMap<PathBuf, Instant> = HashMap::new();

        loop {
            let next_deadline = pending.values().min().copied();
            tokio::select! {
                event = input.recv() => match event {
                    Some(path) => {
                        pending.insert(path, Instant::now() + delay);
                    }
                    None => break,
                },
                _ = sleep_until(next_deadline) => {
                    let now = Instant::now();
                    let ready: Vec<PathBuf> = pending
                        .iter()
                        .filter(|(_, deadline)| **deadline <= now)
                        .map(|(path, _)| path.clone())
                        .collect();
                    for path in ready {
                        pending.remove(&path);
                        if tx.send(path).is_err() {
                            return;
                        }
                    }
                }
            }
        }

        for (path, _) in pending.drain() {
            if tx.send(path).is_err() {
                return;
            }
        }
    });

    rx
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    async fn next(rx: &mut mpsc::UnboundedReceiver<PathBuf>) -> PathBuf {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out")
            .expect("channel closed")
    }

    #[tokio::test]
    async fn test_bursts_collapse_per_path() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut out = spawn(rx, Duration::from_millis(50));

        for _ in 0..3 {
            tx.send(PathBuf::from("/p/a.rs")).unwrap();
        }
        tx.send(PathBuf::from("/p/b.rs")).unwrap();

        let got: HashSet<PathBuf> = [next(&mut out).await, next(&mut out).await].into();
        assert_eq!(
            got,
            HashSet::from([PathBuf::from("/p/a.rs"), PathBuf::from("/p/b.rs")])
        );

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(out.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_pending_paths_flush_on_close() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut out = spawn(rx, Duration::from_secs(3600));
        tx.send(PathBuf::from("/p/slow.rs")).unwrap();
        drop(tx);

        assert_eq!(next(&mut out).await, PathBuf::from("/p/slow.rs"));
        assert!(out.recv().await.is_none());
    }
}
