//! Parsed/total counters and the derived completion percentage.
//!
//! Single-writer: only the active slice or chunk mutates the counters, at
//! slice boundaries rather than per record, which bounds update overhead.
//! Readers either poll [`ProgressTracker::snapshot`] or subscribe to the
//! watch channel.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use tokio::sync::watch;
use tracing::info;

/// A point-in-time view of batch progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// Rows decoded so far.
    pub parsed: usize,
    /// Total rows, when a pre-count has run. Stays `None` in single-pass
    /// mode, which is distinct from a known-empty input's `Some(0)`.
    pub total: Option<usize>,
    /// Completion percentage; `None` while the total is unknown.
    pub percent: Option<u8>,
}

impl ProgressSnapshot {
    /// Human-readable status line for the presentation layer.
    pub fn status(&self) -> String {
        match (self.total, self.percent) {
            (Some(total), Some(percent)) => {
                format!("decoded {} of {total} rows ({percent}%)", self.parsed)
            }
            _ => format!("decoded {} rows", self.parsed),
        }
    }
}

/// Maintains parsed/total counters for one pipeline run.
pub struct ProgressTracker {
    parsed: AtomicUsize,
    total: OnceLock<usize>,
    tx: watch::Sender<ProgressSnapshot>,
}

impl ProgressTracker {
    /// Create a tracker with no progress and an unknown total.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ProgressSnapshot {
            parsed: 0,
            total: None,
            percent: None,
        });
        Self {
            parsed: AtomicUsize::new(0),
            total: OnceLock::new(),
            tx,
        }
    }

    /// Record the pre-counted total. The first count wins; later calls are
    /// ignored.
    pub fn set_total(&self, total: usize) {
        let _ = self.total.set(total);
        self.publish();
    }

    /// Advance the parsed counter. Called at slice boundaries, not per record.
    pub fn advance(&self, rows: usize) {
        if rows == 0 {
            return;
        }
        self.parsed.fetch_add(rows, Ordering::Relaxed);
        self.publish();
    }

    /// Rows decoded so far.
    pub fn parsed(&self) -> usize {
        self.parsed.load(Ordering::Relaxed)
    }

    /// Total rows, if a pre-count has run.
    pub fn total(&self) -> Option<usize> {
        self.total.get().copied()
    }

    /// `round(100 * parsed / total)`; `Some(0)` for a known-empty input,
    /// `None` while the total is unknown.
    pub fn percent(&self) -> Option<u8> {
        match self.total() {
            None => None,
            Some(0) => Some(0),
            Some(total) => {
                let pct = (100.0 * self.parsed() as f64 / total as f64).round();
                Some(pct.min(100.0) as u8)
            }
        }
    }

    /// Current counters as one consistent-enough view for display.
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            parsed: self.parsed(),
            total: self.total(),
            percent: self.percent(),
        }
    }

    /// Subscribe to snapshot updates.
    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.tx.subscribe()
    }

    fn publish(&self) {
        // No subscribers is fine; the send just becomes a no-op.
        let _ = self.tx.send(self.snapshot());
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn a background task that logs each progress update as it arrives.
pub fn log_task(
    mut rx: watch::Receiver<ProgressSnapshot>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let snapshot = rx.borrow_and_update().clone();
            info!(parsed = snapshot.parsed, "{}", snapshot.status());
        }
    })
}
