//! Batch progress reporting.
//!
//! Workers never touch shared counters. Each one sends an [`ExecStatus`]
//! over a bounded channel when its command finishes; a single consumer in
//! [`execute_batch`](super::execute_batch) owns the [`ProgressCounts`] and
//! hands a snapshot to the [`ProgressObserver`] after every message.
//! Statuses carry no command identity: completion order says nothing about
//! which command finished.

use tracing::{debug, info};

/// How a single command ended, as seen by the progress channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecStatus {
    Completed,
    Failed,
    Skipped,
}

/// Counters for one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressCounts {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl ProgressCounts {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    pub fn record(&mut self, status: ExecStatus) {
        match status {
            ExecStatus::Completed => self.completed += 1,
            ExecStatus::Failed => self.failed += 1,
            ExecStatus::Skipped => self.skipped += 1,
        }
    }

    pub fn finished(&self) -> usize {
        self.completed + self.failed + self.skipped
    }

    pub fn is_done(&self) -> bool {
        self.finished() >= self.total
    }

    /// Format as a short status-line string.
    pub fn to_log_string(&self) -> String {
        format!(
            "{}/{} done ({} ok, {} failed, {} skipped)",
            self.finished(),
            self.total,
            self.completed,
            self.failed,
            self.skipped
        )
    }
}

/// Receives progress snapshots from the single status consumer.
///
/// Called on the task running the batch; keep implementations quick.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, counts: &ProgressCounts);
}

/// Ignores progress.
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_progress(&self, _counts: &ProgressCounts) {}
}

/// Logs progress via `tracing`.
pub struct LoggingObserver;

impl ProgressObserver for LoggingObserver {
    fn on_progress(&self, counts: &ProgressCounts) {
        if counts.is_done() {
            info!("commands: {}", counts.to_log_string());
        } else {
            debug!("commands: {}", counts.to_log_string());
        }
    }
}

/// An observer backed by a closure.
///
/// ```
/// use kubesage::exec::{FnObserver, ProgressObserver, ProgressCounts};
///
/// let observer = FnObserver::new(|counts: &ProgressCounts| {
///     eprint!("\r{}", counts.to_log_string());
/// });
/// observer.on_progress(&ProgressCounts::new(3));
/// ```
pub struct FnObserver<F>(F)
where
    F: Fn(&ProgressCounts) + Send + Sync;

impl<F> FnObserver<F>
where
    F: Fn(&ProgressCounts) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> ProgressObserver for FnObserver<F>
where
    F: Fn(&ProgressCounts) + Send + Sync,
{
    fn on_progress(&self, counts: &ProgressCounts) {
        (self.0)(counts)
    }
}
