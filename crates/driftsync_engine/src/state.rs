//! Observable sync state and pass reporting.

use chrono::{DateTime, Utc};

/// The observable status of the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncStatus {
    /// Nothing is happening.
    #[default]
    Idle,
    /// A sync pass is active.
    Syncing,
    /// The last pass classified every operation without failure.
    Success,
    /// The last pass had at least one failed operation.
    Error,
}

impl SyncStatus {
    /// Returns true if a pass is currently active.
    pub fn is_active(&self) -> bool {
        matches!(self, SyncStatus::Syncing)
    }
}

/// Snapshot of the engine's observable state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncState {
    /// Current status.
    pub status: SyncStatus,
    /// Percentage (0-100) of the current batch processed.
    pub progress: u8,
    /// Time of the last fully-successful pass, if any.
    pub last_sync_time: Option<DateTime<Utc>>,
    /// Consecutive failed pass count. Reset on success and on a fresh
    /// manually-triggered sync.
    pub retry_count: u32,
}

/// Why a requested pass did not run.
///
/// A skipped pass is expected behavior under the entry guard, not an
/// error: concurrent triggers are supposed to collapse into the in-flight
/// pass, and offline triggers are supposed to wait for reconnection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Connectivity is down.
    Offline,
    /// No caller identity has been established.
    NoCaller,
    /// The queue is empty.
    QueueEmpty,
    /// Another pass is already in flight.
    AlreadySyncing,
}

/// Counters for one completed sync pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Operations in the pass snapshot.
    pub attempted: usize,
    /// Operations applied remotely.
    pub succeeded: usize,
    /// Operations parked in the conflict ledger.
    pub conflicted: usize,
    /// Operations left queued for a later pass.
    pub failed: usize,
}

impl PassSummary {
    /// Returns true if no operation failed (conflicts do not count as
    /// failures; they are classified and surfaced, not retried).
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Result of requesting a sync pass.
#[derive(Debug, Clone, PartialEq)]
pub enum PassReport {
    /// The entry guard skipped the pass.
    Skipped(SkipReason),
    /// The pass ran to completion and classified every snapshot entry.
    Completed(PassSummary),
}

impl PassReport {
    /// Returns the summary if the pass ran.
    pub fn summary(&self) -> Option<&PassSummary> {
        match self {
            PassReport::Completed(summary) => Some(summary),
            PassReport::Skipped(_) => None,
        }
    }
}
