//! Lock-free process counters

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// In-process counters reported alongside store counts
///
/// All fields are lock-free and reset only when the process restarts.
#[derive(Debug, Default)]
pub struct ProcessCounters {
    /// Snapshot work items finished since start, regardless of outcome
    snapshots_completed: AtomicU64,

    /// Discovery batches persisted since start
    discoveries_completed: AtomicU64,

    /// Slugs waiting in the work queue, excluding those being processed
    queue_depth: AtomicUsize,
}

impl ProcessCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_snapshot_completed(&self) {
        self.snapshots_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_discovery_completed(&self) {
        self.discoveries_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshots_completed(&self) -> u64 {
        self.snapshots_completed.load(Ordering::Relaxed)
    }

    pub fn discoveries_completed(&self) -> u64 {
        self.discoveries_completed.load(Ordering::Relaxed)
    }

    /// Counts a slug pushed onto the work queue
    pub fn record_enqueued(&self) {
        self.queue_depth.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a slug popped by a worker; never drops below zero
    pub fn record_dequeued(&self) {
        let _ = self
            .queue_depth
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |depth| {
                Some(depth.saturating_sub(1))
            });
    }

    pub fn queue_depth(&self) -> usize {
        self.queue_depth.load(Ordering::Relaxed)
    }
}
