//! Snapshot worker pool
//!
//! A fixed number of tasks share the read end of the work queue. Each task
//! pops a slug, runs one fetch-and-persist cycle, then releases the slug's
//! dedup marker and counts the completion whatever the outcome. Tasks exit
//! once the queue is closed and drained.

use crate::crawler::dedup::Deduplicator;
use crate::crawler::snapshot::SnapshotProcessor;
use crate::state::ProcessCounters;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// Read end of the work queue shared by all workers
pub type SharedReceiver = Arc<Mutex<mpsc::Receiver<String>>>;

/// Releases a dequeued slug when processing ends, including on panic
struct InFlight<'a> {
    slug: &'a str,
    dedup: &'a Deduplicator,
    counters: &'a ProcessCounters,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.dedup.remove(self.slug);
        self.counters.record_snapshot_completed();
    }
}

/// Spawns the snapshot workers
///
/// # Arguments
///
/// * `count` - Number of workers; at least one is always spawned
/// * `receiver` - Shared read end of the work queue
/// * `processor` - Fetch-and-persist logic, cloned into each worker
/// * `dedup` - Set of queued or in-flight slugs
/// * `counters` - Process counters updated after each item
///
/// # Returns
///
/// One join handle per worker
pub fn spawn_workers(
    count: usize,
    receiver: SharedReceiver,
    processor: SnapshotProcessor,
    dedup: Arc<Deduplicator>,
    counters: Arc<ProcessCounters>,
) -> Vec<JoinHandle<()>> {
    (0..count.max(1))
        .map(|id| {
            let receiver = Arc::clone(&receiver);
            let processor = processor.clone();
            let dedup = Arc::clone(&dedup);
            let counters = Arc::clone(&counters);

            tokio::spawn(async move {
                run_worker(id, receiver, processor, dedup, counters).await;
            })
        })
        .collect()
}

async fn run_worker(
    id: usize,
    receiver: SharedReceiver,
    processor: SnapshotProcessor,
    dedup: Arc<Deduplicator>,
    counters: Arc<ProcessCounters>,
) {
    tracing::debug!("Snapshot worker {} started", id);

    loop {
        let next = receiver.lock().await.recv().await;
        let Some(slug) = next else {
            break;
        };
        counters.record_dequeued();

        let _in_flight = InFlight {
            slug: &slug,
            dedup: &dedup,
            counters: &counters,
        };

        let outcome = processor.process(&slug).await;
        tracing::debug!(
            slug = %slug,
            worker = id,
            outcome = outcome.label(),
            "Snapshot {}",
            outcome
        );
    }

    tracing::debug!("Snapshot worker {} stopped", id);
}
