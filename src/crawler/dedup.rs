//! Deduplicated snapshot queue
//!
//! This module keeps a slug from being queued twice while it is waiting in
//! the work queue or being processed by a worker:
//! - `Deduplicator`: the set of queued or in-flight slugs
//! - `SnapshotQueue`: the write end of the bounded work queue, gated by the set

use crate::state::ProcessCounters;
use crate::HubError;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

/// Concurrent set of slugs that are queued or in flight
#[derive(Debug, Default)]
pub struct Deduplicator {
    slugs: Mutex<HashSet<String>>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave the set half-updated
    fn slugs(&self) -> MutexGuard<'_, HashSet<String>> {
        self.slugs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts the slug if absent
    ///
    /// # Returns
    ///
    /// * `true` - The slug was not tracked and is now owned by the caller
    /// * `false` - The slug is already queued or in flight
    pub fn try_insert(&self, slug: &str) -> bool {
        let mut slugs = self.slugs();
        if slugs.contains(slug) {
            return false;
        }
        slugs.insert(slug.to_string())
    }

    /// Releases the slug; returns whether it was tracked
    pub fn remove(&self, slug: &str) -> bool {
        self.slugs().remove(slug)
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.slugs().contains(slug)
    }

    pub fn len(&self) -> usize {
        self.slugs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slugs().is_empty()
    }
}

/// Write end of the bounded snapshot work queue
#[derive(Debug, Clone)]
pub struct SnapshotQueue {
    sender: mpsc::Sender<String>,
    dedup: Arc<Deduplicator>,
    counters: Arc<ProcessCounters>,
}

impl SnapshotQueue {
    pub fn new(
        sender: mpsc::Sender<String>,
        dedup: Arc<Deduplicator>,
        counters: Arc<ProcessCounters>,
    ) -> Self {
        Self {
            sender,
            dedup,
            counters,
        }
    }

    /// Enqueues a slug unless it is already queued or in flight
    ///
    /// Waits for queue capacity when the queue is full. Dropping the returned
    /// future before it completes leaves neither a queued item nor a dedup
    /// marker behind.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The slug was enqueued
    /// * `Ok(false)` - The slug was already tracked; nothing changed
    /// * `Err(HubError::QueueClosed)` - All workers are gone
    pub async fn try_enqueue(&self, slug: &str) -> Result<bool, HubError> {
        if self.dedup.contains(slug) {
            return Ok(false);
        }

        let permit = self
            .sender
            .reserve()
            .await
            .map_err(|_| HubError::QueueClosed)?;

        if !self.dedup.try_insert(slug) {
            return Ok(false);
        }

        permit.send(slug.to_string());
        self.counters.record_enqueued();
        Ok(true)
    }

    pub fn dedup(&self) -> &Arc<Deduplicator> {
        &self.dedup
    }
}
