//! State module for in-process engine bookkeeping
//!
//! This module provides the state the engine keeps outside of the store.
//!
//! # Components
//!
//! - `ProcessCounters`: Lock-free counters for completed snapshots, completed discovery batches and queue depth
//! - `SnapshotOutcome`: How a single fetch-and-persist cycle ended (recorded, sticky, transient)

mod counters;
mod outcome;

// Re-export main types
pub use counters::ProcessCounters;
pub use outcome::SnapshotOutcome;
