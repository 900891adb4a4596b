//! Snapshot outcome definitions
//!
//! This module defines how a single fetch-and-persist cycle can end.

use chrono::{DateTime, Utc};
use std::fmt;

/// Result of processing one repository slug
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotOutcome {
    // ===== Success =====
    /// A snapshot was written and the schedule anchor moved forward
    Recorded {
        stars: i64,
        pulls: i64,
        next_anchor: DateTime<Utc>,
    },

    // ===== Failures =====
    /// The detail endpoint answered with a non-success status; the
    /// repository is excluded from scheduling until reset
    Sticky { status_code: u16 },

    /// Network, decode or store failure; nothing changed and the repository
    /// stays eligible
    Transient { reason: String },
}

impl SnapshotOutcome {
    pub fn transient(reason: impl Into<String>) -> Self {
        Self::Transient {
            reason: reason.into(),
        }
    }

    pub fn is_recorded(&self) -> bool {
        matches!(self, Self::Recorded { .. })
    }

    pub fn is_sticky(&self) -> bool {
        matches!(self, Self::Sticky { .. })
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Short label used in log lines
    pub fn label(&self) -> &'static str {
        match self {
            Self::Recorded { .. } => "recorded",
            Self::Sticky { .. } => "sticky",
            Self::Transient { .. } => "transient",
        }
    }
}

impl fmt::Display for SnapshotOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recorded {
                stars,
                pulls,
                next_anchor,
            } => write!(
                f,
                "recorded (stars={}, pulls={}, next={})",
                stars,
                pulls,
                next_anchor.to_rfc3339()
            ),
            Self::Sticky { status_code } => write!(f, "sticky error (HTTP {})", status_code),
            Self::Transient { reason } => write!(f, "transient failure: {}", reason),
        }
    }
}
