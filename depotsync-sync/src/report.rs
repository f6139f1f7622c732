//! Final, read-only run summary.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use depotsync_core::SyncTarget;

use crate::aggregator::{Aggregator, CounterSnapshot};
use crate::backlog::Backlog;

/// Overall health of a finished run, used to pick the summary color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Clean,
    Warning,
    Error,
}

/// Snapshot of a run, taken after every worker joined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub errors: usize,
    /// Targets that need a manual resolve.
    pub conflicts: usize,
    pub clobbered: usize,
    pub updated: usize,
    pub added: usize,
    pub deleted: usize,
    /// Targets handed to a worker.
    pub dispatched: usize,
    /// Targets left undispatched by a fatal abort.
    pub remaining: usize,
    /// The run was cut short by a connection error.
    pub aborted: bool,
    pub needs_resolve: Vec<SyncTarget>,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u128,
}

impl SyncReport {
    pub(crate) fn collect(
        aggregator: &Aggregator,
        backlog: &Backlog,
        started_at: DateTime<Utc>,
        elapsed: Duration,
    ) -> Self {
        let CounterSnapshot {
            errors,
            clobbered,
            updated,
            added,
            deleted,
        } = aggregator.snapshot();
        let needs_resolve = aggregator.needs_resolve();
        Self {
            errors,
            conflicts: needs_resolve.len(),
            clobbered,
            updated,
            added,
            deleted,
            dispatched: backlog.dispatched(),
            remaining: backlog.len(),
            aborted: aggregator.is_fatal(),
            needs_resolve,
            started_at,
            elapsed_ms: elapsed.as_millis(),
        }
    }

    /// A report for a run that had nothing to do.
    pub fn empty(started_at: DateTime<Utc>) -> Self {
        Self::collect(&Aggregator::new(), &Backlog::new(), started_at, Duration::ZERO)
    }

    pub fn severity(&self) -> Severity {
        if self.errors > 0 || self.aborted {
            Severity::Error
        } else if self.clobbered > 0 || !self.needs_resolve.is_empty() {
            Severity::Warning
        } else {
            Severity::Clean
        }
    }

    /// Every dispatched invocation that landed in a counted category.
    pub fn accounted(&self) -> usize {
        self.errors + self.conflicts + self.clobbered + self.updated + self.added + self.deleted
    }
}
