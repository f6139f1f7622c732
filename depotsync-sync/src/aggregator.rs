//! Thread-safe outcome counters and the run-wide fatal flag.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use depotsync_core::{SuccessKind, SyncTarget};

/// Running totals, one per counted outcome category.
#[derive(Debug, Default)]
struct Counters {
    errors: AtomicUsize,
    clobbered: AtomicUsize,
    updated: AtomicUsize,
    added: AtomicUsize,
    deleted: AtomicUsize,
}

/// Plain copy of the counters at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub errors: usize,
    pub clobbered: usize,
    pub updated: usize,
    pub added: usize,
    pub deleted: usize,
}

#[cfg(test)]
impl CounterSnapshot {
    pub fn successes(&self) -> usize {
        self.updated + self.added + self.deleted
    }
}

/// Shared state every worker writes into.
///
/// Counter increments are atomic read-modify-writes, so none are lost; the
/// orchestrator reads them only after joining every worker.
#[derive(Debug, Default)]
pub struct Aggregator {
    counters: Counters,
    needs_resolve: Mutex<Vec<SyncTarget>>,
    fatal: AtomicBool,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, kind: SuccessKind) {
        let counter = match kind {
            SuccessKind::Updated => &self.counters.updated,
            SuccessKind::Added => &self.counters.added,
            SuccessKind::Deleted => &self.counters.deleted,
        };
        counter.fetch_add(1, Ordering::AcqRel);
    }

    pub fn record_clobber(&self) {
        self.counters.clobbered.fetch_add(1, Ordering::AcqRel);
    }

    pub fn record_error(&self) {
        self.counters.errors.fetch_add(1, Ordering::AcqRel);
    }

    pub fn add_needs_resolve(&self, target: SyncTarget) {
        self.needs_resolve
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(target);
    }

    /// Set the fatal flag. Returns `true` only for the caller that flipped it.
    pub fn raise_fatal(&self) -> bool {
        !self.fatal.swap(true, Ordering::AcqRel)
    }

    pub fn is_fatal(&self) -> bool {
        self.fatal.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        let c = &self.counters;
        CounterSnapshot {
            errors: c.errors.load(Ordering::Acquire),
            clobbered: c.clobbered.load(Ordering::Acquire),
            updated: c.updated.load(Ordering::Acquire),
            added: c.added.load(Ordering::Acquire),
            deleted: c.deleted.load(Ordering::Acquire),
        }
    }

    /// Targets needing a manual resolve, sorted for stable reporting.
    pub fn needs_resolve(&self) -> Vec<SyncTarget> {
        let mut list = self
            .needs_resolve
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        list.sort();
        list
    }
}
