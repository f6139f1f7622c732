//! Shared pending-work collection.
//!
//! Filled once through `&mut self` before it is shared, then drained by all
//! workers through [`Backlog::try_take`]. Every target is handed out exactly
//! once.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use depotsync_core::SyncTarget;

#[derive(Debug, Default)]
pub struct Backlog {
    items: Mutex<VecDeque<SyncTarget>>,
    dispatched: AtomicUsize,
}

impl Backlog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append targets. Requires exclusive access, so it cannot race a `try_take`.
    pub fn fill(&mut self, targets: impl IntoIterator<Item = SyncTarget>) {
        self.items
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(targets);
    }

    /// Remove and return one target, or `None` when nothing is pending.
    pub fn try_take(&self) -> Option<SyncTarget> {
        let target = self.lock().pop_front()?;
        self.dispatched.fetch_add(1, Ordering::AcqRel);
        Some(target)
    }

    /// Momentary snapshot; only suitable for loop-termination polling.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Targets still pending.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Targets handed out by `try_take` so far.
    pub fn dispatched(&self) -> usize {
        self.dispatched.load(Ordering::Acquire)
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<SyncTarget>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FromIterator<SyncTarget> for Backlog {
    fn from_iter<T: IntoIterator<Item = SyncTarget>>(iter: T) -> Self {
        let mut backlog = Backlog::new();
        backlog.fill(iter);
        backlog
    }
}
