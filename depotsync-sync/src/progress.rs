//! Per-event progress notifications.
//!
//! Called from worker threads as events happen, so implementations must be
//! `Send + Sync` and should return quickly.

use depotsync_core::{Outcome, SyncTarget};

pub trait ProgressSink: Send + Sync {
    /// A subtree listing finished with `count` targets queued.
    fn on_listing(&self, _subtree: &str, _count: usize) {}

    /// One invocation was classified.
    fn on_outcome(&self, _target: &SyncTarget, _outcome: &Outcome) {}

    /// A clobber conflict is being retried in forced mode.
    fn on_forced_retry(&self, _target: &SyncTarget) {}

    /// The run is being aborted because of `reason`.
    fn on_fatal(&self, _target: &SyncTarget, _reason: &str) {}
}

/// Discards every event.
impl ProgressSink for () {}
