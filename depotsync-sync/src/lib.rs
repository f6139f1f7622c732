//! # depotsync-sync
//!
//! Parallel dispatch-and-classify engine.
//!
//! [`pipeline::run`] lists every requested subtree into a [`Backlog`], then
//! hands it to the worker pool, which syncs one target per external
//! invocation and folds each classified [`Outcome`](depotsync_core::Outcome)
//! into a shared [`Aggregator`]. The returned [`SyncReport`] is a read-only
//! snapshot taken after every worker has joined.

pub mod aggregator;
pub mod backlog;
pub mod error;
#[cfg(test)]
mod fake;
pub mod invoker;
pub mod pipeline;
pub mod pool;
pub mod progress;
pub mod report;

pub use aggregator::{Aggregator, CounterSnapshot};
pub use backlog::Backlog;
pub use error::{InvokeError, SyncError};
pub use invoker::{P4Command, PreviewOutput, SyncInvoker};
pub use pool::PoolOptions;
pub use progress::ProgressSink;
pub use report::{Severity, SyncReport};
