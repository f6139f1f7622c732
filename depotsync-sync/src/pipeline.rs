//! Sync pipeline entrypoint: list every subtree, then drain the backlog.

use std::sync::Arc;

use chrono::Utc;

use depotsync_core::{find_connection_error, parse_listing};

use crate::backlog::Backlog;
use crate::error::SyncError;
use crate::invoker::SyncInvoker;
use crate::pool::{self, PoolOptions};
use crate::progress::ProgressSink;
use crate::report::SyncReport;

/// Build the backlog from a preview listing of each normalised subtree.
///
/// Fails before any worker starts if a listing cannot be obtained, carries a
/// transport failure phrase, or is malformed.
pub fn populate(
    invoker: &dyn SyncInvoker,
    sink: &dyn ProgressSink,
    subtrees: &[String],
) -> Result<Backlog, SyncError> {
    let mut backlog = Backlog::new();
    for subtree in subtrees {
        let preview = invoker
            .preview(subtree)
            .map_err(|source| SyncError::Invoke {
                subtree: subtree.clone(),
                source,
            })?;

        let phrase = find_connection_error(&preview.listing)
            .or_else(|| find_connection_error(&preview.diagnostics));
        if let Some(reason) = phrase {
            return Err(SyncError::Connection {
                subtree: subtree.clone(),
                reason: reason.to_string(),
            });
        }

        let targets = parse_listing(&preview.listing).map_err(|source| SyncError::Listing {
            subtree: subtree.clone(),
            source,
        })?;
        tracing::info!(%subtree, count = targets.len(), "listed subtree");
        sink.on_listing(subtree, targets.len());
        backlog.fill(targets);
    }
    Ok(backlog)
}

/// Run a full sync of `subtrees`.
///
/// This is the canonical entrypoint used by the CLI.
pub fn run(
    invoker: Arc<dyn SyncInvoker>,
    sink: Arc<dyn ProgressSink>,
    subtrees: &[String],
    options: &PoolOptions,
) -> Result<SyncReport, SyncError> {
    let backlog = populate(invoker.as_ref(), sink.as_ref(), subtrees)?;
    if backlog.is_empty() {
        tracing::info!("nothing to sync");
        return Ok(SyncReport::empty(Utc::now()));
    }
    pool::run(backlog, invoker, sink, options)
}
