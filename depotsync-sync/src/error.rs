//! Error types for depotsync-sync.

use std::path::PathBuf;

use thiserror::Error;

use depotsync_core::ListingError;

/// Failure to run the external client at all.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// The program could not be started (missing, not executable, …).
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// All errors that stop a sync run before or instead of producing a report.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The preview listing could not be obtained.
    #[error("listing '{subtree}' failed: {source}")]
    Invoke {
        subtree: String,
        #[source]
        source: InvokeError,
    },

    /// The preview listing was not in the expected shape.
    #[error("listing '{subtree}' could not be parsed: {source}")]
    Listing {
        subtree: String,
        #[source]
        source: ListingError,
    },

    /// The server connection or session failed while listing.
    #[error("connection error while listing '{subtree}': {reason}")]
    Connection { subtree: String, reason: String },

    /// A worker thread could not be started.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// A worker thread panicked; its counts may be incomplete.
    #[error("worker '{0}' panicked")]
    WorkerPanicked(String),
}
