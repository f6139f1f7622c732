//! Domain types shared by the classifier, the worker pool and the CLI.
//!
//! A [`SyncTarget`] is opaque: it is handed verbatim to the external sync
//! command and never interpreted beyond that.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// One unit of sync work, usually a depot file path such as `//depot/a/b.txt`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncTarget(pub String);

impl SyncTarget {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SyncTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for SyncTarget {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SyncTarget {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// How the external sync command is asked to treat a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// Sync to `#head`, refusing to overwrite writable local files.
    #[default]
    Normal,
    /// Overwrite the local file regardless of its state.
    Forced,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::Normal => write!(f, "normal"),
            SyncMode::Forced => write!(f, "forced"),
        }
    }
}

/// Which kind of change a successful sync applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuccessKind {
    Updated,
    Added,
    Deleted,
}

impl SuccessKind {
    #[cfg(test)]
    pub(crate) fn all() -> &'static [SuccessKind] {
        &[SuccessKind::Updated, SuccessKind::Added, SuccessKind::Deleted]
    }

    /// Short past-tense label used in progress output.
    pub fn label(self) -> &'static str {
        match self {
            SuccessKind::Updated => "updated",
            SuccessKind::Added => "added",
            SuccessKind::Deleted => "deleted",
        }
    }
}

impl fmt::Display for SuccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classification of one completed sync invocation.
///
/// Exactly one variant is assigned per invocation; see [`crate::classify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The sync went through. `None` means the output did not match any known
    /// success verb; it is still a success but is not counted.
    Success(Option<SuccessKind>),
    /// A writable local file blocked the overwrite.
    ClobberConflict,
    /// The file has unresolved changes and needs a manual merge.
    NeedsResolve,
    /// Any other error line reported by the sync command.
    GenericError { message: String },
    /// Transport or session failure; aborts the whole run.
    ConnectionFatal { reason: String },
}

impl Outcome {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Outcome::ConnectionFatal { .. })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
