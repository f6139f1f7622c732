//! Error types for depotsync-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from loading or validating `config.yaml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure other than the file being absent.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse error on load: includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`: cannot locate `~/.depotsync/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// A value parsed fine but is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors from parsing a preview sync listing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListingError {
    /// A listing line carried no `#<rev>` suffix to split the depot path on.
    #[error("malformed listing line {line_number}: '{line}' has no revision marker")]
    MissingRevision { line_number: usize, line: String },
}
