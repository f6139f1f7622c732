//! depotsync core library: domain types, output classification, config.
//!
//! - [`types`]: sync targets, modes and outcome kinds
//! - [`classify`]: maps raw sync output to an [`Outcome`]
//! - [`listing`]: preview-listing parser and subtree normalisation
//! - [`config`]: `~/.depotsync/config.yaml` loading
//! - [`error`]: [`ConfigError`], [`ListingError`]

pub mod classify;
pub mod config;
pub mod error;
pub mod listing;
pub mod types;

pub use classify::{classify, find_connection_error};
pub use config::{Config, P4Config};
pub use error::{ConfigError, ListingError};
pub use listing::{normalize_subtree, parse_listing, subtree_spec};
pub use types::{Outcome, SuccessKind, SyncMode, SyncTarget};
