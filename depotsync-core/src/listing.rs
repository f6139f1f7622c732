//! Preview-listing parser and subtree normalisation.
//!
//! A preview sync prints one line per file that would change:
//!
//! ```text
//! //depot/Game/a.txt#4 - updating /ws/Game/a.txt
//! //depot/Game/b.txt#1 - added as /ws/Game/b.txt
//! ```
//!
//! The target is everything before the first `#`.

use crate::error::ListingError;
use crate::types::SyncTarget;

/// Join `arg` onto `root` and strip trailing `/`, `.` and `*` characters,
/// so `//depot/` + `Game/...` becomes `//depot/Game`.
pub fn normalize_subtree(root: &str, arg: &str) -> String {
    let joined = format!("{root}{arg}");
    joined
        .trim_end_matches(|c| matches!(c, '/' | '.' | '*'))
        .to_string()
}

/// The path spec passed to the preview sync for a normalised subtree.
pub fn subtree_spec(subtree: &str) -> String {
    format!("{subtree}/...")
}

/// Parse the stdout of a preview sync into targets, preserving order.
pub fn parse_listing(text: &str) -> Result<Vec<SyncTarget>, ListingError> {
    let mut targets = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let Some((path, _)) = line.split_once('#') else {
            return Err(ListingError::MissingRevision {
                line_number: index + 1,
                line: line.to_string(),
            });
        };
        targets.push(SyncTarget::from(path));
    }
    Ok(targets)
}
