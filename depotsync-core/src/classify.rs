//! Sync output classification.
//!
//! The external tool reports results as free text, so classification is
//! ordered substring matching. The first rule that matches wins:
//!
//! 1. transport / session failure phrase → [`Outcome::ConnectionFatal`]
//! 2. `can't clobber writable file`      → [`Outcome::ClobberConflict`]
//! 3. `must resolve #head`               → [`Outcome::NeedsResolve`]
//! 4. `error: `                          → [`Outcome::GenericError`]
//! 5. first line, after ` - `, starts with a success verb → [`Outcome::Success`]
//!
//! All markers are matched ASCII-case-insensitively. Anything else is an
//! unclassified success.

use crate::types::{Outcome, SuccessKind};

/// Phrases the sync command prints when the server connection or the
/// session is unusable. Any of them aborts the whole run.
pub const CONNECTION_ERRORS: &[&str] = &[
    "Connect to server failed; check $P4PORT.",
    "Your session has expired, please login again.",
    "Perforce password (P4PASSWD) invalid or unset.",
    "RpcTransport: partial message read",
    "TCP receive failed.",
    "read: socket: WSAECONNRESET",
];

pub const CLOBBER_MARKER: &str = "can't clobber writable file";
pub const RESOLVE_MARKER: &str = "must resolve #head";
pub const ERROR_MARKER: &str = "error: ";

/// Separates the depot path from the action on a sync result line.
pub const RESULT_DELIMITER: &str = " - ";

const SUCCESS_VERBS: &[(&str, SuccessKind)] = &[
    ("updating", SuccessKind::Updated),
    ("added as", SuccessKind::Added),
    ("deleted as", SuccessKind::Deleted),
];

/// Classify the complete captured output of one sync invocation.
pub fn classify(output: &str) -> Outcome {
    let lowered = output.to_ascii_lowercase();

    if let Some(phrase) = find_phrase(&lowered, CONNECTION_ERRORS) {
        return Outcome::ConnectionFatal {
            reason: phrase.to_string(),
        };
    }
    if lowered.contains(CLOBBER_MARKER) {
        return Outcome::ClobberConflict;
    }
    if lowered.contains(RESOLVE_MARKER) {
        return Outcome::NeedsResolve;
    }
    // ASCII lowercasing keeps byte offsets, so the index is valid in `output`.
    if let Some(at) = lowered.find(ERROR_MARKER) {
        let message = output[at..].lines().next().unwrap_or_default().trim_end();
        return Outcome::GenericError {
            message: message.to_string(),
        };
    }

    Outcome::Success(success_kind(output))
}

/// Return the first transport-failure phrase contained in `output`, if any.
///
/// Used on every external command's output, including the preview listing
/// and the forced retry, which are never classified in full.
pub fn find_connection_error(output: &str) -> Option<&'static str> {
    find_phrase(&output.to_ascii_lowercase(), CONNECTION_ERRORS)
}

fn find_phrase(lowered: &str, phrases: &[&'static str]) -> Option<&'static str> {
    phrases
        .iter()
        .copied()
        .find(|phrase| lowered.contains(&phrase.to_ascii_lowercase()))
}

fn success_kind(output: &str) -> Option<SuccessKind> {
    let first_line = output.lines().next().unwrap_or_default();
    let action = match first_line.split_once(RESULT_DELIMITER) {
        Some((_, action)) => action,
        None => first_line,
    };
    let action = action.trim_start();

    SUCCESS_VERBS
        .iter()
        .find(|(verb, _)| starts_with_nocase(action, verb))
        .map(|(_, kind)| *kind)
}

fn starts_with_nocase(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len()
        && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
