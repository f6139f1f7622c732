//! Colored per-target progress lines.

use colored::{Color, Colorize};

use depotsync_core::{Outcome, SuccessKind, SyncTarget};
use depotsync_sync::ProgressSink;

/// Prints one line per event to stdout. `quiet` suppresses everything, for
/// `--json` runs where stdout must stay machine-readable.
pub struct ConsoleProgress {
    quiet: bool,
}

impl ConsoleProgress {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl ProgressSink for ConsoleProgress {
    fn on_listing(&self, subtree: &str, count: usize) {
        if !self.quiet {
            println!("Syncing {subtree} ({count} files)");
        }
    }

    fn on_outcome(&self, target: &SyncTarget, outcome: &Outcome) {
        if self.quiet {
            return;
        }
        if let Some(line) = outcome_line(target, outcome) {
            println!("{line}");
        }
    }

    fn on_forced_retry(&self, target: &SyncTarget) {
        if !self.quiet {
            println!("{}", format!("{:<9} {target}", "forcing").yellow());
        }
    }

    fn on_fatal(&self, target: &SyncTarget, reason: &str) {
        eprintln!("{}", format!("fatal: {reason} (while syncing {target})").red().bold());
    }
}

fn outcome_line(target: &SyncTarget, outcome: &Outcome) -> Option<String> {
    let (label, color) = match outcome {
        Outcome::Success(Some(kind)) => (kind.label(), success_color(*kind)),
        Outcome::Success(None) | Outcome::ConnectionFatal { .. } => return None,
        Outcome::ClobberConflict => ("clobbered", Color::Yellow),
        Outcome::NeedsResolve => ("conflict", Color::Red),
        Outcome::GenericError { message } => return Some(message.red().to_string()),
    };
    Some(format!("{label:<9} {target}").color(color).to_string())
}

fn success_color(kind: SuccessKind) -> Color {
    match kind {
        SuccessKind::Updated => Color::Green,
        SuccessKind::Added => Color::Cyan,
        SuccessKind::Deleted => Color::Blue,
    }
}
