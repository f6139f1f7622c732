//! The external sync command seam.
//!
//! [`SyncInvoker`] is what the pool calls; [`P4Command`] runs the real client.
//! Tests substitute in-memory invokers.

use std::process::{Command, Output, Stdio};

use depotsync_core::{listing::subtree_spec, P4Config, SyncMode, SyncTarget};

use crate::error::InvokeError;

/// Captured output of a preview (`sync -n`) listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviewOutput {
    /// One line per file that would change.
    pub listing: String,
    /// Everything else the client printed (warnings, up-to-date notices).
    pub diagnostics: String,
}

/// Runs the external sync command. Calls block for the full duration of the
/// external process.
pub trait SyncInvoker: Send + Sync {
    /// Sync a single target and return its complete textual output.
    fn sync(&self, target: &SyncTarget, mode: SyncMode) -> Result<String, InvokeError>;

    /// List what a sync of `subtree` would touch, without touching it.
    fn preview(&self, subtree: &str) -> Result<PreviewOutput, InvokeError>;
}

/// [`SyncInvoker`] backed by the `p4` command-line client.
#[derive(Debug, Clone)]
pub struct P4Command {
    config: P4Config,
}

impl P4Command {
    pub fn new(config: P4Config) -> Self {
        Self { config }
    }

    /// Sub-command arguments for syncing `target` in `mode`.
    pub fn sync_args(target: &SyncTarget, mode: SyncMode) -> Vec<String> {
        match mode {
            SyncMode::Normal => vec![
                "-s".to_string(),
                "sync".to_string(),
                format!("{target}#head"),
            ],
            SyncMode::Forced => vec!["sync".to_string(), "-f".to_string(), target.to_string()],
        }
    }

    /// Sub-command arguments for previewing `subtree`.
    pub fn preview_args(subtree: &str) -> Vec<String> {
        vec!["sync".to_string(), "-n".to_string(), subtree_spec(subtree)]
    }

    fn run(&self, args: &[String]) -> Result<Output, InvokeError> {
        tracing::trace!(program = %self.config.program.display(), ?args, "running client");
        Command::new(&self.config.program)
            .args(self.config.global_args())
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| InvokeError::Spawn {
                program: self.config.program.clone(),
                source,
            })
    }
}

impl SyncInvoker for P4Command {
    fn sync(&self, target: &SyncTarget, mode: SyncMode) -> Result<String, InvokeError> {
        let output = self.run(&Self::sync_args(target, mode))?;
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(text)
    }

    fn preview(&self, subtree: &str) -> Result<PreviewOutput, InvokeError> {
        let output = self.run(&Self::preview_args(subtree))?;
        Ok(PreviewOutput {
            listing: String::from_utf8_lossy(&output.stdout).into_owned(),
            diagnostics: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_sync_targets_head_with_tagged_output() {
        let args = P4Command::sync_args(&SyncTarget::from("//depot/a b.txt"), SyncMode::Normal);
        assert_eq!(args, ["-s", "sync", "//depot/a b.txt#head"]);
    }

    #[test]
    fn forced_sync_uses_force_flag() {
        let args = P4Command::sync_args(&SyncTarget::from("//depot/a.txt"), SyncMode::Forced);
        assert_eq!(args, ["sync", "-f", "//depot/a.txt"]);
    }

    #[test]
    fn preview_lists_the_whole_subtree() {
        assert_eq!(
            P4Command::preview_args("//depot/Game"),
            ["sync", "-n", "//depot/Game/..."]
        );
    }
}
