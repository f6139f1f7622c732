//! The sync run: merge flags over config, list, dispatch, summarise.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;

use depotsync_core::{normalize_subtree, Config};
use depotsync_sync::{pipeline, P4Command, PoolOptions};

use crate::console::ConsoleProgress;
use crate::summary;

/// Arguments for a sync run.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Subtrees below the depot root to sync (default: the whole root).
    pub subtrees: Vec<String>,

    /// Number of parallel workers [config: threads, default 8].
    #[arg(long, short)]
    pub threads: Option<usize>,

    /// Depot prefix each subtree is appended to [config: root].
    #[arg(long)]
    pub root: Option<String>,

    /// Emit the final summary as JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let config = self.merge(Config::load().context("failed to load ~/.depotsync/config.yaml")?)?;
        let subtrees = self.subtree_paths(&config.root);

        if !self.json {
            println!("Starting sync with {} threads", config.threads);
        }

        let console = Arc::new(ConsoleProgress::new(self.json));
        let invoker = Arc::new(P4Command::new(config.p4.clone()));
        let report = pipeline::run(invoker, console, &subtrees, &PoolOptions::from(&config))
            .context("sync failed")?;

        if self.json {
            summary::print_json(&report)?;
        } else {
            summary::print_text(&report);
        }

        if report.aborted {
            bail!(
                "sync aborted by a connection failure ({} targets not synced)",
                report.remaining
            );
        }
        Ok(())
    }

    fn merge(&self, mut config: Config) -> Result<Config> {
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if let Some(root) = &self.root {
            config.root = root.clone();
        }
        config.validate().context("invalid options")?;
        Ok(config)
    }

    fn subtree_paths(&self, root: &str) -> Vec<String> {
        if self.subtrees.is_empty() {
            return vec![normalize_subtree(root, "")];
        }
        self.subtrees
            .iter()
            .map(|arg| normalize_subtree(root, arg))
            .collect()
    }
}
