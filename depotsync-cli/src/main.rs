//! depotsync: parallel per-file depot sync.
//!
//! # Usage
//!
//! ```text
//! depotsync [--threads N] [--root PREFIX] [--json] [--verbose] [SUBTREE...]
//! ```
//!
//! Each subtree is appended to the depot root (`//depot/` unless configured
//! otherwise in `~/.depotsync/config.yaml`). With no subtree the whole root
//! is synced.

mod console;
mod summary;
mod sync;

use anyhow::Result;
use clap::Parser;

use sync::SyncArgs;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "depotsync",
    version,
    about = "Sync a depot tree file-by-file with a pool of parallel workers",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    sync: SyncArgs,

    /// Log engine events to stderr at debug level (overridden by RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    cli.sync.run()
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
