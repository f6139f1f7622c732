//! User configuration.
//!
//! # Storage layout
//!
//! ```text
//! ~/.depotsync/
//!   config.yaml
//! ```
//!
//! ```yaml
//! threads: 8
//! root: "//depot/"
//! idle_wait_ms: 2
//! poll_interval_ms: 100
//! p4:
//!   program: p4
//!   port: ssl:perforce:1666
//!   user: builder
//!   client: builder-ws
//! ```
//!
//! Every field is optional. CLI flags override whatever is loaded here.
//!
//! # API pattern
//!
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_THREADS: usize = 8;
pub const DEFAULT_ROOT: &str = "//depot/";
pub const DEFAULT_IDLE_WAIT_MS: u64 = 2;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of worker threads.
    pub threads: usize,
    /// Depot prefix every subtree argument is appended to.
    pub root: String,
    /// How long an idle worker sleeps when the backlog is momentarily empty.
    pub idle_wait_ms: u64,
    /// How often the orchestrator checks for completion.
    pub poll_interval_ms: u64,
    pub p4: P4Config,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threads: DEFAULT_THREADS,
            root: DEFAULT_ROOT.to_string(),
            idle_wait_ms: DEFAULT_IDLE_WAIT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            p4: P4Config::default(),
        }
    }
}

/// How to invoke the version-control client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct P4Config {
    /// Executable name or path.
    pub program: PathBuf,
    /// Passed as `-p`; falls back to the client's own `P4PORT` resolution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    /// Passed as `-u`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Passed as `-c`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
}

impl Default for P4Config {
    fn default() -> Self {
        Self {
            program: PathBuf::from("p4"),
            port: None,
            user: None,
            client: None,
        }
    }
}

impl P4Config {
    /// Global options that precede every sub-command.
    pub fn global_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        for (flag, value) in [("-p", &self.port), ("-u", &self.user), ("-c", &self.client)] {
            if let Some(value) = value {
                args.push(flag.to_string());
                args.push(value.clone());
            }
        }
        args
    }
}

impl Config {
    /// Load `<home>/.depotsync/config.yaml`, or defaults when it does not exist.
    pub fn load_at(home: &Path) -> Result<Self, ConfigError> {
        let path = config_path_at(home);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::Io(e)),
        };
        // An empty file deserialises to `null`; treat it as "all defaults".
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config =
            serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse { path, source })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the current user's home directory.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_at(&home()?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threads == 0 {
            return Err(ConfigError::Invalid("threads must be at least 1".into()));
        }
        if self.p4.program.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("p4.program must not be empty".into()));
        }
        Ok(())
    }

    pub fn idle_wait(&self) -> Duration {
        Duration::from_millis(self.idle_wait_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// `<home>/.depotsync/config.yaml`: pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".depotsync").join("config.yaml")
}

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}
