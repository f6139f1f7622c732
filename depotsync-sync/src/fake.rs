//! In-memory invoker and sink for unit tests.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use depotsync_core::{Outcome, SyncMode, SyncTarget};

use crate::error::InvokeError;
use crate::invoker::{PreviewOutput, SyncInvoker};
use crate::progress::ProgressSink;

type SyncFn = dyn Fn(&SyncTarget, SyncMode) -> Result<String, InvokeError> + Send + Sync;
type PreviewFn = dyn Fn(&str) -> Result<PreviewOutput, InvokeError> + Send + Sync;

/// Records every call and answers from closures.
pub(crate) struct FakeInvoker {
    respond: Box<SyncFn>,
    preview: Box<PreviewFn>,
    calls: Mutex<Vec<(SyncTarget, SyncMode)>>,
    previews: Mutex<Vec<String>>,
}

impl FakeInvoker {
    pub(crate) fn new(
        respond: impl Fn(&SyncTarget, SyncMode) -> Result<String, InvokeError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            respond: Box::new(respond),
            preview: Box::new(|_| Ok(PreviewOutput::default())),
            calls: Mutex::new(Vec::new()),
            previews: Mutex::new(Vec::new()),
        }
    }

    /// Always answers `output`, whatever the target or mode.
    pub(crate) fn constant(output: &'static str) -> Self {
        Self::new(move |_, _| Ok(output.to_string()))
    }

    pub(crate) fn with_preview(
        mut self,
        preview: impl Fn(&str) -> Result<PreviewOutput, InvokeError> + Send + Sync + 'static,
    ) -> Self {
        self.preview = Box::new(preview);
        self
    }

    pub(crate) fn calls(&self) -> Vec<(SyncTarget, SyncMode)> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn calls_in(&self, mode: SyncMode) -> Vec<SyncTarget> {
        self.calls()
            .into_iter()
            .filter(|(_, m)| *m == mode)
            .map(|(t, _)| t)
            .collect()
    }

    pub(crate) fn previewed(&self) -> Vec<String> {
        self.previews
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SyncInvoker for FakeInvoker {
    fn sync(&self, target: &SyncTarget, mode: SyncMode) -> Result<String, InvokeError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((target.clone(), mode));
        (self.respond)(target, mode)
    }

    fn preview(&self, subtree: &str) -> Result<PreviewOutput, InvokeError> {
        self.previews
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(subtree.to_string());
        (self.preview)(subtree)
    }
}

/// Remembers whether `on_fatal` fired and how many retries were announced.
#[derive(Default)]
pub(crate) struct RecordingSink {
    pub(crate) fatal_seen: AtomicBool,
    pub(crate) outcomes: Mutex<Vec<(SyncTarget, Outcome)>>,
    pub(crate) retries: Mutex<Vec<SyncTarget>>,
    pub(crate) listings: Mutex<Vec<(String, usize)>>,
}

impl ProgressSink for RecordingSink {
    fn on_listing(&self, subtree: &str, count: usize) {
        self.listings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((subtree.to_string(), count));
    }

    fn on_outcome(&self, target: &SyncTarget, outcome: &Outcome) {
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((target.clone(), outcome.clone()));
    }

    fn on_forced_retry(&self, target: &SyncTarget) {
        self.retries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(target.clone());
    }

    fn on_fatal(&self, _target: &SyncTarget, _reason: &str) {
        self.fatal_seen.store(true, Ordering::SeqCst);
    }
}

pub(crate) fn spawn_error() -> InvokeError {
    InvokeError::Spawn {
        program: "p4".into(),
        source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
    }
}

pub(crate) fn targets(n: usize) -> Vec<SyncTarget> {
    (0..n)
        .map(|i| SyncTarget::from(format!("//depot/f{i}.txt")))
        .collect()
}
