//! Bounded worker pool.
//!
//! Each worker loops: take a target, run the external sync, classify the
//! output, apply the outcome. Workers share nothing except the [`Backlog`]
//! and the [`Aggregator`]; the aggregator's fatal flag is the only signal
//! that crosses between them.
//!
//! The orchestrator polls for completion on a coarse timer, then joins every
//! worker unconditionally before reading any counter.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::Utc;

use depotsync_core::{classify, find_connection_error, Config, Outcome, SyncMode, SyncTarget};

use crate::aggregator::Aggregator;
use crate::backlog::Backlog;
use crate::error::SyncError;
use crate::invoker::SyncInvoker;
use crate::progress::ProgressSink;
use crate::report::SyncReport;

/// Worker-pool tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolOptions {
    pub threads: usize,
    /// Sleep when the backlog is momentarily empty.
    pub idle_wait: Duration,
    /// Orchestrator completion poll.
    pub poll_interval: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for PoolOptions {
    fn from(config: &Config) -> Self {
        Self {
            threads: config.threads,
            idle_wait: config.idle_wait(),
            poll_interval: config.poll_interval(),
        }
    }
}

struct RunState {
    backlog: Backlog,
    aggregator: Aggregator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

struct Worker {
    state: Arc<RunState>,
    invoker: Arc<dyn SyncInvoker>,
    sink: Arc<dyn ProgressSink>,
    idle_wait: Duration,
}

/// Raises the fatal flag if the worker thread unwinds, so the rest of the
/// pool stops and the orchestrator is released.
struct PanicGuard<'a>(&'a Aggregator);

impl Drop for PanicGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() && self.0.raise_fatal() {
            tracing::error!("worker panicked, stopping all workers");
        }
    }
}

impl Worker {
    fn run(self) {
        let state = &self.state;
        let _guard = PanicGuard(&state.aggregator);
        while !state.backlog.is_empty() && !state.aggregator.is_fatal() {
            let Some(target) = state.backlog.try_take() else {
                thread::sleep(self.idle_wait);
                continue;
            };
            tracing::debug!(%target, "syncing");

            let outcome = match self.invoker.sync(&target, SyncMode::Normal) {
                Ok(output) => classify(&output),
                Err(err) => Outcome::ConnectionFatal {
                    reason: err.to_string(),
                },
            };
            if self.apply(target, outcome) == Flow::Stop {
                break;
            }
        }
    }

    fn apply(&self, target: SyncTarget, outcome: Outcome) -> Flow {
        let aggregator = &self.state.aggregator;
        self.sink.on_outcome(&target, &outcome);

        match outcome {
            Outcome::Success(Some(kind)) => {
                aggregator.record_success(kind);
                tracing::debug!(%target, %kind, "synced");
            }
            Outcome::Success(None) => {
                tracing::debug!(%target, "synced with unrecognised result");
            }
            Outcome::ClobberConflict => {
                aggregator.record_clobber();
                tracing::warn!(%target, "writable file in the way, forcing sync");
                return self.force_sync(&target);
            }
            Outcome::NeedsResolve => {
                tracing::warn!(%target, "needs resolve");
                aggregator.add_needs_resolve(target);
            }
            Outcome::GenericError { message } => {
                aggregator.record_error();
                tracing::warn!(%target, error = %message, "sync failed");
            }
            Outcome::ConnectionFatal { reason } => {
                self.abort(&target, &reason);
                return Flow::Stop;
            }
        }
        Flow::Continue
    }

    /// Single best-effort forced retry. Its output is not classified; only a
    /// transport failure is acted on.
    fn force_sync(&self, target: &SyncTarget) -> Flow {
        if self.state.aggregator.is_fatal() {
            tracing::debug!(%target, "run aborted, skipping forced sync");
            return Flow::Stop;
        }
        self.sink.on_forced_retry(target);
        let reason = match self.invoker.sync(target, SyncMode::Forced) {
            Ok(output) => match find_connection_error(&output) {
                Some(phrase) => phrase.to_string(),
                None => return Flow::Continue,
            },
            Err(err) => err.to_string(),
        };
        self.abort(target, &reason);
        Flow::Stop
    }

    fn abort(&self, target: &SyncTarget, reason: &str) {
        let aggregator = &self.state.aggregator;
        aggregator.record_error();
        if aggregator.raise_fatal() {
            tracing::error!(%target, %reason, "connection failure, stopping all workers");
        }
        self.sink.on_fatal(target, reason);
    }
}

/// Drain `backlog` with `options.threads` workers and report the totals.
///
/// Returns once every worker has joined, either because the backlog is empty
/// or because a connection failure raised the fatal flag.
pub fn run(
    backlog: Backlog,
    invoker: Arc<dyn SyncInvoker>,
    sink: Arc<dyn ProgressSink>,
    options: &PoolOptions,
) -> Result<SyncReport, SyncError> {
    let started_at = Utc::now();
    let clock = Instant::now();
    let threads = options.threads.max(1);
    let state = Arc::new(RunState {
        backlog,
        aggregator: Aggregator::new(),
    });
    tracing::info!(threads, pending = state.backlog.len(), "starting workers");

    let mut handles = Vec::with_capacity(threads);
    for id in 0..threads {
        let worker = Worker {
            state: Arc::clone(&state),
            invoker: Arc::clone(&invoker),
            sink: Arc::clone(&sink),
            idle_wait: options.idle_wait,
        };
        let name = format!("depotsync-worker-{id}");
        match thread::Builder::new()
            .name(name.clone())
            .spawn(move || worker.run())
        {
            Ok(handle) => handles.push((name, handle)),
            Err(err) => {
                state.aggregator.raise_fatal();
                if let Err(join_err) = join_all(handles) {
                    tracing::error!(error = %join_err, "worker failed while shutting down");
                }
                return Err(SyncError::Spawn(err));
            }
        }
    }

    while !state.backlog.is_empty()
        && !state.aggregator.is_fatal()
        && !handles.iter().all(|(_, handle)| handle.is_finished())
    {
        thread::sleep(options.poll_interval);
    }
    join_all(handles)?;

    let report = SyncReport::collect(&state.aggregator, &state.backlog, started_at, clock.elapsed());
    tracing::info!(
        dispatched = report.dispatched,
        errors = report.errors,
        clobbered = report.clobbered,
        conflicts = report.conflicts,
        aborted = report.aborted,
        elapsed_ms = report.elapsed_ms,
        "workers finished",
    );
    Ok(report)
}

fn join_all(handles: Vec<(String, JoinHandle<()>)>) -> Result<(), SyncError> {
    let mut panicked = None;
    for (name, handle) in handles {
        if handle.join().is_err() {
            tracing::error!(worker = %name, "worker panicked");
            panicked.get_or_insert(name);
        }
    }
    match panicked {
        Some(name) => Err(SyncError::WorkerPanicked(name)),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::fake::{spawn_error, targets, FakeInvoker, RecordingSink};

    const UPDATING: &str = "info: //depot/x#2 - updating /ws/x\nexit: 0\n";
    const CLOBBER: &str = "error: Can't clobber writable file /ws/x\nexit: 1\n";
    const FATAL: &str = "TCP receive failed.\n";

    fn options(threads: usize) -> PoolOptions {
        PoolOptions {
            threads,
            idle_wait: Duration::from_millis(1),
            poll_interval: Duration::from_millis(1),
        }
    }

    fn run_with(
        items: Vec<SyncTarget>,
        invoker: &Arc<FakeInvoker>,
        sink: &Arc<RecordingSink>,
        threads: usize,
    ) -> SyncReport {
        let invoker: Arc<dyn SyncInvoker> = invoker.clone();
        let sink: Arc<dyn ProgressSink> = sink.clone();
        run(items.into_iter().collect(), invoker, sink, &options(threads)).expect("run")
    }

    fn index_of(target: &SyncTarget) -> usize {
        target
            .as_str()
            .trim_start_matches("//depot/f")
            .trim_end_matches(".txt")
            .parse()
            .expect("index")
    }

    #[test]
    fn empty_backlog_finishes_without_invoking() {
        for threads in [1, 4, 16] {
            let invoker = Arc::new(FakeInvoker::constant(UPDATING));
            let sink = Arc::new(RecordingSink::default());
            let report = run_with(Vec::new(), &invoker, &sink, threads);

            assert!(invoker.calls().is_empty());
            assert_eq!(report.accounted(), 0);
            assert_eq!(report.dispatched, 0);
            assert!(!report.aborted);
        }
    }

    #[test]
    fn every_target_is_dispatched_exactly_once() {
        const K: usize = 300;
        for threads in [1, 2, 8, 32] {
            let invoker = Arc::new(FakeInvoker::new(|target, mode| {
                if mode == SyncMode::Forced {
                    return Ok("//depot/x#2 - refreshing /ws/x\n".to_string());
                }
                let output = match index_of(target) % 6 {
                    0 => "//depot/x#2 - updating /ws/x",
                    1 => "//depot/x#1 - added as /ws/x",
                    2 => "//depot/x#3 - deleted as /ws/x",
                    3 => "error: //depot/x - file(s) not in client view.",
                    4 => "error: //depot/x - must resolve #head",
                    _ => CLOBBER,
                };
                Ok(output.to_string())
            }));
            let sink = Arc::new(RecordingSink::default());
            let report = run_with(targets(K), &invoker, &sink, threads);

            let normal = invoker.calls_in(SyncMode::Normal);
            let unique: HashSet<_> = normal.iter().cloned().collect();
            assert_eq!(normal.len(), K, "threads={threads}");
            assert_eq!(unique.len(), K, "threads={threads}: duplicate dispatch");
            assert_eq!(report.accounted(), K, "threads={threads}");
            assert_eq!(report.updated, K / 6);
            assert_eq!(report.errors, K / 6);
            assert_eq!(report.conflicts, K / 6);
            assert_eq!(report.clobbered, K / 6);
            assert_eq!(invoker.calls_in(SyncMode::Forced).len(), K / 6);
            assert_eq!(report.dispatched, K);
            assert_eq!(report.remaining, 0);
            assert!(!report.aborted);
        }
    }

    #[test]
    fn many_fast_invocations_lose_no_increment() {
        let invoker = Arc::new(FakeInvoker::constant(UPDATING));
        let sink = Arc::new(RecordingSink::default());
        let report = run_with(targets(5_000), &invoker, &sink, 16);

        assert_eq!(report.updated, 5_000);
        assert_eq!(report.accounted(), 5_000);
    }

    #[test]
    fn clobber_retries_once_and_counts_once() {
        // The forced retry reports a clobber too; it must not be re-counted.
        let invoker = Arc::new(FakeInvoker::constant(CLOBBER));
        let sink = Arc::new(RecordingSink::default());
        let report = run_with(targets(1), &invoker, &sink, 4);

        assert_eq!(report.clobbered, 1);
        assert_eq!(report.errors, 0);
        assert_eq!(
            invoker.calls(),
            vec![
                (SyncTarget::from("//depot/f0.txt"), SyncMode::Normal),
                (SyncTarget::from("//depot/f0.txt"), SyncMode::Forced),
            ]
        );
        assert_eq!(sink.retries.lock().expect("lock").len(), 1);
        assert!(!report.aborted);
    }

    #[test]
    fn needs_resolve_is_listed_but_not_an_error() {
        let invoker = Arc::new(FakeInvoker::constant("error: //depot/x - must resolve #head\n"));
        let sink = Arc::new(RecordingSink::default());
        let report = run_with(targets(3), &invoker, &sink, 2);

        assert_eq!(report.errors, 0);
        assert_eq!(report.conflicts, 3);
        assert_eq!(report.needs_resolve, targets(3));
    }

    #[test]
    fn fatal_on_single_worker_stops_immediately() {
        let invoker = Arc::new(FakeInvoker::constant(FATAL));
        let sink = Arc::new(RecordingSink::default());
        let report = run_with(targets(50), &invoker, &sink, 1);

        assert_eq!(invoker.calls().len(), 1);
        assert!(report.aborted);
        assert_eq!(report.errors, 1);
        assert_eq!(report.dispatched, 1);
        assert_eq!(report.remaining, 49);
    }

    #[test]
    fn fatal_stops_other_workers_after_their_next_check() {
        const THREADS: usize = 6;
        let sink = Arc::new(RecordingSink::default());
        let late_calls = Arc::new(AtomicUsize::new(0));

        let invoker = {
            let sink = Arc::clone(&sink);
            let late_calls = Arc::clone(&late_calls);
            Arc::new(FakeInvoker::new(move |target, _| {
                if sink.fatal_seen.load(Ordering::SeqCst) {
                    late_calls.fetch_add(1, Ordering::SeqCst);
                }
                if index_of(target) == 20 {
                    return Ok(FATAL.to_string());
                }
                thread::sleep(Duration::from_millis(1));
                Ok(UPDATING.to_string())
            }))
        };
        let report = run_with(targets(2_000), &invoker, &sink, THREADS);

        assert!(report.aborted);
        assert!(report.errors >= 1);
        assert!(
            late_calls.load(Ordering::SeqCst) < THREADS,
            "each surviving worker may finish at most one in-flight call"
        );
        assert!(report.remaining > 0);
        assert_eq!(report.dispatched + report.remaining, 2_000);
        assert_eq!(invoker.calls().len(), report.dispatched);
    }

    #[test]
    fn failing_to_run_the_client_is_fatal() {
        let invoker = Arc::new(FakeInvoker::new(|_, _| Err(spawn_error())));
        let sink = Arc::new(RecordingSink::default());
        let report = run_with(targets(10), &invoker, &sink, 1);

        assert!(report.aborted);
        assert_eq!(report.errors, 1);
        assert!(sink.fatal_seen.load(Ordering::SeqCst));
    }

    #[test]
    fn transport_failure_on_forced_retry_aborts_without_recounting_clobber() {
        let invoker = Arc::new(FakeInvoker::new(|_, mode| {
            Ok(match mode {
                SyncMode::Normal => CLOBBER,
                SyncMode::Forced => FATAL,
            }
            .to_string())
        }));
        let sink = Arc::new(RecordingSink::default());
        let report = run_with(targets(5), &invoker, &sink, 1);

        assert!(report.aborted);
        assert_eq!(report.clobbered, 1);
        assert_eq!(report.errors, 1);
        assert_eq!(invoker.calls().len(), 2);
    }

    #[test]
    fn panicking_workers_end_the_run_with_an_error() {
        let (tx, rx) = std::sync::mpsc::channel();
        thread::spawn(move || {
            let invoker: Arc<dyn SyncInvoker> =
                Arc::new(FakeInvoker::new(|_, _| panic!("client blew up")));
            let sink: Arc<dyn ProgressSink> = Arc::new(RecordingSink::default());
            let result = run(targets(5).into_iter().collect(), invoker, sink, &options(2));
            let _ = tx.send(result);
        });

        let result = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("run returns after every worker panicked");
        assert!(matches!(result, Err(SyncError::WorkerPanicked(_))), "got {result:?}");
    }

    #[test]
    fn one_panicking_worker_stops_the_others() {
        let invoker = Arc::new(FakeInvoker::new(|target, _| {
            if index_of(target) == 3 {
                panic!("client blew up");
            }
            thread::sleep(Duration::from_millis(1));
            Ok(UPDATING.to_string())
        }));
        let dyn_invoker: Arc<dyn SyncInvoker> = invoker.clone();
        let sink: Arc<dyn ProgressSink> = Arc::new(RecordingSink::default());
        let result = run(targets(2_000).into_iter().collect(), dyn_invoker, sink, &options(4));

        assert!(matches!(result, Err(SyncError::WorkerPanicked(_))));
        assert!(invoker.calls().len() < 2_000, "survivors kept draining the backlog");
    }

    #[test]
    fn forced_retry_is_skipped_once_the_run_is_aborted() {
        // Target 0 clobbers and waits until target 1 has tripped the fatal flag.
        let sink = Arc::new(RecordingSink::default());
        let invoker = {
            let sink = Arc::clone(&sink);
            Arc::new(FakeInvoker::new(move |target, mode| {
                if mode == SyncMode::Forced {
                    return Ok(UPDATING.to_string());
                }
                if index_of(target) == 1 {
                    return Ok(FATAL.to_string());
                }
                let deadline = Instant::now() + Duration::from_secs(5);
                while !sink.fatal_seen.load(Ordering::SeqCst) && Instant::now() < deadline {
                    thread::sleep(Duration::from_millis(1));
                }
                Ok(CLOBBER.to_string())
            }))
        };
        let report = run_with(targets(2), &invoker, &sink, 2);

        assert!(report.aborted);
        assert_eq!(report.clobbered, 1);
        assert!(invoker.calls_in(SyncMode::Forced).is_empty());
        assert!(sink.retries.lock().expect("lock").is_empty());
    }

    #[test]
    fn zero_threads_still_runs_one_worker() {
        let invoker = Arc::new(FakeInvoker::constant(UPDATING));
        let sink = Arc::new(RecordingSink::default());
        let report = run_with(targets(4), &invoker, &sink, 0);
        assert_eq!(report.updated, 4);
    }

    #[test]
    fn sink_sees_every_outcome() {
        let invoker = Arc::new(FakeInvoker::constant(UPDATING));
        let sink = Arc::new(RecordingSink::default());
        run_with(targets(25), &invoker, &sink, 3);

        let outcomes = sink.outcomes.lock().expect("lock");
        assert_eq!(outcomes.len(), 25);
        assert!(outcomes
            .iter()
            .all(|(_, o)| *o == Outcome::Success(Some(depotsync_core::SuccessKind::Updated))));
    }
}
