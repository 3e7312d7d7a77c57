//! Concurrent execution coordinator.
//!
//! [`JobRunner`] drives the per-row engine over a [`RowSource`] with a
//! bounded rayon worker pool: each worker pulls the next source row from a
//! shared cursor and pushes it through the graph end-to-end on its own
//! thread. Per-row component errors are captured and reported on the
//! [`RunOutcome`] without stopping other rows; cancellation is cooperative
//! through a [`CancellationToken`] checked between row pulls.

mod listener;
mod metrics;

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::components::AnalyzerResult;
use crate::engine::RowConsumer;
use crate::error::RunError;
use crate::job::{AnalyzerIdentity, CloseCondition, JobGraph};
use crate::row::{Row, RowId};
use crate::types::{RowSource, Value};

pub use listener::{CompositeRunListener, RunListener, StdErrRunListener};
pub use metrics::{RunMetrics, RunMetricsSnapshot};

/// Configuration for the [`JobRunner`].
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Number of worker threads used for row processing.
    ///
    /// If `None`, uses the platform's available parallelism.
    pub num_threads: Option<usize>,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            num_threads: Some(available_parallelism()),
        }
    }
}

fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Cooperative cancellation flag for a run.
///
/// Cancelling is advisory: workers observe the flag between row pulls, so
/// rows already in flight finish processing. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the run observing this token.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Lifecycle state of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The run has not started yet.
    Created,
    /// Workers are processing rows.
    Running,
    /// The source was drained without captured errors.
    Success,
    /// The run finished with captured errors.
    Failed,
    /// The run stopped on a cancellation request before draining the source.
    Cancelled,
}

impl RunStatus {
    fn code(self) -> u8 {
        match self {
            RunStatus::Created => 0,
            RunStatus::Running => 1,
            RunStatus::Success => 2,
            RunStatus::Failed => 3,
            RunStatus::Cancelled => 4,
        }
    }

    fn from_code(code: u8) -> Self {
        match code {
            1 => RunStatus::Running,
            2 => RunStatus::Success,
            3 => RunStatus::Failed,
            4 => RunStatus::Cancelled,
            _ => RunStatus::Created,
        }
    }
}

#[derive(Debug, Default)]
struct StatusCell(AtomicU8);

impl StatusCell {
    fn new() -> Self {
        Self(AtomicU8::new(RunStatus::Created.code()))
    }

    fn set(&self, status: RunStatus) {
        self.0.store(status.code(), Ordering::SeqCst);
    }

    fn get(&self) -> RunStatus {
        RunStatus::from_code(self.0.load(Ordering::SeqCst))
    }
}

/// Everything one run produced: terminal status, captured errors, finalized
/// analyzer results keyed by identity, and a metrics snapshot.
#[derive(Debug)]
pub struct RunOutcome {
    status: RunStatus,
    errors: Vec<RunError>,
    results: Vec<(AnalyzerIdentity, Box<dyn AnalyzerResult>)>,
    metrics: RunMetricsSnapshot,
}

impl RunOutcome {
    /// Terminal status of the run.
    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Whether the run drained its source without any captured error.
    pub fn is_successful(&self) -> bool {
        self.status == RunStatus::Success
    }

    /// Whether any error was captured. A cancelled run may be erroneous too.
    pub fn is_erroneous(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Whether the run stopped on a cancellation request.
    pub fn is_cancelled(&self) -> bool {
        self.status == RunStatus::Cancelled
    }

    /// All captured errors, in capture order.
    pub fn errors(&self) -> &[RunError] {
        &self.errors
    }

    /// Metrics recorded during the run.
    pub fn metrics(&self) -> &RunMetricsSnapshot {
        &self.metrics
    }

    /// Identities of the analyzers that produced a result.
    ///
    /// Empty for cancelled runs: results are not collected once a run is
    /// cancelled.
    pub fn analyzer_identities(&self) -> impl Iterator<Item = &AnalyzerIdentity> {
        self.results.iter().map(|(identity, _)| identity)
    }

    /// The finalized result of one analyzer, by identity.
    pub fn result(&self, identity: &AnalyzerIdentity) -> Option<&dyn AnalyzerResult> {
        self.results
            .iter()
            .find(|(candidate, _)| candidate == identity)
            .map(|(_, result)| result.as_ref())
    }

    /// The finalized result of one analyzer, downcast to its concrete type.
    pub fn typed_result<R: 'static>(&self, identity: &AnalyzerIdentity) -> Option<&R> {
        self.result(identity).and_then(|r| r.downcast_ref())
    }
}

struct Cursor<'a> {
    next: u64,
    rows: Box<dyn Iterator<Item = Vec<Value>> + Send + 'a>,
}

/// Executes a job over row sources.
///
/// The runner owns its thread pool, so one runner can execute several sources
/// (partitions) in sequence; results of those runs are merged with
/// [`crate::reduce::reduce_partitions`].
pub struct JobRunner {
    graph: Arc<JobGraph>,
    pool: ThreadPool,
    workers: usize,
    listener: CompositeRunListener,
}

impl JobRunner {
    /// Create a runner with default options.
    pub fn new(graph: JobGraph) -> Self {
        Self::with_options(graph, RunnerOptions::default())
    }

    /// Create a runner with the given options.
    ///
    /// # Panics
    ///
    /// Panics if `num_threads == Some(0)`.
    pub fn with_options(graph: JobGraph, options: RunnerOptions) -> Self {
        if let Some(n) = options.num_threads {
            assert!(n > 0, "num_threads must be > 0 when set");
        }
        let workers = options.num_threads.unwrap_or_else(available_parallelism).max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .expect("failed to build rayon thread pool");

        Self {
            graph: Arc::new(graph),
            pool,
            workers,
            listener: CompositeRunListener::default(),
        }
    }

    /// Attach a listener for run progress (metrics/logging).
    pub fn with_listener(mut self, listener: Arc<dyn RunListener>) -> Self {
        self.listener.push(listener);
        self
    }

    /// The job this runner executes.
    pub fn graph(&self) -> &JobGraph {
        &self.graph
    }

    /// Run the job over a source, blocking until completion.
    pub fn run(&self, source: &dyn RowSource) -> RunOutcome {
        self.run_with_token(source, &CancellationToken::new())
    }

    /// Run the job over a source, observing a cancellation token.
    pub fn run_with_token(&self, source: &dyn RowSource, token: &CancellationToken) -> RunOutcome {
        let status = StatusCell::new();
        self.execute(source, token, &status)
    }

    /// Run the job on a background thread, returning a handle immediately.
    pub fn spawn<S: RowSource + 'static>(self, source: S) -> JobHandle {
        let token = CancellationToken::new();
        let status = Arc::new(StatusCell::new());
        let thread = thread::spawn({
            let token = token.clone();
            let status = Arc::clone(&status);
            move || self.execute(&source, &token, &status)
        });
        JobHandle {
            token,
            status,
            thread,
        }
    }

    fn execute(
        &self,
        source: &dyn RowSource,
        token: &CancellationToken,
        status: &StatusCell,
    ) -> RunOutcome {
        status.set(RunStatus::Running);
        let metrics = RunMetrics::new();
        notify(&metrics, || self.listener.job_begin(&self.graph));
        for &id in self.graph.processing_order() {
            let name = self.graph.component_name(id);
            notify(&metrics, || self.listener.component_begin(name));
        }

        let consumer = RowConsumer::new(Arc::clone(&self.graph));
        let errors: Mutex<Vec<RunError>> = Mutex::new(Vec::new());
        // Cancellation is distinguished from source exhaustion: only a worker
        // that actually stopped on the token marks the run as interrupted.
        let interrupted = AtomicBool::new(false);
        // Sequence numbers are assigned under the same lock that pulls rows,
        // so row identity is deterministic for a given source regardless of
        // worker count.
        let cursor = Mutex::new(Cursor {
            next: 0,
            rows: source.open(),
        });

        self.pool.scope(|scope| {
            for _ in 0..self.workers {
                scope.spawn(|_| {
                    loop {
                        if token.is_cancelled() {
                            interrupted.store(true, Ordering::SeqCst);
                            break;
                        }
                        let pulled = {
                            let mut guard = cursor.lock().expect("source cursor mutex poisoned");
                            guard.rows.next().map(|values| {
                                let sequence = guard.next;
                                guard.next += 1;
                                (sequence, values)
                            })
                        };
                        let Some((sequence, values)) = pulled else {
                            break;
                        };

                        let row = Row::source(RowId::source(sequence), values);
                        let row_id = row.id().clone();
                        let result = consumer.consume(row);

                        metrics.on_row_processed();
                        metrics.on_fan_out(result.rows.len());
                        metrics.on_deliveries(result.deliveries.len() as u64);
                        if result.has_errors() {
                            metrics.on_row_failed();
                            for error in &result.errors {
                                notify(&metrics, || self.listener.row_error(error));
                            }
                            errors
                                .lock()
                                .expect("run error list mutex poisoned")
                                .extend(result.errors);
                        }
                        notify(&metrics, || self.listener.row_processed(&row_id));
                    }
                });
            }
        });

        let cancelled = interrupted.load(Ordering::SeqCst);
        let mut errors = errors.into_inner().expect("run error list mutex poisoned");

        let mut results: Vec<(AnalyzerIdentity, Box<dyn AnalyzerResult>)> = Vec::new();
        if !cancelled {
            for handle in self.graph.analyzers() {
                let Some(identity) = self.graph.analyzer_identity(handle).cloned() else {
                    continue;
                };
                match self.graph.analyzer_component(handle).result() {
                    Ok(result) => {
                        notify(&metrics, || self.listener.analyzer_success(&identity));
                        results.push((identity, result));
                    }
                    Err(source) => errors.push(RunError::ResultRetrieval {
                        component: self.graph.component_name(handle.into()).to_string(),
                        source,
                    }),
                }
            }
            for &id in self.graph.processing_order() {
                let name = self.graph.component_name(id);
                if errors.iter().all(|e| e.component() != Some(name)) {
                    notify(&metrics, || self.listener.component_success(name));
                }
            }
        }

        let terminal = if cancelled {
            RunStatus::Cancelled
        } else if errors.is_empty() {
            RunStatus::Success
        } else {
            RunStatus::Failed
        };
        self.fire_close_actions(terminal, &mut errors);
        status.set(terminal);

        match terminal {
            RunStatus::Success => {
                let snapshot = metrics.snapshot();
                notify(&metrics, || self.listener.job_success(&snapshot));
            }
            RunStatus::Cancelled => notify(&metrics, || self.listener.job_cancelled()),
            _ => notify(&metrics, || self.listener.job_failure(&errors)),
        }

        RunOutcome {
            status: terminal,
            errors,
            results,
            metrics: metrics.snapshot(),
        }
    }

    /// Fire registered close actions exactly once per run: the `Always` class
    /// plus exactly one of the `OnSuccess`/`OnFailure` classes. Cancelled
    /// runs are not successes, so they get the failure class.
    fn fire_close_actions(&self, terminal: RunStatus, errors: &mut Vec<RunError>) {
        let success = terminal == RunStatus::Success;
        for close in self.graph.close_actions() {
            let fire = match close.condition {
                CloseCondition::Always => true,
                CloseCondition::OnSuccess => success,
                CloseCondition::OnFailure => !success,
            };
            if !fire {
                continue;
            }
            if panic::catch_unwind(AssertUnwindSafe(|| (close.action)())).is_err() {
                errors.push(RunError::Internal {
                    message: format!(
                        "close action of component '{}' panicked",
                        self.graph.component_name(close.component)
                    ),
                });
            }
        }
    }
}

/// Suppress listener panics; a misbehaving listener never aborts the run.
fn notify(metrics: &RunMetrics, f: impl FnOnce()) {
    if panic::catch_unwind(AssertUnwindSafe(f)).is_err() {
        metrics.on_listener_panic();
    }
}

/// Handle to a run executing on a background thread.
#[derive(Debug)]
pub struct JobHandle {
    token: CancellationToken,
    status: Arc<StatusCell>,
    thread: thread::JoinHandle<RunOutcome>,
}

impl JobHandle {
    /// Request cooperative cancellation of the run.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// A clone of the run's cancellation token.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Live status of the run.
    pub fn status(&self) -> RunStatus {
        self.status.get()
    }

    /// Whether the background thread has finished.
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Block until the run completes and return its outcome.
    pub fn join(self) -> RunOutcome {
        match self.thread.join() {
            Ok(outcome) => outcome,
            Err(_) => RunOutcome {
                status: RunStatus::Failed,
                errors: vec![RunError::Internal {
                    message: "background run thread panicked".to_string(),
                }],
                results: Vec::new(),
                metrics: RunMetricsSnapshot::default(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CancellationToken, RunStatus, StatusCell};

    #[test]
    fn cancellation_token_is_shared_through_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());

        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn status_cell_round_trips_every_status() {
        let cell = StatusCell::new();
        assert_eq!(cell.get(), RunStatus::Created);
        for status in [
            RunStatus::Running,
            RunStatus::Success,
            RunStatus::Failed,
            RunStatus::Cancelled,
        ] {
            cell.set(status);
            assert_eq!(cell.get(), status);
        }
    }
}
