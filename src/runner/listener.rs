use std::fmt;
use std::sync::Arc;

use crate::error::RunError;
use crate::job::{AnalyzerIdentity, JobGraph};
use crate::row::RowId;

use super::RunMetricsSnapshot;

/// Observer interface for run progress.
///
/// Callbacks are fire-and-forget: they are invoked from worker threads, the
/// coordinator never waits on their return values, and a panicking listener is
/// suppressed (and counted in the run metrics) rather than allowed to abort
/// the run. All methods default to no-ops.
pub trait RunListener: Send + Sync {
    /// Called once when the run starts.
    fn job_begin(&self, _job: &JobGraph) {}

    /// Called once per component, in processing order, when the run starts.
    fn component_begin(&self, _component: &str) {}

    /// Called once per component whose processing completed without any
    /// captured error attributed to it. Not called for cancelled runs.
    fn component_success(&self, _component: &str) {}

    /// Called after each source row finished its trip through the graph,
    /// errors included. Invoked concurrently from multiple workers.
    fn row_processed(&self, _row: &RowId) {}

    /// Called for every captured per-row component error.
    fn row_error(&self, _error: &RunError) {}

    /// Called when an analyzer's result was retrieved successfully.
    fn analyzer_success(&self, _analyzer: &AnalyzerIdentity) {}

    /// Called once when the run finished without errors.
    fn job_success(&self, _metrics: &RunMetricsSnapshot) {}

    /// Called once when the run finished with captured errors.
    fn job_failure(&self, _errors: &[RunError]) {}

    /// Called once when the run was cancelled before the source was drained.
    fn job_cancelled(&self) {}
}

/// A listener that fans out callbacks to a list of listeners.
#[derive(Default)]
pub struct CompositeRunListener {
    listeners: Vec<Arc<dyn RunListener>>,
}

impl CompositeRunListener {
    /// Create a composite from a list of listeners.
    pub fn new(listeners: Vec<Arc<dyn RunListener>>) -> Self {
        Self { listeners }
    }

    /// Append one listener.
    pub fn push(&mut self, listener: Arc<dyn RunListener>) {
        self.listeners.push(listener);
    }
}

impl fmt::Debug for CompositeRunListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeRunListener")
            .field("listeners_len", &self.listeners.len())
            .finish()
    }
}

impl RunListener for CompositeRunListener {
    fn job_begin(&self, job: &JobGraph) {
        for l in &self.listeners {
            l.job_begin(job);
        }
    }

    fn component_begin(&self, component: &str) {
        for l in &self.listeners {
            l.component_begin(component);
        }
    }

    fn component_success(&self, component: &str) {
        for l in &self.listeners {
            l.component_success(component);
        }
    }

    fn row_processed(&self, row: &RowId) {
        for l in &self.listeners {
            l.row_processed(row);
        }
    }

    fn row_error(&self, error: &RunError) {
        for l in &self.listeners {
            l.row_error(error);
        }
    }

    fn analyzer_success(&self, analyzer: &AnalyzerIdentity) {
        for l in &self.listeners {
            l.analyzer_success(analyzer);
        }
    }

    fn job_success(&self, metrics: &RunMetricsSnapshot) {
        for l in &self.listeners {
            l.job_success(metrics);
        }
    }

    fn job_failure(&self, errors: &[RunError]) {
        for l in &self.listeners {
            l.job_failure(errors);
        }
    }

    fn job_cancelled(&self) {
        for l in &self.listeners {
            l.job_cancelled();
        }
    }
}

/// Logs run events to stderr.
#[derive(Debug, Default)]
pub struct StdErrRunListener;

impl RunListener for StdErrRunListener {
    fn job_begin(&self, job: &JobGraph) {
        eprintln!("[run][begin] components={}", job.len());
    }

    fn component_begin(&self, component: &str) {
        eprintln!("[run][component] begin component={component}");
    }

    fn component_success(&self, component: &str) {
        eprintln!("[run][component] ok component={component}");
    }

    fn row_error(&self, error: &RunError) {
        eprintln!("[run][error] {error}");
    }

    fn analyzer_success(&self, analyzer: &AnalyzerIdentity) {
        eprintln!("[run][result] analyzer={analyzer}");
    }

    fn job_success(&self, metrics: &RunMetricsSnapshot) {
        eprintln!("[run][ok] {metrics}");
    }

    fn job_failure(&self, errors: &[RunError]) {
        eprintln!("[run][failed] errors={}", errors.len());
    }

    fn job_cancelled(&self) {
        eprintln!("[run][cancelled]");
    }
}
