//! Per-row execution: pushing one source row through the job graph.
//!
//! [`RowConsumer`] walks the graph's cached processing order for a single
//! row: it evaluates each component's requirement against the branch-local
//! outcome set, invokes satisfied components, and splits the branch whenever
//! a transformer fans out. It is the embeddable core of the crate — the
//! concurrent coordinator in [`crate::runner`] is one caller, but a consumer
//! can also be driven directly to push individual rows through a job, with or
//! without analyzer side effects.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::{ComponentError, RunError};
use crate::job::graph::{AnalyzerHandle, JobGraph, NodeKind};
use crate::job::requirement::{FilterOutcome, OutcomeSet};
use crate::row::{Row, RowId, RowView};

/// Everything one row's trip through the graph produced.
#[derive(Debug, Default)]
pub struct ConsumeRowResult {
    /// The leaf rows of every surviving branch, paired with the outcomes
    /// collected along that branch. Used by preview callers to inspect how a
    /// row would flow; branches abandoned by errors or zero-output
    /// transformers do not appear.
    pub rows: Vec<(Row, OutcomeSet)>,
    /// One entry per analyzer delivery, in delivery order.
    pub deliveries: Vec<(AnalyzerHandle, RowId)>,
    /// Per-branch component errors. An error abandons its branch only.
    pub errors: Vec<RunError>,
}

impl ConsumeRowResult {
    /// Whether any branch of this row failed.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Pushes single rows through a job graph.
///
/// The consumer holds no per-row state, so one instance is shared by all
/// workers of a run. Component panics are caught and converted into
/// [`ComponentError::Panic`]; neither errors nor panics unwind out of
/// [`RowConsumer::consume`].
pub struct RowConsumer {
    graph: Arc<JobGraph>,
    include_analyzers: bool,
    seeds: Vec<FilterOutcome>,
}

impl RowConsumer {
    /// Create a consumer over a shared job graph.
    pub fn new(graph: Arc<JobGraph>) -> Self {
        Self {
            graph,
            include_analyzers: true,
            seeds: Vec::new(),
        }
    }

    /// Preview mode: filters and transformers run, analyzer nodes are skipped
    /// entirely, so consuming a row has no observable side effects on
    /// analyzer state.
    pub fn without_analyzers(mut self) -> Self {
        self.include_analyzers = false;
        self
    }

    /// Treat the given outcomes as already produced for every consumed row.
    ///
    /// This lets a caller push rows down one branch of the job as if an
    /// upstream filter had already fired, e.g. when replaying rows that were
    /// categorized elsewhere.
    pub fn with_satisfied_outcomes(
        mut self,
        outcomes: impl IntoIterator<Item = FilterOutcome>,
    ) -> Self {
        self.seeds.extend(outcomes);
        self
    }

    /// The graph this consumer executes.
    pub fn graph(&self) -> &JobGraph {
        &self.graph
    }

    /// Push one row through the graph.
    pub fn consume(&self, row: Row) -> ConsumeRowResult {
        self.consume_with_count(row, 1)
    }

    /// Push one row that occurred `repetition` times.
    ///
    /// Pre-aggregated sources deliver a representative row plus a count;
    /// the count is forwarded to every analyzer delivery on every branch.
    pub fn consume_with_count(&self, row: Row, repetition: usize) -> ConsumeRowResult {
        let mut result = ConsumeRowResult::default();
        let outcomes = OutcomeSet::seeded(&self.seeds);
        self.process_branch(row, outcomes, 0, repetition, &mut result);
        result
    }

    /// Run one branch from position `start` in the processing order to its
    /// leaf, recursing once per fan-out child.
    fn process_branch(
        &self,
        row: Row,
        mut outcomes: OutcomeSet,
        start: usize,
        repetition: usize,
        result: &mut ConsumeRowResult,
    ) {
        let order = self.graph.processing_order();
        for position in start..order.len() {
            let id = order[position];
            let node = self.graph.node(id);
            if !node.requirement.is_satisfied(&outcomes) {
                continue;
            }
            let view = RowView::new(&row, &node.inputs);

            match &node.kind {
                NodeKind::Filter { filter, categories } => {
                    match capture(|| filter.categorize(&view)) {
                        Ok(category) if category < categories.len() => {
                            outcomes.push(FilterOutcome::new(id, category));
                        }
                        Ok(category) => {
                            self.record_error(
                                result,
                                &node.name,
                                row.id(),
                                ComponentError::message(format!(
                                    "category index {category} is outside the {} declared categories",
                                    categories.len()
                                )),
                            );
                            return;
                        }
                        Err(source) => {
                            self.record_error(result, &node.name, row.id(), source);
                            return;
                        }
                    }
                }
                NodeKind::Transformer {
                    transformer,
                    outputs,
                } => {
                    let children = match capture(|| transformer.transform(&view)) {
                        Ok(children) => children,
                        Err(source) => {
                            self.record_error(result, &node.name, row.id(), source);
                            return;
                        }
                    };
                    if let Some(bad) = children.iter().find(|c| c.len() != outputs.len()) {
                        self.record_error(
                            result,
                            &node.name,
                            row.id(),
                            ComponentError::message(format!(
                                "output row has {} values, declared {} output columns",
                                bad.len(),
                                outputs.len()
                            )),
                        );
                        return;
                    }
                    // Zero outputs terminates the branch; each output row
                    // continues independently with its own outcome set.
                    for (index, values) in children.into_iter().enumerate() {
                        let child = row.derive(id, values, index);
                        self.process_branch(
                            child,
                            outcomes.clone(),
                            position + 1,
                            repetition,
                            result,
                        );
                    }
                    return;
                }
                NodeKind::Analyzer { analyzer } => {
                    if !self.include_analyzers {
                        continue;
                    }
                    match capture(|| analyzer.consume(&view, repetition)) {
                        Ok(()) => result.deliveries.push((AnalyzerHandle(id), row.id().clone())),
                        Err(source) => {
                            self.record_error(result, &node.name, row.id(), source);
                            return;
                        }
                    }
                }
            }
        }
        result.rows.push((row, outcomes));
    }

    fn record_error(
        &self,
        result: &mut ConsumeRowResult,
        component: &str,
        row: &RowId,
        source: ComponentError,
    ) {
        result.errors.push(RunError::RowProcessing {
            component: component.to_string(),
            row: row.clone(),
            source,
        });
    }
}

/// Invoke a component, converting a panic into a [`ComponentError::Panic`]
/// carrying the stringified payload.
fn capture<T>(f: impl FnOnce() -> Result<T, ComponentError>) -> Result<T, ComponentError> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(outcome) => outcome,
        Err(payload) => Err(ComponentError::Panic(panic_message(&payload))),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
