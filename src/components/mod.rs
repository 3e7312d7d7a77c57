//! Component contracts: the small, fixed boundary through which filters,
//! transformers, and analyzers plug into the engine.
//!
//! Implementations declare their input columns when they are registered on a
//! [`crate::job::JobGraphBuilder`]; at run time each invocation receives a
//! [`RowView`] restricted to exactly those inputs.
//!
//! A handful of built-in components live in the submodules; anything else
//! (standardizers, writers, lookups) is expected to be supplied by the
//! embedding application through these same traits.

pub mod analyzers;
pub mod filters;
pub mod transformers;

use std::any::Any;
use std::fmt;

use crate::error::ComponentError;
use crate::row::RowView;
use crate::types::{DataType, Value};

pub use analyzers::{PatternAnalyzer, PatternCount, PatternFinderResult, RowCountAnalyzer, RowCountResult};
pub use filters::{EqualsFilter, NullCheckFilter};
pub use transformers::{RepeatTransformer, TokenizeTransformer};

/// A component that classifies a row into exactly one of a fixed set of
/// categories, used purely to gate downstream components.
///
/// `categorize` must be a pure function of the row's declared inputs (no
/// hidden global state), so that re-evaluation for a fanned-out row is valid.
pub trait Filter: Send + Sync {
    /// The fixed set of categories this filter may emit.
    ///
    /// Snapshotted into the job graph at registration; `categorize` returns
    /// an index into this list.
    fn categories(&self) -> Vec<String>;

    /// Classify the row, returning the index of exactly one category.
    fn categorize(&self, row: &RowView<'_>) -> Result<usize, ComponentError>;
}

/// A component that produces zero or more output rows from one input row.
///
/// Returning more than one row is the fan-out point of the engine: each
/// output row continues independently through the rest of the graph.
/// Returning zero rows terminates the branch. Transformers are expected to be
/// stateless, or to manage their own thread safety if they hold state.
pub trait Transformer: Send + Sync {
    /// The output columns this transformer produces, fixed in number and type.
    ///
    /// Snapshotted into the job graph at registration.
    fn output_columns(&self) -> Vec<(String, DataType)>;

    /// Transform the row into 0..N output value vectors, each as wide as
    /// [`Transformer::output_columns`].
    fn transform(&self, row: &RowView<'_>) -> Result<Vec<Vec<Value>>, ComponentError>;
}

/// A component that accumulates rows into a result.
///
/// `consume` is invoked from multiple workers concurrently; implementations
/// must synchronize their accumulated state internally (the built-ins use a
/// `Mutex`). The engine deliberately does not serialize analyzer delivery.
/// `result` is called exactly once, after all rows are consumed.
pub trait Analyzer: Send + Sync {
    /// Deliver one row, which occurred `repetition` times.
    ///
    /// Pre-aggregated sources deliver a representative row plus a count
    /// instead of calling once per occurrence.
    fn consume(&self, row: &RowView<'_>, repetition: usize) -> Result<(), ComponentError>;

    /// Produce the finalized result.
    fn result(&self) -> Result<Box<dyn AnalyzerResult>, ComponentError>;
}

/// A finalized analyzer result.
///
/// The engine is agnostic to the statistic inside; callers downcast through
/// [`AnalyzerResult::as_any`] to recover the concrete type. Implemented for
/// every `Debug + Send + Sync + 'static` type via a blanket impl.
pub trait AnalyzerResult: fmt::Debug + Send + Sync + 'static {
    /// The result as [`Any`], for downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;
}

impl<T: fmt::Debug + Send + Sync + 'static> AnalyzerResult for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl dyn AnalyzerResult {
    /// Downcast the result to a concrete type.
    pub fn downcast_ref<R: 'static>(&self) -> Option<&R> {
        self.as_any().downcast_ref::<R>()
    }
}
