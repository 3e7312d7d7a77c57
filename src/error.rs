use thiserror::Error;

use crate::row::RowId;

/// Convenience result type for job-graph construction.
pub type BuildResult<T> = Result<T, JobBuildError>;

/// Configuration error detected while building a job graph.
///
/// These are always fatal to starting a run: a job graph either validates
/// completely or is never executed.
#[derive(Debug, Error)]
pub enum JobBuildError {
    /// A component references an input column that no upstream node produces.
    #[error("component '{component}' references unknown column ({column})")]
    UnknownColumn { component: String, column: String },

    /// A requirement references a component that is not a filter.
    #[error("requirement of component '{component}' references '{referenced}', which is not a filter")]
    NotAFilter { component: String, referenced: String },

    /// A requirement references a category index outside the filter's declared set.
    #[error("requirement of component '{component}' references unknown category index {category} of filter '{filter}'")]
    UnknownCategory {
        component: String,
        filter: String,
        category: usize,
    },

    /// Lookup of a filter category by name failed.
    #[error("filter '{filter}' has no category named '{category}'")]
    NoSuchCategory { filter: String, category: String },

    /// A filter was registered without any categories.
    #[error("filter '{filter}' declares no categories")]
    NoCategories { filter: String },

    /// Requirements introduce a circular dependency between components.
    #[error("dependency cycle involving component '{component}'")]
    DependencyCycle { component: String },

    /// A component consumes columns of a gated transformer without gating on
    /// the same filter outcome (directly or through a covered filter chain).
    #[error("component '{component}' consumes columns from gated component '{producer}' but its requirement does not gate on the same filter outcome")]
    UngatedDependency { component: String, producer: String },

    /// The job declares no analyzers, so a run could never produce results.
    #[error("job declares no analyzers")]
    NoAnalyzers,

    /// Two analyzers resolved to the same identity, which would make
    /// partition results impossible to match unambiguously.
    #[error("analyzers '{first}' and '{second}' share the same identity")]
    DuplicateAnalyzerIdentity { first: String, second: String },
}

/// Error raised by a filter, transformer, or analyzer implementation.
#[derive(Debug, Error)]
pub enum ComponentError {
    /// A component-reported failure with a plain message.
    #[error("{0}")]
    Message(String),

    /// The component panicked; the payload was captured by the engine.
    #[error("component panicked: {0}")]
    Panic(String),

    /// An underlying error propagated by the component.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl ComponentError {
    /// Create a message-only component error.
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

/// An error captured by the execution coordinator during a run.
///
/// Individual component errors never unwind out of the row-processing loop;
/// they are recorded as `RunError`s on the completion outcome, each tagged
/// with the offending component and (when available) the offending row.
#[derive(Debug, Error)]
pub enum RunError {
    /// A component failed while processing one row. The branch carrying that
    /// row was abandoned; other rows keep flowing.
    #[error("error in component '{component}' while processing row {row}: {source}")]
    RowProcessing {
        component: String,
        row: RowId,
        #[source]
        source: ComponentError,
    },

    /// An analyzer's `result()` failed at job finalization, distinct from
    /// row-time errors so a job that consumed all rows but failed to
    /// summarize is reported precisely.
    #[error("error in component '{component}' while retrieving its result: {source}")]
    ResultRetrieval {
        component: String,
        #[source]
        source: ComponentError,
    },

    /// An internal coordinator failure (e.g. a lost background run thread).
    #[error("internal run error: {message}")]
    Internal { message: String },
}

impl RunError {
    /// Name of the offending component, if the error is attributable to one.
    pub fn component(&self) -> Option<&str> {
        match self {
            Self::RowProcessing { component, .. } | Self::ResultRetrieval { component, .. } => {
                Some(component)
            }
            Self::Internal { .. } => None,
        }
    }

    /// The offending row, when the error occurred during row processing.
    pub fn row(&self) -> Option<&RowId> {
        match self {
            Self::RowProcessing { row, .. } => Some(row),
            _ => None,
        }
    }
}
