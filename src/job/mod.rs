//! Job definition: requirements, component wiring, and the validated graph.

pub mod graph;
pub mod requirement;

pub use graph::{
    AnalyzerHandle, AnalyzerIdentity, CloseCondition, FilterHandle, JobGraph, JobGraphBuilder,
    TransformerHandle,
};
pub use requirement::{FilterOutcome, OutcomeSet, Requirement};
