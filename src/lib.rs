//! `rust-data-quality` is the job execution engine of a data-quality analysis
//! platform: a component graph of source columns, [`components::Filter`]s,
//! [`components::Transformer`]s, and [`components::Analyzer`]s that is
//! executed once per input row.
//!
//! The primary entrypoints are [`job::JobGraphBuilder`] (declare and wire
//! components, validate the configuration) and [`runner::JobRunner`] (process
//! a whole [`types::RowSource`] concurrently and collect analyzer results).
//! [`engine::RowConsumer`] is the embeddable per-row core for callers that
//! want to push individual rows through a job themselves.
//!
//! ## What a job can express
//!
//! - **Conditional branching**: filters classify each row into exactly one
//!   category; downstream components gate on `(filter, category)` outcomes
//!   through [`job::Requirement`] (single outcome or OR across alternatives).
//! - **Row fan-out**: a transformer may return several output rows (e.g. a
//!   tokenizer); each continues independently through the rest of the graph
//!   with its own derived [`row::RowId`].
//! - **Concurrent analysis**: analyzers receive rows from many workers at
//!   once and synchronize their own state; results are collected once at the
//!   end of the run.
//! - **Partitioned execution**: results of the same logical analyzer from
//!   several runs are merged with [`reduce::reduce_partitions`], matched by
//!   [`job::AnalyzerIdentity`].
//!
//! ## Quick example: run a pattern analysis
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use rust_data_quality::components::{PatternAnalyzer, PatternFinderResult};
//! use rust_data_quality::job::JobGraphBuilder;
//! use rust_data_quality::runner::JobRunner;
//! use rust_data_quality::types::{DataSet, DataType, Field, Schema, Value};
//!
//! # fn main() -> Result<(), rust_data_quality::JobBuildError> {
//! let schema = Schema::new(vec![Field::new("name", DataType::Utf8)]);
//! let mut builder = JobGraphBuilder::new(schema.clone());
//! let name = builder.source_column("name").unwrap();
//! builder.add_analyzer("patterns", vec![name], Arc::new(PatternAnalyzer::new()));
//! let graph = builder.build()?;
//!
//! let source = DataSet::new(
//!     schema,
//!     vec![
//!         vec![Value::Utf8("Ada".to_string())],
//!         vec![Value::Utf8("Bob".to_string())],
//!     ],
//! );
//!
//! let runner = JobRunner::new(graph);
//! let outcome = runner.run(&source);
//! assert!(outcome.is_successful());
//!
//! let identity = outcome.analyzer_identities().next().unwrap().clone();
//! let patterns: &PatternFinderResult = outcome.typed_result(&identity).unwrap();
//! assert_eq!(patterns.match_count("Aaa"), Some(2));
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`types`]: source schema, values, and the [`types::RowSource`] boundary
//! - [`row`]: immutable rows, derived row identity, restricted row views
//! - [`job`]: requirements, graph construction and validation
//! - [`components`]: the filter/transformer/analyzer contracts and built-ins
//! - [`engine`]: per-row execution (gating, fan-out, analyzer delivery)
//! - [`runner`]: concurrent coordinator, cancellation, listeners, metrics
//! - [`reduce`]: merging partial analyzer results across partitions
//! - [`error`]: build-time, component, and run error types

pub mod components;
pub mod engine;
pub mod error;
pub mod job;
pub mod reduce;
pub mod row;
pub mod runner;
pub mod types;

pub use error::{BuildResult, ComponentError, JobBuildError, RunError};
