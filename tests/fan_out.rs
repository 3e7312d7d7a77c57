//! Row fan-out through full runs: count-to-N multiplication, tokenizing, and
//! filters evaluated per fanned-out branch.

use std::sync::Arc;

use rust_data_quality::components::{
    EqualsFilter, RepeatTransformer, RowCountAnalyzer, RowCountResult, TokenizeTransformer,
};
use rust_data_quality::job::{AnalyzerIdentity, JobGraphBuilder, Requirement};
use rust_data_quality::runner::{JobRunner, RunnerOptions};
use rust_data_quality::types::{DataSet, DataType, Field, Schema, Value};

fn single_threaded(builder: JobGraphBuilder) -> JobRunner {
    JobRunner::with_options(
        builder.build().unwrap(),
        RunnerOptions {
            num_threads: Some(1),
        },
    )
}

#[test]
fn count_to_n_fan_out_delivers_n_rows() {
    let mut builder = JobGraphBuilder::new(Schema::new(vec![Field::new(
        "count",
        DataType::Int64,
    )]));
    let count = builder.source_column("count").unwrap();
    let repeat = builder.add_transformer("repeat", vec![count], Arc::new(RepeatTransformer));
    let iteration = builder.output_column(repeat, 0);
    builder.add_analyzer("rows", vec![iteration], Arc::new(RowCountAnalyzer::new()));

    let source = DataSet::new(
        Schema::new(vec![Field::new("count", DataType::Int64)]),
        vec![vec![Value::Int64(3)]],
    );
    let outcome = single_threaded(builder).run(&source);

    assert!(outcome.is_successful());
    let identity = AnalyzerIdentity::new("rows", Some("iteration"));
    let counted: &RowCountResult = outcome.typed_result(&identity).unwrap();
    assert_eq!(counted.rows, 3);
    assert_eq!(outcome.metrics().analyzer_deliveries, 3);
    assert_eq!(outcome.metrics().max_fan_out, 3);
}

#[test]
fn tokenizer_fans_out_per_token_and_skips_null_rows() {
    let mut builder = JobGraphBuilder::new(Schema::new(vec![Field::new(
        "text",
        DataType::Utf8,
    )]));
    let text = builder.source_column("text").unwrap();
    let tokens = builder.add_transformer("tokens", vec![text], Arc::new(TokenizeTransformer));
    let token = builder.output_column(tokens, 0);
    builder.add_analyzer("rows", vec![token], Arc::new(RowCountAnalyzer::new()));

    let source = DataSet::new(
        Schema::new(vec![Field::new("text", DataType::Utf8)]),
        vec![
            vec![Value::Utf8("red green blue".to_string())],
            vec![Value::Null],
            vec![Value::Utf8("cyan".to_string())],
        ],
    );
    let outcome = single_threaded(builder).run(&source);

    assert!(outcome.is_successful());
    let identity = AnalyzerIdentity::new("rows", Some("token"));
    let counted: &RowCountResult = outcome.typed_result(&identity).unwrap();
    assert_eq!(counted.rows, 4);
}

#[test]
fn downstream_filters_run_once_per_fanned_out_branch() {
    let mut builder = JobGraphBuilder::new(Schema::new(vec![Field::new(
        "text",
        DataType::Utf8,
    )]));
    let text = builder.source_column("text").unwrap();
    let tokens = builder.add_transformer("tokens", vec![text], Arc::new(TokenizeTransformer));
    let token = builder.output_column(tokens, 0);

    let is_red = builder.add_filter(
        "is red",
        vec![token],
        Arc::new(EqualsFilter::new(Value::Utf8("red".to_string()))),
    );
    let red = builder.outcome(is_red, "match").unwrap();

    let rows = builder.add_analyzer("rows", vec![token], Arc::new(RowCountAnalyzer::new()));
    builder.set_requirement(rows, Requirement::Outcome(red));

    let source = DataSet::new(
        Schema::new(vec![Field::new("text", DataType::Utf8)]),
        vec![vec![Value::Utf8("red green red blue".to_string())]],
    );
    let outcome = single_threaded(builder).run(&source);

    // The filter categorizes each token branch independently; only the two
    // "red" branches satisfy the analyzer's requirement.
    assert!(outcome.is_successful());
    let identity = AnalyzerIdentity::new("rows", Some("token"));
    let counted: &RowCountResult = outcome.typed_result(&identity).unwrap();
    assert_eq!(counted.rows, 2);
}
