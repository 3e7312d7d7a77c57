//! Built-in transformers.

use crate::error::ComponentError;
use crate::row::RowView;
use crate::types::{DataType, Value};

use super::Transformer;

/// Splits the single string input column on whitespace, emitting one output
/// row per token.
///
/// Output column: `token` ([`DataType::Utf8`]). A null or empty input
/// produces zero output rows, terminating the branch.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenizeTransformer;

impl Transformer for TokenizeTransformer {
    fn output_columns(&self) -> Vec<(String, DataType)> {
        vec![("token".to_string(), DataType::Utf8)]
    }

    fn transform(&self, row: &RowView<'_>) -> Result<Vec<Vec<Value>>, ComponentError> {
        let Some(text) = row.value(0).as_str() else {
            return Ok(Vec::new());
        };
        Ok(text
            .split_whitespace()
            .map(|token| vec![Value::Utf8(token.to_string())])
            .collect())
    }
}

/// Emits one output row per unit of the numeric input column (count-to-N
/// fan-out).
///
/// Output column: `iteration` ([`DataType::Int64`]), carrying `0..n` for an
/// input value of `n`. Null, non-numeric, and non-positive inputs produce
/// zero output rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct RepeatTransformer;

impl Transformer for RepeatTransformer {
    fn output_columns(&self) -> Vec<(String, DataType)> {
        vec![("iteration".to_string(), DataType::Int64)]
    }

    fn transform(&self, row: &RowView<'_>) -> Result<Vec<Vec<Value>>, ComponentError> {
        let Some(count) = row.value(0).as_i64() else {
            return Ok(Vec::new());
        };
        if count <= 0 {
            return Ok(Vec::new());
        }
        Ok((0..count).map(|i| vec![Value::Int64(i)]).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{RepeatTransformer, TokenizeTransformer};
    use crate::components::Transformer;
    use crate::row::{ColumnRef, Row, RowId, RowView};
    use crate::types::Value;

    fn single_column_view(row: &Row) -> RowView<'_> {
        static VISIBLE: [ColumnRef; 1] = [ColumnRef::Source(0)];
        RowView::new(row, &VISIBLE)
    }

    #[test]
    fn tokenize_splits_on_whitespace() {
        let t = TokenizeTransformer;
        let row = Row::source(
            RowId::source(0),
            vec![Value::Utf8("foo  bar baz".to_string())],
        );
        let out = t.transform(&single_column_view(&row)).unwrap();
        assert_eq!(
            out,
            vec![
                vec![Value::Utf8("foo".to_string())],
                vec![Value::Utf8("bar".to_string())],
                vec![Value::Utf8("baz".to_string())],
            ]
        );
    }

    #[test]
    fn tokenize_terminates_branch_on_null() {
        let t = TokenizeTransformer;
        let row = Row::source(RowId::source(0), vec![Value::Null]);
        assert!(t.transform(&single_column_view(&row)).unwrap().is_empty());
    }

    #[test]
    fn repeat_emits_one_row_per_unit() {
        let t = RepeatTransformer;
        let row = Row::source(RowId::source(0), vec![Value::Int64(3)]);
        let out = t.transform(&single_column_view(&row)).unwrap();
        assert_eq!(
            out,
            vec![
                vec![Value::Int64(0)],
                vec![Value::Int64(1)],
                vec![Value::Int64(2)],
            ]
        );
    }

    #[test]
    fn repeat_produces_nothing_for_non_positive_or_null() {
        let t = RepeatTransformer;
        for value in [Value::Int64(0), Value::Int64(-2), Value::Null] {
            let row = Row::source(RowId::source(0), vec![value]);
            assert!(t.transform(&single_column_view(&row)).unwrap().is_empty());
        }
    }
}
