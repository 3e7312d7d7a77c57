//! Source-column model and in-memory row sources.
//!
//! A job graph is built against a [`Schema`] of *source* columns (the columns
//! physically supplied by a data source). At run time the execution
//! coordinator pulls rows from a [`RowSource`]; the [`DataSet`] type is the
//! built-in, in-memory implementation used for provided batches and tests.
//! Physical connectors live outside this crate and only need to implement
//! [`RowSource`].

/// Logical data type of a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point number.
    Float64,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    Utf8,
}

/// A single named, typed source column in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Column name.
    pub name: String,
    /// Column data type.
    pub data_type: DataType,
}

impl Field {
    /// Create a new field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// The ordered set of source columns a job consumes from its data source.
///
/// Column identity for source columns is positional: the engine addresses
/// them through [`crate::row::ColumnRef::Source`] indices into this schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Ordered list of source columns.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a new schema from fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Iterate field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns the index of a field by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// A single typed value in a row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    Utf8(String),
}

impl Value {
    /// `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The string content, for [`Value::Utf8`] values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Utf8(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// The integer content, for [`Value::Int64`] values.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }
}

/// A pull-based provider of source rows.
///
/// The engine pulls, never pushes: workers take rows from the iterator
/// returned by [`RowSource::open`] one at a time, behind a shared lock, so a
/// source is free to be I/O-bound. Each yielded row must carry one value per
/// schema field, in schema order.
pub trait RowSource: Send + Sync {
    /// The source columns this provider supplies.
    fn schema(&self) -> &Schema;

    /// Open a fresh iteration over all rows.
    fn open(&self) -> Box<dyn Iterator<Item = Vec<Value>> + Send + '_>;
}

/// An in-memory batch of source rows.
///
/// Rows are stored as `Vec<Vec<Value>>` in the same order as the [`Schema`]
/// fields. This is the "provided in-memory batch" flavor of [`RowSource`],
/// used directly in tests and by callers that embed the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    /// Schema describing row shape.
    pub schema: Schema,
    /// Row-major value storage.
    pub rows: Vec<Vec<Value>>,
}

impl DataSet {
    /// Create a dataset from schema and rows.
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        Self { schema, rows }
    }

    /// Number of rows in the dataset.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

impl RowSource for DataSet {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn open(&self) -> Box<dyn Iterator<Item = Vec<Value>> + Send + '_> {
        Box::new(self.rows.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::{DataSet, DataType, Field, RowSource, Schema, Value};

    #[test]
    fn schema_index_of_works() {
        let schema = Schema::new(vec![
            Field::new("id", DataType::Int64),
            Field::new("name", DataType::Utf8),
        ]);
        assert_eq!(schema.index_of("id"), Some(0));
        assert_eq!(schema.index_of("name"), Some(1));
        assert_eq!(schema.index_of("missing"), None);
    }

    #[test]
    fn dataset_opens_fresh_iterations() {
        let schema = Schema::new(vec![Field::new("id", DataType::Int64)]);
        let ds = DataSet::new(schema, vec![vec![Value::Int64(1)], vec![Value::Int64(2)]]);

        let first: Vec<_> = ds.open().collect();
        let second: Vec<_> = ds.open().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_eq!(ds.row_count(), 2);
    }

    #[test]
    fn value_accessors() {
        assert!(Value::Null.is_null());
        assert!(!Value::Int64(0).is_null());
        assert_eq!(Value::Utf8("a".to_string()).as_str(), Some("a"));
        assert_eq!(Value::Int64(3).as_i64(), Some(3));
        assert_eq!(Value::Bool(true).as_i64(), None);
    }
}
