//! Row and column identity: the per-row data carrier that grows as
//! transformers add columns.
//!
//! A [`Row`] is an immutable persistent structure: a source value vector plus
//! a chain of derived links, each holding one transformer's output values and
//! a cheap handle back to the parent. Components never receive a whole row —
//! they get a [`RowView`] restricted to their declared input columns, so a
//! component cannot observe values it did not declare a dependency on.

use std::fmt;
use std::sync::Arc;

use crate::types::Value;

/// Identifier of a component node within one job graph.
///
/// Assigned in declaration order by the builder; also used as the
/// tie-breaker for deterministic processing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub(crate) usize);

impl ComponentId {
    pub(crate) fn index(self) -> usize {
        self.0
    }
}

/// Identity of a column a component can consume.
///
/// Source columns are bound to the external data source (identity = physical
/// origin, i.e. the schema index). Synthesized columns are created by a
/// transformer; their identity is the producing node plus an output ordinal,
/// so the same transformer implementation used twice in one job yields
/// distinct columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnRef {
    /// Index into the job's source [`crate::types::Schema`].
    Source(usize),
    /// Output `ordinal` of the transformer node `producer`.
    Synthesized {
        producer: ComponentId,
        ordinal: usize,
    },
}

/// Identifier of a row, traceable to its origin.
///
/// Source rows carry a sequence number; every fan-out step appends the child
/// index to the path, so ids of rows derived from two distinct parents can
/// never collide, no matter how deeply transformers fan out.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowId {
    base: u64,
    path: Vec<u32>,
}

impl RowId {
    /// Id for a source row with the given sequence number.
    pub fn source(sequence: u64) -> Self {
        Self {
            base: sequence,
            path: Vec::new(),
        }
    }

    /// Id for the `index`-th child of this row.
    pub fn derive(&self, index: usize) -> Self {
        let mut path = Vec::with_capacity(self.path.len() + 1);
        path.extend_from_slice(&self.path);
        path.push(index as u32);
        Self {
            base: self.base,
            path,
        }
    }

    /// Sequence number of the source row this row descends from.
    pub fn source_sequence(&self) -> u64 {
        self.base
    }

    /// Number of fan-out steps between this row and its source row.
    pub fn depth(&self) -> usize {
        self.path.len()
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)?;
        for step in &self.path {
            write!(f, "/{step}")?;
        }
        Ok(())
    }
}

#[derive(Debug)]
enum RowLink {
    Source {
        values: Vec<Value>,
    },
    Derived {
        parent: Row,
        producer: ComponentId,
        values: Vec<Value>,
    },
}

/// An immutable, append-only mapping from column to value.
///
/// Cloning is cheap (`Arc`); deriving never copies parent values. A row
/// produced by a transformer is a view that logically contains the parent
/// row's columns plus the transformer's output columns.
#[derive(Debug, Clone)]
pub struct Row {
    id: RowId,
    link: Arc<RowLink>,
}

impl Row {
    /// Create a source row with values in schema order.
    pub fn source(id: RowId, values: Vec<Value>) -> Self {
        Self {
            id,
            link: Arc::new(RowLink::Source { values }),
        }
    }

    /// Extend this row with a transformer's output values, giving the child
    /// a fresh derived id.
    pub fn derive(&self, producer: ComponentId, values: Vec<Value>, index: usize) -> Row {
        Row {
            id: self.id.derive(index),
            link: Arc::new(RowLink::Derived {
                parent: self.clone(),
                producer,
                values,
            }),
        }
    }

    /// The row's identifier.
    pub fn id(&self) -> &RowId {
        &self.id
    }

    /// Look up the value for a column, walking the derivation chain.
    pub fn value(&self, column: ColumnRef) -> Option<&Value> {
        match &*self.link {
            RowLink::Source { values } => match column {
                ColumnRef::Source(idx) => values.get(idx),
                ColumnRef::Synthesized { .. } => None,
            },
            RowLink::Derived {
                parent,
                producer,
                values,
            } => match column {
                ColumnRef::Synthesized {
                    producer: p,
                    ordinal,
                } if p == *producer => values.get(ordinal),
                other => parent.value(other),
            },
        }
    }
}

static NULL: Value = Value::Null;

/// A component's view of a row, restricted to its declared input columns.
///
/// Inputs are addressed positionally, in the order the component declared
/// them at registration. Columns the component did not declare are not
/// reachable through the view — encapsulation, not convenience.
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    row: &'a Row,
    visible: &'a [ColumnRef],
}

impl<'a> RowView<'a> {
    pub(crate) fn new(row: &'a Row, visible: &'a [ColumnRef]) -> Self {
        Self { row, visible }
    }

    /// The underlying row's identifier.
    pub fn id(&self) -> &RowId {
        self.row.id()
    }

    /// Number of declared input columns.
    pub fn width(&self) -> usize {
        self.visible.len()
    }

    /// Value of the `input`-th declared input column.
    ///
    /// Returns [`Value::Null`] for an out-of-range position; graph validation
    /// guarantees every declared column is produced upstream.
    pub fn value(&self, input: usize) -> &Value {
        self.visible
            .get(input)
            .and_then(|c| self.row.value(*c))
            .unwrap_or(&NULL)
    }

    /// Iterate the values of all declared input columns, in declaration order.
    pub fn values(&self) -> impl Iterator<Item = &Value> + '_ {
        (0..self.visible.len()).map(move |i| self.value(i))
    }
}

#[cfg(test)]
mod tests {
    use super::{ColumnRef, ComponentId, Row, RowId, RowView};
    use crate::types::Value;

    #[test]
    fn row_id_paths_are_unique_across_parents() {
        let a = RowId::source(1);
        let b = RowId::source(2);
        assert_ne!(a, b);

        // Children of distinct parents never collide, even at equal indices.
        assert_ne!(a.derive(0), b.derive(0));
        // Nested fan-out stays unique and traceable.
        let nested = a.derive(1).derive(0);
        assert_ne!(nested, a.derive(0));
        assert_eq!(nested.source_sequence(), 1);
        assert_eq!(nested.depth(), 2);
        assert_eq!(nested.to_string(), "1/1/0");
    }

    #[test]
    fn derived_rows_see_parent_and_own_columns() {
        let source = Row::source(RowId::source(7), vec![Value::Int64(42)]);
        let t = ComponentId(3);
        let derived = source.derive(t, vec![Value::Utf8("x".to_string())], 0);

        assert_eq!(derived.value(ColumnRef::Source(0)), Some(&Value::Int64(42)));
        assert_eq!(
            derived.value(ColumnRef::Synthesized {
                producer: t,
                ordinal: 0
            }),
            Some(&Value::Utf8("x".to_string()))
        );
        // The parent never sees the child's columns.
        assert_eq!(
            source.value(ColumnRef::Synthesized {
                producer: t,
                ordinal: 0
            }),
            None
        );
        assert_eq!(derived.id().to_string(), "7/0");
    }

    #[test]
    fn view_only_exposes_declared_inputs() {
        let t = ComponentId(0);
        let row = Row::source(RowId::source(0), vec![Value::Int64(1), Value::Int64(2)])
            .derive(t, vec![Value::Int64(3)], 0);

        // Declared inputs: source column 1 only.
        let visible = [ColumnRef::Source(1)];
        let view = RowView::new(&row, &visible);
        assert_eq!(view.width(), 1);
        assert_eq!(view.value(0), &Value::Int64(2));
        // Positions outside the declaration are null, even though the row
        // holds more columns.
        assert_eq!(view.value(1), &Value::Null);
        assert_eq!(view.values().count(), 1);
    }
}
