//! Built-in filters.

use crate::error::ComponentError;
use crate::row::RowView;
use crate::types::Value;

use super::Filter;

/// Classifies rows by whether their single input column is null.
///
/// Categories: `"null"` (index [`NullCheckFilter::NULL`]) and `"not_null"`
/// (index [`NullCheckFilter::NOT_NULL`]).
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCheckFilter;

impl NullCheckFilter {
    /// Category index emitted for null values.
    pub const NULL: usize = 0;
    /// Category index emitted for non-null values.
    pub const NOT_NULL: usize = 1;
}

impl Filter for NullCheckFilter {
    fn categories(&self) -> Vec<String> {
        vec!["null".to_string(), "not_null".to_string()]
    }

    fn categorize(&self, row: &RowView<'_>) -> Result<usize, ComponentError> {
        if row.value(0).is_null() {
            Ok(Self::NULL)
        } else {
            Ok(Self::NOT_NULL)
        }
    }
}

/// Classifies rows by whether their single input column equals a reference
/// value.
///
/// Categories: `"match"` (index [`EqualsFilter::MATCH`]) and `"no_match"`
/// (index [`EqualsFilter::NO_MATCH`]). Null never matches, not even a null
/// reference; use [`NullCheckFilter`] to gate on nullness.
#[derive(Debug, Clone)]
pub struct EqualsFilter {
    reference: Value,
}

impl EqualsFilter {
    /// Category index emitted when the value equals the reference.
    pub const MATCH: usize = 0;
    /// Category index emitted otherwise.
    pub const NO_MATCH: usize = 1;

    /// Create a filter matching against `reference`.
    pub fn new(reference: Value) -> Self {
        Self { reference }
    }
}

impl Filter for EqualsFilter {
    fn categories(&self) -> Vec<String> {
        vec!["match".to_string(), "no_match".to_string()]
    }

    fn categorize(&self, row: &RowView<'_>) -> Result<usize, ComponentError> {
        let value = row.value(0);
        if !value.is_null() && *value == self.reference {
            Ok(Self::MATCH)
        } else {
            Ok(Self::NO_MATCH)
        }
    }
}
