//! Built-in analyzers.
//!
//! Both analyzers here follow the synchronization contract documented on
//! [`crate::components::Analyzer`]: accumulated state is guarded inside the
//! analyzer, and the finalized result types implement
//! [`crate::reduce::Reducible`] so partition results can be merged.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::error::ComponentError;
use crate::reduce::Reducible;
use crate::row::RowView;
use crate::types::Value;

use super::{Analyzer, AnalyzerResult};

/// Match count and representative sample for one pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatternCount {
    /// Number of rows that matched the pattern.
    pub count: u64,
    /// A representative matched value.
    ///
    /// Always the lexically smallest value seen, so merging partitions is
    /// deterministic regardless of arrival order.
    pub sample: String,
}

/// Finalized result of a [`PatternAnalyzer`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PatternFinderResult {
    /// Patterns keyed by their token form, e.g. `"Aaa aaa"`.
    pub patterns: BTreeMap<String, PatternCount>,
}

impl PatternFinderResult {
    /// Number of distinct patterns observed.
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Match count for one pattern, if observed.
    pub fn match_count(&self, pattern: &str) -> Option<u64> {
        self.patterns.get(pattern).map(|p| p.count)
    }
}

impl Reducible for PatternFinderResult {
    fn merge(&mut self, other: Self) {
        for (pattern, incoming) in other.patterns {
            match self.patterns.get_mut(&pattern) {
                Some(existing) => {
                    existing.count += incoming.count;
                    if incoming.sample < existing.sample {
                        existing.sample = incoming.sample;
                    }
                }
                None => {
                    self.patterns.insert(pattern, incoming);
                }
            }
        }
    }
}

/// Groups string values by their character-class pattern and counts matches
/// per pattern.
///
/// Characters are classified case-sensitively: uppercase letters become `A`,
/// lowercase letters `a`, ASCII digits `9`; everything else is kept verbatim.
/// `"Foo Bar"` and `"Baz Qux"` therefore share the pattern `"Aaa Aaa"`.
/// Null and non-string values are not counted.
#[derive(Debug, Default)]
pub struct PatternAnalyzer {
    state: Mutex<BTreeMap<String, PatternCount>>,
}

impl PatternAnalyzer {
    /// Create an analyzer with empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// The pattern form of one value.
    pub fn pattern_of(value: &str) -> String {
        value
            .chars()
            .map(|c| {
                if c.is_uppercase() {
                    'A'
                } else if c.is_lowercase() {
                    'a'
                } else if c.is_ascii_digit() {
                    '9'
                } else {
                    c
                }
            })
            .collect()
    }
}

impl Analyzer for PatternAnalyzer {
    fn consume(&self, row: &RowView<'_>, repetition: usize) -> Result<(), ComponentError> {
        let Value::Utf8(text) = row.value(0) else {
            return Ok(());
        };
        let pattern = Self::pattern_of(text);

        let mut state = self.state.lock().expect("pattern analyzer mutex poisoned");
        match state.get_mut(&pattern) {
            Some(entry) => {
                entry.count += repetition as u64;
                if text.as_str() < entry.sample.as_str() {
                    entry.sample = text.clone();
                }
            }
            None => {
                state.insert(
                    pattern,
                    PatternCount {
                        count: repetition as u64,
                        sample: text.clone(),
                    },
                );
            }
        }
        Ok(())
    }

    fn result(&self) -> Result<Box<dyn AnalyzerResult>, ComponentError> {
        let state = self.state.lock().expect("pattern analyzer mutex poisoned");
        Ok(Box::new(PatternFinderResult {
            patterns: state.clone(),
        }))
    }
}

/// Finalized result of a [`RowCountAnalyzer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RowCountResult {
    /// Total number of row occurrences delivered, repetition counts included.
    pub rows: u64,
}

impl Reducible for RowCountResult {
    fn merge(&mut self, other: Self) {
        self.rows += other.rows;
    }
}

/// Counts delivered rows, weighted by repetition count.
#[derive(Debug, Default)]
pub struct RowCountAnalyzer {
    rows: AtomicU64,
}

impl RowCountAnalyzer {
    /// Create an analyzer with a zero count.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Analyzer for RowCountAnalyzer {
    fn consume(&self, _row: &RowView<'_>, repetition: usize) -> Result<(), ComponentError> {
        self.rows.fetch_add(repetition as u64, Ordering::Relaxed);
        Ok(())
    }

    fn result(&self) -> Result<Box<dyn AnalyzerResult>, ComponentError> {
        Ok(Box::new(RowCountResult {
            rows: self.rows.load(Ordering::Relaxed),
        }))
    }
}
