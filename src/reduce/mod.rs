//! Merging partial analyzer results computed on disjoint row partitions.
//!
//! An analyzer result type that can be computed per partition implements
//! [`Reducible`]; [`reduce`] folds any number of partials into one result
//! observably equivalent to a single unpartitioned run. The engine is
//! agnostic to the statistic being merged — only the shape of the contract
//! matters here.
//!
//! [`reduce_partitions`] additionally handles the cross-run case: it looks up
//! the same logical analyzer in several [`RunOutcome`]s by
//! [`AnalyzerIdentity`] and merges the typed results.

use crate::job::AnalyzerIdentity;
use crate::runner::RunOutcome;

/// Pairwise merge capability for partitionable analyzer results.
///
/// `merge` must be associative and insensitive to partition arrival order:
/// count-like sub-results sum, representative samples are chosen by a stable
/// ordering (never first-arrival), and derived statistics are recomputed from
/// merged counts rather than concatenated.
pub trait Reducible {
    /// Fold another partial result into this one.
    fn merge(&mut self, other: Self);
}

/// Reduce any number of partial results into one combined result.
///
/// Returns `None` for an empty input. For inputs `[A, B, C]` the combined
/// result is value-equal to `reduce([reduce([A, B]), C])` for any grouping.
pub fn reduce<R: Reducible>(parts: impl IntoIterator<Item = R>) -> Option<R> {
    let mut parts = parts.into_iter();
    let mut combined = parts.next()?;
    for part in parts {
        combined.merge(part);
    }
    Some(combined)
}

/// Merge the results of the same logical analyzer across partitioned runs.
///
/// The analyzer is matched in each outcome by `identity`, which is stable
/// across independently built, structurally equivalent jobs. Returns `None`
/// if no outcome carries a result of type `R` under that identity.
pub fn reduce_partitions<R>(outcomes: &[RunOutcome], identity: &AnalyzerIdentity) -> Option<R>
where
    R: Reducible + Clone + 'static,
{
    reduce(
        outcomes
            .iter()
            .filter_map(|outcome| outcome.typed_result::<R>(identity).cloned()),
    )
}

#[cfg(test)]
mod tests {
    use super::reduce;
    use crate::components::{PatternCount, PatternFinderResult, RowCountResult};

    fn result_with(entries: &[(&str, u64, &str)]) -> PatternFinderResult {
        let mut result = PatternFinderResult::default();
        for (pattern, count, sample) in entries {
            result.patterns.insert(
                pattern.to_string(),
                PatternCount {
                    count: *count,
                    sample: sample.to_string(),
                },
            );
        }
        result
    }

    #[test]
    fn reduce_of_empty_input_is_none() {
        assert_eq!(reduce(Vec::<RowCountResult>::new()), None);
    }

    #[test]
    fn reduce_sums_counts_and_keeps_smallest_sample() {
        let a = result_with(&[("Aaa", 2, "Foo"), ("999", 1, "42")]);
        let b = result_with(&[("Aaa", 1, "Bar")]);

        let combined = reduce([a, b]).unwrap();
        assert_eq!(combined.match_count("Aaa"), Some(3));
        assert_eq!(combined.patterns["Aaa"].sample, "Bar");
        assert_eq!(combined.match_count("999"), Some(1));
    }

    #[test]
    fn reduce_is_associative_for_any_grouping() {
        let a = result_with(&[("Aaa", 1, "Foo")]);
        let b = result_with(&[("Aaa", 2, "Bar"), ("aaa", 1, "foo")]);
        let c = result_with(&[("aaa", 4, "abc")]);

        let left = reduce([reduce([a.clone(), b.clone()]).unwrap(), c.clone()]).unwrap();
        let flat = reduce([a, b, c]).unwrap();
        assert_eq!(left, flat);
    }
}
