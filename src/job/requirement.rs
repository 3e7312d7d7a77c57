//! Requirements: predicates over prior filter outcomes that gate whether a
//! component processes the current row.

use crate::row::ComponentId;

/// One (filter, category) outcome produced for a row.
///
/// This is a plain value type: an outcome captured at job-build time compares
/// equal to the same logical outcome computed at run time, regardless of
/// which object produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterOutcome {
    /// The filter that produced the outcome.
    pub filter: ComponentId,
    /// Index into the filter's declared categories.
    pub category: usize,
}

impl FilterOutcome {
    /// Create an outcome value.
    pub fn new(filter: ComponentId, category: usize) -> Self {
        Self { filter, category }
    }
}

/// The set of filter outcomes produced so far for one row branch.
#[derive(Debug, Clone, Default)]
pub struct OutcomeSet {
    outcomes: Vec<FilterOutcome>,
}

impl OutcomeSet {
    /// An empty outcome set.
    pub fn new() -> Self {
        Self::default()
    }

    /// An outcome set pre-populated with always-satisfied outcomes.
    ///
    /// Used when consuming rows outside a full run, e.g. previewing a branch
    /// of the job as if a given filter outcome had fired.
    pub fn seeded(outcomes: &[FilterOutcome]) -> Self {
        Self {
            outcomes: outcomes.to_vec(),
        }
    }

    /// Whether the set contains the given outcome.
    pub fn contains(&self, outcome: FilterOutcome) -> bool {
        self.outcomes.contains(&outcome)
    }

    pub(crate) fn push(&mut self, outcome: FilterOutcome) {
        self.outcomes.push(outcome);
    }

    /// Iterate all outcomes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = FilterOutcome> + '_ {
        self.outcomes.iter().copied()
    }

    /// Number of outcomes in the set.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// Gating predicate for a component.
///
/// A requirement may only reference filters that are strict ancestors of the
/// component it gates; graph validation enforces this. The compound variant
/// is a logical OR across alternative gating paths — there is deliberately no
/// AND combinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// Always satisfied: no upstream filter gates this component.
    Always,
    /// Satisfied iff one named filter produced one specific category.
    Outcome(FilterOutcome),
    /// Satisfied iff at least one of the alternatives is satisfied.
    AnyOf(Vec<FilterOutcome>),
}

impl Requirement {
    /// Build a compound OR requirement from alternatives.
    pub fn any_of(alternatives: impl IntoIterator<Item = FilterOutcome>) -> Self {
        Self::AnyOf(alternatives.into_iter().collect())
    }

    /// Evaluate the requirement against the outcomes produced so far.
    pub fn is_satisfied(&self, outcomes: &OutcomeSet) -> bool {
        match self {
            Requirement::Always => true,
            Requirement::Outcome(o) => outcomes.contains(*o),
            Requirement::AnyOf(alts) => alts.iter().any(|o| outcomes.contains(*o)),
        }
    }

    /// The outcomes this requirement reads.
    ///
    /// Used by graph validation to ensure the producing filter runs before
    /// the requirement is evaluated.
    pub fn dependencies(&self) -> &[FilterOutcome] {
        match self {
            Requirement::Always => &[],
            Requirement::Outcome(o) => std::slice::from_ref(o),
            Requirement::AnyOf(alts) => alts,
        }
    }

    /// The filters this requirement reads, deduplicated lazily by the caller.
    pub fn filters(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.dependencies().iter().map(|o| o.filter)
    }

    /// Whether this requirement gates at all.
    pub fn is_always(&self) -> bool {
        matches!(self, Requirement::Always)
    }
}

impl From<FilterOutcome> for Requirement {
    fn from(outcome: FilterOutcome) -> Self {
        Requirement::Outcome(outcome)
    }
}
