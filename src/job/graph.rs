//! Job graph construction and validation.
//!
//! A [`JobGraphBuilder`] accepts component declarations plus wiring (explicit
//! input-column bindings and requirements) and produces the immutable,
//! execution-ready [`JobGraph`], or fails fast with a
//! [`JobBuildError`]. The graph is built once, validated before any row is
//! processed, and shared read-only across all row-processing workers; only
//! analyzer-internal state mutates during a run.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::components::{Analyzer, Filter, Transformer};
use crate::error::{BuildResult, JobBuildError};
use crate::row::{ColumnRef, ComponentId};
use crate::types::{DataType, Schema};

use super::requirement::{FilterOutcome, Requirement};

/// Handle to a registered filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterHandle(pub(crate) ComponentId);

/// Handle to a registered transformer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransformerHandle(pub(crate) ComponentId);

/// Handle to a registered analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnalyzerHandle(pub(crate) ComponentId);

impl From<FilterHandle> for ComponentId {
    fn from(h: FilterHandle) -> Self {
        h.0
    }
}

impl From<TransformerHandle> for ComponentId {
    fn from(h: TransformerHandle) -> Self {
        h.0
    }
}

impl From<AnalyzerHandle> for ComponentId {
    fn from(h: AnalyzerHandle) -> Self {
        h.0
    }
}

/// When a registered close action fires (see [`JobGraphBuilder::on_close`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseCondition {
    /// Fires at the end of every run.
    Always,
    /// Fires only when the run finished successfully.
    OnSuccess,
    /// Fires when the run did not finish successfully (including cancelled
    /// runs — cancellation is not an error, but it is not success either).
    OnFailure,
}

pub(crate) struct CloseAction {
    pub(crate) component: ComponentId,
    pub(crate) condition: CloseCondition,
    pub(crate) action: Box<dyn Fn() + Send + Sync>,
}

/// Identity of "the same logical analyzer" across independently built jobs.
///
/// Two structurally equivalent jobs built from separate builders are not
/// object-identical, but their analyzers resolve to equal identities: the
/// analyzer's name plus, when exactly one input column is declared, that
/// column's name. This is what lets the result reducer match partial results
/// computed on different partitions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AnalyzerIdentity {
    /// The analyzer's registered name.
    pub name: String,
    /// Name of the single identifying input column, if exactly one exists.
    pub column: Option<String>,
}

impl AnalyzerIdentity {
    /// Create an identity value.
    pub fn new(name: impl Into<String>, column: Option<&str>) -> Self {
        Self {
            name: name.into(),
            column: column.map(str::to_string),
        }
    }
}

impl fmt::Display for AnalyzerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.column {
            Some(column) => write!(f, "{} ({column})", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

pub(crate) enum NodeKind {
    Filter {
        filter: Arc<dyn Filter>,
        categories: Vec<String>,
    },
    Transformer {
        transformer: Arc<dyn Transformer>,
        outputs: Vec<(String, DataType)>,
    },
    Analyzer {
        analyzer: Arc<dyn Analyzer>,
    },
}

pub(crate) struct Node {
    pub(crate) name: String,
    pub(crate) inputs: Vec<ColumnRef>,
    pub(crate) requirement: Requirement,
    pub(crate) kind: NodeKind,
}

impl Node {
    fn kind_label(&self) -> &'static str {
        match self.kind {
            NodeKind::Filter { .. } => "filter",
            NodeKind::Transformer { .. } => "transformer",
            NodeKind::Analyzer { .. } => "analyzer",
        }
    }
}

/// Builder for a [`JobGraph`].
///
/// Components are registered in declaration order; the builder hands out
/// typed handles used to wire input columns, filter outcomes, and
/// requirements. `build()` validates the whole configuration and computes
/// the processing order once.
pub struct JobGraphBuilder {
    schema: Schema,
    nodes: Vec<Node>,
    close_actions: Vec<CloseAction>,
}

impl JobGraphBuilder {
    /// Start a builder for a job consuming the given source columns.
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            nodes: Vec::new(),
            close_actions: Vec::new(),
        }
    }

    /// The source schema this job is built against.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Column reference for a source column, by name.
    pub fn source_column(&self, name: &str) -> Option<ColumnRef> {
        self.schema.index_of(name).map(ColumnRef::Source)
    }

    /// Register a filter consuming the given input columns.
    pub fn add_filter(
        &mut self,
        name: impl Into<String>,
        inputs: Vec<ColumnRef>,
        filter: Arc<dyn Filter>,
    ) -> FilterHandle {
        let categories = filter.categories();
        let id = self.push(Node {
            name: name.into(),
            inputs,
            requirement: Requirement::Always,
            kind: NodeKind::Filter { filter, categories },
        });
        FilterHandle(id)
    }

    /// The outcome value for a filter category, by category name.
    pub fn outcome(&self, filter: FilterHandle, category: &str) -> BuildResult<FilterOutcome> {
        // Handles are typed, but one from another builder can be out of
        // range or point at a non-filter node here.
        let handle_index = filter.0.index();
        let node = self.nodes.get(handle_index);
        let Some(Node {
            kind: NodeKind::Filter { categories, .. },
            name,
            ..
        }) = node
        else {
            return Err(JobBuildError::NotAFilter {
                component: node
                    .map(|n| n.name.clone())
                    .unwrap_or_else(|| format!("#{handle_index}")),
                referenced: format!("#{handle_index}"),
            });
        };
        let index = categories.iter().position(|c| c == category).ok_or_else(|| {
            JobBuildError::NoSuchCategory {
                filter: name.clone(),
                category: category.to_string(),
            }
        })?;
        Ok(FilterOutcome::new(filter.0, index))
    }

    /// Register a transformer consuming the given input columns.
    ///
    /// Its output columns become addressable via
    /// [`JobGraphBuilder::output_column`].
    pub fn add_transformer(
        &mut self,
        name: impl Into<String>,
        inputs: Vec<ColumnRef>,
        transformer: Arc<dyn Transformer>,
    ) -> TransformerHandle {
        let outputs = transformer.output_columns();
        let id = self.push(Node {
            name: name.into(),
            inputs,
            requirement: Requirement::Always,
            kind: NodeKind::Transformer {
                transformer,
                outputs,
            },
        });
        TransformerHandle(id)
    }

    /// Column reference for one output column of a transformer.
    pub fn output_column(&self, transformer: TransformerHandle, ordinal: usize) -> ColumnRef {
        ColumnRef::Synthesized {
            producer: transformer.0,
            ordinal,
        }
    }

    /// Column references for all output columns of a transformer, in order.
    pub fn output_columns(&self, transformer: TransformerHandle) -> Vec<ColumnRef> {
        match &self.nodes[transformer.0.index()].kind {
            NodeKind::Transformer { outputs, .. } => (0..outputs.len())
                .map(|ordinal| ColumnRef::Synthesized {
                    producer: transformer.0,
                    ordinal,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Register an analyzer consuming the given input columns.
    pub fn add_analyzer(
        &mut self,
        name: impl Into<String>,
        inputs: Vec<ColumnRef>,
        analyzer: Arc<dyn Analyzer>,
    ) -> AnalyzerHandle {
        let id = self.push(Node {
            name: name.into(),
            inputs,
            requirement: Requirement::Always,
            kind: NodeKind::Analyzer { analyzer },
        });
        AnalyzerHandle(id)
    }

    /// Gate a component on a requirement.
    ///
    /// # Panics
    ///
    /// Panics if the handle does not belong to this builder.
    pub fn set_requirement(&mut self, component: impl Into<ComponentId>, requirement: Requirement) {
        let id: ComponentId = component.into();
        assert!(id.index() < self.nodes.len(), "unknown component handle");
        self.nodes[id.index()].requirement = requirement;
    }

    /// Register a cleanup action for a component.
    ///
    /// At the end of every run the coordinator fires, per component, the
    /// `Always` actions plus exactly one of the `OnSuccess`/`OnFailure`
    /// classes, regardless of whether row processing for that component ever
    /// started.
    ///
    /// # Panics
    ///
    /// Panics if the handle does not belong to this builder.
    pub fn on_close(
        &mut self,
        component: impl Into<ComponentId>,
        condition: CloseCondition,
        action: impl Fn() + Send + Sync + 'static,
    ) {
        let id: ComponentId = component.into();
        assert!(id.index() < self.nodes.len(), "unknown component handle");
        self.close_actions.push(CloseAction {
            component: id,
            condition,
            action: Box::new(action),
        });
    }

    fn push(&mut self, node: Node) -> ComponentId {
        let id = ComponentId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Validate the configuration and produce the immutable job graph.
    pub fn build(self) -> BuildResult<JobGraph> {
        self.validate_columns()?;
        self.validate_requirements()?;
        let order = self.topological_order()?;
        self.validate_gating()?;
        let analyzer_identities = self.analyzer_identities()?;

        Ok(JobGraph {
            schema: self.schema,
            nodes: self.nodes,
            order,
            close_actions: self.close_actions,
            analyzer_identities,
        })
    }

    fn validate_columns(&self) -> BuildResult<()> {
        for (i, node) in self.nodes.iter().enumerate() {
            for input in &node.inputs {
                match *input {
                    ColumnRef::Source(idx) => {
                        if idx >= self.schema.fields.len() {
                            return Err(JobBuildError::UnknownColumn {
                                component: node.name.clone(),
                                column: format!("source index {idx}"),
                            });
                        }
                    }
                    ColumnRef::Synthesized { producer, ordinal } => {
                        let valid = producer.index() != i
                            && match self.nodes.get(producer.index()) {
                                Some(Node {
                                    kind: NodeKind::Transformer { outputs, .. },
                                    ..
                                }) => ordinal < outputs.len(),
                                _ => false,
                            };
                        if !valid {
                            return Err(JobBuildError::UnknownColumn {
                                component: node.name.clone(),
                                column: format!(
                                    "output {ordinal} of component #{}",
                                    producer.index()
                                ),
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn validate_requirements(&self) -> BuildResult<()> {
        for node in &self.nodes {
            if let NodeKind::Filter { categories, .. } = &node.kind {
                if categories.is_empty() {
                    return Err(JobBuildError::NoCategories {
                        filter: node.name.clone(),
                    });
                }
            }

            for dep in node.requirement.dependencies() {
                let referenced = self.nodes.get(dep.filter.index());
                let Some(Node {
                    kind: NodeKind::Filter { categories, .. },
                    name,
                    ..
                }) = referenced
                else {
                    return Err(JobBuildError::NotAFilter {
                        component: node.name.clone(),
                        referenced: referenced
                            .map(|n| n.name.clone())
                            .unwrap_or_else(|| format!("#{}", dep.filter.index())),
                    });
                };
                if dep.category >= categories.len() {
                    return Err(JobBuildError::UnknownCategory {
                        component: node.name.clone(),
                        filter: name.clone(),
                        category: dep.category,
                    });
                }
            }
        }
        Ok(())
    }

    /// Topological sort over column-produces and requirement edges.
    ///
    /// Ties are broken by declaration order, so the processing order is
    /// deterministic and identical for every row of a run.
    fn topological_order(&self) -> BuildResult<Vec<ComponentId>> {
        let n = self.nodes.len();
        let mut edges: BTreeSet<(usize, usize)> = BTreeSet::new();
        for (i, node) in self.nodes.iter().enumerate() {
            for input in &node.inputs {
                if let ColumnRef::Synthesized { producer, .. } = input {
                    edges.insert((producer.index(), i));
                }
            }
            for dep in node.requirement.dependencies() {
                edges.insert((dep.filter.index(), i));
            }
        }

        let mut indegree = vec![0usize; n];
        let mut adjacent: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (from, to) in edges {
            if from == to {
                return Err(JobBuildError::DependencyCycle {
                    component: self.nodes[from].name.clone(),
                });
            }
            adjacent[from].push(to);
            indegree[to] += 1;
        }

        let mut ready: BTreeSet<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(&i) = ready.iter().next() {
            ready.remove(&i);
            order.push(ComponentId(i));
            for &j in &adjacent[i] {
                indegree[j] -= 1;
                if indegree[j] == 0 {
                    ready.insert(j);
                }
            }
        }

        if order.len() != n {
            let stuck = (0..n)
                .find(|&i| indegree[i] > 0)
                .map(|i| self.nodes[i].name.clone())
                .unwrap_or_default();
            return Err(JobBuildError::DependencyCycle { component: stuck });
        }
        Ok(order)
    }

    /// The OR-set of outcomes under which a node can run, `None` when the
    /// node is unconditional all the way up its column producers.
    fn transitive_guard(
        &self,
        idx: usize,
        memo: &mut HashMap<usize, Option<Vec<FilterOutcome>>>,
    ) -> Option<Vec<FilterOutcome>> {
        if let Some(cached) = memo.get(&idx) {
            return cached.clone();
        }
        let node = &self.nodes[idx];
        let guard = if !node.requirement.is_always() {
            Some(node.requirement.dependencies().to_vec())
        } else {
            let mut union: Vec<FilterOutcome> = Vec::new();
            let mut gated = false;
            for input in &node.inputs {
                if let ColumnRef::Synthesized { producer, .. } = input {
                    if let Some(inherited) = self.transitive_guard(producer.index(), memo) {
                        gated = true;
                        for outcome in inherited {
                            if !union.contains(&outcome) {
                                union.push(outcome);
                            }
                        }
                    }
                }
            }
            if gated { Some(union) } else { None }
        };
        memo.insert(idx, guard.clone());
        guard
    }

    /// Whether node `idx` only ever runs when one of `guard`'s outcomes holds.
    fn covered_by(&self, idx: usize, guard: &[FilterOutcome]) -> bool {
        let requirement = &self.nodes[idx].requirement;
        if requirement.is_always() {
            return false;
        }
        requirement.dependencies().iter().all(|outcome| {
            guard.contains(outcome) || self.covered_by(outcome.filter.index(), guard)
        })
    }

    /// A component consuming columns of a gated transformer must itself gate
    /// on the same filter outcome (directly, or through a filter that is
    /// itself covered). Anything else is a configuration error caught here,
    /// not a row-time surprise.
    fn validate_gating(&self) -> BuildResult<()> {
        let mut memo = HashMap::new();
        for (i, node) in self.nodes.iter().enumerate() {
            for input in &node.inputs {
                let ColumnRef::Synthesized { producer, .. } = input else {
                    continue;
                };
                let Some(guard) = self.transitive_guard(producer.index(), &mut memo) else {
                    continue;
                };
                if !self.covered_by(i, &guard) {
                    return Err(JobBuildError::UngatedDependency {
                        component: node.name.clone(),
                        producer: self.nodes[producer.index()].name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn column_name(&self, column: ColumnRef) -> Option<String> {
        match column {
            ColumnRef::Source(idx) => self.schema.fields.get(idx).map(|f| f.name.clone()),
            ColumnRef::Synthesized { producer, ordinal } => {
                match &self.nodes.get(producer.index())?.kind {
                    NodeKind::Transformer { outputs, .. } => {
                        outputs.get(ordinal).map(|(name, _)| name.clone())
                    }
                    _ => None,
                }
            }
        }
    }

    fn analyzer_identities(&self) -> BuildResult<Vec<(ComponentId, AnalyzerIdentity)>> {
        let mut identities = Vec::new();
        let mut seen: HashSet<AnalyzerIdentity> = HashSet::new();
        for (i, node) in self.nodes.iter().enumerate() {
            let NodeKind::Analyzer { .. } = node.kind else {
                continue;
            };
            let column = match node.inputs.as_slice() {
                [single] => self.column_name(*single),
                _ => None,
            };
            let identity = AnalyzerIdentity {
                name: node.name.clone(),
                column,
            };
            if !seen.insert(identity.clone()) {
                let first = identities
                    .iter()
                    .find(|(_, existing)| *existing == identity)
                    .map(|(id, _): &(ComponentId, _)| self.nodes[id.index()].name.clone())
                    .unwrap_or_default();
                return Err(JobBuildError::DuplicateAnalyzerIdentity {
                    first,
                    second: node.name.clone(),
                });
            }
            identities.push((ComponentId(i), identity));
        }
        if identities.is_empty() {
            return Err(JobBuildError::NoAnalyzers);
        }
        Ok(identities)
    }
}

/// The validated, immutable plan of components and their column/requirement
/// dependencies for one analysis job.
///
/// Safe to share read-only (`Arc`) across concurrent row-processing workers;
/// the cached processing order is reused for every row.
pub struct JobGraph {
    schema: Schema,
    nodes: Vec<Node>,
    order: Vec<ComponentId>,
    close_actions: Vec<CloseAction>,
    analyzer_identities: Vec<(ComponentId, AnalyzerIdentity)>,
}

impl JobGraph {
    /// The source schema this job consumes.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Number of components in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no components (never true for built graphs).
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Name of a component.
    pub fn component_name(&self, id: ComponentId) -> &str {
        &self.nodes[id.index()].name
    }

    /// The cached topological processing order, identical for every row.
    pub fn processing_order(&self) -> &[ComponentId] {
        &self.order
    }

    /// Handles of all analyzers, in declaration order.
    pub fn analyzers(&self) -> impl Iterator<Item = AnalyzerHandle> + '_ {
        self.analyzer_identities
            .iter()
            .map(|(id, _)| AnalyzerHandle(*id))
    }

    /// Identity of an analyzer, used to match results across partitions.
    pub fn analyzer_identity(&self, handle: AnalyzerHandle) -> Option<&AnalyzerIdentity> {
        self.analyzer_identities
            .iter()
            .find(|(id, _)| *id == handle.0)
            .map(|(_, identity)| identity)
    }

    pub(crate) fn node(&self, id: ComponentId) -> &Node {
        &self.nodes[id.index()]
    }

    pub(crate) fn analyzer_component(&self, handle: AnalyzerHandle) -> &dyn Analyzer {
        match &self.nodes[handle.0.index()].kind {
            NodeKind::Analyzer { analyzer } => analyzer.as_ref(),
            _ => unreachable!("analyzer handle always points at an analyzer node"),
        }
    }

    pub(crate) fn close_actions(&self) -> &[CloseAction] {
        &self.close_actions
    }
}

impl fmt::Debug for JobGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut components = f.debug_map();
        for node in &self.nodes {
            components.entry(&node.name, &node.kind_label());
        }
        components.finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{JobGraphBuilder, Requirement};
    use crate::components::{
        NullCheckFilter, PatternAnalyzer, RowCountAnalyzer, TokenizeTransformer,
    };
    use crate::error::JobBuildError;
    use crate::row::{ColumnRef, ComponentId};
    use crate::types::{DataType, Field, Schema};

    fn name_schema() -> Schema {
        Schema::new(vec![Field::new("name", DataType::Utf8)])
    }

    #[test]
    fn builds_a_minimal_job() {
        let mut builder = JobGraphBuilder::new(name_schema());
        let name = builder.source_column("name").unwrap();
        builder.add_analyzer("patterns", vec![name], Arc::new(PatternAnalyzer::new()));

        let graph = builder.build().unwrap();
        assert_eq!(graph.len(), 1);
        let analyzer = graph.analyzers().next().unwrap();
        let identity = graph.analyzer_identity(analyzer).unwrap();
        assert_eq!(identity.name, "patterns");
        assert_eq!(identity.column.as_deref(), Some("name"));
    }

    #[test]
    fn processing_order_breaks_ties_by_declaration() {
        let mut builder = JobGraphBuilder::new(name_schema());
        let name = builder.source_column("name").unwrap();
        let b = builder.add_analyzer("b", vec![name], Arc::new(RowCountAnalyzer::new()));
        let a = builder.add_analyzer("a", vec![name], Arc::new(PatternAnalyzer::new()));

        let graph = builder.build().unwrap();
        let order = graph.processing_order().to_vec();
        assert_eq!(order, vec![ComponentId::from(b), ComponentId::from(a)]);
    }

    #[test]
    fn processing_order_follows_column_dependencies() {
        let mut builder = JobGraphBuilder::new(name_schema());
        let name = builder.source_column("name").unwrap();
        let tokens = builder.add_transformer("tokens", vec![name], Arc::new(TokenizeTransformer));
        let token = builder.output_column(tokens, 0);
        let patterns =
            builder.add_analyzer("patterns", vec![token], Arc::new(PatternAnalyzer::new()));
        let counts = builder.add_analyzer("counts", vec![name], Arc::new(RowCountAnalyzer::new()));

        let graph = builder.build().unwrap();
        let order = graph.processing_order();
        let pos = |id: ComponentId| order.iter().position(|&o| o == id).unwrap();
        assert!(pos(tokens.into()) < pos(patterns.into()));
        // Unrelated analyzer keeps declaration order relative to others.
        assert!(pos(counts.into()) > pos(tokens.into()));
    }

    #[test]
    fn unknown_column_is_a_build_error() {
        let mut builder = JobGraphBuilder::new(name_schema());
        builder.add_analyzer(
            "patterns",
            vec![ColumnRef::Source(9)],
            Arc::new(PatternAnalyzer::new()),
        );
        let err = builder.build().unwrap_err();
        assert!(matches!(err, JobBuildError::UnknownColumn { .. }));
        assert!(err.to_string().contains("patterns"));
    }

    #[test]
    fn unknown_category_name_is_a_build_error() {
        let mut builder = JobGraphBuilder::new(name_schema());
        let name = builder.source_column("name").unwrap();
        let filter = builder.add_filter("null check", vec![name], Arc::new(NullCheckFilter));
        let err = builder.outcome(filter, "bogus").unwrap_err();
        assert!(matches!(err, JobBuildError::NoSuchCategory { .. }));
    }

    #[test]
    fn outcome_rejects_handles_from_another_builder() {
        let mut other = JobGraphBuilder::new(name_schema());
        let name = other.source_column("name").unwrap();
        let foreign = other.add_filter("null check", vec![name], Arc::new(NullCheckFilter));

        // Out of range: this builder has no nodes yet.
        let empty = JobGraphBuilder::new(name_schema());
        let err = empty.outcome(foreign, "not_null").unwrap_err();
        assert!(matches!(err, JobBuildError::NotAFilter { .. }));
        assert!(err.to_string().contains("#0"));

        // In range, but the node at that index is a transformer.
        let mut mismatched = JobGraphBuilder::new(name_schema());
        let name = mismatched.source_column("name").unwrap();
        mismatched.add_transformer("tokens", vec![name], Arc::new(TokenizeTransformer));
        let err = mismatched.outcome(foreign, "not_null").unwrap_err();
        let JobBuildError::NotAFilter {
            component,
            referenced,
        } = err
        else {
            panic!("expected a not-a-filter error");
        };
        assert_eq!(component, "tokens");
        assert_eq!(referenced, "#0");
    }

    #[test]
    fn requirement_cycle_is_a_build_error() {
        let mut builder = JobGraphBuilder::new(name_schema());
        let name = builder.source_column("name").unwrap();
        let f1 = builder.add_filter("f1", vec![name], Arc::new(NullCheckFilter));
        let f2 = builder.add_filter("f2", vec![name], Arc::new(NullCheckFilter));
        builder.add_analyzer("patterns", vec![name], Arc::new(PatternAnalyzer::new()));

        let o1 = builder.outcome(f1, "not_null").unwrap();
        let o2 = builder.outcome(f2, "not_null").unwrap();
        builder.set_requirement(f1, Requirement::Outcome(o2));
        builder.set_requirement(f2, Requirement::Outcome(o1));

        let err = builder.build().unwrap_err();
        assert!(matches!(err, JobBuildError::DependencyCycle { .. }));
    }

    #[test]
    fn consuming_gated_columns_without_gating_is_a_build_error() {
        let mut builder = JobGraphBuilder::new(name_schema());
        let name = builder.source_column("name").unwrap();
        let filter = builder.add_filter("null check", vec![name], Arc::new(NullCheckFilter));
        let tokens = builder.add_transformer("tokens", vec![name], Arc::new(TokenizeTransformer));
        let not_null = builder.outcome(filter, "not_null").unwrap();
        builder.set_requirement(tokens, Requirement::Outcome(not_null));

        let token = builder.output_column(tokens, 0);
        // No requirement on the analyzer: it could observe missing columns.
        builder.add_analyzer("patterns", vec![token], Arc::new(PatternAnalyzer::new()));

        let err = builder.build().unwrap_err();
        assert!(matches!(err, JobBuildError::UngatedDependency { .. }));
        assert!(err.to_string().contains("tokens"));
    }

    #[test]
    fn gating_on_the_same_outcome_satisfies_the_dependency_check() {
        let mut builder = JobGraphBuilder::new(name_schema());
        let name = builder.source_column("name").unwrap();
        let filter = builder.add_filter("null check", vec![name], Arc::new(NullCheckFilter));
        let tokens = builder.add_transformer("tokens", vec![name], Arc::new(TokenizeTransformer));
        let not_null = builder.outcome(filter, "not_null").unwrap();
        builder.set_requirement(tokens, Requirement::Outcome(not_null));

        let token = builder.output_column(tokens, 0);
        let patterns =
            builder.add_analyzer("patterns", vec![token], Arc::new(PatternAnalyzer::new()));
        builder.set_requirement(patterns, Requirement::Outcome(not_null));

        assert!(builder.build().is_ok());
    }

    #[test]
    fn duplicate_analyzer_identity_is_a_build_error() {
        let mut builder = JobGraphBuilder::new(name_schema());
        let name = builder.source_column("name").unwrap();
        builder.add_analyzer("patterns", vec![name], Arc::new(PatternAnalyzer::new()));
        builder.add_analyzer("patterns", vec![name], Arc::new(PatternAnalyzer::new()));

        let err = builder.build().unwrap_err();
        assert!(matches!(err, JobBuildError::DuplicateAnalyzerIdentity { .. }));
    }

    #[test]
    fn job_without_analyzers_is_a_build_error() {
        let mut builder = JobGraphBuilder::new(name_schema());
        let name = builder.source_column("name").unwrap();
        builder.add_filter("null check", vec![name], Arc::new(NullCheckFilter));
        let err = builder.build().unwrap_err();
        assert!(matches!(err, JobBuildError::NoAnalyzers));
    }
}
