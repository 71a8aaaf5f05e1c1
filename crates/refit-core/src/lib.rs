//! Core domain types shared across the refit workspace.
//!
//! Every stage of the migration pipeline speaks in these types: the extractor
//! produces [`ComponentModel`]s, the analyzer attaches a
//! [`BusinessLogicModel`], the resolver builds a [`DependencyGraph`], and the
//! orchestrator records one [`MigrationResult`] per component.

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Component as PathComponent, Path, PathBuf};
use std::time::SystemTime;

// =============================================================================
// Component Identity
// =============================================================================

/// Stable identifier of a component: its source path relative to the source
/// root, without extension, joined with `/`.
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(pub String);

impl ComponentId {
    /// Create an identifier from a raw string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive the identifier from a path relative to the source root.
    pub fn from_relative_path(path: &Path) -> Self {
        let without_ext = path.with_extension("");
        let parts: Vec<String> = without_ext
            .components()
            .filter_map(|c| match c {
                PathComponent::Normal(part) => Some(part.to_string_lossy().to_string()),
                _ => None,
            })
            .collect();
        Self(parts.join("/"))
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ComponentId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Structural kind of a discovered component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentKind {
    /// Function component without local state.
    #[default]
    StatelessView,
    /// Function component holding state through hooks.
    StatefulView,
    /// `React.Component` / `PureComponent` subclass.
    ClassBasedView,
    /// Higher-order component: a function that returns a component.
    Composite,
    /// Module without markup (helpers, custom hooks).
    UtilityFunction,
}

impl ComponentKind {
    /// Display label.
    pub fn label(&self) -> &'static str {
        match self {
            ComponentKind::StatelessView => "stateless-view",
            ComponentKind::StatefulView => "stateful-view",
            ComponentKind::ClassBasedView => "class-based-view",
            ComponentKind::Composite => "composite",
            ComponentKind::UtilityFunction => "utility-function",
        }
    }

    /// Whether the kind renders markup through a component shell.
    pub fn is_view(&self) -> bool {
        matches!(
            self,
            ComponentKind::StatelessView | ComponentKind::StatefulView | ComponentKind::ClassBasedView
        )
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where a component was declared.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Path relative to the source root.
    pub path: PathBuf,
    /// 1-based line of the primary declaration.
    pub line: usize,
    /// 1-based column of the primary declaration.
    pub column: usize,
}

impl SourceLocation {
    /// Location pointing at the start of a file.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            line: 1,
            column: 1,
        }
    }
}

/// A declared input (prop) of a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputField {
    /// Prop name.
    pub name: String,
    /// Declared type, as written in the source (`string`, `() => void`, ...).
    pub type_tag: String,
    /// False when the declaration carries the optional marker.
    pub required: bool,
}

/// Classification of an imported binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyClass {
    /// Another component of the code base.
    Component,
    /// Third-party package.
    Library,
    /// Local non-component module.
    Utility,
}

/// One imported binding of a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRef {
    /// Local binding name.
    pub name: String,
    /// Module specifier as written in the import.
    pub source: String,
    /// Classification derived from specifier and binding shape.
    pub class: DependencyClass,
}

impl DependencyRef {
    /// Whether the specifier is relative to the importing file.
    pub fn is_relative(&self) -> bool {
        self.source.starts_with('.')
    }
}

/// Complexity tier derived from the analyzer score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComplexityTier {
    /// Few patterns, translated field for field.
    Simple,
    /// Several patterns, rewritten through the rule table.
    Moderate,
    /// Many patterns, rewritten with review markers.
    Complex,
    /// Too much logic for unattended migration.
    Critical,
}

impl ComplexityTier {
    /// Display label.
    pub fn label(&self) -> &'static str {
        match self {
            ComplexityTier::Simple => "simple",
            ComplexityTier::Moderate => "moderate",
            ComplexityTier::Complex => "complex",
            ComplexityTier::Critical => "critical",
        }
    }
}

impl fmt::Display for ComplexityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of extraction for a component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum ExtractionStatus {
    /// The source was parsed and modelled.
    #[default]
    Extracted,
    /// The source could not be modelled; the batch continues without it.
    Failed {
        /// Human readable reason.
        reason: String,
    },
}

/// One discovered unit of UI logic plus its structural declaration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentModel {
    /// Stable identifier.
    pub id: ComponentId,
    /// Name of the primary declaration.
    pub name: String,
    /// Structural kind.
    pub kind: ComponentKind,
    /// Declaration site.
    pub location: SourceLocation,
    /// Declared inputs, in declaration order.
    pub inputs: Vec<InputField>,
    /// Imported bindings, in import order.
    pub dependencies: Vec<DependencyRef>,
    /// Tier assigned by the analyzer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complexity: Option<ComplexityTier>,
    /// Behavioural model attached by the analyzer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logic: Option<BusinessLogicModel>,
    /// Extraction outcome.
    #[serde(default)]
    pub status: ExtractionStatus,
    /// Source text the model was extracted from.
    #[serde(default, skip_serializing)]
    pub source_text: String,
}

impl ComponentModel {
    /// A model stamped as failed, used to keep a broken file in the batch record.
    pub fn failed(id: ComponentId, location: SourceLocation, reason: impl Into<String>) -> Self {
        let name = id
            .as_str()
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        Self {
            id,
            name,
            location,
            status: ExtractionStatus::Failed {
                reason: reason.into(),
            },
            ..Default::default()
        }
    }

    /// Attach analyzer output, producing the enriched model.
    pub fn with_analysis(self, logic: BusinessLogicModel, tier: ComplexityTier) -> Self {
        Self {
            complexity: Some(tier),
            logic: Some(logic),
            ..self
        }
    }

    /// Whether extraction failed.
    pub fn is_failed(&self) -> bool {
        matches!(self.status, ExtractionStatus::Failed { .. })
    }

    /// Look up a declared input by name.
    pub fn input(&self, name: &str) -> Option<&InputField> {
        self.inputs.iter().find(|i| i.name == name)
    }

    /// Name of the typed props interface the target artifact declares.
    pub fn props_type_name(&self) -> String {
        format!("{}Props", self.name)
    }
}

// =============================================================================
// Business Logic Model
// =============================================================================

/// The six behavioural pattern categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatternCategory {
    /// Reactive value plus its setter.
    StateBinding,
    /// Effect block with triggers.
    SideEffect,
    /// Handler bound to a user interaction.
    EventHandler,
    /// map/filter/reduce/normalize over data.
    DataTransformation,
    /// Field check producing an error message.
    ValidationRule,
    /// Network request or registry use-case invocation.
    ExternalCall,
}

impl PatternCategory {
    /// All categories in reporting order.
    pub const ALL: [PatternCategory; 6] = [
        PatternCategory::StateBinding,
        PatternCategory::SideEffect,
        PatternCategory::EventHandler,
        PatternCategory::DataTransformation,
        PatternCategory::ValidationRule,
        PatternCategory::ExternalCall,
    ];

    /// Display label.
    pub fn label(&self) -> &'static str {
        match self {
            PatternCategory::StateBinding => "state binding",
            PatternCategory::SideEffect => "side effect",
            PatternCategory::EventHandler => "event handler",
            PatternCategory::DataTransformation => "data transformation",
            PatternCategory::ValidationRule => "validation rule",
            PatternCategory::ExternalCall => "external call",
        }
    }
}

impl fmt::Display for PatternCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How a pattern was recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectionMethod {
    /// Matched on node shape and callee resolution.
    Structural,
    /// Matched on naming conventions only.
    NameHeuristic,
}

/// Detection provenance with a confidence in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Recognition method.
    pub method: DetectionMethod,
    /// Confidence of the match.
    pub confidence: f32,
}

impl Detection {
    /// A structural match.
    pub fn structural() -> Self {
        Self {
            method: DetectionMethod::Structural,
            confidence: 1.0,
        }
    }

    /// A naming-convention match with the given confidence.
    pub fn heuristic(confidence: f32) -> Self {
        Self {
            method: DetectionMethod::NameHeuristic,
            confidence,
        }
    }

    /// Whether the match came from the fallback heuristics.
    pub fn is_heuristic(&self) -> bool {
        self.method == DetectionMethod::NameHeuristic
    }
}

/// A reactive value and its mutator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateBinding {
    /// Name of the current-value accessor.
    pub name: String,
    /// Underlying value type (declared or inferred).
    pub value_type: String,
    /// Mutator name (`setX`, `dispatch`, `setState`).
    pub mutator: String,
    /// Identifiers read by the initializer.
    pub dependencies: Vec<String>,
    /// Initializer expression as written.
    pub initial_value: String,
    /// Reducer expression when the binding is reducer-driven.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reducer: Option<String>,
    /// 1-based source line.
    pub line: usize,
}

/// An effect block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideEffect {
    /// Trigger expressions from the dependency list.
    pub dependencies: Vec<String>,
    /// Whether a dependency list was supplied at all.
    pub has_dependency_list: bool,
    /// Whether the effect registers cleanup.
    pub has_cleanup: bool,
    /// Whether the effect runs only on mount.
    pub mount_only: bool,
    /// 1-based source line.
    pub line: usize,
}

/// A handler bound to a user interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventHandler {
    /// Handler name (inline handlers get an ordinal name).
    pub name: String,
    /// Triggering interaction (`click`, `change`, ...).
    pub interaction: String,
    /// State mutators the handler calls.
    pub mutators: Vec<String>,
    /// Recognition provenance.
    pub detection: Detection,
    /// 1-based source line.
    pub line: usize,
}

/// Kind of data transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransformOp {
    /// `.map(...)`
    Map,
    /// `.filter(...)`
    Filter,
    /// `.reduce(...)`
    Reduce,
    /// `Object.entries/keys/values/fromEntries(...)`
    Normalize,
}

/// A data transformation site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTransformation {
    /// Operation kind.
    pub operation: TransformOp,
    /// Expression being transformed.
    pub subject: String,
    /// 1-based source line.
    pub line: usize,
}

/// Kind of validation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleKind {
    /// Presence check (`!value`).
    Required,
    /// Length comparison.
    Length,
    /// Regular expression test.
    Pattern,
    /// Numeric comparison.
    Range,
    /// Anything else guarding an error message.
    Custom,
}

/// A validation rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
    /// Field under validation.
    pub field: String,
    /// Rule kind.
    pub rule: RuleKind,
    /// Error message reported on failure.
    pub message: String,
    /// 1-based source line.
    pub line: usize,
}

/// A call leaving the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalCall {
    /// URL expression or use-case name.
    pub target: String,
    /// HTTP method or use-case entry point.
    pub method: String,
    /// Callee as written.
    pub callee: String,
    /// Whether a success continuation was detected.
    pub has_success_branch: bool,
    /// Whether an error continuation was detected.
    pub has_error_branch: bool,
    /// Recognition provenance.
    pub detection: Detection,
    /// 1-based source line.
    pub line: usize,
}

/// Pattern counts per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternCounts {
    /// State bindings.
    pub state_bindings: usize,
    /// Side effects.
    pub side_effects: usize,
    /// Event handlers.
    pub event_handlers: usize,
    /// Data transformations.
    pub data_transformations: usize,
    /// Validation rules.
    pub validation_rules: usize,
    /// External calls.
    pub external_calls: usize,
}

impl PatternCounts {
    /// Count for one category.
    pub fn get(&self, category: PatternCategory) -> usize {
        match category {
            PatternCategory::StateBinding => self.state_bindings,
            PatternCategory::SideEffect => self.side_effects,
            PatternCategory::EventHandler => self.event_handlers,
            PatternCategory::DataTransformation => self.data_transformations,
            PatternCategory::ValidationRule => self.validation_rules,
            PatternCategory::ExternalCall => self.external_calls,
        }
    }

    /// Sum over all categories.
    pub fn total(&self) -> usize {
        PatternCategory::ALL.iter().map(|c| self.get(*c)).sum()
    }
}

/// Behavioural model of one component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusinessLogicModel {
    /// State bindings in source order.
    pub state_bindings: Vec<StateBinding>,
    /// Side effects in source order.
    pub side_effects: Vec<SideEffect>,
    /// Event handlers in order of first binding.
    pub event_handlers: Vec<EventHandler>,
    /// Data transformations in source order.
    pub data_transformations: Vec<DataTransformation>,
    /// Validation rules in source order.
    pub validation_rules: Vec<ValidationRule>,
    /// External calls in source order.
    pub external_calls: Vec<ExternalCall>,
    /// Weighted complexity score.
    pub complexity_score: u32,
}

impl BusinessLogicModel {
    /// Pattern counts per category.
    pub fn counts(&self) -> PatternCounts {
        PatternCounts {
            state_bindings: self.state_bindings.len(),
            side_effects: self.side_effects.len(),
            event_handlers: self.event_handlers.len(),
            data_transformations: self.data_transformations.len(),
            validation_rules: self.validation_rules.len(),
            external_calls: self.external_calls.len(),
        }
    }

    /// Categories with at least one pattern.
    pub fn present_categories(&self) -> Vec<PatternCategory> {
        let counts = self.counts();
        PatternCategory::ALL
            .into_iter()
            .filter(|c| counts.get(*c) > 0)
            .collect()
    }

    /// Whether no pattern was recognized.
    pub fn is_empty(&self) -> bool {
        self.counts().total() == 0
    }

    /// Find a state binding by its mutator name.
    pub fn binding_for_mutator(&self, mutator: &str) -> Option<&StateBinding> {
        self.state_bindings.iter().find(|b| b.mutator == mutator)
    }
}

// =============================================================================
// Dependency Graph
// =============================================================================

/// Kind of dependency between two components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeKind {
    /// The consumer renders or wraps the provider component.
    ComponentReference,
    /// The consumer imports a shared utility module.
    SharedUtility,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::ComponentReference => write!(f, "component-reference"),
            EdgeKind::SharedUtility => write!(f, "shared-utility"),
        }
    }
}

/// Directed dependency: `from` must be migrated before `to`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// The used component (provider).
    pub from: ComponentId,
    /// The using component (consumer).
    pub to: ComponentId,
    /// Relationship kind.
    pub kind: EdgeKind,
}

/// Directed graph over discovered components.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependencyGraph {
    /// Components, sorted by id.
    pub nodes: Vec<ComponentId>,
    /// Provider to consumer edges.
    pub edges: Vec<DependencyEdge>,
}

impl DependencyGraph {
    /// Number of components.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Components the given component uses.
    pub fn providers_of<'a>(&'a self, id: &'a ComponentId) -> impl Iterator<Item = &'a ComponentId> {
        self.edges.iter().filter(move |e| &e.to == id).map(|e| &e.from)
    }

    /// Components using the given component.
    pub fn consumers_of<'a>(&'a self, id: &'a ComponentId) -> impl Iterator<Item = &'a ComponentId> {
        self.edges.iter().filter(move |e| &e.from == id).map(|e| &e.to)
    }

    /// Convert to a petgraph `StableDiGraph`.
    /// Returns the graph and a mapping from ComponentId to NodeIndex.
    pub fn to_petgraph(
        &self,
    ) -> (
        StableDiGraph<ComponentId, EdgeKind>,
        HashMap<ComponentId, NodeIndex>,
    ) {
        let mut graph = StableDiGraph::new();
        let mut id_to_index = HashMap::new();

        for node in &self.nodes {
            let idx = graph.add_node(node.clone());
            id_to_index.insert(node.clone(), idx);
        }

        for edge in &self.edges {
            if let (Some(&from_idx), Some(&to_idx)) =
                (id_to_index.get(&edge.from), id_to_index.get(&edge.to))
            {
                graph.add_edge(from_idx, to_idx, edge.kind);
            }
        }

        (graph, id_to_index)
    }
}

// =============================================================================
// Transformation
// =============================================================================

/// Complexity-driven transformation approach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Field-for-field copy with target syntax.
    DirectTranslation,
    /// Every pattern rewritten through the rule table.
    PatternMapping,
    /// Pattern mapping plus review markers on ambiguous constructs.
    HybridApproach,
    /// Best-effort output that must not be auto-approved.
    ManualReviewRequired,
}

impl Strategy {
    /// Strategy selection is a pure function of the tier.
    pub fn for_tier(tier: ComplexityTier) -> Self {
        match tier {
            ComplexityTier::Simple => Strategy::DirectTranslation,
            ComplexityTier::Moderate => Strategy::PatternMapping,
            ComplexityTier::Complex => Strategy::HybridApproach,
            ComplexityTier::Critical => Strategy::ManualReviewRequired,
        }
    }

    /// Whether ambiguous constructs get review markers.
    pub fn marks_ambiguity(&self) -> bool {
        matches!(
            self,
            Strategy::HybridApproach | Strategy::ManualReviewRequired
        )
    }

    /// Whether the result must be reviewed by a person.
    pub fn requires_review(&self) -> bool {
        *self == Strategy::ManualReviewRequired
    }

    /// Display label.
    pub fn label(&self) -> &'static str {
        match self {
            Strategy::DirectTranslation => "direct-translation",
            Strategy::PatternMapping => "pattern-mapping",
            Strategy::HybridApproach => "hybrid-approach",
            Strategy::ManualReviewRequired => "manual-review-required",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Category of an individual rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransformationKind {
    /// Declared input.
    Prop,
    /// State binding.
    State,
    /// Event handler.
    Handler,
    /// Side effect.
    Effect,
    /// Validation rule.
    Validation,
    /// Component shell, imports.
    Structural,
    /// External call.
    Api,
}

/// One individual rewrite, append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformationRecord {
    /// Rewrite category.
    pub kind: TransformationKind,
    /// What the source had.
    pub source: String,
    /// What the target gets.
    pub target: String,
    /// Rule applied or caveat.
    pub note: String,
}

impl TransformationRecord {
    /// Create a record.
    pub fn new(
        kind: TransformationKind,
        source: impl Into<String>,
        target: impl Into<String>,
        note: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            source: source.into(),
            target: target.into(),
            note: note.into(),
        }
    }
}

// =============================================================================
// Generated Artifacts
// =============================================================================

/// Role of a generated file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    /// The migrated component source.
    PrimarySource,
    /// `index.ts` re-exporting the primary.
    Barrel,
    /// README with inputs, usage, migration notes.
    Documentation,
}

impl ArtifactKind {
    /// Every kind a complete artifact set holds.
    pub const ALL: [ArtifactKind; 3] = [
        ArtifactKind::PrimarySource,
        ArtifactKind::Barrel,
        ArtifactKind::Documentation,
    ];

    /// Display label.
    pub fn label(&self) -> &'static str {
        match self {
            ArtifactKind::PrimarySource => "primary-source",
            ArtifactKind::Barrel => "barrel",
            ArtifactKind::Documentation => "documentation",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A generated file awaiting persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    /// Path relative to the output root.
    pub path: PathBuf,
    /// File content.
    pub content: String,
    /// Content size in bytes.
    pub size: u64,
    /// Role of the file.
    pub kind: ArtifactKind,
    /// Generation timestamp.
    pub generated_at: SystemTime,
}

impl GeneratedArtifact {
    /// Create an artifact stamped with the current time.
    pub fn new(path: impl Into<PathBuf>, content: String, kind: ArtifactKind) -> Self {
        Self {
            path: path.into(),
            size: content.len() as u64,
            content,
            kind,
            generated_at: SystemTime::now(),
        }
    }

    /// Descriptor kept in results once the content is persisted.
    pub fn descriptor(&self) -> ArtifactDescriptor {
        ArtifactDescriptor {
            path: self.path.clone(),
            kind: self.kind,
            size: self.size,
        }
    }
}

/// Lightweight reference to a persisted artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    /// Path relative to the output root.
    pub path: PathBuf,
    /// Role of the file.
    pub kind: ArtifactKind,
    /// Size in bytes.
    pub size: u64,
}

// =============================================================================
// Validation
// =============================================================================

/// Severity of a validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational.
    Low,
    /// Degrades the result.
    Medium,
    /// Breaks a contract.
    High,
    /// Business logic lost.
    Critical,
}

impl Severity {
    /// Score deduction for one issue.
    pub fn penalty(&self) -> u32 {
        match self {
            Severity::Low => 5,
            Severity::Medium => 10,
            Severity::High => 20,
            Severity::Critical => 40,
        }
    }
}

/// The validator check an issue came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationCheck {
    /// All artifacts present.
    ArtifactsPresent,
    /// Primary artifact parses.
    Parseable,
    /// Primary artifact follows target dialect rules.
    TargetConformance,
    /// Pattern counts preserved.
    LogicPreservation,
}

/// One finding of the validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Originating check.
    pub check: ValidationCheck,
    /// Severity.
    pub severity: Severity,
    /// Description.
    pub message: String,
    /// Pattern category concerned, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<PatternCategory>,
}

/// Original versus generated pattern count for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryComparison {
    /// Category compared.
    pub category: PatternCategory,
    /// Count in the original model.
    pub original: usize,
    /// Count recognized in the generated artifact.
    pub generated: usize,
}

impl CategoryComparison {
    /// Whether the counts agree.
    pub fn matches(&self) -> bool {
        self.original == self.generated
    }
}

/// Verdict of the validator. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    /// Pass/fail verdict.
    pub valid: bool,
    /// Equivalence score in `[0, 100]`.
    pub score: u8,
    /// Issues that affect the verdict.
    pub errors: Vec<ValidationIssue>,
    /// Issues that do not.
    pub warnings: Vec<ValidationIssue>,
    /// Per-category comparison.
    pub comparisons: Vec<CategoryComparison>,
}

// =============================================================================
// Migration Results
// =============================================================================

/// Final status of one component in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MigrationStatus {
    /// Artifacts written and validated.
    Migrated,
    /// Artifacts written but flagged for manual review.
    NeedsReview,
    /// Nothing was written.
    Failed,
}

/// Wall-clock spent per stage, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTimings {
    /// Reading the source file.
    pub read_ms: u64,
    /// Extraction plus analysis.
    pub analyze_ms: u64,
    /// Transformation.
    pub transform_ms: u64,
    /// Generation.
    pub generate_ms: u64,
    /// Validation.
    pub validate_ms: u64,
    /// Atomic write.
    pub write_ms: u64,
    /// End to end.
    pub total_ms: u64,
}

/// Record of one component in one orchestrator pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationResult {
    /// Component migrated.
    pub component: ComponentId,
    /// Display name.
    pub name: String,
    /// Final status.
    pub status: MigrationStatus,
    /// A person has to finish this component: the strategy asked for review,
    /// or the transformer gave up on it.
    #[serde(default)]
    pub manual_review: bool,
    /// Strategy applied, when the transformer ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<Strategy>,
    /// Individual rewrites.
    pub records: Vec<TransformationRecord>,
    /// Artifacts persisted.
    pub artifacts: Vec<ArtifactDescriptor>,
    /// Validator verdict, when the validator ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationOutcome>,
    /// Stage timings.
    pub timings: StageTimings,
    /// Attempts spent on the component (retries included).
    pub attempts: u32,
    /// Errors encountered.
    pub errors: Vec<String>,
}

impl MigrationResult {
    /// A failed result carrying a single error.
    pub fn failure(component: ComponentId, name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            component,
            name: name.into(),
            status: MigrationStatus::Failed,
            manual_review: false,
            strategy: None,
            records: Vec::new(),
            artifacts: Vec::new(),
            validation: None,
            timings: StageTimings::default(),
            attempts: 1,
            errors: vec![error.into()],
        }
    }

    /// Whether artifacts were written without a review flag.
    pub fn success(&self) -> bool {
        self.status == MigrationStatus::Migrated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_id_from_relative_path() {
        let id = ComponentId::from_relative_path(Path::new("components/user/UserCard.tsx"));
        assert_eq!(id.as_str(), "components/user/UserCard");

        let id = ComponentId::from_relative_path(Path::new("./Button.jsx"));
        assert_eq!(id.as_str(), "Button");
    }

    #[test]
    fn test_strategy_for_tier() {
        assert_eq!(Strategy::for_tier(ComplexityTier::Simple), Strategy::DirectTranslation);
        assert_eq!(Strategy::for_tier(ComplexityTier::Moderate), Strategy::PatternMapping);
        assert_eq!(Strategy::for_tier(ComplexityTier::Complex), Strategy::HybridApproach);
        assert!(Strategy::for_tier(ComplexityTier::Critical).requires_review());
    }

    #[test]
    fn test_failed_model_keeps_name() {
        let model = ComponentModel::failed(
            ComponentId::new("forms/LoginForm"),
            SourceLocation::file("forms/LoginForm.tsx"),
            "parse failure",
        );
        assert!(model.is_failed());
        assert_eq!(model.name, "LoginForm");
        assert!(model.logic.is_none());
    }

    #[test]
    fn test_pattern_counts() {
        let logic = BusinessLogicModel {
            data_transformations: vec![DataTransformation {
                operation: TransformOp::Map,
                subject: "items".into(),
                line: 3,
            }],
            ..Default::default()
        };
        let counts = logic.counts();
        assert_eq!(counts.get(PatternCategory::DataTransformation), 1);
        assert_eq!(counts.total(), 1);
        assert_eq!(logic.present_categories(), vec![PatternCategory::DataTransformation]);
    }

    #[test]
    fn test_dependency_graph_to_petgraph() {
        let graph = DependencyGraph {
            nodes: vec![ComponentId::new("A"), ComponentId::new("B")],
            edges: vec![DependencyEdge {
                from: ComponentId::new("B"),
                to: ComponentId::new("A"),
                kind: EdgeKind::ComponentReference,
            }],
        };
        let (pg, index) = graph.to_petgraph();
        assert_eq!(pg.node_count(), 2);
        assert_eq!(pg.edge_count(), 1);
        assert!(pg.contains_edge(index[&ComponentId::new("B")], index[&ComponentId::new("A")]));
        let b = ComponentId::new("B");
        assert_eq!(graph.consumers_of(&b).count(), 1);
    }
}
