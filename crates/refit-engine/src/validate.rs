//! Post-generation checks: presence, parseability, target conformance and
//! logic preservation by re-analysis in the target dialect.

use crate::analyze::Analyzer;
use crate::config::{AnalyzerConfig, ValidationConfig};
use crate::dialect::{self, Dialect};
use crate::extract::{self, Extractor};
use crate::render::MARKER_TAG;
use crate::syntax::{self, SyntaxTree};
use refit_core::{
    ArtifactKind, CategoryComparison, ComponentModel, GeneratedArtifact, PatternCategory,
    PatternCounts, Severity, ValidationCheck, ValidationIssue, ValidationOutcome,
};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Scores generated artifacts against the original model.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    config: ValidationConfig,
    analyzer: AnalyzerConfig,
}

impl Validator {
    /// Create a validator with default analyzer settings.
    pub fn new(config: ValidationConfig) -> Self {
        Self {
            config,
            analyzer: AnalyzerConfig::default(),
        }
    }

    /// Use the same analyzer settings as the source pass.
    pub fn with_analyzer(mut self, analyzer: AnalyzerConfig) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// Validate `artifacts` generated for `original`.
    pub fn validate(
        &self,
        original: &ComponentModel,
        artifacts: &[GeneratedArtifact],
    ) -> ValidationOutcome {
        let mut issues = Issues::default();

        for kind in ArtifactKind::ALL {
            match artifacts.iter().find(|a| a.kind == kind) {
                None => issues.push(
                    ValidationCheck::ArtifactsPresent,
                    presence_severity(kind),
                    format!("{kind} artifact is missing"),
                ),
                Some(a) if a.content.trim().is_empty() => issues.push(
                    ValidationCheck::ArtifactsPresent,
                    presence_severity(kind),
                    format!("{kind} artifact {} is empty", a.path.display()),
                ),
                Some(_) => {}
            }
        }

        let mut comparisons = Vec::new();
        let primary = artifacts
            .iter()
            .find(|a| a.kind == ArtifactKind::PrimarySource && !a.content.trim().is_empty());
        if let Some(primary) = primary {
            match SyntaxTree::parse(&primary.content, &primary.path) {
                Ok(tree) => {
                    check_conformance(original, &tree, &mut issues);
                    comparisons = self.compare_logic(original, primary, &mut issues);
                }
                Err(e) => issues.push(
                    ValidationCheck::Parseable,
                    Severity::Critical,
                    format!("primary artifact does not parse: {e}"),
                ),
            }
        }

        let outcome = self.verdict(issues.0, comparisons);
        if outcome.valid {
            debug!(component = %original.id, score = outcome.score, "Validation passed");
        } else {
            warn!(
                component = %original.id,
                score = outcome.score,
                errors = outcome.errors.len(),
                "Validation failed"
            );
        }
        outcome
    }

    fn compare_logic(
        &self,
        original: &ComponentModel,
        primary: &GeneratedArtifact,
        issues: &mut Issues,
    ) -> Vec<CategoryComparison> {
        let source_counts = match &original.logic {
            Some(logic) => logic.counts(),
            None => match Analyzer::new(self.analyzer.clone(), Dialect::React).analyze(original) {
                Ok(logic) => logic.counts(),
                Err(e) => {
                    issues.push(
                        ValidationCheck::LogicPreservation,
                        Severity::High,
                        format!("original could not be re-analyzed: {e}"),
                    );
                    return Vec::new();
                }
            },
        };
        let target_counts = match target_counts(&self.analyzer, primary) {
            Ok(counts) => counts,
            Err(message) => {
                issues.push(ValidationCheck::LogicPreservation, Severity::High, message);
                return Vec::new();
            }
        };

        let mut comparisons = Vec::new();
        for category in PatternCategory::ALL {
            let comparison = CategoryComparison {
                category,
                original: source_counts.get(category),
                generated: target_counts.get(category),
            };
            if !comparison.matches() {
                let severity = if comparison.generated == 0 {
                    Severity::Critical
                } else if comparison.generated < comparison.original {
                    Severity::Medium
                } else {
                    Severity::Low
                };
                issues.0.push(ValidationIssue {
                    check: ValidationCheck::LogicPreservation,
                    severity,
                    message: format!(
                        "{category} count changed from {} to {}",
                        comparison.original, comparison.generated
                    ),
                    category: Some(category),
                });
            }
            comparisons.push(comparison);
        }
        comparisons
    }

    fn verdict(
        &self,
        issues: Vec<ValidationIssue>,
        comparisons: Vec<CategoryComparison>,
    ) -> ValidationOutcome {
        let penalty: u32 = issues.iter().map(|i| i.severity.penalty()).sum();
        let score = 100u32.saturating_sub(penalty) as u8;
        let lost_category = comparisons.iter().any(|c| c.original > 0 && c.generated == 0);

        let (errors, warnings): (Vec<_>, Vec<_>) =
            issues.into_iter().partition(|i| self.is_error(i.severity));
        let valid = errors.is_empty() && !lost_category && score >= self.config.min_score;
        ValidationOutcome {
            valid,
            score,
            errors,
            warnings,
            comparisons,
        }
    }

    fn is_error(&self, severity: Severity) -> bool {
        match severity {
            Severity::Critical | Severity::High => true,
            Severity::Medium => self.config.strict,
            Severity::Low => false,
        }
    }
}

fn presence_severity(kind: ArtifactKind) -> Severity {
    match kind {
        ArtifactKind::PrimarySource => Severity::Critical,
        ArtifactKind::Barrel | ArtifactKind::Documentation => Severity::High,
    }
}

fn target_counts(
    config: &AnalyzerConfig,
    primary: &GeneratedArtifact,
) -> Result<PatternCounts, String> {
    let parsed = Extractor::new(Dialect::Solid)
        .extract_parsed(&primary.content, &primary.path)
        .map_err(|e| format!("generated artifact could not be extracted: {e}"))?;
    let logic = Analyzer::new(config.clone(), Dialect::Solid)
        .analyze_tree(&parsed.model, &parsed.tree)
        .map_err(|e| format!("generated artifact could not be analyzed: {e}"))?;
    Ok(logic.counts())
}

#[derive(Default)]
struct Issues(Vec<ValidationIssue>);

impl Issues {
    fn push(&mut self, check: ValidationCheck, severity: Severity, message: impl Into<String>) {
        self.0.push(ValidationIssue {
            check,
            severity,
            message: message.into(),
            category: None,
        });
    }

    /// Record a conformance issue unless the same message is already present.
    fn once(&mut self, severity: Severity, message: String) {
        if !self.0.iter().any(|i| i.message == message) {
            self.push(ValidationCheck::TargetConformance, severity, message);
        }
    }
}

// =============================================================================
// Target conformance
// =============================================================================

fn check_conformance(original: &ComponentModel, tree: &SyntaxTree, issues: &mut Issues) {
    let src = tree.source();
    let nodes = syntax::descendants(tree.root());
    let declared = declared_names(src, &nodes);

    for node in &nodes {
        match node.kind() {
            "import_statement" => {
                let source = node
                    .child_by_field_name("source")
                    .and_then(|s| syntax::string_value(src, s))
                    .unwrap_or_default();
                if Dialect::React.framework_modules().contains(&source.as_str()) {
                    issues.once(Severity::Critical, format!("import from `{source}` remains"));
                }
            }
            "call_expression" => {
                let Some(callee) = syntax::callee_path(src, *node) else {
                    continue;
                };
                let bare = Dialect::React.normalize_callee(&callee);
                if dialect::REACT_ONLY_HOOKS.contains(&bare) {
                    issues.once(Severity::High, format!("React hook `{bare}` remains"));
                } else if callee == "this.setState" || callee == "this.forceUpdate" {
                    issues.once(Severity::High, format!("`{callee}` remains"));
                } else if syntax::is_setter_name(&callee) && !declared.contains(&callee) {
                    issues.once(
                        Severity::High,
                        format!("setter `{callee}` is called but never declared"),
                    );
                }
            }
            "member_expression" => {
                let path = syntax::dotted_path(src, *node).unwrap_or_default();
                if path == "this.state" || path == "this.props" {
                    issues.once(Severity::High, format!("`{path}` reference remains"));
                }
            }
            "jsx_attribute" => {
                let name = node.named_child(0).map(|n| syntax::text(src, n)).unwrap_or_default();
                if name == "className" || name == "htmlFor" {
                    issues.once(Severity::Medium, format!("React attribute `{name}` remains"));
                }
            }
            "nested_type_identifier" => {
                let text = syntax::text(src, *node);
                if text.starts_with("React.") {
                    issues.once(Severity::High, format!("React type `{text}` remains"));
                }
            }
            "type_identifier" => {
                let text = syntax::text(src, *node);
                let local = declared.contains(text);
                if dialect::REACT_ONLY_TYPES.contains(&text) && !local {
                    issues.once(Severity::Medium, format!("React type `{text}` remains"));
                }
            }
            _ => {}
        }
    }

    check_untracked_reads(tree, &nodes, issues);
    if original.kind.is_view() {
        check_props_interface(original, tree, issues);
    }

    let markers = src.matches(MARKER_TAG).count();
    if markers > 0 {
        issues.push(
            ValidationCheck::TargetConformance,
            Severity::Low,
            format!("{markers} review marker(s) remain in the output"),
        );
    }
}

/// Calls whose arguments are meant to be read once.
const READ_ONCE_CALLS: &[&str] = &[
    "createSignal",
    "createReducer",
    "createMemo",
    "createResource",
    "mergeProps",
    "splitProps",
    "children",
    "untrack",
];

/// Flag body-level constants of a component or hook that read a signal or a
/// prop outside any tracking scope. Such a value never updates.
fn check_untracked_reads(tree: &SyntaxTree, nodes: &[tree_sitter::Node<'_>], issues: &mut Issues) {
    let src = tree.source();
    let accessors = accessor_names(src, nodes);
    for function in nodes.iter().copied().filter(|n| syntax::is_function(*n)) {
        let Some(block) = syntax::function_body(function).filter(|b| b.kind() == "statement_block")
        else {
            continue;
        };
        let mut props: Vec<&str> = component_param(src, function).into_iter().collect();
        let statements = syntax::named_children(block);
        let owns_state = statements
            .iter()
            .flat_map(|s| syntax::named_children(*s))
            .any(|d| declared_accessor(src, d).is_some());
        if props.is_empty() && !owns_state {
            continue;
        }
        for statement in statements {
            if statement.kind() != "lexical_declaration" || !syntax::has_token(statement, "const") {
                continue;
            }
            for declarator in syntax::named_children(statement) {
                let (Some(name), Some(value)) = (
                    declarator.child_by_field_name("name"),
                    declarator.child_by_field_name("value"),
                ) else {
                    continue;
                };
                let callee = syntax::callee_path(src, value);
                if callee.as_deref() == Some("mergeProps") && name.kind() == "identifier" {
                    props.push(syntax::text(src, name));
                }
                let read_once = callee.is_some_and(|c| READ_ONCE_CALLS.contains(&c.as_str()));
                if syntax::is_function(value) || read_once {
                    continue;
                }
                if let Some(read) = untracked_read(src, value, &accessors, &props) {
                    issues.once(
                        Severity::High,
                        format!(
                            "`{}` reads `{read}` once, outside a tracking scope",
                            syntax::text(src, name)
                        ),
                    );
                }
            }
        }
    }
}

/// Accessor declared by a `createSignal`/`createReducer` pair or a `createMemo`.
fn declared_accessor<'s>(src: &'s str, declarator: tree_sitter::Node<'_>) -> Option<&'s str> {
    if declarator.kind() != "variable_declarator" {
        return None;
    }
    let name = declarator.child_by_field_name("name")?;
    let callee = syntax::callee_path(src, declarator.child_by_field_name("value")?)?;
    match (callee.as_str(), name.kind()) {
        ("createSignal" | "createReducer", "array_pattern") => name
            .named_child(0)
            .filter(|n| n.kind() == "identifier")
            .map(|n| syntax::text(src, n)),
        ("createMemo", "identifier") => Some(syntax::text(src, name)),
        _ => None,
    }
}

fn accessor_names<'s>(src: &'s str, nodes: &[tree_sitter::Node<'_>]) -> HashSet<&'s str> {
    nodes
        .iter()
        .filter_map(|n| declared_accessor(src, *n))
        .collect()
}

/// Props parameter of `const Name: Component<P> = (props) => ...`.
fn component_param<'s>(src: &'s str, function: tree_sitter::Node<'_>) -> Option<&'s str> {
    let declarator = function
        .parent()
        .filter(|p| p.kind() == "variable_declarator")?;
    let annotation = declarator.child_by_field_name("type")?;
    if !syntax::text(src, annotation).contains("Component") {
        return None;
    }
    let param = extract::first_parameter(function)?;
    let param = if param.kind() == "identifier" {
        param
    } else {
        param.child_by_field_name("pattern")?
    };
    (param.kind() == "identifier").then(|| syntax::text(src, param))
}

/// First accessor call or props member read outside a function or JSX expression.
fn untracked_read(
    src: &str,
    node: tree_sitter::Node<'_>,
    accessors: &HashSet<&str>,
    props: &[&str],
) -> Option<String> {
    let mut stack = vec![node];
    while let Some(n) = stack.pop() {
        if syntax::is_function(n) || n.kind() == "jsx_expression" {
            continue;
        }
        match n.kind() {
            "call_expression" => {
                let function = n.child_by_field_name("function");
                let bare = syntax::call_arguments(n).is_empty()
                    && function.is_some_and(|f| f.kind() == "identifier");
                if let Some(f) = function.filter(|_| bare) {
                    let name = syntax::text(src, f);
                    if accessors.contains(name) {
                        return Some(format!("{name}()"));
                    }
                }
            }
            "member_expression" => {
                let object = n.child_by_field_name("object");
                if object.is_some_and(|o| o.kind() == "identifier" && props.contains(&syntax::text(src, o))) {
                    return Some(syntax::text(src, n).to_string());
                }
            }
            _ => {}
        }
        stack.extend(syntax::named_children(n).into_iter().rev());
    }
    None
}

fn check_props_interface(original: &ComponentModel, tree: &SyntaxTree, issues: &mut Issues) {
    let src = tree.source();
    let name = original.props_type_name();
    let interface = syntax::descendants(tree.root()).into_iter().find(|n| {
        n.kind() == "interface_declaration"
            && n.child_by_field_name("name")
                .is_some_and(|id| syntax::text(src, id) == name)
    });
    let Some(body) = interface.and_then(|i| i.child_by_field_name("body")) else {
        issues.push(
            ValidationCheck::TargetConformance,
            Severity::Medium,
            format!("props interface `{name}` is missing"),
        );
        return;
    };
    let mut fields = HashSet::new();
    for member in syntax::named_children(body) {
        if member.kind() != "property_signature" {
            continue;
        }
        let field = member
            .child_by_field_name("name")
            .map(|n| syntax::text(src, n).to_string())
            .unwrap_or_default();
        match member.child_by_field_name("type") {
            None => issues.push(
                ValidationCheck::TargetConformance,
                Severity::Medium,
                format!("prop `{field}` has no type"),
            ),
            Some(t) if syntax::text(src, t).trim_start_matches(':').trim() == "any" => issues.push(
                ValidationCheck::TargetConformance,
                Severity::Low,
                format!("prop `{field}` is typed `any`"),
            ),
            Some(_) => {}
        }
        fields.insert(field);
    }
    for input in &original.inputs {
        if !fields.contains(&input.name) {
            issues.push(
                ValidationCheck::TargetConformance,
                Severity::Medium,
                format!("prop `{}` is missing from `{name}`", input.name),
            );
        }
    }
}

/// Names bound anywhere in the file: declarators, functions, parameters, imports.
fn declared_names(src: &str, nodes: &[tree_sitter::Node<'_>]) -> HashSet<String> {
    let mut out = HashSet::new();
    for node in nodes {
        let binder = match node.kind() {
            "variable_declarator" => node.child_by_field_name("name"),
            "function_declaration" | "class_declaration" | "interface_declaration"
            | "type_alias_declaration" => node.child_by_field_name("name"),
            "required_parameter" | "optional_parameter" => node.child_by_field_name("pattern"),
            "import_clause" => Some(*node),
            _ => None,
        };
        let Some(binder) = binder else {
            continue;
        };
        for n in std::iter::once(binder).chain(syntax::descendants(binder)) {
            if matches!(
                n.kind(),
                "identifier" | "type_identifier" | "shorthand_property_identifier_pattern"
            ) {
                out.insert(syntax::text(src, n).to_string());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::Generator;
    use crate::transform::Transformer;
    use std::path::Path;

    const SEARCH: &str = r#"
import { useState, useEffect } from 'react';

interface SearchProps {
  endpoint: string;
}

export default function Search({ endpoint }: SearchProps) {
  const [query, setQuery] = useState('');
  const [results, setResults] = useState<string[]>([]);

  useEffect(() => {
    fetch(`${endpoint}?q=${query}`)
      .then((r) => r.json())
      .then((data) => setResults(data.items));
  }, [endpoint, query]);

  return (
    <div>
      <input value={query} onInput={(e) => setQuery(e.currentTarget.value)} />
      <ul>{results.map((r) => <li>{r}</li>)}</ul>
    </div>
  );
}
"#;

    fn migrate(src: &str, path: &str) -> (ComponentModel, Vec<GeneratedArtifact>) {
        let parsed = Extractor::default()
            .extract_parsed(src, Path::new(path))
            .unwrap();
        let parsed = Analyzer::default().enrich(parsed).unwrap();
        let logic = parsed.model.logic.clone().unwrap();
        let t = Transformer::default()
            .transform(&parsed.model, &logic, &parsed.tree)
            .unwrap();
        let artifacts = Generator::new().generate(&t.model).unwrap();
        (parsed.model, artifacts)
    }

    #[test]
    fn test_migrated_component_is_valid() {
        let (model, artifacts) = migrate(SEARCH, "Search.tsx");
        let outcome = Validator::default().validate(&model, &artifacts);
        assert!(outcome.valid, "{outcome:#?}\n{}", artifacts[0].content);
        assert_eq!(outcome.score, 100);
        assert_eq!(outcome.comparisons.len(), 6);
        assert!(outcome.comparisons.iter().all(|c| c.matches()));
    }

    #[test]
    fn test_missing_artifacts_are_reported() {
        let (model, artifacts) = migrate(SEARCH, "Search.tsx");
        let outcome = Validator::default().validate(&model, &artifacts[..1]);
        assert!(!outcome.valid);
        assert_eq!(
            outcome
                .errors
                .iter()
                .filter(|e| e.check == ValidationCheck::ArtifactsPresent)
                .count(),
            2
        );
        assert_eq!(outcome.score, 60);
    }

    #[test]
    fn test_unparseable_primary_is_critical() {
        let (model, mut artifacts) = migrate(SEARCH, "Search.tsx");
        artifacts[0].content = "const Search = (props) => { return <div>; };".to_string();
        let outcome = Validator::default().validate(&model, &artifacts);
        assert!(!outcome.valid);
        assert_eq!(outcome.errors[0].check, ValidationCheck::Parseable);
        assert_eq!(outcome.errors[0].severity, Severity::Critical);
    }

    #[test]
    fn test_lost_logic_invalidates() {
        let (model, mut artifacts) = migrate(SEARCH, "Search.tsx");
        artifacts[0].content = r#"import type { Component } from "solid-js";
export interface SearchProps {
  endpoint: string;
}
const Search: Component<SearchProps> = (props) => {
  return <div>{props.endpoint}</div>;
};
export default Search;
"#
        .to_string();
        let outcome = Validator::default().validate(&model, &artifacts);
        assert!(!outcome.valid);
        let lost: Vec<PatternCategory> = outcome
            .errors
            .iter()
            .filter_map(|e| e.category)
            .collect();
        assert!(lost.contains(&PatternCategory::StateBinding));
        assert!(lost.contains(&PatternCategory::SideEffect));
        assert_eq!(outcome.score, 0);
    }

    #[test]
    fn test_react_leftovers_fail_conformance() {
        let (model, mut artifacts) = migrate(SEARCH, "Search.tsx");
        artifacts[0].content = artifacts[0]
            .content
            .replace("<div>", "<div className=\"search\">")
            .replace("createSignal(''", "useState(''");
        let outcome = Validator::default().validate(&model, &artifacts);
        let messages: Vec<&str> = outcome
            .errors
            .iter()
            .chain(&outcome.warnings)
            .map(|i| i.message.as_str())
            .collect();
        assert!(messages.contains(&"React attribute `className` remains"));
        assert!(messages.contains(&"React hook `useState` remains"));
        assert!(!outcome.valid);
    }

    #[test]
    fn test_read_outside_tracking_scope_fails_conformance() {
        let src = r#"
import { useState } from 'react';
export default function Cart() {
  const [count, setCount] = useState(1);
  const total = count * 2;
  return <button onClick={() => setCount(count + 1)}>{total}</button>;
}
"#;
        let (model, mut artifacts) = migrate(src, "Cart.tsx");
        assert!(artifacts[0]
            .content
            .contains("const total = createMemo(() => count() * 2);"));
        let outcome = Validator::default().validate(&model, &artifacts);
        assert!(outcome.valid, "{outcome:#?}\n{}", artifacts[0].content);

        artifacts[0].content = artifacts[0]
            .content
            .replace("createMemo(() => count() * 2)", "count() * 2");
        let outcome = Validator::default().validate(&model, &artifacts);
        assert!(!outcome.valid);
        assert!(outcome
            .errors
            .iter()
            .any(|e| e.message == "`total` reads `count()` once, outside a tracking scope"));
    }

    #[test]
    fn test_strict_mode_promotes_medium_issues() {
        let (model, mut artifacts) = migrate(SEARCH, "Search.tsx");
        artifacts[0].content = artifacts[0]
            .content
            .replace("<div>", "<div className=\"search\">");
        let lenient = Validator::default().validate(&model, &artifacts);
        assert!(lenient.valid);
        assert_eq!(lenient.score, 90);

        let strict = Validator::new(ValidationConfig {
            min_score: 70,
            strict: true,
        })
        .validate(&model, &artifacts);
        assert!(!strict.valid);
    }
}
