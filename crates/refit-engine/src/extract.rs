//! Source model extraction: primary declaration, kind, inputs, imports.

use crate::dialect::Dialect;
use crate::error::{EngineResult, MigrationError};
use crate::syntax::{self, SyntaxTree};
use refit_core::{
    ComponentId, ComponentKind, ComponentModel, DependencyClass, DependencyRef, ExtractionStatus,
    InputField, SourceLocation,
};
use std::path::Path;
use tracing::debug;
use tree_sitter::Node;

/// A model together with the tree it was extracted from.
#[derive(Debug, Clone)]
pub struct ParsedComponent {
    pub model: ComponentModel,
    pub tree: SyntaxTree,
}

/// Shape of the primary declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclShape {
    Function,
    Class,
}

/// The declaration a component file is about.
#[derive(Debug, Clone)]
pub struct Primary<'t> {
    /// Declared (or derived) name.
    pub name: String,
    /// The function or class node.
    pub node: Node<'t>,
    /// Function or class.
    pub shape: DeclShape,
    /// Top-level statements that exist only to declare or export the primary.
    pub statements: Vec<Node<'t>>,
    /// Declarator carrying a `const X: T = ...` annotation, if any.
    pub declarator: Option<Node<'t>>,
    /// Wrapper applied in the default export (`memo`, `withRouter`, ...).
    pub export_wrapper: Option<String>,
}

struct Candidate<'t> {
    name: String,
    node: Node<'t>,
    shape: DeclShape,
    statement: Node<'t>,
    declarator: Option<Node<'t>>,
}

/// Builds [`ComponentModel`]s from source text.
#[derive(Debug, Clone, Copy)]
pub struct Extractor {
    dialect: Dialect,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(Dialect::React)
    }
}

impl Extractor {
    /// Create an extractor for a dialect.
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// Extract a model from source text. `source_path` is relative to the source root.
    pub fn extract(&self, source: &str, source_path: &Path) -> EngineResult<ComponentModel> {
        Ok(self.extract_parsed(source, source_path)?.model)
    }

    /// Extract a model and keep the parsed tree for later stages.
    pub fn extract_parsed(&self, source: &str, source_path: &Path) -> EngineResult<ParsedComponent> {
        let tree = SyntaxTree::parse(source, source_path)?;
        let model = self.model_from_tree(&tree, source_path);
        debug!(
            component = %model.id,
            kind = %model.kind,
            inputs = model.inputs.len(),
            dependencies = model.dependencies.len(),
            "Extracted component"
        );
        Ok(ParsedComponent { model, tree })
    }

    /// Read `root/relative` and extract it.
    pub fn read_and_extract(&self, root: &Path, relative: &Path) -> EngineResult<ParsedComponent> {
        let full = root.join(relative);
        let source = std::fs::read_to_string(&full).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => MigrationError::FileNotFound { path: full.clone() },
            _ => MigrationError::Io(e),
        })?;
        self.extract_parsed(&source, relative)
    }

    /// Model standing in for a file that could not be extracted.
    ///
    /// Parse failures keep the position of the first syntax error.
    pub fn failed_model(source_path: &Path, err: &MigrationError) -> ComponentModel {
        let location = match err {
            MigrationError::ParseFailure { line, column, .. } => SourceLocation {
                path: source_path.to_path_buf(),
                line: *line,
                column: *column,
            },
            _ => SourceLocation::file(source_path),
        };
        let model = ComponentModel::failed(
            ComponentId::from_relative_path(source_path),
            location,
            err.to_string(),
        );
        debug!(component = %model.id, error = %err, "Extraction failed");
        model
    }

    fn model_from_tree(&self, tree: &SyntaxTree, source_path: &Path) -> ComponentModel {
        let id = ComponentId::from_relative_path(source_path);
        let src = tree.source();
        let primary = locate_primary(tree);

        let (name, kind, location) = match &primary {
            Some(p) => {
                let pos = p.node.start_position();
                (
                    p.name.clone(),
                    self.classify(src, p),
                    SourceLocation {
                        path: source_path.to_path_buf(),
                        line: pos.row + 1,
                        column: pos.column + 1,
                    },
                )
            }
            None => (
                file_stem(source_path),
                ComponentKind::UtilityFunction,
                SourceLocation::file(source_path),
            ),
        };

        let inputs = primary
            .as_ref()
            .map(|p| declared_inputs(tree, p))
            .unwrap_or_default();

        ComponentModel {
            id,
            name,
            kind,
            location,
            inputs,
            dependencies: imports(tree),
            complexity: None,
            logic: None,
            status: ExtractionStatus::Extracted,
            source_text: src.to_string(),
        }
    }

    fn classify(&self, src: &str, primary: &Primary<'_>) -> ComponentKind {
        if primary.shape == DeclShape::Class {
            return ComponentKind::ClassBasedView;
        }
        if returns_function(primary.node) {
            return ComponentKind::Composite;
        }
        if !syntax::contains_jsx(primary.node) {
            return ComponentKind::UtilityFunction;
        }
        let stateful = syntax::descendants(primary.node).into_iter().any(|n| {
            n.kind() == "call_expression"
                && syntax::callee_path(src, n)
                    .map(|c| self.dialect.is_state_call(&c))
                    .unwrap_or(false)
        });
        if stateful {
            ComponentKind::StatefulView
        } else {
            ComponentKind::StatelessView
        }
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

// =============================================================================
// Primary declaration
// =============================================================================

/// Find the primary declaration of a file.
///
/// Preference: the default export, then the first class component, then the
/// first capitalized function rendering markup, then the first function.
pub fn locate_primary(tree: &SyntaxTree) -> Option<Primary<'_>> {
    let src = tree.source();
    let mut candidates: Vec<Candidate<'_>> = Vec::new();
    let mut default_export: Option<(Node<'_>, Option<String>, Option<Node<'_>>)> = None;

    for item in syntax::named_children(tree.root()) {
        match item.kind() {
            "export_statement" => {
                let is_default = syntax::has_token(item, "default");
                if let Some(decl) = item.child_by_field_name("declaration") {
                    let before = candidates.len();
                    collect_candidates(src, decl, item, &mut candidates);
                    if is_default && candidates.len() > before {
                        default_export = Some((item, Some(candidates[before].name.clone()), None));
                    }
                } else if let Some(value) = item.child_by_field_name("value") {
                    if is_default {
                        match value.kind() {
                            "identifier" => {
                                default_export =
                                    Some((item, Some(syntax::text(src, value).to_string()), None));
                            }
                            "call_expression" => {
                                let target = syntax::call_arguments(value)
                                    .into_iter()
                                    .find(|a| a.kind() == "identifier")
                                    .map(|a| syntax::text(src, a).to_string());
                                default_export = Some((item, target, Some(value)));
                            }
                            _ if syntax::is_function(value) || value.kind() == "class" => {
                                let shape = if value.kind() == "class" {
                                    DeclShape::Class
                                } else {
                                    DeclShape::Function
                                };
                                let name = value
                                    .child_by_field_name("name")
                                    .map(|n| syntax::text(src, n).to_string())
                                    .unwrap_or_else(|| file_stem(tree.path()));
                                candidates.push(Candidate {
                                    name: name.clone(),
                                    node: value,
                                    shape,
                                    statement: item,
                                    declarator: None,
                                });
                                default_export = Some((item, Some(name), None));
                            }
                            _ => {}
                        }
                    }
                }
            }
            _ => collect_candidates(src, item, item, &mut candidates),
        }
    }

    let from_default = default_export.as_ref().and_then(|(_, name, _)| {
        let name = name.as_ref()?;
        candidates.iter().position(|c| &c.name == name)
    });
    let chosen = from_default
        .or_else(|| {
            candidates
                .iter()
                .position(|c| c.shape == DeclShape::Class && extends_component(src, c.node))
        })
        .or_else(|| {
            candidates.iter().position(|c| {
                c.shape == DeclShape::Function
                    && syntax::is_capitalized(&c.name)
                    && syntax::contains_jsx(c.node)
            })
        })
        .or_else(|| candidates.iter().position(|c| c.shape == DeclShape::Function))?;

    let candidate = candidates.swap_remove(chosen);
    let mut statements = vec![candidate.statement];
    let mut export_wrapper = None;
    if let Some((stmt, name, wrapper)) = default_export {
        if name.as_deref() == Some(candidate.name.as_str()) && stmt.id() != candidate.statement.id()
        {
            statements.push(stmt);
        }
        if let Some(call) = wrapper {
            export_wrapper = syntax::callee_path(src, call);
        }
    }
    statements.extend(static_assignments(src, tree.root(), &candidate.name));

    Some(Primary {
        name: candidate.name,
        node: candidate.node,
        shape: candidate.shape,
        statements,
        declarator: candidate.declarator,
        export_wrapper,
    })
}

fn collect_candidates<'t>(
    src: &str,
    decl: Node<'t>,
    statement: Node<'t>,
    out: &mut Vec<Candidate<'t>>,
) {
    match decl.kind() {
        "function_declaration" | "generator_function_declaration" => {
            if let Some(name) = decl.child_by_field_name("name") {
                out.push(Candidate {
                    name: syntax::text(src, name).to_string(),
                    node: decl,
                    shape: DeclShape::Function,
                    statement,
                    declarator: None,
                });
            }
        }
        "class_declaration" | "abstract_class_declaration" => {
            if let Some(name) = decl.child_by_field_name("name") {
                out.push(Candidate {
                    name: syntax::text(src, name).to_string(),
                    node: decl,
                    shape: DeclShape::Class,
                    statement,
                    declarator: None,
                });
            }
        }
        "lexical_declaration" | "variable_declaration" => {
            for declarator in syntax::named_children(decl) {
                if declarator.kind() != "variable_declarator" {
                    continue;
                }
                let (Some(name), Some(value)) = (
                    declarator.child_by_field_name("name"),
                    declarator.child_by_field_name("value"),
                ) else {
                    continue;
                };
                if name.kind() != "identifier" {
                    continue;
                }
                if let Some(function) = unwrap_function(src, value) {
                    out.push(Candidate {
                        name: syntax::text(src, name).to_string(),
                        node: function,
                        shape: if function.kind() == "class" {
                            DeclShape::Class
                        } else {
                            DeclShape::Function
                        },
                        statement,
                        declarator: Some(declarator),
                    });
                }
            }
        }
        _ => {}
    }
}

/// Unwrap `memo(fn)` / `forwardRef(fn)` / plain function values.
fn unwrap_function<'t>(src: &str, value: Node<'t>) -> Option<Node<'t>> {
    if syntax::is_function(value) || value.kind() == "class" {
        return Some(value);
    }
    if value.kind() == "call_expression" {
        let callee = syntax::callee_path(src, value)?;
        let bare = callee.strip_prefix("React.").unwrap_or(&callee);
        if matches!(bare, "memo" | "forwardRef") {
            return syntax::call_arguments(value)
                .into_iter()
                .find(|a| syntax::is_function(*a));
        }
    }
    None
}

/// `Name.defaultProps = ...` and `Name.propTypes = ...` statements.
fn static_assignments<'t>(src: &str, root: Node<'t>, name: &str) -> Vec<Node<'t>> {
    syntax::named_children(root)
        .into_iter()
        .filter(|stmt| {
            stmt.kind() == "expression_statement"
                && stmt
                    .named_child(0)
                    .filter(|e| e.kind() == "assignment_expression")
                    .and_then(|e| e.child_by_field_name("left"))
                    .and_then(|l| syntax::dotted_path(src, l))
                    .is_some_and(|p| {
                        p == format!("{name}.defaultProps")
                            || p == format!("{name}.propTypes")
                            || p == format!("{name}.displayName")
                    })
        })
        .collect()
}

/// Whether a class extends `Component`/`PureComponent`.
pub fn extends_component(src: &str, class: Node<'_>) -> bool {
    superclass(src, class)
        .map(|s| {
            let bare = s.strip_prefix("React.").unwrap_or(&s);
            bare == "Component" || bare == "PureComponent"
        })
        .unwrap_or(false)
}

fn superclass(src: &str, class: Node<'_>) -> Option<String> {
    let heritage = syntax::named_children(class)
        .into_iter()
        .find(|c| c.kind() == "class_heritage")?;
    let extends = syntax::named_children(heritage)
        .into_iter()
        .find(|c| c.kind() == "extends_clause")?;
    let value = extends
        .child_by_field_name("value")
        .or_else(|| extends.named_child(0))?;
    syntax::dotted_path(src, value)
}

/// Type arguments of `extends Component<P, S>`.
pub fn class_type_arguments<'t>(class: Node<'t>) -> Vec<Node<'t>> {
    syntax::named_children(class)
        .into_iter()
        .find(|c| c.kind() == "class_heritage")
        .and_then(|h| {
            syntax::named_children(h)
                .into_iter()
                .find(|c| c.kind() == "extends_clause")
        })
        .and_then(|e| {
            e.child_by_field_name("type_arguments").or_else(|| {
                syntax::named_children(e)
                    .into_iter()
                    .find(|c| c.kind() == "type_arguments")
            })
        })
        .map(syntax::named_children)
        .unwrap_or_default()
}

fn returns_function(function: Node<'_>) -> bool {
    let Some(body) = function.child_by_field_name("body") else {
        return false;
    };
    if body.kind() != "statement_block" {
        return syntax::is_function(body) || body.kind() == "class";
    }
    syntax::named_children(body).into_iter().any(|stmt| {
        stmt.kind() == "return_statement"
            && stmt
                .named_child(0)
                .map(|v| {
                    let v = if v.kind() == "parenthesized_expression" {
                        v.named_child(0).unwrap_or(v)
                    } else {
                        v
                    };
                    syntax::is_function(v) || v.kind() == "class"
                })
                .unwrap_or(false)
    })
}

/// A member of a class body.
#[derive(Debug, Clone, Copy)]
pub struct ClassMember<'t> {
    /// The `method_definition` or field node.
    pub node: Node<'t>,
    /// Function implementing the member, if it is callable.
    pub function: Option<Node<'t>>,
    /// Field initializer, if the member is a field.
    pub value: Option<Node<'t>>,
    /// Whether the member is `static`.
    pub is_static: bool,
}

/// Named members of a class body, in source order.
pub fn class_members<'t>(src: &str, class: Node<'t>) -> Vec<(String, ClassMember<'t>)> {
    let Some(body) = class.child_by_field_name("body") else {
        return Vec::new();
    };
    syntax::named_children(body)
        .into_iter()
        .filter_map(|member| {
            let name = member.child_by_field_name("name")?;
            let name = syntax::text(src, name).to_string();
            let is_static = syntax::has_token(member, "static");
            match member.kind() {
                "method_definition" => Some((
                    name,
                    ClassMember {
                        node: member,
                        function: Some(member),
                        value: None,
                        is_static,
                    },
                )),
                "public_field_definition" | "field_definition" => {
                    let value = member.child_by_field_name("value");
                    Some((
                        name,
                        ClassMember {
                            node: member,
                            function: value.filter(|v| syntax::is_function(*v)),
                            value,
                            is_static,
                        },
                    ))
                }
                _ => None,
            }
        })
        .collect()
}

/// Class components declared anywhere in the tree.
pub fn component_classes<'t>(src: &str, root: Node<'t>) -> Vec<Node<'t>> {
    syntax::descendants(root)
        .into_iter()
        .filter(|n| {
            matches!(n.kind(), "class_declaration" | "class" | "abstract_class_declaration")
                && extends_component(src, *n)
        })
        .collect()
}

// =============================================================================
// Declared inputs
// =============================================================================

/// The type node describing a primary's props, if annotated.
pub fn props_type_node<'t>(primary: &Primary<'t>) -> Option<Node<'t>> {
    match primary.shape {
        DeclShape::Class => class_type_arguments(primary.node).into_iter().next(),
        DeclShape::Function => {
            let from_param = first_parameter(primary.node)
                .and_then(|p| p.child_by_field_name("type"))
                .and_then(|t| t.named_child(0));
            from_param.or_else(|| {
                let annotation = primary.declarator?.child_by_field_name("type")?;
                let generic = annotation.named_child(0)?;
                if generic.kind() != "generic_type" {
                    return None;
                }
                let args = generic.child_by_field_name("type_arguments").or_else(|| {
                    syntax::named_children(generic)
                        .into_iter()
                        .find(|c| c.kind() == "type_arguments")
                })?;
                args.named_child(0)
            })
        }
    }
}

/// First formal parameter of a function.
pub fn first_parameter<'t>(function: Node<'t>) -> Option<Node<'t>> {
    if let Some(params) = function.child_by_field_name("parameters") {
        return syntax::named_children(params)
            .into_iter()
            .find(|p| matches!(p.kind(), "required_parameter" | "optional_parameter"));
    }
    function.child_by_field_name("parameter")
}

fn declared_inputs(tree: &SyntaxTree, primary: &Primary<'_>) -> Vec<InputField> {
    let src = tree.source();
    let type_node = props_type_node(primary);

    if let Some(t) = type_node {
        if t.kind() == "object_type" {
            return members(src, t);
        }
        let name = match t.kind() {
            "type_identifier" => Some(syntax::text(src, t).to_string()),
            "generic_type" => t
                .child_by_field_name("name")
                .map(|n| syntax::text(src, n).to_string()),
            _ => None,
        };
        if let Some(body) = name.and_then(|n| find_type_body(tree, &n)) {
            return members(src, body);
        }
    }

    let conventional = format!("{}Props", primary.name);
    if let Some(body) = find_type_body(tree, &conventional) {
        return members(src, body);
    }
    if let Some(body) = first_props_declaration(tree) {
        return members(src, body);
    }

    // Untyped destructured props still declare names.
    first_parameter(primary.node)
        .and_then(|p| p.child_by_field_name("pattern"))
        .filter(|p| p.kind() == "object_pattern")
        .map(|pattern| {
            syntax::named_children(pattern)
                .into_iter()
                .filter_map(|entry| match entry.kind() {
                    "shorthand_property_identifier_pattern" => Some(InputField {
                        name: syntax::text(src, entry).to_string(),
                        type_tag: "unknown".to_string(),
                        required: true,
                    }),
                    "object_assignment_pattern" => entry.child_by_field_name("left").map(|l| {
                        InputField {
                            name: syntax::text(src, l).to_string(),
                            type_tag: "unknown".to_string(),
                            required: false,
                        }
                    }),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Body of an interface or object type alias by name.
pub fn find_type_body<'t>(tree: &'t SyntaxTree, name: &str) -> Option<Node<'t>> {
    type_declarations(tree)
        .into_iter()
        .find(|(n, _)| n == name)
        .map(|(_, body)| body)
}

fn first_props_declaration(tree: &SyntaxTree) -> Option<Node<'_>> {
    type_declarations(tree)
        .into_iter()
        .find(|(n, _)| n.ends_with("Props"))
        .map(|(_, body)| body)
}

/// `(name, body)` of every top-level interface / object type alias.
pub fn type_declarations(tree: &SyntaxTree) -> Vec<(String, Node<'_>)> {
    let src = tree.source();
    let mut out = Vec::new();
    for item in syntax::named_children(tree.root()) {
        let decl = if item.kind() == "export_statement" {
            match item.child_by_field_name("declaration") {
                Some(d) => d,
                None => continue,
            }
        } else {
            item
        };
        let body = match decl.kind() {
            "interface_declaration" => decl.child_by_field_name("body"),
            "type_alias_declaration" => decl
                .child_by_field_name("value")
                .filter(|v| v.kind() == "object_type"),
            _ => None,
        };
        if let (Some(name), Some(body)) = (decl.child_by_field_name("name"), body) {
            out.push((syntax::text(src, name).to_string(), body));
        }
    }
    out
}

fn members(src: &str, body: Node<'_>) -> Vec<InputField> {
    syntax::named_children(body)
        .into_iter()
        .filter_map(|member| match member.kind() {
            "property_signature" => {
                let name = member.child_by_field_name("name")?;
                let type_tag = member
                    .child_by_field_name("type")
                    .map(|t| annotation_text(src, t))
                    .unwrap_or_else(|| "unknown".to_string());
                Some(InputField {
                    name: syntax::text(src, name).to_string(),
                    type_tag,
                    required: !syntax::has_token(member, "?"),
                })
            }
            "method_signature" => {
                let name = member.child_by_field_name("name")?;
                let params = member
                    .child_by_field_name("parameters")
                    .map(|p| syntax::text(src, p).to_string())
                    .unwrap_or_else(|| "()".to_string());
                let ret = member
                    .child_by_field_name("return_type")
                    .map(|t| annotation_text(src, t))
                    .unwrap_or_else(|| "void".to_string());
                Some(InputField {
                    name: syntax::text(src, name).to_string(),
                    type_tag: format!("{params} => {ret}"),
                    required: !syntax::has_token(member, "?"),
                })
            }
            _ => None,
        })
        .collect()
}

/// Text of a `type_annotation` without the leading colon.
pub fn annotation_text(src: &str, annotation: Node<'_>) -> String {
    syntax::text(src, annotation)
        .trim_start_matches(':')
        .trim()
        .to_string()
}

// =============================================================================
// Imports
// =============================================================================

fn imports(tree: &SyntaxTree) -> Vec<DependencyRef> {
    let src = tree.source();
    let mut out = Vec::new();
    for stmt in syntax::named_children(tree.root()) {
        if stmt.kind() != "import_statement" {
            continue;
        }
        let Some(source) = stmt
            .child_by_field_name("source")
            .and_then(|s| syntax::string_value(src, s))
        else {
            continue;
        };
        let type_only = syntax::has_token(stmt, "type");
        let clause = syntax::named_children(stmt)
            .into_iter()
            .find(|c| c.kind() == "import_clause");

        let mut names = Vec::new();
        if let Some(clause) = clause {
            for part in syntax::named_children(clause) {
                match part.kind() {
                    "identifier" => names.push(syntax::text(src, part).to_string()),
                    "namespace_import" => {
                        if let Some(id) = syntax::named_children(part)
                            .into_iter()
                            .find(|c| c.kind() == "identifier")
                        {
                            names.push(syntax::text(src, id).to_string());
                        }
                    }
                    "named_imports" => {
                        for spec in syntax::named_children(part) {
                            if spec.kind() != "import_specifier" {
                                continue;
                            }
                            let local = spec
                                .child_by_field_name("alias")
                                .or_else(|| spec.child_by_field_name("name"));
                            if let Some(local) = local {
                                names.push(syntax::text(src, local).to_string());
                            }
                        }
                    }
                    _ => {}
                }
            }
        } else {
            names.push(module_stem(&source));
        }

        for name in names {
            let class = classify_import(&name, &source, type_only);
            out.push(DependencyRef {
                name,
                source: source.clone(),
                class,
            });
        }
    }
    out
}

fn classify_import(name: &str, specifier: &str, type_only: bool) -> DependencyClass {
    if !specifier.starts_with('.') {
        DependencyClass::Library
    } else if syntax::is_capitalized(name) && !type_only {
        DependencyClass::Component
    } else {
        DependencyClass::Utility
    }
}

fn module_stem(specifier: &str) -> String {
    let last = specifier.rsplit('/').next().unwrap_or(specifier);
    last.split('.').next().unwrap_or(last).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(src: &str, path: &str) -> ComponentModel {
        Extractor::default().extract(src, Path::new(path)).unwrap()
    }

    #[test]
    fn test_stateful_function_component() {
        let src = r#"
import React, { useState } from 'react';
import { Avatar } from './Avatar';
import { formatDate } from '../utils/format';

interface ProfileProps {
  userId: string;
  compact?: boolean;
}

export default function Profile({ userId, compact }: ProfileProps) {
  const [open, setOpen] = useState(false);
  return <div><Avatar id={userId} /></div>;
}
"#;
        let model = extract(src, "users/Profile.tsx");
        assert_eq!(model.id.as_str(), "users/Profile");
        assert_eq!(model.name, "Profile");
        assert_eq!(model.kind, ComponentKind::StatefulView);
        assert_eq!(model.inputs.len(), 2);
        assert!(model.inputs[0].required);
        assert!(!model.inputs[1].required);
        assert_eq!(model.inputs[1].type_tag, "boolean");

        let classes: Vec<_> = model.dependencies.iter().map(|d| (d.name.as_str(), d.class)).collect();
        assert!(classes.contains(&("React", DependencyClass::Library)));
        assert!(classes.contains(&("Avatar", DependencyClass::Component)));
        assert!(classes.contains(&("formatDate", DependencyClass::Utility)));
    }

    #[test]
    fn test_class_component_with_type_arguments() {
        let src = r#"
import React from 'react';
type CounterProps = { step: number };
type CounterState = { count: number };
export class Counter extends React.Component<CounterProps, CounterState> {
  state = { count: 0 };
  render() { return <span>{this.state.count}</span>; }
}
"#;
        let model = extract(src, "Counter.tsx");
        assert_eq!(model.kind, ComponentKind::ClassBasedView);
        assert_eq!(model.name, "Counter");
        assert_eq!(model.inputs[0].name, "step");
    }

    #[test]
    fn test_higher_order_component_is_composite() {
        let src = r#"
export function withLogger(Wrapped: any) {
  return function Logged(props: any) {
    return <Wrapped {...props} />;
  };
}
"#;
        let model = extract(src, "hoc/withLogger.tsx");
        assert_eq!(model.kind, ComponentKind::Composite);
        assert_eq!(model.name, "withLogger");
    }

    #[test]
    fn test_stateless_arrow_and_utility() {
        let model = extract(
            "export const Badge = ({ label }: { label: string }) => <b>{label}</b>;",
            "Badge.tsx",
        );
        assert_eq!(model.kind, ComponentKind::StatelessView);
        assert_eq!(model.inputs[0].name, "label");

        let model = extract("export function sum(a: number, b: number) { return a + b; }", "math.ts");
        assert_eq!(model.kind, ComponentKind::UtilityFunction);
    }

    #[test]
    fn test_parse_failure_is_reported() {
        let err = Extractor::default()
            .extract("export default function Broken( { return <div>; }", Path::new("Broken.tsx"))
            .unwrap_err();
        assert!(matches!(err, MigrationError::ParseFailure { .. }));
    }

    #[test]
    fn test_failed_model_keeps_error_position() {
        let path = Path::new("forms/Broken.tsx");
        let err = Extractor::default()
            .extract("export default function Broken( { return <div>; }", path)
            .unwrap_err();

        let model = Extractor::failed_model(path, &err);
        assert!(model.is_failed());
        assert_eq!(model.id.as_str(), "forms/Broken");
        assert_eq!(model.name, "Broken");
        assert_eq!(model.location.path, path);
        assert!(model.location.line >= 1);
        match &model.status {
            ExtractionStatus::Failed { reason } => assert_eq!(reason, &err.to_string()),
            other => panic!("expected failed status, got {other:?}"),
        }

        let missing = MigrationError::FileNotFound {
            path: path.to_path_buf(),
        };
        let model = Extractor::failed_model(path, &missing);
        assert_eq!(model.location, SourceLocation::file(path));
    }

    #[test]
    fn test_missing_file_maps_to_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = Extractor::default()
            .read_and_extract(dir.path(), Path::new("Nope.tsx"))
            .unwrap_err();
        assert!(matches!(err, MigrationError::FileNotFound { .. }));
    }
}
