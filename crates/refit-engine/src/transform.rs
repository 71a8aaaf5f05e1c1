//! Strategy selection and assembly of the Solid component model.

use crate::analyze;
use crate::config::TierThresholds;
use crate::dialect::{self, Dialect};
use crate::error::{EngineResult, MigrationError};
use crate::extract::{self, DeclShape, Primary};
use crate::render::{dedent, indent, ClassScope, Renderer};
use crate::resolve::TargetIndex;
use crate::syntax::{self, SyntaxTree};
use refit_core::{
    BusinessLogicModel, ComponentId, ComponentKind, ComponentModel, InputField, SideEffect,
    Strategy, TransformationKind, TransformationRecord,
};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use tracing::debug;
use tree_sitter::Node;

pub use crate::render::{ImportPlan, ReviewMarker, MARKER_TAG, REDUCER_MODULE};

// =============================================================================
// Transformed model
// =============================================================================

/// A reactive signal in the target component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetSignal {
    pub name: String,
    pub setter: String,
    pub value_type: String,
    /// Declared with `createReducer`; the setter is a dispatch function.
    pub reducer: bool,
}

/// An effect in the target component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetEffect {
    /// `onMount`, `createEffect+on` or `createEffect`.
    pub primitive: String,
    pub dependencies: Vec<String>,
    pub has_cleanup: bool,
}

/// A handler in the target component with the setters it calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetHandler {
    pub name: String,
    pub interaction: String,
    pub mutators: Vec<String>,
}

/// Outer shape of the primary artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "shape", rename_all = "kebab-case")]
pub enum Shell {
    /// `const Name: Component<NameProps> = (param) => { body }`.
    Component { param: String, body: Vec<String> },
    /// The declarations are the whole module.
    Module,
}

/// Rewritten structural representation of one component.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformedModel {
    pub id: ComponentId,
    pub name: String,
    pub kind: ComponentKind,
    pub strategy: Strategy,
    pub manual_review: bool,
    pub source_path: PathBuf,
    /// Declared inputs with target type tags.
    pub props: Vec<InputField>,
    /// Default values merged into props.
    pub prop_defaults: Vec<(String, String)>,
    pub imports: ImportPlan,
    /// Top-level items other than the primary declaration, rendered.
    pub declarations: Vec<String>,
    pub shell: Shell,
    pub signals: Vec<TargetSignal>,
    pub effects: Vec<TargetEffect>,
    pub handlers: Vec<TargetHandler>,
    pub markers: Vec<ReviewMarker>,
    /// Migration notes for the README.
    pub notes: Vec<String>,
    /// Exported value names besides the default export.
    pub named_exports: Vec<String>,
    /// Exported type names.
    pub type_exports: Vec<String>,
    pub default_export: bool,
}

impl TransformedModel {
    /// Name of the generated props interface.
    pub fn props_type_name(&self) -> String {
        format!("{}Props", self.name)
    }

    /// Whether the primary artifact wraps a component shell.
    pub fn is_component(&self) -> bool {
        matches!(self.shell, Shell::Component { .. })
    }

    /// File name of the primary artifact. Modules without markup keep `.ts`.
    pub fn primary_file_name(&self) -> String {
        let markup = self.is_component()
            || self.kind == ComponentKind::Composite
            || self
                .source_path
                .extension()
                .is_some_and(|e| e == "tsx" || e == "jsx");
        let extension = if markup { "tsx" } else { "ts" };
        format!("{}.{extension}", self.name)
    }
}

/// Result of transforming one component.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transformation {
    pub model: TransformedModel,
    /// Individual rewrites, in emission order.
    pub records: Vec<TransformationRecord>,
    pub strategy: Strategy,
    pub manual_review: bool,
}

// =============================================================================
// Transformer
// =============================================================================

/// Selects a strategy from the tier and rewrites the component.
#[derive(Debug, Clone, Default)]
pub struct Transformer {
    thresholds: TierThresholds,
    targets: TargetIndex,
}

impl Transformer {
    /// Create a transformer; `thresholds` tier models the analyzer left unscored.
    pub fn new(thresholds: TierThresholds) -> Self {
        Self {
            thresholds,
            targets: TargetIndex::default(),
        }
    }

    /// Rewrite imports between components of the same batch.
    pub fn with_targets(mut self, targets: TargetIndex) -> Self {
        self.targets = targets;
        self
    }

    /// Transform one analyzed component.
    pub fn transform(
        &self,
        model: &ComponentModel,
        logic: &BusinessLogicModel,
        tree: &SyntaxTree,
    ) -> EngineResult<Transformation> {
        let tier = model
            .complexity
            .unwrap_or_else(|| self.thresholds.tier_for(logic.complexity_score));
        let strategy = Strategy::for_tier(tier);

        let mut build = Build::new(model, logic, tree, strategy);
        build.imports(&self.targets);
        let primary = extract::locate_primary(tree);
        let shell = match primary.as_ref() {
            Some(p) if model.kind.is_view() => {
                build.declarations(p)?;
                match p.shape {
                    DeclShape::Function => build.function_component(p)?,
                    DeclShape::Class => build.class_component(p)?,
                }
            }
            _ => build.module()?,
        };
        let transformation = build.finish(shell);

        debug!(
            component = %model.id,
            strategy = %strategy,
            records = transformation.records.len(),
            markers = transformation.model.markers.len(),
            "Transformed component"
        );
        Ok(transformation)
    }
}

// =============================================================================
// Build
// =============================================================================

#[derive(Default)]
struct Destructured {
    keys: Vec<String>,
    rest: Option<String>,
}

struct Build<'a, 't> {
    model: &'a ComponentModel,
    logic: &'a BusinessLogicModel,
    tree: &'t SyntaxTree,
    src: &'t str,
    strategy: Strategy,
    renderer: Renderer<'t>,
    react_imports: Vec<String>,
    skip: HashSet<usize>,
    declarations: Vec<String>,
    named_exports: Vec<String>,
    type_exports: Vec<String>,
    default_export: bool,
    prop_defaults: Vec<(String, String)>,
    notes: Vec<String>,
    shell_source: String,
    class_node: Option<Node<'t>>,
    class_keys: Vec<String>,
    class_functions: HashMap<String, Node<'t>>,
}

impl<'a, 't> Build<'a, 't> {
    fn new(
        model: &'a ComponentModel,
        logic: &'a BusinessLogicModel,
        tree: &'t SyntaxTree,
        strategy: Strategy,
    ) -> Self {
        let src = tree.source();
        let mut renderer = Renderer::new(src, model.name.clone(), strategy.marks_ambiguity());
        for handler in logic.event_handlers.iter().filter(|h| h.detection.is_heuristic()) {
            renderer
                .heuristic_lines
                .entry(handler.line)
                .or_default()
                .push(format!("`{}` was recognized as a handler by its name only", handler.name));
        }
        for call in logic.external_calls.iter().filter(|c| c.detection.is_heuristic()) {
            renderer
                .heuristic_lines
                .entry(call.line)
                .or_default()
                .push(format!("`{}` was treated as an external call by its name only", call.callee));
        }
        Self {
            model,
            logic,
            tree,
            src,
            strategy,
            renderer,
            react_imports: Vec::new(),
            skip: HashSet::new(),
            declarations: Vec::new(),
            named_exports: Vec::new(),
            type_exports: Vec::new(),
            default_export: false,
            prop_defaults: Vec::new(),
            notes: Vec::new(),
            shell_source: format!("module {}", model.name),
            class_node: None,
            class_keys: Vec::new(),
            class_functions: HashMap::new(),
        }
    }

    fn text(&self, node: Node<'_>) -> &'t str {
        syntax::text(self.src, node)
    }

    // -------------------------------------------------------------------------
    // Imports and declarations
    // -------------------------------------------------------------------------

    fn imports(&mut self, targets: &TargetIndex) {
        let framework = Dialect::React.framework_modules();
        for dep in &self.model.dependencies {
            if framework.contains(&dep.source.as_str()) {
                self.renderer.react_names.insert(dep.name.clone());
            }
        }

        for stmt in syntax::named_children(self.tree.root()) {
            if stmt.kind() != "import_statement" {
                continue;
            }
            self.skip.insert(stmt.id());
            let Some(source_node) = stmt.child_by_field_name("source") else {
                continue;
            };
            let source = syntax::string_value(self.src, source_node).unwrap_or_default();
            if framework.contains(&source.as_str()) {
                self.react_imports.push(collapse(self.text(stmt)));
                continue;
            }
            let text = match targets.rewrite(&self.model.location.path, &source) {
                Some(target) => {
                    let before = self
                        .src
                        .get(stmt.start_byte()..source_node.start_byte())
                        .unwrap_or_default();
                    let after = self
                        .src
                        .get(source_node.end_byte()..stmt.end_byte())
                        .unwrap_or_default();
                    format!("{before}\"{target}\"{after}")
                }
                None => {
                    if source.starts_with('.') {
                        self.notes.push(format!(
                            "Relative import `{source}` is kept as written; check it resolves from the output directory."
                        ));
                    }
                    self.text(stmt).to_string()
                }
            };
            self.renderer.imports.preserved.push(text);
        }
    }

    /// Render top-level items other than imports and the primary declaration.
    fn declarations(&mut self, primary: &Primary<'t>) -> EngineResult<()> {
        for stmt in &primary.statements {
            self.skip.insert(stmt.id());
            if stmt.kind() == "export_statement" {
                if syntax::has_token(*stmt, "default") {
                    self.default_export = true;
                } else if stmt.child_by_field_name("declaration").is_some() {
                    self.named_exports.push(primary.name.clone());
                }
            }
            self.drop_static_assignment(*stmt)?;
        }

        let generated = self.model.props_type_name();
        let used = self.used_props_type(primary);
        for item in syntax::named_children(self.tree.root()) {
            if self.skip.contains(&item.id()) {
                continue;
            }
            if let Some(name) = declared_type_name(self.src, item) {
                if name == generated || Some(&name) == used.as_ref() {
                    if name != generated {
                        self.declarations.push(format!("type {name} = {generated};"));
                    }
                    continue;
                }
            }
            self.collect_exports(item);
            self.push_declaration(item)?;
        }
        Ok(())
    }

    fn push_declaration(&mut self, item: Node<'t>) -> EngineResult<()> {
        let column = item.start_position().column;
        let rendered = self.renderer.render(item)?;
        let rendered = dedent(rendered.trim(), column);
        if !rendered.is_empty() {
            self.declarations.push(rendered);
        }
        Ok(())
    }

    /// Name of the props type the extractor read the inputs from.
    fn used_props_type(&self, primary: &Primary<'t>) -> Option<String> {
        if let Some(node) = extract::props_type_node(primary) {
            return match node.kind() {
                "type_identifier" => Some(self.text(node).to_string()),
                "generic_type" => node
                    .child_by_field_name("name")
                    .map(|n| self.text(n).to_string()),
                _ => None,
            };
        }
        let declared = extract::type_declarations(self.tree);
        let conventional = self.model.props_type_name();
        if declared.iter().any(|(n, _)| *n == conventional) {
            return Some(conventional);
        }
        declared
            .into_iter()
            .map(|(n, _)| n)
            .find(|n| n.ends_with("Props"))
    }

    fn collect_exports(&mut self, item: Node<'t>) {
        if item.kind() != "export_statement" {
            return;
        }
        if syntax::has_token(item, "default") {
            self.default_export = true;
            return;
        }
        if let Some(decl) = item.child_by_field_name("declaration") {
            match decl.kind() {
                "function_declaration" | "class_declaration" | "abstract_class_declaration" => {
                    if let Some(name) = decl.child_by_field_name("name") {
                        self.named_exports.push(self.text(name).to_string());
                    }
                }
                "lexical_declaration" | "variable_declaration" => {
                    for declarator in syntax::named_children(decl) {
                        if let Some(name) = declarator
                            .child_by_field_name("name")
                            .filter(|n| n.kind() == "identifier")
                        {
                            self.named_exports.push(self.text(name).to_string());
                        }
                    }
                }
                "interface_declaration" | "type_alias_declaration" | "enum_declaration" => {
                    if let Some(name) = decl.child_by_field_name("name") {
                        self.type_exports.push(self.text(name).to_string());
                    }
                }
                _ => {}
            }
            return;
        }
        for clause in syntax::named_children(item) {
            if clause.kind() != "export_clause" {
                continue;
            }
            for spec in syntax::named_children(clause) {
                let exported = spec
                    .child_by_field_name("alias")
                    .or_else(|| spec.child_by_field_name("name"));
                if let Some(name) = exported {
                    self.named_exports.push(self.text(name).to_string());
                }
            }
        }
    }

    /// `Name.defaultProps = {...}` feeds the defaults; `propTypes` is dropped.
    fn drop_static_assignment(&mut self, stmt: Node<'t>) -> EngineResult<()> {
        let Some(assignment) = stmt
            .named_child(0)
            .filter(|e| stmt.kind() == "expression_statement" && e.kind() == "assignment_expression")
        else {
            return Ok(());
        };
        let target = assignment
            .child_by_field_name("left")
            .and_then(|l| syntax::dotted_path(self.src, l))
            .unwrap_or_default();
        if target.ends_with(".defaultProps") {
            if let Some(object) = assignment.child_by_field_name("right") {
                self.collect_defaults(object)?;
            }
        } else if target.ends_with(".propTypes") {
            self.notes
                .push("Runtime propTypes were dropped; the typed props interface replaces them.".to_string());
        }
        Ok(())
    }

    fn collect_defaults(&mut self, object: Node<'t>) -> EngineResult<()> {
        if object.kind() != "object" {
            return Ok(());
        }
        for entry in syntax::named_children(object) {
            if entry.kind() != "pair" {
                continue;
            }
            let (Some(key), Some(value)) = (
                entry.child_by_field_name("key"),
                entry.child_by_field_name("value"),
            ) else {
                continue;
            };
            let key = analyze::property_key(self.src, key);
            let value = self.renderer.render(value)?;
            self.push_default(key, value);
        }
        Ok(())
    }

    fn push_default(&mut self, key: String, value: String) {
        if !self.prop_defaults.iter().any(|(k, _)| *k == key) {
            self.prop_defaults.push((key, value));
        }
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Register accessor reads for hook state, memos and refs declared in `scope`.
    fn seed_reads(&mut self, scope: Node<'t>) {
        for binding in &self.logic.state_bindings {
            if binding.mutator != "setState" {
                self.renderer
                    .reads
                    .insert(binding.name.clone(), format!("{}()", binding.name));
            }
        }
        for declarator in syntax::descendants(scope) {
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
            let Some(callee) = syntax::callee_path(self.src, value) else {
                continue;
            };
            let name = self.text(name).to_string();
            match Dialect::React.normalize_callee(&callee) {
                "useMemo" => {
                    self.renderer.reads.insert(name.clone(), format!("{name}()"));
                }
                "useRef" | "createRef" => {
                    self.renderer.refs.insert(name);
                }
                _ => {}
            }
        }
    }

    /// Map destructured props to `base.key` reads.
    fn destructure(&mut self, pattern: Node<'t>, base: &str) -> EngineResult<Destructured> {
        let mut out = Destructured::default();
        for entry in syntax::named_children(pattern) {
            match entry.kind() {
                "shorthand_property_identifier_pattern" => {
                    let name = self.text(entry).to_string();
                    self.renderer.reads.insert(name.clone(), format!("{base}.{name}"));
                    out.keys.push(name);
                }
                "object_assignment_pattern" => {
                    let (Some(left), Some(right)) = (
                        entry.child_by_field_name("left"),
                        entry.child_by_field_name("right"),
                    ) else {
                        continue;
                    };
                    let name = self.text(left).to_string();
                    self.renderer.reads.insert(name.clone(), format!("{base}.{name}"));
                    let value = self.renderer.render(right)?;
                    self.push_default(name.clone(), value);
                    out.keys.push(name);
                }
                "pair_pattern" => {
                    let (Some(key), Some(value)) = (
                        entry.child_by_field_name("key"),
                        entry.child_by_field_name("value"),
                    ) else {
                        continue;
                    };
                    let key = analyze::property_key(self.src, key);
                    let alias = match value.kind() {
                        "identifier" => Some(value),
                        "assignment_pattern" => {
                            if let Some(right) = value.child_by_field_name("right") {
                                let rendered = self.renderer.render(right)?;
                                self.push_default(key.clone(), rendered);
                            }
                            value.child_by_field_name("left")
                        }
                        _ => None,
                    };
                    if let Some(alias) = alias {
                        self.renderer
                            .reads
                            .insert(self.text(alias).to_string(), format!("{base}.{key}"));
                    }
                    out.keys.push(key);
                }
                "rest_pattern" => {
                    out.rest = entry.named_child(0).map(|n| self.text(n).to_string());
                }
                _ => {}
            }
        }
        Ok(out)
    }

    fn props_prelude(&mut self, param: &str, rest: Option<(String, Vec<String>)>) -> (String, Vec<String>) {
        let mut prelude = Vec::new();
        let mut shell_param = param.to_string();
        if !self.prop_defaults.is_empty() {
            self.renderer.imports.use_primitive("mergeProps");
            let fields: Vec<String> = self
                .prop_defaults
                .iter()
                .map(|(k, v)| format!("{k}: {v}"))
                .collect();
            shell_param = format!("raw{}", capitalize(param));
            prelude.push(format!(
                "const {param} = mergeProps({{ {} }}, {shell_param});",
                fields.join(", ")
            ));
        }
        if let Some((rest, keys)) = rest {
            self.renderer.imports.use_primitive("splitProps");
            let quoted: Vec<String> = keys.iter().map(|k| format!("\"{k}\"")).collect();
            prelude.push(format!(
                "const [, {rest}] = splitProps({param}, [{}]);",
                quoted.join(", ")
            ));
        }
        (shell_param, prelude)
    }

    // -------------------------------------------------------------------------
    // Function components
    // -------------------------------------------------------------------------

    fn function_component(&mut self, primary: &Primary<'t>) -> EngineResult<Shell> {
        let root = primary.node;
        self.shell_source = format!("function component {}", primary.name);
        self.renderer.set_scope_root(Some(root));
        self.seed_reads(root);

        let mut param = "props".to_string();
        let mut rest = None;
        let pattern = extract::first_parameter(root).and_then(|p| {
            if p.kind() == "identifier" {
                Some(p)
            } else {
                p.child_by_field_name("pattern")
            }
        });
        match pattern {
            Some(p) if p.kind() == "identifier" => param = self.text(p).to_string(),
            Some(p) if p.kind() == "object_pattern" => {
                let destructured = self.destructure(p, "props")?;
                rest = destructured.rest.map(|r| (r, destructured.keys));
            }
            _ => {}
        }

        // `const { a, b } = props;` in the body
        for declarator in syntax::descendants(root) {
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            let (Some(name), Some(value)) = (
                declarator.child_by_field_name("name"),
                declarator.child_by_field_name("value"),
            ) else {
                continue;
            };
            let owner = syntax::enclosing(declarator, syntax::FUNCTION_KINDS).map(|f| f.id());
            if name.kind() != "object_pattern"
                || value.kind() != "identifier"
                || self.text(value) != param
                || owner != Some(root.id())
            {
                continue;
            }
            let destructured = self.destructure(name, &param)?;
            if let Some(r) = destructured.rest {
                rest = Some((r, destructured.keys));
            }
            self.renderer.dropped.insert(declarator.id());
        }

        self.renderer.props_param = Some(param.clone());
        self.renderer.mark_derived(root);

        self.wrapper_note(primary);
        let (shell_param, mut body) = self.props_prelude(&param, rest);
        match root.child_by_field_name("body") {
            Some(block) if block.kind() == "statement_block" => {
                body.extend(self.renderer.render_statements(block)?);
            }
            Some(expr) => {
                let column = expr.start_position().column;
                let rendered = self.renderer.render(expr)?;
                body.push(format!("return {};", dedent(rendered.trim(), column)));
            }
            None => {}
        }
        Ok(Shell::Component {
            param: shell_param,
            body,
        })
    }

    fn wrapper_note(&mut self, primary: &Primary<'t>) {
        if let Some(wrapper) = &primary.export_wrapper {
            let line = syntax::line(primary.node);
            self.renderer.flag(
                line,
                &format!("the default export was wrapped in `{wrapper}`; the wrapper was dropped"),
            );
        }
    }

    // -------------------------------------------------------------------------
    // Class components
    // -------------------------------------------------------------------------

    fn class_component(&mut self, primary: &Primary<'t>) -> EngineResult<Shell> {
        let class = primary.node;
        self.shell_source = format!("class component {}", primary.name);
        let members = extract::class_members(self.src, class);
        let has_render = members
            .iter()
            .any(|(n, m)| n == "render" && m.function.is_some() && !m.is_static);
        if !has_render {
            return Err(MigrationError::MissingRender {
                component: self.model.name.clone(),
            });
        }
        if let Some((name, _)) = members
            .iter()
            .find(|(n, _)| dialect::UNSUPPORTED_LIFECYCLE.contains(&n.as_str()))
        {
            return Err(MigrationError::UnsupportedConstruct {
                component: self.model.name.clone(),
                construct: format!("{name}()"),
            });
        }

        let state = analyze::class_state_object(self.src, class);
        let state_entries: Vec<(String, Node<'t>)> = state
            .map(|object| {
                syntax::named_children(object)
                    .into_iter()
                    .filter_map(|entry| match entry.kind() {
                        "pair" => Some((
                            analyze::property_key(self.src, entry.child_by_field_name("key")?),
                            entry.child_by_field_name("value")?,
                        )),
                        "shorthand_property_identifier" => Some((self.text(entry).to_string(), entry)),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();
        self.class_keys = state_entries.iter().map(|(k, _)| k.clone()).collect();
        self.class_node = Some(class);
        self.renderer.class = Some(ClassScope {
            state_keys: self.class_keys.clone(),
        });
        self.renderer.set_scope_root(Some(class));
        self.seed_reads(class);
        self.seed_class_reads(class, &members)?;
        self.wrapper_note(primary);

        let mut body = Vec::new();

        // state
        let declared_types = analyze::declared_state_types(self.tree, class);
        for (key, value) in &state_entries {
            let type_args = declared_types
                .get(key)
                .map(|t| format!("<{}>", dialect::map_type_text(t)))
                .unwrap_or_default();
            let init = if value.kind() == "shorthand_property_identifier" {
                key.clone()
            } else {
                let column = value.start_position().column;
                dedent(self.renderer.render(*value)?.trim(), column)
            };
            self.renderer.imports.use_primitive("createSignal");
            body.push(format!(
                "const [{key}, {}] = createSignal{type_args}({init});",
                syntax::setter_for(key)
            ));
        }

        // fields and constructor
        let mut declared_vars: Vec<String> = Vec::new();
        for (name, member) in &members {
            if member.is_static {
                self.static_member(name, member.value)?;
                continue;
            }
            if member.function.is_some() || member.node.kind() == "method_definition" || name == "state" {
                continue;
            }
            body.push(self.instance_field(name, member.node, member.value)?);
            declared_vars.push(name.clone());
        }
        if let Some(constructor) = members
            .iter()
            .find(|(n, _)| n == "constructor")
            .and_then(|(_, m)| m.function)
        {
            body.extend(self.constructor(constructor, &members, &mut declared_vars)?);
        }

        // methods
        for (name, member) in &members {
            let Some(function) = member.function else {
                continue;
            };
            if member.is_static || is_lifecycle(name) || name == "render" || name == "constructor" {
                continue;
            }
            self.class_functions.insert(name.clone(), function);
            let marker = self.renderer.line_marker(syntax::line(member.node));
            let column = member.node.start_position().column;
            let rendered = if member.node.kind() == "method_definition" {
                self.method(name, member.node)?
            } else {
                let value = self.renderer.render(function)?;
                format!("const {name} = {};", value.trim())
            };
            body.push(format!("{marker}{}", dedent(&rendered, column)));
        }

        // lifecycle
        body.extend(self.lifecycle(&members)?);

        if let Some(render) = members
            .iter()
            .find(|(n, m)| n == "render" && !m.is_static)
            .and_then(|(_, m)| m.function)
        {
            self.renderer.mark_derived(render);
            if let Some(block) = render.child_by_field_name("body") {
                body.extend(self.renderer.render_statements(block)?);
            }
        }

        let (param, mut shell_body) = self.props_prelude("props", None);
        shell_body.extend(body);
        Ok(Shell::Component {
            param,
            body: shell_body,
        })
    }

    /// Destructured `this.state`/`this.props`, getters and class refs.
    fn seed_class_reads(
        &mut self,
        class: Node<'t>,
        members: &[(String, extract::ClassMember<'t>)],
    ) -> EngineResult<()> {
        for declarator in syntax::descendants(class) {
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            let (Some(pattern), Some(value)) = (
                declarator.child_by_field_name("name"),
                declarator.child_by_field_name("value"),
            ) else {
                continue;
            };
            if pattern.kind() != "object_pattern" {
                continue;
            }
            match syntax::dotted_path(self.src, value).as_deref() {
                Some("this.state") => {
                    for entry in syntax::named_children(pattern) {
                        let (key, alias) = match entry.kind() {
                            "shorthand_property_identifier_pattern" => {
                                let name = self.text(entry).to_string();
                                (name.clone(), name)
                            }
                            "object_assignment_pattern" => {
                                let Some(left) = entry.child_by_field_name("left") else {
                                    continue;
                                };
                                let name = self.text(left).to_string();
                                (name.clone(), name)
                            }
                            "pair_pattern" => {
                                let (Some(key), Some(value)) = (
                                    entry.child_by_field_name("key"),
                                    entry.child_by_field_name("value"),
                                ) else {
                                    continue;
                                };
                                (
                                    analyze::property_key(self.src, key),
                                    self.text(value).to_string(),
                                )
                            }
                            _ => continue,
                        };
                        self.renderer.reads.insert(alias, format!("{key}()"));
                    }
                }
                Some("this.props") => {
                    self.destructure(pattern, "props")?;
                }
                _ => continue,
            }
            self.renderer.dropped.insert(declarator.id());
        }

        for (name, member) in members {
            if member.node.kind() == "method_definition" && syntax::has_token(member.node, "get") {
                self.renderer.reads.insert(name.clone(), format!("{name}()"));
            }
            let is_ref = member
                .value
                .and_then(|v| syntax::callee_path(self.src, v))
                .is_some_and(|c| Dialect::React.normalize_callee(&c) == "createRef");
            if is_ref {
                self.renderer.refs.insert(name.clone());
            }
        }
        Ok(())
    }

    fn static_member(&mut self, name: &str, value: Option<Node<'t>>) -> EngineResult<()> {
        match name {
            "defaultProps" => {
                if let Some(object) = value {
                    self.collect_defaults(object)?;
                }
            }
            "propTypes" => self
                .notes
                .push("Runtime propTypes were dropped; the typed props interface replaces them.".to_string()),
            "displayName" => {}
            other => self
                .notes
                .push(format!("Static member `{other}` was not carried over.")),
        }
        Ok(())
    }

    fn instance_field(
        &mut self,
        name: &str,
        node: Node<'t>,
        value: Option<Node<'t>>,
    ) -> EngineResult<String> {
        let annotation = node
            .child_by_field_name("type")
            .map(|t| dialect::map_type_text(&extract::annotation_text(self.src, t)));

        if self.renderer.refs.contains(name) {
            let element = value
                .and_then(|v| v.child_by_field_name("type_arguments"))
                .and_then(|t| t.named_child(0))
                .map(|t| self.text(t).to_string());
            let marker = self.renderer.flag(
                syntax::line(node),
                "ref is now a plain variable; check reads that expected `.current`",
            );
            return Ok(match element {
                Some(t) => format!("{marker}let {name}: {t} | undefined;"),
                None => format!("{marker}let {name};"),
            });
        }

        let annotation = annotation.map(|t| format!(": {t}")).unwrap_or_default();
        Ok(match value {
            Some(v) => {
                let column = v.start_position().column;
                let rendered = dedent(self.renderer.render(v)?.trim(), column);
                format!("let {name}{annotation} = {rendered};")
            }
            None => format!("let {name}{annotation};"),
        })
    }

    fn constructor(
        &mut self,
        constructor: Node<'t>,
        members: &[(String, extract::ClassMember<'t>)],
        declared_vars: &mut Vec<String>,
    ) -> EngineResult<Vec<String>> {
        let Some(block) = constructor.child_by_field_name("body") else {
            return Ok(Vec::new());
        };
        let mut declarations = Vec::new();
        let mut statements = Vec::new();
        for stmt in syntax::named_children(block) {
            let expression = stmt.named_child(0).filter(|_| stmt.kind() == "expression_statement");
            if let Some(expr) = expression {
                if expr.kind() == "call_expression"
                    && expr
                        .child_by_field_name("function")
                        .is_some_and(|f| f.kind() == "super")
                {
                    continue;
                }
                if expr.kind() == "assignment_expression" {
                    let target = expr
                        .child_by_field_name("left")
                        .and_then(|l| syntax::dotted_path(self.src, l))
                        .unwrap_or_default();
                    let binds_method = expr
                        .child_by_field_name("right")
                        .and_then(|r| syntax::callee_path(self.src, r))
                        .is_some_and(|c| c.ends_with(".bind"));
                    if target == "this.state" || binds_method {
                        continue;
                    }
                    if let Some(field) = target.strip_prefix("this.") {
                        let is_member = members.iter().any(|(n, _)| n == field);
                        if !field.contains('.')
                            && !is_member
                            && !declared_vars.iter().any(|v| v == field)
                        {
                            declared_vars.push(field.to_string());
                            declarations.push(format!("let {field};"));
                        }
                    }
                }
            }
            let column = stmt.start_position().column;
            let rendered = dedent(self.renderer.render(stmt)?.trim(), column);
            if !rendered.is_empty() {
                statements.push(rendered);
            }
        }
        declarations.extend(statements);
        Ok(declarations)
    }

    fn method(&mut self, name: &str, node: Node<'t>) -> EngineResult<String> {
        let params = match node.child_by_field_name("parameters") {
            Some(p) => self.renderer.render(p)?,
            None => "()".to_string(),
        };
        let return_type = match node.child_by_field_name("return_type") {
            Some(t) => self.renderer.render(t)?,
            None => String::new(),
        };
        let body = match node.child_by_field_name("body") {
            Some(b) => self.renderer.render(b)?,
            None => "{}".to_string(),
        };
        if syntax::has_token(node, "get") {
            self.renderer.imports.use_primitive("createMemo");
            return Ok(format!("const {name} = createMemo(() => {body});"));
        }
        let async_kw = if syntax::has_token(node, "async") {
            "async "
        } else {
            ""
        };
        Ok(format!("const {name} = {async_kw}{params}{return_type} => {body};"))
    }

    fn function_statements(&mut self, function: Node<'t>) -> EngineResult<Vec<String>> {
        match function.child_by_field_name("body") {
            Some(block) if block.kind() == "statement_block" => self.renderer.render_statements(block),
            Some(expr) => Ok(vec![format!("{};", self.renderer.render(expr)?.trim())]),
            None => Ok(Vec::new()),
        }
    }

    fn lifecycle(&mut self, members: &[(String, extract::ClassMember<'t>)]) -> EngineResult<Vec<String>> {
        let find = |name: &str| {
            members
                .iter()
                .find(|(n, m)| n == name && !m.is_static)
                .and_then(|(_, m)| m.function.map(|f| (m.node, f)))
        };
        let mut out = Vec::new();

        for name in dialect::WILL_MOUNT.iter().copied() {
            if let Some((node, function)) = find(name) {
                let marker = self.renderer.flag(
                    syntax::line(node),
                    &format!("{name} body now runs during component setup"),
                );
                let statements = self.function_statements(function)?;
                if let Some((first, rest)) = statements.split_first() {
                    out.push(format!("{marker}{first}"));
                    out.extend(rest.iter().cloned());
                }
            }
        }

        let mount = find("componentDidMount");
        let unmount = find("componentWillUnmount");
        if mount.is_some() || unmount.is_some() {
            let mut inner = Vec::new();
            if let Some((_, function)) = unmount {
                self.renderer.imports.use_primitive("onCleanup");
                let statements = self.function_statements(function)?;
                inner.push(format!(
                    "onCleanup(() => {{\n{}\n}});",
                    indent(&statements.join("\n"), 1)
                ));
            }
            let mut async_kw = "";
            if let Some((node, function)) = mount {
                if syntax::has_token(node, "async") {
                    async_kw = "async ";
                }
                inner.extend(self.function_statements(function)?);
            }
            self.renderer.imports.use_primitive("onMount");
            out.push(format!(
                "onMount({async_kw}() => {{\n{}\n}});",
                indent(&inner.join("\n"), 1)
            ));
        }

        if let Some((node, function)) = find("componentDidUpdate") {
            let marker = self.renderer.flag(
                syntax::line(node),
                "componentDidUpdate now runs after any tracked prop or state change",
            );
            let params: Vec<String> = function
                .child_by_field_name("parameters")
                .map(syntax::named_children)
                .unwrap_or_default()
                .into_iter()
                .filter_map(|p| p.child_by_field_name("pattern").or(Some(p)))
                .map(|p| self.text(p).to_string())
                .collect();
            let mut inner = vec!["if (!previous) return;".to_string()];
            if let Some(prev_props) = params.first() {
                inner.push(format!("const {prev_props} = previous.props;"));
            }
            if let Some(prev_state) = params.get(1) {
                inner.push(format!("const {prev_state} = previous.state;"));
            }
            inner.extend(self.function_statements(function)?);
            let snapshot: Vec<String> = self
                .class_keys
                .iter()
                .map(|k| format!("{k}: {k}()"))
                .collect();
            self.renderer.imports.use_primitive("createEffect");
            self.renderer.imports.use_primitive("on");
            out.push(format!(
                "{marker}createEffect(on(() => ({{ props: {{ ...props }}, state: {{ {} }} }}), (_current, previous) => {{\n{}\n}}));",
                snapshot.join(", "),
                indent(&inner.join("\n"), 1)
            ));
        }

        if let Some((node, _)) = find("shouldComponentUpdate") {
            self.renderer.flag(
                syntax::line(node),
                "shouldComponentUpdate was dropped; Solid updates only what changed",
            );
        }
        Ok(out)
    }

    /// Setters a class function reaches through `this.setState`.
    fn class_setters(&self, function: Node<'t>) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for call in syntax::descendants(function) {
            if call.kind() != "call_expression"
                || syntax::callee_path(self.src, call).as_deref() != Some("this.setState")
            {
                continue;
            }
            let keys = analyze::set_state_keys(self.src, call);
            let keys = if keys.is_empty() {
                self.class_keys.clone()
            } else {
                keys
            };
            for key in keys {
                let setter = syntax::setter_for(&key);
                if !out.contains(&setter) {
                    out.push(setter);
                }
            }
        }
        out
    }

    // -------------------------------------------------------------------------
    // Modules
    // -------------------------------------------------------------------------

    fn module(&mut self) -> EngineResult<Shell> {
        let root = self.tree.root();
        self.renderer.set_scope_root(None);
        self.seed_reads(root);
        for function in syntax::descendants(root) {
            let is_hook = syntax::is_function(function)
                && syntax::function_name(self.src, function).is_some_and(syntax::is_hook_name);
            if is_hook {
                self.renderer.mark_derived(function);
            }
        }
        for item in syntax::named_children(root) {
            if self.skip.contains(&item.id()) {
                continue;
            }
            self.collect_exports(item);
            self.push_declaration(item)?;
        }
        Ok(Shell::Module)
    }

    // -------------------------------------------------------------------------
    // Finish
    // -------------------------------------------------------------------------

    fn finish(mut self, shell: Shell) -> Transformation {
        self.renderer.flush_heuristics();
        let is_component = matches!(shell, Shell::Component { .. });
        if is_component {
            self.renderer.imports.use_type("Component");
            self.default_export = true;
        }

        let props: Vec<InputField> = self
            .model
            .inputs
            .iter()
            .map(|input| InputField {
                name: input.name.clone(),
                type_tag: dialect::map_type_text(&input.type_tag),
                required: input.required,
            })
            .collect();
        let signals = self.signals();
        for text in props
            .iter()
            .map(|p| p.type_tag.as_str())
            .chain(signals.iter().map(|s| s.value_type.as_str()))
        {
            if text.contains("JSX.") {
                self.renderer.imports.use_type("JSX");
            }
        }

        let manual_review = self.strategy.requires_review();
        let mut notes = vec![strategy_note(self.strategy).to_string()];
        notes.append(&mut self.notes);
        let mut markers = std::mem::take(&mut self.renderer.markers);
        markers.sort_by(|a, b| (a.line, &a.message).cmp(&(b.line, &b.message)));

        let records = self.records(&props, &signals);
        let model = TransformedModel {
            id: self.model.id.clone(),
            name: self.model.name.clone(),
            kind: self.model.kind,
            strategy: self.strategy,
            manual_review,
            source_path: self.model.location.path.clone(),
            props,
            prop_defaults: self.prop_defaults.clone(),
            imports: self.renderer.imports.clone(),
            declarations: std::mem::take(&mut self.declarations),
            shell,
            signals,
            effects: self.effects(),
            handlers: self.handlers(),
            markers,
            notes,
            named_exports: dedup(std::mem::take(&mut self.named_exports)),
            type_exports: dedup(std::mem::take(&mut self.type_exports)),
            default_export: self.default_export,
        };
        Transformation {
            model,
            records,
            strategy: self.strategy,
            manual_review,
        }
    }

    fn signals(&self) -> Vec<TargetSignal> {
        self.logic
            .state_bindings
            .iter()
            .map(|b| TargetSignal {
                name: b.name.clone(),
                setter: if b.mutator == "setState" {
                    syntax::setter_for(&b.name)
                } else {
                    b.mutator.clone()
                },
                value_type: dialect::map_type_text(&b.value_type),
                reducer: b.reducer.is_some(),
            })
            .collect()
    }

    fn effects(&self) -> Vec<TargetEffect> {
        self.logic
            .side_effects
            .iter()
            .map(|e| TargetEffect {
                primitive: self.effect_primitive(e).to_string(),
                dependencies: e.dependencies.clone(),
                has_cleanup: e.has_cleanup,
            })
            .collect()
    }

    fn effect_primitive(&self, effect: &SideEffect) -> &'static str {
        if effect.mount_only {
            "onMount"
        } else if effect.has_dependency_list || self.class_node.is_some() {
            "createEffect+on"
        } else {
            "createEffect"
        }
    }

    fn handlers(&self) -> Vec<TargetHandler> {
        self.logic
            .event_handlers
            .iter()
            .map(|h| {
                let mut mutators: Vec<String> = Vec::new();
                for m in &h.mutators {
                    let mapped = if m == "setState" {
                        self.class_handler_setters(&h.name, h.line)
                    } else {
                        vec![m.clone()]
                    };
                    for setter in mapped {
                        if !mutators.contains(&setter) {
                            mutators.push(setter);
                        }
                    }
                }
                TargetHandler {
                    name: h.name.clone(),
                    interaction: h.interaction.clone(),
                    mutators,
                }
            })
            .collect()
    }

    fn class_handler_setters(&self, name: &str, line: usize) -> Vec<String> {
        if let Some(function) = self.class_functions.get(name) {
            return self.class_setters(*function);
        }
        let Some(class) = self.class_node else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for attr in syntax::descendants(class) {
            if attr.kind() != "jsx_attribute" || syntax::line(attr) != line {
                continue;
            }
            let inline = attr
                .named_child(1)
                .and_then(|v| v.named_child(0))
                .filter(|f| syntax::is_function(*f));
            if let Some(function) = inline {
                for setter in self.class_setters(function) {
                    if !out.contains(&setter) {
                        out.push(setter);
                    }
                }
            }
        }
        out
    }

    // -------------------------------------------------------------------------
    // Records
    // -------------------------------------------------------------------------

    fn records(&self, props: &[InputField], signals: &[TargetSignal]) -> Vec<TransformationRecord> {
        let strategy = self.strategy.label();
        let mut out = Vec::new();

        let shell_target = if self.model.kind.is_view() && self.shell_source != format!("module {}", self.model.name) {
            format!("Component<{}Props> {}", self.model.name, self.model.name)
        } else {
            format!("module {}", self.model.name)
        };
        out.push(TransformationRecord::new(
            TransformationKind::Structural,
            self.shell_source.clone(),
            shell_target,
            strategy,
        ));

        let primitives: Vec<&str> = self
            .renderer
            .imports
            .solid
            .iter()
            .map(String::as_str)
            .collect();
        for import in &self.react_imports {
            out.push(TransformationRecord::new(
                TransformationKind::Structural,
                import.clone(),
                format!("import {{ {} }} from \"solid-js\"", primitives.join(", ")),
                "framework import replaced",
            ));
        }

        for (original, target) in self.model.inputs.iter().zip(props) {
            let default = self
                .prop_defaults
                .iter()
                .find(|(k, _)| *k == original.name)
                .map(|(_, v)| format!("default {v}"));
            let note = default.unwrap_or_else(|| {
                if original.required { "required" } else { "optional" }.to_string()
            });
            out.push(TransformationRecord::new(
                TransformationKind::Prop,
                format!("{}: {}", original.name, original.type_tag),
                format!("props.{}: {}", target.name, target.type_tag),
                note,
            ));
        }

        for (binding, signal) in self.logic.state_bindings.iter().zip(signals) {
            let source = if binding.mutator == "setState" {
                format!("this.state.{}", binding.name)
            } else if binding.reducer.is_some() {
                format!("useReducer -> [{}, {}]", binding.name, binding.mutator)
            } else {
                format!("useState -> [{}, {}]", binding.name, binding.mutator)
            };
            let primitive = if signal.reducer { "createReducer" } else { "createSignal" };
            out.push(TransformationRecord::new(
                TransformationKind::State,
                source,
                format!("{primitive} -> [{}, {}]", signal.name, signal.setter),
                format!("initial {}", binding.initial_value),
            ));
        }

        for effect in &self.logic.side_effects {
            let source = if effect.mount_only {
                "effect on mount".to_string()
            } else if effect.has_dependency_list {
                format!("effect on [{}]", effect.dependencies.join(", "))
            } else {
                "effect after every render".to_string()
            };
            let note = if effect.has_cleanup {
                "cleanup via onCleanup"
            } else {
                "no cleanup"
            };
            out.push(TransformationRecord::new(
                TransformationKind::Effect,
                source,
                self.effect_primitive(effect),
                note,
            ));
        }

        for handler in &self.logic.event_handlers {
            let note = if handler.detection.is_heuristic() {
                format!("recognized by name (confidence {:.1})", handler.detection.confidence)
            } else {
                "bound in markup".to_string()
            };
            out.push(TransformationRecord::new(
                TransformationKind::Handler,
                format!("{} ({})", handler.name, handler.interaction),
                handler.name.clone(),
                note,
            ));
        }

        for rule in &self.logic.validation_rules {
            out.push(TransformationRecord::new(
                TransformationKind::Validation,
                format!("{}: {:?}", rule.field, rule.rule).to_lowercase(),
                "guard kept with accessor reads",
                rule.message.clone(),
            ));
        }

        for call in &self.logic.external_calls {
            let mut branches = Vec::new();
            if call.has_success_branch {
                branches.push("success");
            }
            if call.has_error_branch {
                branches.push("error");
            }
            let note = if branches.is_empty() {
                "no continuation".to_string()
            } else {
                format!("{} branch kept", branches.join(" and "))
            };
            out.push(TransformationRecord::new(
                TransformationKind::Api,
                format!("{} {} via {}", call.method, call.target, call.callee),
                "call kept with accessor reads",
                note,
            ));
        }
        out
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn is_lifecycle(name: &str) -> bool {
    matches!(
        name,
        "componentDidMount" | "componentWillUnmount" | "componentDidUpdate" | "shouldComponentUpdate"
    ) || dialect::WILL_MOUNT.contains(&name)
}

fn declared_type_name(src: &str, item: Node<'_>) -> Option<String> {
    let decl = if item.kind() == "export_statement" {
        item.child_by_field_name("declaration")?
    } else {
        item
    };
    match decl.kind() {
        "interface_declaration" | "type_alias_declaration" => decl
            .child_by_field_name("name")
            .map(|n| syntax::text(src, n).to_string()),
        _ => None,
    }
}

fn strategy_note(strategy: Strategy) -> &'static str {
    match strategy {
        Strategy::DirectTranslation => "Simple component: translated directly.",
        Strategy::PatternMapping => {
            "Moderate component: every pattern was rewritten through the React to Solid rule table."
        }
        Strategy::HybridApproach => {
            "Complex component: ambiguous constructs carry TODO(refit) markers."
        }
        Strategy::ManualReviewRequired => {
            "Critical component: the output is best effort and must be reviewed before use."
        }
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => format!("{}{}", first.to_ascii_uppercase(), chars.as_str()),
        None => String::new(),
    }
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn dedup(names: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in names {
        if !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::Analyzer;
    use crate::extract::Extractor;
    use refit_core::{ComplexityTier, TransformationKind as K};
    use std::path::Path;

    fn transform(src: &str, path: &str) -> EngineResult<Transformation> {
        let parsed = Extractor::default().extract_parsed(src, Path::new(path))?;
        let parsed = Analyzer::default().enrich(parsed)?;
        let logic = parsed.model.logic.clone().unwrap_or_default();
        Transformer::default().transform(&parsed.model, &logic, &parsed.tree)
    }

    fn body(t: &Transformation) -> String {
        match &t.model.shell {
            Shell::Component { body, .. } => body.join("\n"),
            Shell::Module => t.model.declarations.join("\n"),
        }
    }

    fn count(t: &Transformation, kind: K) -> usize {
        t.records.iter().filter(|r| r.kind == kind).count()
    }

    const COUNTER: &str = r#"
import React, { useState } from 'react';

interface CounterProps {
  label: string;
  step?: number;
}

export default function Counter({ label, step = 1 }: CounterProps) {
  const [count, setCount] = useState(0);
  return (
    <button className="counter" onClick={() => setCount(count + step)}>
      {label}: {count}
    </button>
  );
}
"#;

    #[test]
    fn test_function_component_is_rewritten() {
        let t = transform(COUNTER, "Counter.tsx").unwrap();
        assert_eq!(t.strategy, Strategy::DirectTranslation);
        assert!(!t.manual_review);

        let Shell::Component { param, .. } = &t.model.shell else {
            panic!("expected a component shell");
        };
        assert_eq!(param, "rawProps");
        let body = body(&t);
        assert!(body.starts_with("const props = mergeProps({ step: 1 }, rawProps);"));
        assert!(body.contains("const [count, setCount] = createSignal(0);"));
        assert!(body.contains("onClick={() => setCount(count() + props.step)}"));
        assert!(body.contains("{props.label}: {count()}"));
        assert!(body.contains("class=\"counter\""));

        let solid: Vec<&str> = t.model.imports.solid.iter().map(String::as_str).collect();
        assert_eq!(solid, vec!["createSignal", "mergeProps"]);
        assert!(t.model.imports.solid_types.contains("Component"));
        assert!(t.model.declarations.is_empty());
        assert!(t.model.markers.is_empty());
    }

    #[test]
    fn test_one_record_per_pattern_and_input() {
        let t = transform(COUNTER, "Counter.tsx").unwrap();
        assert_eq!(count(&t, K::Prop), 2);
        assert_eq!(count(&t, K::State), 1);
        assert_eq!(count(&t, K::Handler), 1);
        assert_eq!(count(&t, K::Effect), 0);
        // shell plus one React import group
        assert_eq!(count(&t, K::Structural), 2);
        assert_eq!(t.records[0].source, "function component Counter");
        assert_eq!(t.model.handlers[0].mutators, vec!["setCount".to_string()]);
    }

    const PROFILE: &str = r#"
import React from 'react';

type State = { name: string; saving: boolean };

export class Profile extends React.Component<{ userId: string }, State> {
  state = { name: '', saving: false };
  timer?: number;

  componentDidMount() {
    this.timer = window.setInterval(() => this.refresh(), 5000);
  }

  componentWillUnmount() {
    window.clearInterval(this.timer);
  }

  refresh() {
    fetch(`/api/users/${this.props.userId}`)
      .then((r) => r.json())
      .then((u) => this.setState({ name: u.name }));
  }

  handleSave = () => {
    this.setState({ saving: true });
  };

  render() {
    const { name } = this.state;
    return <button onClick={this.handleSave} disabled={this.state.saving}>{name}</button>;
  }
}

export default Profile;
"#;

    #[test]
    fn test_class_component_becomes_signals() {
        let t = transform(PROFILE, "Profile.tsx").unwrap();
        let body = body(&t);
        assert!(body.contains("const [name, setName] = createSignal<string>('');"));
        assert!(body.contains("const [saving, setSaving] = createSignal<boolean>(false);"));
        assert!(body.contains("let timer: number;"));
        assert!(body.contains("const refresh = () => {"));
        assert!(body.contains("props.userId"));
        assert!(body.contains("setName(u.name)"));
        assert!(body.contains("const handleSave = () => {"));
        assert!(body.contains("onMount(() => {"));
        assert!(body.contains("onCleanup(() => {"));
        assert!(body.contains("timer = window.setInterval(() => refresh(), 5000);"));
        assert!(body.contains("disabled={saving()}"));
        assert!(body.contains(">{name()}</button>"));
        assert!(!body.contains("this."));
        assert_eq!(t.model.handlers[0].mutators, vec!["setSaving".to_string()]);
        assert_eq!(t.model.signals[0].setter, "setName");
        assert_eq!(t.records[0].source, "class component Profile");
    }

    #[test]
    fn test_class_without_render_is_rejected() {
        let src = "import React from 'react';\nexport default class Empty extends React.Component { state = { a: 1 }; }\n";
        let err = transform(src, "Empty.tsx").unwrap_err();
        assert!(matches!(err, MigrationError::MissingRender { .. }));
    }

    #[test]
    fn test_unsupported_lifecycle_is_rejected() {
        let src = r#"
import React from 'react';
export default class Boundary extends React.Component {
  componentDidCatch(error: Error) { console.error(error); }
  render() { return <div />; }
}
"#;
        let err = transform(src, "Boundary.tsx").unwrap_err();
        match err {
            MigrationError::UnsupportedConstruct { construct, .. } => {
                assert_eq!(construct, "componentDidCatch()");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_strategy_follows_tier_and_markers_follow_strategy() {
        let src = r#"
import { useState, useEffect } from 'react';
export default function Ticker() {
  const [n, setN] = useState(0);
  useEffect(() => { setN(1); });
  return <span>{n}</span>;
}
"#;
        let parsed = Extractor::default()
            .extract_parsed(src, Path::new("Ticker.tsx"))
            .unwrap();
        let logic = Analyzer::default()
            .analyze_tree(&parsed.model, &parsed.tree)
            .unwrap();

        let mut model = parsed.model.clone();
        model.complexity = Some(ComplexityTier::Complex);
        let hybrid = Transformer::default()
            .transform(&model, &logic, &parsed.tree)
            .unwrap();
        assert_eq!(hybrid.strategy, Strategy::HybridApproach);
        assert!(body(&hybrid).contains("/* TODO(refit): effect had no dependency list"));

        model.complexity = Some(ComplexityTier::Moderate);
        let mapped = Transformer::default()
            .transform(&model, &logic, &parsed.tree)
            .unwrap();
        assert!(!body(&mapped).contains(MARKER_TAG));
        // the ambiguity is still reported for the README
        assert_eq!(mapped.model.markers.len(), 1);

        model.complexity = Some(ComplexityTier::Critical);
        let manual = Transformer::default()
            .transform(&model, &logic, &parsed.tree)
            .unwrap();
        assert!(manual.manual_review);
        assert_eq!(manual.strategy, Strategy::ManualReviewRequired);
    }

    #[test]
    fn test_utility_module_keeps_declarations() {
        let src = r#"
import { useState } from 'react';
export function useToggle(initial = false) {
  const [on, setOn] = useState(initial);
  const toggle = () => setOn(!on);
  return [on, toggle] as const;
}
"#;
        let t = transform(src, "hooks/useToggle.ts").unwrap();
        assert_eq!(t.model.shell, Shell::Module);
        let text = body(&t);
        assert!(text.contains("const [on, setOn] = createSignal(initial);"));
        assert!(text.contains("setOn(!on())"));
        assert!(text.contains("return [on, toggle] as const;"));
        assert_eq!(t.model.named_exports, vec!["useToggle".to_string()]);
        assert!(!t.model.default_export);
    }

    #[test]
    fn test_derived_value_becomes_memo() {
        let src = r#"
import { useState } from 'react';
export default function Cart({ price }: { price: number }) {
  const [count, setCount] = useState(1);
  const total = count * price;
  const label: string = `${total} total`;
  return <button onClick={() => setCount(count + 1)}>{label}</button>;
}
"#;
        let t = transform(src, "Cart.tsx").unwrap();
        let body = body(&t);
        assert!(body.contains("const total = createMemo(() => count() * props.price);"));
        assert!(body.contains("const label = createMemo<string>(() => `${total()} total`);"));
        assert!(body.contains("onClick={() => setCount(count() + 1)}>{label()}</button>"));
        assert!(t.model.imports.solid.contains("createMemo"));
    }

    #[test]
    fn test_hook_hands_out_accessors() {
        let src = r#"
import { useState } from 'react';
export function useCounter(start = 0) {
  const [n, setN] = useState(start);
  const doubled = n * 2;
  return { n, doubled, inc: () => setN(n + 1) };
}
"#;
        let t = transform(src, "useCounter.ts").unwrap();
        let text = body(&t);
        assert!(text.contains("const doubled = createMemo(() => n() * 2);"));
        assert!(text.contains("return { n, doubled, inc: () => setN(n() + 1) };"));
    }

    #[test]
    fn test_transformation_is_deterministic() {
        let a = serde_json::to_string(&transform(PROFILE, "Profile.tsx").unwrap()).unwrap();
        let b = serde_json::to_string(&transform(PROFILE, "Profile.tsx").unwrap()).unwrap();
        assert_eq!(a, b);
    }
}
