//! Node-by-node React -> Solid rewriting.
//!
//! The renderer walks the syntax tree and copies source text verbatim except
//! where a rule matches a node. Rules see the original node, so the text
//! between rewritten children (whitespace, comments, punctuation) survives.

use crate::dialect::{self, Dialect};
use crate::error::{EngineResult, MigrationError};
use crate::syntax;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tree_sitter::Node;

/// Prefix of inline review markers.
pub const MARKER_TAG: &str = "TODO(refit)";

/// Module providing `createReducer`.
pub const REDUCER_MODULE: &str = "@solid-primitives/reducer";

/// Statement kinds that can carry a leading review marker.
const STATEMENT_KINDS: &[&str] = &[
    "lexical_declaration",
    "variable_declaration",
    "expression_statement",
    "function_declaration",
    "if_statement",
    "return_statement",
];

// =============================================================================
// Imports and markers
// =============================================================================

/// Imports required by rewritten code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportPlan {
    /// Value imports from `solid-js`.
    pub solid: BTreeSet<String>,
    /// Type-only imports from `solid-js`.
    pub solid_types: BTreeSet<String>,
    /// Value imports from other target modules.
    pub extra: BTreeMap<String, BTreeSet<String>>,
    /// Non-framework import statements, already rewritten.
    pub preserved: Vec<String>,
}

impl ImportPlan {
    pub fn use_primitive(&mut self, name: &str) {
        self.solid.insert(name.to_string());
    }

    pub fn use_type(&mut self, name: &str) {
        self.solid_types.insert(name.to_string());
    }

    pub fn use_from(&mut self, module: &str, name: &str) {
        self.extra
            .entry(module.to_string())
            .or_default()
            .insert(name.to_string());
    }

    /// Import statements in emission order.
    pub fn statements(&self) -> Vec<String> {
        let mut out = Vec::new();
        if !self.solid.is_empty() {
            out.push(format!(
                "import {{ {} }} from \"solid-js\";",
                join(&self.solid)
            ));
        }
        if !self.solid_types.is_empty() {
            out.push(format!(
                "import type {{ {} }} from \"solid-js\";",
                join(&self.solid_types)
            ));
        }
        for (module, names) in &self.extra {
            out.push(format!("import {{ {} }} from \"{module}\";", join(names)));
        }
        out.extend(self.preserved.iter().cloned());
        out
    }
}

fn join(names: &BTreeSet<String>) -> String {
    names.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

/// An ambiguous construct flagged for review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewMarker {
    /// 1-based line in the original source.
    pub line: usize,
    /// What to check by hand.
    pub message: String,
}

// =============================================================================
// Renderer
// =============================================================================

/// Names `this.*` resolves to inside a class component.
#[derive(Debug, Clone, Default)]
pub(crate) struct ClassScope {
    /// Declared state keys, in declaration order.
    pub state_keys: Vec<String>,
}

pub(crate) struct Renderer<'s> {
    src: &'s str,
    component: String,
    marks: bool,
    /// Identifier -> replacement expression (`count` -> `count()`).
    pub reads: HashMap<String, String>,
    /// Names bound to `useRef`.
    pub refs: HashSet<String>,
    /// Local names imported from React.
    pub react_names: HashSet<String>,
    pub class: Option<ClassScope>,
    /// Heuristic detections awaiting a statement to mark, by line.
    pub heuristic_lines: BTreeMap<usize, Vec<String>>,
    /// Nodes rendered as nothing.
    pub dropped: HashSet<usize>,
    /// Name of the props parameter, when the component takes it whole.
    pub props_param: Option<String>,
    /// Body-level declarators rendered as memos.
    derived: HashSet<usize>,
    /// Functions that run once and own reactive state (components, hooks).
    reactive_bodies: HashSet<usize>,
    scope_root: Option<usize>,
    cleanup_scopes: Vec<usize>,
    pub imports: ImportPlan,
    pub markers: Vec<ReviewMarker>,
}

impl<'s> Renderer<'s> {
    pub fn new(src: &'s str, component: impl Into<String>, marks: bool) -> Self {
        Self {
            src,
            component: component.into(),
            marks,
            reads: HashMap::new(),
            refs: HashSet::new(),
            react_names: HashSet::new(),
            class: None,
            heuristic_lines: BTreeMap::new(),
            dropped: HashSet::new(),
            props_param: None,
            derived: HashSet::new(),
            reactive_bodies: HashSet::new(),
            scope_root: None,
            cleanup_scopes: Vec::new(),
            imports: ImportPlan::default(),
            markers: Vec::new(),
        }
    }

    /// Node whose parameters are not treated as shadowing (the component itself).
    pub fn set_scope_root(&mut self, node: Option<Node<'_>>) {
        self.scope_root = node.map(|n| n.id());
    }

    fn text(&self, node: Node<'_>) -> &'s str {
        syntax::text(self.src, node)
    }

    /// Record an ambiguity. Returns the inline marker when the strategy places them.
    pub fn flag(&mut self, line: usize, message: &str) -> String {
        if !self
            .markers
            .iter()
            .any(|m| m.line == line && m.message == message)
        {
            self.markers.push(ReviewMarker {
                line,
                message: message.to_string(),
            });
        }
        if self.marks {
            format!("/* {MARKER_TAG}: {message} */ ")
        } else {
            String::new()
        }
    }

    /// Record heuristic detections no statement picked up.
    pub fn flush_heuristics(&mut self) {
        let pending = std::mem::take(&mut self.heuristic_lines);
        for (line, messages) in pending {
            for message in messages {
                self.flag(line, &message);
            }
        }
    }

    fn unsupported(&self, construct: impl Into<String>) -> MigrationError {
        MigrationError::UnsupportedConstruct {
            component: self.component.clone(),
            construct: construct.into(),
        }
    }

    /// Render a node with every applicable rule.
    pub fn render(&mut self, node: Node<'_>) -> EngineResult<String> {
        if self.dropped.contains(&node.id()) {
            return Ok(String::new());
        }
        let prefix = self.heuristic_prefix(node);
        let body = match self.rewrite(node)? {
            Some(out) => out,
            None => self.render_children(node)?,
        };
        Ok(prefix + &body)
    }

    /// Source text of `node` with each child rendered.
    pub fn render_children(&mut self, node: Node<'_>) -> EngineResult<String> {
        let mut out = String::with_capacity(node.byte_range().len());
        let mut pos = node.start_byte();
        for child in syntax::children(node) {
            out.push_str(self.src.get(pos..child.start_byte()).unwrap_or_default());
            out.push_str(&self.render(child)?);
            pos = child.end_byte();
        }
        out.push_str(self.src.get(pos..node.end_byte()).unwrap_or_default());
        Ok(out)
    }

    /// Rendered statements of a block, without the braces. Empty results are skipped.
    pub fn render_statements(&mut self, block: Node<'_>) -> EngineResult<Vec<String>> {
        let mut out = Vec::new();
        for statement in syntax::named_children(block) {
            let column = statement.start_position().column;
            let rendered = self.render(statement)?;
            let rendered = dedent(rendered.trim(), column);
            if !rendered.is_empty() {
                out.push(rendered);
            }
        }
        Ok(out)
    }

    fn heuristic_prefix(&mut self, node: Node<'_>) -> String {
        if !STATEMENT_KINDS.contains(&node.kind()) {
            return String::new();
        }
        self.line_marker(syntax::line(node))
    }

    /// Markers for heuristic detections on `line`, consumed once.
    pub fn line_marker(&mut self, line: usize) -> String {
        let Some(messages) = self.heuristic_lines.remove(&line) else {
            return String::new();
        };
        messages
            .iter()
            .map(|m| self.flag(line, m))
            .collect::<String>()
    }

    fn rewrite(&mut self, node: Node<'_>) -> EngineResult<Option<String>> {
        match node.kind() {
            "identifier" => Ok(self.rewrite_identifier(node)),
            "shorthand_property_identifier" => Ok(self.rewrite_shorthand(node)),
            "property_identifier" => Ok(self.rewrite_attribute_name(node)),
            "jsx_attribute" => self.rewrite_attribute(node),
            "jsx_opening_element" | "jsx_closing_element" => Ok(self.rewrite_fragment(node)),
            "member_expression" => Ok(self.rewrite_member(node)),
            "call_expression" => self.rewrite_call(node),
            "variable_declarator" => self.rewrite_declarator(node),
            "lexical_declaration" => self.rewrite_lexical(node),
            "return_statement" => self.rewrite_return(node),
            "nested_type_identifier" => Ok(self.rewrite_nested_type(node)),
            "type_identifier" => Ok(self.rewrite_type_identifier(node)),
            "generic_type" => self.rewrite_generic_type(node),
            _ => Ok(None),
        }
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    fn rewrite_identifier(&self, node: Node<'_>) -> Option<String> {
        let name = self.text(node);
        let replacement = self.reads.get(name)?;
        if is_binding_position(node) || self.shadowed(node, name) {
            return None;
        }
        let entry = match node.parent() {
            Some(p) if p.kind() == "array" => Some(node),
            Some(p)
                if p.kind() == "pair"
                    && p.child_by_field_name("value")
                        .is_some_and(|v| v.id() == node.id()) =>
            {
                Some(p)
            }
            _ => None,
        };
        if entry.is_some_and(|e| self.hands_out_accessor(e, name, replacement)) {
            return None;
        }
        Some(replacement.clone())
    }

    fn rewrite_shorthand(&self, node: Node<'_>) -> Option<String> {
        let name = self.text(node);
        let replacement = self.reads.get(name)?;
        if self.shadowed(node, name) || self.hands_out_accessor(node, name, replacement) {
            return None;
        }
        Some(format!("{name}: {replacement}"))
    }

    /// An accessor placed in an object or tuple a hook returns stays an
    /// accessor, so callers keep tracking it.
    fn hands_out_accessor(&self, entry: Node<'_>, name: &str, replacement: &str) -> bool {
        if replacement != format!("{name}()") {
            return false;
        }
        let Some(container) = entry
            .parent()
            .filter(|p| matches!(p.kind(), "object" | "array"))
        else {
            return false;
        };
        let mut outer = container.parent();
        while let Some(p) = outer.filter(|p| {
            matches!(
                p.kind(),
                "parenthesized_expression" | "as_expression" | "satisfies_expression"
            )
        }) {
            outer = p.parent();
        }
        let owner = match outer {
            Some(o) if o.kind() == "return_statement" => syntax::enclosing(o, syntax::FUNCTION_KINDS),
            Some(o) if o.kind() == "arrow_function" => Some(o),
            _ => None,
        };
        owner.is_some_and(|f| self.reactive_bodies.contains(&f.id()))
    }

    /// Treat `function` as a body that runs once. Its `const` declarators that
    /// read reactive values outside a function become memos, read as `x()`.
    pub fn mark_derived(&mut self, function: Node<'_>) {
        self.reactive_bodies.insert(function.id());
        let Some(block) = syntax::function_body(function).filter(|b| b.kind() == "statement_block")
        else {
            return;
        };
        for statement in syntax::named_children(block) {
            if statement.kind() != "lexical_declaration" || !syntax::has_token(statement, "const") {
                continue;
            }
            for declarator in syntax::named_children(statement) {
                if declarator.kind() != "variable_declarator" || self.dropped.contains(&declarator.id()) {
                    continue;
                }
                let (Some(name), Some(value)) = (
                    declarator.child_by_field_name("name"),
                    declarator.child_by_field_name("value"),
                ) else {
                    continue;
                };
                if syntax::is_function(value) {
                    continue;
                }
                let hook = value.kind() == "call_expression"
                    && syntax::callee_path(self.src, value).is_some_and(|c| self.is_react_binding(&c));
                if hook || !self.reads_untracked(value) {
                    continue;
                }
                if name.kind() != "identifier" {
                    self.heuristic_lines
                        .entry(syntax::line(statement))
                        .or_default()
                        .push("destructured value reads reactive state once; it will not update".to_string());
                    continue;
                }
                let name = self.text(name);
                self.reads.insert(name.to_string(), format!("{name}()"));
                self.derived.insert(declarator.id());
            }
        }
    }

    /// Whether `node` reads a reactive value outside any function or JSX expression.
    fn reads_untracked(&self, node: Node<'_>) -> bool {
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            if syntax::is_function(n) || n.kind() == "jsx_expression" {
                continue;
            }
            if self.is_reactive_read(n) {
                return true;
            }
            stack.extend(syntax::named_children(n));
        }
        false
    }

    fn is_reactive_read(&self, node: Node<'_>) -> bool {
        match node.kind() {
            "identifier" | "shorthand_property_identifier" => {
                let name = self.text(node);
                self.reads.contains_key(name)
                    && !is_binding_position(node)
                    && !self.shadowed(node, name)
            }
            "member_expression" => {
                let Some(object) = node.child_by_field_name("object") else {
                    return false;
                };
                if self.class.is_some() {
                    let path = syntax::dotted_path(self.src, node).unwrap_or_default();
                    let property = node
                        .child_by_field_name("property")
                        .map(|p| self.text(p))
                        .unwrap_or_default();
                    if ["this.state", "this.props"]
                        .iter()
                        .any(|base| path == *base || path.starts_with(&format!("{base}.")))
                        || (object.kind() == "this" && self.reads.contains_key(property))
                    {
                        return true;
                    }
                }
                object.kind() == "identifier"
                    && self.props_param.as_deref() == Some(self.text(object))
                    && !self.shadowed(object, self.text(object))
            }
            _ => false,
        }
    }

    /// Whether `name` is rebound between `node` and the component scope.
    fn shadowed(&self, node: Node<'_>, name: &str) -> bool {
        let mut current = node.parent();
        while let Some(n) = current {
            if Some(n.id()) == self.scope_root {
                return false;
            }
            if syntax::is_function(n) && binds_parameter(self.src, n, name) {
                return true;
            }
            if n.kind() == "catch_clause"
                && n.child_by_field_name("parameter")
                    .is_some_and(|p| binds(self.src, p, name))
            {
                return true;
            }
            let in_component_body = n
                .parent()
                .is_some_and(|p| Some(p.id()) == self.scope_root);
            if n.kind() == "statement_block"
                && !in_component_body
                && declares_locally(self.src, n, name, &self.derived)
            {
                return true;
            }
            current = n.parent();
        }
        false
    }

    fn rewrite_member(&self, node: Node<'_>) -> Option<String> {
        let object = node.child_by_field_name("object")?;
        let property = self.text(node.child_by_field_name("property")?);

        if object.kind() == "identifier" && property == "current" {
            let name = self.text(object);
            if self.refs.contains(name) && !self.shadowed(object, name) {
                return Some(name.to_string());
            }
        }

        self.class.as_ref()?;
        if object.kind() == "member_expression" {
            return match syntax::dotted_path(self.src, object)?.as_str() {
                "this.state" => Some(format!("{property}()")),
                "this.props" => Some(format!("props.{property}")),
                _ => None,
            };
        }
        if object.kind() != "this" {
            return None;
        }
        match property {
            "state" => Some(self.state_snapshot()),
            "props" => Some("props".to_string()),
            "setState" | "forceUpdate" => None,
            other => Some(
                self.reads
                    .get(other)
                    .cloned()
                    .unwrap_or_else(|| other.to_string()),
            ),
        }
    }

    fn state_snapshot(&self) -> String {
        let keys = self
            .class
            .as_ref()
            .map(|c| c.state_keys.as_slice())
            .unwrap_or_default();
        let fields: Vec<String> = keys.iter().map(|k| format!("{k}: {k}()")).collect();
        format!("({{ {} }})", fields.join(", "))
    }

    // -------------------------------------------------------------------------
    // JSX
    // -------------------------------------------------------------------------

    fn rewrite_attribute_name(&self, node: Node<'_>) -> Option<String> {
        let parent = node.parent()?;
        if parent.kind() != "jsx_attribute" {
            return None;
        }
        dialect::rename_attribute(self.text(node)).map(str::to_string)
    }

    fn rewrite_attribute(&mut self, node: Node<'_>) -> EngineResult<Option<String>> {
        let Some(name) = node.named_child(0) else {
            return Ok(None);
        };
        let value = node
            .named_child(1)
            .filter(|v| v.kind() == "jsx_expression")
            .and_then(|v| v.named_child(0));
        match self.text(name) {
            "key" => Ok(Some(String::new())),
            "dangerouslySetInnerHTML" => {
                let html = value
                    .filter(|v| v.kind() == "object")
                    .and_then(|o| object_entry(self.src, o, "__html"));
                match html {
                    Some(html) => Ok(Some(format!("innerHTML={{{}}}", self.render(html)?))),
                    None => Ok(None),
                }
            }
            "style" => match value.filter(|v| v.kind() == "object") {
                Some(object) => {
                    let rendered = self.render_style(object)?;
                    Ok(Some(format!("style={{{rendered}}}")))
                }
                None => Ok(None),
            },
            _ => Ok(None),
        }
    }

    /// Inline style objects take CSS property names in Solid.
    fn render_style(&mut self, object: Node<'_>) -> EngineResult<String> {
        let mut entries = Vec::new();
        for entry in syntax::named_children(object) {
            match entry.kind() {
                "pair" => {
                    let (Some(key), Some(value)) = (
                        entry.child_by_field_name("key"),
                        entry.child_by_field_name("value"),
                    ) else {
                        continue;
                    };
                    let property = crate::analyze::property_key(self.src, key);
                    let rendered = self.render(value)?;
                    let rendered = if value.kind() == "number" && rendered != "0" {
                        format!("\"{rendered}px\"")
                    } else {
                        rendered
                    };
                    entries.push(format!("\"{}\": {rendered}", kebab_case(&property)));
                }
                _ => entries.push(self.render(entry)?),
            }
        }
        Ok(format!("{{ {} }}", entries.join(", ")))
    }

    fn rewrite_fragment(&self, node: Node<'_>) -> Option<String> {
        let name = self.text(node.child_by_field_name("name")?);
        let is_fragment = name == "React.Fragment"
            || (name == "Fragment" && self.react_names.contains("Fragment"));
        if !is_fragment {
            return None;
        }
        Some(if node.kind() == "jsx_opening_element" {
            "<>".to_string()
        } else {
            "</>".to_string()
        })
    }

    // -------------------------------------------------------------------------
    // Calls
    // -------------------------------------------------------------------------

    fn is_react_binding(&self, callee: &str) -> bool {
        callee.starts_with("React.") || self.react_names.contains(callee)
    }

    fn rewrite_call(&mut self, node: Node<'_>) -> EngineResult<Option<String>> {
        let Some(callee) = syntax::callee_path(self.src, node) else {
            return Ok(None);
        };
        let args = syntax::call_arguments(node);
        let bare = Dialect::React.normalize_callee(&callee);

        match callee.as_str() {
            "this.setState" if self.class.is_some() => {
                return self.rewrite_set_state(node, &args).map(Some)
            }
            "this.forceUpdate" => return Err(self.unsupported("this.forceUpdate()")),
            _ => {}
        }
        if !self.is_react_binding(&callee) {
            return Ok(None);
        }

        match bare {
            "useEffect" | "useLayoutEffect" => self.rewrite_effect(node, &args).map(Some),
            "useCallback" => match args.first() {
                Some(callback) => self.render(*callback).map(Some),
                None => Ok(None),
            },
            "useMemo" => {
                let Some(compute) = args.first().copied() else {
                    return Ok(None);
                };
                self.imports.use_primitive("createMemo");
                let type_args = self.type_arguments(node)?;
                let rendered = self.render(compute)?;
                Ok(Some(format!("createMemo{type_args}({rendered})")))
            }
            "useContext" | "createContext" => {
                self.imports.use_primitive(bare);
                let type_args = self.type_arguments(node)?;
                let rendered = match node.child_by_field_name("arguments") {
                    Some(a) => self.render(a)?,
                    None => "()".to_string(),
                };
                Ok(Some(format!("{bare}{type_args}{rendered}")))
            }
            "cloneElement" | "createElement" | "createPortal" | "Children.only" => {
                Err(self.unsupported(format!("{callee}()")))
            }
            _ => Ok(None),
        }
    }

    fn type_arguments(&mut self, call: Node<'_>) -> EngineResult<String> {
        match call.child_by_field_name("type_arguments") {
            Some(t) => self.render(t),
            None => Ok(String::new()),
        }
    }

    fn rewrite_effect(&mut self, node: Node<'_>, args: &[Node<'_>]) -> EngineResult<String> {
        let Some(callback) = args.first().copied() else {
            return self.render_children(node);
        };
        let line = syntax::line(node);
        self.cleanup_scopes.push(callback.id());
        let body = self.render(callback);
        self.cleanup_scopes.pop();
        let body = body?;

        match args.get(1).copied().filter(|d| d.kind() == "array") {
            Some(deps) => {
                let items = syntax::named_children(deps);
                if items.is_empty() {
                    self.imports.use_primitive("onMount");
                    return Ok(format!("onMount({body})"));
                }
                let rendered = items
                    .into_iter()
                    .map(|d| self.render(d))
                    .collect::<EngineResult<Vec<_>>>()?;
                self.imports.use_primitive("createEffect");
                self.imports.use_primitive("on");
                Ok(format!(
                    "createEffect(on(() => [{}], {body}))",
                    rendered.join(", ")
                ))
            }
            None => {
                let marker = self.flag(
                    line,
                    "effect had no dependency list; it now re-runs when any signal it reads changes",
                );
                self.imports.use_primitive("createEffect");
                Ok(format!("{marker}createEffect({body})"))
            }
        }
    }

    fn rewrite_return(&mut self, node: Node<'_>) -> EngineResult<Option<String>> {
        let Some(scope) = self.cleanup_scopes.last().copied() else {
            return Ok(None);
        };
        let Some(value) = node.named_child(0) else {
            return Ok(None);
        };
        let owner = syntax::enclosing(node, syntax::FUNCTION_KINDS).map(|f| f.id());
        if owner != Some(scope) {
            return Ok(None);
        }
        let rendered = self.render(value)?;
        self.imports.use_primitive("onCleanup");
        Ok(Some(format!("onCleanup({rendered});")))
    }

    fn rewrite_set_state(&mut self, node: Node<'_>, args: &[Node<'_>]) -> EngineResult<String> {
        let Some(update) = args.first().copied() else {
            return Ok(String::new());
        };
        let line = syntax::line(node);
        let mut statements = Vec::new();
        let mut marker = String::new();

        if update.kind() == "object" {
            for entry in syntax::named_children(update) {
                match entry.kind() {
                    "pair" => {
                        let (Some(key), Some(value)) = (
                            entry.child_by_field_name("key"),
                            entry.child_by_field_name("value"),
                        ) else {
                            continue;
                        };
                        let key = crate::analyze::property_key(self.src, key);
                        let value = self.render(value)?;
                        statements.push(format!("{}({value})", syntax::setter_for(&key)));
                    }
                    "shorthand_property_identifier" => {
                        let key = self.text(entry);
                        let value = match self.reads.get(key) {
                            Some(r) if !self.shadowed(entry, key) => r.clone(),
                            _ => key.to_string(),
                        };
                        statements.push(format!("{}({value})", syntax::setter_for(key)));
                    }
                    "spread_element" => {
                        return Err(self.unsupported("spread inside setState"));
                    }
                    _ => {}
                }
            }
        } else {
            marker = self.flag(line, "functional setState now receives a snapshot of current state");
            let updater = self.render(update)?;
            let snapshot = self.state_snapshot();
            statements.push(format!("const next = ({updater})({snapshot}, props) ?? {{}}"));
            let keys = self
                .class
                .as_ref()
                .map(|c| c.state_keys.clone())
                .unwrap_or_default();
            for key in keys {
                statements.push(format!(
                    "if (\"{key}\" in next) {}(next.{key})",
                    syntax::setter_for(&key)
                ));
            }
        }

        if let Some(callback) = args.get(1).copied() {
            let callback = self.render(callback)?;
            statements.push(format!("({callback})()"));
        }

        if statements.len() == 1 && update.kind() == "object" {
            return Ok(statements.remove(0));
        }
        self.imports.use_primitive("batch");
        Ok(format!("{marker}batch(() => {{ {}; }})", statements.join("; ")))
    }

    // -------------------------------------------------------------------------
    // Declarations
    // -------------------------------------------------------------------------

    fn rewrite_declarator(&mut self, node: Node<'_>) -> EngineResult<Option<String>> {
        let (Some(pattern), Some(value)) = (
            node.child_by_field_name("name"),
            node.child_by_field_name("value"),
        ) else {
            return Ok(None);
        };
        if self.derived.contains(&node.id()) {
            return self.rewrite_derived(node, pattern, value).map(Some);
        }
        if pattern.kind() != "array_pattern" || value.kind() != "call_expression" {
            return Ok(None);
        }
        let Some(callee) = syntax::callee_path(self.src, value) else {
            return Ok(None);
        };
        if !self.is_react_binding(&callee) {
            return Ok(None);
        }
        let args = syntax::call_arguments(value);
        let pattern = self.text(pattern);

        match Dialect::React.normalize_callee(&callee) {
            "useState" => {
                self.imports.use_primitive("createSignal");
                let type_args = self.type_arguments(value)?;
                let init = match args.first().copied() {
                    Some(lazy) if syntax::is_function(lazy) => format!("({})()", self.render(lazy)?),
                    Some(init) => self.render(init)?,
                    None => String::new(),
                };
                Ok(Some(format!("{pattern} = createSignal{type_args}({init})")))
            }
            "useReducer" => {
                self.imports.use_from(REDUCER_MODULE, "createReducer");
                let mut rendered = args
                    .iter()
                    .take(3)
                    .map(|a| self.render(*a))
                    .collect::<EngineResult<Vec<_>>>()?;
                if rendered.len() == 3 {
                    // lazy initializer: useReducer(reducer, arg, init)
                    let init = rendered.pop().unwrap_or_default();
                    let arg = rendered.pop().unwrap_or_default();
                    rendered.push(format!("({init})({arg})"));
                }
                Ok(Some(format!("{pattern} = createReducer({})", rendered.join(", "))))
            }
            _ => Ok(None),
        }
    }

    /// `const total = count * 2` -> `const total = createMemo(() => count() * 2)`.
    fn rewrite_derived(
        &mut self,
        declarator: Node<'_>,
        name: Node<'_>,
        value: Node<'_>,
    ) -> EngineResult<String> {
        let type_args = match declarator.child_by_field_name("type") {
            Some(t) => format!("<{}>", self.render(t)?.trim_start_matches(':').trim()),
            None => String::new(),
        };
        let rendered = self.render(value)?;
        let rendered = if value.kind() == "object" {
            format!("({rendered})")
        } else {
            rendered
        };
        self.imports.use_primitive("createMemo");
        Ok(format!("{} = createMemo{type_args}(() => {rendered})", self.text(name)))
    }

    fn rewrite_lexical(&mut self, node: Node<'_>) -> EngineResult<Option<String>> {
        let declarators: Vec<Node<'_>> = syntax::named_children(node)
            .into_iter()
            .filter(|d| d.kind() == "variable_declarator")
            .collect();
        if declarators.is_empty() {
            return Ok(None);
        }
        if declarators.iter().all(|d| self.dropped.contains(&d.id())) {
            return Ok(Some(String::new()));
        }
        if let [declarator] = declarators.as_slice() {
            return self.rewrite_ref(*declarator);
        }
        Ok(None)
    }

    fn rewrite_ref(&mut self, declarator: Node<'_>) -> EngineResult<Option<String>> {
        let (Some(name), Some(value)) = (
            declarator.child_by_field_name("name"),
            declarator.child_by_field_name("value"),
        ) else {
            return Ok(None);
        };
        if name.kind() != "identifier" || value.kind() != "call_expression" {
            return Ok(None);
        }
        let is_ref = syntax::callee_path(self.src, value).is_some_and(|c| {
            self.is_react_binding(&c) && Dialect::React.normalize_callee(&c) == "useRef"
        });
        if !is_ref {
            return Ok(None);
        }

        let name = self.text(name);
        let marker = self.flag(
            syntax::line(declarator),
            "ref is now a plain variable; check reads that expected `.current`",
        );
        let element = value
            .child_by_field_name("type_arguments")
            .and_then(|t| t.named_child(0));
        let annotation = match element {
            Some(t) => format!(": {} | undefined", self.render(t)?),
            None => String::new(),
        };
        let init = syntax::call_arguments(value)
            .into_iter()
            .next()
            .filter(|a| !matches!(a.kind(), "null" | "undefined"));
        Ok(Some(match init {
            Some(init) => format!("{marker}let {name}{annotation} = {};", self.render(init)?),
            None => format!("{marker}let {name}{annotation};"),
        }))
    }

    // -------------------------------------------------------------------------
    // Types
    // -------------------------------------------------------------------------

    fn note_type(&mut self, renamed: &str) {
        if renamed.starts_with("JSX.") {
            self.imports.use_type("JSX");
        } else if renamed == "Component" {
            self.imports.use_type("Component");
        }
    }

    fn rewrite_nested_type(&mut self, node: Node<'_>) -> Option<String> {
        let text = self.text(node);
        if text.starts_with("JSX.") {
            self.imports.use_type("JSX");
            return None;
        }
        let bare = text.strip_prefix("React.")?;
        let renamed = dialect::rename_type(bare).unwrap_or(bare);
        self.note_type(renamed);
        Some(renamed.to_string())
    }

    fn rewrite_type_identifier(&mut self, node: Node<'_>) -> Option<String> {
        let name = self.text(node);
        if !self.react_names.contains(name) {
            return None;
        }
        let renamed = dialect::rename_type(name)?;
        self.note_type(renamed);
        Some(renamed.to_string())
    }

    fn rewrite_generic_type(&mut self, node: Node<'_>) -> EngineResult<Option<String>> {
        let Some(name) = node.child_by_field_name("name") else {
            return Ok(None);
        };
        let full = self.text(name);
        let bare = full.strip_prefix("React.");
        let from_react = bare.is_some() || self.react_names.contains(full);
        let bare = bare.unwrap_or(full);
        if !from_react || !dialect::EVENT_TYPES.contains(&bare) {
            return Ok(None);
        }
        let element = node
            .child_by_field_name("type_arguments")
            .or_else(|| {
                syntax::named_children(node)
                    .into_iter()
                    .find(|c| c.kind() == "type_arguments")
            })
            .and_then(|a| a.named_child(0));
        let element = element.map(|e| self.render(e)).transpose()?;
        Ok(Some(dialect::event_type(bare, element.as_deref())))
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Whether an identifier is being bound rather than read.
fn is_binding_position(node: Node<'_>) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    let is_field = |field: &str| {
        parent
            .child_by_field_name(field)
            .is_some_and(|c| c.id() == node.id())
    };
    match parent.kind() {
        "variable_declarator" => is_field("name"),
        "required_parameter" | "optional_parameter" => is_field("pattern"),
        "arrow_function" => is_field("parameter"),
        "function_declaration" | "function_expression" | "function" | "class_declaration"
        | "method_definition" => is_field("name"),
        "pair_pattern" => is_field("value"),
        "object_assignment_pattern" | "assignment_pattern" | "assignment_expression" => {
            is_field("left")
        }
        "jsx_opening_element" | "jsx_closing_element" | "jsx_self_closing_element" => {
            is_field("name")
        }
        "catch_clause" => is_field("parameter"),
        "array_pattern" | "object_pattern" | "rest_pattern" | "formal_parameters"
        | "import_specifier" | "import_clause" | "namespace_import" | "export_specifier"
        | "labeled_statement" | "break_statement" | "continue_statement" => true,
        _ => false,
    }
}

fn binds(src: &str, pattern: Node<'_>, name: &str) -> bool {
    syntax::descendants(pattern).into_iter().any(|n| {
        matches!(n.kind(), "identifier" | "shorthand_property_identifier_pattern")
            && syntax::text(src, n) == name
    })
}

fn binds_parameter(src: &str, function: Node<'_>, name: &str) -> bool {
    function
        .child_by_field_name("parameters")
        .or_else(|| function.child_by_field_name("parameter"))
        .is_some_and(|p| binds(src, p, name))
}

/// Whether a block declares `name` itself. Hook declarations and memos do not count.
fn declares_locally(src: &str, block: Node<'_>, name: &str, derived: &HashSet<usize>) -> bool {
    syntax::named_children(block).into_iter().any(|stmt| match stmt.kind() {
        "lexical_declaration" | "variable_declaration" => syntax::named_children(stmt)
            .into_iter()
            .filter(|d| d.kind() == "variable_declarator")
            .any(|d| {
                let hook = d
                    .child_by_field_name("value")
                    .and_then(|v| syntax::callee_path(src, v))
                    .is_some_and(|c| {
                        matches!(
                            Dialect::React.normalize_callee(&c),
                            "useState" | "useReducer" | "useMemo"
                        )
                    });
                !hook
                    && !derived.contains(&d.id())
                    && d
                        .child_by_field_name("name")
                        .is_some_and(|n| binds(src, n, name))
            }),
        "function_declaration" => stmt
            .child_by_field_name("name")
            .is_some_and(|n| syntax::text(src, n) == name),
        _ => false,
    })
}

fn object_entry<'t>(src: &str, object: Node<'t>, key: &str) -> Option<Node<'t>> {
    syntax::named_children(object).into_iter().find_map(|pair| {
        if pair.kind() != "pair" {
            return None;
        }
        let k = pair.child_by_field_name("key")?;
        if crate::analyze::property_key(src, k) != key {
            return None;
        }
        pair.child_by_field_name("value")
    })
}

/// `marginTop` -> `margin-top`.
pub fn kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Remove up to `column` leading spaces from every line after the first.
pub fn dedent(text: &str, column: usize) -> String {
    let mut lines = text.lines();
    let mut out = lines.next().unwrap_or_default().to_string();
    for line in lines {
        out.push('\n');
        let strip = line
            .chars()
            .take(column)
            .take_while(|c| *c == ' ')
            .count();
        out.push_str(&line[strip..]);
    }
    out
}

/// Indent every non-empty line by `level` two-space steps.
pub fn indent(text: &str, level: usize) -> String {
    let pad = "  ".repeat(level);
    text.lines()
        .map(|l| {
            if l.trim().is_empty() {
                String::new()
            } else {
                format!("{pad}{l}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::SyntaxTree;
    use std::path::Path;

    fn render_with(src: &str, setup: impl FnOnce(&mut Renderer<'_>)) -> (String, ImportPlan) {
        let tree = SyntaxTree::parse(src, Path::new("Test.tsx")).unwrap();
        let mut renderer = Renderer::new(tree.source(), "Test", true);
        renderer.react_names.extend(
            ["useState", "useEffect", "useRef", "useMemo", "useCallback"].map(String::from),
        );
        setup(&mut renderer);
        let out = renderer.render(tree.root()).unwrap();
        (out, renderer.imports)
    }

    #[test]
    fn test_state_reads_become_accessor_calls() {
        let src = "const [count, setCount] = useState<number>(0);\nconst label = `n=${count}`;\nsetCount((count) => count + 1);\n";
        let (out, imports) = render_with(src, |r| {
            r.reads.insert("count".into(), "count()".into());
        });
        assert!(out.contains("const [count, setCount] = createSignal<number>(0);"));
        assert!(out.contains("`n=${count()}`"));
        // the updater parameter shadows the signal
        assert!(out.contains("setCount((count) => count + 1);"));
        assert!(imports.solid.contains("createSignal"));
    }

    #[test]
    fn test_effect_with_cleanup_and_dependencies() {
        let src = "useEffect(() => {\n  const id = setInterval(tick, delay);\n  return () => clearInterval(id);\n}, [delay]);\n";
        let (out, imports) = render_with(src, |r| {
            r.reads.insert("delay".into(), "props.delay".into());
        });
        assert!(out.starts_with("createEffect(on(() => [props.delay], () => {"));
        assert!(out.contains("onCleanup(() => clearInterval(id));"));
        assert!(out.contains("setInterval(tick, props.delay)"));
        let solid: Vec<&str> = imports.solid.iter().map(String::as_str).collect();
        assert_eq!(solid, vec!["createEffect", "on", "onCleanup"]);
    }

    #[test]
    fn test_mount_effect_and_unlisted_effect() {
        let (out, _) = render_with("useEffect(() => { load(); }, []);", |_| {});
        assert_eq!(out, "onMount(() => { load(); });");

        let (out, _) = render_with("useEffect(() => { sync(); });", |_| {});
        assert!(out.starts_with("/* TODO(refit): effect had no dependency list"));
        assert!(out.contains("createEffect(() => { sync(); })"));
    }

    #[test]
    fn test_ref_and_attribute_rules() {
        let src = "const inputRef = useRef<HTMLInputElement>(null);\nconst el = <label htmlFor=\"a\" className=\"x\" key={id} onClick={() => inputRef.current.focus()} />;\n";
        let (out, _) = render_with(src, |r| {
            r.refs.insert("inputRef".into());
        });
        assert!(out.contains("let inputRef: HTMLInputElement | undefined;"));
        assert!(out.contains("for=\"a\""));
        assert!(out.contains("class=\"x\""));
        assert!(!out.contains("key="));
        assert!(out.contains("inputRef.focus()"));
    }

    #[test]
    fn test_style_object_uses_css_names() {
        let (out, _) = render_with("const el = <div style={{ marginTop: 4, color: c }} />;", |_| {});
        assert!(out.contains("style={{ \"margin-top\": \"4px\", \"color\": c }}"));
    }

    #[test]
    fn test_react_types_are_renamed() {
        let src = "type P = { children: React.ReactNode; onChange: (e: React.ChangeEvent<HTMLInputElement>) => void };";
        let (out, imports) = render_with(src, |_| {});
        assert!(out.contains("children: JSX.Element"));
        assert!(out.contains("Event & { currentTarget: HTMLInputElement; target: HTMLInputElement }"));
        assert!(imports.solid_types.contains("JSX"));
    }

    #[test]
    fn test_class_set_state_and_members() {
        let src = "class A { go() { this.setState({ count: this.state.count + 1, label }); this.props.onGo(this.timer); } }";
        let (out, imports) = render_with(src, |r| {
            r.class = Some(ClassScope {
                state_keys: vec!["count".into(), "label".into()],
            });
        });
        assert!(out.contains("batch(() => { setCount(count() + 1); setLabel(label); })"));
        assert!(out.contains("props.onGo(timer)"));
        assert!(imports.solid.contains("batch"));
    }

    #[test]
    fn test_unsupported_calls_are_rejected() {
        let tree = SyntaxTree::parse("React.cloneElement(child, {});", Path::new("T.tsx")).unwrap();
        let mut renderer = Renderer::new(tree.source(), "T", false);
        let err = renderer.render(tree.root()).unwrap_err();
        assert!(matches!(err, MigrationError::UnsupportedConstruct { .. }));
    }

    #[test]
    fn test_dedent_and_indent() {
        assert_eq!(dedent("a {\n      b;\n    }", 4), "a {\n  b;\n}");
        assert_eq!(indent("a\n\nb", 1), "  a\n\n  b");
        assert_eq!(kebab_case("borderTopWidth"), "border-top-width");
    }
}
