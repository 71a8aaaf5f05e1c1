//! Parsed TSX sources and small node helpers shared by the stages.

use crate::error::{EngineResult, MigrationError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tree_sitter::{Node, Parser, Tree};

/// Build a parser configured for the TSX grammar.
pub fn tsx_parser() -> EngineResult<Parser> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_typescript::LANGUAGE_TSX.into())
        .map_err(|e| MigrationError::Language(e.to_string()))?;
    Ok(parser)
}

/// A parsed source file. Owns its text so nodes can be sliced without copies.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    tree: Tree,
    source: Arc<str>,
    path: PathBuf,
}

impl SyntaxTree {
    /// Parse and reject any tree containing error or missing nodes.
    pub fn parse(source: &str, path: &Path) -> EngineResult<Self> {
        let tree = Self::parse_lenient(source, path)?;
        if let Some((line, column)) = tree.first_error() {
            return Err(MigrationError::ParseFailure {
                path: path.to_path_buf(),
                line,
                column,
            });
        }
        Ok(tree)
    }

    /// Parse without rejecting recovered errors.
    pub fn parse_lenient(source: &str, path: &Path) -> EngineResult<Self> {
        let mut parser = tsx_parser()?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| MigrationError::ParseFailure {
                path: path.to_path_buf(),
                line: 1,
                column: 1,
            })?;
        Ok(Self {
            tree,
            source: Arc::from(source),
            path: path.to_path_buf(),
        })
    }

    /// 1-based position of the first error or missing node.
    pub fn first_error(&self) -> Option<(usize, usize)> {
        let root = self.root();
        if !root.has_error() {
            return None;
        }
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if node.is_error() || node.is_missing() {
                let pos = node.start_position();
                return Some((pos.row + 1, pos.column + 1));
            }
            let mut cursor = node.walk();
            let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev().filter(|c| c.has_error() || c.is_missing()));
        }
        Some((1, 1))
    }

    /// Root node.
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Full source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Path the source was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Text covered by a node.
    pub fn text(&self, node: Node<'_>) -> &str {
        text(&self.source, node)
    }
}

/// Text covered by a node.
pub fn text<'s>(source: &'s str, node: Node<'_>) -> &'s str {
    source.get(node.byte_range()).unwrap_or_default()
}

/// 1-based line of a node.
pub fn line(node: Node<'_>) -> usize {
    node.start_position().row + 1
}

/// Named children of a node.
pub fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// All children of a node, anonymous tokens included.
pub fn children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

/// Named descendants in document order, the node itself first.
pub fn descendants<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut out = Vec::new();
    let mut stack = vec![node];
    while let Some(n) = stack.pop() {
        out.push(n);
        let kids = named_children(n);
        stack.extend(kids.into_iter().rev());
    }
    out
}

/// Whether a node has a direct anonymous child with the given token.
pub fn has_token(node: Node<'_>, token: &str) -> bool {
    children(node)
        .iter()
        .any(|c| !c.is_named() && c.kind() == token)
}

/// Nearest ancestor whose kind is one of `kinds`.
pub fn enclosing<'t>(node: Node<'t>, kinds: &[&str]) -> Option<Node<'t>> {
    let mut current = node.parent();
    while let Some(n) = current {
        if kinds.contains(&n.kind()) {
            return Some(n);
        }
        current = n.parent();
    }
    None
}

/// Kinds that introduce a function body.
pub const FUNCTION_KINDS: &[&str] = &[
    "function_declaration",
    "function_expression",
    "function",
    "arrow_function",
    "method_definition",
    "generator_function_declaration",
];

/// Whether the node is any kind of function.
pub fn is_function(node: Node<'_>) -> bool {
    FUNCTION_KINDS.contains(&node.kind())
}

/// Whether the subtree contains JSX markup.
pub fn contains_jsx(node: Node<'_>) -> bool {
    descendants(node)
        .iter()
        .any(|n| matches!(n.kind(), "jsx_element" | "jsx_self_closing_element"))
}

/// Dotted callee path of a call (`fetch`, `axios.get`, `this.setState`).
pub fn callee_path(source: &str, call: Node<'_>) -> Option<String> {
    let function = call.child_by_field_name("function")?;
    dotted_path(source, function)
}

/// Dotted path of an identifier or member chain.
pub fn dotted_path(source: &str, node: Node<'_>) -> Option<String> {
    match node.kind() {
        "identifier" | "this" | "property_identifier" => Some(text(source, node).to_string()),
        "member_expression" => {
            let object = node.child_by_field_name("object")?;
            let property = node.child_by_field_name("property")?;
            let base = dotted_path(source, object)?;
            Some(format!("{}.{}", base, text(source, property)))
        }
        "non_null_expression" | "parenthesized_expression" => {
            dotted_path(source, node.named_child(0)?)
        }
        _ => None,
    }
}

/// Unquoted value of a string or template literal.
pub fn string_value(source: &str, node: Node<'_>) -> Option<String> {
    match node.kind() {
        "string" | "template_string" => {
            let raw = text(source, node);
            let inner = raw
                .get(1..raw.len().saturating_sub(1))
                .unwrap_or_default();
            Some(inner.to_string())
        }
        _ => None,
    }
}

/// Arguments of a call, named nodes only.
pub fn call_arguments<'t>(call: Node<'t>) -> Vec<Node<'t>> {
    call.child_by_field_name("arguments")
        .map(named_children)
        .unwrap_or_default()
}

/// Whether a name starts with an uppercase letter.
pub fn is_capitalized(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_uppercase())
}

/// Whether a name follows the `setX` mutator convention.
pub fn is_setter_name(name: &str) -> bool {
    name.strip_prefix("set")
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_ascii_uppercase())
}

/// `count` -> `setCount`.
pub fn setter_for(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => format!("set{}{}", first.to_ascii_uppercase(), chars.as_str()),
        None => "set".to_string(),
    }
}

/// Identifiers read inside a subtree, deduplicated, in first-seen order.
pub fn identifiers_read(source: &str, node: Node<'_>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for n in descendants(node) {
        let name = match n.kind() {
            "identifier" | "shorthand_property_identifier" => text(source, n),
            _ => continue,
        };
        if !out.iter().any(|s| s == name) {
            out.push(name.to_string());
        }
    }
    out
}

/// Declared name of a function, or of the variable it initializes.
pub fn function_name<'s>(source: &'s str, node: Node<'_>) -> Option<&'s str> {
    if let Some(name) = node.child_by_field_name("name") {
        return Some(text(source, name));
    }
    let declarator = node.parent().filter(|p| p.kind() == "variable_declarator")?;
    let name = declarator
        .child_by_field_name("name")
        .filter(|n| n.kind() == "identifier")?;
    Some(text(source, name))
}

/// Whether a name follows the `useX` hook convention.
pub fn is_hook_name(name: &str) -> bool {
    name.strip_prefix("use")
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_ascii_uppercase())
}

/// Body of a function-like node.
pub fn function_body<'t>(node: Node<'t>) -> Option<Node<'t>> {
    if is_function(node) {
        return node.child_by_field_name("body");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(src: &str) -> SyntaxTree {
        SyntaxTree::parse(src, Path::new("Test.tsx")).unwrap()
    }

    #[test]
    fn test_parse_reports_error_position() {
        let err = SyntaxTree::parse("const a = ;\nfunction (", Path::new("Bad.tsx")).unwrap_err();
        match err {
            MigrationError::ParseFailure { path, line, .. } => {
                assert_eq!(path, PathBuf::from("Bad.tsx"));
                assert!(line >= 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_callee_path_for_member_chain() {
        let t = tree("axios.get('/api/users');");
        let call = descendants(t.root())
            .into_iter()
            .find(|n| n.kind() == "call_expression")
            .unwrap();
        assert_eq!(callee_path(t.source(), call).as_deref(), Some("axios.get"));
        let args = call_arguments(call);
        assert_eq!(string_value(t.source(), args[0]).as_deref(), Some("/api/users"));
    }

    #[test]
    fn test_setter_naming() {
        assert!(is_setter_name("setCount"));
        assert!(!is_setter_name("settings"));
        assert_eq!(setter_for("loading"), "setLoading");
    }

    #[test]
    fn test_hook_names() {
        let t = tree("const useCounter = () => 1;\nfunction useTimer() {}\nfunction user() {}");
        let names: Vec<&str> = descendants(t.root())
            .into_iter()
            .filter(|n| is_function(*n))
            .filter_map(|f| function_name(t.source(), f))
            .collect();
        assert_eq!(names, vec!["useCounter", "useTimer", "user"]);
        assert!(is_hook_name("useCounter"));
        assert!(!is_hook_name("user"));
    }

    #[test]
    fn test_jsx_detection() {
        let t = tree("function A() { return <div className=\"x\" />; }");
        assert!(contains_jsx(t.root()));
        let t = tree("function b() { return 1; }");
        assert!(!contains_jsx(t.root()));
    }
}
