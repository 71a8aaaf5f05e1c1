//! Business logic recognition over the syntax tree.
//!
//! Every pattern is recognized from node shapes: declarator patterns for state,
//! call shapes with resolved callees for effects and external calls, JSX
//! attribute bindings for handlers. Naming conventions are only consulted by
//! the documented fallbacks, which tag their results with a lower confidence.

use crate::config::AnalyzerConfig;
use crate::dialect::{self, Dialect};
use crate::error::{EngineResult, MigrationError};
use crate::extract::{self, ParsedComponent};
use crate::syntax::{self, SyntaxTree};
use refit_core::{
    BusinessLogicModel, ComplexityTier, ComponentModel, DataTransformation, DependencyClass,
    Detection, EventHandler, ExternalCall, RuleKind, SideEffect, StateBinding, TransformOp,
    ValidationRule,
};
use std::collections::{HashMap, HashSet};
use tracing::debug;
use tree_sitter::Node;

/// Recognizes business-logic patterns and scores complexity.
#[derive(Debug, Clone)]
pub struct Analyzer {
    config: AnalyzerConfig,
    dialect: Dialect,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default(), Dialect::React)
    }
}

impl Analyzer {
    /// Create an analyzer.
    pub fn new(config: AnalyzerConfig, dialect: Dialect) -> Self {
        Self { config, dialect }
    }

    /// Analyzer configuration.
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyze a model, re-parsing its source text.
    pub fn analyze(&self, model: &ComponentModel) -> EngineResult<BusinessLogicModel> {
        let tree = SyntaxTree::parse(&model.source_text, &model.location.path)?;
        self.analyze_tree(model, &tree)
    }

    /// Analyze a model against an already parsed tree.
    pub fn analyze_tree(
        &self,
        model: &ComponentModel,
        tree: &SyntaxTree,
    ) -> EngineResult<BusinessLogicModel> {
        let scan = Scan::new(self, model, tree);
        let state_bindings = scan.state_bindings()?;
        let side_effects = scan.side_effects();
        let event_handlers = scan.event_handlers(&state_bindings);
        let data_transformations = scan.data_transformations();
        let validation_rules = scan.validation_rules(&state_bindings);
        let external_calls = scan.external_calls();

        let mut logic = BusinessLogicModel {
            state_bindings,
            side_effects,
            event_handlers,
            data_transformations,
            validation_rules,
            external_calls,
            complexity_score: 0,
        };
        logic.complexity_score = self.config.weights.score(&logic.counts());

        debug!(
            component = %model.id,
            score = logic.complexity_score,
            patterns = logic.counts().total(),
            "Analyzed business logic"
        );
        Ok(logic)
    }

    /// Analyze a parsed component and attach the result to its model.
    pub fn enrich(&self, parsed: ParsedComponent) -> EngineResult<ParsedComponent> {
        let logic = self.analyze_tree(&parsed.model, &parsed.tree)?;
        let tier = self.tier(&logic);
        Ok(ParsedComponent {
            model: parsed.model.with_analysis(logic, tier),
            tree: parsed.tree,
        })
    }

    /// Tier of an analyzed model.
    pub fn tier(&self, logic: &BusinessLogicModel) -> ComplexityTier {
        self.config.thresholds.tier_for(logic.complexity_score)
    }
}

// =============================================================================
// Scan
// =============================================================================

struct Scan<'a, 't> {
    analyzer: &'a Analyzer,
    model: &'a ComponentModel,
    tree: &'t SyntaxTree,
    src: &'t str,
    nodes: Vec<Node<'t>>,
    classes: Vec<Node<'t>>,
}

impl<'a, 't> Scan<'a, 't> {
    fn new(analyzer: &'a Analyzer, model: &'a ComponentModel, tree: &'t SyntaxTree) -> Self {
        let src = tree.source();
        let nodes = syntax::descendants(tree.root());
        let classes = extract::component_classes(src, tree.root());
        Self {
            analyzer,
            model,
            tree,
            src,
            nodes,
            classes,
        }
    }

    fn dialect(&self) -> Dialect {
        self.analyzer.dialect
    }

    fn text(&self, node: Node<'_>) -> &'t str {
        syntax::text(self.src, node)
    }

    fn calls(&self) -> impl Iterator<Item = (Node<'t>, String)> + '_ {
        self.nodes
            .iter()
            .filter(|n| n.kind() == "call_expression")
            .filter_map(|n| syntax::callee_path(self.src, *n).map(|c| (*n, c)))
    }

    // -------------------------------------------------------------------------
    // State bindings
    // -------------------------------------------------------------------------

    fn state_bindings(&self) -> EngineResult<Vec<StateBinding>> {
        let mut out: Vec<StateBinding> = self
            .nodes
            .iter()
            .filter(|n| n.kind() == "variable_declarator")
            .filter_map(|d| self.hook_binding(*d))
            .collect();

        for class in &self.classes {
            let bindings = self.class_state(*class);
            self.check_set_state_keys(*class, &bindings)?;
            out.extend(bindings);
        }
        out.sort_by_key(|b| b.line);
        Ok(out)
    }

    fn hook_binding(&self, declarator: Node<'t>) -> Option<StateBinding> {
        let pattern = declarator.child_by_field_name("name")?;
        if pattern.kind() != "array_pattern" {
            return None;
        }
        let value = declarator.child_by_field_name("value")?;
        if value.kind() != "call_expression" {
            return None;
        }
        let callee = syntax::callee_path(self.src, value)?;
        if !self.dialect().is_state_call(&callee) {
            return None;
        }
        let elements: Vec<Node<'t>> = syntax::named_children(pattern)
            .into_iter()
            .filter(|e| e.kind() == "identifier")
            .collect();
        let name = self.text(*elements.first()?).to_string();
        let mutator = elements
            .get(1)
            .map(|m| self.text(*m).to_string())
            .unwrap_or_default();

        let is_reducer = self
            .dialect()
            .reducer_primitives()
            .contains(&self.dialect().normalize_callee(&callee));
        let args = syntax::call_arguments(value);
        let (reducer, init) = if is_reducer {
            (args.first().map(|r| self.text(*r).to_string()), args.get(1).copied())
        } else {
            (None, args.first().copied())
        };

        let value_type = type_argument(self.src, value)
            .or_else(|| init.map(|i| infer_type(i).to_string()))
            .unwrap_or_else(|| "undefined".to_string());

        Some(StateBinding {
            name,
            value_type,
            mutator,
            dependencies: init
                .map(|i| syntax::identifiers_read(self.src, i))
                .unwrap_or_default(),
            initial_value: init
                .map(|i| self.text(i).to_string())
                .unwrap_or_else(|| "undefined".to_string()),
            reducer,
            line: syntax::line(declarator),
        })
    }

    fn class_state(&self, class: Node<'t>) -> Vec<StateBinding> {
        let Some(object) = class_state_object(self.src, class) else {
            return Vec::new();
        };
        let declared_types = self.class_state_types(class);

        syntax::named_children(object)
            .into_iter()
            .filter_map(|entry| {
                let (key, value) = match entry.kind() {
                    "pair" => (
                        entry.child_by_field_name("key")?,
                        entry.child_by_field_name("value")?,
                    ),
                    "shorthand_property_identifier" => (entry, entry),
                    _ => return None,
                };
                let name = property_key(self.src, key);
                let value_type = declared_types
                    .get(&name)
                    .cloned()
                    .unwrap_or_else(|| infer_type(value).to_string());
                Some(StateBinding {
                    dependencies: syntax::identifiers_read(self.src, value),
                    initial_value: self.text(value).to_string(),
                    value_type,
                    mutator: "setState".to_string(),
                    reducer: None,
                    line: syntax::line(entry),
                    name,
                })
            })
            .collect()
    }

    fn class_state_types(&self, class: Node<'t>) -> HashMap<String, String> {
        declared_state_types(self.tree, class)
    }

    fn check_set_state_keys(&self, class: Node<'t>, bindings: &[StateBinding]) -> EngineResult<()> {
        let declared: HashSet<&str> = bindings.iter().map(|b| b.name.as_str()).collect();
        for call in syntax::descendants(class) {
            if call.kind() != "call_expression"
                || syntax::callee_path(self.src, call).as_deref() != Some("this.setState")
            {
                continue;
            }
            for key in set_state_keys(self.src, call) {
                if !declared.contains(key.as_str()) {
                    return Err(MigrationError::UndeclaredState {
                        component: self.model.name.clone(),
                        key,
                    });
                }
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Side effects
    // -------------------------------------------------------------------------

    fn side_effects(&self) -> Vec<SideEffect> {
        let dialect = self.dialect();
        let mut out = Vec::new();

        for (call, callee) in self.calls() {
            let bare = dialect.normalize_callee(&callee);
            if !dialect.effect_primitives().contains(&bare) {
                continue;
            }
            let args = syntax::call_arguments(call);
            let Some(first) = args.first().copied() else {
                continue;
            };

            let (callback, deps) = match dialect {
                Dialect::React => (first, args.get(1).copied().filter(|d| d.kind() == "array")),
                Dialect::Solid => match on_call(self.src, first) {
                    Some((deps, callback)) => (callback, Some(deps)),
                    None => (first, None),
                },
            };
            if !syntax::is_function(callback) {
                continue;
            }

            let mount_primitive = dialect.mount_primitives().contains(&bare);
            let dependencies = deps.map(|d| self.dependency_list(d)).unwrap_or_default();
            let has_dependency_list = deps.is_some() || mount_primitive;
            out.push(SideEffect {
                mount_only: mount_primitive || (deps.is_some() && dependencies.is_empty()),
                has_cleanup: self.registers_cleanup(callback),
                dependencies,
                has_dependency_list,
                line: syntax::line(call),
            });
        }

        for class in &self.classes {
            out.extend(self.lifecycle_effects(*class));
        }
        out.sort_by_key(|e| e.line);
        out
    }

    fn dependency_list(&self, deps: Node<'t>) -> Vec<String> {
        let list = match deps.kind() {
            "arrow_function" => deps.child_by_field_name("body").unwrap_or(deps),
            _ => deps,
        };
        if list.kind() == "array" {
            syntax::named_children(list)
                .into_iter()
                .map(|d| self.text(d).to_string())
                .collect()
        } else {
            vec![self.text(list).to_string()]
        }
    }

    fn registers_cleanup(&self, callback: Node<'t>) -> bool {
        if let Some(cleanup) = self.dialect().cleanup_primitive() {
            return syntax::descendants(callback).into_iter().any(|n| {
                n.kind() == "call_expression"
                    && syntax::callee_path(self.src, n).as_deref() == Some(cleanup)
            });
        }
        let Some(body) = callback.child_by_field_name("body") else {
            return false;
        };
        if body.kind() != "statement_block" {
            return false;
        }
        syntax::descendants(body).into_iter().any(|n| {
            n.kind() == "return_statement"
                && n.named_child(0).is_some()
                && syntax::enclosing(n, syntax::FUNCTION_KINDS).map(|f| f.id()) == Some(callback.id())
        })
    }

    fn lifecycle_effects(&self, class: Node<'t>) -> Vec<SideEffect> {
        let members = extract::class_members(self.src, class);
        let find = |name: &str| members.iter().find(|(n, _)| n == name).map(|(_, m)| *m);
        let mut out = Vec::new();

        let mount = find("componentDidMount");
        let unmount = find("componentWillUnmount");
        if mount.is_some() || unmount.is_some() {
            let line = mount
                .or(unmount)
                .map(|m| syntax::line(m.node))
                .unwrap_or_default();
            out.push(SideEffect {
                dependencies: Vec::new(),
                has_dependency_list: true,
                has_cleanup: unmount.is_some(),
                mount_only: true,
                line,
            });
        }
        if let Some(update) = find("componentDidUpdate") {
            let params = update
                .function
                .and_then(|f| f.child_by_field_name("parameters"))
                .map(|p| {
                    syntax::named_children(p)
                        .into_iter()
                        .map(|n| self.text(n).to_string())
                        .collect()
                })
                .unwrap_or_default();
            out.push(SideEffect {
                dependencies: params,
                has_dependency_list: false,
                has_cleanup: false,
                mount_only: false,
                line: syntax::line(update.node),
            });
        }
        out
    }

    // -------------------------------------------------------------------------
    // Event handlers
    // -------------------------------------------------------------------------

    /// Functions declared by name, in source order.
    fn declared_functions(&self) -> Vec<(String, Node<'t>)> {
        let wrappers = self.dialect().callback_wrappers();
        let mut out: Vec<(String, Node<'t>)> = Vec::new();
        let mut push = |name: String, node: Node<'t>| {
            if !out.iter().any(|(n, _)| *n == name) {
                out.push((name, node));
            }
        };

        for node in &self.nodes {
            match node.kind() {
                "function_declaration" => {
                    if let Some(name) = node.child_by_field_name("name") {
                        push(self.text(name).to_string(), *node);
                    }
                }
                "variable_declarator" => {
                    let (Some(name), Some(value)) = (
                        node.child_by_field_name("name"),
                        node.child_by_field_name("value"),
                    ) else {
                        continue;
                    };
                    if name.kind() != "identifier" {
                        continue;
                    }
                    let function = if syntax::is_function(value) {
                        Some(value)
                    } else if value.kind() == "call_expression"
                        && syntax::callee_path(self.src, value)
                            .is_some_and(|c| wrappers.contains(&self.dialect().normalize_callee(&c)))
                    {
                        syntax::call_arguments(value)
                            .into_iter()
                            .find(|a| syntax::is_function(*a))
                    } else {
                        None
                    };
                    if let Some(function) = function {
                        push(self.text(name).to_string(), function);
                    }
                }
                _ => {}
            }
        }
        for class in &self.classes {
            for (name, member) in extract::class_members(self.src, *class) {
                if let Some(function) = member.function {
                    if !member.is_static {
                        push(name, function);
                    }
                }
            }
        }
        out.sort_by_key(|(_, n)| n.start_byte());
        out
    }

    fn event_handlers(&self, bindings: &[StateBinding]) -> Vec<EventHandler> {
        let declared = self.declared_functions();
        let lookup = |name: &str| declared.iter().find(|(n, _)| n == name).map(|(_, f)| *f);
        let mutators: HashSet<&str> = bindings
            .iter()
            .map(|b| b.mutator.as_str())
            .filter(|m| !m.is_empty())
            .collect();

        let mut out: Vec<EventHandler> = Vec::new();
        let mut inline_count = 0usize;

        for attr in self.nodes.iter().filter(|n| n.kind() == "jsx_attribute") {
            let Some(name_node) = attr.named_child(0) else {
                continue;
            };
            let attr_name = self.text(name_node);
            let Some(interaction) = interaction_of(attr_name) else {
                continue;
            };
            let Some(expr) = attr
                .named_child(1)
                .filter(|v| v.kind() == "jsx_expression")
                .and_then(|v| v.named_child(0))
            else {
                continue;
            };

            let (name, function) = if syntax::is_function(expr) {
                inline_count += 1;
                (format!("inline_{attr_name}_{inline_count}"), Some(expr))
            } else {
                let Some(reference) = handler_reference(self.src, expr) else {
                    continue;
                };
                if out.iter().any(|h| h.name == reference) {
                    continue;
                }
                let function = lookup(&reference);
                (reference, function)
            };

            out.push(EventHandler {
                mutators: function
                    .map(|f| self.mutator_calls(f, &mutators))
                    .unwrap_or_default(),
                name,
                interaction,
                detection: Detection::structural(),
                line: syntax::line(*attr),
            });
        }

        if self.analyzer.config.heuristic_fallbacks {
            for (name, function) in &declared {
                let unbound = !out.iter().any(|h| &h.name == name);
                if unbound && is_handler_name(name) {
                    out.push(EventHandler {
                        name: name.clone(),
                        interaction: "unknown".to_string(),
                        mutators: self.mutator_calls(*function, &mutators),
                        detection: Detection::heuristic(dialect::HANDLER_HEURISTIC_CONFIDENCE),
                        line: syntax::line(*function),
                    });
                }
            }
        }
        out
    }

    fn mutator_calls(&self, function: Node<'t>, mutators: &HashSet<&str>) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for call in syntax::descendants(function) {
            if call.kind() != "call_expression" {
                continue;
            }
            let Some(callee) = syntax::callee_path(self.src, call) else {
                continue;
            };
            let name = match callee.as_str() {
                "this.setState" => "setState",
                other if mutators.contains(other) => other,
                _ => continue,
            };
            if !out.iter().any(|m| m == name) {
                out.push(name.to_string());
            }
        }
        out
    }

    // -------------------------------------------------------------------------
    // Data transformations
    // -------------------------------------------------------------------------

    fn data_transformations(&self) -> Vec<DataTransformation> {
        self.calls()
            .filter_map(|(call, callee)| {
                let function = call.child_by_field_name("function")?;
                if function.kind() != "member_expression" {
                    return None;
                }
                let property = self.text(function.child_by_field_name("property")?);
                let object = function.child_by_field_name("object")?;
                let (operation, subject) = match (callee.as_str(), property) {
                    (
                        "Object.entries" | "Object.keys" | "Object.values" | "Object.fromEntries",
                        _,
                    ) => (
                        TransformOp::Normalize,
                        syntax::call_arguments(call)
                            .first()
                            .map(|a| self.text(*a).to_string())
                            .unwrap_or_default(),
                    ),
                    (_, "map") => (TransformOp::Map, self.text(object).to_string()),
                    (_, "filter") => (TransformOp::Filter, self.text(object).to_string()),
                    (_, "reduce") => (TransformOp::Reduce, self.text(object).to_string()),
                    _ => return None,
                };
                Some(DataTransformation {
                    operation,
                    subject,
                    line: syntax::line(call),
                })
            })
            .collect()
    }

    // -------------------------------------------------------------------------
    // Validation rules
    // -------------------------------------------------------------------------

    fn validation_rules(&self, bindings: &[StateBinding]) -> Vec<ValidationRule> {
        let mutators: HashSet<&str> = bindings
            .iter()
            .map(|b| b.mutator.as_str())
            .filter(|m| !m.is_empty())
            .collect();

        self.nodes
            .iter()
            .filter(|n| n.kind() == "if_statement")
            .filter_map(|stmt| {
                let condition = stmt.child_by_field_name("condition")?;
                let condition = unparen(condition);
                let consequence = stmt.child_by_field_name("consequence")?;

                let field = self.tested_field(condition)?;
                let message = syntax::descendants(consequence)
                    .into_iter()
                    .find_map(|n| syntax::string_value(self.src, n).filter(|s| !s.is_empty()))?;
                if !self.reports_error(consequence, &mutators) {
                    return None;
                }
                Some(ValidationRule {
                    field,
                    rule: self.rule_kind(condition),
                    message,
                    line: syntax::line(*stmt),
                })
            })
            .collect()
    }

    fn tested_field(&self, node: Node<'t>) -> Option<String> {
        match node.kind() {
            "identifier" => Some(self.text(node).to_string()),
            "unary_expression" => self.tested_field(node.child_by_field_name("argument")?),
            "parenthesized_expression" | "non_null_expression" => {
                self.tested_field(node.named_child(0)?)
            }
            "binary_expression" => node
                .child_by_field_name("left")
                .and_then(|l| self.tested_field(l))
                .or_else(|| {
                    node.child_by_field_name("right")
                        .and_then(|r| self.tested_field(r))
                }),
            "member_expression" => {
                let object = node.child_by_field_name("object")?;
                let property = self.text(node.child_by_field_name("property")?);
                if matches!(property, "length" | "trim" | "size") {
                    self.tested_field(object)
                } else {
                    Some(property.to_string())
                }
            }
            "call_expression" => {
                let function = node.child_by_field_name("function")?;
                let args = syntax::call_arguments(node);
                if args.is_empty() {
                    // accessor read (`email()`) or a method on the field (`email.trim()`)
                    match function.kind() {
                        "identifier" => Some(self.text(function).to_string()),
                        "member_expression" => {
                            self.tested_field(function.child_by_field_name("object")?)
                        }
                        _ => None,
                    }
                } else {
                    args.into_iter()
                        .find_map(|a| self.tested_field(a))
                        .or_else(|| {
                            function
                                .child_by_field_name("object")
                                .filter(|o| o.kind() != "regex")
                                .and_then(|o| self.tested_field(o))
                        })
                }
            }
            _ => None,
        }
    }

    fn rule_kind(&self, condition: Node<'t>) -> RuleKind {
        let nodes = syntax::descendants(condition);
        let has_property = |name: &str| {
            nodes.iter().any(|n| {
                n.kind() == "member_expression"
                    && n.child_by_field_name("property")
                        .is_some_and(|p| self.text(p) == name)
            })
        };
        if nodes.iter().any(|n| n.kind() == "regex") || has_property("test") || has_property("match")
        {
            return RuleKind::Pattern;
        }
        if has_property("length") {
            return RuleKind::Length;
        }
        let numeric_comparison = nodes.iter().any(|n| {
            n.kind() == "binary_expression"
                && n.child_by_field_name("operator")
                    .is_some_and(|op| matches!(self.text(op), "<" | ">" | "<=" | ">="))
                && syntax::named_children(*n).iter().any(|c| c.kind() == "number")
        });
        if numeric_comparison {
            return RuleKind::Range;
        }
        let negated = condition.kind() == "unary_expression"
            && condition
                .child_by_field_name("operator")
                .is_some_and(|op| self.text(op) == "!");
        let empty_check = nodes.iter().any(|n| {
            n.kind() == "binary_expression"
                && syntax::named_children(*n).iter().any(|c| {
                    matches!(c.kind(), "null" | "undefined")
                        || syntax::string_value(self.src, *c).is_some_and(|s| s.is_empty())
                })
        });
        if negated || empty_check {
            RuleKind::Required
        } else {
            RuleKind::Custom
        }
    }

    fn reports_error(&self, consequence: Node<'t>, mutators: &HashSet<&str>) -> bool {
        syntax::descendants(consequence).into_iter().any(|n| match n.kind() {
            "throw_statement" | "return_statement" | "assignment_expression" => true,
            "call_expression" => syntax::callee_path(self.src, n).is_some_and(|c| {
                c == "this.setState"
                    || mutators.contains(c.as_str())
                    || syntax::is_setter_name(&c)
                    || c.ends_with(".push")
            }),
            _ => false,
        })
    }

    // -------------------------------------------------------------------------
    // External calls
    // -------------------------------------------------------------------------

    fn external_calls(&self) -> Vec<ExternalCall> {
        let registry = self.registry_bindings();
        let loaders: HashSet<&str> = self
            .model
            .dependencies
            .iter()
            .filter(|d| d.is_relative() && d.class != DependencyClass::Library)
            .map(|d| d.name.as_str())
            .collect();

        let mut out = Vec::new();
        for (call, callee) in self.calls() {
            let args = syntax::call_arguments(call);
            let (target, method, detection) = if let Some(method) = dialect::network_method(&callee)
            {
                let target = args
                    .first()
                    .map(|a| {
                        syntax::string_value(self.src, *a)
                            .unwrap_or_else(|| self.text(*a).to_string())
                    })
                    .unwrap_or_default();
                let method = if callee == "fetch" {
                    args.get(1)
                        .and_then(|opts| self.object_string(*opts, "method"))
                        .map(|m| m.to_uppercase())
                        .unwrap_or_else(|| method.to_string())
                } else {
                    method.to_string()
                };
                (target, method, Detection::structural())
            } else if let Some(use_case) = self.use_case_target(call, &registry) {
                (use_case, "execute".to_string(), Detection::structural())
            } else if self.analyzer.config.heuristic_fallbacks
                && loaders.contains(callee.as_str())
                && is_loader_name(&callee)
            {
                (
                    callee.clone(),
                    "CALL".to_string(),
                    Detection::heuristic(dialect::LOADER_HEURISTIC_CONFIDENCE),
                )
            } else {
                continue;
            };

            let (has_success_branch, has_error_branch) = self.branches(call);
            out.push(ExternalCall {
                target,
                method,
                callee,
                has_success_branch,
                has_error_branch,
                detection,
                line: syntax::line(call),
            });
        }
        out
    }

    /// `const useCase = container.resolve('GetUserUseCase')` bindings.
    fn registry_bindings(&self) -> HashMap<String, String> {
        self.nodes
            .iter()
            .filter(|n| n.kind() == "variable_declarator")
            .filter_map(|d| {
                let name = d.child_by_field_name("name")?;
                let value = d.child_by_field_name("value")?;
                let use_case = self.resolved_use_case(value)?;
                Some((self.text(name).to_string(), use_case))
            })
            .collect()
    }

    fn resolved_use_case(&self, node: Node<'t>) -> Option<String> {
        let node = if node.kind() == "await_expression" {
            node.named_child(0)?
        } else {
            node
        };
        if node.kind() != "call_expression" {
            return None;
        }
        let callee = syntax::callee_path(self.src, node)?;
        if !callee.ends_with(".resolve") || callee == "Promise.resolve" {
            return None;
        }
        syntax::call_arguments(node)
            .first()
            .and_then(|a| syntax::string_value(self.src, *a))
    }

    fn use_case_target(&self, call: Node<'t>, registry: &HashMap<String, String>) -> Option<String> {
        let function = call.child_by_field_name("function")?;
        if function.kind() != "member_expression" {
            return None;
        }
        let property = self.text(function.child_by_field_name("property")?);
        if property != "execute" {
            return None;
        }
        let object = function.child_by_field_name("object")?;
        match object.kind() {
            "identifier" => registry.get(self.text(object)).cloned(),
            _ => self.resolved_use_case(object),
        }
    }

    fn object_string(&self, object: Node<'t>, key: &str) -> Option<String> {
        if object.kind() != "object" {
            return None;
        }
        syntax::named_children(object).into_iter().find_map(|pair| {
            if pair.kind() != "pair" {
                return None;
            }
            let k = pair.child_by_field_name("key")?;
            if property_key(self.src, k) != key {
                return None;
            }
            syntax::string_value(self.src, pair.child_by_field_name("value")?)
        })
    }

    /// Success and error continuations of a call site.
    fn branches(&self, call: Node<'t>) -> (bool, bool) {
        let mut success = false;
        let mut error = false;
        let mut current = call;

        loop {
            let Some(parent) = current.parent() else {
                break;
            };
            match parent.kind() {
                "await_expression" => {
                    success = true;
                    current = parent;
                }
                "member_expression"
                    if parent.child_by_field_name("object").map(|o| o.id()) == Some(current.id()) =>
                {
                    let Some(chained) = parent.parent().filter(|p| p.kind() == "call_expression")
                    else {
                        break;
                    };
                    match parent
                        .child_by_field_name("property")
                        .map(|p| self.text(p))
                    {
                        Some("then") => {
                            success = true;
                            if syntax::call_arguments(chained).len() > 1 {
                                error = true;
                            }
                        }
                        Some("catch") => error = true,
                        _ => {}
                    }
                    current = chained;
                }
                _ => break,
            }
        }

        let mut scope = call.parent();
        while let Some(node) = scope {
            if syntax::is_function(node) {
                break;
            }
            if node.kind() == "try_statement" {
                let in_body = node
                    .child_by_field_name("body")
                    .is_some_and(|b| b.start_byte() <= call.start_byte() && call.end_byte() <= b.end_byte());
                if in_body && node.child_by_field_name("handler").is_some() {
                    error = true;
                }
            }
            scope = node.parent();
        }
        (success, error)
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// The object literal a class component initializes its state with.
pub fn class_state_object<'t>(src: &str, class: Node<'t>) -> Option<Node<'t>> {
    let members = extract::class_members(src, class);
    if let Some(object) = members
        .iter()
        .find(|(n, m)| n == "state" && !m.is_static)
        .and_then(|(_, m)| m.value)
        .filter(|v| v.kind() == "object")
    {
        return Some(object);
    }
    let constructor = members
        .iter()
        .find(|(n, _)| n == "constructor")
        .and_then(|(_, m)| m.function)?;
    syntax::descendants(constructor).into_iter().find_map(|n| {
        if n.kind() != "assignment_expression" {
            return None;
        }
        let left = n.child_by_field_name("left")?;
        if syntax::dotted_path(src, left).as_deref() != Some("this.state") {
            return None;
        }
        n.child_by_field_name("right").filter(|r| r.kind() == "object")
    })
}

/// Member types of the state type argument (`Component<P, S>`).
pub fn declared_state_types(tree: &SyntaxTree, class: Node<'_>) -> HashMap<String, String> {
    let src = tree.source();
    let args = extract::class_type_arguments(class);
    let Some(state_type) = args.get(1) else {
        return HashMap::new();
    };
    let body = match state_type.kind() {
        "object_type" => Some(*state_type),
        "type_identifier" => extract::find_type_body(tree, syntax::text(src, *state_type)),
        _ => None,
    };
    body.map(|b| {
        syntax::named_children(b)
            .into_iter()
            .filter(|m| m.kind() == "property_signature")
            .filter_map(|m| {
                let name = syntax::text(src, m.child_by_field_name("name")?).to_string();
                let ty = extract::annotation_text(src, m.child_by_field_name("type")?);
                Some((name, ty))
            })
            .collect()
    })
    .unwrap_or_default()
}

/// Keys written by a `this.setState(...)` call.
pub fn set_state_keys(src: &str, call: Node<'_>) -> Vec<String> {
    let Some(arg) = syntax::call_arguments(call).into_iter().next() else {
        return Vec::new();
    };
    let object = match arg.kind() {
        "object" => Some(arg),
        "arrow_function" => arg
            .child_by_field_name("body")
            .map(unparen)
            .filter(|b| b.kind() == "object"),
        _ => None,
    };
    object
        .map(|o| {
            syntax::named_children(o)
                .into_iter()
                .filter_map(|entry| match entry.kind() {
                    "pair" => entry
                        .child_by_field_name("key")
                        .map(|k| property_key(src, k)),
                    "shorthand_property_identifier" => Some(syntax::text(src, entry).to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Object key text without quotes.
pub fn property_key(src: &str, key: Node<'_>) -> String {
    syntax::string_value(src, key).unwrap_or_else(|| syntax::text(src, key).to_string())
}

fn unparen(node: Node<'_>) -> Node<'_> {
    let mut node = node;
    while node.kind() == "parenthesized_expression" {
        match node.named_child(0) {
            Some(inner) => node = inner,
            None => break,
        }
    }
    node
}

/// Solid `on(deps, fn)`: returns `(deps, fn)`.
fn on_call<'t>(src: &str, node: Node<'t>) -> Option<(Node<'t>, Node<'t>)> {
    if node.kind() != "call_expression" || syntax::callee_path(src, node).as_deref() != Some("on") {
        return None;
    }
    let args = syntax::call_arguments(node);
    Some((*args.first()?, *args.get(1)?))
}

fn type_argument(src: &str, call: Node<'_>) -> Option<String> {
    call.child_by_field_name("type_arguments")
        .and_then(|t| t.named_child(0))
        .map(|t| syntax::text(src, t).to_string())
}

/// Best-effort type of an initializer.
pub fn infer_type(node: Node<'_>) -> &'static str {
    match node.kind() {
        "string" | "template_string" => "string",
        "number" => "number",
        "true" | "false" => "boolean",
        "array" => "unknown[]",
        "object" => "Record<string, unknown>",
        "null" => "null",
        "undefined" => "undefined",
        _ => "unknown",
    }
}

/// `onClick` -> `click`.
fn interaction_of(attribute: &str) -> Option<String> {
    let rest = attribute.strip_prefix("on")?;
    if !syntax::is_capitalized(rest) {
        return None;
    }
    Some(rest.to_ascii_lowercase())
}

/// Name of the function a handler attribute refers to.
fn handler_reference(src: &str, expr: Node<'_>) -> Option<String> {
    let path = match expr.kind() {
        "identifier" | "member_expression" => syntax::dotted_path(src, expr)?,
        "call_expression" => {
            let callee = syntax::callee_path(src, expr)?;
            callee
                .strip_suffix(".bind")
                .map(str::to_string)
                .unwrap_or(callee)
        }
        _ => return None,
    };
    Some(path.strip_prefix("this.").unwrap_or(&path).to_string())
}

fn is_handler_name(name: &str) -> bool {
    name.strip_prefix("handle").is_some_and(syntax::is_capitalized)
}

fn is_loader_name(name: &str) -> bool {
    dialect::LOADER_PREFIXES.iter().any(|prefix| {
        name.strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || syntax::is_capitalized(rest))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Extractor;
    use refit_core::PatternCategory;
    use std::path::Path;

    const USER_FORM: &str = r#"
import React, { useState, useEffect } from 'react';
import { loadPreferences } from '../api/preferences';

interface UserFormProps {
  userId: string;
}

export default function UserForm({ userId }: UserFormProps) {
  const [email, setEmail] = useState<string>('');
  const [errors, setErrors] = useState<string[]>([]);
  const [user, setUser] = useState(null);

  useEffect(() => {
    fetch(`/api/users/${userId}`)
      .then((res) => res.json())
      .then(setUser)
      .catch(() => setErrors(['load failed']));
    const id = setInterval(() => {}, 1000);
    return () => clearInterval(id);
  }, [userId]);

  const handleSubmit = (e: React.FormEvent) => {
    e.preventDefault();
    if (!email) {
      setErrors(['Email is required']);
      return;
    }
    loadPreferences(userId);
  };

  const visible = errors.filter((m) => m.length > 0).map((m) => m.trim());

  return (
    <form onSubmit={handleSubmit}>
      <input className="field" value={email} onChange={(e) => setEmail(e.target.value)} />
      {visible.map((m) => <p>{m}</p>)}
    </form>
  );
}
"#;

    fn analyze(src: &str) -> BusinessLogicModel {
        let parsed = Extractor::default()
            .extract_parsed(src, Path::new("UserForm.tsx"))
            .unwrap();
        Analyzer::default()
            .analyze_tree(&parsed.model, &parsed.tree)
            .unwrap()
    }

    #[test]
    fn test_recognizes_all_categories() {
        let logic = analyze(USER_FORM);
        let counts = logic.counts();

        assert_eq!(counts.get(PatternCategory::StateBinding), 3);
        assert_eq!(logic.state_bindings[0].value_type, "string");
        assert_eq!(logic.state_bindings[2].value_type, "null");
        assert_eq!(logic.state_bindings[1].mutator, "setErrors");

        assert_eq!(counts.get(PatternCategory::SideEffect), 1);
        let effect = &logic.side_effects[0];
        assert_eq!(effect.dependencies, vec!["userId".to_string()]);
        assert!(effect.has_cleanup);
        assert!(!effect.mount_only);

        assert_eq!(counts.get(PatternCategory::EventHandler), 2);
        assert_eq!(logic.event_handlers[0].name, "handleSubmit");
        assert_eq!(logic.event_handlers[0].interaction, "submit");
        assert_eq!(logic.event_handlers[0].mutators, vec!["setErrors".to_string()]);
        assert_eq!(logic.event_handlers[1].mutators, vec!["setEmail".to_string()]);

        assert_eq!(counts.get(PatternCategory::DataTransformation), 3);
        assert_eq!(counts.get(PatternCategory::ValidationRule), 1);
        assert_eq!(logic.validation_rules[0].field, "email");
        assert_eq!(logic.validation_rules[0].rule, RuleKind::Required);
        assert_eq!(logic.validation_rules[0].message, "Email is required");

        assert_eq!(counts.get(PatternCategory::ExternalCall), 2);
        let fetch = &logic.external_calls[0];
        assert_eq!(fetch.callee, "fetch");
        assert!(fetch.has_success_branch && fetch.has_error_branch);
        let loader = &logic.external_calls[1];
        assert!(loader.detection.is_heuristic());
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let a = serde_json::to_string(&analyze(USER_FORM)).unwrap();
        let b = serde_json::to_string(&analyze(USER_FORM)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_use_case_through_registry() {
        let src = r#"
export function Orders({ container }: { container: any }) {
  const loadOrders = async () => {
    const useCase = container.resolve('ListOrdersUseCase');
    try {
      const orders = await useCase.execute({ page: 1 });
    } catch (e) {}
  };
  return <button onClick={loadOrders}>load</button>;
}
"#;
        let logic = analyze(src);
        assert_eq!(logic.external_calls.len(), 1);
        let call = &logic.external_calls[0];
        assert_eq!(call.target, "ListOrdersUseCase");
        assert!(call.has_success_branch && call.has_error_branch);
    }

    #[test]
    fn test_class_component_state_and_lifecycle() {
        let src = r#"
import React from 'react';
export default class Ticker extends React.Component<{}, { ticks: number; label: string }> {
  state = { ticks: 0, label: 'idle' };
  componentDidMount() { this.timer = setInterval(this.tick, 1000); }
  componentWillUnmount() { clearInterval(this.timer); }
  tick = () => { this.setState({ ticks: this.state.ticks + 1 }); };
  render() { return <button onClick={this.tick}>{this.state.label}</button>; }
}
"#;
        let logic = analyze(src);
        assert_eq!(logic.state_bindings.len(), 2);
        assert_eq!(logic.state_bindings[0].value_type, "number");
        assert_eq!(logic.side_effects.len(), 1);
        assert!(logic.side_effects[0].mount_only && logic.side_effects[0].has_cleanup);
        assert_eq!(logic.event_handlers.len(), 1);
        assert_eq!(logic.event_handlers[0].name, "tick");
        assert_eq!(logic.event_handlers[0].mutators, vec!["setState".to_string()]);
    }

    #[test]
    fn test_undeclared_state_key_is_rejected() {
        let src = r#"
import React from 'react';
export default class Broken extends React.Component {
  state = { open: false };
  toggle = () => this.setState({ visible: true });
  render() { return <div onClick={this.toggle} />; }
}
"#;
        let parsed = Extractor::default()
            .extract_parsed(src, Path::new("Broken.tsx"))
            .unwrap();
        let err = Analyzer::default()
            .analyze_tree(&parsed.model, &parsed.tree)
            .unwrap_err();
        assert!(matches!(err, MigrationError::UndeclaredState { ref key, .. } if key == "visible"));
    }

    #[test]
    fn test_solid_dialect_reanalysis() {
        let src = r#"
import { createSignal, createEffect, on, onMount, onCleanup } from 'solid-js';
export default function Clock() {
  const [time, setTime] = createSignal(0);
  onMount(() => {
    const id = setInterval(() => setTime(Date.now()), 1000);
    onCleanup(() => clearInterval(id));
  });
  createEffect(on(() => [time()], () => console.log(time())));
  return <span>{time()}</span>;
}
"#;
        let parsed = Extractor::new(Dialect::Solid)
            .extract_parsed(src, Path::new("Clock.tsx"))
            .unwrap();
        let logic = Analyzer::new(AnalyzerConfig::default(), Dialect::Solid)
            .analyze_tree(&parsed.model, &parsed.tree)
            .unwrap();
        assert_eq!(logic.state_bindings.len(), 1);
        assert_eq!(logic.side_effects.len(), 2);
        assert!(logic.side_effects[0].mount_only && logic.side_effects[0].has_cleanup);
        assert!(logic.side_effects[1].has_dependency_list);
    }

    #[test]
    fn test_enrich_sets_tier() {
        let parsed = Extractor::default()
            .extract_parsed(USER_FORM, Path::new("UserForm.tsx"))
            .unwrap();
        let enriched = Analyzer::default().enrich(parsed).unwrap();
        let logic = enriched.model.logic.as_ref().unwrap();
        assert_eq!(logic.complexity_score, 3 + 3 + 2 + 3 + 2 + 10);
        assert_eq!(enriched.model.complexity, Some(ComplexityTier::Complex));
    }
}
