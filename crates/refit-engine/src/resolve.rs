//! Dependency resolution: graph construction, topological order, cycles.

use crate::error::{EngineResult, MigrationError};
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::Direction;
use refit_core::{
    ComponentId, ComponentModel, DependencyClass, DependencyEdge, DependencyGraph, EdgeKind,
};
use std::collections::{HashMap, HashSet};
use std::path::{Component as PathComponent, Path, PathBuf};
use tracing::{debug, warn};

/// Outcome of ordering a batch.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Providers before consumers. Partial when `cycles` is non-empty.
    pub order: Vec<ComponentId>,
    /// Each cycle as the ids from the re-entered node to the node closing it.
    pub cycles: Vec<Vec<ComponentId>>,
    /// The graph the order was derived from.
    pub graph: DependencyGraph,
}

impl Resolution {
    /// Whether the order omits components because of cycles.
    pub fn is_partial(&self) -> bool {
        !self.cycles.is_empty()
    }

    /// The complete order, or the cycles that prevent one.
    pub fn into_order(self) -> EngineResult<Vec<ComponentId>> {
        if self.cycles.is_empty() {
            Ok(self.order)
        } else {
            Err(MigrationError::DependencyCycle {
                cycles: self.cycles,
            })
        }
    }

    /// Components left out of the order (in or downstream of a cycle).
    pub fn blocked(&self) -> Vec<ComponentId> {
        let ordered: HashSet<&ComponentId> = self.order.iter().collect();
        self.graph
            .nodes
            .iter()
            .filter(|n| !ordered.contains(n))
            .cloned()
            .collect()
    }

    /// Components that are members of some cycle.
    pub fn cyclic(&self) -> HashSet<ComponentId> {
        self.cycles.iter().flatten().cloned().collect()
    }

    /// Group the order into waves; every provider sits in an earlier wave
    /// than its consumers.
    pub fn levels(&self) -> Vec<Vec<ComponentId>> {
        let mut level: HashMap<&ComponentId, usize> = HashMap::new();
        let mut waves: Vec<Vec<ComponentId>> = Vec::new();
        for id in &self.order {
            let depth = self
                .graph
                .providers_of(id)
                .filter_map(|p| level.get(p))
                .map(|l| l + 1)
                .max()
                .unwrap_or(0);
            level.insert(id, depth);
            if waves.len() <= depth {
                waves.resize_with(depth + 1, Vec::new);
            }
            waves[depth].push(id.clone());
        }
        waves
    }
}

/// Build the dependency graph over a set of discovered components.
pub fn build_graph(models: &[ComponentModel]) -> DependencyGraph {
    let mut nodes: Vec<ComponentId> = models.iter().map(|m| m.id.clone()).collect();
    nodes.sort();
    nodes.dedup();
    let known: HashSet<&ComponentId> = nodes.iter().collect();

    let mut by_name: HashMap<&str, Vec<&ComponentId>> = HashMap::new();
    for model in models {
        by_name.entry(model.name.as_str()).or_default().push(&model.id);
    }

    let mut edges: Vec<DependencyEdge> = Vec::new();
    for consumer in models {
        for dep in &consumer.dependencies {
            let kind = match dep.class {
                DependencyClass::Component => EdgeKind::ComponentReference,
                DependencyClass::Utility => EdgeKind::SharedUtility,
                DependencyClass::Library => continue,
            };
            let by_path = dep
                .is_relative()
                .then(|| resolve_specifier(&consumer.location.path, &dep.source))
                .flatten()
                .into_iter()
                .flat_map(|base| [ComponentId::new(base.clone()), ComponentId::new(format!("{base}/index"))])
                .find(|id| known.contains(id));
            let provider = by_path.or_else(|| {
                if dep.class != DependencyClass::Component {
                    return None;
                }
                match by_name.get(dep.name.as_str()) {
                    Some(ids) if ids.len() == 1 => Some(ids[0].clone()),
                    _ => None,
                }
            });
            let Some(provider) = provider else {
                continue;
            };
            if provider == consumer.id {
                continue;
            }
            let edge = DependencyEdge {
                from: provider,
                to: consumer.id.clone(),
                kind,
            };
            if !edges.iter().any(|e| e.from == edge.from && e.to == edge.to) {
                edges.push(edge);
            }
        }
    }
    edges.sort_by(|a, b| (&a.from, &a.to).cmp(&(&b.from, &b.to)));

    DependencyGraph { nodes, edges }
}

/// Output directory of every component in a batch, for rewriting imports
/// between migrated components.
#[derive(Debug, Clone, Default)]
pub struct TargetIndex {
    names: HashMap<ComponentId, String>,
}

impl TargetIndex {
    /// Index the components of a batch.
    pub fn from_models(models: &[ComponentModel]) -> Self {
        Self {
            names: models
                .iter()
                .filter(|m| !m.is_failed())
                .map(|m| (m.id.clone(), m.name.clone()))
                .collect(),
        }
    }

    /// Whether the index holds no components.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Specifier reaching the migrated provider from a migrated consumer's
    /// directory, when the import points at a component of the batch.
    pub fn rewrite(&self, importer: &Path, specifier: &str) -> Option<String> {
        if !specifier.starts_with('.') {
            return None;
        }
        let base = resolve_specifier(importer, specifier)?;
        [base.clone(), format!("{base}/index")]
            .into_iter()
            .find_map(|id| self.names.get(&ComponentId::new(id)))
            .map(|name| format!("../{name}"))
    }
}

/// Normalize `specifier` relative to the importing file; returns an id-shaped
/// path without extension.
fn resolve_specifier(importer: &Path, specifier: &str) -> Option<String> {
    let base = importer.parent().unwrap_or_else(|| Path::new(""));
    let mut parts: Vec<String> = Vec::new();
    for component in base.join(specifier).components() {
        match component {
            PathComponent::Normal(p) => parts.push(p.to_string_lossy().to_string()),
            PathComponent::ParentDir => {
                parts.pop()?;
            }
            _ => {}
        }
    }
    let joined: PathBuf = parts.iter().collect();
    let stripped = match joined.extension().and_then(|e| e.to_str()) {
        Some("tsx" | "ts" | "jsx" | "js") => joined.with_extension(""),
        _ => joined,
    };
    Some(
        stripped
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect::<Vec<_>>()
            .join("/"),
    )
}

/// Order components so every provider precedes its consumers.
pub fn resolve(models: &[ComponentModel]) -> Resolution {
    let graph = build_graph(models);
    let (pg, index) = graph.to_petgraph();

    let mut walk = Walk {
        graph: &pg,
        state: HashMap::new(),
        stack: Vec::new(),
        order: Vec::new(),
        cycles: Vec::new(),
    };
    for id in &graph.nodes {
        if let Some(&idx) = index.get(id) {
            walk.visit(idx);
        }
    }

    let Walk { order, cycles, .. } = walk;
    let order = if cycles.is_empty() {
        order
    } else {
        let tainted = downstream_of(&graph, cycles.iter().flatten());
        order.into_iter().filter(|id| !tainted.contains(id)).collect()
    };

    if cycles.is_empty() {
        debug!(
            components = graph.node_count(),
            edges = graph.edge_count(),
            "Resolved migration order"
        );
    } else {
        warn!(
            cycles = cycles.len(),
            ordered = order.len(),
            components = graph.node_count(),
            "Dependency cycles detected; order is partial"
        );
    }

    Resolution {
        order,
        cycles,
        graph,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

struct Walk<'g> {
    graph: &'g StableDiGraph<ComponentId, EdgeKind>,
    state: HashMap<NodeIndex, Mark>,
    stack: Vec<NodeIndex>,
    order: Vec<ComponentId>,
    cycles: Vec<Vec<ComponentId>>,
}

impl Walk<'_> {
    fn visit(&mut self, node: NodeIndex) {
        match self.state.get(&node) {
            Some(Mark::Done) => return,
            Some(Mark::Visiting) => {
                self.record_cycle(node);
                return;
            }
            None => {}
        }
        self.state.insert(node, Mark::Visiting);
        self.stack.push(node);

        let mut providers: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(node, Direction::Incoming)
            .collect();
        providers.sort_by(|a, b| self.graph[*a].cmp(&self.graph[*b]));
        providers.dedup();
        for provider in providers {
            self.visit(provider);
        }

        self.stack.pop();
        self.state.insert(node, Mark::Done);
        self.order.push(self.graph[node].clone());
    }

    fn record_cycle(&mut self, reentered: NodeIndex) {
        let Some(start) = self.stack.iter().position(|n| *n == reentered) else {
            return;
        };
        let cycle: Vec<ComponentId> = self.stack[start..]
            .iter()
            .map(|n| self.graph[*n].clone())
            .collect();
        let canonical = rotate_to_min(&cycle);
        if !self.cycles.iter().any(|c| rotate_to_min(c) == canonical) {
            self.cycles.push(cycle);
        }
    }
}

fn rotate_to_min(cycle: &[ComponentId]) -> Vec<ComponentId> {
    let Some(min) = cycle
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.cmp(b.1))
        .map(|(i, _)| i)
    else {
        return Vec::new();
    };
    cycle[min..]
        .iter()
        .chain(cycle[..min].iter())
        .cloned()
        .collect()
}

/// Everything reachable from `seeds` along provider -> consumer edges, seeds included.
fn downstream_of<'a>(
    graph: &DependencyGraph,
    seeds: impl Iterator<Item = &'a ComponentId>,
) -> HashSet<ComponentId> {
    let mut seen: HashSet<ComponentId> = HashSet::new();
    let mut queue: Vec<ComponentId> = seeds.cloned().collect();
    while let Some(id) = queue.pop() {
        if !seen.insert(id.clone()) {
            continue;
        }
        queue.extend(graph.consumers_of(&id).cloned());
    }
    seen
}
