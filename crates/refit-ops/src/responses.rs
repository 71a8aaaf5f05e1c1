//! Response DTOs for operations.

use std::path::PathBuf;

use humansize::{format_size, DECIMAL};
use refit_core::{
    ComplexityTier, ComponentId, ComponentKind, ComponentModel, DependencyEdge, MigrationResult,
    PatternCounts, Strategy,
};
use serde::{Deserialize, Serialize};

use crate::store::{FailedEntry, Manifest};

/// Response from a migrate operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrateResponse {
    /// The run manifest.
    pub manifest: Manifest,

    /// Per-component results in processing order.
    pub results: Vec<MigrationResult>,

    /// Where the manifest was saved (absent on dry runs).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_path: Option<PathBuf>,
}

impl MigrateResponse {
    pub fn migrated_count(&self) -> usize {
        self.manifest.successful.len()
    }

    pub fn review_count(&self) -> usize {
        self.manifest.review_required.len()
    }

    pub fn failed_count(&self) -> usize {
        self.manifest.failed.len()
    }

    /// Result for one component.
    pub fn result(&self, id: &str) -> Option<&MigrationResult> {
        self.results.iter().find(|r| r.component.as_str() == id)
    }

    /// Bytes of artifacts written.
    pub fn bytes_written(&self) -> u64 {
        self.results
            .iter()
            .flat_map(|r| &r.artifacts)
            .map(|a| a.size)
            .sum()
    }

    /// Human-readable [`bytes_written`](Self::bytes_written).
    pub fn human_bytes_written(&self) -> String {
        format_size(self.bytes_written(), DECIMAL)
    }
}

/// What the analyzer found in one component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentSummary {
    pub id: ComponentId,
    pub name: String,
    pub kind: ComponentKind,
    pub path: PathBuf,
    pub inputs: usize,
    /// Local components and utilities it imports.
    pub dependencies: Vec<String>,
    pub counts: PatternCounts,
    pub score: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<ComplexityTier>,
    /// Strategy the transformer would pick.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<Strategy>,
}

impl ComponentSummary {
    pub fn from_model(model: &ComponentModel) -> Self {
        let logic = model.logic.clone().unwrap_or_default();
        Self {
            id: model.id.clone(),
            name: model.name.clone(),
            kind: model.kind,
            path: model.location.path.clone(),
            inputs: model.inputs.len(),
            dependencies: model
                .dependencies
                .iter()
                .filter(|d| d.is_relative())
                .map(|d| d.source.clone())
                .collect(),
            counts: logic.counts(),
            score: logic.complexity_score,
            tier: model.complexity,
            strategy: model.complexity.map(Strategy::for_tier),
        }
    }
}

/// Response from an analyze operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub components: Vec<ComponentSummary>,
    /// Files that could not be extracted.
    pub failed: Vec<FailedEntry>,
    /// Models of those files, each with status `failed` and the error position.
    #[serde(default)]
    pub failed_models: Vec<ComponentModel>,
}

impl AnalyzeResponse {
    /// Components per tier, simplest first.
    pub fn tier_histogram(&self) -> Vec<(ComplexityTier, usize)> {
        [
            ComplexityTier::Simple,
            ComplexityTier::Moderate,
            ComplexityTier::Complex,
            ComplexityTier::Critical,
        ]
        .into_iter()
        .map(|tier| {
            let n = self
                .components
                .iter()
                .filter(|c| c.tier == Some(tier))
                .count();
            (tier, n)
        })
        .collect()
    }
}

/// Response from a plan operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanResponse {
    /// Providers before consumers; partial when `cycles` is non-empty.
    pub order: Vec<ComponentId>,
    /// Groups that may run concurrently, in order.
    pub waves: Vec<Vec<ComponentId>>,
    pub cycles: Vec<Vec<ComponentId>>,
    /// Components left out of the order by a cycle.
    pub blocked: Vec<ComponentId>,
    pub edges: Vec<DependencyEdge>,
    /// Files that could not be extracted.
    pub failed: Vec<FailedEntry>,
}

impl PlanResponse {
    /// Whether the order covers every extracted component.
    pub fn is_complete(&self) -> bool {
        self.cycles.is_empty()
    }
}

/// Response from a status operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub output_root: PathBuf,

    /// Whether the `.refit` store exists.
    pub store_exists: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<Manifest>,

    #[serde(default)]
    pub results: Vec<MigrationResult>,

    /// Total size of the output root.
    pub output_size: u64,
}

impl StatusResponse {
    /// Check if a run has been recorded.
    pub fn has_run(&self) -> bool {
        self.store_exists && self.manifest.is_some()
    }

    /// Time since the last run finished.
    pub fn time_since_run(&self) -> Option<std::time::Duration> {
        self.manifest
            .as_ref()
            .and_then(|m| m.finished_at)
            .and_then(|t| t.elapsed().ok())
    }

    /// Human-readable output size.
    pub fn human_output_size(&self) -> String {
        format_size(self.output_size, DECIMAL)
    }
}
