//! Request DTOs for operations.
//!
//! Each request carries the per-call overrides of an operation; anything left
//! unset falls back to the context's [`MigrationConfig`](crate::MigrationConfig).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::ProcessingMode;

/// Request to migrate every discovered component.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrateRequest {
    /// Overrides `source_root`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_root: Option<PathBuf>,

    /// Overrides `output_root`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_root: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<ProcessingMode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    /// Run every stage but the write; no manifest is saved.
    #[serde(default)]
    pub dry_run: bool,
}

impl MigrateRequest {
    /// Migrate `source` into `output`.
    pub fn new(source: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            source_root: Some(source.into()),
            output_root: Some(output.into()),
            ..Self::default()
        }
    }

    /// Process up to `concurrency` components of a wave at once.
    pub fn parallel(mut self, concurrency: usize) -> Self {
        self.mode = Some(ProcessingMode::Parallel);
        self.concurrency = Some(concurrency);
        self
    }

    /// Process one component at a time.
    pub fn serial(mut self) -> Self {
        self.mode = Some(ProcessingMode::Serial);
        self
    }

    /// Skip the write stage and the manifest.
    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }
}

/// Request to extract and analyze components without migrating them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_root: Option<PathBuf>,

    /// Files relative to the source root; empty means discover.
    #[serde(default)]
    pub paths: Vec<PathBuf>,
}

impl AnalyzeRequest {
    /// Analyze everything under `source`.
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source_root: Some(source.into()),
            paths: Vec::new(),
        }
    }

    /// Restrict analysis to specific files.
    pub fn with_paths(mut self, paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        self.paths.extend(paths.into_iter().map(Into::into));
        self
    }
}

/// Request to compute the migration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_root: Option<PathBuf>,
}

impl PlanRequest {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source_root: Some(source.into()),
        }
    }
}

/// Request to inspect the last run under an output root.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_root: Option<PathBuf>,
}

impl StatusRequest {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output_root: Some(output.into()),
        }
    }
}
