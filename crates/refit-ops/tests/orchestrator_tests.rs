//! Orchestrator tests over small on-disk component trees.

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use refit_core::{ComponentId, ComponentModel, GeneratedArtifact, MigrationStatus, ValidationOutcome};
use refit_engine::{
    AtomicStage, EngineResult, MigrationError, Pipeline, ValidateStage, WriteReport, WriteStage,
};
use refit_ops::{
    AnalyzeRequest, FailureKind, MigrateRequest, MigrationConfig, OpsContext, PlanRequest,
    RunPhase, StatusRequest,
};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

// =============================================================================
// Fixtures
// =============================================================================

const BUTTON: &str = r#"
import React from 'react';

export interface ButtonProps {
  label: string;
  disabled?: boolean;
}

export default function Button({ label, disabled = false }: ButtonProps) {
  return <button className="btn" disabled={disabled}>{label}</button>;
}
"#;

const SIGNUP_FORM: &str = r#"
import { useState } from 'react';
import Button from '../ui/Button';

interface SignupFormProps {
  endpoint: string;
  onDone?: (id: string) => void;
}

export default function SignupForm({ endpoint, onDone }: SignupFormProps) {
  const [email, setEmail] = useState('');
  const [error, setError] = useState<string | null>(null);

  const handleSubmit = async (e: React.FormEvent) => {
    e.preventDefault();
    if (!email) {
      setError('Email is required');
      return;
    }
    try {
      const res = await fetch(endpoint, { method: 'POST', body: JSON.stringify({ email }) });
      const body = await res.json();
      onDone?.(body.id);
    } catch (err) {
      setError('Signup failed');
    }
  };

  return (
    <form onSubmit={handleSubmit}>
      <input value={email} onInput={(e) => setEmail(e.currentTarget.value)} />
      {error && <p className="error">{error}</p>}
      <Button label="Sign up" />
    </form>
  );
}
"#;

const BROKEN: &str = "export default function Broken() { return <div>; }\n";

const NO_RENDER: &str =
    "import React from 'react';\nexport default class Empty extends React.Component { state = { a: 1 }; }\n";

struct Workspace {
    _dir: TempDir,
    src: std::path::PathBuf,
    out: std::path::PathBuf,
}

impl Workspace {
    fn new(files: &[(&str, &str)]) -> Self {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        let out = dir.path().join("out");
        for (rel, content) in files {
            let path = src.join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
        }
        std::fs::create_dir_all(&src).unwrap();
        Self { _dir: dir, src, out }
    }

    fn config(&self) -> MigrationConfig {
        let mut config = MigrationConfig::default();
        config.source_root = self.src.clone();
        config.output_root = self.out.clone();
        config.retry.base_delay_ms = 1;
        config
    }

    fn context(&self) -> OpsContext {
        OpsContext::new(self.config())
    }

    fn output_dirs(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.out) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|n| !n.starts_with('.'))
            .collect();
        names.sort();
        names
    }
}

fn ids(list: &[ComponentId]) -> Vec<&str> {
    list.iter().map(|id| id.as_str()).collect()
}

/// Fails the first `failures` writes with a transient error.
struct FlakyWriter {
    failures: AtomicU32,
    calls: AtomicU32,
    inner: AtomicStage,
}

impl FlakyWriter {
    fn new(failures: u32) -> Self {
        Self {
            failures: AtomicU32::new(failures),
            calls: AtomicU32::new(0),
            inner: AtomicStage::default(),
        }
    }
}

impl WriteStage for FlakyWriter {
    fn write(&self, root: &Path, artifacts: &[GeneratedArtifact]) -> EngineResult<WriteReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failures.load(Ordering::SeqCst) > 0 {
            self.failures.fetch_sub(1, Ordering::SeqCst);
            return Err(MigrationError::write_failed(root, "device busy"));
        }
        self.inner.write(root, artifacts)
    }
}

/// Writes normally, then cancels the run.
struct CancellingWriter {
    token: CancellationToken,
    inner: AtomicStage,
}

impl WriteStage for CancellingWriter {
    fn write(&self, root: &Path, artifacts: &[GeneratedArtifact]) -> EngineResult<WriteReport> {
        let report = self.inner.write(root, artifacts);
        self.token.cancel();
        report
    }
}

struct RejectAll;

impl ValidateStage for RejectAll {
    fn validate(&self, _: &ComponentModel, _: &[GeneratedArtifact]) -> ValidationOutcome {
        ValidationOutcome {
            valid: false,
            score: 20,
            errors: Vec::new(),
            warnings: Vec::new(),
            comparisons: Vec::new(),
        }
    }
}

// =============================================================================
// Happy paths
// =============================================================================

#[tokio::test]
async fn test_serial_migration_writes_artifacts_and_manifest() {
    let ws = Workspace::new(&[
        ("forms/SignupForm.tsx", SIGNUP_FORM),
        ("ui/Button.tsx", BUTTON),
    ]);
    let ctx = ws.context();

    let response = ctx.migrate(MigrateRequest::default()).await.unwrap();

    assert_eq!(ids(&response.manifest.successful), vec!["ui/Button", "forms/SignupForm"]);
    assert!(response.manifest.is_clean(), "{:#?}", response.manifest);
    assert_eq!(ws.output_dirs(), vec!["Button", "SignupForm"]);
    for file in ["Button/Button.tsx", "Button/index.ts", "Button/README.md"] {
        assert!(ws.out.join(file).is_file(), "{file} missing");
    }

    let form = std::fs::read_to_string(ws.out.join("SignupForm/SignupForm.tsx")).unwrap();
    assert!(form.contains("import Button from \"../Button\";"));

    let path = response.manifest_path.clone().unwrap();
    assert_eq!(path, ws.out.join(".refit/manifest.json"));
    assert!(ws.out.join(".refit/results.json").is_file());

    let result = response.result("ui/Button").unwrap();
    assert_eq!(result.status, MigrationStatus::Migrated);
    assert_eq!(result.attempts, 1);
    assert_eq!(result.artifacts.len(), 3);
    assert!(response.bytes_written() > 0);

    assert_eq!(ctx.state().get().phase, RunPhase::Finished);
    assert_eq!(ctx.state().get().completed, 2);
}

#[tokio::test]
async fn test_parallel_mode_matches_serial_outcome() {
    let ws = Workspace::new(&[
        ("forms/SignupForm.tsx", SIGNUP_FORM),
        ("ui/Button.tsx", BUTTON),
        ("ui/Badge.tsx", "export default function Badge() { return <span />; }\n"),
    ]);
    let response = ws
        .context()
        .migrate(MigrateRequest::default().parallel(4))
        .await
        .unwrap();

    let mut successful = ids(&response.manifest.successful);
    successful.sort();
    assert_eq!(successful, vec!["forms/SignupForm", "ui/Badge", "ui/Button"]);

    // The consumer sits in a later wave than its provider.
    let position = |id: &str| response.results.iter().position(|r| r.component.as_str() == id);
    assert!(position("ui/Button") < position("forms/SignupForm"));
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let ws = Workspace::new(&[("ui/Button.tsx", BUTTON)]);
    let response = ws
        .context()
        .migrate(MigrateRequest::default().dry_run())
        .await
        .unwrap();

    assert_eq!(response.migrated_count(), 1);
    assert!(response.manifest_path.is_none());
    assert!(!ws.out.exists());
}

// =============================================================================
// Failure policy
// =============================================================================

#[tokio::test]
async fn test_cycle_fails_resolution_and_processes_nothing() {
    let ws = Workspace::new(&[
        ("A.tsx", "import B from './B';\nexport default function A() { return <B />; }\n"),
        ("B.tsx", "import A from './A';\nexport default function B() { return <A />; }\n"),
        ("C.tsx", "export default function C() { return <p />; }\n"),
    ]);
    let response = ws.context().migrate(MigrateRequest::default()).await.unwrap();
    let manifest = &response.manifest;

    assert_eq!(manifest.cycles.len(), 1);
    assert!(manifest.aborted.as_deref().unwrap().starts_with("resolution failed"));
    assert!(manifest.successful.is_empty());
    assert_eq!(manifest.failed.len(), 2);
    assert!(manifest
        .failed
        .iter()
        .all(|f| f.kind == FailureKind::ResolutionError));
    assert_eq!(ids(&manifest.skipped), vec!["C"]);
    assert!(ws.output_dirs().is_empty());
}

#[tokio::test]
async fn test_skip_cyclic_migrates_the_rest() {
    let ws = Workspace::new(&[
        ("A.tsx", "import B from './B';\nexport default function A() { return <B />; }\n"),
        ("B.tsx", "import A from './A';\nexport default function B() { return <A />; }\n"),
        ("C.tsx", "export default function C() { return <p />; }\n"),
    ]);
    let mut config = ws.config();
    config.skip_cyclic = true;

    let response = OpsContext::new(config)
        .migrate(MigrateRequest::default())
        .await
        .unwrap();

    assert_eq!(ids(&response.manifest.successful), vec!["C"]);
    assert_eq!(response.failed_count(), 2);
    assert!(response.manifest.aborted.is_none());
    assert_eq!(ws.output_dirs(), vec!["C"]);
}

#[tokio::test]
async fn test_extraction_failure_is_recorded_and_batch_continues() {
    let ws = Workspace::new(&[("Broken.tsx", BROKEN), ("ui/Button.tsx", BUTTON)]);
    let response = ws.context().migrate(MigrateRequest::default()).await.unwrap();

    assert_eq!(ids(&response.manifest.successful), vec!["ui/Button"]);
    let failed = &response.manifest.failed[0];
    assert_eq!(failed.component.as_str(), "Broken");
    assert_eq!(failed.kind, FailureKind::ExtractionError);
    assert!(failed.error.contains("parse failure"));

    // Parse is whitelisted, so the default policy spends all attempts.
    assert_eq!(response.result("Broken").unwrap().attempts, 3);
}

#[tokio::test]
async fn test_transformer_rejection_is_flagged_for_review() {
    let ws = Workspace::new(&[("Empty.tsx", NO_RENDER), ("ui/Button.tsx", BUTTON)]);
    let response = ws.context().migrate(MigrateRequest::default()).await.unwrap();

    assert_eq!(ids(&response.manifest.successful), vec!["ui/Button"]);
    let failed = &response.manifest.failed[0];
    assert_eq!(failed.component.as_str(), "Empty");
    assert_eq!(failed.kind, FailureKind::TransformationError);
    assert!(failed.error.contains("no render method"));
    assert_eq!(ids(&response.manifest.review_required), vec!["Empty"]);
    assert_eq!(response.manifest.total(), 2);

    let result = response.result("Empty").unwrap();
    assert_eq!(result.status, MigrationStatus::Failed);
    assert!(result.manual_review);
    assert!(!response.result("ui/Button").unwrap().manual_review);
    assert_eq!(ws.output_dirs(), vec!["Button"]);
}

#[tokio::test]
async fn test_halt_on_first_failure() {
    let ws = Workspace::new(&[("Broken.tsx", BROKEN), ("ui/Button.tsx", BUTTON)]);
    let mut config = ws.config();
    config.continue_on_error = false;

    let response = OpsContext::new(config)
        .migrate(MigrateRequest::default())
        .await
        .unwrap();

    assert!(response.manifest.successful.is_empty());
    assert_eq!(ids(&response.manifest.skipped), vec!["ui/Button"]);
    assert!(response.manifest.aborted.is_some());
    assert!(ws.output_dirs().is_empty());
}

#[tokio::test]
async fn test_transient_write_failures_are_retried() {
    let ws = Workspace::new(&[("ui/Button.tsx", BUTTON)]);
    let writer = Arc::new(FlakyWriter::new(2));
    let ctx = ws
        .context()
        .with_pipeline(Pipeline::default().with_writer(writer.clone()));

    let response = ctx.migrate(MigrateRequest::default()).await.unwrap();

    assert_eq!(response.migrated_count(), 1);
    assert_eq!(writer.calls.load(Ordering::SeqCst), 3);
    assert_eq!(response.result("ui/Button").unwrap().attempts, 3);
}

#[tokio::test]
async fn test_write_failure_after_exhausting_retries() {
    let ws = Workspace::new(&[("ui/Button.tsx", BUTTON)]);
    let writer = Arc::new(FlakyWriter::new(u32::MAX));
    let ctx = ws
        .context()
        .with_pipeline(Pipeline::default().with_writer(writer.clone()));

    let response = ctx.migrate(MigrateRequest::default()).await.unwrap();

    assert_eq!(response.manifest.failed[0].kind, FailureKind::WriteError);
    assert_eq!(writer.calls.load(Ordering::SeqCst), 3);
    assert!(ws.output_dirs().is_empty());
}

#[tokio::test]
async fn test_validation_failure_is_not_retried_or_written() {
    let ws = Workspace::new(&[("ui/Button.tsx", BUTTON)]);
    let ctx = ws
        .context()
        .with_pipeline(Pipeline::default().with_validator(Arc::new(RejectAll)));

    let response = ctx.migrate(MigrateRequest::default()).await.unwrap();

    let result = response.result("ui/Button").unwrap();
    assert_eq!(result.status, MigrationStatus::Failed);
    assert_eq!(result.attempts, 1);
    assert_eq!(result.validation.as_ref().unwrap().score, 20);
    assert_eq!(response.manifest.failed[0].kind, FailureKind::ValidationFailure);
    assert!(ws.output_dirs().is_empty());
}

#[tokio::test]
async fn test_duplicate_component_names_fail_the_second() {
    let ws = Workspace::new(&[("a/Button.tsx", BUTTON), ("b/Button.tsx", BUTTON)]);
    let response = ws.context().migrate(MigrateRequest::default()).await.unwrap();

    assert_eq!(ids(&response.manifest.successful), vec!["a/Button"]);
    assert_eq!(response.manifest.failed[0].component.as_str(), "b/Button");
    assert_eq!(response.manifest.failed[0].kind, FailureKind::GenerationError);
}

// =============================================================================
// Cancellation
// =============================================================================

#[tokio::test]
async fn test_cancelled_before_start_records_every_component() {
    let card = BUTTON.replace("Button", "Card");
    let ws = Workspace::new(&[("ui/Button.tsx", BUTTON), ("ui/Card.tsx", card.as_str())]);
    let token = CancellationToken::new();
    token.cancel();

    let response = ws
        .context()
        .migrate_with_cancel(MigrateRequest::default(), token)
        .await
        .unwrap();

    assert_eq!(response.failed_count(), 2);
    assert!(response
        .manifest
        .failed
        .iter()
        .all(|f| f.kind == FailureKind::Cancelled));
    assert_eq!(response.manifest.aborted.as_deref(), Some("cancelled"));
    assert!(ws.output_dirs().is_empty());
}

#[tokio::test]
async fn test_cancel_mid_run_keeps_committed_artifacts() {
    let ws = Workspace::new(&[
        ("forms/SignupForm.tsx", SIGNUP_FORM),
        ("ui/Button.tsx", BUTTON),
    ]);
    let token = CancellationToken::new();
    let writer = CancellingWriter {
        token: token.clone(),
        inner: AtomicStage::default(),
    };
    let ctx = ws
        .context()
        .with_pipeline(Pipeline::default().with_writer(Arc::new(writer)));

    let response = ctx
        .migrate_with_cancel(MigrateRequest::default(), token)
        .await
        .unwrap();

    assert_eq!(ids(&response.manifest.successful), vec!["ui/Button"]);
    assert_eq!(response.manifest.failed[0].component.as_str(), "forms/SignupForm");
    assert_eq!(response.manifest.failed[0].kind, FailureKind::Cancelled);
    assert_eq!(ws.output_dirs(), vec!["Button"]);
    assert_eq!(ctx.state().get().phase, RunPhase::Cancelled);
}

// =============================================================================
// Read-only operations
// =============================================================================

#[tokio::test]
async fn test_analyze_and_plan() {
    let ws = Workspace::new(&[
        ("forms/SignupForm.tsx", SIGNUP_FORM),
        ("ui/Button.tsx", BUTTON),
        ("Broken.tsx", BROKEN),
    ]);
    let ctx = ws.context();

    let analysis = ctx.analyze(AnalyzeRequest::default()).await.unwrap();
    assert_eq!(analysis.components.len(), 2);
    assert_eq!(analysis.failed.len(), 1);
    let broken = &analysis.failed_models[0];
    assert!(broken.is_failed());
    assert_eq!(broken.id.as_str(), "Broken");
    assert_eq!(broken.location.path, Path::new("Broken.tsx"));
    assert!(broken.location.line >= 1);
    let form = analysis
        .components
        .iter()
        .find(|c| c.name == "SignupForm")
        .unwrap();
    assert_eq!(form.counts.state_bindings, 2);
    assert!(form.counts.external_calls >= 1);
    assert_eq!(form.dependencies, vec!["../ui/Button"]);

    let plan = ctx.plan(PlanRequest::default()).await.unwrap();
    assert!(plan.is_complete());
    assert_eq!(ids(&plan.order), vec!["ui/Button", "forms/SignupForm"]);
    assert_eq!(plan.waves.len(), 2);
    assert_eq!(plan.edges.len(), 1);
}

#[tokio::test]
async fn test_status_reads_last_run() {
    let ws = Workspace::new(&[("ui/Button.tsx", BUTTON)]);
    let ctx = ws.context();

    let before = ctx.status(StatusRequest::default()).await.unwrap();
    assert!(!before.has_run());

    let run = ctx.migrate(MigrateRequest::default()).await.unwrap();
    let after = ctx.status(StatusRequest::default()).await.unwrap();
    assert!(after.has_run());
    assert_eq!(after.manifest.unwrap().run_id, run.manifest.run_id);
    assert_eq!(after.results.len(), 1);
    assert!(after.output_size > 0);
}
