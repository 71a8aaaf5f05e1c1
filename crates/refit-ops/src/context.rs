//! OpsContext - the orchestrator.
//!
//! Drives a batch through discovery, extraction, resolution and the
//! per-component stages, and owns the run manifest and progress state.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use refit_core::{
    ComponentId, ComponentModel, GeneratedArtifact, MigrationResult, MigrationStatus,
    SourceLocation, StageTimings, ValidationOutcome,
};
use refit_engine::{
    resolve, EngineResult, Extractor, MigrationError, ParsedComponent, Pipeline, TargetIndex,
    Transformation, TransformedModel,
};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::MigrationConfig;
use crate::error::{OpsError, OpsResult};
use crate::requests::*;
use crate::responses::*;
use crate::retry::{run_with_retry, OperationKind, RetryPolicy};
use crate::scan::{discover, ScanFilter};
use crate::state::{RunPhase, RunSnapshot, RunState};
use crate::store::{FailedEntry, FailureKind, Manifest, Store};

/// The main operations context.
///
/// Holds configuration, the injected stage implementations and the run
/// state. Cheap to clone; clones share the pipeline and the state channel.
#[derive(Debug, Clone)]
pub struct OpsContext {
    /// Configuration for operations.
    pub config: MigrationConfig,
    pipeline: Arc<Pipeline>,
    state: RunState,
}

impl OpsContext {
    /// Create a context running the engine's standard stages.
    pub fn new(config: MigrationConfig) -> Self {
        let pipeline = Pipeline::standard(config.analyzer.clone(), config.validation);
        Self {
            config,
            pipeline: Arc::new(pipeline),
            state: RunState::new(),
        }
    }

    /// Create a context from the configuration on disk.
    pub fn default_config() -> OpsResult<Self> {
        Ok(Self::new(MigrationConfig::load()?))
    }

    /// Replace the stage implementations.
    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = Arc::new(pipeline);
        self
    }

    /// The stage implementations this context runs.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Progress of the current or last run.
    pub fn state(&self) -> &RunState {
        &self.state
    }

    // =========================================================================
    // Read-only Operations
    // =========================================================================

    /// Extract and analyze components without transforming them.
    pub async fn analyze(&self, request: AnalyzeRequest) -> OpsResult<AnalyzeResponse> {
        let mut config = self.config.clone();
        if let Some(root) = request.source_root {
            config.source_root = root;
        }
        let files = if request.paths.is_empty() {
            self.discover(&config)?
        } else {
            request.paths
        };

        let loaded = self
            .load(&config, &files, &CancellationToken::new())
            .await;
        Ok(AnalyzeResponse {
            components: loaded
                .parsed
                .iter()
                .map(|job| ComponentSummary::from_model(&job.parsed.model))
                .collect(),
            failed: loaded.failed_entries(),
            failed_models: loaded.failed_models(),
        })
    }

    /// Compute the dependency order without migrating.
    pub async fn plan(&self, request: PlanRequest) -> OpsResult<PlanResponse> {
        let mut config = self.config.clone();
        if let Some(root) = request.source_root {
            config.source_root = root;
        }
        let files = self.discover(&config)?;
        let loaded = self
            .load(&config, &files, &CancellationToken::new())
            .await;

        let models: Vec<_> = loaded.parsed.iter().map(|j| j.parsed.model.clone()).collect();
        let resolution = resolve(&models);
        Ok(PlanResponse {
            waves: resolution.levels(),
            blocked: resolution.blocked(),
            order: resolution.order,
            cycles: resolution.cycles,
            edges: resolution.graph.edges,
            failed: loaded.failed_entries(),
        })
    }

    /// Inspect the run recorded under an output root.
    pub async fn status(&self, request: StatusRequest) -> OpsResult<StatusResponse> {
        let output_root = request
            .output_root
            .unwrap_or_else(|| self.config.output_root.clone());
        let store = Store::new(&output_root);
        let manifest = store.load_manifest()?;
        let results = if manifest.is_some() {
            store.load_results()?
        } else {
            Vec::new()
        };
        Ok(StatusResponse {
            store_exists: store.exists(),
            output_size: store.output_size(),
            output_root,
            manifest,
            results,
        })
    }

    // =========================================================================
    // Migration
    // =========================================================================

    /// Migrate every discovered component.
    pub async fn migrate(&self, request: MigrateRequest) -> OpsResult<MigrateResponse> {
        self.migrate_with_cancel(request, CancellationToken::new())
            .await
    }

    /// Migrate every discovered component, stopping early when `cancel` fires.
    ///
    /// Artifacts committed before cancellation stay in place; every component
    /// not finished by then is recorded as cancelled.
    pub async fn migrate_with_cancel(
        &self,
        request: MigrateRequest,
        cancel: CancellationToken,
    ) -> OpsResult<MigrateResponse> {
        let config = self.effective(&request)?;
        let mut manifest = Manifest::begin(&config);
        self.state.set(RunSnapshot {
            phase: RunPhase::Discovering,
            ..RunSnapshot::default()
        });

        info!(
            run_id = %manifest.run_id,
            source = %config.source_root.display(),
            output = %config.output_root.display(),
            mode = config.mode.label(),
            "Starting migration"
        );

        let files = self.discover(&config)?;
        self.state.update(|s| s.total = files.len());

        // Extraction and analysis.
        self.state.enter(RunPhase::Analyzing);
        let loaded = self.load(&config, &files, &cancel).await;
        let mut results: Vec<MigrationResult> = Vec::with_capacity(files.len());
        let mut halted = false;
        for failure in &loaded.failed {
            manifest.record(&failure.result, Some(failure.kind));
            results.push(failure.result.clone());
            self.state.finished(true);
            halted |= !config.continue_on_error && failure.kind != FailureKind::Cancelled;
        }

        // Resolution.
        self.state.enter(RunPhase::Resolving);
        let models: Vec<_> = loaded.parsed.iter().map(|j| j.parsed.model.clone()).collect();
        let resolution = resolve(&models);
        let targets = TargetIndex::from_models(&[models, loaded.failed_models()].concat());
        manifest.cycles = resolution.cycles.clone();

        let mut jobs: HashMap<ComponentId, Job> = loaded
            .parsed
            .into_iter()
            .map(|job| (job.parsed.model.id.clone(), job))
            .collect();

        if resolution.is_partial() {
            let cycle_error = MigrationError::DependencyCycle {
                cycles: resolution.cycles.clone(),
            };
            let message = cycle_error.to_string();
            if config.skip_cyclic {
                warn!(cycles = resolution.cycles.len(), "Skipping components in dependency cycles");
            } else {
                error!(error = %message, "Dependency resolution failed");
                manifest.aborted = Some(format!("resolution failed: {}", message));
            }
            for id in resolution.blocked() {
                if let Some(job) = jobs.remove(&id) {
                    let result = MigrationResult::failure(
                        id,
                        job.parsed.model.name.clone(),
                        format!("not migrated: {}", message),
                    );
                    manifest.record(&result, Some(FailureKind::ResolutionError));
                    results.push(result);
                    self.state.finished(true);
                }
            }
            if !config.skip_cyclic {
                halted = true;
            }
        }

        // Per-component stages.
        let batches = if halted {
            Vec::new()
        } else if config.worker_limit() == 1 {
            vec![resolution.order.clone()]
        } else {
            resolution.levels()
        };
        if halted && manifest.aborted.is_none() {
            manifest.aborted = Some("halted after the first failure".to_string());
        }

        let worker = Arc::new(Worker {
            pipeline: Arc::clone(&self.pipeline),
            targets: Arc::new(targets),
            source_root: config.source_root.clone(),
            output_root: config.output_root.clone(),
            policy: config.retry.clone(),
            timeout: config.timeout(),
            cancel: cancel.clone(),
            halt: CancellationToken::new(),
            continue_on_error: config.continue_on_error,
            dry_run: request.dry_run,
            state: self.state.clone(),
        });

        self.state.enter(RunPhase::Migrating);
        let mut claimed: HashMap<String, ComponentId> = HashMap::new();
        let wave_count = batches.len();
        for (index, batch) in batches.into_iter().enumerate() {
            self.state.update(|s| s.wave = Some((index + 1, wave_count)));
            debug!(wave = index + 1, waves = wave_count, size = batch.len(), "Starting wave");

            let mut tasks = Vec::with_capacity(batch.len());
            for id in batch {
                let Some(job) = jobs.remove(&id) else {
                    continue;
                };
                let name = job.parsed.model.name.clone();
                if let Some(owner) = claimed.get(&name) {
                    let result = MigrationResult::failure(
                        id,
                        name.clone(),
                        format!("output directory {}/ is already claimed by {}", name, owner),
                    );
                    manifest.record(&result, Some(FailureKind::GenerationError));
                    results.push(result);
                    self.state.finished(true);
                    continue;
                }
                claimed.insert(name, id.clone());
                tasks.push((Arc::clone(&worker).run(job), id));
            }

            for (processed, id) in run_bounded(config.worker_limit(), tasks).await {
                match processed {
                    Some(Processed::Done(outcome)) => {
                        manifest.record(&outcome.result, outcome.failure);
                        results.push(outcome.result);
                    }
                    Some(Processed::Skipped { component }) => manifest.skipped.push(component),
                    Some(Processed::Cancelled { result }) => {
                        manifest.record(&result, Some(FailureKind::Cancelled));
                        results.push(result);
                    }
                    None => {
                        let result = MigrationResult::failure(id.clone(), id.as_str(), "worker task failed");
                        manifest.record(&result, Some(FailureKind::Internal));
                        results.push(result);
                        self.state.finished(true);
                    }
                }
            }
        }

        // Anything never scheduled (halted runs) counts as skipped.
        let mut leftover: Vec<ComponentId> = jobs.into_keys().collect();
        leftover.sort();
        manifest.skipped.extend(leftover);

        if cancel.is_cancelled() && manifest.aborted.is_none() {
            manifest.aborted = Some("cancelled".to_string());
        }
        if !worker.continue_on_error && worker.halt.is_cancelled() && manifest.aborted.is_none() {
            manifest.aborted = Some("halted after the first failure".to_string());
        }
        manifest.finish();

        let manifest_path = if request.dry_run {
            None
        } else {
            self.state.enter(RunPhase::Persisting);
            Some(Store::new(&config.output_root).save(&manifest, &results)?)
        };

        self.state.enter(if cancel.is_cancelled() {
            RunPhase::Cancelled
        } else {
            RunPhase::Finished
        });
        info!(
            run_id = %manifest.run_id,
            successful = manifest.successful.len(),
            review_required = manifest.review_required.len(),
            failed = manifest.failed.len(),
            skipped = manifest.skipped.len(),
            duration_ms = manifest.duration_ms,
            "Migration finished"
        );

        Ok(MigrateResponse {
            manifest,
            results,
            manifest_path,
        })
    }

    /// Configuration with the request's overrides applied.
    fn effective(&self, request: &MigrateRequest) -> OpsResult<MigrationConfig> {
        let mut config = self.config.clone();
        if let Some(root) = &request.source_root {
            config.source_root = root.clone();
        }
        if let Some(root) = &request.output_root {
            config.output_root = root.clone();
        }
        if let Some(mode) = request.mode {
            config.mode = mode;
        }
        if let Some(n) = request.concurrency {
            config.concurrency = n;
        }
        config.check()?;
        Ok(config)
    }

    fn discover(&self, config: &MigrationConfig) -> OpsResult<Vec<PathBuf>> {
        let filter = ScanFilter::new(&config.include, &config.exclude)?;
        let files = discover(&config.source_root, &filter)?;
        info!(root = %config.source_root.display(), files = files.len(), "Discovered sources");
        Ok(files)
    }

    /// Read and parse every file; each worker gets its own model.
    async fn load(
        &self,
        config: &MigrationConfig,
        files: &[PathBuf],
        cancel: &CancellationToken,
    ) -> Loaded {
        let worker = Arc::new(Worker {
            pipeline: Arc::clone(&self.pipeline),
            targets: Arc::new(TargetIndex::default()),
            source_root: config.source_root.clone(),
            output_root: config.output_root.clone(),
            policy: config.retry.clone(),
            timeout: config.timeout(),
            cancel: cancel.clone(),
            halt: CancellationToken::new(),
            continue_on_error: config.continue_on_error,
            dry_run: true,
            state: self.state.clone(),
        });

        let tasks: Vec<_> = files
            .iter()
            .map(|relative| {
                let worker = Arc::clone(&worker);
                let path = relative.clone();
                (async move { worker.load(path).await }, relative.clone())
            })
            .collect();

        let mut loaded = Loaded::default();
        for (outcome, relative) in run_bounded(config.worker_limit(), tasks).await {
            match outcome {
                Some(Ok(job)) => loaded.parsed.push(job),
                Some(Err(failure)) => loaded.failed.push(failure),
                None => {
                    let model = ComponentModel::failed(
                        ComponentId::from_relative_path(&relative),
                        SourceLocation::file(&relative),
                        "worker task failed",
                    );
                    let result = MigrationResult::failure(
                        model.id.clone(),
                        model.name.clone(),
                        "worker task failed",
                    );
                    loaded.failed.push(LoadFailure {
                        kind: FailureKind::Internal,
                        model,
                        result,
                    });
                }
            }
        }
        loaded
    }
}

// =============================================================================
// Workers
// =============================================================================

/// A parsed component waiting for the per-component stages.
struct Job {
    parsed: ParsedComponent,
    timings: StageTimings,
    attempts: u32,
}

/// A file that never produced a model.
struct LoadFailure {
    kind: FailureKind,
    model: ComponentModel,
    result: MigrationResult,
}

#[derive(Default)]
struct Loaded {
    parsed: Vec<Job>,
    failed: Vec<LoadFailure>,
}

impl Loaded {
    fn failed_entries(&self) -> Vec<FailedEntry> {
        self.failed
            .iter()
            .map(|f| {
                FailedEntry::new(
                    f.result.component.clone(),
                    f.kind,
                    &f.result.errors.join("; "),
                )
            })
            .collect()
    }

    fn failed_models(&self) -> Vec<ComponentModel> {
        self.failed.iter().map(|f| f.model.clone()).collect()
    }
}

/// Final result of one component plus its failure class.
struct Outcome {
    result: MigrationResult,
    failure: Option<FailureKind>,
}

enum Processed {
    Done(Outcome),
    Skipped { component: ComponentId },
    Cancelled { result: MigrationResult },
}

/// Everything a component task needs, shared by all tasks of a run.
struct Worker {
    pipeline: Arc<Pipeline>,
    targets: Arc<TargetIndex>,
    source_root: PathBuf,
    output_root: PathBuf,
    policy: RetryPolicy,
    timeout: Option<Duration>,
    cancel: CancellationToken,
    /// Fired when a failure must stop the batch.
    halt: CancellationToken,
    continue_on_error: bool,
    dry_run: bool,
    state: RunState,
}

impl Worker {
    /// Read and parse one file.
    async fn load(self: Arc<Self>, relative: PathBuf) -> Result<Job, LoadFailure> {
        let id = ComponentId::from_relative_path(&relative);
        let full = self.source_root.join(&relative);
        let mut timings = StageTimings::default();

        let started = Instant::now();
        let read = run_with_retry(
            &self.policy,
            OperationKind::FileRead,
            self.timeout,
            &self.cancel,
            |_| read_source(full.clone()),
        )
        .await;
        timings.read_ms = elapsed_ms(started);
        let mut attempts = 1 + read.attempts.saturating_sub(1);
        let source = read.outcome.map_err(|e| load_failure(&relative, &e, attempts))?;

        let started = Instant::now();
        let parsed = run_with_retry(
            &self.policy,
            OperationKind::Parse,
            self.timeout,
            &self.cancel,
            |attempt| {
                let worker = Arc::clone(&self);
                let relative = relative.clone();
                let full = full.clone();
                let first = (attempt == 1).then(|| source.clone());
                async move {
                    // A retry re-reads the file in case it was mid-save.
                    let text = match first {
                        Some(text) => text,
                        None => read_source(full).await?,
                    };
                    blocking(move || worker.pipeline.parser.parse(&text, &relative)).await
                }
            },
        )
        .await;
        timings.analyze_ms = elapsed_ms(started);
        attempts += parsed.attempts.saturating_sub(1);
        let parsed = parsed.outcome.map_err(|e| load_failure(&relative, &e, attempts))?;

        debug!(
            component = %id,
            operation = "parse",
            duration_ms = timings.read_ms + timings.analyze_ms,
            "Loaded component"
        );
        Ok(Job {
            parsed,
            timings,
            attempts,
        })
    }

    /// Gatekeeper around [`migrate`](Self::migrate).
    async fn run(self: Arc<Self>, job: Job) -> Processed {
        let id = job.parsed.model.id.clone();
        if self.cancel.is_cancelled() {
            let result = cancelled(&job);
            self.state.finished(true);
            return Processed::Cancelled { result };
        }
        if self.halt.is_cancelled() {
            debug!(component = %id, "Skipped after halt");
            return Processed::Skipped { component: id };
        }

        self.state.started(&id);
        let outcome = Arc::clone(&self).migrate(job).await;
        let failed = outcome.failure.is_some();
        self.state.finished(failed);

        match outcome.failure {
            Some(FailureKind::Cancelled) => Processed::Cancelled {
                result: outcome.result,
            },
            Some(kind) => {
                if !self.continue_on_error {
                    warn!(component = %id, kind = %kind, "Halting batch after failure");
                    self.halt.cancel();
                }
                Processed::Done(outcome)
            }
            None => Processed::Done(outcome),
        }
    }

    /// Transform, generate, validate and write one component.
    async fn migrate(self: Arc<Self>, job: Job) -> Outcome {
        let started = Instant::now();
        let mut timings = job.timings;
        let mut attempts = job.attempts;
        let parsed = Arc::new(job.parsed);
        let id = parsed.model.id.clone();
        let name = parsed.model.name.clone();

        let mut tracker = Tracker {
            id: &id,
            name: &name,
            attempts: &mut attempts,
            timings: &mut timings,
            started,
        };

        // Transform.
        let step = Instant::now();
        let transformed = self
            .stage(OperationKind::Transform, {
                let parsed = Arc::clone(&parsed);
                let pipeline = Arc::clone(&self.pipeline);
                let targets = Arc::clone(&self.targets);
                move || pipeline.transformer.transform(&parsed, &targets)
            })
            .await;
        tracker.timings.transform_ms = elapsed_ms(step);
        let Transformation {
            model,
            records,
            strategy,
            manual_review,
        } = match tracker.settle(transformed) {
            Ok(t) => t,
            Err(outcome) => return outcome,
        };
        let model: Arc<TransformedModel> = Arc::new(model);

        // Generate.
        let step = Instant::now();
        let generated = self
            .stage(OperationKind::Generate, {
                let model = Arc::clone(&model);
                let pipeline = Arc::clone(&self.pipeline);
                move || pipeline.generator.generate(&model)
            })
            .await;
        tracker.timings.generate_ms = elapsed_ms(step);
        let artifacts: Arc<Vec<GeneratedArtifact>> = match tracker.settle(generated) {
            Ok(a) => Arc::new(a),
            Err(mut outcome) => {
                outcome.result.strategy = Some(strategy);
                outcome.result.records = records;
                return outcome;
            }
        };

        // Validate.
        let step = Instant::now();
        let validated = self
            .stage(OperationKind::Validate, {
                let parsed = Arc::clone(&parsed);
                let artifacts = Arc::clone(&artifacts);
                let pipeline = Arc::clone(&self.pipeline);
                move || Ok(pipeline.validator.validate(&parsed.model, &artifacts))
            })
            .await;
        tracker.timings.validate_ms = elapsed_ms(step);
        let validation = match tracker.settle(validated) {
            Ok(v) => v,
            Err(mut outcome) => {
                outcome.result.strategy = Some(strategy);
                outcome.result.records = records;
                return outcome;
            }
        };

        let mut result = MigrationResult {
            component: id.clone(),
            name: name.clone(),
            status: MigrationStatus::Failed,
            manual_review,
            strategy: Some(strategy),
            records,
            artifacts: Vec::new(),
            validation: Some(validation.clone()),
            timings: StageTimings::default(),
            attempts: 1,
            errors: Vec::new(),
        };

        if !validation.valid {
            result.errors.push(validation_summary(&validation));
            return tracker.finish(result, Some(FailureKind::ValidationFailure));
        }

        // Write. No timeout: an abandoned write could still commit later.
        if !self.dry_run {
            let step = Instant::now();
            let written = run_with_retry(
                &self.policy,
                OperationKind::FileWrite,
                None,
                &self.cancel,
                |_| {
                    let pipeline = Arc::clone(&self.pipeline);
                    let root = self.output_root.clone();
                    let artifacts = Arc::clone(&artifacts);
                    blocking(move || pipeline.writer.write(&root, &artifacts))
                },
            )
            .await;
            *tracker.attempts += written.attempts.saturating_sub(1);
            tracker.timings.write_ms = elapsed_ms(step);
            if let Err(e) = written.outcome {
                result.errors.push(e.to_string());
                let kind = FailureKind::of(&e);
                return tracker.finish(result, Some(kind));
            }
        }

        result.artifacts = artifacts.iter().map(|a| a.descriptor()).collect();
        result.status = if manual_review {
            MigrationStatus::NeedsReview
        } else {
            MigrationStatus::Migrated
        };
        tracker.finish(result, None)
    }

    /// Run a synchronous stage off the async threads under the retry policy.
    async fn stage<T, F>(&self, kind: OperationKind, f: F) -> (OpsResult<T>, u32)
    where
        T: Send + 'static,
        F: Fn() -> EngineResult<T> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let attempted = run_with_retry(&self.policy, kind, self.timeout, &self.cancel, |_| {
            let f = Arc::clone(&f);
            blocking(move || (*f)())
        })
        .await;
        (attempted.outcome, attempted.attempts)
    }
}

/// Accumulates attempts and timings while a component moves through stages.
struct Tracker<'a> {
    id: &'a ComponentId,
    name: &'a str,
    attempts: &'a mut u32,
    timings: &'a mut StageTimings,
    started: Instant,
}

impl Tracker<'_> {
    /// Unwrap a stage result or turn it into a failed outcome.
    fn settle<T>(&mut self, (outcome, attempts): (OpsResult<T>, u32)) -> Result<T, Outcome> {
        *self.attempts += attempts.saturating_sub(1);
        outcome.map_err(|e| {
            let kind = FailureKind::of(&e);
            let result = MigrationResult::failure(self.id.clone(), self.name, e.to_string());
            self.finish(result, Some(kind))
        })
    }

    fn finish(&mut self, mut result: MigrationResult, failure: Option<FailureKind>) -> Outcome {
        self.timings.total_ms =
            self.timings.read_ms + self.timings.analyze_ms + elapsed_ms(self.started);
        result.timings = *self.timings;
        result.attempts = *self.attempts;
        if failure.is_some() {
            result.status = MigrationStatus::Failed;
        }
        if failure == Some(FailureKind::TransformationError) {
            result.manual_review = true;
        }

        let status = match result.status {
            MigrationStatus::Migrated => "migrated",
            MigrationStatus::NeedsReview => "needs-review",
            MigrationStatus::Failed => "failed",
        };
        match failure {
            Some(kind) => warn!(
                component = %self.id,
                status,
                kind = %kind,
                manual_review = result.manual_review,
                duration_ms = result.timings.total_ms,
                error = %result.errors.join("; "),
                "Component failed"
            ),
            None => info!(
                component = %self.id,
                status,
                strategy = result.strategy.map(|s| s.label()).unwrap_or("-"),
                duration_ms = result.timings.total_ms,
                "Component migrated"
            ),
        }
        Outcome { result, failure }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Run `tasks` with at most `limit` in flight, keeping input order.
///
/// A limit of one awaits the tasks in sequence on the current task. Each
/// output is paired with the key supplied for its task; `None` marks a task
/// that panicked.
async fn run_bounded<T, K, F>(limit: usize, tasks: Vec<(F, K)>) -> Vec<(Option<T>, K)>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let (futures, keys): (Vec<F>, Vec<K>) = tasks.into_iter().unzip();
    let mut slots: Vec<Option<T>> = Vec::with_capacity(futures.len());

    if limit <= 1 {
        for future in futures {
            slots.push(Some(future.await));
        }
    } else {
        slots.resize_with(futures.len(), || None);
        let semaphore = Arc::new(Semaphore::new(limit));
        let mut set = JoinSet::new();
        for (index, future) in futures.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            set.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                (index, future.await)
            });
        }
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, value)) => slots[index] = Some(value),
                Err(e) => error!(error = %e, "Worker task failed"),
            }
        }
    }

    slots.into_iter().zip(keys).collect()
}

async fn read_source(path: PathBuf) -> OpsResult<String> {
    tokio::fs::read_to_string(&path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            OpsError::Engine(MigrationError::FileNotFound { path })
        } else {
            OpsError::Io(e)
        }
    })
}

async fn blocking<T, F>(f: F) -> OpsResult<T>
where
    F: FnOnce() -> EngineResult<T> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(f).await??)
}

fn load_failure(relative: &Path, err: &OpsError, attempts: u32) -> LoadFailure {
    let kind = match err {
        OpsError::Io(_) | OpsError::Timeout { .. } => FailureKind::ExtractionError,
        other => FailureKind::of(other),
    };
    let model = match err {
        OpsError::Engine(e) => Extractor::failed_model(relative, e),
        other => ComponentModel::failed(
            ComponentId::from_relative_path(relative),
            SourceLocation::file(relative),
            other.to_string(),
        ),
    };
    let mut result = MigrationResult::failure(model.id.clone(), model.name.clone(), err.to_string());
    result.attempts = attempts;
    warn!(component = %model.id, kind = %kind, error = %err, "Extraction failed");
    LoadFailure {
        kind,
        model,
        result,
    }
}

fn cancelled(job: &Job) -> MigrationResult {
    let model = &job.parsed.model;
    MigrationResult::failure(model.id.clone(), model.name.clone(), "cancelled before start")
}

fn validation_summary(outcome: &ValidationOutcome) -> String {
    let issues: Vec<&str> = outcome.errors.iter().map(|i| i.message.as_str()).collect();
    if issues.is_empty() {
        format!("validation failed (score {})", outcome.score)
    } else {
        format!("validation failed (score {}): {}", outcome.score, issues.join("; "))
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}
