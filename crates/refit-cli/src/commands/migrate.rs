//! Migrate command implementation.
//!
//! Runs the batch, renders progress from the run state and prints the
//! manifest summary. Ctrl-C cancels the run; committed components are kept.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use refit_ops::{MigrateRequest, MigrateResponse, MigrationConfig, OpsContext, RunPhase, RunSnapshot};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::output;

/// Exit code used when the run was interrupted.
const EXIT_CANCELLED: u8 = 130;

/// Arguments of `refit migrate`.
#[derive(Args, Debug, Default)]
pub struct MigrateArgs {
    /// Source root (defaults to the configured one).
    pub source: Option<PathBuf>,

    /// Output root (defaults to the configured one).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Process the components of a dependency wave concurrently.
    #[arg(short, long, conflicts_with = "serial")]
    pub parallel: bool,

    /// Process one component at a time.
    #[arg(long)]
    pub serial: bool,

    /// Concurrency bound in parallel mode.
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// Run every stage except the write.
    #[arg(long)]
    pub dry_run: bool,

    /// Drop components in dependency cycles instead of failing the batch.
    #[arg(long)]
    pub skip_cyclic: bool,

    /// Stop after the first failed component.
    #[arg(long)]
    pub fail_fast: bool,

    /// Do not render progress on stderr.
    #[arg(long)]
    pub no_progress: bool,
}

impl MigrateArgs {
    fn request(&self, config: &MigrationConfig) -> MigrateRequest {
        let mut request = MigrateRequest {
            source_root: self.source.clone(),
            output_root: self.output.clone(),
            ..MigrateRequest::default()
        };
        if self.parallel {
            request = request.parallel(self.concurrency.unwrap_or(config.concurrency));
        } else if self.serial {
            request = request.serial();
        } else {
            request.concurrency = self.concurrency;
        }
        if self.dry_run {
            request = request.dry_run();
        }
        request
    }
}

/// Execute the migrate command.
pub async fn execute(mut config: MigrationConfig, args: MigrateArgs, json: bool) -> Result<ExitCode> {
    if args.skip_cyclic {
        config.skip_cyclic = true;
    }
    if args.fail_fast {
        config.continue_on_error = false;
    }
    let request = args.request(&config);
    debug!(?request, "Migrate request");

    let ctx = OpsContext::new(config);
    let cancel = CancellationToken::new();

    let signal = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\n⏹  Cancelling; components already written are kept");
                cancel.cancel();
            }
        }
    });
    let progress = (!json && !args.no_progress)
        .then(|| tokio::spawn(render_progress(ctx.state().subscribe())));

    let result = ctx.migrate_with_cancel(request, cancel.clone()).await;
    signal.abort();

    // Dropping the context closes the state channel, which ends the renderer.
    drop(ctx);
    if let Some(handle) = progress {
        let _ = handle.await;
    }

    let response = result?;
    if json {
        output::print_json(&response)?;
    } else {
        print_summary(&response);
    }

    let code = if cancel.is_cancelled() {
        ExitCode::from(EXIT_CANCELLED)
    } else if response.manifest.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    };
    Ok(code)
}

/// Render run snapshots on stderr until the run ends or the channel closes.
async fn render_progress(mut rx: watch::Receiver<RunSnapshot>) {
    let mut last_phase = None;
    let mut stderr = std::io::stderr();
    loop {
        let snapshot = rx.borrow_and_update().clone();
        if last_phase != Some(snapshot.phase)
            && !matches!(snapshot.phase, RunPhase::Idle | RunPhase::Migrating)
        {
            let _ = writeln!(stderr, "\r… {}", snapshot.phase);
        }
        if snapshot.phase == RunPhase::Migrating {
            let wave = snapshot
                .wave
                .map(|(n, of)| format!(" wave {}/{}", n, of))
                .unwrap_or_default();
            let current = snapshot
                .current
                .as_ref()
                .map(|c| c.to_string())
                .unwrap_or_default();
            let _ = write!(
                stderr,
                "\r  [{}/{}]{} {:<40}",
                snapshot.completed, snapshot.total, wave, current
            );
            let _ = stderr.flush();
        }
        last_phase = Some(snapshot.phase);

        if snapshot.phase.is_done() || rx.changed().await.is_err() {
            break;
        }
    }
    let _ = writeln!(stderr);
}

fn print_summary(response: &MigrateResponse) {
    let manifest = &response.manifest;

    println!();
    println!("🔁 Refit Migration");
    println!("{:─<50}", "");
    println!("🆔 Run:          {}", manifest.run_id);
    println!("⏱  Duration:     {}", output::millis(manifest.duration_ms));
    println!(
        "✅ Migrated:     {} ({} written)",
        response.migrated_count(),
        response.human_bytes_written()
    );

    if !manifest.review_required.is_empty() {
        println!("⚠️  Needs review: {}", manifest.review_required.len());
        for id in &manifest.review_required {
            println!("   • {}", id);
        }
    }

    if !manifest.failed.is_empty() {
        println!("❌ Failed:       {}", manifest.failed.len());
        output::print_failures(&manifest.failed);
    }

    if !manifest.skipped.is_empty() {
        println!("⏭  Skipped:      {}", manifest.skipped.len());
    }

    for cycle in &manifest.cycles {
        println!("♻️  Cycle:        {}", output::cycle_path(cycle));
    }

    if let Some(reason) = &manifest.aborted {
        println!("🛑 Stopped:      {}", reason);
    }

    match &response.manifest_path {
        Some(path) => println!("📄 Manifest:     {}", path.display()),
        None => println!("📄 Dry run: nothing written"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use refit_ops::ProcessingMode;

    #[test]
    fn test_parallel_flag_uses_configured_concurrency() {
        let config = MigrationConfig::default();
        let args = MigrateArgs {
            parallel: true,
            ..MigrateArgs::default()
        };
        let request = args.request(&config);
        assert_eq!(request.mode, Some(ProcessingMode::Parallel));
        assert_eq!(request.concurrency, Some(config.concurrency));
    }

    #[test]
    fn test_plain_request_defers_to_config() {
        let args = MigrateArgs {
            dry_run: true,
            ..MigrateArgs::default()
        };
        let request = args.request(&MigrationConfig::default());
        assert_eq!(request.mode, None);
        assert!(request.dry_run);
    }
}
