//! Status command implementation.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use humansize::{format_size, DECIMAL};
use refit_core::MigrationStatus;
use refit_ops::{MigrationConfig, OpsContext, StatusRequest};

use crate::output;

/// Show the last run recorded under the output root.
pub async fn execute(
    config: MigrationConfig,
    output_root: Option<PathBuf>,
    json: bool,
) -> Result<ExitCode> {
    let ctx = OpsContext::new(config);
    let response = ctx.status(StatusRequest { output_root }).await?;

    if json {
        output::print_json(&response)?;
        return Ok(ExitCode::SUCCESS);
    }

    println!("📊 Refit Status");
    println!("{:─<50}", "");
    println!("📍 Output:     {}", response.output_root.display());
    println!("💾 Size:       {}", response.human_output_size());

    let Some(manifest) = &response.manifest else {
        println!();
        println!("No run recorded yet. Run `refit migrate` first.");
        return Ok(ExitCode::SUCCESS);
    };

    println!("🆔 Last run:   {}", manifest.run_id);
    if let Some(elapsed) = response.time_since_run() {
        println!("🕐 Finished:   {}", output::ago(elapsed));
    }
    println!("⏱  Duration:   {}", output::millis(manifest.duration_ms));
    println!(
        "✅ {} migrated · ⚠️  {} review · ❌ {} failed · ⏭  {} skipped",
        manifest.successful.len(),
        manifest.review_required.len(),
        manifest.failed.len(),
        manifest.skipped.len()
    );
    if let Some(reason) = &manifest.aborted {
        println!("🛑 Stopped:    {}", reason);
    }

    if !manifest.failed.is_empty() {
        println!();
        println!("Failures:");
        output::print_failures(&manifest.failed);
    }

    let written: Vec<_> = response
        .results
        .iter()
        .filter(|r| r.status != MigrationStatus::Failed)
        .collect();
    if !written.is_empty() {
        println!();
        println!("Components:");
        for result in written {
            let bytes: u64 = result.artifacts.iter().map(|a| a.size).sum();
            let score = result
                .validation
                .as_ref()
                .map(|v| v.score.to_string())
                .unwrap_or_else(|| "-".into());
            println!(
                "   • {:<32} score {:>3}  {:>9}  {} attempt(s)",
                result.component.to_string(),
                score,
                format_size(bytes, DECIMAL),
                result.attempts
            );
        }
    }

    Ok(ExitCode::SUCCESS)
}
