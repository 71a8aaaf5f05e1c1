//! Plan command implementation.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use refit_ops::{MigrationConfig, OpsContext, PlanRequest};

use crate::output;

/// Print the migration order grouped by dependency wave.
///
/// Exits non-zero when a cycle leaves the order partial, since `migrate`
/// would refuse the batch without `--skip-cyclic`.
pub async fn execute(
    config: MigrationConfig,
    source: Option<PathBuf>,
    json: bool,
) -> Result<ExitCode> {
    let ctx = OpsContext::new(config);
    let response = ctx.plan(PlanRequest { source_root: source }).await?;

    if json {
        output::print_json(&response)?;
    } else {
        println!("🗺  Refit Plan");
        println!("{:─<50}", "");
        println!(
            "{} component(s), {} edge(s), {} wave(s)",
            response.order.len(),
            response.edges.len(),
            response.waves.len()
        );

        for (index, wave) in response.waves.iter().enumerate() {
            println!();
            println!("Wave {}:", index + 1);
            for id in wave {
                println!("   • {}", id);
            }
        }

        if !response.is_complete() {
            println!();
            for cycle in &response.cycles {
                println!("♻️  Cycle: {}", output::cycle_path(cycle));
            }
            let blocked: Vec<String> = response.blocked.iter().map(|id| id.to_string()).collect();
            println!("🚫 Blocked: {}", blocked.join(", "));
        }

        if !response.failed.is_empty() {
            println!();
            println!("❌ Not extracted: {}", response.failed.len());
            output::print_failures(&response.failed);
        }
    }

    Ok(if response.is_complete() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
