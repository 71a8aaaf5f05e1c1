//! Analyze command implementation.
//!
//! Extracts and analyzes components, then prints kind, tier and the strategy
//! the transformer would pick for each.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use refit_ops::{AnalyzeRequest, MigrationConfig, OpsContext};

use crate::output;

/// Execute the analyze command.
pub async fn execute(
    config: MigrationConfig,
    source: Option<PathBuf>,
    files: Vec<PathBuf>,
    json: bool,
    verbose: bool,
) -> Result<ExitCode> {
    let request = AnalyzeRequest {
        source_root: source,
        paths: files,
    };
    let ctx = OpsContext::new(config);
    let response = ctx.analyze(request).await?;

    if json {
        output::print_json(&response)?;
        return Ok(exit_code(response.failed.is_empty()));
    }

    println!("🔍 Refit Analysis");
    println!("{:─<50}", "");
    println!(
        "{:<36} {:<18} {:<9} {:>5}  strategy",
        "component", "kind", "tier", "score"
    );
    for component in &response.components {
        println!(
            "{:<36} {:<18} {:<9} {:>5}  {}",
            component.id.to_string(),
            component.kind.to_string(),
            component
                .tier
                .map(|t| t.to_string())
                .unwrap_or_else(|| "-".into()),
            component.score,
            component
                .strategy
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".into()),
        );
        if verbose {
            let c = &component.counts;
            println!(
                "    state {} · effects {} · handlers {} · transforms {} · rules {} · calls {}",
                c.state_bindings,
                c.side_effects,
                c.event_handlers,
                c.data_transformations,
                c.validation_rules,
                c.external_calls
            );
            if !component.dependencies.is_empty() {
                println!("    imports {}", component.dependencies.join(", "));
            }
        }
    }

    println!();
    let histogram: Vec<String> = response
        .tier_histogram()
        .into_iter()
        .map(|(tier, n)| format!("{} {}", tier, n))
        .collect();
    println!("📊 Tiers: {}", histogram.join(" · "));

    if !response.failed.is_empty() {
        println!("❌ Not extracted: {}", response.failed.len());
        output::print_failures(&response.failed);
        for model in &response.failed_models {
            println!(
                "   ↳ {}:{}:{}",
                model.location.path.display(),
                model.location.line,
                model.location.column
            );
        }
    }

    Ok(exit_code(response.failed.is_empty()))
}

fn exit_code(clean: bool) -> ExitCode {
    if clean {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
