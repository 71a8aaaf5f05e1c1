//! Config command implementation.
//!
//! Reads and edits `refit.json` (or the per-user config file).

use anyhow::{Context, Result};
use refit_ops::{MigrationConfig, CONFIG_KEYS};

use crate::output;

/// Show the effective configuration, environment overrides included.
pub fn show(config: &MigrationConfig, json: bool) -> Result<()> {
    if json {
        return output::print_json(config);
    }

    println!("Refit Configuration");
    println!("{:-<40}", "");
    for key in CONFIG_KEYS {
        println!("{:<30} {}", key, config.get(key).unwrap_or_default());
    }

    if let Some(config_path) = MigrationConfig::config_file_path() {
        println!("\nConfig file: {}", config_path.display());
    }

    Ok(())
}

/// Set a configuration value and save it.
pub fn set(config: &mut MigrationConfig, key: &str, value: &str) -> Result<()> {
    if !CONFIG_KEYS.contains(&key) {
        anyhow::bail!(
            "Unknown config key: {}. Run `refit config keys` for the list",
            key
        );
    }
    config.set(key, value)?;
    config.check()?;

    let path = config.save().context("saving configuration")?;
    println!("Set {} to: {}", key, config.get(key).unwrap_or_default());
    println!("Saved to {}", path.display());
    Ok(())
}

/// Get a configuration value.
pub fn get(config: &MigrationConfig, key: &str) -> Result<()> {
    match config.get(key) {
        Some(value) => {
            println!("{}", value);
            Ok(())
        }
        None => anyhow::bail!("Unknown config key: {}", key),
    }
}

/// List accepted keys.
pub fn keys() {
    for key in CONFIG_KEYS {
        println!("{}", key);
    }
}

/// Reset configuration to defaults.
pub fn reset() -> Result<()> {
    let path = MigrationConfig::default().save()?;
    println!("Configuration reset to defaults ({})", path.display());
    Ok(())
}
