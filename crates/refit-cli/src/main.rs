//! Refit CLI - migrate React components to SolidJS.
//!
//! Components are discovered under a source root, ordered providers first,
//! and written under an output root together with a run manifest.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use refit_ops::MigrationConfig;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{config as config_cmd, migrate::MigrateArgs};

/// Refit - dependency-ordered React to SolidJS component migration.
///
/// Run `refit plan` first to see the order, then `refit migrate`.
#[derive(Parser, Debug)]
#[command(
    name = "refit",
    author,
    version,
    about = "Refit: migrate React components to SolidJS",
    long_about = None
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true, env = "REFIT_LOG_JSON")]
    log_json: bool,

    /// Print command results as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Migrate every discovered component.
    Migrate(MigrateArgs),

    /// Extract and analyze components without migrating them.
    Analyze {
        /// Source root (defaults to the configured one).
        source: Option<PathBuf>,

        /// Only analyze these files, relative to the source root.
        #[arg(short, long = "file")]
        files: Vec<PathBuf>,
    },

    /// Show the migration order, dependency waves and cycles.
    Plan {
        /// Source root (defaults to the configured one).
        source: Option<PathBuf>,
    },

    /// Show the last run recorded under an output root.
    Status {
        /// Output root (defaults to the configured one).
        output: Option<PathBuf>,
    },

    /// Manage configuration.
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show the effective configuration.
    Show,

    /// Set a configuration value.
    Set {
        /// Configuration key (see `refit config keys`).
        key: String,
        /// Configuration value.
        value: String,
    },

    /// Get a configuration value.
    Get {
        /// Configuration key.
        key: String,
    },

    /// List configuration keys.
    Keys,

    /// Reset configuration to defaults.
    Reset,

    /// Show path to config file.
    Path,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // A missing .env is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(&cli);

    let config = MigrationConfig::load()?;

    let code = match cli.command {
        Commands::Migrate(args) => commands::migrate::execute(config, args, cli.json).await?,

        Commands::Analyze { source, files } => {
            commands::analyze::execute(config, source, files, cli.json, cli.verbose).await?
        }

        Commands::Plan { source } => commands::plan::execute(config, source, cli.json).await?,

        Commands::Status { output } => commands::status::execute(config, output, cli.json).await?,

        Commands::Config(config_cmd_inner) => {
            let mut config = config;
            match config_cmd_inner {
                ConfigCommands::Show => config_cmd::show(&config, cli.json)?,
                ConfigCommands::Set { key, value } => config_cmd::set(&mut config, &key, &value)?,
                ConfigCommands::Get { key } => config_cmd::get(&config, &key)?,
                ConfigCommands::Keys => config_cmd::keys(),
                ConfigCommands::Reset => config_cmd::reset()?,
                ConfigCommands::Path => match MigrationConfig::config_file_path() {
                    Some(path) => println!("{}", path.display()),
                    None => println!("(no config file path available)"),
                },
            }
            ExitCode::SUCCESS
        }
    };

    Ok(code)
}

/// Setup tracing from the verbosity flags; `RUST_LOG` wins when set.
fn init_tracing(cli: &Cli) {
    let level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}
