//! Refit Operations Layer
//!
//! Typed entry points for running a migration batch. Consumed by the CLI, and
//! usable programmatically.
//!
//! ## Architecture
//!
//! - **Requests**: per-call overrides for each operation
//! - **Responses**: typed results, including the run [`Manifest`]
//! - **OpsContext**: the orchestrator; owns the run state and the manifest,
//!   drives the engine stages injected through a [`refit_engine::Pipeline`]
//!
//! ## Usage
//!
//! ```rust,no_run
//! use refit_ops::{MigrateRequest, MigrationConfig, OpsContext};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = MigrationConfig::load()?;
//!     let ctx = OpsContext::new(config);
//!
//!     let request = MigrateRequest::new("src/components", "solid").parallel(4);
//!     let response = ctx.migrate(request).await?;
//!
//!     println!(
//!         "{} migrated, {} failed",
//!         response.migrated_count(),
//!         response.failed_count()
//!     );
//!     Ok(())
//! }
//! ```

mod config;
mod context;
mod error;
mod redact;
mod requests;
mod responses;
mod retry;
mod scan;
mod state;
mod store;

// Re-export public API
pub use config::{MigrationConfig, ProcessingMode, CONFIG_KEYS, LOCAL_CONFIG_FILE};
pub use context::OpsContext;
pub use error::{OpsError, OpsResult};
pub use redact::{redact, REDACTED};
pub use requests::*;
pub use responses::*;
pub use retry::{run_with_retry, Attempted, OperationKind, RetryMachine, RetryPolicy, RetryState};
pub use scan::{discover, ScanFilter};
pub use state::{RunPhase, RunSnapshot, RunState};
pub use store::{FailedEntry, FailureKind, Manifest, Store, STORE_DIR};
