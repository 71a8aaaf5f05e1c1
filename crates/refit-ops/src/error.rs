//! Error types for the orchestration layer.

use std::path::PathBuf;

use refit_engine::MigrationError;
use thiserror::Error;

use crate::retry::{OperationKind, RetryState};

/// Result type for operations.
pub type OpsResult<T> = Result<T, OpsError>;

/// Errors that can occur during operations.
#[derive(Debug, Error)]
pub enum OpsError {
    /// Source root does not exist or is not a directory.
    #[error("No source directory found at {path}")]
    SourceNotFound { path: PathBuf },

    /// No run manifest under the output root.
    #[error("No migration manifest found under {path}. Run migrate first.")]
    ManifestNotFound { path: PathBuf },

    /// A stage failed.
    #[error(transparent)]
    Engine(#[from] MigrationError),

    /// An operation exceeded its time budget.
    #[error("{operation} timed out after {after_ms}ms")]
    Timeout {
        operation: OperationKind,
        after_ms: u64,
    },

    /// The run was cancelled before the operation finished.
    #[error("Operation cancelled")]
    Cancelled,

    /// The retry state machine was driven through an invalid edge.
    #[error("Invalid retry transition from {from} on {event}")]
    InvalidTransition {
        from: RetryState,
        event: &'static str,
    },

    /// A worker task panicked or was aborted.
    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Include or exclude pattern did not compile.
    #[error("Invalid glob pattern {pattern}: {message}")]
    Glob { pattern: String, message: String },

    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with context.
    #[error("{context}: {message}")]
    WithContext { context: String, message: String },
}

impl OpsError {
    /// Create a new error with additional context.
    pub fn with_context(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create a glob compilation error.
    pub fn glob(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Glob {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// Whether repeating the operation could produce a different outcome.
    pub fn is_transient(&self) -> bool {
        match self {
            OpsError::Engine(e) => !e.is_permanent(),
            OpsError::Timeout { .. } | OpsError::Io(_) => true,
            _ => false,
        }
    }
}

impl From<anyhow::Error> for OpsError {
    fn from(err: anyhow::Error) -> Self {
        OpsError::WithContext {
            context: "Operation failed".to_string(),
            message: err.to_string(),
        }
    }
}
