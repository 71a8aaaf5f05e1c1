//! Error types for the migration stages.

use refit_core::ComponentId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, MigrationError>;

/// Errors raised by the pipeline stages.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Source text is not well-formed.
    #[error("parse failure in {path} at {line}:{column}")]
    ParseFailure {
        path: PathBuf,
        line: usize,
        column: usize,
    },

    /// Source file does not exist.
    #[error("source file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// A class handler updates a state key that was never declared.
    #[error("{component}: setState writes undeclared state key `{key}`")]
    UndeclaredState { component: String, key: String },

    /// The batch ordering contains cycles.
    #[error("dependency cycle detected: {}", format_cycles(.cycles))]
    DependencyCycle { cycles: Vec<Vec<ComponentId>> },

    /// A class component has no render method.
    #[error("class component {component} has no render method")]
    MissingRender { component: String },

    /// The transformer cannot express a construct in the target dialect.
    #[error("{component}: unsupported construct `{construct}`")]
    UnsupportedConstruct { component: String, construct: String },

    /// The transformed model contradicts itself; nothing is emitted.
    #[error("inconsistent transformed model for {component}: {message}")]
    InconsistentModel { component: String, message: String },

    /// A staged or committed file operation failed.
    #[error("write failed for {path}: {message}")]
    WriteFailed { path: PathBuf, message: String },

    /// A staged file was rejected by the content validator.
    #[error("staged content rejected for {path}: {reason}")]
    ContentRejected { path: PathBuf, reason: String },

    /// Parser could not be configured for the grammar.
    #[error("parser setup failed: {0}")]
    Language(String),

    /// README template failed to render.
    #[error("template rendering failed: {0}")]
    Template(#[from] askama::Error),

    /// I/O error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_cycles(cycles: &[Vec<ComponentId>]) -> String {
    cycles
        .iter()
        .map(|c| {
            c.iter()
                .map(|id| id.as_str())
                .collect::<Vec<_>>()
                .join(" -> ")
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Error taxonomy reported in the run manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// Parse failure or missing file.
    ExtractionError,
    /// Analyzer invariant violated.
    AnalysisError,
    /// Cycle in the dependency graph.
    ResolutionError,
    /// Strategy application failed.
    TransformationError,
    /// Transformed model was inconsistent.
    GenerationError,
    /// Validator verdict was negative.
    ValidationFailure,
    /// Filesystem failure during the staged write.
    WriteError,
}

impl ErrorKind {
    /// Display label.
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::ExtractionError => "extraction-error",
            ErrorKind::AnalysisError => "analysis-error",
            ErrorKind::ResolutionError => "resolution-error",
            ErrorKind::TransformationError => "transformation-error",
            ErrorKind::GenerationError => "generation-error",
            ErrorKind::ValidationFailure => "validation-failure",
            ErrorKind::WriteError => "write-error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl MigrationError {
    /// Classify the error for the manifest.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MigrationError::ParseFailure { .. }
            | MigrationError::FileNotFound { .. }
            | MigrationError::Language(_) => ErrorKind::ExtractionError,
            MigrationError::UndeclaredState { .. } => ErrorKind::AnalysisError,
            MigrationError::DependencyCycle { .. } => ErrorKind::ResolutionError,
            MigrationError::MissingRender { .. } | MigrationError::UnsupportedConstruct { .. } => {
                ErrorKind::TransformationError
            }
            MigrationError::InconsistentModel { .. } | MigrationError::Template(_) => {
                ErrorKind::GenerationError
            }
            MigrationError::WriteFailed { .. }
            | MigrationError::ContentRejected { .. }
            | MigrationError::Io(_) => ErrorKind::WriteError,
        }
    }

    /// Whether the failure is deterministic, so repeating the operation cannot help.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            MigrationError::FileNotFound { .. }
                | MigrationError::UndeclaredState { .. }
                | MigrationError::DependencyCycle { .. }
                | MigrationError::MissingRender { .. }
                | MigrationError::UnsupportedConstruct { .. }
                | MigrationError::InconsistentModel { .. }
                | MigrationError::ContentRejected { .. }
        )
    }

    /// Create a write failure.
    pub fn write_failed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::WriteFailed {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an inconsistency error.
    pub fn inconsistent(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InconsistentModel {
            component: component.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_lists_members() {
        let err = MigrationError::DependencyCycle {
            cycles: vec![vec![ComponentId::new("A"), ComponentId::new("B")]],
        };
        assert_eq!(err.to_string(), "dependency cycle detected: A -> B");
        assert_eq!(err.kind(), ErrorKind::ResolutionError);
    }

    #[test]
    fn test_write_errors_are_transient() {
        let err = MigrationError::write_failed("out/A/A.tsx", "disk full");
        assert_eq!(err.kind(), ErrorKind::WriteError);
        assert!(!err.is_permanent());
        assert!(MigrationError::inconsistent("A", "dup").is_permanent());
    }
}
