//! Configuration for the orchestration layer.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use refit_engine::{AnalyzerConfig, ValidationConfig};
use serde::{Deserialize, Serialize};

use crate::error::{OpsError, OpsResult};
use crate::retry::{OperationKind, RetryPolicy};

/// File name looked up in the working directory before the user config dir.
pub const LOCAL_CONFIG_FILE: &str = "refit.json";

/// How components are scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessingMode {
    /// One component fully processed before the next begins.
    #[default]
    Serial,
    /// Up to `concurrency` components of the same dependency wave at once.
    Parallel,
}

impl ProcessingMode {
    pub fn label(&self) -> &'static str {
        match self {
            ProcessingMode::Serial => "serial",
            ProcessingMode::Parallel => "parallel",
        }
    }
}

impl std::str::FromStr for ProcessingMode {
    type Err = OpsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "serial" => Ok(ProcessingMode::Serial),
            "parallel" => Ok(ProcessingMode::Parallel),
            other => Err(OpsError::Config(format!("Invalid mode: {}", other))),
        }
    }
}

/// Configuration for a migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Directory scanned for components.
    #[serde(default = "default_source_root")]
    pub source_root: PathBuf,

    /// Directory receiving one subdirectory per component.
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,

    /// Globs (relative to the source root) a file must match.
    #[serde(default = "default_include")]
    pub include: Vec<String>,

    /// Globs that remove a file from the batch.
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,

    #[serde(default)]
    pub mode: ProcessingMode,

    /// Bound on concurrent components in parallel mode.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-operation time budget in milliseconds (0 disables it).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Record a failure and keep going instead of halting the batch.
    #[serde(default = "default_true")]
    pub continue_on_error: bool,

    /// Drop cyclic components with a warning instead of failing resolution.
    #[serde(default)]
    pub skip_cyclic: bool,

    #[serde(default)]
    pub retry: RetryPolicy,

    #[serde(default)]
    pub analyzer: AnalyzerConfig,

    #[serde(default)]
    pub validation: ValidationConfig,
}

fn default_source_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_output_root() -> PathBuf {
    PathBuf::from("refit-out")
}

fn default_include() -> Vec<String> {
    vec!["**/*.tsx".to_string(), "**/*.jsx".to_string()]
}

fn default_exclude() -> Vec<String> {
    vec![
        "**/*.test.*".to_string(),
        "**/*.spec.*".to_string(),
        "**/*.stories.*".to_string(),
        "**/*.d.ts".to_string(),
    ]
}

fn default_concurrency() -> usize {
    4
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_true() -> bool {
    true
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            source_root: default_source_root(),
            output_root: default_output_root(),
            include: default_include(),
            exclude: default_exclude(),
            mode: ProcessingMode::default(),
            concurrency: default_concurrency(),
            timeout_ms: default_timeout_ms(),
            continue_on_error: true,
            skip_cyclic: false,
            retry: RetryPolicy::default(),
            analyzer: AnalyzerConfig::default(),
            validation: ValidationConfig::default(),
        }
    }
}

/// Keys accepted by [`MigrationConfig::get`] and [`MigrationConfig::set`].
pub const CONFIG_KEYS: &[&str] = &[
    "source_root",
    "output_root",
    "include",
    "exclude",
    "mode",
    "concurrency",
    "timeout_ms",
    "continue_on_error",
    "skip_cyclic",
    "retry.max_attempts",
    "retry.base_delay_ms",
    "retry.multiplier",
    "retry.max_delay_ms",
    "retry.retryable",
    "analyzer.heuristic_fallbacks",
    "analyzer.thresholds.moderate",
    "analyzer.thresholds.complex",
    "analyzer.thresholds.critical",
    "validation.min_score",
    "validation.strict",
];

impl MigrationConfig {
    /// Load configuration from disk with environment overrides.
    ///
    /// `./refit.json` wins over the user config file; `REFIT_*` variables win
    /// over both.
    pub fn load() -> OpsResult<Self> {
        let config = match Self::config_file_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        config.with_env_overrides()
    }

    /// Load a specific file without environment overrides.
    pub fn load_from(path: &Path) -> OpsResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.check()?;
        Ok(config)
    }

    /// Save configuration to the file [`load`](Self::load) reads.
    pub fn save(&self) -> OpsResult<PathBuf> {
        let path = Self::config_file_path()
            .ok_or_else(|| OpsError::Config("No configuration directory available".into()))?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save configuration to `path`.
    pub fn save_to(&self, path: &Path) -> OpsResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// The local `refit.json` when present, else the user config file.
    pub fn config_file_path() -> Option<PathBuf> {
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }
        Self::user_config_path()
    }

    /// Path of the per-user configuration file.
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("dev", "refit", "refit").map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Apply `REFIT_*` environment variables.
    pub fn with_env_overrides(mut self) -> OpsResult<Self> {
        const ENV_KEYS: &[(&str, &str)] = &[
            ("REFIT_SOURCE_ROOT", "source_root"),
            ("REFIT_OUTPUT_ROOT", "output_root"),
            ("REFIT_MODE", "mode"),
            ("REFIT_CONCURRENCY", "concurrency"),
            ("REFIT_TIMEOUT_MS", "timeout_ms"),
            ("REFIT_CONTINUE_ON_ERROR", "continue_on_error"),
            ("REFIT_SKIP_CYCLIC", "skip_cyclic"),
            ("REFIT_MAX_ATTEMPTS", "retry.max_attempts"),
            ("REFIT_STRICT", "validation.strict"),
            ("REFIT_MIN_SCORE", "validation.min_score"),
        ];
        for (var, key) in ENV_KEYS {
            if let Ok(value) = std::env::var(var) {
                self.set(key, &value)
                    .map_err(|e| OpsError::with_context(*var, e.to_string()))?;
            }
        }
        Ok(self)
    }

    /// Per-operation timeout, if enabled.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    /// Effective bound on concurrent components.
    pub fn worker_limit(&self) -> usize {
        match self.mode {
            ProcessingMode::Serial => 1,
            ProcessingMode::Parallel => self.concurrency.max(1),
        }
    }

    /// Reject settings no run could honour.
    pub fn check(&self) -> OpsResult<()> {
        if self.include.is_empty() {
            return Err(OpsError::Config("include must list at least one glob".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(OpsError::Config("retry.max_attempts must be at least 1".into()));
        }
        if !self.analyzer.thresholds.is_ordered() {
            return Err(OpsError::Config(
                "analyzer thresholds must satisfy moderate < complex < critical".into(),
            ));
        }
        if self.validation.min_score > 100 {
            return Err(OpsError::Config("validation.min_score must be at most 100".into()));
        }
        Ok(())
    }

    /// Get a configuration value by key.
    pub fn get(&self, key: &str) -> Option<String> {
        let value = match key {
            "source_root" => self.source_root.display().to_string(),
            "output_root" => self.output_root.display().to_string(),
            "include" => self.include.join(","),
            "exclude" => self.exclude.join(","),
            "mode" => self.mode.label().to_string(),
            "concurrency" => self.concurrency.to_string(),
            "timeout_ms" => self.timeout_ms.to_string(),
            "continue_on_error" => self.continue_on_error.to_string(),
            "skip_cyclic" => self.skip_cyclic.to_string(),
            "retry.max_attempts" => self.retry.max_attempts.to_string(),
            "retry.base_delay_ms" => self.retry.base_delay_ms.to_string(),
            "retry.multiplier" => self.retry.multiplier.to_string(),
            "retry.max_delay_ms" => self.retry.max_delay_ms.to_string(),
            "retry.retryable" => self
                .retry
                .retryable
                .iter()
                .map(|k| k.label())
                .collect::<Vec<_>>()
                .join(","),
            "analyzer.heuristic_fallbacks" => self.analyzer.heuristic_fallbacks.to_string(),
            "analyzer.thresholds.moderate" => self.analyzer.thresholds.moderate.to_string(),
            "analyzer.thresholds.complex" => self.analyzer.thresholds.complex.to_string(),
            "analyzer.thresholds.critical" => self.analyzer.thresholds.critical.to_string(),
            "validation.min_score" => self.validation.min_score.to_string(),
            "validation.strict" => self.validation.strict.to_string(),
            _ => return None,
        };
        Some(value)
    }

    /// Set a configuration value by key.
    pub fn set(&mut self, key: &str, value: &str) -> OpsResult<()> {
        match key {
            "source_root" => self.source_root = PathBuf::from(value),
            "output_root" => self.output_root = PathBuf::from(value),
            "include" => self.include = split_list(value),
            "exclude" => self.exclude = split_list(value),
            "mode" => self.mode = value.parse()?,
            "concurrency" => self.concurrency = parse_value(key, value)?,
            "timeout_ms" => self.timeout_ms = parse_value(key, value)?,
            "continue_on_error" => self.continue_on_error = parse_value(key, value)?,
            "skip_cyclic" => self.skip_cyclic = parse_value(key, value)?,
            "retry.max_attempts" => self.retry.max_attempts = parse_value(key, value)?,
            "retry.base_delay_ms" => self.retry.base_delay_ms = parse_value(key, value)?,
            "retry.multiplier" => self.retry.multiplier = parse_value(key, value)?,
            "retry.max_delay_ms" => self.retry.max_delay_ms = parse_value(key, value)?,
            "retry.retryable" => {
                self.retry.retryable = split_list(value)
                    .iter()
                    .map(|label| {
                        OperationKind::from_label(label).ok_or_else(|| {
                            OpsError::Config(format!("Unknown operation kind: {}", label))
                        })
                    })
                    .collect::<OpsResult<_>>()?;
            }
            "analyzer.heuristic_fallbacks" => {
                self.analyzer.heuristic_fallbacks = parse_value(key, value)?
            }
            "analyzer.thresholds.moderate" => {
                self.analyzer.thresholds.moderate = parse_value(key, value)?
            }
            "analyzer.thresholds.complex" => {
                self.analyzer.thresholds.complex = parse_value(key, value)?
            }
            "analyzer.thresholds.critical" => {
                self.analyzer.thresholds.critical = parse_value(key, value)?
            }
            "validation.min_score" => self.validation.min_score = parse_value(key, value)?,
            "validation.strict" => self.validation.strict = parse_value(key, value)?,
            _ => {
                return Err(OpsError::Config(format!("Unknown config key: {}", key)));
            }
        }
        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> OpsResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| OpsError::Config(format!("Invalid value for {}: {}", key, value)))
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = MigrationConfig::default();
        assert_eq!(config.mode, ProcessingMode::Serial);
        assert_eq!(config.worker_limit(), 1);
        assert!(config.continue_on_error);
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
        assert!(config.check().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("refit.json");
        std::fs::write(
            &path,
            r#"{"mode": "parallel", "concurrency": 8, "retry": {"max_attempts": 5}}"#,
        )
        .unwrap();

        let config = MigrationConfig::load_from(&path).unwrap();
        assert_eq!(config.mode, ProcessingMode::Parallel);
        assert_eq!(config.worker_limit(), 8);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay_ms, 100);
        assert_eq!(config.include, default_include());
    }

    #[test]
    fn test_get_set_round_trip() {
        let mut config = MigrationConfig::default();
        for (key, value) in [
            ("mode", "parallel"),
            ("concurrency", "2"),
            ("skip_cyclic", "true"),
            ("retry.retryable", "file-read,parse"),
            ("validation.min_score", "85"),
            ("include", "src/**/*.tsx, lib/**/*.jsx"),
        ] {
            config.set(key, value).unwrap();
        }
        assert_eq!(config.get("mode").as_deref(), Some("parallel"));
        assert_eq!(config.get("retry.retryable").as_deref(), Some("file-read,parse"));
        assert_eq!(config.include, vec!["src/**/*.tsx", "lib/**/*.jsx"]);
        assert!(config.skip_cyclic);
        assert!(!config.retry.allows(OperationKind::FileWrite));

        for key in CONFIG_KEYS {
            assert!(config.get(key).is_some(), "{key} has no getter");
        }
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut config = MigrationConfig::default();
        assert!(config.set("concurrency", "many").is_err());
        assert!(config.set("mode", "sideways").is_err());
        assert!(config.set("retry.retryable", "validate,teleport").is_err());
        assert!(config.set("no_such_key", "1").is_err());
    }

    #[test]
    fn test_check_rejects_unordered_thresholds() {
        let mut config = MigrationConfig::default();
        config.analyzer.thresholds.complex = 2;
        assert!(config.check().is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/config.json");
        let mut config = MigrationConfig::default();
        config.output_root = PathBuf::from("solid");
        config.save_to(&path).unwrap();

        let loaded = MigrationConfig::load_from(&path).unwrap();
        assert_eq!(loaded.output_root, PathBuf::from("solid"));
    }
}
