//! Stage abstractions injected into the orchestrator.
//!
//! Each stage is a trait with a default implementation backed by the concrete
//! engine type. A [`Pipeline`] bundles one of each; tests swap single stages
//! for fakes through the `with_*` builders.

use std::path::Path;
use std::sync::Arc;

use refit_core::{ComponentModel, GeneratedArtifact, ValidationOutcome};

use crate::analyze::Analyzer;
use crate::config::{AnalyzerConfig, ValidationConfig};
use crate::error::EngineResult;
use crate::extract::{Extractor, ParsedComponent};
use crate::generate::Generator;
use crate::resolve::TargetIndex;
use crate::transform::{Transformation, Transformer, TransformedModel};
use crate::validate::Validator;
use crate::writer::{AtomicWriter, ContentValidator, WriteReport};

// =============================================================================
// Stage traits
// =============================================================================

/// Parses a source file into an analyzed model.
pub trait ParseStage: Send + Sync {
    fn parse(&self, source: &str, path: &Path) -> EngineResult<ParsedComponent>;
}

/// Rewrites an analyzed component.
pub trait TransformStage: Send + Sync {
    fn transform(
        &self,
        parsed: &ParsedComponent,
        targets: &TargetIndex,
    ) -> EngineResult<Transformation>;
}

/// Emits the artifact set.
pub trait GenerateStage: Send + Sync {
    fn generate(&self, model: &TransformedModel) -> EngineResult<Vec<GeneratedArtifact>>;
}

/// Judges the artifact set.
pub trait ValidateStage: Send + Sync {
    fn validate(&self, original: &ComponentModel, artifacts: &[GeneratedArtifact])
        -> ValidationOutcome;
}

/// Persists the artifact set under an output root.
pub trait WriteStage: Send + Sync {
    fn write(&self, root: &Path, artifacts: &[GeneratedArtifact]) -> EngineResult<WriteReport>;
}

// =============================================================================
// Default stages
// =============================================================================

/// Extraction followed by analysis.
#[derive(Debug, Clone, Default)]
pub struct SourceParser {
    extractor: Extractor,
    analyzer: Analyzer,
}

impl SourceParser {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            extractor: Extractor::default(),
            analyzer: Analyzer::new(config, crate::dialect::Dialect::React),
        }
    }
}

impl ParseStage for SourceParser {
    fn parse(&self, source: &str, path: &Path) -> EngineResult<ParsedComponent> {
        let parsed = self.extractor.extract_parsed(source, path)?;
        self.analyzer.enrich(parsed)
    }
}

impl TransformStage for Transformer {
    fn transform(
        &self,
        parsed: &ParsedComponent,
        targets: &TargetIndex,
    ) -> EngineResult<Transformation> {
        let logic = parsed.model.logic.clone().unwrap_or_default();
        self.clone()
            .with_targets(targets.clone())
            .transform(&parsed.model, &logic, &parsed.tree)
    }
}

impl GenerateStage for Generator {
    fn generate(&self, model: &TransformedModel) -> EngineResult<Vec<GeneratedArtifact>> {
        Generator::generate(self, model)
    }
}

impl ValidateStage for Validator {
    fn validate(
        &self,
        original: &ComponentModel,
        artifacts: &[GeneratedArtifact],
    ) -> ValidationOutcome {
        Validator::validate(self, original, artifacts)
    }
}

/// Writes through an [`AtomicWriter`] built per call.
#[derive(Clone, Default)]
pub struct AtomicStage {
    content: Option<Arc<dyn ContentValidator>>,
}

impl AtomicStage {
    /// Use `validator` for staged content instead of the default check.
    pub fn with_content_validator(validator: Arc<dyn ContentValidator>) -> Self {
        Self {
            content: Some(validator),
        }
    }
}

struct Shared(Arc<dyn ContentValidator>);

impl ContentValidator for Shared {
    fn check(&self, path: &Path, content: &str) -> Result<(), String> {
        self.0.check(path, content)
    }
}

impl WriteStage for AtomicStage {
    fn write(&self, root: &Path, artifacts: &[GeneratedArtifact]) -> EngineResult<WriteReport> {
        let mut writer = AtomicWriter::new(root);
        if let Some(content) = &self.content {
            writer = writer.with_validator(Shared(Arc::clone(content)));
        }
        writer.write_all(artifacts)
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// One implementation per stage.
#[derive(Clone)]
pub struct Pipeline {
    pub parser: Arc<dyn ParseStage>,
    pub transformer: Arc<dyn TransformStage>,
    pub generator: Arc<dyn GenerateStage>,
    pub validator: Arc<dyn ValidateStage>,
    pub writer: Arc<dyn WriteStage>,
}

impl Pipeline {
    /// The engine's own stages configured from the analyzer and validation settings.
    pub fn standard(analyzer: AnalyzerConfig, validation: ValidationConfig) -> Self {
        let thresholds = analyzer.thresholds;
        Self {
            parser: Arc::new(SourceParser::new(analyzer.clone())),
            transformer: Arc::new(Transformer::new(thresholds)),
            generator: Arc::new(Generator::new()),
            validator: Arc::new(Validator::new(validation).with_analyzer(analyzer)),
            writer: Arc::new(AtomicStage::default()),
        }
    }

    pub fn with_parser(mut self, stage: Arc<dyn ParseStage>) -> Self {
        self.parser = stage;
        self
    }

    pub fn with_transformer(mut self, stage: Arc<dyn TransformStage>) -> Self {
        self.transformer = stage;
        self
    }

    pub fn with_generator(mut self, stage: Arc<dyn GenerateStage>) -> Self {
        self.generator = stage;
        self
    }

    pub fn with_validator(mut self, stage: Arc<dyn ValidateStage>) -> Self {
        self.validator = stage;
        self
    }

    pub fn with_writer(mut self, stage: Arc<dyn WriteStage>) -> Self {
        self.writer = stage;
        self
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::standard(AnalyzerConfig::default(), ValidationConfig::default())
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BADGE: &str = r#"
import React from 'react';

type BadgeProps = { text: string; tone?: 'info' | 'warn' };

const Badge: React.FC<BadgeProps> = ({ text, tone = 'info' }) => (
  <span className={`badge badge-${tone}`}>{text}</span>
);

export default Badge;
"#;

    #[test]
    fn test_standard_pipeline_end_to_end() {
        let dir = TempDir::new().unwrap();
        let pipeline = Pipeline::default();

        let parsed = pipeline.parser.parse(BADGE, Path::new("ui/Badge.tsx")).unwrap();
        assert_eq!(parsed.model.name, "Badge");

        let t = pipeline
            .transformer
            .transform(&parsed, &TargetIndex::default())
            .unwrap();
        let artifacts = pipeline.generator.generate(&t.model).unwrap();
        let outcome = pipeline.validator.validate(&parsed.model, &artifacts);
        assert!(outcome.valid, "{outcome:#?}");

        let report = pipeline.writer.write(dir.path(), &artifacts).unwrap();
        assert_eq!(report.written.len(), 3);
        let primary = std::fs::read_to_string(dir.path().join("Badge/Badge.tsx")).unwrap();
        assert!(primary.contains("class={`badge badge-${props.tone}`}"));
        assert!(primary.contains("const props = mergeProps({ tone: 'info' }, rawProps);"));
        assert!(!primary.contains("React"));
    }

    #[test]
    fn test_content_validator_is_injectable() {
        struct Reject;
        impl ContentValidator for Reject {
            fn check(&self, _path: &Path, _content: &str) -> Result<(), String> {
                Err("nope".to_string())
            }
        }
        let dir = TempDir::new().unwrap();
        let pipeline = Pipeline::default().with_writer(Arc::new(
            AtomicStage::with_content_validator(Arc::new(Reject)),
        ));
        let artifacts = vec![GeneratedArtifact::new(
            "A/A.tsx",
            "const a = 1;\n".to_string(),
            refit_core::ArtifactKind::PrimarySource,
        )];
        assert!(pipeline.writer.write(dir.path(), &artifacts).is_err());
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }
}
