//! Migration stages for moving React components to SolidJS.
//!
//! Every stage works on a tree-sitter TSX tree, so generated output can be fed
//! back through the same analyzer the input went through.
//!
//! ## Stages
//!
//! ```text
//! source ─▶ Extractor ─▶ Analyzer ─▶ resolve() ─▶ Transformer ─▶ Generator ─▶ Validator ─▶ AtomicWriter
//!           ComponentModel  BusinessLogicModel  order   TransformedModel  artifacts   outcome     files
//! ```
//!
//! - **Extractor**: primary declaration, kind, declared inputs, dependencies
//! - **Analyzer**: six pattern categories plus a complexity score, parameterized
//!   by [`Dialect`]
//! - **Resolver**: provider-before-consumer ordering, cycles, dependency waves
//! - **Transformer**: strategy per tier and a node-by-node rewrite
//! - **Generator**: `<Name>.tsx`, `index.ts`, `README.md`
//! - **Validator**: conformance plus pattern counts re-analyzed in the target dialect
//! - **AtomicWriter**: stage, check, commit or roll back
//!
//! The orchestrator lives in `refit-ops` and drives these through [`Pipeline`].

pub mod analyze;
pub mod config;
pub mod dialect;
mod error;
pub mod extract;
mod generate;
mod pipeline;
mod render;
mod resolve;
pub mod syntax;
mod transform;
mod validate;
mod writer;

pub use analyze::Analyzer;
pub use config::{AnalyzerConfig, ComplexityWeights, TierThresholds, ValidationConfig};
pub use dialect::Dialect;
pub use error::{EngineResult, ErrorKind, MigrationError};
pub use extract::{Extractor, ParsedComponent};
pub use generate::Generator;
pub use pipeline::{
    AtomicStage, GenerateStage, ParseStage, Pipeline, SourceParser, TransformStage, ValidateStage,
    WriteStage,
};
pub use resolve::{build_graph, resolve, Resolution, TargetIndex};
pub use syntax::SyntaxTree;
pub use transform::{
    ImportPlan, ReviewMarker, Shell, TargetEffect, TargetHandler, TargetSignal, Transformation,
    TransformedModel, Transformer, MARKER_TAG, REDUCER_MODULE,
};
pub use validate::Validator;
pub use writer::{AcceptAll, AtomicWriter, BalancedDelimiters, ContentValidator, WriteReport};
