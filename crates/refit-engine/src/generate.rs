//! Emits the primary source, barrel and README for a transformed component.

use crate::error::{EngineResult, MigrationError};
use crate::render::indent;
use crate::transform::{Shell, TransformedModel};
use askama::Template;
use refit_core::{ArtifactKind, GeneratedArtifact};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::debug;

/// Produces the artifact set of one component.
#[derive(Debug, Clone, Default)]
pub struct Generator;

impl Generator {
    /// A generator with no state; artifacts depend only on the model.
    pub fn new() -> Self {
        Self
    }

    /// Generate `<Name>/<Name>.tsx` (`.ts` for modules without markup),
    /// `<Name>/index.ts` and `<Name>/README.md`.
    ///
    /// Fails without emitting anything when the model contradicts itself.
    pub fn generate(&self, model: &TransformedModel) -> EngineResult<Vec<GeneratedArtifact>> {
        check_consistency(model)?;

        let dir = PathBuf::from(&model.name);
        let primary = primary_source(model);
        let barrel = barrel_source(model);
        let readme = readme_source(model)?;

        let artifacts = vec![
            GeneratedArtifact::new(
                dir.join(model.primary_file_name()),
                primary,
                ArtifactKind::PrimarySource,
            ),
            GeneratedArtifact::new(dir.join("index.ts"), barrel, ArtifactKind::Barrel),
            GeneratedArtifact::new(dir.join("README.md"), readme, ArtifactKind::Documentation),
        ];
        debug!(
            component = %model.id,
            artifacts = artifacts.len(),
            bytes = artifacts.iter().map(|a| a.size).sum::<u64>(),
            "Generated artifacts"
        );
        Ok(artifacts)
    }
}

// =============================================================================
// Consistency
// =============================================================================

fn check_consistency(model: &TransformedModel) -> EngineResult<()> {
    if model.name.is_empty() {
        return Err(MigrationError::inconsistent(
            model.id.as_str(),
            "component has no name",
        ));
    }

    let mut names = HashSet::new();
    let mut setters = HashSet::new();
    for signal in &model.signals {
        if !names.insert(signal.name.as_str()) {
            return Err(MigrationError::inconsistent(
                &model.name,
                format!("signal `{}` is declared twice", signal.name),
            ));
        }
        if !setters.insert(signal.setter.as_str()) {
            return Err(MigrationError::inconsistent(
                &model.name,
                format!("setter `{}` is declared twice", signal.setter),
            ));
        }
    }

    for handler in &model.handlers {
        if let Some(missing) = handler
            .mutators
            .iter()
            .find(|m| !setters.contains(m.as_str()))
        {
            return Err(MigrationError::inconsistent(
                &model.name,
                format!(
                    "handler `{}` calls `{missing}`, which no signal declares",
                    handler.name
                ),
            ));
        }
    }
    Ok(())
}

// =============================================================================
// Primary source
// =============================================================================

fn primary_source(model: &TransformedModel) -> String {
    let mut sections: Vec<String> = Vec::new();

    let mut header = vec![format!(
        "// Migrated from {} by refit ({}).",
        model.source_path.display(),
        model.strategy
    )];
    if model.manual_review {
        header.push("// REVIEW REQUIRED: this component was migrated on a best-effort basis.".to_string());
        header.push(format!(
            "// {} construct(s) are flagged; see README.md before using it.",
            model.markers.len()
        ));
    }
    sections.push(header.join("\n"));

    let imports = model.imports.statements();
    if !imports.is_empty() {
        sections.push(imports.join("\n"));
    }

    if model.is_component() {
        sections.push(props_interface(model));
    }
    sections.extend(model.declarations.iter().cloned());

    if let Shell::Component { param, body } = &model.shell {
        let body = body.join("\n");
        sections.push(format!(
            "const {name}: Component<{props}> = ({param}) => {{\n{body}\n}};",
            name = model.name,
            props = model.props_type_name(),
            body = indent(&body, 1),
        ));
        let mut exports = format!("export default {};", model.name);
        if model.named_exports.iter().any(|n| *n == model.name) {
            exports.push_str(&format!("\nexport {{ {} }};", model.name));
        }
        sections.push(exports);
    }

    let mut out = sections.join("\n\n");
    out.push('\n');
    out
}

fn props_interface(model: &TransformedModel) -> String {
    let name = model.props_type_name();
    if model.props.is_empty() {
        return format!("export interface {name} {{}}");
    }
    let fields: Vec<String> = model
        .props
        .iter()
        .map(|p| {
            let optional = if p.required { "" } else { "?" };
            format!("  {}{optional}: {};", p.name, p.type_tag)
        })
        .collect();
    format!("export interface {name} {{\n{}\n}}", fields.join("\n"))
}

// =============================================================================
// Barrel
// =============================================================================

fn barrel_source(model: &TransformedModel) -> String {
    let module = format!("./{}", model.name);
    let mut lines = Vec::new();
    if model.default_export {
        lines.push(format!("export {{ default }} from \"{module}\";"));
    }
    let named: Vec<&str> = model.named_exports.iter().map(String::as_str).collect();
    if !named.is_empty() {
        lines.push(format!("export {{ {} }} from \"{module}\";", named.join(", ")));
    }
    let mut types: Vec<String> = Vec::new();
    if model.is_component() {
        types.push(model.props_type_name());
    }
    for t in &model.type_exports {
        if !types.contains(t) {
            types.push(t.clone());
        }
    }
    if !types.is_empty() {
        lines.push(format!(
            "export type {{ {} }} from \"{module}\";",
            types.join(", ")
        ));
    }
    if lines.is_empty() {
        // nothing exported: keep the module loaded for its side effects
        lines.push(format!("export * from \"{module}\";"));
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

// =============================================================================
// README
// =============================================================================

struct PropRow {
    name: String,
    type_tag: String,
    required: bool,
    default: String,
}

struct MarkerRow {
    line: usize,
    message: String,
}

/// Askama template for the component README.
#[derive(Template)]
#[template(path = "readme.md", escape = "none")]
struct ReadmeTemplate<'a> {
    name: &'a str,
    source: String,
    strategy: String,
    manual_review: bool,
    is_component: bool,
    props: Vec<PropRow>,
    usage: String,
    signals: usize,
    effects: usize,
    handlers: usize,
    markers: Vec<MarkerRow>,
    notes: &'a [String],
}

fn readme_source(model: &TransformedModel) -> EngineResult<String> {
    let props = model
        .props
        .iter()
        .map(|p| PropRow {
            name: p.name.clone(),
            type_tag: table_cell(&p.type_tag),
            required: p.required,
            default: model
                .prop_defaults
                .iter()
                .find(|(k, _)| *k == p.name)
                .map(|(_, v)| format!("`{}`", table_cell(v)))
                .unwrap_or_default(),
        })
        .collect();
    let markers = model
        .markers
        .iter()
        .map(|m| MarkerRow {
            line: m.line,
            message: m.message.clone(),
        })
        .collect();

    let template = ReadmeTemplate {
        name: &model.name,
        source: model.source_path.display().to_string(),
        strategy: model.strategy.to_string(),
        manual_review: model.manual_review,
        is_component: model.is_component(),
        props,
        usage: usage_snippet(model),
        signals: model.signals.len(),
        effects: model.effects.len(),
        handlers: model.handlers.len(),
        markers,
        notes: &model.notes,
    };
    Ok(template.render()?)
}

fn usage_snippet(model: &TransformedModel) -> String {
    if !model.is_component() {
        let names: Vec<&str> = model.named_exports.iter().map(String::as_str).collect();
        if names.is_empty() {
            return format!("import \"./{}\";", model.name);
        }
        return format!(
            "import {{ {} }} from \"./{}\";",
            names.join(", "),
            model.name
        );
    }
    let attributes: String = model
        .props
        .iter()
        .filter(|p| p.required)
        .map(|p| format!(" {}={{...}}", p.name))
        .collect();
    format!(
        "import {name} from \"./{name}\";\n\n<{name}{attributes} />",
        name = model.name
    )
}

fn table_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
