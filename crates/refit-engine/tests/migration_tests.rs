//! End-to-end tests over small component batches: extraction through the
//! atomic write, without the orchestrator.

use std::fs;
use std::path::Path;

use refit_core::{
    ArtifactKind, ComplexityTier, ComponentModel, PatternCategory, Strategy, TransformationKind,
};
use refit_engine::{
    resolve, AtomicWriter, Generator, MigrationError, Pipeline, TargetIndex, Transformer,
    Validator,
};
use tempfile::TempDir;

// ============================================================================
// Fixtures
// ============================================================================

const BUTTON: &str = r#"
import React from 'react';

export interface ButtonProps {
  label: string;
  disabled?: boolean;
}

export default function Button({ label, disabled = false }: ButtonProps) {
  return <button className="btn" disabled={disabled}>{label}</button>;
}
"#;

const SIGNUP_FORM: &str = r#"
import { useState } from 'react';
import Button from '../ui/Button';

interface SignupFormProps {
  endpoint: string;
  onDone?: (id: string) => void;
}

export default function SignupForm({ endpoint, onDone }: SignupFormProps) {
  const [email, setEmail] = useState('');
  const [error, setError] = useState<string | null>(null);

  const handleSubmit = async (e: React.FormEvent) => {
    e.preventDefault();
    if (!email) {
      setError('Email is required');
      return;
    }
    try {
      const res = await fetch(endpoint, { method: 'POST', body: JSON.stringify({ email }) });
      const body = await res.json();
      onDone?.(body.id);
    } catch (err) {
      setError('Signup failed');
    }
  };

  return (
    <form onSubmit={handleSubmit}>
      <input value={email} onInput={(e) => setEmail(e.currentTarget.value)} />
      {error && <p className="error">{error}</p>}
      <Button label="Sign up" />
    </form>
  );
}
"#;

const TOGGLE: &str = r#"
import React from 'react';

type ToggleState = { on: boolean };

export default class Toggle extends React.Component<{ title: string }, ToggleState> {
  state: ToggleState = { on: false };

  handleClick = () => {
    this.setState({ on: !this.state.on });
  };

  render() {
    return (
      <button onClick={this.handleClick}>
        {this.props.title}: {this.state.on ? 'on' : 'off'}
      </button>
    );
  }
}
"#;

/// One state binding and one external call, no effects or handlers.
const QUOTE: &str = r#"
import { useState } from 'react';
import Poller from '@acme/poller';

export default function Quote() {
  const [price, setPrice] = useState<number | null>(null);

  const refresh = async () => {
    const res = await fetch('/api/quote');
    setPrice((await res.json()).price);
  };

  return (
    <section>
      <Poller load={refresh} />
      <p>{price ?? 'loading'}</p>
    </section>
  );
}
"#;

const CART: &str = r#"
import { useState } from 'react';

export default function Cart() {
  const [count, setCount] = useState(1);
  const total = count * 2;
  return <button onClick={() => setCount(count + 1)}>{total} items</button>;
}
"#;

fn parse_all(pipeline: &Pipeline, files: &[(&str, &str)]) -> Vec<refit_engine::ParsedComponent> {
    files
        .iter()
        .map(|(path, src)| pipeline.parser.parse(src, Path::new(path)).unwrap())
        .collect()
}

fn models(parsed: &[refit_engine::ParsedComponent]) -> Vec<ComponentModel> {
    parsed.iter().map(|p| p.model.clone()).collect()
}

// ============================================================================
// Batch migration
// ============================================================================

#[test]
fn test_batch_migrates_in_dependency_order() {
    let pipeline = Pipeline::default();
    let parsed = parse_all(
        &pipeline,
        &[
            ("forms/SignupForm.tsx", SIGNUP_FORM),
            ("ui/Button.tsx", BUTTON),
        ],
    );
    let models = models(&parsed);

    let resolution = resolve(&models);
    assert!(!resolution.is_partial());
    let order: Vec<&str> = resolution.order.iter().map(|id| id.as_str()).collect();
    assert_eq!(order, vec!["ui/Button", "forms/SignupForm"]);
    assert_eq!(resolution.levels().len(), 2);

    let targets = TargetIndex::from_models(&models);
    let out = TempDir::new().unwrap();
    for id in &resolution.order {
        let component = parsed.iter().find(|p| &p.model.id == id).unwrap();
        let t = pipeline.transformer.transform(component, &targets).unwrap();
        let artifacts = pipeline.generator.generate(&t.model).unwrap();
        let outcome = pipeline.validator.validate(&component.model, &artifacts);
        assert!(outcome.valid, "{}: {outcome:#?}", id);
        pipeline.writer.write(out.path(), &artifacts).unwrap();
    }

    for file in [
        "Button/Button.tsx",
        "Button/index.ts",
        "Button/README.md",
        "SignupForm/SignupForm.tsx",
        "SignupForm/index.ts",
        "SignupForm/README.md",
    ] {
        assert!(out.path().join(file).is_file(), "{file} missing");
    }

    let form = fs::read_to_string(out.path().join("SignupForm/SignupForm.tsx")).unwrap();
    assert!(form.contains("import Button from \"../Button\";"));
    assert!(form.contains("const [email, setEmail] = createSignal('');"));
    assert!(form.contains("const [error, setError] = createSignal<string | null>(null);"));
    assert!(form.contains("if (!email()) {"));
    assert!(form.contains("await fetch(props.endpoint"));
    assert!(form.contains("props.onDone?.(body.id);"));
    assert!(form.contains("{error() && <p class=\"error\">{error()}</p>}"));
    assert!(form.contains("(e: SubmitEvent)"));
    assert!(!form.contains("useState"));
    assert!(!form.contains("from 'react'"));
}

#[test]
fn test_records_cover_every_pattern() {
    let pipeline = Pipeline::default();
    let parsed = parse_all(&pipeline, &[("forms/SignupForm.tsx", SIGNUP_FORM)]);
    let logic = parsed[0].model.logic.clone().unwrap();
    let t = Transformer::default()
        .transform(&parsed[0].model, &logic, &parsed[0].tree)
        .unwrap();

    let counts = logic.counts();
    let expected = 1 // component shell
        + 1 // react import group
        + parsed[0].model.inputs.len()
        + counts.get(PatternCategory::StateBinding)
        + counts.get(PatternCategory::SideEffect)
        + counts.get(PatternCategory::EventHandler)
        + counts.get(PatternCategory::ValidationRule)
        + counts.get(PatternCategory::ExternalCall);
    assert_eq!(t.records.len(), expected);
    assert_ne!(t.strategy, Strategy::ManualReviewRequired);
}

#[test]
fn test_class_component_round_trip() {
    let pipeline = Pipeline::default();
    let parsed = parse_all(&pipeline, &[("Toggle.tsx", TOGGLE)]);
    let t = pipeline
        .transformer
        .transform(&parsed[0], &TargetIndex::default())
        .unwrap();
    let artifacts = Generator::new().generate(&t.model).unwrap();
    let primary = &artifacts[0].content;
    assert!(primary.contains("const [on, setOn] = createSignal<boolean>(false);"));
    assert!(primary.contains("setOn(!on());"));
    assert!(primary.contains("{props.title}: {on() ? 'on' : 'off'}"));
    assert!(!primary.contains("this."));

    let outcome = Validator::default().validate(&parsed[0].model, &artifacts);
    assert!(outcome.valid, "{outcome:#?}\n{primary}");
    assert!(outcome.comparisons.iter().all(|c| c.matches()));
}

#[test]
fn test_moderate_component_is_pattern_mapped_and_written() {
    let pipeline = Pipeline::default();
    let parsed = parse_all(&pipeline, &[("Quote.tsx", QUOTE)]);
    let model = &parsed[0].model;
    let logic = model.logic.as_ref().unwrap();
    let counts = logic.counts();
    assert_eq!(counts.state_bindings, 1);
    assert_eq!(counts.external_calls, 1);
    assert_eq!(counts.side_effects, 0);
    assert_eq!(counts.event_handlers, 0);
    assert_eq!(logic.complexity_score, 6);
    assert_eq!(model.complexity, Some(ComplexityTier::Moderate));

    let t = pipeline
        .transformer
        .transform(&parsed[0], &TargetIndex::default())
        .unwrap();
    assert_eq!(t.strategy, Strategy::PatternMapping);
    assert!(!t.manual_review);
    let of = |kind: TransformationKind| t.records.iter().filter(|r| r.kind == kind).count();
    assert_eq!(of(TransformationKind::State), 1);
    assert_eq!(of(TransformationKind::Api), 1);
    assert_eq!(
        of(TransformationKind::Structural),
        t.records.len() - 2,
        "{:#?}",
        t.records
    );

    let artifacts = pipeline.generator.generate(&t.model).unwrap();
    let kinds: Vec<ArtifactKind> = artifacts.iter().map(|a| a.kind).collect();
    assert_eq!(
        kinds,
        vec![ArtifactKind::PrimarySource, ArtifactKind::Barrel, ArtifactKind::Documentation]
    );

    let out = TempDir::new().unwrap();
    let report = pipeline.writer.write(out.path(), &artifacts).unwrap();
    assert_eq!(report.written.len(), 3);
    assert!(report.written.iter().all(|p| p.is_file()));

    let outcome = pipeline.validator.validate(model, &artifacts);
    assert!(outcome.valid, "{outcome:#?}\n{}", artifacts[0].content);
    assert!(outcome.score >= 90);
}

#[test]
fn test_derived_value_stays_reactive() {
    let pipeline = Pipeline::default();
    let parsed = parse_all(&pipeline, &[("Cart.tsx", CART)]);
    let t = pipeline
        .transformer
        .transform(&parsed[0], &TargetIndex::default())
        .unwrap();
    let artifacts = pipeline.generator.generate(&t.model).unwrap();
    let primary = &artifacts[0].content;

    assert!(primary.contains("import { createMemo, createSignal } from \"solid-js\";"));
    assert!(primary.contains("const total = createMemo(() => count() * 2);"));
    assert!(primary.contains("{total()} items"));
    assert!(!primary.contains("const total = count() * 2;"));

    let outcome = pipeline.validator.validate(&parsed[0].model, &artifacts);
    assert!(outcome.valid, "{outcome:#?}\n{primary}");
}

#[test]
fn test_module_without_exports_validates() {
    let pipeline = Pipeline::default();
    for (path, src) in [("Plain.ts", "const x = 1;\n"), ("Empty.tsx", "")] {
        let parsed = parse_all(&pipeline, &[(path, src)]);
        let t = pipeline
            .transformer
            .transform(&parsed[0], &TargetIndex::default())
            .unwrap();
        let artifacts = pipeline.generator.generate(&t.model).unwrap();
        let name = parsed[0].model.name.clone();
        assert_eq!(artifacts[1].content, format!("export * from \"./{name}\";\n"));

        let outcome = pipeline.validator.validate(&parsed[0].model, &artifacts);
        assert!(outcome.valid, "{path}: {outcome:#?}");
    }

    let parsed = parse_all(&pipeline, &[("lib/Plain.ts", "const x = 1;\n")]);
    let t = pipeline
        .transformer
        .transform(&parsed[0], &TargetIndex::default())
        .unwrap();
    let artifacts = pipeline.generator.generate(&t.model).unwrap();
    assert_eq!(artifacts[0].path, Path::new("Plain/Plain.ts"));
}

// ============================================================================
// Failure paths
// ============================================================================

#[test]
fn test_cycle_blocks_complete_order() {
    let a = "import B from './B';\nexport default function A() { return <B />; }\n";
    let b = "import A from './A';\nexport default function B() { return <A />; }\n";
    let c = "export default function C() { return <p />; }\n";
    let pipeline = Pipeline::default();
    let parsed = parse_all(&pipeline, &[("A.tsx", a), ("B.tsx", b), ("C.tsx", c)]);
    let resolution = resolve(&models(&parsed));

    assert!(resolution.is_partial());
    assert_eq!(resolution.cycles.len(), 1);
    let order: Vec<&str> = resolution.order.iter().map(|id| id.as_str()).collect();
    assert_eq!(order, vec!["C"]);
    let err = resolution.into_order().unwrap_err();
    assert!(matches!(err, MigrationError::DependencyCycle { .. }));
}

#[test]
fn test_parse_failure_is_reported_with_position() {
    let pipeline = Pipeline::default();
    let err = pipeline
        .parser
        .parse("export default function Broken() { return <div>; }", Path::new("Broken.tsx"))
        .unwrap_err();
    assert!(matches!(err, MigrationError::ParseFailure { .. }));
    assert_eq!(err.kind().label(), "extraction-error");
}

#[test]
fn test_failed_write_leaves_output_untouched() {
    let pipeline = Pipeline::default();
    let parsed = parse_all(&pipeline, &[("ui/Button.tsx", BUTTON)]);
    let t = pipeline
        .transformer
        .transform(&parsed[0], &TargetIndex::default())
        .unwrap();
    let artifacts = pipeline.generator.generate(&t.model).unwrap();

    let out = TempDir::new().unwrap();
    let err = AtomicWriter::new(out.path())
        .fail_at_commit(2)
        .write_all(&artifacts)
        .unwrap_err();
    assert!(matches!(err, MigrationError::WriteFailed { .. }));
    assert!(fs::read_dir(out.path()).unwrap().next().is_none());

    assert!(!err.is_permanent());
}
