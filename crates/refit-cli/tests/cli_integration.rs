//! Integration tests for the refit CLI.
//!
//! Run with: `cargo test --package refit-cli --test cli_integration`

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

/// Run refit in `dir` with an isolated home, so no user config leaks in.
fn run_refit_in_dir(dir: &Path, args: &[&str]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_refit"));
    command
        .current_dir(dir)
        .args(args)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env_remove("RUST_LOG");
    for (key, _) in std::env::vars() {
        if key.starts_with("REFIT_") {
            command.env_remove(key);
        }
    }
    command.output().expect("Failed to execute refit command")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

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

/// Two components where the form uses the button.
fn create_components(dir: &Path) {
    fs::create_dir_all(dir.join("src/ui")).unwrap();
    fs::create_dir_all(dir.join("src/forms")).unwrap();
    fs::write(dir.join("src/ui/Button.tsx"), BUTTON).unwrap();
    fs::write(dir.join("src/forms/SignupForm.tsx"), SIGNUP_FORM).unwrap();
}

fn create_cycle(dir: &Path) {
    fs::create_dir_all(dir.join("src")).unwrap();
    fs::write(
        dir.join("src/A.tsx"),
        "import B from './B';\nexport default function A() { return <B />; }\n",
    )
    .unwrap();
    fs::write(
        dir.join("src/B.tsx"),
        "import A from './A';\nexport default function B() { return <A />; }\n",
    )
    .unwrap();
}

// =============================================================================
// Migrate Command Tests
// =============================================================================

#[test]
fn test_migrate_writes_components_and_manifest() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    create_components(dir);

    let output = run_refit_in_dir(dir, &["migrate", "src", "-o", "out", "--no-progress"]);

    assert!(output.status.success(), "refit migrate should succeed: {:?}", output);
    for file in [
        "out/Button/Button.tsx",
        "out/Button/index.ts",
        "out/Button/README.md",
        "out/SignupForm/SignupForm.tsx",
        "out/.refit/manifest.json",
        "out/.refit/results.json",
    ] {
        assert!(dir.join(file).exists(), "{file} should be created");
    }

    let form = fs::read_to_string(dir.join("out/SignupForm/SignupForm.tsx")).unwrap();
    assert!(form.contains("createSignal"));
    assert!(form.contains("import Button from \"../Button\";"));
    assert!(stdout(&output).contains("Migrated"));
}

#[test]
fn test_migrate_json_output() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    create_components(dir);

    let output = run_refit_in_dir(dir, &["--json", "migrate", "src", "-o", "out", "--parallel"]);

    assert!(output.status.success());
    let response: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let successful = response["manifest"]["successful"].as_array().unwrap();
    assert_eq!(successful.len(), 2);
    assert_eq!(response["manifest"]["config"]["mode"], "parallel");
}

#[test]
fn test_migrate_dry_run_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    create_components(dir);

    let output = run_refit_in_dir(dir, &["migrate", "src", "-o", "out", "--dry-run"]);

    assert!(output.status.success());
    assert!(!dir.join("out").exists(), "dry run should not create output");
    assert!(stdout(&output).contains("Dry run"));
}

#[test]
fn test_migrate_cycle_fails_batch() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    create_cycle(dir);

    let output = run_refit_in_dir(dir, &["migrate", "src", "-o", "out", "--no-progress"]);

    assert_eq!(output.status.code(), Some(1));
    let text = stdout(&output);
    assert!(text.contains("Cycle"));
    assert!(text.contains("resolution failed"));
    assert!(!dir.join("out/A").exists());
}

// =============================================================================
// Analyze / Plan Tests
// =============================================================================

#[test]
fn test_analyze_reports_tiers() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    create_components(dir);

    let output = run_refit_in_dir(dir, &["--json", "analyze", "src"]);

    assert!(output.status.success());
    let response: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let components = response["components"].as_array().unwrap();
    assert_eq!(components.len(), 2);
    assert!(components.iter().all(|c| c["tier"].is_string()));
}

#[test]
fn test_plan_orders_providers_first() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    create_components(dir);

    let output = run_refit_in_dir(dir, &["plan", "src"]);

    assert!(output.status.success());
    let text = stdout(&output);
    let button = text.find("ui/Button").unwrap();
    let form = text.find("forms/SignupForm").unwrap();
    assert!(button < form, "provider should be listed first:\n{text}");
    assert!(text.contains("Wave 2"));
}

#[test]
fn test_plan_with_cycle_exits_nonzero() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    create_cycle(dir);

    let output = run_refit_in_dir(dir, &["plan", "src"]);

    assert!(!output.status.success());
    assert!(stdout(&output).contains("Blocked"));
}

// =============================================================================
// Status Tests
// =============================================================================

#[test]
fn test_status_before_and_after_run() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    create_components(dir);

    let before = run_refit_in_dir(dir, &["status", "out"]);
    assert!(before.status.success());
    assert!(stdout(&before).contains("No run recorded"));

    let migrate = run_refit_in_dir(dir, &["migrate", "src", "-o", "out", "--no-progress"]);
    assert!(migrate.status.success());

    let after = run_refit_in_dir(dir, &["--json", "status", "out"]);
    assert!(after.status.success());
    let response: serde_json::Value = serde_json::from_str(&stdout(&after)).unwrap();
    assert_eq!(response["store_exists"], true);
    assert_eq!(response["results"].as_array().unwrap().len(), 2);
}

// =============================================================================
// Config Tests
// =============================================================================

#[test]
fn test_config_get_default() {
    let temp = TempDir::new().unwrap();

    let output = run_refit_in_dir(temp.path(), &["config", "get", "concurrency"]);

    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "4");
}

#[test]
fn test_config_set_persists_to_local_file() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    fs::write(dir.join("refit.json"), "{}").unwrap();

    let set = run_refit_in_dir(dir, &["config", "set", "mode", "parallel"]);
    assert!(set.status.success(), "{:?}", set);

    let get = run_refit_in_dir(dir, &["config", "get", "mode"]);
    assert_eq!(stdout(&get).trim(), "parallel");

    let saved = fs::read_to_string(dir.join("refit.json")).unwrap();
    assert!(saved.contains("\"parallel\""));
}

#[test]
fn test_config_env_override() {
    let temp = TempDir::new().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_refit"))
        .current_dir(temp.path())
        .env("HOME", temp.path())
        .env("XDG_CONFIG_HOME", temp.path().join(".config"))
        .env("REFIT_CONCURRENCY", "9")
        .args(["config", "get", "concurrency"])
        .output()
        .expect("Failed to execute refit command");

    assert_eq!(stdout(&output).trim(), "9");
}

#[test]
fn test_config_unknown_key_fails() {
    let temp = TempDir::new().unwrap();

    let output = run_refit_in_dir(temp.path(), &["config", "set", "colour", "blue"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown config key"));
}

#[test]
fn test_help_lists_commands() {
    let temp = TempDir::new().unwrap();

    let output = run_refit_in_dir(temp.path(), &["--help"]);

    assert!(output.status.success());
    let text = stdout(&output);
    for command in ["migrate", "analyze", "plan", "status", "config"] {
        assert!(text.contains(command), "help should list {command}");
    }
}
