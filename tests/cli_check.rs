//! End-to-end tests for the `check` and `surface` commands.
//!
//! Snapshots are written to a temp directory, run through the library entry
//! points, and the binary is exercised for its exit-status contract.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use apicheck::cli::{run_check, run_surface, CheckArgs, OutputFormat, SurfaceArgs};
use apicheck::compat::{DiagnosticKind, Severity};
use apicheck::config::{CliOverrides, ResolvedConfig};
use apicheck::output::CheckResponse;

const BASELINE: &str = r#"{
    "packages": [
        {
            "name": "a",
            "types": [
                {
                    "name": "Widget",
                    "constructors": [ { "name": "Widget" } ],
                    "methods": [
                        { "name": "run", "returns": "void" },
                        { "name": "size", "returns": "int" }
                    ]
                }
            ]
        }
    ]
}"#;

const CANDIDATE: &str = r#"{
    "packages": [
        {
            "name": "a",
            "types": [
                {
                    "name": "Widget",
                    "constructors": [ { "name": "Widget" } ],
                    "methods": [
                        { "name": "run", "returns": "void" },
                        { "name": "reset", "returns": "void" }
                    ]
                }
            ]
        }
    ]
}"#;

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn config(overrides: CliOverrides) -> ResolvedConfig {
    ResolvedConfig::resolve_with(None, |_| None, &overrides).unwrap()
}

fn check(
    baseline: &Path,
    candidate: &Path,
    overrides: CliOverrides,
    delta: bool,
) -> (CheckResponse, String) {
    let args = CheckArgs {
        baseline: baseline.to_path_buf(),
        candidate: candidate.to_path_buf(),
        delta,
        format: OutputFormat::Text,
    };
    let mut out = Vec::new();
    let response = run_check(&args, &config(overrides), &mut out).unwrap();
    (response, String::from_utf8(out).unwrap())
}

// ============================================================================
// check
// ============================================================================

#[test]
fn test_removed_method_fails() {
    let dir = tempfile::tempdir().unwrap();
    let old = write(dir.path(), "old.json", BASELINE);
    let new = write(dir.path(), "new.json", CANDIDATE);

    let (response, text) = check(&old, &new, CliOverrides::default(), false);
    assert!(!response.consistent);
    assert!(!response.passed);
    assert_eq!(response.summary.errors, 1);
    assert_eq!(response.summary.warnings, 1);
    assert_eq!(response.summary.packages_checked, 1);
    assert_eq!(response.summary.types_checked, 1);

    let kinds: Vec<(DiagnosticKind, &str)> = response
        .diagnostics
        .iter()
        .map(|d| (d.kind, d.subject.as_str()))
        .collect();
    assert_eq!(
        kinds,
        vec![
            (DiagnosticKind::AddedMethod, "a.Widget.reset()"),
            (DiagnosticKind::RemovedMethod, "a.Widget.size()"),
        ]
    );
    assert!(text.contains("a.Widget.size(): error 9:"));
    assert!(text.contains("[REMOVED_METHOD]"));
    assert!(text.ends_with("1 error(s), 1 warning(s) in 1 package(s) and 1 type(s)\n"));
}

#[test]
fn test_identical_snapshots_pass() {
    let dir = tempfile::tempdir().unwrap();
    let old = write(dir.path(), "old.json", BASELINE);
    let new = write(dir.path(), "copy.json", BASELINE);

    let (response, _) = check(&old, &new, CliOverrides::default(), false);
    assert!(response.consistent);
    assert!(response.passed);
    assert!(response.diagnostics.is_empty());
    assert_eq!(response.inputs.len(), 2);
    assert_eq!(response.inputs[0].role, "baseline");
    assert_eq!(response.inputs[0].sha256, response.inputs[1].sha256);
    assert_eq!(response.inputs[0].sha256.len(), 64);
}

#[test]
fn test_severity_overrides_change_outcome() {
    let dir = tempfile::tempdir().unwrap();
    let old = write(dir.path(), "old.json", BASELINE);
    let new = write(dir.path(), "new.json", CANDIDATE);

    let overrides = CliOverrides {
        warnings: vec![DiagnosticKind::RemovedMethod],
        hidden: vec![DiagnosticKind::AddedMethod],
        ..CliOverrides::default()
    };
    let (response, _) = check(&old, &new, overrides, false);
    // Still a breaking change, but nothing is reported as an error.
    assert!(!response.consistent);
    assert!(response.passed);
    assert_eq!(response.summary.hidden, 1);
    assert_eq!(response.diagnostics.len(), 1);
    assert_eq!(response.diagnostics[0].severity, Severity::Warning);
}

#[test]
fn test_ignored_type_is_not_diffed() {
    let dir = tempfile::tempdir().unwrap();
    let old = write(dir.path(), "old.json", BASELINE);
    let new = write(dir.path(), "new.json", CANDIDATE);

    let overrides = CliOverrides {
        ignore_types: vec!["a.Widget".to_string()],
        ..CliOverrides::default()
    };
    let (response, _) = check(&old, &new, overrides, false);
    assert!(response.consistent);
    assert!(response.diagnostics.is_empty());
}

#[test]
fn test_hidden_package_is_not_api() {
    let dir = tempfile::tempdir().unwrap();
    let old = write(dir.path(), "old.json", BASELINE);
    let new = write(dir.path(), "new.json", r#"{ "packages": [] }"#);

    let (response, _) = check(&old, &new, CliOverrides::default(), false);
    assert_eq!(response.diagnostics[0].kind, DiagnosticKind::RemovedPackage);

    let overrides = CliOverrides {
        hidden_packages: vec!["a".to_string()],
        ..CliOverrides::default()
    };
    let (response, _) = check(&old, &new, overrides, false);
    assert!(response.consistent);
    assert_eq!(response.summary.packages_checked, 0);
}

#[test]
fn test_delta_lists_added_members() {
    let dir = tempfile::tempdir().unwrap();
    let old = write(dir.path(), "old.json", BASELINE);
    let new = write(dir.path(), "new.json", CANDIDATE);

    let (response, text) = check(&old, &new, CliOverrides::default(), true);
    let delta = response.delta.unwrap();
    assert_eq!(delta.len(), 1);
    assert_eq!(delta[0].qualified_name, "a.Widget");
    assert_eq!(delta[0].methods, vec!["void reset()"]);
    assert!(delta[0].constructors.is_empty());
    assert!(text.contains("delta: class a.Widget\n"));
}

#[test]
fn test_json_report() {
    let dir = tempfile::tempdir().unwrap();
    let old = write(dir.path(), "old.json", BASELINE);
    let new = write(dir.path(), "new.json", CANDIDATE);

    let args = CheckArgs {
        baseline: old,
        candidate: new,
        delta: false,
        format: OutputFormat::Json,
    };
    let mut out = Vec::new();
    run_check(&args, &config(CliOverrides::default()), &mut out).unwrap();
    let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["schema_version"], "1");
    assert_eq!(json["passed"], false);
    assert_eq!(json["diagnostics"][1]["kind"], "REMOVED_METHOD");
    assert_eq!(json["diagnostics"][1]["code"], 9);
    assert!(json.get("delta").is_none());
}

#[test]
fn test_missing_snapshot_is_snapshot_error() {
    let dir = tempfile::tempdir().unwrap();
    let old = write(dir.path(), "old.json", BASELINE);
    let args = CheckArgs {
        baseline: old,
        candidate: dir.path().join("missing.json"),
        delta: false,
        format: OutputFormat::Text,
    };
    let err = run_check(&args, &config(CliOverrides::default()), &mut Vec::new()).unwrap_err();
    assert_eq!(err.error_code().code(), 4);
}

// ============================================================================
// surface
// ============================================================================

#[test]
fn test_surface_text() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "api.json", BASELINE);
    let args = SurfaceArgs {
        snapshot: path,
        format: OutputFormat::Text,
    };
    let mut out = Vec::new();
    let response = run_surface(&args, &config(CliOverrides::default()), &mut out).unwrap();
    assert_eq!(response.types.len(), 1);

    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "class a.Widget");
    assert!(lines.contains(&"    method void run();"));
    assert!(lines.contains(&"    method int size();"));
}

// ============================================================================
// Binary
// ============================================================================

fn apicheck() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_apicheck"));
    cmd.env_remove("APICHECK_SHOW_LEVEL")
        .env_remove("APICHECK_HIDDEN_PACKAGES")
        .env_remove("APICHECK_PARALLEL")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_binary_exit_status() {
    let dir = tempfile::tempdir().unwrap();
    let old = write(dir.path(), "old.json", BASELINE);
    let new = write(dir.path(), "new.json", CANDIDATE);

    let breaking = apicheck()
        .args(["check", "--baseline"])
        .arg(&old)
        .arg("--candidate")
        .arg(&new)
        .output()
        .unwrap();
    assert_eq!(breaking.status.code(), Some(1));

    let same = apicheck()
        .args(["check", "--baseline"])
        .arg(&old)
        .arg("--candidate")
        .arg(&old)
        .output()
        .unwrap();
    assert_eq!(same.status.code(), Some(0));

    let missing = apicheck()
        .args(["--format", "json", "check", "--baseline"])
        .arg(&old)
        .arg("--candidate")
        .arg(dir.path().join("nope"))
        .output()
        .unwrap();
    assert_eq!(missing.status.code(), Some(4));
    let json: serde_json::Value = serde_json::from_slice(&missing.stdout).unwrap();
    assert_eq!(json["status"], "error");
    assert_eq!(json["error"]["code"], 4);
}

#[test]
fn test_binary_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let old = write(dir.path(), "old.json", BASELINE);
    let new = write(dir.path(), "new.json", CANDIDATE);
    let config = write(
        dir.path(),
        "apicheck.json",
        r#"{ "severity": { "REMOVED_METHOD": "warning" } }"#,
    );

    let output = apicheck()
        .arg("--config")
        .arg(&config)
        .args(["check", "--baseline"])
        .arg(&old)
        .arg("--candidate")
        .arg(&new)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("warning 9:"));
}
