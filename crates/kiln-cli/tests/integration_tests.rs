//! Integration tests for the `kiln` binary.

use assert_cmd::cargo;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const REACT_VITE: &str = r#"{
  "name": "shop",
  "dependencies": { "react": "^18.3.1", "react-dom": "^18.3.1" },
  "devDependencies": { "vite": "^6.0.0" }
}"#;

/// A `kiln` command isolated from the user's own config.
fn kiln(dir: &Path) -> assert_cmd::Command {
    let mut cmd = cargo::cargo_bin_cmd!("kiln");
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env_remove("KILN_CONFIG")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}

fn project(package_json: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("package.json"), package_json).unwrap();
    temp
}

#[test]
fn help_flag() {
    let temp = TempDir::new().unwrap();
    kiln(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"))
        .stdout(predicate::str::contains("add"))
        .stdout(predicate::str::contains("check"));
}

#[test]
fn version_flag() {
    let temp = TempDir::new().unwrap();
    kiln(temp.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn completions_for_bash() {
    let temp = TempDir::new().unwrap();
    kiln(temp.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("kiln"));
}

// ── detect ────────────────────────────────────────────────────────────────────

#[test]
fn detect_reports_framework_and_bundler() {
    let temp = project(REACT_VITE);
    kiln(temp.path())
        .arg("detect")
        .assert()
        .success()
        .stdout(predicate::str::contains("shop"))
        .stdout(predicate::str::contains("react (18.3.1)"))
        .stdout(predicate::str::contains("vite"));
}

#[test]
fn detect_as_json() {
    let temp = project(REACT_VITE);
    let out = kiln(temp.path())
        .args(["--output-format", "json", "detect"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let ctx: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(ctx["framework"], "react");
    assert_eq!(ctx["bundler"], "vite");
    assert_eq!(ctx["projectName"], "shop");
}

#[test]
fn detect_honours_root_flag() {
    let temp = project(REACT_VITE);
    let elsewhere = TempDir::new().unwrap();
    kiln(elsewhere.path())
        .args(["--root"])
        .arg(temp.path())
        .arg("detect")
        .assert()
        .success()
        .stdout(predicate::str::contains("shop"));
}

// ── check ─────────────────────────────────────────────────────────────────────

#[test]
fn check_compatible_selection() {
    let temp = project(REACT_VITE);
    kiln(temp.path())
        .args(["check", "zustand", "react-router-dom"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Selection is compatible"));
}

#[test]
fn check_prints_accept_key_for_css_overlap() {
    let temp = project(REACT_VITE);
    kiln(temp.path())
        .args(["check", "tailwindcss", "unocss"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "--accept exclusive:tailwindcss,unocss",
        ));
}

#[test]
fn check_accepting_a_warning_moves_it_to_accepted() {
    let temp = project(REACT_VITE);
    let out = kiln(temp.path())
        .args([
            "--output-format",
            "json",
            "check",
            "tailwindcss",
            "unocss",
            "--accept",
            "exclusive:tailwindcss,unocss",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let result: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(result["valid"], true);
    assert_eq!(result["warnings"].as_array().unwrap().len(), 0);
    assert_eq!(result["overridden"].as_array().unwrap().len(), 1);
}

#[test]
fn check_with_explicit_framework_needs_no_project() {
    let temp = TempDir::new().unwrap();
    kiln(temp.path())
        .args(["check", "pinia", "--framework", "vue"])
        .assert()
        .success();
}

// ── list / rules ──────────────────────────────────────────────────────────────

#[test]
fn list_json_is_an_array_of_descriptors() {
    let temp = TempDir::new().unwrap();
    let out = kiln(temp.path())
        .args(["list", "--format", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let plugins: Vec<serde_json::Value> = serde_json::from_slice(&out).unwrap();
    assert!(plugins.len() >= 30);
    assert!(plugins.iter().any(|p| p["name"] == "zustand"));
}

#[test]
fn list_filters_by_category() {
    let temp = TempDir::new().unwrap();
    kiln(temp.path())
        .args(["list", "--category", "testing", "--format", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("vitest"))
        .stdout(predicate::str::contains("zustand").not());
}

#[test]
fn list_compatible_marks_installed_plugins() {
    let temp = project(
        r#"{ "dependencies": { "react": "^18.3.1", "zustand": "^5.0.0" } }"#,
    );
    kiln(temp.path())
        .args(["list", "--compatible", "--category", "state"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(installed)"))
        .stdout(predicate::str::contains("pinia").not());
}

#[test]
fn rules_json_has_typed_entries() {
    let temp = TempDir::new().unwrap();
    let out = kiln(temp.path())
        .args(["--output-format", "json", "rules", "--plugin", "shadcn"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let rules: Vec<serde_json::Value> = serde_json::from_slice(&out).unwrap();
    assert!(!rules.is_empty());
    assert!(rules.iter().any(|r| r["type"] == "REQUIRES"));
}

// ── add ───────────────────────────────────────────────────────────────────────

#[test]
fn add_dry_run_prints_plan_and_changes_nothing() {
    let temp = project(REACT_VITE);
    kiln(temp.path())
        .args(["add", "zustand", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1. zustand@"))
        .stdout(predicate::str::contains("Dry run"));

    let manifest = fs::read_to_string(temp.path().join("package.json")).unwrap();
    assert_eq!(manifest, REACT_VITE);
}

#[test]
fn add_dry_run_json_orders_requirements_first() {
    let temp = project(REACT_VITE);
    let out = kiln(temp.path())
        .args([
            "--output-format",
            "json",
            "add",
            "shadcn",
            "tailwindcss",
            "--dry-run",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let plan: serde_json::Value = serde_json::from_slice(&out).unwrap();
    let steps: Vec<&str> = plan["steps"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["plugin"].as_str().unwrap())
        .collect();
    assert_eq!(steps, ["tailwindcss", "shadcn"]);
}

// ── config / init ─────────────────────────────────────────────────────────────

#[test]
fn config_path_points_at_a_toml_file() {
    let temp = TempDir::new().unwrap();
    kiln(temp.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn env_overrides_config_values() {
    let temp = TempDir::new().unwrap();
    kiln(temp.path())
        .env("KILN_INSTALL__FAILURE_POLICY", "continue")
        .args(["config", "get", "install.failure_policy"])
        .assert()
        .success()
        .stdout(predicate::str::diff("continue\n"));
}

#[test]
fn local_config_file_is_read() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join(".kiln.toml"), "[install]\ntimeout_secs = 42\n").unwrap();
    kiln(temp.path())
        .args(["config", "get", "install.timeout_secs"])
        .assert()
        .success()
        .stdout(predicate::str::diff("42\n"));
}

#[test]
fn init_local_writes_config_once() {
    let temp = TempDir::new().unwrap();
    kiln(temp.path())
        .args(["init", "--local"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration created"));
    assert!(temp.path().join(".kiln.toml").exists());

    kiln(temp.path())
        .args(["init", "--local"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}
