// crates/interface-tester-cli/tests/commands.rs
// ============================================================================
// Module: CLI Command Tests
// Description: Integration tests running the interface-tester binary.
// Purpose: Ensure exit codes and output streams match command outcomes.
// Dependencies: interface-tester-cli binary
// ============================================================================
//! ## Overview
//! Runs `collect` and `check` against the shipped sample catalog and against
//! broken temporary catalogs, asserting on exit status and stdout.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn tester_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_interface-tester"))
}

fn sample_catalog() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../interfaces")
}

fn run_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(tester_bin())
        .current_dir(dir)
        .env_remove("INTERFACE_TESTER_CONFIG")
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("run interface-tester")
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn check_accepts_the_sample_catalog() {
    let cwd = tempfile::tempdir().unwrap();
    let root = sample_catalog();
    let output = run_in(cwd.path(), &["check", "--root", root.to_str().unwrap()]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stdout: {stdout}");
    assert!(stdout.contains("5 test(s): ok"));
}

#[test]
fn collect_lists_sample_components() {
    let cwd = tempfile::tempdir().unwrap();
    let root = sample_catalog();
    let output = run_in(cwd.path(), &["collect", "--root", root.to_str().unwrap()]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ingress:\n  v1:\n"));
    assert!(stdout.contains("traefik-k8s"));
    assert!(!stdout.contains("__template__"));
}

#[test]
fn check_fails_on_broken_schema() {
    let cwd = tempfile::tempdir().unwrap();
    let version_dir = cwd.path().join("interfaces/broken/v0");
    fs::create_dir_all(&version_dir).unwrap();
    fs::write(version_dir.join("schema.json"), r#"{"RequirerSchema": []}"#).unwrap();
    let output = run_in(cwd.path(), &["check"]);
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("error: broken/v0: RequirerSchema"));
}

#[test]
fn config_file_selects_the_catalog() {
    let cwd = tempfile::tempdir().unwrap();
    let config = cwd.path().join("interface-tester.toml");
    let root = sample_catalog();
    fs::write(
        &config,
        format!("[catalog]\nroot = {:?}\ninclude = \"ingress\"\n", root.to_str().unwrap()),
    )
    .unwrap();
    let output = run_in(cwd.path(), &["check"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("checked 1 interface(s)"));
}

#[test]
fn invalid_config_is_reported_on_stderr() {
    let cwd = tempfile::tempdir().unwrap();
    let config = cwd.path().join("custom.toml");
    fs::write(&config, "[catalog]\ninclude = \"\"\n").unwrap();
    let output = run_in(cwd.path(), &["--config", config.to_str().unwrap(), "check"]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("catalog.include must be non-empty"));
}
