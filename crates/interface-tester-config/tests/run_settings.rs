//! Run settings conversion tests for interface-tester-config.
// crates/interface-tester-config/tests/run_settings.rs
// =============================================================================
// Module: Run Settings Tests
// Description: Validate conversion of the [run] table into tester settings.
// Purpose: Ensure state templates are loaded and bad ones fail closed.
// =============================================================================

use std::fs;
use std::path::PathBuf;

use interface_tester::Role;
use interface_tester_config::RunConfig;
use interface_tester_config::TesterConfig;

type TestResult = Result<(), String>;

fn config_with_template(template: Option<PathBuf>) -> TesterConfig {
    TesterConfig {
        run: Some(RunConfig {
            interface: "ingress".to_string(),
            version: 1,
            role: Role::Provider,
            state_template: template,
        }),
        ..TesterConfig::default()
    }
}

#[test]
fn run_table_becomes_tester_settings() -> TestResult {
    let config = config_with_template(None);
    let settings =
        config.tester_settings().map_err(|err| err.to_string())?.ok_or("settings missing")?;
    if settings.key().to_string() != "ingress/v1/provider" {
        return Err(format!("unexpected key {}", settings.key()));
    }
    if settings.version_dir() != PathBuf::from("interfaces/ingress/v1") {
        return Err(format!("unexpected version dir {}", settings.version_dir().display()));
    }
    if settings.state_template.is_some() {
        return Err("no template was configured".to_string());
    }
    Ok(())
}

#[test]
fn state_template_is_loaded_from_yaml() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("state.yaml");
    fs::write(&path, "leader: true\nconfig:\n  port: 8080\n").map_err(|err| err.to_string())?;
    let settings = config_with_template(Some(path))
        .tester_settings()
        .map_err(|err| err.to_string())?
        .ok_or("settings missing")?;
    let template = settings.state_template.ok_or("template missing")?;
    let port = template.config.get("port").and_then(serde_json::Value::as_u64);
    if !template.leader || port != Some(8080) {
        return Err("template fields were not loaded".to_string());
    }
    Ok(())
}

#[test]
fn malformed_state_template_is_invalid() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("state.json");
    fs::write(&path, "{\"leader\": \"yes\"}").map_err(|err| err.to_string())?;
    match config_with_template(Some(path)).tester_settings() {
        Err(err) if err.to_string().contains("is not a state") => Ok(()),
        Err(err) => Err(format!("unexpected error {err}")),
        Ok(_) => Err("expected malformed template to fail".to_string()),
    }
}

#[test]
fn missing_state_template_is_an_io_error() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    match config_with_template(Some(dir.path().join("absent.json"))).tester_settings() {
        Err(err) if err.to_string().starts_with("config io error: run.state_template") => Ok(()),
        Err(err) => Err(format!("unexpected error {err}")),
        Ok(_) => Err("expected missing template to fail".to_string()),
    }
}
