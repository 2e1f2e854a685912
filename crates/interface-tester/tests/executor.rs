//! Executor integration tests for interface-tester.
// crates/interface-tester/tests/executor.rs
// ============================================================================
// Module: Test Executor Integration Tests
// Description: End-to-end runs of catalog tests against runtime doubles.
// Purpose: Validate ordered checks, schema modes, and run aggregation.
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::missing_docs_in_private_items,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use common::IngressProvider;
use common::IngressRequirer;
use common::ScriptedRuntime;
use interface_tester::ComponentMetadata;
use interface_tester::DataBagSchema;
use interface_tester::IncludePattern;
use interface_tester::InterfaceTestCase;
use interface_tester::InterfaceTester;
use interface_tester::Relation;
use interface_tester::Role;
use interface_tester::RuntimeError;
use interface_tester::SchemaMode;
use interface_tester::State;
use interface_tester::TestCaseRegistry;
use interface_tester::TestStatus;
use interface_tester::TesterError;
use interface_tester::TesterSettings;
use interface_tester::discover;
use serde_json::json;

type TestResult = Result<(), String>;

fn ingress_settings(role: Role) -> TesterSettings {
    TesterSettings::new("ingress", 1, role, common::sample_catalog())
}

fn provider_tester() -> InterfaceTester<IngressProvider> {
    InterfaceTester::new(IngressProvider::default(), ingress_settings(Role::Provider))
}

fn ingress_relation(remote: &[(&str, &str)]) -> State {
    State {
        leader: true,
        relations: vec![
            Relation::new("ingress")
                .with_interface("ingress")
                .with_remote_app_data(common::databag(remote)),
        ],
        ..State::default()
    }
}

#[test]
fn sample_catalog_passes_for_ingress_provider() -> TestResult {
    let mut tester = provider_tester();
    let report = tester.discover_and_run().map_err(|err| err.to_string())?;
    if report.outcomes.len() != 3 {
        return Err(format!("expected 3 provider tests, got {}", report.outcomes.len()));
    }
    report.into_result().map_err(|err| err.to_string())?;
    Ok(())
}

#[test]
fn sample_catalog_passes_for_ingress_requirer() -> TestResult {
    let mut tester =
        InterfaceTester::new(IngressRequirer::default(), ingress_settings(Role::Requirer));
    let report = tester.discover_and_run().map_err(|err| err.to_string())?;
    if report.outcomes.len() != 2 {
        return Err(format!("expected 2 requirer tests, got {}", report.outcomes.len()));
    }
    report.into_result().map_err(|err| err.to_string())?;
    Ok(())
}

#[test]
fn valid_remote_data_publishes_nested_url() -> TestResult {
    let case = InterfaceTestCase::new("ingress", 1, Role::Provider, "url", "relation-changed")
        .with_state(ingress_relation(&[
            ("host", "\"0.0.0.42\""),
            ("model", "\"bar\""),
            ("name", "\"remote/0\""),
            ("port", "42"),
        ]))
        .with_validator(|state: &State| -> Result<(), String> {
            let relation = state.relations.first().ok_or("no relation")?;
            let raw = relation.local_app_data.get("ingress").ok_or("no ingress key")?;
            let value: serde_json::Value =
                serde_json::from_str(raw).map_err(|err| err.to_string())?;
            if value == json!({"url": "http://0.0.0.42:42/bar-remote"}) {
                Ok(())
            } else {
                Err(format!("unexpected ingress data {value}"))
            }
        });
    let mut tester = provider_tester();
    let outcome = tester.run_case(&case);
    if outcome.status != TestStatus::Passed {
        return Err(format!("expected pass, got {:?}", outcome.status));
    }
    Ok(())
}

#[test]
fn malformed_remote_data_leaves_databags_empty() -> TestResult {
    let malformed = ingress_relation(&[("model", "bar"), ("bubble", "rubble")]);
    let empty = InterfaceTestCase::new("ingress", 1, Role::Provider, "empty", "relation-changed")
        .with_state(malformed.clone())
        .with_schema(SchemaMode::Empty);
    let default =
        InterfaceTestCase::new("ingress", 1, Role::Provider, "default", "relation-changed")
            .with_state(malformed);
    let mut tester = provider_tester();

    let outcome = tester.run_case(&empty);
    if !outcome.passed() {
        return Err(format!("empty schema should pass: {:?}", outcome.errors()));
    }
    // The interface schema requires the nested url, so the same run fails under it.
    let outcome = tester.run_case(&default);
    let errors = outcome.errors();
    if errors.is_empty() || !errors.iter().all(|error| error.contains("app databag")) {
        return Err(format!("expected app databag errors, got {errors:?}"));
    }
    Ok(())
}

#[test]
fn play_failure_skips_remaining_checks() -> TestResult {
    let metadata = ComponentMetadata::new("broken").provides("ingress", "ingress");
    let runtime = ScriptedRuntime::new(metadata, |_, _| {
        Err(RuntimeError::Component("handler raised".to_string()))
    });
    let case = InterfaceTestCase::new("ingress", 1, Role::Provider, "boom", "relation-changed")
        .with_validator(|_: &State| -> Result<(), String> {
            Err("validator must not run".to_string())
        });
    let mut tester = InterfaceTester::new(runtime, ingress_settings(Role::Provider));
    let errors = tester.run_case(&case).errors();
    if errors != vec!["could not play scene: component error: handler raised".to_string()] {
        return Err(format!("unexpected errors {errors:?}"));
    }
    Ok(())
}

#[test]
fn component_panic_is_recorded_and_run_continues() -> TestResult {
    let metadata = ComponentMetadata::new("buggy").provides("ingress", "ingress");
    let runtime = ScriptedRuntime::new(metadata, |state: &State, event| {
        if event.name == "ingress-relation-changed" {
            panic!("handler indexed past the end");
        }
        Ok(state.clone())
    });
    let buggy = InterfaceTestCase::new("ingress", 1, Role::Provider, "buggy", "relation-changed")
        .with_schema(SchemaMode::Empty)
        .with_validator(|_: &State| -> Result<(), String> {
            Err("validator must not run".to_string())
        });
    let fine = InterfaceTestCase::new("ingress", 1, Role::Provider, "fine", "relation-created")
        .with_schema(SchemaMode::Skip);
    let mut registry = TestCaseRegistry::new();
    registry.register(buggy);
    registry.register(fine);

    let mut tester = InterfaceTester::new(runtime, ingress_settings(Role::Provider));
    let report = tester.run(&registry);
    if report.outcomes.len() != 2 || report.passed() != 1 {
        return Err(format!("unexpected outcomes {:?}", report.outcomes));
    }
    let errors = report.outcomes[0].errors();
    let expected = "could not play scene: component panicked: handler indexed past the end";
    if errors != vec![expected.to_string()] {
        return Err(format!("unexpected errors {errors:?}"));
    }
    if report.outcomes[1].name != "fine" || !report.outcomes[1].passed() {
        return Err(format!("second case did not pass: {:?}", report.outcomes[1]));
    }
    Ok(())
}

#[test]
fn validator_panic_is_recorded_and_schema_still_checked() -> TestResult {
    let metadata = ComponentMetadata::new("c").provides("ingress", "ingress");
    let runtime = ScriptedRuntime::new(metadata, |state: &State, _| {
        let mut output = state.clone();
        for relation in &mut output.relations {
            relation.local_app_data.insert("k".to_string(), "v".to_string());
        }
        Ok(output)
    });
    let follower = State {
        leader: false,
        relations: vec![Relation::new("ingress").with_interface("ingress")],
        ..State::default()
    };
    let strict = InterfaceTestCase::new("ingress", 1, Role::Provider, "strict", "relation-joined")
        .with_state(follower)
        .with_schema(SchemaMode::Empty)
        .with_validator(|state: &State| -> Result<(), String> {
            assert!(state.leader, "unit is not leader");
            Ok(())
        });
    let fine = InterfaceTestCase::new("ingress", 1, Role::Provider, "fine", "start")
        .with_schema(SchemaMode::Skip);
    let mut registry = TestCaseRegistry::new();
    registry.register(strict);
    registry.register(fine);

    let mut tester = InterfaceTester::new(runtime, ingress_settings(Role::Provider));
    let report = tester.run(&registry);
    if report.outcomes.len() != 2 || report.passed() != 1 {
        return Err(format!("unexpected outcomes {:?}", report.outcomes));
    }
    let errors = report.outcomes[0].errors();
    if errors.first().map(String::as_str) != Some("validating scene output: unit is not leader") {
        return Err(format!("validator panic not recorded first: {errors:?}"));
    }
    if errors.len() != 2 || !errors[1].contains("app databag must be empty") {
        return Err(format!("schema check did not run after the panic: {errors:?}"));
    }
    if !report.outcomes[1].passed() {
        return Err(format!("second case did not pass: {:?}", report.outcomes[1]));
    }
    Ok(())
}

#[test]
fn validator_and_schema_failures_are_both_recorded() -> TestResult {
    let metadata = ComponentMetadata::new("chatty").provides("ingress", "ingress");
    let runtime = ScriptedRuntime::new(metadata, |state: &State, _| {
        let mut output = state.clone();
        for relation in &mut output.relations {
            relation.local_unit_data.insert("noise".to_string(), "1".to_string());
        }
        Ok(output)
    });
    let case = InterfaceTestCase::new("ingress", 1, Role::Provider, "both", "relation-changed")
        .with_validator(|_: &State| -> Result<(), String> {
            Err("custom check failed".to_string())
        })
        .with_schema(SchemaMode::Empty);
    let mut tester = InterfaceTester::new(runtime, ingress_settings(Role::Provider));
    let errors = tester.run_case(&case).errors();
    if errors.len() != 2 {
        return Err(format!("expected two errors, got {errors:?}"));
    }
    if errors[0] != "validating scene output: custom check failed" {
        return Err(format!("unexpected first error {}", errors[0]));
    }
    if !errors[1].contains("unit databag must be empty") {
        return Err(format!("unexpected second error {}", errors[1]));
    }
    Ok(())
}

#[test]
fn every_matching_relation_is_validated() -> TestResult {
    let metadata = ComponentMetadata::new("multi").provides("ingress", "ingress");
    let runtime = ScriptedRuntime::new(metadata, |state: &State, _| {
        let mut output = state.clone();
        for relation in &mut output.relations {
            relation.local_app_data.insert("junk".to_string(), "1".to_string());
        }
        Ok(output)
    });
    let state = State {
        relations: vec![
            Relation::new("ingress").with_relation_id(1),
            Relation::new("ingress").with_relation_id(2),
        ],
        ..State::default()
    };
    let case = InterfaceTestCase::new("ingress", 1, Role::Provider, "multi", "start")
        .with_state(state)
        .with_schema(SchemaMode::Empty);
    let mut tester = InterfaceTester::new(runtime, ingress_settings(Role::Provider));
    let errors = tester.run_case(&case).errors();
    let labels: Vec<bool> = ["relation ingress:1", "relation ingress:2"]
        .iter()
        .map(|label| errors.iter().any(|error| error.starts_with(label)))
        .collect();
    if labels != vec![true, true] {
        return Err(format!("expected errors for both relations, got {errors:?}"));
    }
    Ok(())
}

#[test]
fn skip_mode_ignores_databag_contents() -> TestResult {
    let metadata = ComponentMetadata::new("noisy").provides("ingress", "ingress");
    let runtime = ScriptedRuntime::new(metadata, |state: &State, _| {
        let mut output = state.clone();
        for relation in &mut output.relations {
            relation.local_app_data.insert("anything".to_string(), "goes".to_string());
        }
        Ok(output)
    });
    let case = InterfaceTestCase::new("ingress", 1, Role::Provider, "skip", "relation-changed")
        .with_schema(SchemaMode::Skip);
    let mut tester = InterfaceTester::new(runtime, ingress_settings(Role::Provider));
    let outcome = tester.run_case(&case);
    if !outcome.passed() {
        return Err(format!("skip mode must not fail: {:?}", outcome.errors()));
    }
    Ok(())
}

#[test]
fn custom_schema_overrides_interface_schema() -> TestResult {
    let metadata = ComponentMetadata::new("custom").provides("ingress", "ingress");
    let runtime = ScriptedRuntime::new(metadata, |state: &State, _| {
        let mut output = state.clone();
        for relation in &mut output.relations {
            relation.local_app_data.insert("token".to_string(), "\"abc\"".to_string());
        }
        Ok(output)
    });
    let app = json!({
        "type": "object",
        "required": ["token"],
        "properties": {"token": {"type": "string"}}
    });
    let schema = DataBagSchema::new(None, Some(app)).map_err(|err| err.to_string())?;
    let case = InterfaceTestCase::new("ingress", 1, Role::Provider, "custom", "relation-changed")
        .with_schema(SchemaMode::Custom(schema));
    let mut tester = InterfaceTester::new(runtime, ingress_settings(Role::Provider));
    let outcome = tester.run_case(&case);
    if !outcome.passed() {
        return Err(format!("custom schema should pass: {:?}", outcome.errors()));
    }
    Ok(())
}

#[test]
fn composition_errors_mark_case_errored() -> TestResult {
    let metadata = ComponentMetadata::new("twin")
        .provides("ingress", "ingress")
        .provides("ingress-internal", "ingress");
    let case = InterfaceTestCase::new("ingress", 1, Role::Provider, "twin", "relation-changed");
    let mut tester =
        InterfaceTester::new(ScriptedRuntime::echo(metadata), ingress_settings(Role::Provider));
    match tester.run_case(&case).status {
        TestStatus::Errored {
            error,
        } if error.starts_with("could not compose initial state") => Ok(()),
        other => Err(format!("expected composition error, got {other:?}")),
    }
}

#[test]
fn missing_schema_document_errors_default_mode_only() -> TestResult {
    let temp = tempfile::tempdir().map_err(|err| err.to_string())?;
    let metadata = ComponentMetadata::new("c").provides("db", "database");
    let settings = TesterSettings::new("database", 2, Role::Provider, temp.path());
    let mut tester = InterfaceTester::new(ScriptedRuntime::echo(metadata), settings);

    let default = InterfaceTestCase::new("database", 2, Role::Provider, "d", "relation-created");
    match tester.run_case(&default).status {
        TestStatus::Errored {
            error,
        } if error.contains("could not load schema for database/v2/provider") => {}
        other => return Err(format!("expected schema load error, got {other:?}")),
    }
    let skip = default.clone().with_schema(SchemaMode::Skip);
    if !tester.run_case(&skip).passed() {
        return Err("skip mode must not need the schema document".to_string());
    }
    Ok(())
}

#[test]
fn run_executes_every_case_and_quotes_all_errors() -> TestResult {
    let temp = tempfile::tempdir().map_err(|err| err.to_string())?;
    let version_dir = temp.path().join("foo/v0");
    common::write_schema(&version_dir, &json!({}))?;
    common::write_manifest(
        &version_dir,
        "provider.json",
        &json!([
            {"name": "first_fails", "role": "provider", "event": "relation-changed"},
            {"name": "second_passes", "role": "provider", "event": "relation-created",
             "schema": "skip"},
            {"name": "third_fails", "role": "provider", "event": "relation-broken"}
        ]),
    )?;
    let metadata = ComponentMetadata::new("c").provides("foo", "foo");
    let runtime = ScriptedRuntime::new(metadata, |state: &State, _| {
        let mut output = state.clone();
        for relation in &mut output.relations {
            relation.local_app_data.insert("k".to_string(), "v".to_string());
        }
        Ok(output)
    });
    let settings = TesterSettings::new("foo", 0, Role::Provider, temp.path());
    let mut registry = TestCaseRegistry::new();
    discover(temp.path(), &IncludePattern::all(), &mut registry).map_err(|err| err.to_string())?;
    let mut tester = InterfaceTester::new(runtime, settings);
    let report = tester.run(&registry);
    if report.outcomes.len() != 3 || report.passed() != 1 {
        return Err(format!("unexpected outcomes {:?}", report.outcomes));
    }
    match report.into_result() {
        Err(TesterError::Failed {
            errors, ..
        }) => {
            if errors.len() == 2
                && errors[0].starts_with("first_fails: relation foo:1: app databag must be empty")
                && errors[1].starts_with("third_fails: ")
            {
                Ok(())
            } else {
                Err(format!("unexpected errors {errors:?}"))
            }
        }
        other => Err(format!("expected failure, got {other:?}")),
    }
}

#[test]
fn state_template_supplies_environment() -> TestResult {
    let metadata = ComponentMetadata::new("leader-only").provides("ingress", "ingress");
    let runtime = ScriptedRuntime::new(metadata, |state: &State, _| {
        if state.leader {
            Ok(state.clone())
        } else {
            Err(RuntimeError::Component("not leader".to_string()))
        }
    });
    let template = State {
        leader: true,
        ..State::default()
    };
    let settings = ingress_settings(Role::Provider).with_state_template(template);
    let case = InterfaceTestCase::new("ingress", 1, Role::Provider, "t", "relation-created")
        .with_schema(SchemaMode::Empty);
    let mut tester = InterfaceTester::new(runtime, settings);
    let outcome = tester.run_case(&case);
    if !outcome.passed() {
        return Err(format!("template leadership should apply: {:?}", outcome.errors()));
    }
    Ok(())
}
