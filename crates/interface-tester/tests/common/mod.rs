// crates/interface-tester/tests/common/mod.rs
// ============================================================================
// Module: Interface Tester Test Helpers
// Description: Catalog builders and component runtime doubles.
// Purpose: Share fixtures across interface-tester integration suites.
// ============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use interface_tester::ComponentMetadata;
use interface_tester::ComponentRuntime;
use interface_tester::Databag;
use interface_tester::Event;
use interface_tester::RuntimeError;
use interface_tester::State;
use interface_tester::StatusName;
use serde_json::Value;
use serde_json::json;

/// Returns the sample catalog shipped at the repository root.
pub fn sample_catalog() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../interfaces")
}

/// Writes a file, creating parent directories.
pub fn write_file(path: &Path, content: &str) -> Result<(), String> {
    let parent = path.parent().ok_or_else(|| format!("no parent for {}", path.display()))?;
    fs::create_dir_all(parent).map_err(|err| err.to_string())?;
    fs::write(path, content).map_err(|err| err.to_string())
}

/// Writes a minimal `schema.json` for a version directory.
pub fn write_schema(version_dir: &Path, schema: &Value) -> Result<(), String> {
    write_file(&version_dir.join("schema.json"), &schema.to_string())
}

/// Writes a JSON test manifest declaring the given tests.
pub fn write_manifest(version_dir: &Path, file: &str, tests: &Value) -> Result<(), String> {
    let manifest = json!({ "tests": tests });
    write_file(&version_dir.join("interface_tests").join(file), &manifest.to_string())
}

/// Builds a databag from string pairs.
pub fn databag(entries: &[(&str, &str)]) -> Databag {
    entries.iter().map(|(key, value)| ((*key).to_string(), (*value).to_string())).collect()
}

// ============================================================================
// SECTION: Scripted Runtime
// ============================================================================

/// Handler invoked by the scripted runtime.
type Script = Box<dyn Fn(&State, &Event) -> Result<State, RuntimeError>>;

/// Runtime double whose behavior is a closure.
pub struct ScriptedRuntime {
    /// Declared metadata.
    metadata: ComponentMetadata,
    /// Event handler.
    script: Script,
}

impl ScriptedRuntime {
    /// Creates a runtime running `script` for every event.
    pub fn new(
        metadata: ComponentMetadata,
        script: impl Fn(&State, &Event) -> Result<State, RuntimeError> + 'static,
    ) -> Self {
        Self {
            metadata,
            script: Box::new(script),
        }
    }

    /// Creates a runtime that returns the input state unchanged.
    pub fn echo(metadata: ComponentMetadata) -> Self {
        Self::new(metadata, |state, _| Ok(state.clone()))
    }
}

impl ComponentRuntime for ScriptedRuntime {
    fn metadata(&self) -> &ComponentMetadata {
        &self.metadata
    }

    fn play(&self, state: &State, event: &Event) -> Result<State, RuntimeError> {
        (self.script)(state, event)
    }
}

// ============================================================================
// SECTION: Ingress Doubles
// ============================================================================

/// Ingress provider double declaring one `ingress` endpoint.
///
/// Publishes a URL once the requirer sent valid data.
pub struct IngressProvider {
    /// Declared metadata.
    metadata: ComponentMetadata,
}

impl Default for IngressProvider {
    fn default() -> Self {
        Self {
            metadata: ComponentMetadata::new("traefik").provides("ingress", "ingress"),
        }
    }
}

impl ComponentRuntime for IngressProvider {
    fn metadata(&self) -> &ComponentMetadata {
        &self.metadata
    }

    fn play(&self, state: &State, event: &Event) -> Result<State, RuntimeError> {
        let mut output = state.clone();
        output.unit_status.name = StatusName::Active;
        let Some(bound) = &event.relation else {
            return Ok(output);
        };
        if event.relation_kind() != Some("relation-changed") || !output.leader {
            return Ok(output);
        }
        let relation = output
            .relations
            .iter_mut()
            .find(|relation| relation.relation_id == Some(bound.relation_id))
            .ok_or_else(|| RuntimeError::Simulation("bound relation missing".to_string()))?;
        let field = |key: &str| {
            let raw = relation.remote_app_data.get(key)?;
            serde_json::from_str::<Value>(raw).ok()
        };
        let host = field("host");
        let port = field("port");
        let model = field("model");
        let name = field("name");
        let (Some(Value::String(host)), Some(Value::Number(port))) = (host, port) else {
            return Ok(output);
        };
        let (Some(Value::String(model)), Some(Value::String(name))) = (model, name) else {
            return Ok(output);
        };
        let app = name.split('/').next().unwrap_or_default().to_string();
        let url = format!("http://{host}:{port}/{model}-{app}");
        relation.local_app_data.insert("ingress".to_string(), json!({ "url": url }).to_string());
        Ok(output)
    }
}

/// Ingress requirer double declaring one `ingress` endpoint.
///
/// Publishes its address when the relation is joined.
pub struct IngressRequirer {
    /// Declared metadata.
    metadata: ComponentMetadata,
}

impl Default for IngressRequirer {
    fn default() -> Self {
        Self {
            metadata: ComponentMetadata::new("app").requires("ingress", "ingress"),
        }
    }
}

impl ComponentRuntime for IngressRequirer {
    fn metadata(&self) -> &ComponentMetadata {
        &self.metadata
    }

    fn play(&self, state: &State, event: &Event) -> Result<State, RuntimeError> {
        let mut output = state.clone();
        let Some(bound) = &event.relation else {
            return Ok(output);
        };
        if event.relation_kind() != Some("relation-joined") || !output.leader {
            return Ok(output);
        }
        let relation = output
            .relations
            .iter_mut()
            .find(|relation| relation.relation_id == Some(bound.relation_id));
        if let Some(relation) = relation {
            relation.local_app_data = databag(&[
                ("model", "\"m\""),
                ("name", "\"app\""),
                ("host", "\"10.0.0.1\""),
                ("port", "8080"),
            ]);
        }
        Ok(output)
    }
}
