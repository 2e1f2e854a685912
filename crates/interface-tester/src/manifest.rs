// crates/interface-tester/src/manifest.rs
// ============================================================================
// Module: Test Manifests
// Description: Declarative test-definition files inside interface_tests/.
// Purpose: Turn one manifest file into the test cases it declares.
// Dependencies: crate::{event, loader, model, schema, testcase, validator}, serde
// ============================================================================

//! ## Overview
//! Each file in a version's `interface_tests/` directory is a manifest listing
//! test cases. Discovery calls [`load_test_manifest`] for every file and
//! registers what it returns; the interface name and version come from the
//! file location, never from the file itself.
//!
//! ```json
//! { "tests": [ { "name": "...", "role": "provider", "event": "relation-changed",
//!                "state": { ... }, "schema": "empty", "expect": [ ... ] } ] }
//! ```

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::event::EventSpec;
use crate::loader;
use crate::loader::DocumentError;
use crate::model::InterfaceName;
use crate::model::Role;
use crate::model::State;
use crate::schema::DataBagSchema;
use crate::schema::SchemaShapeError;
use crate::testcase::InterfaceTestCase;
use crate::testcase::SchemaMode;
use crate::validator::Expectation;
use crate::validator::ExpectationValidator;

// ============================================================================
// SECTION: Manifest Documents
// ============================================================================

/// Top-level manifest document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestManifest {
    /// Declared test cases.
    pub tests: Vec<TestCaseSpec>,
}

/// One declared test case.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestCaseSpec {
    /// Test name, unique within the manifest.
    pub name: String,
    /// Role under test.
    pub role: Role,
    /// Triggering event.
    pub event: EventSpec,
    /// Initial state the test requires.
    #[serde(default)]
    pub state: Option<State>,
    /// Schema validation mode.
    #[serde(default)]
    pub schema: SchemaSpec,
    /// Declarative checks on the resulting state.
    #[serde(default)]
    pub expect: Vec<Expectation>,
}

/// Declared schema validation mode.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaSpec {
    /// Interface schema for the role.
    #[default]
    Default,
    /// No schema validation.
    Skip,
    /// Both local databags must be empty.
    Empty,
    /// Test-specific schema.
    Custom(CustomSchemaSpec),
}

/// Test-specific databag schema declaration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomSchemaSpec {
    /// Unit-scoped JSON Schema.
    #[serde(default)]
    pub unit: Option<Value>,
    /// App-scoped JSON Schema.
    #[serde(default)]
    pub app: Option<Value>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while loading a manifest file.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest could not be loaded.
    #[error(transparent)]
    Document(#[from] DocumentError),
    /// The manifest does not match the expected structure.
    #[error("invalid test manifest {path}: {error}")]
    Invalid {
        /// Manifest path.
        path: String,
        /// Validation details.
        error: String,
    },
    /// A custom schema in the manifest is malformed.
    #[error("test '{test}' in {path} declares an invalid schema: {error}")]
    Schema {
        /// Manifest path.
        path: String,
        /// Test name.
        test: String,
        /// Shape error details.
        error: SchemaShapeError,
    },
}

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Returns true when the file should be treated as a test manifest.
#[must_use]
pub fn is_manifest_file(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_none_or(|name| name.starts_with("__") || name.starts_with('.'));
    !hidden && loader::detect_format(path).is_some()
}

/// Loads a manifest and builds the test cases it declares.
///
/// # Errors
///
/// Returns [`ManifestError`] when the file cannot be loaded or is invalid.
pub fn load_test_manifest(
    path: &Path,
    interface: &InterfaceName,
    version: u32,
) -> Result<Vec<InterfaceTestCase>, ManifestError> {
    let document = loader::load_document(path)?;
    let manifest: TestManifest =
        serde_json::from_value(document).map_err(|err| ManifestError::Invalid {
            path: path.display().to_string(),
            error: err.to_string(),
        })?;
    validate_manifest(path, &manifest)?;
    manifest.tests.into_iter().map(|spec| build_case(path, interface, version, spec)).collect()
}

/// Checks manifest-level constraints serde cannot express.
fn validate_manifest(path: &Path, manifest: &TestManifest) -> Result<(), ManifestError> {
    let mut names = BTreeSet::new();
    for spec in &manifest.tests {
        if spec.name.trim().is_empty() {
            return Err(invalid(path, "test name must be non-empty".to_string()));
        }
        if spec.event.name().trim().is_empty() {
            return Err(invalid(path, format!("test '{}' has an empty event name", spec.name)));
        }
        if !names.insert(spec.name.as_str()) {
            return Err(invalid(path, format!("duplicate test name '{}'", spec.name)));
        }
    }
    Ok(())
}

/// Converts one declared test into a test case.
fn build_case(
    path: &Path,
    interface: &InterfaceName,
    version: u32,
    spec: TestCaseSpec,
) -> Result<InterfaceTestCase, ManifestError> {
    let schema = match spec.schema {
        SchemaSpec::Default => SchemaMode::Default,
        SchemaSpec::Skip => SchemaMode::Skip,
        SchemaSpec::Empty => SchemaMode::Empty,
        SchemaSpec::Custom(custom) => {
            let compiled = DataBagSchema::new(custom.unit, custom.app).map_err(|error| {
                ManifestError::Schema {
                    path: path.display().to_string(),
                    test: spec.name.clone(),
                    error,
                }
            })?;
            SchemaMode::Custom(compiled)
        }
    };
    let mut case =
        InterfaceTestCase::new(interface.clone(), version, spec.role, spec.name, spec.event)
            .with_schema(schema)
            .with_source(path);
    if let Some(state) = spec.state {
        case = case.with_state(state);
    }
    if !spec.expect.is_empty() {
        case = case.with_validator(ExpectationValidator::new(spec.expect));
    }
    Ok(case)
}

/// Builds an [`ManifestError::Invalid`] for a manifest path.
fn invalid(path: &Path, error: String) -> ManifestError {
    ManifestError::Invalid {
        path: path.display().to_string(),
        error,
    }
}
