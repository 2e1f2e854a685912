// crates/interface-tester/src/report.rs
// ============================================================================
// Module: Catalog Report
// Description: Summarize discovered tests, schemas, and components per role.
// Purpose: Give catalog maintainers a readable view of what the tester sees.
// Dependencies: crate::{discovery, loader, registry, schema}, serde
// ============================================================================

//! ## Overview
//! [`collect`] runs discovery into a fresh registry and gathers, for each
//! interface, version, and role: the registered tests, whether a schema was
//! found, and the components listed in the optional `charms.yaml` companion
//! manifest. [`render`] prints the result as indented plain text. Collection
//! never fails on a broken catalog entry; broken entries are reported as
//! issues instead.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::discovery;
use crate::discovery::DiscoveryError;
use crate::discovery::DiscoveryFailure;
use crate::discovery::IncludePattern;
use crate::loader;
use crate::loader::DocumentError;
use crate::model::InterfaceName;
use crate::model::Role;
use crate::registry::TestCaseRegistry;
use crate::schema;
use crate::schema::VersionSchemas;

// ============================================================================
// SECTION: Companion Manifest
// ============================================================================

/// Conventional companion manifest name inside a version directory.
pub const COMPONENTS_FILE: &str = "charms.yaml";

/// Components known to implement each role of an interface version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentManifest {
    /// Components implementing the provider side.
    #[serde(default)]
    pub providers: Vec<ComponentRef>,
    /// Components implementing the requirer side.
    #[serde(default)]
    pub requirers: Vec<ComponentRef>,
}

impl ComponentManifest {
    /// Returns the components listed for a role.
    #[must_use]
    pub fn for_role(&self, role: Role) -> &[ComponentRef] {
        match role {
            Role::Provider => &self.providers,
            Role::Requirer => &self.requirers,
        }
    }
}

/// Reference to a component repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentRef {
    /// Component name.
    pub name: String,
    /// Repository URL.
    pub url: String,
    /// Branch to test; the repository default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Where the component configures its interface tester.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_setup: Option<TestSetup>,
}

/// Location of a component's tester configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestSetup {
    /// File inside the component repository.
    pub location: String,
    /// Name of the tester setup within that file.
    pub identifier: String,
}

/// Errors raised while loading a companion manifest.
#[derive(Debug, Error)]
pub enum ComponentManifestError {
    /// The manifest could not be loaded.
    #[error(transparent)]
    Document(#[from] DocumentError),
    /// The manifest has the wrong shape.
    #[error("invalid component manifest {path}: {error}")]
    Invalid {
        /// Manifest path.
        path: String,
        /// Deserialization details.
        error: String,
    },
}

/// Loads the companion manifest of a version directory, if present.
///
/// # Errors
///
/// Returns [`ComponentManifestError`] when the file exists but is invalid.
pub fn load_component_manifest(
    version_dir: &Path,
) -> Result<Option<ComponentManifest>, ComponentManifestError> {
    let path = version_dir.join(COMPONENTS_FILE);
    if !path.is_file() {
        return Ok(None);
    }
    let document = loader::load_document(&path)?;
    serde_json::from_value(document).map(Some).map_err(|err| ComponentManifestError::Invalid {
        path: path.display().to_string(),
        error: err.to_string(),
    })
}

// ============================================================================
// SECTION: Report Model
// ============================================================================

/// Schema availability for one role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaStatus {
    /// A schema is declared for the role.
    Found,
    /// No schema is declared; the role must leave its databags empty.
    Absent,
    /// The schema document failed to load.
    Error(String),
}

/// Summary of one registered test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestSummary {
    /// Test name.
    pub name: String,
    /// Declared event.
    pub event: String,
    /// Whether the test declares its own initial state.
    pub has_state: bool,
    /// Schema mode label.
    pub schema_mode: &'static str,
}

/// Summary of one role of an interface version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleReport {
    /// Role.
    pub role: Role,
    /// Registered tests in registration order.
    pub tests: Vec<TestSummary>,
    /// Schema availability.
    pub schema: SchemaStatus,
    /// Components implementing the role.
    pub components: Vec<ComponentRef>,
}

/// Summary of one interface version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionReport {
    /// Version number.
    pub version: u32,
    /// Version directory.
    pub dir: PathBuf,
    /// Per-role summaries.
    pub roles: Vec<RoleReport>,
    /// Companion manifest error, if the manifest is invalid.
    pub components_error: Option<String>,
}

/// Summary of one interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceReport {
    /// Interface name.
    pub name: InterfaceName,
    /// Versions in ascending order.
    pub versions: Vec<VersionReport>,
}

/// Summary of a whole catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogReport {
    /// Catalog root.
    pub root: PathBuf,
    /// Interfaces in name order.
    pub interfaces: Vec<InterfaceReport>,
    /// Entries skipped during discovery.
    pub failures: Vec<DiscoveryFailure>,
}

impl CatalogReport {
    /// Returns every problem found in the catalog, one line each.
    #[must_use]
    pub fn issues(&self) -> Vec<String> {
        let mut issues: Vec<String> = self
            .failures
            .iter()
            .map(|failure| format!("{}: {}", failure.path.display(), failure.reason))
            .collect();
        for interface in &self.interfaces {
            for version in &interface.versions {
                if let Some(error) = &version.components_error {
                    issues.push(format!("{}/v{}: {error}", interface.name, version.version));
                }
                // Both roles share one schema document; report its failure once.
                let schema_error = version.roles.iter().find_map(|role| match &role.schema {
                    SchemaStatus::Error(error) => Some(error),
                    _ => None,
                });
                if let Some(error) = schema_error {
                    issues.push(format!("{}/v{}: {error}", interface.name, version.version));
                }
            }
        }
        issues
    }

    /// Returns the total number of registered tests.
    #[must_use]
    pub fn test_count(&self) -> usize {
        self.interfaces
            .iter()
            .flat_map(|interface| &interface.versions)
            .flat_map(|version| &version.roles)
            .map(|role| role.tests.len())
            .sum()
    }
}

// ============================================================================
// SECTION: Collection
// ============================================================================

/// Collects a report for every interface under `root` matching `include`.
///
/// # Errors
///
/// Returns [`DiscoveryError`] when the catalog root cannot be read.
pub fn collect(root: &Path, include: &IncludePattern) -> Result<CatalogReport, DiscoveryError> {
    let mut registry = TestCaseRegistry::new();
    let discovered = discovery::discover(root, include, &mut registry)?;

    let mut interfaces: Vec<InterfaceReport> = Vec::new();
    for version_dir in discovered.versions {
        let schemas = schema::load_version_schemas(&version_dir.dir);
        let (components, components_error) = match load_component_manifest(&version_dir.dir) {
            Ok(manifest) => (manifest.unwrap_or_default(), None),
            Err(err) => (ComponentManifest::default(), Some(err.to_string())),
        };
        let roles = Role::ALL
            .iter()
            .map(|role| RoleReport {
                role: *role,
                tests: registry
                    .get(&version_dir.interface, version_dir.version, *role)
                    .iter()
                    .map(|case| TestSummary {
                        name: case.name.clone(),
                        event: case.event.to_string(),
                        has_state: case.has_input_state(),
                        schema_mode: case.schema.label(),
                    })
                    .collect(),
                schema: schema_status(schemas.as_ref(), *role),
                components: components.for_role(*role).to_vec(),
            })
            .collect();
        let version = VersionReport {
            version: version_dir.version,
            dir: version_dir.dir,
            roles,
            components_error,
        };
        match interfaces.last_mut() {
            Some(last) if last.name == version_dir.interface => last.versions.push(version),
            _ => interfaces.push(InterfaceReport {
                name: version_dir.interface,
                versions: vec![version],
            }),
        }
    }
    for interface in &mut interfaces {
        interface.versions.sort_by_key(|version| version.version);
    }
    Ok(CatalogReport {
        root: root.to_path_buf(),
        interfaces,
        failures: discovered.failures,
    })
}

/// Maps a schema load result to the status of one role.
fn schema_status(
    schemas: Result<&VersionSchemas, &schema::SchemaLoadError>,
    role: Role,
) -> SchemaStatus {
    match schemas {
        Ok(schemas) if schemas.for_role(role).is_some() => SchemaStatus::Found,
        Ok(_) => SchemaStatus::Absent,
        Err(err) => SchemaStatus::Error(err.to_string()),
    }
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Writes a catalog report as indented plain text.
///
/// # Errors
///
/// Returns [`io::Error`] when writing fails.
pub fn render(report: &CatalogReport, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "interfaces in {}:", report.root.display())?;
    if report.interfaces.is_empty() {
        writeln!(out, "  (none)")?;
    }
    for interface in &report.interfaces {
        writeln!(out, "{}:", interface.name)?;
        for version in &interface.versions {
            writeln!(out, "  v{}:", version.version)?;
            for role in &version.roles {
                render_role(role, out)?;
            }
            if let Some(error) = &version.components_error {
                writeln!(out, "    components manifest: error: {error}")?;
            }
        }
    }
    if !report.failures.is_empty() {
        writeln!(out, "skipped:")?;
        for failure in &report.failures {
            writeln!(out, "  - {}: {}", failure.path.display(), failure.reason)?;
        }
    }
    Ok(())
}

/// Writes the section of one role.
fn render_role(role: &RoleReport, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "    {}:", role.role)?;
    if role.tests.is_empty() {
        writeln!(out, "      tests: none")?;
    } else {
        writeln!(out, "      tests:")?;
        for test in &role.tests {
            writeln!(
                out,
                "        - {} (event: {}, state: {}, schema: {})",
                test.name,
                test.event,
                if test.has_state { "yes" } else { "no" },
                test.schema_mode
            )?;
        }
    }
    match &role.schema {
        SchemaStatus::Found => writeln!(out, "      schema: found")?,
        SchemaStatus::Absent => writeln!(out, "      schema: absent (databags must stay empty)")?,
        SchemaStatus::Error(error) => writeln!(out, "      schema: error: {error}")?,
    }
    if role.components.is_empty() {
        writeln!(out, "      components: none")?;
    } else {
        writeln!(out, "      components:")?;
        for component in &role.components {
            match &component.branch {
                Some(branch) => {
                    writeln!(out, "        - {} ({}@{branch})", component.name, component.url)?;
                }
                None => writeln!(out, "        - {} ({})", component.name, component.url)?,
            }
        }
    }
    Ok(())
}
