// crates/interface-tester/src/schema.rs
// ============================================================================
// Module: Databag Schemas
// Description: Structural contracts for relation databags, per interface role.
// Purpose: Load, cache, and apply ProviderSchema / RequirerSchema declarations.
// Dependencies: crate::{loader, model}, jsonschema, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Every interface version directory carries a `schema.json` document that may
//! declare a `ProviderSchema` and a `RequirerSchema`. Each declaration has two
//! optional parts, `unit` and `app`, holding a JSON Schema (Draft 2020-12) for
//! the unit-scoped and app-scoped databags the role writes. A missing part
//! means the role must leave that databag empty.
//!
//! Loading is strict: an unreadable or unparsable document and a declaration
//! of the wrong shape are both hard failures. Only an absent declaration is
//! treated as "nothing to publish".

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use jsonschema::Draft;
use jsonschema::Validator;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::loader;
use crate::loader::DocumentError;
use crate::loader::Symbol;
use crate::model::Databag;
use crate::model::Relation;
use crate::model::Role;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Conventional schema document name inside a version directory.
pub const SCHEMA_FILE: &str = "schema.json";

// ============================================================================
// SECTION: Databag Scope
// ============================================================================

/// Databag scope owned by the component under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabagScope {
    /// Application-scoped databag.
    App,
    /// Unit-scoped databag.
    Unit,
}

impl DatabagScope {
    /// Returns the schema key for the scope.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::App => "app",
            Self::Unit => "unit",
        }
    }

    /// Returns the local databag of the relation for this scope.
    #[must_use]
    pub const fn local_bag(self, relation: &Relation) -> &Databag {
        match self {
            Self::App => &relation.local_app_data,
            Self::Unit => &relation.local_unit_data,
        }
    }
}

impl fmt::Display for DatabagScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while building a databag schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaShapeError {
    /// The declaration is not a mapping.
    #[error("expected a mapping with optional 'unit' and 'app' schemas, found {0}")]
    NotAMapping(&'static str),
    /// The declaration contains keys other than `unit` and `app`.
    #[error("unexpected key '{0}' (only 'unit' and 'app' are allowed)")]
    UnexpectedKey(String),
    /// A part is neither a schema object nor a boolean schema.
    #[error("'{scope}' must be a JSON Schema object, found {kind}")]
    InvalidPart {
        /// Offending scope.
        scope: DatabagScope,
        /// Type found instead.
        kind: &'static str,
    },
    /// A part failed to compile.
    #[error("'{scope}' schema failed to compile: {error}")]
    Compile {
        /// Offending scope.
        scope: DatabagScope,
        /// Compiler error details.
        error: String,
    },
}

/// Errors raised while loading the schemas of an interface version.
#[derive(Debug, Error)]
pub enum SchemaLoadError {
    /// The schema document could not be loaded.
    #[error("could not load schema document: {0}")]
    Load(#[from] DocumentError),
    /// A declaration was found but is not a databag schema.
    #[error("{symbol} in {path} is not a databag schema: {error}")]
    WrongType {
        /// Schema document path.
        path: String,
        /// Offending symbol.
        symbol: &'static str,
        /// Shape error details.
        error: SchemaShapeError,
    },
}

// ============================================================================
// SECTION: Databag Schema
// ============================================================================

/// Compiled JSON Schema for one databag scope.
#[derive(Clone)]
struct CompiledPart {
    /// Source schema document.
    source: Value,
    /// Compiled validator.
    validator: Arc<Validator>,
}

/// Structural contract for the databags written by one role.
#[derive(Clone, Default)]
pub struct DataBagSchema {
    /// Unit-scoped schema; `None` requires the unit databag to be empty.
    unit: Option<CompiledPart>,
    /// App-scoped schema; `None` requires the app databag to be empty.
    app: Option<CompiledPart>,
}

impl fmt::Debug for DataBagSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataBagSchema")
            .field("unit", &self.unit.as_ref().map(|part| &part.source))
            .field("app", &self.app.as_ref().map(|part| &part.source))
            .finish()
    }
}

impl DataBagSchema {
    /// Returns the pseudo-schema asserting both databags are empty.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Compiles a schema from optional unit and app parts.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaShapeError`] when a part is malformed or fails to compile.
    pub fn new(unit: Option<Value>, app: Option<Value>) -> Result<Self, SchemaShapeError> {
        Ok(Self {
            unit: unit.map(|schema| compile_part(DatabagScope::Unit, schema)).transpose()?,
            app: app.map(|schema| compile_part(DatabagScope::App, schema)).transpose()?,
        })
    }

    /// Builds a schema from a declaration of the form `{ "unit"?: .., "app"?: .. }`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaShapeError`] when the declaration has the wrong shape.
    pub fn from_declaration(value: &Value) -> Result<Self, SchemaShapeError> {
        let Some(map) = value.as_object() else {
            return Err(SchemaShapeError::NotAMapping(loader::value_kind(value)));
        };
        if let Some(key) = map.keys().find(|key| !matches!(key.as_str(), "unit" | "app")) {
            return Err(SchemaShapeError::UnexpectedKey(key.clone()));
        }
        Self::new(map.get("unit").cloned(), map.get("app").cloned())
    }

    /// Returns true when neither scope declares a schema.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.unit.is_none() && self.app.is_none()
    }

    /// Returns the source schema for a scope, if declared.
    #[must_use]
    pub fn part(&self, scope: DatabagScope) -> Option<&Value> {
        self.compiled(scope).map(|part| &part.source)
    }

    /// Returns the compiled part for a scope.
    const fn compiled(&self, scope: DatabagScope) -> Option<&CompiledPart> {
        match scope {
            DatabagScope::Unit => self.unit.as_ref(),
            DatabagScope::App => self.app.as_ref(),
        }
    }

    /// Validates one databag against its scope, returning every violation.
    #[must_use]
    pub fn validate_databag(&self, scope: DatabagScope, bag: &Databag) -> Vec<String> {
        match self.compiled(scope) {
            None if bag.is_empty() => Vec::new(),
            None => {
                let keys: Vec<&str> = bag.keys().map(String::as_str).collect();
                vec![format!(
                    "{scope} databag must be empty, found keys: {}",
                    keys.join(", ")
                )]
            }
            Some(part) => {
                let document = decode_databag(bag);
                part.validator
                    .iter_errors(&document)
                    .map(|err| format!("{scope} databag: {err}"))
                    .collect()
            }
        }
    }

    /// Validates both local databags of a relation.
    #[must_use]
    pub fn validate_relation(&self, relation: &Relation) -> Vec<String> {
        let mut errors = self.validate_databag(DatabagScope::Unit, &relation.local_unit_data);
        errors.extend(self.validate_databag(DatabagScope::App, &relation.local_app_data));
        errors
    }
}

/// Compiles one scope of a databag schema.
fn compile_part(scope: DatabagScope, schema: Value) -> Result<CompiledPart, SchemaShapeError> {
    if !matches!(schema, Value::Object(_) | Value::Bool(_)) {
        return Err(SchemaShapeError::InvalidPart {
            scope,
            kind: loader::value_kind(&schema),
        });
    }
    let validator = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .map_err(|err| SchemaShapeError::Compile {
            scope,
            error: err.to_string(),
        })?;
    Ok(CompiledPart {
        source: schema,
        validator: Arc::new(validator),
    })
}

/// Decodes databag values as JSON where possible.
///
/// Relation data is string-typed on the wire; values holding JSON documents
/// are validated as the structure they encode, anything else as a string.
#[must_use]
pub fn decode_databag(bag: &Databag) -> Value {
    let decoded: Map<String, Value> = bag
        .iter()
        .map(|(key, raw)| {
            let value =
                serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.clone()));
            (key.clone(), value)
        })
        .collect();
    Value::Object(decoded)
}

// ============================================================================
// SECTION: Version Schemas
// ============================================================================

/// Schemas declared by one interface version.
#[derive(Debug, Clone)]
pub struct VersionSchemas {
    /// Schema document path.
    pub path: PathBuf,
    /// Provider-side schema, if declared.
    pub provider: Option<DataBagSchema>,
    /// Requirer-side schema, if declared.
    pub requirer: Option<DataBagSchema>,
}

impl VersionSchemas {
    /// Returns the schema declared for a role.
    #[must_use]
    pub const fn for_role(&self, role: Role) -> Option<&DataBagSchema> {
        match role {
            Role::Provider => self.provider.as_ref(),
            Role::Requirer => self.requirer.as_ref(),
        }
    }
}

/// Loads `ProviderSchema` and `RequirerSchema` from a version directory.
///
/// # Errors
///
/// Returns [`SchemaLoadError::Load`] when the document cannot be loaded and
/// [`SchemaLoadError::WrongType`] when a declaration is malformed.
pub fn load_version_schemas(version_dir: &Path) -> Result<VersionSchemas, SchemaLoadError> {
    let path = version_dir.join(SCHEMA_FILE);
    let document = loader::load_document(&path)?;
    let provider = extract_schema(&path, &document, Role::Provider)?;
    let requirer = extract_schema(&path, &document, Role::Requirer)?;
    tracing::debug!(
        path = %path.display(),
        provider = provider.is_some(),
        requirer = requirer.is_some(),
        "loaded interface schemas"
    );
    Ok(VersionSchemas {
        path,
        provider,
        requirer,
    })
}

/// Extracts the schema declared for one role.
fn extract_schema(
    path: &Path,
    document: &Value,
    role: Role,
) -> Result<Option<DataBagSchema>, SchemaLoadError> {
    let symbol = role.schema_symbol();
    match loader::lookup_symbol(path, document, symbol)? {
        Symbol::Absent => Ok(None),
        Symbol::Found(value) => DataBagSchema::from_declaration(value).map(Some).map_err(|error| {
            SchemaLoadError::WrongType {
                path: path.display().to_string(),
                symbol,
                error,
            }
        }),
    }
}

// ============================================================================
// SECTION: Schema Cache
// ============================================================================

/// Lazily-populated cache of version schemas for one pass.
///
/// # Invariants
/// - Only successful loads are cached; failures are re-reported on each lookup.
#[derive(Debug, Default)]
pub struct SchemaCache {
    /// Loaded schemas keyed by version directory.
    entries: BTreeMap<PathBuf, Arc<VersionSchemas>>,
}

impl SchemaCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the schemas for a version directory, loading them on first use.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaLoadError`] when loading fails.
    pub fn get(&mut self, version_dir: &Path) -> Result<Arc<VersionSchemas>, SchemaLoadError> {
        if let Some(existing) = self.entries.get(version_dir) {
            return Ok(Arc::clone(existing));
        }
        let loaded = Arc::new(load_version_schemas(version_dir)?);
        self.entries.insert(version_dir.to_path_buf(), Arc::clone(&loaded));
        Ok(loaded)
    }

    /// Returns the number of cached version directories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when nothing has been cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
