// crates/interface-tester-config/src/config.rs
// ============================================================================
// Module: Interface Tester Configuration
// Description: Configuration loading and validation for the interface tester.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: interface-tester, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The file is resolved from an explicit path, then the
//! `INTERFACE_TESTER_CONFIG` environment variable, then
//! `interface-tester.toml` in the working directory.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use interface_tester::IncludePattern;
use interface_tester::InterfaceName;
use interface_tester::Role;
use interface_tester::State;
use interface_tester::TesterSettings;
use interface_tester::discovery::RESERVED_PREFIX;
use interface_tester::loader;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "interface-tester.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "INTERFACE_TESTER_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum length of a whole path.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum length of the include glob.
const MAX_INCLUDE_LENGTH: usize = 256;
/// Maximum length of an interface name.
const MAX_INTERFACE_NAME_LENGTH: usize = 128;

// ============================================================================
// SECTION: Config Model
// ============================================================================

/// Top-level `interface-tester.toml` model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TesterConfig {
    /// Catalog location and interface selection.
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// Optional run target for harness integrations.
    #[serde(default)]
    pub run: Option<RunConfig>,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Catalog configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogConfig {
    /// Catalog root directory.
    #[serde(default = "default_catalog_root")]
    pub root: PathBuf,
    /// Glob over interface names (`*` and `?`).
    #[serde(default = "default_include")]
    pub include: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            root: default_catalog_root(),
            include: default_include(),
        }
    }
}

/// Default catalog root.
fn default_catalog_root() -> PathBuf {
    PathBuf::from("interfaces")
}

/// Default include glob.
fn default_include() -> String {
    "*".to_string()
}

/// Interface, version, and role a harness runs against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Interface under test.
    pub interface: String,
    /// Interface version under test.
    pub version: u32,
    /// Role implemented by the component under test.
    pub role: Role,
    /// Optional state template document (JSON, RON, or YAML).
    #[serde(default)]
    pub state_template: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Minimum level emitted.
    #[serde(default)]
    pub level: LogLevel,
}

/// Log verbosity levels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Everything, including per-relation details.
    Trace,
    /// Debug output.
    Debug,
    /// Progress and summaries.
    #[default]
    Info,
    /// Warnings only.
    Warn,
    /// Errors only.
    Error,
}

impl LogLevel {
    /// Returns the filter directive for the level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl TesterConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        Self::load_from(&resolved)
    }

    /// Loads configuration, falling back to defaults when nothing was asked for.
    ///
    /// Defaults are used only when no explicit path and no environment
    /// override are given and the default file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an existing or requested file is invalid.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let explicit = path.is_some() || env::var_os(CONFIG_ENV_VAR).is_some();
        if !explicit && !Path::new(DEFAULT_CONFIG_NAME).exists() {
            let mut config = Self::default();
            config.validate()?;
            return Ok(config);
        }
        Self::load(path)
    }

    /// Loads and validates one configuration file.
    fn load_from(path: &Path) -> Result<Self, ConfigError> {
        validate_path(path)?;
        let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.catalog.validate()?;
        if let Some(run) = &mut self.run {
            run.validate()?;
        }
        Ok(())
    }

    /// Returns the compiled include pattern.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the glob does not compile.
    pub fn include_pattern(&self) -> Result<IncludePattern, ConfigError> {
        IncludePattern::new(&self.catalog.include)
            .map_err(|err| ConfigError::Invalid(format!("catalog.include: {err}")))
    }

    /// Converts the `[run]` table into tester settings.
    ///
    /// Returns `None` when no run target is configured. The state template,
    /// when set, is loaded and parsed here.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the state template cannot be loaded.
    pub fn tester_settings(&self) -> Result<Option<TesterSettings>, ConfigError> {
        let Some(run) = &self.run else {
            return Ok(None);
        };
        let mut settings = TesterSettings::new(
            InterfaceName::new(run.interface.as_str()),
            run.version,
            run.role,
            self.catalog.root.clone(),
        );
        if let Some(path) = &run.state_template {
            settings = settings.with_state_template(load_state_template(path)?);
        }
        Ok(Some(settings))
    }
}

impl CatalogConfig {
    /// Validates the catalog table.
    fn validate(&mut self) -> Result<(), ConfigError> {
        validate_path_string("catalog.root", &self.root.to_string_lossy())?;
        let include = self.include.trim();
        if include.is_empty() {
            return Err(ConfigError::Invalid("catalog.include must be non-empty".to_string()));
        }
        if include.len() > MAX_INCLUDE_LENGTH {
            return Err(ConfigError::Invalid("catalog.include exceeds max length".to_string()));
        }
        self.include = include.to_string();
        IncludePattern::new(&self.include)
            .map_err(|err| ConfigError::Invalid(format!("catalog.include: {err}")))?;
        Ok(())
    }
}

impl RunConfig {
    /// Validates the run table.
    fn validate(&mut self) -> Result<(), ConfigError> {
        let interface = self.interface.trim();
        if interface.is_empty() {
            return Err(ConfigError::Invalid("run.interface must be non-empty".to_string()));
        }
        if interface.len() > MAX_INTERFACE_NAME_LENGTH {
            return Err(ConfigError::Invalid("run.interface exceeds max length".to_string()));
        }
        if interface.starts_with(RESERVED_PREFIX) {
            return Err(ConfigError::Invalid(format!(
                "run.interface must not start with '{RESERVED_PREFIX}'"
            )));
        }
        if interface.contains(['/', '\\']) || interface.chars().any(char::is_whitespace) {
            return Err(ConfigError::Invalid(
                "run.interface must be a single directory name".to_string(),
            ));
        }
        self.interface = interface.to_string();
        if let Some(path) = &self.state_template {
            validate_path_string("run.state_template", &path.to_string_lossy())?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI input, environment, or default.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a configured path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Loads a state template document.
fn load_state_template(path: &Path) -> Result<State, ConfigError> {
    let document = loader::load_document(path)
        .map_err(|err| ConfigError::Io(format!("run.state_template: {err}")))?;
    serde_json::from_value(document).map_err(|err| {
        ConfigError::Invalid(format!("run.state_template {} is not a state: {err}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::missing_docs_in_private_items,
        reason = "Test fixtures use explicit asserts and unwraps for clarity."
    )]

    use super::*;

    #[test]
    fn defaults_point_at_the_local_catalog() {
        let mut config = TesterConfig::default();
        config.validate().unwrap();
        assert_eq!(config.catalog.root, PathBuf::from("interfaces"));
        assert_eq!(config.catalog.include, "*");
        assert_eq!(config.logging.level, LogLevel::Info);
        assert!(config.tester_settings().unwrap().is_none());
    }

    #[test]
    fn validate_path_string_rejects_whitespace_only() {
        let err = validate_path_string("catalog.root", "   ").unwrap_err();
        assert!(err.to_string().contains("catalog.root must be non-empty"));
    }

    #[test]
    fn explicit_path_wins_over_environment() {
        let resolved = resolve_path(Some(Path::new("custom.toml"))).unwrap();
        assert_eq!(resolved, PathBuf::from("custom.toml"));
    }

    #[test]
    fn include_is_trimmed() {
        let mut config = TesterConfig::default();
        config.catalog.include = "  ingress* ".to_string();
        config.validate().unwrap();
        assert_eq!(config.catalog.include, "ingress*");
        assert!(config.include_pattern().unwrap().matches("ingress_per_unit"));
    }
}
