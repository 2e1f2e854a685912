// crates/interface-tester/src/discovery.rs
// ============================================================================
// Module: Test Case Discovery
// Description: Walk an interface catalog and register its test manifests.
// Purpose: Derive interface identity from paths and populate a registry.
// Dependencies: crate::{manifest, model, registry}, regex, tracing
// ============================================================================

//! ## Overview
//! The catalog layout is `<root>/<interface>/v<N>/interface_tests/<file>`.
//! Discovery walks it in sorted order, so two passes over the same tree
//! register the same cases in the same order.
//!
//! Failure handling is per file: a manifest that fails to load, or whose
//! identity cannot be derived from its location, is logged, recorded in the
//! [`DiscoveryReport`], and skipped. A version without any test is a warning.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fs;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use regex::Regex;
use thiserror::Error;

use crate::manifest;
use crate::model::InterfaceName;
use crate::registry::Registration;
use crate::registry::TestCaseRegistry;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Conventional test directory inside a version directory.
pub const TESTS_DIR: &str = "interface_tests";

/// Reserved template directory name.
pub const TEMPLATE_DIR: &str = "__template__";

/// Catalog directory name used to anchor path identity.
pub const CATALOG_DIR: &str = "interfaces";

/// Prefix of directories reserved for tooling.
pub const RESERVED_PREFIX: &str = "__";

// ============================================================================
// SECTION: Path Identity
// ============================================================================

/// Interface identity derived from a catalog path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathIdentity {
    /// The path contains exactly one `<interface>/v<N>` pair.
    Identified {
        /// Interface name.
        interface: InterfaceName,
        /// Interface version.
        version: u32,
    },
    /// No `<interface>/v<N>` pair was found.
    Missing,
    /// More than one `<interface>/v<N>` pair was found.
    Ambiguous,
    /// A version segment does not hold a valid version number.
    BadVersion(String),
}

impl fmt::Display for PathIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identified {
                interface,
                version,
            } => write!(f, "{interface}/v{version}"),
            Self::Missing => f.write_str("no <interface>/v<N> segment in path"),
            Self::Ambiguous => f.write_str("more than one <interface>/v<N> segment in path"),
            Self::BadVersion(segment) => write!(f, "invalid version segment '{segment}'"),
        }
    }
}

/// Parses a version directory name of the form `v<N>`.
#[must_use]
pub fn parse_version_dir(name: &str) -> Option<Result<u32, String>> {
    let digits = name.strip_prefix('v')?;
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    Some(digits.parse::<u32>().map_err(|_| name.to_string()))
}

/// Derives the interface name and version from a catalog path.
///
/// When the path contains an `interfaces` directory, only the segments after
/// the last one are considered; otherwise the whole path is.
#[must_use]
pub fn parse_interface_path(path: &Path) -> PathIdentity {
    let mut segments = Vec::new();
    for component in path.components() {
        if let Component::Normal(segment) = component {
            let Some(segment) = segment.to_str() else {
                return PathIdentity::Missing;
            };
            segments.push(segment);
        }
    }
    let start = segments.iter().rposition(|segment| *segment == CATALOG_DIR).map_or(0, |i| i + 1);
    let scoped = &segments[start..];

    let mut found = None;
    for pair in scoped.windows(2) {
        let [name, version] = pair else {
            continue;
        };
        if parse_version_dir(name).is_some() {
            continue;
        }
        let Some(parsed) = parse_version_dir(version) else {
            continue;
        };
        if found.is_some() {
            return PathIdentity::Ambiguous;
        }
        found = Some((*name, parsed));
    }
    match found {
        None => PathIdentity::Missing,
        Some((_, Err(segment))) => PathIdentity::BadVersion(segment),
        Some((name, Ok(version))) => PathIdentity::Identified {
            interface: InterfaceName::from(name),
            version,
        },
    }
}

// ============================================================================
// SECTION: Include Pattern
// ============================================================================

/// Errors raised before discovery starts.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The include glob could not be compiled.
    #[error("invalid include pattern '{pattern}': {error}")]
    Pattern {
        /// Offending pattern.
        pattern: String,
        /// Compiler error details.
        error: String,
    },
    /// The catalog root could not be read.
    #[error("failed to read catalog root {path}: {error}")]
    Root {
        /// Catalog root path.
        path: String,
        /// I/O error details.
        error: String,
    },
}

/// Glob over interface names supporting `*` and `?`.
#[derive(Debug, Clone)]
pub struct IncludePattern {
    /// Original glob.
    glob: String,
    /// Compiled matcher.
    matcher: Matcher,
}

/// How an [`IncludePattern`] tests names.
#[derive(Debug, Clone)]
enum Matcher {
    /// Matches every name.
    All,
    /// Anchored regular expression compiled from a glob.
    Glob(Regex),
    /// Matches one name literally.
    Exact,
}

impl IncludePattern {
    /// Compiles a glob into an include pattern.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Pattern`] when the glob is empty or fails to compile.
    pub fn new(glob: &str) -> Result<Self, DiscoveryError> {
        if glob == "*" {
            return Ok(Self::all());
        }
        if glob.trim().is_empty() {
            return Err(DiscoveryError::Pattern {
                pattern: glob.to_string(),
                error: "pattern must be non-empty".to_string(),
            });
        }
        let mut expression = String::from("^");
        for ch in glob.chars() {
            match ch {
                '*' => expression.push_str(".*"),
                '?' => expression.push('.'),
                other => expression.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
            }
        }
        expression.push('$');
        let regex = Regex::new(&expression).map_err(|err| DiscoveryError::Pattern {
            pattern: glob.to_string(),
            error: err.to_string(),
        })?;
        Ok(Self {
            glob: glob.to_string(),
            matcher: Matcher::Glob(regex),
        })
    }

    /// Returns a pattern matching every interface.
    #[must_use]
    pub fn all() -> Self {
        Self {
            glob: "*".to_string(),
            matcher: Matcher::All,
        }
    }

    /// Returns a pattern matching exactly one interface name.
    ///
    /// `*` and `?` in the name are ordinary characters.
    #[must_use]
    pub fn exact(name: &str) -> Self {
        Self {
            glob: name.to_string(),
            matcher: Matcher::Exact,
        }
    }

    /// Returns true when the interface name matches.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        match &self.matcher {
            Matcher::All => true,
            Matcher::Glob(regex) => regex.is_match(name),
            Matcher::Exact => self.glob == name,
        }
    }

    /// Returns the original glob.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.glob
    }
}

impl Default for IncludePattern {
    fn default() -> Self {
        Self::all()
    }
}

// ============================================================================
// SECTION: Discovery Report
// ============================================================================

/// Version directory visited during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionDir {
    /// Interface name.
    pub interface: InterfaceName,
    /// Interface version.
    pub version: u32,
    /// Version directory path.
    pub dir: PathBuf,
    /// Number of cases registered from this version.
    pub tests: usize,
}

/// File or directory skipped during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryFailure {
    /// Offending path.
    pub path: PathBuf,
    /// Failure details.
    pub reason: String,
}

/// Summary of one discovery pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// Visited version directories in walk order.
    pub versions: Vec<VersionDir>,
    /// Number of newly registered cases.
    pub registered: usize,
    /// Number of registrations that were already present.
    pub already_registered: usize,
    /// Skipped files and directories.
    pub failures: Vec<DiscoveryFailure>,
}

impl DiscoveryReport {
    /// Records a failure and logs it.
    fn fail(&mut self, path: &Path, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::error!(path = %path.display(), %reason, "skipping catalog entry");
        self.failures.push(DiscoveryFailure {
            path: path.to_path_buf(),
            reason,
        });
    }
}

// ============================================================================
// SECTION: Discovery
// ============================================================================

/// Walks the catalog under `root` and registers every test manifest found.
///
/// # Errors
///
/// Returns [`DiscoveryError::Root`] when the catalog root cannot be listed.
/// Failures below the root are recorded in the report instead.
pub fn discover(
    root: &Path,
    include: &IncludePattern,
    registry: &mut TestCaseRegistry,
) -> Result<DiscoveryReport, DiscoveryError> {
    let interfaces = sorted_entries(root).map_err(|err| DiscoveryError::Root {
        path: root.display().to_string(),
        error: err.to_string(),
    })?;
    let mut report = DiscoveryReport::default();
    for interface_dir in interfaces {
        let Some(name) = dir_name(&interface_dir) else {
            continue;
        };
        if is_reserved(name) || !include.matches(name) {
            continue;
        }
        discover_interface(root, &interface_dir, &InterfaceName::from(name), registry, &mut report);
    }
    tracing::info!(
        root = %root.display(),
        include = include.as_str(),
        versions = report.versions.len(),
        registered = report.registered,
        failures = report.failures.len(),
        "discovery complete"
    );
    Ok(report)
}

/// Walks the version directories of one interface.
fn discover_interface(
    root: &Path,
    interface_dir: &Path,
    interface: &InterfaceName,
    registry: &mut TestCaseRegistry,
    report: &mut DiscoveryReport,
) {
    let versions = match sorted_entries(interface_dir) {
        Ok(versions) => versions,
        Err(err) => {
            report.fail(interface_dir, format!("failed to list interface directory: {err}"));
            return;
        }
    };
    for version_dir in versions {
        let Some(name) = dir_name(&version_dir) else {
            continue;
        };
        if is_reserved(name) {
            continue;
        }
        match parse_version_dir(name) {
            Some(Ok(version)) => {
                let tests = discover_version(root, &version_dir, registry, report);
                if tests == 0 {
                    tracing::warn!(
                        interface = %interface,
                        version,
                        "no interface tests found for version"
                    );
                }
                report.versions.push(VersionDir {
                    interface: interface.clone(),
                    version,
                    dir: version_dir,
                    tests,
                });
            }
            Some(Err(_)) | None => {
                let reason = format!("'{name}' is not a v<integer> version directory");
                report.fail(&version_dir, reason);
            }
        }
    }
}

/// Loads every manifest of one version directory, returning the case count.
fn discover_version(
    root: &Path,
    version_dir: &Path,
    registry: &mut TestCaseRegistry,
    report: &mut DiscoveryReport,
) -> usize {
    let tests_dir = version_dir.join(TESTS_DIR);
    if !tests_dir.is_dir() {
        return 0;
    }
    let files = match sorted_files(&tests_dir) {
        Ok(files) => files,
        Err(err) => {
            report.fail(&tests_dir, format!("failed to list test directory: {err}"));
            return 0;
        }
    };
    let mut count = 0;
    for file in files.iter().filter(|file| manifest::is_manifest_file(file)) {
        let relative = file.strip_prefix(root).unwrap_or(file);
        let (interface, version) = match parse_interface_path(relative) {
            PathIdentity::Identified {
                interface,
                version,
            } => (interface, version),
            other => {
                report.fail(file, format!("cannot derive interface identity: {other}"));
                continue;
            }
        };
        let cases = match manifest::load_test_manifest(file, &interface, version) {
            Ok(cases) => cases,
            Err(err) => {
                report.fail(file, err.to_string());
                continue;
            }
        };
        tracing::debug!(path = %file.display(), cases = cases.len(), "loaded test manifest");
        for case in cases {
            count += 1;
            match registry.register(case) {
                Registration::Added => report.registered += 1,
                Registration::AlreadyRegistered => report.already_registered += 1,
            }
        }
    }
    count
}

/// Returns true for template, tooling, and hidden directories.
fn is_reserved(name: &str) -> bool {
    name == TEMPLATE_DIR || name.starts_with(RESERVED_PREFIX) || name.starts_with('.')
}

/// Returns the UTF-8 final component of a path.
fn dir_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|name| name.to_str())
}

/// Lists subdirectories in name order.
fn sorted_entries(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            entries.push(entry.path());
        }
    }
    entries.sort();
    Ok(entries)
}

/// Lists regular files in name order.
fn sorted_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            entries.push(entry.path());
        }
    }
    entries.sort();
    Ok(entries)
}
