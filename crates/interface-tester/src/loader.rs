// crates/interface-tester/src/loader.rs
// ============================================================================
// Module: Document Loader
// Description: Load catalog documents from disk and extract named symbols.
// Purpose: Distinguish load failures, absent symbols, and mistyped symbols.
// Dependencies: ron, serde_json, serde_yaml, thiserror
// ============================================================================

//! ## Overview
//! Catalog files (schemas, test manifests, companion manifests, metadata) are
//! plain documents in JSON, RON, or YAML. Every document is parsed into a
//! [`serde_json::Value`] so downstream validation sees one representation.
//! Symbol lookup is explicit: a document that fails to load is an error, a
//! missing symbol is [`Symbol::Absent`], and type checking of a found symbol is
//! left to the caller.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fs;
use std::path::Path;

use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum size of a single catalog document in bytes.
pub const MAX_DOCUMENT_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: Formats
// ============================================================================

/// Supported catalog document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// JSON documents.
    Json,
    /// RON documents.
    Ron,
    /// YAML documents.
    Yaml,
}

impl DocumentFormat {
    /// Returns the lowercase label for the format.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Ron => "ron",
            Self::Yaml => "yaml",
        }
    }

    /// Parses a format from a file extension.
    #[must_use]
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "ron" => Some(Self::Ron),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.label())
    }
}

/// Detects the document format from a file path.
#[must_use]
pub fn detect_format(path: &Path) -> Option<DocumentFormat> {
    path.extension()
        .and_then(|extension| extension.to_str())
        .and_then(DocumentFormat::from_extension)
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while loading a catalog document.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The document could not be read.
    #[error("failed to read {path}: {error}")]
    Io {
        /// Document path.
        path: String,
        /// I/O error details.
        error: String,
    },
    /// The document exceeds the size limit.
    #[error("{path} exceeds {limit} bytes ({size} bytes)")]
    TooLarge {
        /// Document path.
        path: String,
        /// Actual size in bytes.
        size: usize,
        /// Size limit in bytes.
        limit: usize,
    },
    /// The document extension is not a supported format.
    #[error("unsupported document format: {path}")]
    UnsupportedFormat {
        /// Document path.
        path: String,
    },
    /// The document is not valid UTF-8.
    #[error("{path} must be utf-8")]
    Encoding {
        /// Document path.
        path: String,
    },
    /// The document failed to parse.
    #[error("failed to parse {format} document {path}: {error}")]
    Parse {
        /// Document path.
        path: String,
        /// Document format.
        format: DocumentFormat,
        /// Parser error details.
        error: String,
    },
    /// The document root is not a mapping.
    #[error("{path} must contain a mapping at the top level")]
    NotAMapping {
        /// Document path.
        path: String,
    },
}

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Loads a document, detecting its format from the file extension.
///
/// # Errors
///
/// Returns [`DocumentError`] when the file cannot be read, is too large, is not
/// UTF-8, or fails to parse.
pub fn load_document(path: &Path) -> Result<Value, DocumentError> {
    let format = detect_format(path).ok_or_else(|| DocumentError::UnsupportedFormat {
        path: path.display().to_string(),
    })?;
    let bytes = fs::read(path).map_err(|err| DocumentError::Io {
        path: path.display().to_string(),
        error: err.to_string(),
    })?;
    if bytes.len() > MAX_DOCUMENT_BYTES {
        return Err(DocumentError::TooLarge {
            path: path.display().to_string(),
            size: bytes.len(),
            limit: MAX_DOCUMENT_BYTES,
        });
    }
    let content = std::str::from_utf8(&bytes).map_err(|_| DocumentError::Encoding {
        path: path.display().to_string(),
    })?;
    parse_document(content, format).map_err(|error| DocumentError::Parse {
        path: path.display().to_string(),
        format,
        error,
    })
}

/// Parses document text in the given format.
///
/// # Errors
///
/// Returns the parser error message when the input is malformed.
pub fn parse_document(input: &str, format: DocumentFormat) -> Result<Value, String> {
    match format {
        DocumentFormat::Json => serde_json::from_str(input).map_err(|err| err.to_string()),
        DocumentFormat::Ron => ron::from_str(input).map_err(|err| err.to_string()),
        DocumentFormat::Yaml => serde_yaml::from_str(input).map_err(|err| err.to_string()),
    }
}

// ============================================================================
// SECTION: Symbols
// ============================================================================

/// Result of looking up a top-level symbol in a document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Symbol<'a> {
    /// The document does not declare the symbol.
    Absent,
    /// The symbol value as declared.
    Found(&'a Value),
}

/// Looks up a top-level symbol in a loaded document.
///
/// # Errors
///
/// Returns [`DocumentError::NotAMapping`] when the document root is not a map.
pub fn lookup_symbol<'a>(
    path: &Path,
    document: &'a Value,
    name: &str,
) -> Result<Symbol<'a>, DocumentError> {
    let Some(map) = document.as_object() else {
        return Err(DocumentError::NotAMapping {
            path: path.display().to_string(),
        });
    };
    Ok(map.get(name).map_or(Symbol::Absent, Symbol::Found))
}

/// Returns a short type label for a JSON value.
#[must_use]
pub const fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
