// release-gate-core/src/core/io.rs
// ============================================================================
// Module: Release Gate Canonical I/O
// Description: Atomic JSON writers, NDJSON appenders, and document readers.
// Purpose: Keep every durable artifact byte-stable and ordering-stable.
// Dependencies: serde, serde_json, serde_yaml
// ============================================================================

//! ## Overview
//! All outputs are UTF-8 JSON with two-space indentation and a trailing
//! newline; NDJSON files hold one compact object per line. JSON documents are
//! written through a temp-file-and-rename sequence so a crashed run never
//! leaves a torn artifact. History appends go straight to the open file:
//! append-only is the contract, not atomic replacement.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by canonical readers and writers.
#[derive(Debug, Error)]
pub enum IoError {
    /// Filesystem operation failed.
    #[error("io failure on {path}: {source}")]
    Io {
        /// Path involved in the failed operation.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// Serialization to JSON failed.
    #[error("failed to serialize {path}: {source}")]
    Serialize {
        /// Path the payload was destined for.
        path: String,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
    /// A document failed to parse.
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// Path of the malformed document.
        path: String,
        /// Short parse failure description.
        message: String,
    },
    /// A document parsed but was not a JSON object.
    #[error("{path} must be a JSON object")]
    NotAnObject {
        /// Path of the offending document.
        path: String,
    },
}

impl IoError {
    /// Wraps an IO error with the path it occurred on.
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

// ============================================================================
// SECTION: Writers
// ============================================================================

/// Writes a payload as indented JSON with a trailing newline, atomically.
///
/// Parent directories are created on demand. The payload lands in a sibling
/// temp file first and is renamed over the destination.
///
/// # Errors
///
/// Returns [`IoError`] when serialization or any filesystem step fails.
pub fn write_json_pretty<T: Serialize>(path: &Path, payload: &T) -> Result<(), IoError> {
    let mut bytes = serde_json::to_vec_pretty(payload).map_err(|source| IoError::Serialize {
        path: path.display().to_string(),
        source,
    })?;
    bytes.push(b'\n');

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| IoError::io(parent, source))?;
    }
    let tmp_path = temp_sibling(path);
    fs::write(&tmp_path, &bytes).map_err(|source| IoError::io(&tmp_path, source))?;
    fs::rename(&tmp_path, path).map_err(|source| IoError::io(path, source))?;
    Ok(())
}

/// Appends one compact JSON object to an NDJSON file.
///
/// # Errors
///
/// Returns [`IoError`] when serialization or the append fails.
pub fn append_ndjson<T: Serialize>(path: &Path, payload: &T) -> Result<(), IoError> {
    let mut line = serde_json::to_vec(payload).map_err(|source| IoError::Serialize {
        path: path.display().to_string(),
        source,
    })?;
    line.push(b'\n');

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| IoError::io(parent, source))?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| IoError::io(path, source))?;
    file.write_all(&line).map_err(|source| IoError::io(path, source))?;
    Ok(())
}

/// Derives the sibling temp path used by [`write_json_pretty`].
fn temp_sibling(path: &Path) -> std::path::PathBuf {
    let mut name = path.file_name().map_or_else(
        || std::ffi::OsString::from("artifact"),
        std::borrow::ToOwned::to_owned,
    );
    name.push(".tmp");
    path.with_file_name(name)
}

// ============================================================================
// SECTION: Readers
// ============================================================================

/// Reads a JSON document that must be an object.
///
/// # Errors
///
/// Returns [`IoError`] when the file is unreadable, malformed, or not an
/// object.
pub fn read_json_object(path: &Path) -> Result<Value, IoError> {
    let text = fs::read_to_string(path).map_err(|source| IoError::io(path, source))?;
    let value: Value = serde_json::from_str(&text).map_err(|err| IoError::Parse {
        path: path.display().to_string(),
        message: err.to_string(),
    })?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(IoError::NotAnObject {
            path: path.display().to_string(),
        })
    }
}

/// Reads a JSON-compatible document, accepting `.yaml`/`.yml` extensions.
///
/// Profiles and registries are stored as JSON-compatible YAML; everything
/// else is plain JSON. The result must be an object either way.
///
/// # Errors
///
/// Returns [`IoError`] when the file is unreadable, malformed, or not an
/// object.
pub fn read_json_compat(path: &Path) -> Result<Value, IoError> {
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
    if !is_yaml {
        return read_json_object(path);
    }

    let text = fs::read_to_string(path).map_err(|source| IoError::io(path, source))?;
    let value: Value = serde_yaml::from_str(&text).map_err(|err| IoError::Parse {
        path: path.display().to_string(),
        message: err.to_string(),
    })?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(IoError::NotAnObject {
            path: path.display().to_string(),
        })
    }
}

/// Reads a JSON object, returning `None` when the file does not exist.
///
/// # Errors
///
/// Returns [`IoError`] when the file exists but is unreadable or malformed.
pub fn read_optional_json_object(path: &Path) -> Result<Option<Value>, IoError> {
    if !path.exists() {
        return Ok(None);
    }
    read_json_object(path).map(Some)
}
