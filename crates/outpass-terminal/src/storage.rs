// crates/outpass-terminal/src/storage.rs
// ============================================================================
// Module: Terminal File Persistence
// Description: JSON file reads and atomic replacement writes.
// Purpose: Keep the cache and queue files whole across crashes.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The terminal persists two small JSON files, the snapshot cache and the
//! offline queue. Writes go through a sibling temp file and a rename so a
//! crash mid-write leaves the previous complete file in place.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Terminal file persistence errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersistError {
    /// Filesystem failure reading or writing a terminal file.
    #[error("terminal file io error: {0}")]
    Io(String),
    /// File contents are not the expected JSON shape.
    #[error("terminal file corrupt: {0}")]
    Corrupt(String),
}

// ============================================================================
// SECTION: File Operations
// ============================================================================

/// Reads and deserializes a JSON file; a missing file yields `None`.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, PersistError> {
    match fs::read(path) {
        Ok(bytes) => {
            serde_json::from_slice(&bytes).map(Some).map_err(|err| PersistError::Corrupt(err.to_string()))
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(PersistError::Io(err.to_string())),
    }
}

/// Serializes a value and atomically replaces the file at `path`.
pub(crate) fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), PersistError> {
    let payload =
        serde_json::to_vec(value).map_err(|err| PersistError::Corrupt(err.to_string()))?;
    let tmp = temp_path(path);
    fs::write(&tmp, &payload).map_err(|err| PersistError::Io(err.to_string()))?;
    fs::rename(&tmp, path).map_err(|err| PersistError::Io(err.to_string()))
}

/// Builds the sibling temp path used for atomic replacement.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map_or_else(|| OsString::from("outpass"), OsString::from);
    name.push(".tmp");
    path.with_file_name(name)
}
