// crates/outpass-terminal/src/cache.rs
// ============================================================================
// Module: Terminal Snapshot Cache
// Description: On-disk copy of the server's verification snapshot.
// Purpose: Answer scans from local state when the server is unreachable.
// Dependencies: outpass-core, serde_json
// ============================================================================

//! ## Overview
//! The cache holds the last snapshot pulled from `/gate/sync-cache`. Each
//! refresh fully replaces the previous snapshot, in memory and on disk, so
//! a record's absence means the student holds no non-terminal pass as of
//! `generated_at`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use outpass_core::CacheSnapshot;
use outpass_core::RegNo;
use outpass_core::SnapshotRecord;

use crate::storage;
use crate::storage::PersistError;

// ============================================================================
// SECTION: Cache
// ============================================================================

/// Durable verification snapshot.
///
/// # Invariants
/// - The file on disk is always one complete serialized snapshot.
/// - `replace` persists before the in-memory snapshot changes.
pub struct SnapshotCache {
    /// Snapshot file path.
    path: PathBuf,
    /// Last snapshot, when one has been stored.
    snapshot: Option<CacheSnapshot>,
}

impl SnapshotCache {
    /// Opens the cache, loading any previously stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] when the file exists but cannot be read or
    /// decoded. A missing file opens an empty cache.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PersistError> {
        let path = path.into();
        let snapshot = storage::read_json(&path)?;
        Ok(Self {
            path,
            snapshot,
        })
    }

    /// Replaces the stored snapshot with a freshly pulled one.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] when the snapshot cannot be persisted; the
    /// previous snapshot stays in effect.
    pub fn replace(&mut self, snapshot: CacheSnapshot) -> Result<(), PersistError> {
        storage::write_json(&self.path, &snapshot)?;
        self.snapshot = Some(snapshot);
        Ok(())
    }

    /// Returns the stored snapshot, if any.
    #[must_use]
    pub const fn snapshot(&self) -> Option<&CacheSnapshot> {
        self.snapshot.as_ref()
    }

    /// Finds the cached record for a registration number.
    #[must_use]
    pub fn find(&self, reg_no: &RegNo) -> Option<&SnapshotRecord> {
        self.snapshot.as_ref().and_then(|snapshot| snapshot.find(reg_no))
    }
}
