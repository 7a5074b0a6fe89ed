// crates/outpass-terminal/src/queue.rs
// ============================================================================
// Module: Terminal Offline Queue
// Description: Durable FIFO of gate actions captured while offline.
// Purpose: Guarantee captured scans survive restarts until synced.
// Dependencies: outpass-core, serde
// ============================================================================

//! ## Overview
//! Actions logged while the server is unreachable land here. The queue is
//! strictly FIFO, persisted after every mutation, and keyed on
//! `(request_id, action)` so a gatekeeper re-scanning the same pass while
//! offline cannot enqueue a duplicate.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::VecDeque;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use outpass_core::GateAction;
use outpass_core::RequestId;
use outpass_core::Timestamp;

use crate::storage;
use crate::storage::PersistError;

// ============================================================================
// SECTION: Queued Action
// ============================================================================

/// One gate action awaiting replay against the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedAction {
    /// Request the scan applies to.
    pub request_id: RequestId,
    /// Action performed at the gate.
    pub action: GateAction,
    /// Optional gatekeeper comments.
    pub comments: Option<String>,
    /// Terminal-local time the scan was captured.
    pub captured_at: Timestamp,
}

// ============================================================================
// SECTION: Queue
// ============================================================================

/// Durable FIFO of offline gate actions.
///
/// # Invariants
/// - The on-disk file reflects the queue after every successful mutation.
/// - At most one entry exists per `(request_id, action)` pair.
pub struct OfflineQueue {
    /// Queue file path.
    path: PathBuf,
    /// Pending actions in capture order.
    items: VecDeque<QueuedAction>,
}

impl OfflineQueue {
    /// Opens the queue, loading any previously persisted actions.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] when the file exists but cannot be read or
    /// decoded. A missing file opens an empty queue.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PersistError> {
        let path = path.into();
        let items = storage::read_json::<Vec<QueuedAction>>(&path)?
            .map(VecDeque::from)
            .unwrap_or_default();
        Ok(Self {
            path,
            items,
        })
    }

    /// Appends an action unless its `(request_id, action)` is already
    /// queued. Returns whether the action was newly queued.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] when the queue cannot be persisted; the
    /// action is not retained in memory in that case.
    pub fn push(&mut self, action: QueuedAction) -> Result<bool, PersistError> {
        let duplicate = self.items.iter().any(|queued| {
            queued.request_id == action.request_id && queued.action == action.action
        });
        if duplicate {
            return Ok(false);
        }
        self.items.push_back(action);
        if let Err(err) = self.persist() {
            self.items.pop_back();
            return Err(err);
        }
        Ok(true)
    }

    /// Returns the oldest queued action without removing it.
    #[must_use]
    pub fn front(&self) -> Option<&QueuedAction> {
        self.items.front()
    }

    /// Removes and returns the oldest queued action.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] when the shrunk queue cannot be persisted;
    /// the action is restored to the front in that case.
    pub fn pop_front(&mut self) -> Result<Option<QueuedAction>, PersistError> {
        let Some(action) = self.items.pop_front() else {
            return Ok(None);
        };
        if let Err(err) = self.persist() {
            self.items.push_front(action);
            return Err(err);
        }
        Ok(Some(action))
    }

    /// Returns the number of pending actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Reports whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Writes the full queue to disk.
    fn persist(&self) -> Result<(), PersistError> {
        let items: Vec<&QueuedAction> = self.items.iter().collect();
        storage::write_json(&self.path, &items)
    }
}
