// crates/outpass-server/src/audit.rs
// ============================================================================
// Module: Outpass Audit Logging
// Description: Structured audit events for lifecycle, gate, and sweep
//              activity.
// Purpose: Emit JSON-line audit logs without hard dependencies.
// Dependencies: outpass-config, outpass-core, serde, serde_json
// ============================================================================

//! ## Overview
//! This module defines audit event payloads and sinks for Outpass request
//! handling. It is intentionally lightweight so deployments can route
//! events to their preferred logging pipeline without redesign.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use outpass_config::AuditConfig;
use outpass_config::AuditSinkKind;
use outpass_core::GateAction;
use outpass_core::PassRequest;
use outpass_core::SweepReport;

// ============================================================================
// SECTION: Events
// ============================================================================

/// Lifecycle audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct RequestAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Request identifier.
    pub request_id: i64,
    /// Student registration number.
    pub reg_no: String,
    /// Lifecycle status after the event.
    pub status: &'static str,
    /// Acting identity when one was supplied.
    pub actor: Option<String>,
}

impl RequestAuditEvent {
    /// Creates a lifecycle event with a consistent timestamp.
    #[must_use]
    pub fn new(event: &'static str, request: &PassRequest, actor: Option<String>) -> Self {
        Self {
            event,
            timestamp_ms: epoch_millis(),
            request_id: request.id.value(),
            reg_no: request.student_id.as_str().to_string(),
            status: request.status.as_str(),
            actor,
        }
    }
}

/// Gate scan audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct GateAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Request identifier.
    pub request_id: i64,
    /// Gate action performed.
    pub action: &'static str,
    /// Scan outcome label.
    pub outcome: &'static str,
    /// Gatekeeper identity.
    pub gatekeeper: String,
}

impl GateAuditEvent {
    /// Creates a gate scan event with a consistent timestamp.
    #[must_use]
    pub fn new(
        request_id: i64,
        action: GateAction,
        outcome: &'static str,
        gatekeeper: String,
    ) -> Self {
        Self {
            event: "gate_scan",
            timestamp_ms: epoch_millis(),
            request_id,
            action: action.as_str(),
            outcome,
            gatekeeper,
        }
    }
}

/// Expiry sweep audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct SweepAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Requests transitioned to expired by this pass.
    pub expired: Vec<i64>,
    /// Per-request failure descriptions.
    pub failures: Vec<String>,
    /// Sweep-level failure, when the pass itself failed.
    pub error: Option<String>,
}

impl SweepAuditEvent {
    /// Creates a sweep event from a completed report.
    #[must_use]
    pub fn completed(report: &SweepReport) -> Self {
        Self {
            event: "expiry_sweep",
            timestamp_ms: epoch_millis(),
            expired: report.expired.iter().map(|id| id.value()).collect(),
            failures: report
                .failures
                .iter()
                .map(|(id, message)| format!("{}: {message}", id.value()))
                .collect(),
            error: None,
        }
    }

    /// Creates a sweep event for a pass that failed outright.
    #[must_use]
    pub fn failed(error: String) -> Self {
        Self {
            event: "expiry_sweep",
            timestamp_ms: epoch_millis(),
            expired: Vec::new(),
            failures: Vec::new(),
            error: Some(error),
        }
    }
}

/// Milliseconds since the Unix epoch for event stamping.
fn epoch_millis() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for Outpass server events.
pub trait AuditSink: Send + Sync {
    /// Records a lifecycle event.
    fn record_request(&self, event: &RequestAuditEvent);

    /// Records a gate scan event.
    fn record_gate(&self, event: &GateAuditEvent);

    /// Records an expiry sweep event.
    fn record_sweep(&self, event: &SweepAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn record_request(&self, event: &RequestAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }

    fn record_gate(&self, event: &GateAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }

    fn record_sweep(&self, event: &SweepAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Serializes and appends one event line.
    fn write_line<T: Serialize>(&self, event: &T) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl AuditSink for FileAuditSink {
    fn record_request(&self, event: &RequestAuditEvent) {
        self.write_line(event);
    }

    fn record_gate(&self, event: &GateAuditEvent) {
        self.write_line(event);
    }

    fn record_sweep(&self, event: &SweepAuditEvent) {
        self.write_line(event);
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record_request(&self, _event: &RequestAuditEvent) {}

    fn record_gate(&self, _event: &GateAuditEvent) {}

    fn record_sweep(&self, _event: &SweepAuditEvent) {}
}

// ============================================================================
// SECTION: Construction
// ============================================================================

/// Builds the configured audit sink.
///
/// # Errors
///
/// Returns an error when the file sink path cannot be opened.
pub fn build_sink(config: &AuditConfig) -> io::Result<Arc<dyn AuditSink>> {
    match config.sink {
        AuditSinkKind::Stderr => Ok(Arc::new(StderrAuditSink)),
        AuditSinkKind::File => {
            let path = config.path.clone().ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "audit file sink requires a path")
            })?;
            Ok(Arc::new(FileAuditSink::new(&path)?))
        }
        AuditSinkKind::Noop => Ok(Arc::new(NoopAuditSink)),
    }
}
