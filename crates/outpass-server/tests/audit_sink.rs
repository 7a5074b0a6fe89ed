//! Audit sink construction and file output tests.
// crates/outpass-server/tests/audit_sink.rs
// ============================================================================
// Module: Audit Sink Tests
// Description: Verify sink selection from configuration and the JSON-line
//              format written by the file sink.
// Purpose: Keep the audit trail parseable by downstream log pipelines.
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

use std::fs;

use outpass_config::AuditConfig;
use outpass_config::AuditSinkKind;
use outpass_core::GateAction;
use outpass_server::AuditSink;
use outpass_server::FileAuditSink;
use outpass_server::GateAuditEvent;
use outpass_server::SweepAuditEvent;
use outpass_server::build_sink;
use serde_json::Value;
use tempfile::TempDir;

#[test]
fn file_sink_appends_one_json_object_per_event() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("audit.log");
    let sink = FileAuditSink::new(&path).unwrap();

    sink.record_gate(&GateAuditEvent::new(7, GateAction::Exit, "applied", "gate-1".to_string()));
    sink.record_sweep(&SweepAuditEvent::failed("store offline".to_string()));

    let contents = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);

    let gate: Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(gate["event"], "gate_scan");
    assert_eq!(gate["request_id"], 7);
    assert_eq!(gate["action"], "exit");
    assert_eq!(gate["outcome"], "applied");

    let sweep: Value = serde_json::from_str(lines[1]).unwrap();
    assert_eq!(sweep["event"], "expiry_sweep");
    assert_eq!(sweep["error"], "store offline");
}

#[test]
fn build_sink_honors_the_configured_kind() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("audit.log");
    let config = AuditConfig {
        sink: AuditSinkKind::File,
        path: Some(path.clone()),
    };
    let sink = build_sink(&config).unwrap();
    sink.record_sweep(&SweepAuditEvent::failed("probe".to_string()));
    assert!(fs::read_to_string(&path).unwrap().contains("probe"));

    let noop = build_sink(&AuditConfig {
        sink: AuditSinkKind::Noop,
        path: None,
    })
    .unwrap();
    noop.record_sweep(&SweepAuditEvent::failed("dropped".to_string()));
}

#[test]
fn build_sink_rejects_a_file_sink_without_a_path() {
    let config = AuditConfig {
        sink: AuditSinkKind::File,
        path: None,
    };
    assert!(build_sink(&config).is_err());
}
