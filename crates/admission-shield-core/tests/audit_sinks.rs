// crates/admission-shield-core/tests/audit_sinks.rs
// ============================================================================
// Module: Decision Log Sink Tests
// Description: Tests for the file-backed and discarding decision log sinks.
// ============================================================================
//! ## Overview
//! Verifies that the file sink appends one JSON object per line and keeps
//! earlier lines when reopened.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::fs;

use admission_shield_core::AdmissionRequest;
use admission_shield_core::DecisionLogSink;
use admission_shield_core::Operation;
use admission_shield_core::RequestContext;
use admission_shield_core::ResourceScope;
use admission_shield_core::UserInfo;
use admission_shield_core::runtime::ConsoleLogEvent;
use admission_shield_core::runtime::FileDecisionLog;
use admission_shield_core::runtime::NoopDecisionLog;
use serde_json::Value;

fn request() -> RequestContext {
    RequestContext::new(AdmissionRequest {
        uid: "uid-1".to_string(),
        api_group: "apps".to_string(),
        api_version: "v1".to_string(),
        kind: "Deployment".to_string(),
        namespace: "team-a".to_string(),
        name: "web".to_string(),
        operation: Operation::Update,
        user_info: UserInfo {
            username: "alice".to_string(),
            groups: Vec::new(),
        },
        resource_scope: ResourceScope::Namespaced,
        dry_run: false,
        object: Vec::new(),
    })
}

fn read_lines(path: &std::path::Path) -> Vec<Value> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn file_sink_appends_json_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("decisions.jsonl");
    let ctx = request();

    let sink = FileDecisionLog::new(&path).unwrap();
    sink.console(&ConsoleLogEvent::entry(&ctx));
    sink.console(&ConsoleLogEvent::exit(&ctx, false, true));

    let lines = read_lines(&path);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["event"], "request_received");
    assert_eq!(lines[0]["request_uid"], "uid-1");
    assert!(lines[0].get("allowed").is_none());
    assert_eq!(lines[1]["event"], "response_sent");
    assert_eq!(lines[1]["allowed"], false);
    assert_eq!(lines[1]["aborted"], true);
}

#[test]
fn reopened_file_sink_keeps_earlier_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("decisions.jsonl");
    let ctx = request();

    FileDecisionLog::new(&path).unwrap().console(&ConsoleLogEvent::entry(&ctx));
    FileDecisionLog::new(&path)
        .unwrap()
        .console(&ConsoleLogEvent::error(&ctx, "failed to list signatures", "timeout"));

    let lines = read_lines(&path);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1]["event"], "error");
    assert_eq!(lines[1]["message"], "failed to list signatures");
    assert_eq!(lines[1]["error"], "timeout");
}

#[test]
fn noop_sink_accepts_console_events() {
    let sink = NoopDecisionLog;
    sink.console(&ConsoleLogEvent::entry(&request()));
}
