// crates/admission-shield-core/src/runtime/audit.rs
// ============================================================================
// Module: Decision Logging
// Description: Context records, console events, and decision log sinks.
// Purpose: Emit structured decision logs through an injected sink.
// Dependencies: serde, serde_json, crate::core
// ============================================================================

//! ## Overview
//! The engine reports through a [`DecisionLogSink`] passed in with its other
//! collaborators. Console events trace request entry, exit, and collaborator
//! failures; a [`DecisionLogRecord`] captures the full decision context once
//! per request. Both are serialized as JSON lines by the stock sinks.
//! [`LogScope`] decides which requests are logged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::ProfileRef;
use crate::core::matcher::RuleMatcher;
use crate::core::request::Operation;
use crate::core::request::RequestContext;
use crate::core::request::RequestFields;
use crate::core::request::ResourceScope;
use crate::core::results::MutationEvalResult;
use crate::core::results::SignatureEvalResult;
use crate::core::rule::RequestPattern;

// ============================================================================
// SECTION: Log Scope
// ============================================================================

/// Request scope of a log stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogScope {
    /// Stream is enabled.
    #[serde(default)]
    pub enabled: bool,
    /// Requests logged; empty logs every request.
    #[serde(default)]
    pub in_scope: Vec<RequestPattern>,
    /// Requests never logged.
    #[serde(default)]
    pub out_of_scope: Vec<RequestPattern>,
}

impl LogScope {
    /// Returns true when the stream logs the request.
    #[must_use]
    pub fn applies(&self, fields: &RequestFields<'_>) -> bool {
        self.enabled
            && (self.in_scope.is_empty() || RuleMatcher::matches_any(&self.in_scope, fields))
            && !RuleMatcher::matches_any(&self.out_of_scope, fields)
    }
}

// ============================================================================
// SECTION: Types
// ============================================================================

/// Console event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsoleEventKind {
    /// Request received.
    RequestReceived,
    /// Response sent.
    ResponseSent,
    /// Collaborator failure.
    Error,
}

/// Console trace event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsoleLogEvent {
    /// Event kind.
    pub event: ConsoleEventKind,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Request identifier.
    pub request_uid: String,
    /// Target namespace.
    pub namespace: String,
    /// Target name.
    pub name: String,
    /// Target kind.
    pub kind: String,
    /// Requested operation.
    pub operation: Operation,
    /// Event message.
    pub message: String,
    /// Decision, for exit events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed: Option<bool>,
    /// Abort flag, for exit events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<bool>,
    /// Error text, for error events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConsoleLogEvent {
    /// Builds an event skeleton for a request.
    fn base(kind: ConsoleEventKind, request: &RequestContext, message: &str) -> Self {
        Self {
            event: kind,
            timestamp_ms: timestamp_ms(),
            request_uid: request.uid.clone(),
            namespace: request.namespace.clone(),
            name: request.name.clone(),
            kind: request.kind.clone(),
            operation: request.operation,
            message: message.to_string(),
            allowed: None,
            aborted: None,
            error: None,
        }
    }

    /// Creates a request entry event.
    #[must_use]
    pub fn entry(request: &RequestContext) -> Self {
        Self::base(ConsoleEventKind::RequestReceived, request, "new admission request received")
    }

    /// Creates a response exit event.
    #[must_use]
    pub fn exit(request: &RequestContext, allowed: bool, aborted: bool) -> Self {
        let mut event = Self::base(ConsoleEventKind::ResponseSent, request, "admission response sent");
        event.allowed = Some(allowed);
        event.aborted = Some(aborted);
        event
    }

    /// Creates a collaborator failure event.
    #[must_use]
    pub fn error(request: &RequestContext, message: &str, error: impl ToString) -> Self {
        let mut event = Self::base(ConsoleEventKind::Error, request, message);
        event.error = Some(error.to_string());
        event
    }
}

/// Decision context record emitted once per request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionLogRecord {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Request identifier.
    pub request_uid: String,
    /// Target API group.
    pub api_group: String,
    /// Target API version.
    pub api_version: String,
    /// Target kind.
    pub kind: String,
    /// Target namespace.
    pub namespace: String,
    /// Target name.
    pub name: String,
    /// Requested operation.
    pub operation: Operation,
    /// Requesting user.
    pub user_name: String,
    /// Requesting user groups.
    pub user_groups: Vec<String>,
    /// Target scope.
    pub scope: ResourceScope,
    /// Request targets a policy resource.
    pub policy_resource: bool,
    /// Request matched an ignore rule.
    pub ignored: bool,
    /// Request is protected.
    pub protected: bool,
    /// Final decision.
    pub allowed: bool,
    /// Decision reached by verification.
    pub verified: bool,
    /// Evaluation aborted.
    pub aborted: bool,
    /// Abort reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abort_reason: Option<String>,
    /// Break-glass active for the request.
    pub break_glass: bool,
    /// Detect-only mode active.
    pub detect_only: bool,
    /// Allow produced by break-glass.
    pub allow_by_break_glass_mode: bool,
    /// Allow produced by detect-only mode.
    pub allow_by_detect_only_mode: bool,
    /// Reason short code.
    pub reason_code: &'static str,
    /// Response message.
    pub message: String,
    /// Denying profile, when any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub denying_profile: Option<ProfileRef>,
    /// Signature result of the decisive profile.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<SignatureEvalResult>,
    /// Mutation result of the decisive profile.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mutation: Option<MutationEvalResult>,
    /// Evaluator error text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Request object dump (opt-in, never for secrets).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<Value>,
}

/// Returns the current time in milliseconds since the epoch.
#[must_use]
pub fn timestamp_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Sink for decision logs.
pub trait DecisionLogSink: Send + Sync {
    /// Records a decision context record.
    fn record(&self, record: &DecisionLogRecord);

    /// Records a console trace event.
    fn console(&self, _event: &ConsoleLogEvent) {}
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Sink that writes JSON lines to stderr.
pub struct StderrDecisionLog;

impl DecisionLogSink for StderrDecisionLog {
    fn record(&self, record: &DecisionLogRecord) {
        if let Ok(payload) = serde_json::to_string(record) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }

    fn console(&self, event: &ConsoleLogEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Sink that appends JSON lines to a file.
pub struct FileDecisionLog {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileDecisionLog {
    /// Opens the log file in append mode.
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

    /// Appends one serialized line.
    fn write_line(&self, payload: &str) {
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl DecisionLogSink for FileDecisionLog {
    fn record(&self, record: &DecisionLogRecord) {
        if let Ok(payload) = serde_json::to_string(record) {
            self.write_line(&payload);
        }
    }

    fn console(&self, event: &ConsoleLogEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            self.write_line(&payload);
        }
    }
}

/// Sink that discards everything.
pub struct NoopDecisionLog;

impl DecisionLogSink for NoopDecisionLog {
    fn record(&self, _record: &DecisionLogRecord) {}
}

/// Sink that keeps logs in memory.
#[derive(Default)]
pub struct InMemoryDecisionLog {
    /// Recorded context records.
    records: Mutex<Vec<DecisionLogRecord>>,
    /// Recorded console events.
    events: Mutex<Vec<ConsoleLogEvent>>,
}

impl InMemoryDecisionLog {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded context records.
    #[must_use]
    pub fn records(&self) -> Vec<DecisionLogRecord> {
        self.records.lock().map(|records| records.clone()).unwrap_or_default()
    }

    /// Returns the recorded console events.
    #[must_use]
    pub fn console_events(&self) -> Vec<ConsoleLogEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

impl DecisionLogSink for InMemoryDecisionLog {
    fn record(&self, record: &DecisionLogRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record.clone());
        }
    }

    fn console(&self, event: &ConsoleLogEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
