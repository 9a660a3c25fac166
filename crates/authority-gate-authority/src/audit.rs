// crates/authority-gate-authority/src/audit.rs
// ============================================================================
// Module: Authority Gate Audit Logging
// Description: Structured audit events for gate decisions.
// Purpose: Emit redacted JSON-line decision logs without hard dependencies.
// Dependencies: authority-gate-config, authority-gate-core, serde, serde_json
// ============================================================================

//! ## Overview
//! One [`GateAuditEvent`] is recorded per stage decision. Events carry the
//! app id, acting user, route path, decision and an internal reason label.
//! The request signature and authority credentials are never recorded.

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

use authority_gate_config::AuditConfig;
use authority_gate_config::AuditSinkKind;
use authority_gate_core::AuthRequest;
use authority_gate_core::RejectReason;
use authority_gate_core::ValidatedRequest;
use serde::Serialize;

use crate::scheme::GateError;
use crate::telemetry::GateOutcome;
use crate::telemetry::GateStage;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Event identifier for gate decisions.
const DECISION_EVENT: &str = "authority_gate_decision";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Gate decision audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct GateAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Decision stage.
    pub stage: GateStage,
    /// Decision label (`allow` or `deny`).
    pub decision: &'static str,
    /// Outcome classification.
    pub outcome: GateOutcome,
    /// Internal reason label for deny events.
    pub reason: Option<&'static str>,
    /// Calling application identifier when supplied.
    pub app_id: Option<String>,
    /// Acting user identifier when supplied.
    pub user: Option<String>,
    /// Route path of the gated request.
    pub path: String,
}

impl GateAuditEvent {
    /// Builds an allow event.
    #[must_use]
    pub fn allowed(stage: GateStage, request: &ValidatedRequest) -> Self {
        Self {
            event: DECISION_EVENT,
            timestamp_ms: now_ms(),
            stage,
            decision: "allow",
            outcome: GateOutcome::Allowed,
            reason: None,
            app_id: Some(request.app_id().to_string()),
            user: Some(request.params().user.clone()),
            path: request.path().to_string(),
        }
    }

    /// Builds a deny event for a request that failed local validation.
    #[must_use]
    pub fn rejected(request: &AuthRequest, reason: RejectReason) -> Self {
        Self {
            event: DECISION_EVENT,
            timestamp_ms: now_ms(),
            stage: GateStage::Primary,
            decision: "deny",
            outcome: GateOutcome::Rejected,
            reason: Some(reason.as_str()),
            app_id: request.app_id.clone(),
            user: request.user.clone(),
            path: request.path.clone(),
        }
    }

    /// Builds a deny event for a validated request the authority refused.
    #[must_use]
    pub fn denied(stage: GateStage, request: &ValidatedRequest, error: &GateError) -> Self {
        Self {
            event: DECISION_EVENT,
            timestamp_ms: now_ms(),
            stage,
            decision: "deny",
            outcome: error.outcome(),
            reason: Some(error.reason_label()),
            app_id: Some(request.app_id().to_string()),
            user: Some(request.params().user.clone()),
            path: request.path().to_string(),
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for gate decisions.
pub trait GateAuditSink: Send + Sync {
    /// Record a gate audit event.
    fn record(&self, event: &GateAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrGateAuditSink;

impl GateAuditSink for StderrGateAuditSink {
    fn record(&self, event: &GateAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileGateAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileGateAuditSink {
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
}

impl GateAuditSink for FileGateAuditSink {
    fn record(&self, event: &GateAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
pub struct NoopGateAuditSink;

impl GateAuditSink for NoopGateAuditSink {
    fn record(&self, _event: &GateAuditEvent) {}
}

/// Builds the configured audit sink.
///
/// # Errors
///
/// Returns an error when the file sink cannot be opened.
pub fn audit_sink_from_config(config: &AuditConfig) -> io::Result<Arc<dyn GateAuditSink>> {
    match (config.sink, config.path.as_deref()) {
        (AuditSinkKind::File, Some(path)) => {
            Ok(Arc::new(FileGateAuditSink::new(Path::new(path.trim()))?))
        }
        (AuditSinkKind::File, None) => {
            Err(io::Error::new(io::ErrorKind::InvalidInput, "audit.sink=file requires audit.path"))
        }
        (AuditSinkKind::Stderr, _) => Ok(Arc::new(StderrGateAuditSink)),
        (AuditSinkKind::None, _) => Ok(Arc::new(NoopGateAuditSink)),
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the current time in milliseconds since the UNIX epoch.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|duration| duration.as_millis()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    //! Unit tests for audit event construction and sinks.
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions use unwrap/expect for clarity."
    )]

    use std::fs;

    use authority_gate_config::AuditConfig;
    use authority_gate_config::AuditSinkKind;
    use authority_gate_core::AuthRequest;
    use authority_gate_core::RejectReason;
    use authority_gate_core::ValidationPolicy;
    use authority_gate_core::validate_request;
    use serde_json::Value;

    use super::FileGateAuditSink;
    use super::GateAuditEvent;
    use super::GateAuditSink;
    use super::audit_sink_from_config;
    use crate::telemetry::GateStage;

    fn signed_request() -> AuthRequest {
        AuthRequest::from_query("hash=secret-sig&timestamp=1390595898&app_id=app&user=7")
            .with_path("/users/7")
    }

    #[test]
    fn allow_event_omits_signature() {
        let validated = validate_request(&signed_request(), &ValidationPolicy::default()).unwrap();
        let event = GateAuditEvent::allowed(GateStage::Primary, &validated);
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("secret-sig"));
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["decision"], "allow");
        assert_eq!(value["stage"], "primary");
        assert_eq!(value["outcome"], "allowed");
        assert_eq!(value["user"], "7");
        assert_eq!(value["path"], "/users/7");
    }

    #[test]
    fn rejected_event_carries_reason_label() {
        let request = AuthRequest::from_query("timestamp=1&user=7");
        let event = GateAuditEvent::rejected(&request, RejectReason::MissingHash);
        assert_eq!(event.reason, Some("missing_hash"));
        assert_eq!(event.decision, "deny");
        assert_eq!(event.app_id, None);
    }

    #[test]
    fn file_sink_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let sink = FileGateAuditSink::new(&path).unwrap();
        let request = AuthRequest::default();
        sink.record(&GateAuditEvent::rejected(&request, RejectReason::MissingHash));
        sink.record(&GateAuditEvent::rejected(&request, RejectReason::MissingTimestamp));
        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["reason"], "missing_timestamp");
    }

    #[test]
    fn file_sink_config_requires_path() {
        let config = AuditConfig {
            sink: AuditSinkKind::File,
            path: None,
        };
        assert!(audit_sink_from_config(&config).is_err());
    }
}
