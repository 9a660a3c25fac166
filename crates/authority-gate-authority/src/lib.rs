// crates/authority-gate-authority/src/lib.rs
// ============================================================================
// Module: Authority Gate Authority Library
// Description: Remote authority delegation and host framework integration.
// Purpose: Turn validated requests into allow/deny decisions over HTTP.
// Dependencies: authority-gate-core, authority-gate-config, axum, reqwest
// ============================================================================

//! ## Overview
//! `authority-gate-authority` owns every side effect of the gate: the HTTP
//! client that asks the remote authority for a decision, the [`AuthScheme`]
//! coordinator that sequences local validation and delegation, audit and
//! metrics hooks, and the axum middleware that protects routes.
//!
//! Security posture: fail closed. Timeouts, transport errors, malformed
//! responses, and explicit denials all block the request with the same
//! outward message.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod client;
pub mod host;
pub mod scheme;
pub mod telemetry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::FileGateAuditSink;
pub use audit::GateAuditEvent;
pub use audit::GateAuditSink;
pub use audit::NoopGateAuditSink;
pub use audit::StderrGateAuditSink;
pub use audit::audit_sink_from_config;
pub use client::AuthorityClient;
pub use client::AuthorityClientError;
pub use client::HttpAuthorityClient;
pub use host::PayloadCredentials;
pub use host::delegate_payload;
pub use host::protect;
pub use host::require_signed_query;
pub use scheme::AuthScheme;
pub use scheme::Authenticated;
pub use scheme::GateError;
pub use scheme::GateSetupError;
pub use scheme::NOT_AUTHORIZED_MESSAGE;
pub use telemetry::GATE_LATENCY_BUCKETS_MS;
pub use telemetry::GateMetricEvent;
pub use telemetry::GateMetrics;
pub use telemetry::GateOutcome;
pub use telemetry::GateStage;
pub use telemetry::NoopMetrics;
