// crates/authority-gate-core/src/verdict.rs
// ============================================================================
// Module: Authority Gate Verdicts
// Description: Typed authority outcomes and response body interpretation.
// Purpose: Reduce authority responses to exactly one allow/deny/unreachable.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! An [`AuthorityVerdict`] is the single terminal outcome of one delegation
//! call. [`interpret_response`] reduces the authority's JSON body: only an
//! explicit boolean `success: true` authorizes, and every other shape denies.
//! Bodies that are not JSON at all are an infrastructure failure and map to
//! [`UnreachableReason::MalformedResponse`].
//!
//! Security posture: fail closed. Denied and unreachable verdicts are
//! indistinguishable at the outward boundary.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Response key carrying the authority's boolean decision.
pub const SUCCESS_FIELD: &str = "success";

// ============================================================================
// SECTION: Credentials
// ============================================================================

/// Opaque credentials returned by the authority on allow.
///
/// # Invariants
/// - Holds the response object with the `success` key removed.
/// - The shape is owned by the authority; this crate never inspects it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credentials(Map<String, Value>);

impl Credentials {
    /// Wraps a credentials object.
    #[must_use]
    pub const fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Returns a credential field by name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the credential fields.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the credentials, returning the raw fields.
    #[must_use]
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

// ============================================================================
// SECTION: Reasons
// ============================================================================

/// Explicit authority denials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// Authority answered HTTP 403.
    #[error("authority returned forbidden")]
    Forbidden,
    /// Authority body lacked `success: true`.
    #[error("authority did not report success")]
    NotSuccessful,
}

impl DenyReason {
    /// Returns a stable snake-case label for audit and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Forbidden => "forbidden",
            Self::NotSuccessful => "not_successful",
        }
    }
}

/// Infrastructure failures reaching or reading the authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnreachableReason {
    /// The call did not resolve before its deadline.
    #[error("authority call timed out")]
    Timeout,
    /// Connection, DNS, or I/O failure.
    #[error("authority transport error")]
    Transport,
    /// The body was not valid JSON.
    #[error("authority response malformed")]
    MalformedResponse,
    /// A non-success status other than 403.
    #[error("authority returned unexpected status {0}")]
    UnexpectedStatus(u16),
    /// The body exceeded the configured size cap.
    #[error("authority response too large")]
    ResponseTooLarge,
}

impl UnreachableReason {
    /// Returns a stable snake-case label for audit and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Transport => "transport_error",
            Self::MalformedResponse => "malformed_response",
            Self::UnexpectedStatus(_) => "unexpected_status",
            Self::ResponseTooLarge => "response_too_large",
        }
    }
}

// ============================================================================
// SECTION: Verdict
// ============================================================================

/// Terminal outcome of a single delegation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorityVerdict {
    /// The authority allowed the request.
    Authorized(Credentials),
    /// The authority explicitly denied the request.
    Denied(DenyReason),
    /// No decision could be obtained.
    Unreachable(UnreachableReason),
}

impl AuthorityVerdict {
    /// Returns true for [`AuthorityVerdict::Authorized`].
    #[must_use]
    pub const fn is_authorized(&self) -> bool {
        matches!(self, Self::Authorized(_))
    }

    /// Returns a stable outcome label (`authorized`, `denied`, `unreachable`).
    #[must_use]
    pub const fn outcome_label(&self) -> &'static str {
        match self {
            Self::Authorized(_) => "authorized",
            Self::Denied(_) => "denied",
            Self::Unreachable(_) => "unreachable",
        }
    }
}

// ============================================================================
// SECTION: Interpretation
// ============================================================================

/// Reduces a parsed authority body to a verdict.
///
/// `success` must be the JSON boolean `true`; a missing key, `false`, a
/// non-boolean value, or a non-object body all deny.
#[must_use]
pub fn interpret_response(body: Value) -> AuthorityVerdict {
    let Value::Object(mut fields) = body else {
        return AuthorityVerdict::Denied(DenyReason::NotSuccessful);
    };
    match fields.remove(SUCCESS_FIELD) {
        Some(Value::Bool(true)) => AuthorityVerdict::Authorized(Credentials::new(fields)),
        _ => AuthorityVerdict::Denied(DenyReason::NotSuccessful),
    }
}

/// Parses raw body bytes as JSON and interprets them.
///
/// Bytes that are not valid JSON yield
/// [`UnreachableReason::MalformedResponse`].
#[must_use]
pub fn interpret_body(bytes: &[u8]) -> AuthorityVerdict {
    serde_json::from_slice::<Value>(bytes).map_or(
        AuthorityVerdict::Unreachable(UnreachableReason::MalformedResponse),
        interpret_response,
    )
}
