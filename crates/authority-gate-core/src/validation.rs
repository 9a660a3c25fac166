// crates/authority-gate-core/src/validation.rs
// ============================================================================
// Module: Authority Gate Validation
// Description: Ordered local precondition checks for signed requests.
// Purpose: Reject malformed or stale requests before any network call.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! [`validate_request`] runs the local precondition checks in a fixed order
//! and reports the first one that fails. It is pure and synchronous; a
//! rejection here means the remote authority is never contacted.
//!
//! Security posture: the timestamp check is a fixed floor, not a freshness
//! window. Requests arbitrarily far in the future pass this check alone.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::request::AuthRequest;
use crate::request::SignedParams;
use crate::request::ValidatedRequest;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Historical minimum acceptable request timestamp (UNIX seconds).
pub const DEFAULT_MIN_TIMESTAMP: i64 = 1_390_585_898;

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Process-wide inputs to local validation.
///
/// # Invariants
/// - Immutable after construction; shared across requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationPolicy {
    /// Oldest acceptable timestamp, inclusive.
    pub min_timestamp: i64,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            min_timestamp: DEFAULT_MIN_TIMESTAMP,
        }
    }
}

// ============================================================================
// SECTION: Reasons
// ============================================================================

/// Local rejection reasons, listed in check order.
///
/// # Invariants
/// - Variants and labels are stable for audit classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// `hash` absent or empty.
    #[error("Hash not set")]
    MissingHash,
    /// `timestamp` absent or empty.
    #[error("No timestamp set")]
    MissingTimestamp,
    /// `timestamp` not an integer or below the floor.
    #[error("Timestamp invalid")]
    InvalidTimestamp,
    /// `app_id` absent or empty.
    #[error("No app_id set")]
    MissingAppId,
    /// `user` absent or empty.
    #[error("No user set")]
    MissingUser,
    /// `user` not an integer.
    #[error("User invalid")]
    InvalidUser,
    /// Route user identifier differs from `user`.
    #[error("Wrong user")]
    UserMismatch,
}

impl RejectReason {
    /// Returns a stable snake-case label for audit and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingHash => "missing_hash",
            Self::MissingTimestamp => "missing_timestamp",
            Self::InvalidTimestamp => "invalid_timestamp",
            Self::MissingAppId => "missing_app_id",
            Self::MissingUser => "missing_user",
            Self::InvalidUser => "invalid_user",
            Self::UserMismatch => "user_mismatch",
        }
    }
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Validates an inbound request against the local preconditions.
///
/// Checks run in this order and the first failure is reported: hash present,
/// timestamp present, timestamp integral and at or above the floor, app id
/// present, user present, user integral, route user (when present) equal to
/// user. Empty strings count as absent.
///
/// # Errors
///
/// Returns the first failing [`RejectReason`].
pub fn validate_request(
    request: &AuthRequest,
    policy: &ValidationPolicy,
) -> Result<ValidatedRequest, RejectReason> {
    let hash = present(request.hash.as_deref()).ok_or(RejectReason::MissingHash)?;
    let timestamp_text =
        present(request.timestamp.as_deref()).ok_or(RejectReason::MissingTimestamp)?;
    let timestamp = parse_integer(timestamp_text)
        .filter(|value| *value >= policy.min_timestamp)
        .ok_or(RejectReason::InvalidTimestamp)?;
    let app_id = present(request.app_id.as_deref()).ok_or(RejectReason::MissingAppId)?;
    let user_text = present(request.user.as_deref()).ok_or(RejectReason::MissingUser)?;
    let user = parse_integer(user_text).ok_or(RejectReason::InvalidUser)?;

    if let Some(route_user) = present(request.route_user_id.as_deref())
        && parse_integer(route_user) != Some(user)
    {
        return Err(RejectReason::UserMismatch);
    }

    let params = SignedParams::new(hash, timestamp_text, app_id, user_text);
    Ok(ValidatedRequest::new(params, timestamp, user, request.path.clone()))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the value when it is present and non-empty.
fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

/// Parses a strict decimal integer with an optional leading sign.
fn parse_integer(value: &str) -> Option<i64> {
    let digits = value.strip_prefix(['-', '+']).unwrap_or(value);
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}
