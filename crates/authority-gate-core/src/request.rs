// crates/authority-gate-core/src/request.rs
// ============================================================================
// Module: Authority Gate Requests
// Description: Raw inbound request view and its validated form.
// Purpose: Separate untrusted query input from fields proven well-formed.
// Dependencies: serde, url
// ============================================================================

//! ## Overview
//! [`AuthRequest`] is the untrusted view of an inbound request: every signed
//! field is kept as the optional string the caller sent. Validation turns it
//! into a [`ValidatedRequest`], which retains the raw [`SignedParams`] for
//! forwarding alongside the parsed integers used for local checks.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use url::form_urlencoded;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Query key carrying the opaque request signature.
pub const HASH_PARAM: &str = "hash";
/// Query key carrying the UNIX timestamp in seconds.
pub const TIMESTAMP_PARAM: &str = "timestamp";
/// Query key carrying the calling application identifier.
pub const APP_ID_PARAM: &str = "app_id";
/// Query key carrying the acting user identifier.
pub const USER_PARAM: &str = "user";
/// Route parameter compared against the `user` query value.
pub const ROUTE_USER_PARAM: &str = "userid";

// ============================================================================
// SECTION: Raw Request
// ============================================================================

/// Untrusted, unparsed view of an inbound gated request.
///
/// # Invariants
/// - Values are decoded query values exactly as received; no trimming.
/// - When a key repeats, the first occurrence is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRequest {
    /// Opaque caller signature.
    pub hash: Option<String>,
    /// UNIX timestamp in seconds, unparsed.
    pub timestamp: Option<String>,
    /// Calling application identifier.
    pub app_id: Option<String>,
    /// Acting user identifier, unparsed.
    pub user: Option<String>,
    /// User identifier taken from the route path, unparsed.
    pub route_user_id: Option<String>,
    /// Route path of the inbound request.
    pub path: String,
}

impl AuthRequest {
    /// Builds a request view from a raw (percent-encoded) query string.
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let mut request = Self::default();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            let slot = match key.as_ref() {
                HASH_PARAM => &mut request.hash,
                TIMESTAMP_PARAM => &mut request.timestamp,
                APP_ID_PARAM => &mut request.app_id,
                USER_PARAM => &mut request.user,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        request
    }

    /// Returns a copy with the route user identifier set.
    #[must_use]
    pub fn with_route_user_id(mut self, route_user_id: impl Into<String>) -> Self {
        self.route_user_id = Some(route_user_id.into());
        self
    }

    /// Returns a copy with the route path set.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }
}

// ============================================================================
// SECTION: Validated Request
// ============================================================================

/// Signed parameters as the caller sent them.
///
/// # Invariants
/// - Values are forwarded byte-for-byte; re-formatting would break the
///   authority's signature check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedParams {
    /// Opaque caller signature.
    pub hash: String,
    /// Timestamp text.
    pub timestamp: String,
    /// Calling application identifier.
    pub app_id: String,
    /// User identifier text.
    pub user: String,
}

impl SignedParams {
    /// Creates signed parameters from any displayable field values.
    #[must_use]
    pub fn new(
        hash: impl Into<String>,
        timestamp: impl ToString,
        app_id: impl Into<String>,
        user: impl ToString,
    ) -> Self {
        Self {
            hash: hash.into(),
            timestamp: timestamp.to_string(),
            app_id: app_id.into(),
            user: user.to_string(),
        }
    }
}

/// Request whose signed fields passed every local precondition.
///
/// # Invariants
/// - `timestamp` is at or above the policy floor at validation time.
/// - `user` matches the route user identifier when one was present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    /// Raw signed parameters for forwarding.
    params: SignedParams,
    /// Parsed timestamp in UNIX seconds.
    timestamp: i64,
    /// Parsed user identifier.
    user: i64,
    /// Route path of the inbound request.
    path: String,
}

impl ValidatedRequest {
    /// Assembles a validated request; only the validator constructs these.
    pub(crate) const fn new(params: SignedParams, timestamp: i64, user: i64, path: String) -> Self {
        Self {
            params,
            timestamp,
            user,
            path,
        }
    }

    /// Returns the raw signed parameters.
    #[must_use]
    pub const fn params(&self) -> &SignedParams {
        &self.params
    }

    /// Returns the parsed timestamp.
    #[must_use]
    pub const fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Returns the parsed user identifier.
    #[must_use]
    pub const fn user(&self) -> i64 {
        self.user
    }

    /// Returns the calling application identifier.
    #[must_use]
    pub fn app_id(&self) -> &str {
        &self.params.app_id
    }

    /// Returns the route path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}
