// crates/authority-gate-core/src/canonical.rs
// ============================================================================
// Module: Authority Gate Canonical Query
// Description: Fixed-order `key=value` query construction for delegation.
// Purpose: Produce the exact query the authority checks the signature over.
// Dependencies: (none beyond std)
// ============================================================================

//! ## Overview
//! The canonical query is the ordered pair sequence
//! `hash, timestamp, app_id, user` (plus `path` for payload delegation). The
//! order is part of the authority contract. Values are concatenated as-is with
//! no escaping; they are assumed to already be URL-safe.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use crate::request::APP_ID_PARAM;
use crate::request::HASH_PARAM;
use crate::request::SignedParams;
use crate::request::TIMESTAMP_PARAM;
use crate::request::USER_PARAM;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Query key carrying the original route path for payload delegation.
pub const PATH_PARAM: &str = "path";

// ============================================================================
// SECTION: Canonical Query
// ============================================================================

/// Ordered `key=value` pairs sent to the authority.
///
/// # Invariants
/// - Pair order is `hash, timestamp, app_id, user[, path]`.
/// - Values are never escaped or re-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalQuery {
    /// Ordered pairs in contract order.
    pairs: Vec<(&'static str, String)>,
}

impl CanonicalQuery {
    /// Builds the primary authorization query.
    #[must_use]
    pub fn primary(params: &SignedParams) -> Self {
        Self {
            pairs: vec![
                (HASH_PARAM, params.hash.clone()),
                (TIMESTAMP_PARAM, params.timestamp.clone()),
                (APP_ID_PARAM, params.app_id.clone()),
                (USER_PARAM, params.user.clone()),
            ],
        }
    }

    /// Builds the payload authorization query, appending the route path.
    #[must_use]
    pub fn payload(params: &SignedParams, path: &str) -> Self {
        let mut query = Self::primary(params);
        query.pairs.push((PATH_PARAM, path.to_string()));
        query
    }

    /// Returns the ordered pairs.
    #[must_use]
    pub fn pairs(&self) -> &[(&'static str, String)] {
        &self.pairs
    }
}

impl fmt::Display for CanonicalQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (key, value)) in self.pairs.iter().enumerate() {
            if index > 0 {
                f.write_str("&")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}
