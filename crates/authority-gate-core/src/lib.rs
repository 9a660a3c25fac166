// crates/authority-gate-core/src/lib.rs
// ============================================================================
// Module: Authority Gate Core Library
// Description: Request model, local validation, and verdict reduction.
// Purpose: Pure, deterministic building blocks for the authority gate.
// Dependencies: serde, serde_json, thiserror, url
// ============================================================================

//! ## Overview
//! `authority-gate-core` holds the pure half of the signed-query gate: the raw
//! request view, the ordered local precondition checks, canonical query
//! construction, payload form encoding, and reduction of authority responses
//! into a typed verdict. Nothing in this crate performs I/O, so every check can
//! run synchronously before any network call is considered.
//!
//! Security posture: request fields are untrusted and the `hash` signature is
//! never interpreted locally; it is forwarded verbatim to the remote authority.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod canonical;
pub mod payload;
pub mod request;
pub mod validation;
pub mod verdict;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use canonical::CanonicalQuery;
pub use payload::Payload;
pub use payload::PayloadError;
pub use request::AuthRequest;
pub use request::SignedParams;
pub use request::ValidatedRequest;
pub use validation::DEFAULT_MIN_TIMESTAMP;
pub use validation::RejectReason;
pub use validation::ValidationPolicy;
pub use validation::validate_request;
pub use verdict::AuthorityVerdict;
pub use verdict::Credentials;
pub use verdict::DenyReason;
pub use verdict::UnreachableReason;
pub use verdict::interpret_body;
pub use verdict::interpret_response;
