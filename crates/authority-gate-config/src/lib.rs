// crates/authority-gate-config/src/lib.rs
// ============================================================================
// Module: Authority Gate Config Library
// Description: Canonical config model and fail-closed validation.
// Purpose: Single source of truth for authority-gate.toml semantics.
// Dependencies: authority-gate-core, serde, toml
// ============================================================================

//! ## Overview
//! `authority-gate-config` defines the configuration model for the authority
//! gate: where the remote authority lives, how long a delegation may take,
//! the local validation floor, payload delegation, and the audit sink.
//!
//! Security posture: config inputs are untrusted; every value is bounded and
//! any invalid setting aborts loading.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
