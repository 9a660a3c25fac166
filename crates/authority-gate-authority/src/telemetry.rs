// crates/authority-gate-authority/src/telemetry.rs
// ============================================================================
// Module: Authority Gate Telemetry
// Description: Observability hooks for gate decisions.
// Purpose: Provide metric events and latency buckets without hard deps.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A thin metrics interface for gate decision counters and latency
//! histograms. Deployments plug in their own exporter by implementing
//! [`GateMetrics`]. Labels are stable strings and never carry request
//! values, so signatures and user identifiers cannot leak into metrics.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default latency buckets in milliseconds for gate decision histograms.
pub const GATE_LATENCY_BUCKETS_MS: &[u64] =
    &[1, 2, 5, 10, 25, 50, 100, 250, 500, 1_000, 2_000, 3_000, 5_000, 10_000, 30_000];

// ============================================================================
// SECTION: Metric Labels
// ============================================================================

/// Decision stage.
///
/// # Invariants
/// - Variants are stable for telemetry labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStage {
    /// Signed query authentication.
    Primary,
    /// Payload authorization for an authenticated request.
    Payload,
}

impl GateStage {
    /// Returns a stable label for the stage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Payload => "payload",
        }
    }
}

/// Decision outcome classification.
///
/// # Invariants
/// - Variants are stable for telemetry labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateOutcome {
    /// The authority allowed the request.
    Allowed,
    /// A local precondition failed; no network call was made.
    Rejected,
    /// The authority denied the request.
    Denied,
    /// The authority could not be reached or understood.
    Unreachable,
}

impl GateOutcome {
    /// Returns a stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allowed => "allowed",
            Self::Rejected => "rejected",
            Self::Denied => "denied",
            Self::Unreachable => "unreachable",
        }
    }
}

/// Gate decision metric event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateMetricEvent {
    /// Decision stage.
    pub stage: GateStage,
    /// Decision outcome.
    pub outcome: GateOutcome,
    /// Internal reason label for non-allow outcomes.
    pub reason: Option<&'static str>,
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Metrics sink for gate decisions.
pub trait GateMetrics: Send + Sync {
    /// Records one decision and how long it took.
    fn record_decision(&self, event: GateMetricEvent, latency: Duration);
}

/// No-op metrics sink.
///
/// # Invariants
/// - Metrics are intentionally discarded.
pub struct NoopMetrics;

impl GateMetrics for NoopMetrics {
    fn record_decision(&self, _event: GateMetricEvent, _latency: Duration) {}
}
