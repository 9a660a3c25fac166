// crates/authority-gate-authority/src/scheme.rs
// ============================================================================
// Module: Authority Gate Scheme
// Description: Decision coordinator for signed-query authentication.
// Purpose: Sequence local validation, delegation, and payload authorization.
// Dependencies: authority-gate-config, authority-gate-core, thiserror
// ============================================================================

//! ## Overview
//! [`AuthScheme`] is built once at startup and shared by handle. For each
//! request it validates locally, and only when every check passes asks the
//! remote authority for a decision. A second, optional stage authorizes the
//! request payload; it accepts only an [`Authenticated`] value, which can
//! only come from a successful [`AuthScheme::authenticate`].
//!
//! Security posture: every failure is terminal for the request. Remote
//! failures share one outward message so callers cannot tell a denial from
//! an outage.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Instant;

use authority_gate_config::GateConfig;
use authority_gate_config::GatePolicyConfig;
use authority_gate_core::AuthRequest;
use authority_gate_core::AuthorityVerdict;
use authority_gate_core::CanonicalQuery;
use authority_gate_core::Credentials;
use authority_gate_core::DenyReason;
use authority_gate_core::Payload;
use authority_gate_core::RejectReason;
use authority_gate_core::UnreachableReason;
use authority_gate_core::ValidatedRequest;
use authority_gate_core::validate_request;
use thiserror::Error;

use crate::audit::GateAuditEvent;
use crate::audit::GateAuditSink;
use crate::audit::NoopGateAuditSink;
use crate::audit::audit_sink_from_config;
use crate::client::AuthorityClient;
use crate::client::AuthorityClientError;
use crate::client::HttpAuthorityClient;
use crate::telemetry::GateMetricEvent;
use crate::telemetry::GateMetrics;
use crate::telemetry::GateOutcome;
use crate::telemetry::GateStage;
use crate::telemetry::NoopMetrics;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Outward message for every remote failure.
pub const NOT_AUTHORIZED_MESSAGE: &str = "Not authorized";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Proof that a request passed local validation and primary delegation.
///
/// # Invariants
/// - Only [`AuthScheme::authenticate`] constructs this value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authenticated {
    /// Validated request fields.
    request: ValidatedRequest,
    /// Credentials returned by the authority.
    credentials: Credentials,
}

impl Authenticated {
    /// Returns the validated request.
    #[must_use]
    pub const fn request(&self) -> &ValidatedRequest {
        &self.request
    }

    /// Returns the primary-stage credentials.
    #[must_use]
    pub const fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Consumes the value, returning the credentials.
    #[must_use]
    pub fn into_credentials(self) -> Credentials {
        self.credentials
    }
}

/// Coordinator for local validation and remote delegation.
pub struct AuthScheme {
    /// Validation floor and payload settings.
    gate: GatePolicyConfig,
    /// Remote authority.
    client: Arc<dyn AuthorityClient>,
    /// Decision audit sink.
    audit: Arc<dyn GateAuditSink>,
    /// Decision metrics sink.
    metrics: Arc<dyn GateMetrics>,
}

impl AuthScheme {
    /// Creates a scheme with no-op audit and metrics sinks.
    #[must_use]
    pub fn new(gate: GatePolicyConfig, client: Arc<dyn AuthorityClient>) -> Self {
        Self {
            gate,
            client,
            audit: Arc::new(NoopGateAuditSink),
            metrics: Arc::new(NoopMetrics),
        }
    }

    /// Builds a scheme backed by the HTTP authority client and the configured
    /// audit sink.
    ///
    /// # Errors
    ///
    /// Returns [`GateSetupError`] when the client or audit sink cannot be
    /// built.
    pub fn from_config(config: &GateConfig) -> Result<Self, GateSetupError> {
        let client = HttpAuthorityClient::from_config(&config.authority)?;
        let audit = audit_sink_from_config(&config.audit)
            .map_err(|err| GateSetupError::Audit(err.to_string()))?;
        Ok(Self::new(config.gate, Arc::new(client)).with_audit(audit))
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn GateAuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Replaces the metrics sink.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn GateMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Returns true when payload authorization is enabled.
    #[must_use]
    pub const fn payload_delegation(&self) -> bool {
        self.gate.payload_delegation
    }

    /// Returns the maximum payload body size buffered for delegation.
    #[must_use]
    pub const fn max_payload_bytes(&self) -> usize {
        self.gate.max_payload_bytes
    }

    /// Authenticates a signed request.
    ///
    /// Local checks run first; the authority is contacted only when all of
    /// them pass.
    ///
    /// # Errors
    ///
    /// Returns [`GateError`] when validation fails or the authority does not
    /// allow the request.
    pub async fn authenticate(&self, request: &AuthRequest) -> Result<Authenticated, GateError> {
        let started = Instant::now();
        let validated = match validate_request(request, &self.gate.validation_policy()) {
            Ok(validated) => validated,
            Err(reason) => {
                self.audit.record(&GateAuditEvent::rejected(request, reason));
                let error = GateError::Rejected(reason);
                self.record_metric(GateStage::Primary, Some(&error), started);
                return Err(error);
            }
        };
        let query = CanonicalQuery::primary(validated.params());
        let verdict = self.client.authorize_primary(&query).await;
        let credentials = self.conclude(GateStage::Primary, &validated, verdict, started)?;
        Ok(Authenticated {
            request: validated,
            credentials,
        })
    }

    /// Authorizes the payload of an already authenticated request.
    ///
    /// # Errors
    ///
    /// Returns [`GateError`] when the authority does not allow the payload.
    pub async fn authorize_payload(
        &self,
        authenticated: &Authenticated,
        payload: &Payload,
    ) -> Result<Credentials, GateError> {
        let started = Instant::now();
        let request = authenticated.request();
        let query = CanonicalQuery::payload(request.params(), request.path());
        let verdict = self.client.authorize_payload(&query, payload).await;
        self.conclude(GateStage::Payload, request, verdict, started)
    }

    /// Records the verdict and maps it onto the stage result.
    fn conclude(
        &self,
        stage: GateStage,
        request: &ValidatedRequest,
        verdict: AuthorityVerdict,
        started: Instant,
    ) -> Result<Credentials, GateError> {
        match verdict {
            AuthorityVerdict::Authorized(credentials) => {
                self.audit.record(&GateAuditEvent::allowed(stage, request));
                self.record_metric(stage, None, started);
                Ok(credentials)
            }
            AuthorityVerdict::Denied(reason) => {
                Err(self.refuse(stage, request, GateError::Denied(reason), started))
            }
            AuthorityVerdict::Unreachable(reason) => {
                Err(self.refuse(stage, request, GateError::Unreachable(reason), started))
            }
        }
    }

    /// Records a remote refusal and returns the error.
    fn refuse(
        &self,
        stage: GateStage,
        request: &ValidatedRequest,
        error: GateError,
        started: Instant,
    ) -> GateError {
        self.audit.record(&GateAuditEvent::denied(stage, request, &error));
        self.record_metric(stage, Some(&error), started);
        error
    }

    /// Emits one metric event for a finished stage.
    fn record_metric(&self, stage: GateStage, error: Option<&GateError>, started: Instant) {
        let event = GateMetricEvent {
            stage,
            outcome: error.map_or(GateOutcome::Allowed, GateError::outcome),
            reason: error.map(GateError::reason_label),
        };
        self.metrics.record_decision(event, started.elapsed());
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Terminal gate failure for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GateError {
    /// A local precondition failed.
    #[error("request rejected: {0}")]
    Rejected(RejectReason),
    /// The authority explicitly denied the request.
    #[error("authority denied: {0}")]
    Denied(DenyReason),
    /// The authority could not be reached or understood.
    #[error("authority unreachable: {0}")]
    Unreachable(UnreachableReason),
}

impl GateError {
    /// Returns the message safe to show the caller.
    ///
    /// Local rejections carry their reason; remote failures collapse to
    /// [`NOT_AUTHORIZED_MESSAGE`].
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Rejected(reason) => reason.to_string(),
            Self::Denied(_) | Self::Unreachable(_) => NOT_AUTHORIZED_MESSAGE.to_string(),
        }
    }

    /// Returns the outcome classification.
    #[must_use]
    pub const fn outcome(&self) -> GateOutcome {
        match self {
            Self::Rejected(_) => GateOutcome::Rejected,
            Self::Denied(_) => GateOutcome::Denied,
            Self::Unreachable(_) => GateOutcome::Unreachable,
        }
    }

    /// Returns the internal reason label.
    #[must_use]
    pub const fn reason_label(&self) -> &'static str {
        match self {
            Self::Rejected(reason) => reason.as_str(),
            Self::Denied(reason) => reason.as_str(),
            Self::Unreachable(reason) => reason.as_str(),
        }
    }
}

/// Scheme construction failures.
#[derive(Debug, Error)]
pub enum GateSetupError {
    /// The authority client could not be built.
    #[error(transparent)]
    Client(#[from] AuthorityClientError),
    /// The audit sink could not be opened.
    #[error("audit sink unavailable: {0}")]
    Audit(String),
}
