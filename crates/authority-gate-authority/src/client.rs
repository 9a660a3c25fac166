// crates/authority-gate-authority/src/client.rs
// ============================================================================
// Module: Authority Client
// Description: Outbound HTTP delegation to the remote authority.
// Purpose: Map one authority exchange onto exactly one typed verdict.
// Dependencies: async-trait, authority-gate-config, authority-gate-core, reqwest
// ============================================================================

//! ## Overview
//! The authority is addressed as
//! `{scheme}://{host}:{port}{path}?return={marker}&{canonical query}`. The
//! primary check is a GET; payload authorization is a POST of the
//! form-encoded payload with the route path appended to the query.
//!
//! Every call runs under a single deadline covering connect, send and body
//! read. On expiry the in-flight exchange is dropped, which cancels it and
//! releases its connection. Status mapping: 403 denies, any other non-2xx
//! status is unreachable, and 2xx bodies are interpreted as JSON.
//! Security posture: the authority is a trust boundary; redirects are not
//! followed and response bodies are size capped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use authority_gate_config::AuthorityConfig;
use authority_gate_core::AuthorityVerdict;
use authority_gate_core::CanonicalQuery;
use authority_gate_core::DenyReason;
use authority_gate_core::Payload;
use authority_gate_core::UnreachableReason;
use authority_gate_core::interpret_body;
use authority_gate_core::payload::FORM_CONTENT_TYPE;
use bytes::Bytes;
use bytes::BytesMut;
use reqwest::Client;
use reqwest::RequestBuilder;
use reqwest::Response;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use thiserror::Error;
use tokio::time::Instant;
use tokio::time::timeout_at;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Query key carrying the return marker.
const RETURN_PARAM: &str = "return";

// ============================================================================
// SECTION: Public Types
// ============================================================================

/// Remote authority interface.
#[async_trait]
pub trait AuthorityClient: Send + Sync {
    /// Asks the authority whether the signed query is authorized.
    async fn authorize_primary(&self, query: &CanonicalQuery) -> AuthorityVerdict;

    /// Asks the authority whether the payload is authorized for the route.
    async fn authorize_payload(&self, query: &CanonicalQuery, payload: &Payload)
    -> AuthorityVerdict;
}

/// HTTP-backed authority client.
pub struct HttpAuthorityClient {
    /// Endpoint URL without query string.
    endpoint: String,
    /// Value of the leading `return` query parameter.
    return_marker: String,
    /// Whole-call deadline.
    timeout: Duration,
    /// Maximum accepted response body size.
    max_response_bytes: usize,
    /// HTTP client configured without redirects or connection reuse.
    client: Client,
}

impl HttpAuthorityClient {
    /// Builds a client from validated authority configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorityClientError`] when the HTTP client cannot be built.
    pub fn from_config(config: &AuthorityConfig) -> Result<Self, AuthorityClientError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(Policy::none())
            .pool_max_idle_per_host(0)
            .connect_timeout(config.timeout())
            .timeout(config.timeout())
            .build()
            .map_err(|err| AuthorityClientError::Build(err.to_string()))?;
        Ok(Self {
            endpoint: config.endpoint(),
            return_marker: config.return_marker.clone(),
            timeout: config.timeout(),
            max_response_bytes: config.max_response_bytes,
            client,
        })
    }

    /// Returns the endpoint URL without query string.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Starts a delegation for the given canonical query.
    fn begin(&self, query: &CanonicalQuery) -> PendingDelegation {
        PendingDelegation {
            url: format!("{}?{RETURN_PARAM}={}&{query}", self.endpoint, self.return_marker),
            deadline: Instant::now() + self.timeout,
        }
    }

    /// Sends the request and reduces the response to a verdict.
    async fn exchange(&self, request: RequestBuilder) -> AuthorityVerdict {
        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => return AuthorityVerdict::Unreachable(classify_error(&err)),
        };
        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            return AuthorityVerdict::Denied(DenyReason::Forbidden);
        }
        if !status.is_success() {
            return AuthorityVerdict::Unreachable(UnreachableReason::UnexpectedStatus(
                status.as_u16(),
            ));
        }
        match read_limited(response, self.max_response_bytes).await {
            Ok(body) => interpret_body(&body),
            Err(reason) => AuthorityVerdict::Unreachable(reason),
        }
    }
}

#[async_trait]
impl AuthorityClient for HttpAuthorityClient {
    async fn authorize_primary(&self, query: &CanonicalQuery) -> AuthorityVerdict {
        let pending = self.begin(query);
        let request = self.client.get(pending.url.as_str());
        pending.settle(self.exchange(request)).await
    }

    async fn authorize_payload(
        &self,
        query: &CanonicalQuery,
        payload: &Payload,
    ) -> AuthorityVerdict {
        let pending = self.begin(query);
        let request = self
            .client
            .post(pending.url.as_str())
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(payload.to_form_body());
        pending.settle(self.exchange(request)).await
    }
}

// ============================================================================
// SECTION: Pending Delegation
// ============================================================================

/// One in-flight authority call.
///
/// # Invariants
/// - Resolves to exactly one verdict.
/// - The exchange future is dropped at the deadline, cancelling the call.
struct PendingDelegation {
    /// Fully assembled authority URL.
    url: String,
    /// Instant after which the call resolves as a timeout.
    deadline: Instant,
}

impl PendingDelegation {
    /// Drives the exchange to completion or to the deadline.
    async fn settle<F>(self, exchange: F) -> AuthorityVerdict
    where
        F: Future<Output = AuthorityVerdict>,
    {
        timeout_at(self.deadline, exchange)
            .await
            .unwrap_or(AuthorityVerdict::Unreachable(UnreachableReason::Timeout))
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Authority client construction failures.
#[derive(Debug, Error)]
pub enum AuthorityClientError {
    /// The HTTP client could not be built.
    #[error("authority client build failed: {0}")]
    Build(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Classifies a transport failure.
fn classify_error(error: &reqwest::Error) -> UnreachableReason {
    if error.is_timeout() { UnreachableReason::Timeout } else { UnreachableReason::Transport }
}

/// Reads the response body, failing once it exceeds `max_bytes`.
async fn read_limited(
    mut response: Response,
    max_bytes: usize,
) -> Result<Bytes, UnreachableReason> {
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    if response.content_length().is_some_and(|length| length > limit) {
        return Err(UnreachableReason::ResponseTooLarge);
    }
    let mut body = BytesMut::new();
    while let Some(chunk) = response.chunk().await.map_err(|err| classify_error(&err))? {
        if body.len().saturating_add(chunk.len()) > max_bytes {
            return Err(UnreachableReason::ResponseTooLarge);
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body.freeze())
}

#[cfg(test)]
mod tests;
