// crates/authority-gate-authority/src/host.rs
// ============================================================================
// Module: Authority Gate Host Integration
// Description: axum middleware that gates routes on signed queries.
// Purpose: Bridge HTTP requests into the scheme and its 401 responses.
// Dependencies: axum, authority-gate-core, serde_json
// ============================================================================

//! ## Overview
//! [`require_signed_query`] authenticates every request that reaches a
//! protected route and stores the [`Authenticated`] value in the request
//! extensions. [`delegate_payload`] runs after it, buffers the body and asks
//! the authority to authorize the payload; the buffered body is restored for
//! the handler. [`protect`] installs both layers in that order.
//!
//! Failures respond `401 Unauthorized` with
//! `{"statusCode":401,"error":"Unauthorized","message":...}`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use authority_gate_core::AuthRequest;
use authority_gate_core::Credentials;
use authority_gate_core::Payload;
use authority_gate_core::PayloadError;
use authority_gate_core::payload::FORM_CONTENT_TYPE;
use authority_gate_core::request::ROUTE_USER_PARAM;
use axum::Json;
use axum::Router;
use axum::body::Body;
use axum::body::Bytes;
use axum::extract::FromRequestParts;
use axum::extract::RawPathParams;
use axum::extract::Request;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::middleware::from_fn_with_state;
use axum::response::IntoResponse;
use axum::response::Response;
use serde_json::json;

use crate::scheme::AuthScheme;
use crate::scheme::Authenticated;
use crate::scheme::NOT_AUTHORIZED_MESSAGE;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Credentials returned by the payload authorization stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadCredentials(pub Credentials);

// ============================================================================
// SECTION: Middleware
// ============================================================================

/// Authenticates the signed query of a routed request.
pub async fn require_signed_query(
    State(scheme): State<Arc<AuthScheme>>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();
    let auth_request = auth_request_from_parts(&mut parts).await;
    match scheme.authenticate(&auth_request).await {
        Ok(authenticated) => {
            parts.extensions.insert(authenticated);
            next.run(Request::from_parts(parts, body)).await
        }
        Err(error) => unauthorized(&error.public_message()),
    }
}

/// Authorizes the body of an authenticated request.
///
/// Requests without an [`Authenticated`] extension are refused without
/// contacting the authority.
pub async fn delegate_payload(
    State(scheme): State<Arc<AuthScheme>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(authenticated) = request.extensions().get::<Authenticated>().cloned() else {
        return unauthorized(NOT_AUTHORIZED_MESSAGE);
    };
    let (mut parts, body) = request.into_parts();
    let Ok(bytes) = axum::body::to_bytes(body, scheme.max_payload_bytes()).await else {
        return unauthorized(NOT_AUTHORIZED_MESSAGE);
    };
    let Ok(payload) = payload_from_body(&parts.headers, &bytes) else {
        return unauthorized(NOT_AUTHORIZED_MESSAGE);
    };
    match scheme.authorize_payload(&authenticated, &payload).await {
        Ok(credentials) => {
            parts.extensions.insert(PayloadCredentials(credentials));
            next.run(Request::from_parts(parts, Body::from(bytes))).await
        }
        Err(error) => unauthorized(&error.public_message()),
    }
}

/// Gates every route of `router` behind the scheme.
///
/// The payload stage is installed only when payload delegation is enabled.
/// Layers apply to matched routes only, so unknown paths still 404.
pub fn protect<S>(router: Router<S>, scheme: Arc<AuthScheme>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let router = if scheme.payload_delegation() {
        router.route_layer(from_fn_with_state(Arc::clone(&scheme), delegate_payload))
    } else {
        router
    };
    router.route_layer(from_fn_with_state(scheme, require_signed_query))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds the raw request view from the URI and matched route parameters.
async fn auth_request_from_parts(parts: &mut Parts) -> AuthRequest {
    let route_user = RawPathParams::from_request_parts(parts, &()).await.ok().and_then(|params| {
        params
            .iter()
            .find(|(name, _)| *name == ROUTE_USER_PARAM)
            .map(|(_, value)| value.to_string())
    });
    let request =
        AuthRequest::from_query(parts.uri.query().unwrap_or_default()).with_path(parts.uri.path());
    match route_user {
        Some(route_user) => request.with_route_user_id(route_user),
        None => request,
    }
}

/// Derives the forwarded payload from the body and its content type.
///
/// A non-empty body is never forwarded as empty: media types other than form
/// and JSON fail, so the handler cannot see bytes the authority did not.
fn payload_from_body(headers: &HeaderMap, bytes: &Bytes) -> Result<Payload, PayloadError> {
    if bytes.is_empty() {
        return Ok(Payload::Empty);
    }
    let media_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_ascii_lowercase())
        .unwrap_or_default();
    if media_type == FORM_CONTENT_TYPE {
        Ok(Payload::from_form_bytes(bytes))
    } else if media_type == "application/json" || media_type.ends_with("+json") {
        Payload::from_json_bytes(bytes)
    } else {
        Err(PayloadError::UnsupportedMediaType(media_type))
    }
}

/// Builds the 401 response.
fn unauthorized(message: &str) -> Response {
    let body = json!({
        "statusCode": 401,
        "error": "Unauthorized",
        "message": message,
    });
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}
