// crates/authority-gate-authority/src/client/tests.rs
// ============================================================================
// Module: Authority Client Tests
// Description: Unit tests for the HTTP authority client.
// Purpose: Validate URL assembly, status mapping, deadlines, and body caps.
// Dependencies: authority-gate-authority, axum
// ============================================================================

//! ## Overview
//! Exercises the HTTP authority client against in-memory axum servers that
//! stand in for the remote authority.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use authority_gate_config::AuthorityConfig;
use authority_gate_core::AuthorityVerdict;
use authority_gate_core::CanonicalQuery;
use authority_gate_core::DenyReason;
use authority_gate_core::Payload;
use authority_gate_core::SignedParams;
use authority_gate_core::UnreachableReason;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::Method;
use axum::http::StatusCode;
use axum::http::Uri;
use axum::http::header::CONTENT_LENGTH;
use axum::http::header::CONTENT_TYPE;
use axum::http::header::LOCATION;
use axum::http::header::USER_AGENT;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::any;
use serde_json::json;
use tokio::sync::oneshot;

use super::AuthorityClient;
use super::HttpAuthorityClient;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

#[derive(Default)]
struct RequestCapture {
    method: Option<Method>,
    query: Option<String>,
    content_type: Option<String>,
    content_length: Option<String>,
    user_agent: Option<String>,
    body: Vec<u8>,
    calls: usize,
}

struct StubAuthority {
    status: StatusCode,
    body: String,
    slow_user: Option<&'static str>,
    capture: Arc<Mutex<RequestCapture>>,
}

fn header_text(headers: &HeaderMap, name: axum::http::HeaderName) -> Option<String> {
    headers.get(name).and_then(|value| value.to_str().ok()).map(str::to_string)
}

async fn authority_handler(
    State(state): State<Arc<StubAuthority>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let query = uri.query().map(str::to_string);
    {
        let mut guard = state.capture.lock().expect("capture lock");
        guard.method = Some(method);
        guard.query.clone_from(&query);
        guard.content_type = header_text(&headers, CONTENT_TYPE);
        guard.content_length = header_text(&headers, CONTENT_LENGTH);
        guard.user_agent = header_text(&headers, USER_AGENT);
        guard.body = body.to_vec();
        guard.calls += 1;
    }
    if let (Some(slow), Some(query)) = (state.slow_user, query.as_deref())
        && query.contains(&format!("user={slow}"))
    {
        tokio::time::sleep(Duration::from_millis(750)).await;
    }
    if state.status == StatusCode::FOUND {
        return (state.status, [(LOCATION, "/elsewhere")]).into_response();
    }
    (state.status, state.body.clone()).into_response()
}

async fn spawn_authority(
    status: StatusCode,
    body: &str,
    slow_user: Option<&'static str>,
) -> (u16, Arc<Mutex<RequestCapture>>, oneshot::Sender<()>) {
    let capture = Arc::new(Mutex::new(RequestCapture::default()));
    let state = Arc::new(StubAuthority {
        status,
        body: body.to_string(),
        slow_user,
        capture: Arc::clone(&capture),
    });
    let app = Router::new().route("/auth", any(authority_handler)).with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await;
    });
    (addr.port(), capture, shutdown_tx)
}

fn config_for(port: u16) -> AuthorityConfig {
    AuthorityConfig {
        host: "127.0.0.1".to_string(),
        port,
        timeout_ms: 250,
        user_agent: "gate-test/1".to_string(),
        ..AuthorityConfig::default()
    }
}

fn client_for(port: u16) -> HttpAuthorityClient {
    HttpAuthorityClient::from_config(&config_for(port)).expect("client")
}

fn primary_query(user: &str) -> CanonicalQuery {
    CanonicalQuery::primary(&SignedParams::new("hfbdshfd", 1_390_595_898, "fdsfsdfd", user))
}

// ============================================================================
// SECTION: URL Assembly
// ============================================================================

#[test]
fn url_places_return_marker_before_canonical_query() {
    let client = client_for(8080);
    let pending = client.begin(&primary_query("2"));
    assert_eq!(
        pending.url,
        "http://127.0.0.1:8080/auth?return=API&hash=hfbdshfd&timestamp=1390595898&app_id=fdsfsdfd&user=2"
    );
}

#[test]
fn default_config_targets_documented_endpoint() {
    let client = HttpAuthorityClient::from_config(&AuthorityConfig::default()).expect("client");
    assert_eq!(client.endpoint(), "http://local.bloglovin.com:80/auth");
}

// ============================================================================
// SECTION: Primary Delegation
// ============================================================================

#[tokio::test]
async fn primary_sends_get_with_canonical_query() {
    let (port, capture, shutdown_tx) =
        spawn_authority(StatusCode::OK, r#"{"success":true}"#, None).await;
    let verdict = client_for(port).authorize_primary(&primary_query("2")).await;
    assert!(verdict.is_authorized());
    {
        let guard = capture.lock().expect("capture lock");
        assert_eq!(guard.method, Some(Method::GET));
        assert_eq!(
            guard.query.as_deref(),
            Some("return=API&hash=hfbdshfd&timestamp=1390595898&app_id=fdsfsdfd&user=2")
        );
        assert_eq!(guard.user_agent.as_deref(), Some("gate-test/1"));
    }
    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn success_body_yields_credentials_without_success_key() {
    let (port, _capture, shutdown_tx) =
        spawn_authority(StatusCode::OK, r#"{"success":true,"user_id":2,"scope":"all"}"#, None)
            .await;
    let verdict = client_for(port).authorize_primary(&primary_query("2")).await;
    let AuthorityVerdict::Authorized(credentials) = verdict else {
        panic!("expected authorized verdict");
    };
    assert_eq!(credentials.get("user_id"), Some(&json!(2)));
    assert_eq!(credentials.get("scope"), Some(&json!("all")));
    assert!(credentials.get("success").is_none());
    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn status_mappings_are_consistent() {
    for (status, body, expected) in [
        (
            StatusCode::FORBIDDEN,
            r#"{"success":true}"#,
            AuthorityVerdict::Denied(DenyReason::Forbidden),
        ),
        (
            StatusCode::OK,
            r#"{"success":false}"#,
            AuthorityVerdict::Denied(DenyReason::NotSuccessful),
        ),
        (StatusCode::OK, "{}", AuthorityVerdict::Denied(DenyReason::NotSuccessful)),
        (
            StatusCode::OK,
            "<html>not json</html>",
            AuthorityVerdict::Unreachable(UnreachableReason::MalformedResponse),
        ),
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"success":true}"#,
            AuthorityVerdict::Unreachable(UnreachableReason::UnexpectedStatus(500)),
        ),
        (
            StatusCode::UNAUTHORIZED,
            "",
            AuthorityVerdict::Unreachable(UnreachableReason::UnexpectedStatus(401)),
        ),
        (
            StatusCode::FOUND,
            "",
            AuthorityVerdict::Unreachable(UnreachableReason::UnexpectedStatus(302)),
        ),
    ] {
        let (port, capture, shutdown_tx) = spawn_authority(status, body, None).await;
        let verdict = client_for(port).authorize_primary(&primary_query("2")).await;
        assert_eq!(verdict, expected, "status {status}");
        assert_eq!(capture.lock().expect("capture lock").calls, 1, "status {status}");
        let _ = shutdown_tx.send(());
    }
}

#[tokio::test]
async fn oversized_body_is_unreachable() {
    let big = format!(r#"{{"success":true,"pad":"{}"}}"#, "x".repeat(256));
    let (port, _capture, shutdown_tx) = spawn_authority(StatusCode::OK, &big, None).await;
    let config = AuthorityConfig {
        max_response_bytes: 64,
        ..config_for(port)
    };
    let client = HttpAuthorityClient::from_config(&config).expect("client");
    let verdict = client.authorize_primary(&primary_query("2")).await;
    assert_eq!(verdict, AuthorityVerdict::Unreachable(UnreachableReason::ResponseTooLarge));
    let _ = shutdown_tx.send(());
}

// ============================================================================
// SECTION: Failure Paths
// ============================================================================

#[tokio::test]
async fn slow_authority_times_out_and_client_stays_usable() {
    let (port, _capture, shutdown_tx) =
        spawn_authority(StatusCode::OK, r#"{"success":true}"#, Some("99")).await;
    let client = client_for(port);
    let started = tokio::time::Instant::now();
    let verdict = client.authorize_primary(&primary_query("99")).await;
    assert_eq!(verdict, AuthorityVerdict::Unreachable(UnreachableReason::Timeout));
    assert!(started.elapsed() < Duration::from_millis(700));

    let verdict = client.authorize_primary(&primary_query("2")).await;
    assert!(verdict.is_authorized());
    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn refused_connection_is_unreachable() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);
    let verdict = client_for(port).authorize_primary(&primary_query("2")).await;
    assert_eq!(verdict, AuthorityVerdict::Unreachable(UnreachableReason::Transport));
}

// ============================================================================
// SECTION: Payload Delegation
// ============================================================================

#[tokio::test]
async fn payload_posts_form_body_with_path() {
    let (port, capture, shutdown_tx) =
        spawn_authority(StatusCode::OK, r#"{"success":true}"#, None).await;
    let params = SignedParams::new("hfbdshfd", 1_390_595_898, "fdsfsdfd", 2);
    let query = CanonicalQuery::payload(&params, "/users/2/posts");
    let payload = Payload::from_form_bytes(b"title=a+b&body=hi");
    let verdict = client_for(port).authorize_payload(&query, &payload).await;
    assert!(verdict.is_authorized());
    {
        let guard = capture.lock().expect("capture lock");
        assert_eq!(guard.method, Some(Method::POST));
        assert_eq!(
            guard.query.as_deref(),
            Some(
                "return=API&hash=hfbdshfd&timestamp=1390595898&app_id=fdsfsdfd&user=2&path=/users/2/posts"
            )
        );
        assert_eq!(guard.content_type.as_deref(), Some("application/x-www-form-urlencoded"));
        assert_eq!(guard.body, b"title=a+b&body=hi".to_vec());
        assert_eq!(guard.content_length.as_deref(), Some("17"));
    }
    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn payload_forbidden_denies() {
    let (port, _capture, shutdown_tx) = spawn_authority(StatusCode::FORBIDDEN, "", None).await;
    let params = SignedParams::new("h", 1_390_595_898, "a", 2);
    let verdict = client_for(port)
        .authorize_payload(&CanonicalQuery::payload(&params, "/p"), &Payload::Empty)
        .await;
    assert_eq!(verdict, AuthorityVerdict::Denied(DenyReason::Forbidden));
    let _ = shutdown_tx.send(());
}
