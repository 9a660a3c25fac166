// crates/authority-gate-core/tests/proptest_validation.rs
// ============================================================================
// Module: Validation Property-Based Tests
// Description: Property tests for validation and canonical query stability.
// Purpose: Detect panics and invariant breaks across wide input ranges.
// ============================================================================

//! Property-based tests for request validation invariants.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use authority_gate_core::AuthRequest;
use authority_gate_core::CanonicalQuery;
use authority_gate_core::DEFAULT_MIN_TIMESTAMP;
use authority_gate_core::RejectReason;
use authority_gate_core::ValidationPolicy;
use authority_gate_core::interpret_body;
use authority_gate_core::validate_request;
use proptest::prelude::*;

fn optional_field() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        ".{0,12}".prop_map(Some),
        any::<i64>().prop_map(|v| Some(v.to_string())),
    ]
}

proptest! {
    #[test]
    fn validation_never_panics(
        hash in optional_field(),
        timestamp in optional_field(),
        app_id in optional_field(),
        user in optional_field(),
        route_user_id in optional_field(),
    ) {
        let request = AuthRequest {
            hash,
            timestamp,
            app_id,
            user,
            route_user_id,
            path: "/p".to_string(),
        };
        let first = validate_request(&request, &ValidationPolicy::default());
        let second = validate_request(&request, &ValidationPolicy::default());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn timestamps_below_floor_always_reject(offset in 1_i64..1_000_000_000) {
        let request = AuthRequest {
            hash: Some("h".to_string()),
            timestamp: Some((DEFAULT_MIN_TIMESTAMP - offset).to_string()),
            app_id: Some("a".to_string()),
            user: Some("1".to_string()),
            route_user_id: None,
            path: String::new(),
        };
        prop_assert_eq!(
            validate_request(&request, &ValidationPolicy::default()),
            Err(RejectReason::InvalidTimestamp)
        );
    }

    #[test]
    fn matching_users_accept_and_differing_users_reject(a in any::<i64>(), b in any::<i64>()) {
        let request = AuthRequest {
            hash: Some("h".to_string()),
            timestamp: Some(DEFAULT_MIN_TIMESTAMP.to_string()),
            app_id: Some("a".to_string()),
            user: Some(a.to_string()),
            route_user_id: Some(b.to_string()),
            path: String::new(),
        };
        let result = validate_request(&request, &ValidationPolicy::default());
        if a == b {
            prop_assert!(result.is_ok());
        } else {
            prop_assert_eq!(result, Err(RejectReason::UserMismatch));
        }
    }

    #[test]
    fn canonical_query_keeps_values_verbatim(
        hash in "[A-Za-z0-9]{1,16}",
        timestamp in DEFAULT_MIN_TIMESTAMP..i64::MAX,
        app_id in "[a-z]{1,8}",
        user in any::<i64>(),
    ) {
        let request = AuthRequest {
            hash: Some(hash.clone()),
            timestamp: Some(timestamp.to_string()),
            app_id: Some(app_id.clone()),
            user: Some(user.to_string()),
            route_user_id: None,
            path: String::new(),
        };
        let validated = validate_request(&request, &ValidationPolicy::default()).unwrap();
        let query = CanonicalQuery::primary(validated.params()).to_string();
        prop_assert_eq!(
            query,
            format!("hash={hash}&timestamp={timestamp}&app_id={app_id}&user={user}")
        );
    }

    #[test]
    fn interpretation_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let _ = interpret_body(&bytes);
    }
}
