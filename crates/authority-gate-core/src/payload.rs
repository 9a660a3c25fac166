// crates/authority-gate-core/src/payload.rs
// ============================================================================
// Module: Authority Gate Payloads
// Description: Request body model forwarded for payload authorization.
// Purpose: Normalize inbound bodies into a form-encoded delegation body.
// Dependencies: serde_json, thiserror, url
// ============================================================================

//! ## Overview
//! Payload delegation forwards the inbound body to the authority as an
//! `application/x-www-form-urlencoded` body. Form bodies are forwarded pair
//! for pair; JSON objects are flattened one level, with string values kept
//! verbatim, `null` as an empty value, and any other value as compact JSON.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use thiserror::Error;
use url::form_urlencoded;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Content type used for forwarded payload bodies.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

// ============================================================================
// SECTION: Payload
// ============================================================================

/// Inbound request body normalized for delegation.
///
/// # Invariants
/// - Form pair order is preserved from the source body; JSON keys follow
///   the sorted order of the parsed object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Payload {
    /// No body, or a body with no forwardable content.
    #[default]
    Empty,
    /// Ordered key/value pairs.
    Form(Vec<(String, String)>),
}

impl Payload {
    /// Parses a form-encoded body.
    #[must_use]
    pub fn from_form_bytes(bytes: &[u8]) -> Self {
        let pairs: Vec<(String, String)> = form_urlencoded::parse(bytes).into_owned().collect();
        if pairs.is_empty() { Self::Empty } else { Self::Form(pairs) }
    }

    /// Parses a JSON body, flattening the top-level object.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError`] when the bytes are not JSON or the document
    /// is not an object.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, PayloadError> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|err| PayloadError::Json(err.to_string()))?;
        let Value::Object(fields) = value else {
            return Err(PayloadError::NotAnObject);
        };
        let pairs: Vec<(String, String)> =
            fields.into_iter().map(|(key, value)| (key, flatten_value(value))).collect();
        if pairs.is_empty() { Ok(Self::Empty) } else { Ok(Self::Form(pairs)) }
    }

    /// Returns the payload pairs.
    #[must_use]
    pub fn pairs(&self) -> &[(String, String)] {
        match self {
            Self::Empty => &[],
            Self::Form(pairs) => pairs,
        }
    }

    /// Encodes the payload as a form-urlencoded body.
    #[must_use]
    pub fn to_form_body(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        serializer.extend_pairs(self.pairs());
        serializer.finish()
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Payload normalization failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    /// Body was not valid JSON.
    #[error("payload is not valid json: {0}")]
    Json(String),
    /// JSON body was not an object.
    #[error("payload json must be an object")]
    NotAnObject,
    /// Non-empty body with a media type that cannot be forwarded as a form.
    #[error("unsupported payload media type: {0}")]
    UnsupportedMediaType(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Converts a JSON value into its form field representation.
fn flatten_value(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for payload normalization.
    #![allow(clippy::unwrap_used, reason = "Test-only assertions use unwrap for clarity.")]

    use super::Payload;
    use super::PayloadError;

    #[test]
    fn json_object_flattens_scalars() {
        let payload =
            Payload::from_json_bytes(br#"{"title":"a b","count":2,"draft":false,"note":null}"#)
                .unwrap();
        assert_eq!(payload.to_form_body(), "count=2&draft=false&note=&title=a+b");
    }

    #[test]
    fn json_nested_values_become_compact_json() {
        let payload = Payload::from_json_bytes(br#"{"tags":["x","y"]}"#).unwrap();
        assert_eq!(payload.pairs(), &[("tags".to_string(), r#"["x","y"]"#.to_string())]);
    }

    #[test]
    fn json_non_object_rejected() {
        assert_eq!(Payload::from_json_bytes(b"[1,2]"), Err(PayloadError::NotAnObject));
        assert!(matches!(Payload::from_json_bytes(b"{nope"), Err(PayloadError::Json(_))));
    }

    #[test]
    fn form_body_round_trips_encoding() {
        let payload = Payload::from_form_bytes(b"a=1&b=hello%20world");
        assert_eq!(payload.to_form_body(), "a=1&b=hello+world");
    }

    #[test]
    fn empty_inputs_are_empty_payloads() {
        assert_eq!(Payload::from_form_bytes(b""), Payload::Empty);
        assert_eq!(Payload::from_json_bytes(b"{}").unwrap(), Payload::Empty);
        assert_eq!(Payload::Empty.to_form_body(), "");
    }
}
