//! Unsigned JSON Web Tokens for test authentication.
//!
//! Tokens produced here carry the JOSE header `{"alg":"none","typ":"JWT"}`
//! and an empty signature segment, so they are only accepted by validators
//! configured to skip signature checks. They exist so a test host can
//! authenticate requests with arbitrary claims without managing keys.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{Map, Value};

mod payload;
pub use payload::{payload_from_claims, TokenTimes};

/// JOSE header used for every unsigned token.
pub const UNSIGNED_HEADER: &str = r#"{"alg":"none","typ":"JWT"}"#;

/// Errors raised while decoding an unsigned token.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token must have 3 segments, found {0}")]
    SegmentCount(usize),

    #[error("invalid base64url in token {segment}: {source}")]
    Encoding {
        segment: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    #[error("invalid JSON in token {segment}: {source}")]
    Json {
        segment: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("token {0} must be a JSON object")]
    NotAnObject(&'static str),
}

/// A decoded token: the JOSE header and the claims payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedToken {
    pub header: Map<String, Value>,
    pub payload: Map<String, Value>,
}

impl DecodedToken {
    /// Value of the `alg` header member, if any.
    #[must_use]
    pub fn algorithm(&self) -> Option<&str> {
        self.header.get("alg").and_then(Value::as_str)
    }
}

/// Encode bytes as base64url (RFC 4648) without padding.
#[must_use]
pub fn encode_base64url(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Encode a claims payload as an unsigned token (`header.payload.`).
#[must_use]
pub fn encode_unsigned(payload: &Map<String, Value>) -> String {
    // A Map<String, Value> always serializes.
    let body = Value::Object(payload.clone()).to_string();
    format!(
        "{}.{}.",
        encode_base64url(UNSIGNED_HEADER.as_bytes()),
        encode_base64url(body.as_bytes())
    )
}

/// Decode a token without verifying its signature.
///
/// Any signature segment is ignored, so signed tokens decode as well.
///
/// # Errors
/// Returns `TokenError` if the token does not have three segments or if the
/// header or payload is not base64url-encoded JSON object text.
pub fn decode_unsigned(token: &str) -> Result<DecodedToken, TokenError> {
    let segments: Vec<&str> = token.trim().split('.').collect();
    if segments.len() != 3 {
        return Err(TokenError::SegmentCount(segments.len()));
    }

    Ok(DecodedToken {
        header: decode_segment(segments[0], "header")?,
        payload: decode_segment(segments[1], "payload")?,
    })
}

fn decode_segment(
    encoded: &str,
    segment: &'static str,
) -> Result<Map<String, Value>, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(encoded.trim_end_matches('='))
        .map_err(|source| TokenError::Encoding { segment, source })?;
    match serde_json::from_slice(&bytes).map_err(|source| TokenError::Json { segment, source })? {
        Value::Object(map) => Ok(map),
        _ => Err(TokenError::NotAnObject(segment)),
    }
}
