//! Bearer-token authentication for the application under test.
//!
//! The host issues tokens through an [`AccessTokenIssuer`] and the app checks
//! them through whichever [`TokenValidator`] is registered as a service. Test
//! hosts replace the app's validator with [`UnsignedTokenValidator`] so
//! tokens built from arbitrary claims are accepted.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{Duration, Utc};
use gt_jwt::{decode_unsigned, encode_unsigned, payload_from_claims, TokenTimes};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{Map, Value};

use crate::claims::ClaimsList;
use crate::services::ServiceCollection;

/// Lifetime of tokens issued by the default issuer, in seconds.
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 300;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("malformed token: {0}")]
    Malformed(#[from] gt_jwt::TokenError),

    #[error("token rejected: {0}")]
    Rejected(#[from] jsonwebtoken::errors::Error),
}

/// Creates the access token sent with each GraphQL request.
pub trait AccessTokenIssuer: Send + Sync {
    /// # Errors
    /// Returns an error if a token cannot be built from the claims.
    fn issue(&self, claims: &ClaimsList) -> Result<String, AuthError>;
}

/// Checks a bearer token and yields the claims it carries.
pub trait TokenValidator: Send + Sync {
    /// # Errors
    /// Returns an error if the token is not acceptable.
    fn validate(&self, token: &str) -> Result<ClaimsList, AuthError>;
}

pub type SharedTokenValidator = Arc<dyn TokenValidator>;

/// Issues unsigned tokens stamped with `iat`, `nbf` and `exp`.
#[derive(Debug, Clone, Copy)]
pub struct UnsignedJwtIssuer {
    pub lifetime: Duration,
}

impl Default for UnsignedJwtIssuer {
    fn default() -> Self {
        Self {
            lifetime: Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS),
        }
    }
}

impl AccessTokenIssuer for UnsignedJwtIssuer {
    fn issue(&self, claims: &ClaimsList) -> Result<String, AuthError> {
        let times = TokenTimes::starting_at(Utc::now().timestamp(), self.lifetime.num_seconds());
        Ok(encode_unsigned(&payload_from_claims(claims.pairs(), times)))
    }
}

/// Accepts any structurally valid token.
///
/// Signature, audience, issuer and lifetime are not checked.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsignedTokenValidator;

impl TokenValidator for UnsignedTokenValidator {
    fn validate(&self, token: &str) -> Result<ClaimsList, AuthError> {
        let decoded = decode_unsigned(token)?;
        Ok(claims_from_payload(&decoded.payload))
    }
}

/// HS256 tokens checked against a shared secret, issuer and audience.
#[derive(Clone)]
pub struct HmacJwt {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    lifetime: Duration,
}

impl HmacJwt {
    #[must_use]
    pub fn new(secret: &[u8], issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
            audience: audience.into(),
            lifetime: Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS),
        }
    }
}

impl std::fmt::Debug for HmacJwt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacJwt")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

impl AccessTokenIssuer for HmacJwt {
    fn issue(&self, claims: &ClaimsList) -> Result<String, AuthError> {
        let times = TokenTimes::starting_at(Utc::now().timestamp(), self.lifetime.num_seconds());
        let payload = payload_from_claims(claims.pairs(), times);
        Ok(encode(
            &Header::new(Algorithm::HS256),
            &payload,
            &self.encoding_key,
        )?)
    }
}

impl TokenValidator for HmacJwt {
    fn validate(&self, token: &str) -> Result<ClaimsList, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        let data = decode::<Map<String, Value>>(token, &self.decoding_key, &validation)?;
        Ok(claims_from_payload(&data.claims))
    }
}

/// Flatten a token payload back into claims.
///
/// Array members yield one claim per element; non-string scalars use their
/// JSON text.
#[must_use]
pub fn claims_from_payload(payload: &Map<String, Value>) -> ClaimsList {
    let mut claims = ClaimsList::new();
    for (claim_type, value) in payload {
        match value {
            Value::Array(values) => {
                for value in values {
                    claims.add(claim_type.as_str(), claim_text(value));
                }
            }
            value => claims.add(claim_type.as_str(), claim_text(value)),
        }
    }
    claims
}

fn claim_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Register [`UnsignedTokenValidator`] in place of any existing validator.
pub fn configure_unsigned_jwt_bearer_tokens(services: &mut ServiceCollection) {
    let validator: SharedTokenValidator = Arc::new(UnsignedTokenValidator);
    services.insert(validator);
}

/// Claims of the authenticated caller, set by [`require_bearer_token`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal(pub ClaimsList);

impl<S: Send + Sync> FromRequestParts<S> for Principal {
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Middleware rejecting requests without a valid bearer token.
///
/// Uses the [`SharedTokenValidator`] registered as a service and stores the
/// resulting [`Principal`] in the request extensions.
pub async fn require_bearer_token(mut request: Request, next: Next) -> Response {
    let Some(validator) = request.extensions().get::<SharedTokenValidator>().cloned() else {
        tracing::error!("No token validator registered; rejecting request");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };

    let Some(token) = bearer_token(request.headers()) else {
        tracing::debug!("Request has no bearer token");
        return StatusCode::UNAUTHORIZED.into_response();
    };

    match validator.validate(token) {
        Ok(claims) => {
            request.extensions_mut().insert(Principal(claims));
            next.run(request).await
        }
        Err(err) => {
            tracing::debug!(error = %err, "Bearer token rejected");
            StatusCode::UNAUTHORIZED.into_response()
        }
    }
}
