//! Token authentication.
//!
//! The require-auth middleware delegates token checks to an [`Authenticator`]
//! found in [`AppServices`](crate::context::AppServices). [`JwtAuthenticator`]
//! covers the common HS256 case; anything else (opaque tokens, JWKS) plugs in
//! by implementing the trait.

use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::AuthConfig;
use crate::error::ApiError;

/// Decoded token claims.
pub type Claims = Map<String, Value>;

pub trait Authenticator: Send + Sync {
    /// Validate `token` and return its claims, or a 401 describing why not.
    fn validate_token(&self, token: &str) -> Result<Claims, ApiError>;
}

/// Extract the token from an `Authorization` header value.
///
/// Accepts `Bearer <token>` (case-insensitive scheme) or a bare token.
pub fn bearer_token(header: &str) -> Option<&str> {
    let header = header.trim();
    let token = match header.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        Some(_) => return None,
        None => header,
    };
    (!token.is_empty()).then_some(token)
}

/// HS256 JWT validation with mandatory `exp`.
pub struct JwtAuthenticator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtAuthenticator {
    pub fn hs256(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);
        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn with_issuer(mut self, issuer: &str) -> Self {
        self.validation.set_issuer(&[issuer]);
        self
    }

    pub fn with_audience(mut self, audience: &str) -> Self {
        self.validation.set_audience(&[audience]);
        self
    }

    pub fn with_leeway(mut self, seconds: u64) -> Self {
        self.validation.leeway = seconds;
        self
    }

    /// Build from config; `None` when no secret is configured.
    pub fn from_config(config: &AuthConfig) -> Option<Self> {
        let secret = config.jwt_secret.as_ref()?;
        let mut auth = Self::hs256(secret.as_bytes());
        if let Some(issuer) = &config.issuer {
            auth = auth.with_issuer(issuer);
        }
        if let Some(audience) = &config.audience {
            auth = auth.with_audience(audience);
        }
        Some(auth)
    }
}

impl Authenticator for JwtAuthenticator {
    fn validate_token(&self, token: &str) -> Result<Claims, ApiError> {
        match decode::<Claims>(token, &self.key, &self.validation) {
            Ok(data) => Ok(data.claims),
            Err(err) => {
                let reason = match err.kind() {
                    JwtErrorKind::ExpiredSignature => "token expired",
                    JwtErrorKind::InvalidSignature => "invalid signature",
                    JwtErrorKind::InvalidIssuer => "invalid issuer",
                    JwtErrorKind::InvalidAudience => "invalid audience",
                    JwtErrorKind::MissingRequiredClaim(_) => "missing required claim",
                    _ => "invalid token format",
                };
                debug!(reason, error = %err, "JWT rejected");
                Err(ApiError::unauthorized("Invalid or expired token").with_detail("token", reason))
            }
        }
    }
}
