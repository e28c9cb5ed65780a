//! App Bridge session tokens.
//!
//! Embedded apps receive a short-lived HS256 JWT from App Bridge and send it
//! as `Authorization: Bearer <token>`. The token names the shop (`dest`) and,
//! for admin sessions, the user (`sub`). It is what lets the gate find the
//! current session and recover a shop when the request itself names none.
//!
//! Tokens are verified against the primary secret, then the old secret, with
//! 10 seconds of leeway on time-based claims, and `aud` must equal the API key.

use axum::http::{header, HeaderMap};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use thiserror::Error;

use crate::config::{AppConfig, ShopDomain};

const JWT_LEEWAY_SECS: u64 = 10;

/// Errors raised while decoding a session token.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionTokenError {
    /// Signature, expiry or structure check failed.
    #[error("Error decoding session token: {reason}")]
    Invalid {
        /// Decoder message for the primary secret.
        reason: String,
    },

    /// The token was issued for another app.
    #[error("Session token had invalid API key")]
    AudienceMismatch,

    /// `dest` is not a shop URL.
    #[error("Session token destination '{dest}' is not a shop")]
    InvalidDestination {
        /// The raw `dest` claim.
        dest: String,
    },
}

/// Claims of a Shopify session token.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionTokenClaims {
    /// Issuer, e.g. `https://my-store.myshopify.com/admin`.
    pub iss: String,
    /// Destination shop, e.g. `https://my-store.myshopify.com`.
    pub dest: String,
    /// Audience; the app's API key.
    pub aud: String,
    /// Shopify user id for admin sessions.
    pub sub: Option<String>,
    /// Expiration timestamp.
    pub exp: i64,
    /// Not-before timestamp.
    pub nbf: i64,
    /// Issued-at timestamp.
    pub iat: i64,
    /// Token id.
    pub jti: String,
    /// Shopify session id.
    pub sid: Option<String>,
}

impl SessionTokenClaims {
    /// Decodes and verifies `token`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionTokenError::Invalid`] if no configured secret
    /// verifies the token, and [`SessionTokenError::AudienceMismatch`] if
    /// `aud` is not this app's API key.
    pub fn decode(token: &str, config: &AppConfig) -> Result<Self, SessionTokenError> {
        let mut first_error = None;
        let mut claims = None;

        for secret in config.secrets() {
            match Self::decode_with_key(token, secret) {
                Ok(decoded) => {
                    claims = Some(decoded);
                    break;
                }
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        let claims = claims.ok_or_else(|| SessionTokenError::Invalid {
            reason: first_error.map(|e| e.to_string()).unwrap_or_default(),
        })?;

        if claims.aud != config.api_key().as_ref() {
            return Err(SessionTokenError::AudienceMismatch);
        }

        Ok(claims)
    }

    fn decode_with_key(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = JWT_LEEWAY_SECS;
        validation.validate_nbf = true;
        // aud is compared after decoding so the error names the cause
        validation.validate_aud = false;

        let key = DecodingKey::from_secret(secret.as_bytes());
        Ok(decode::<Self>(token, &key, &validation)?.claims)
    }

    /// Returns the shop from the `dest` claim.
    ///
    /// # Errors
    ///
    /// Returns [`SessionTokenError::InvalidDestination`] if `dest` without
    /// its `https://` prefix is not a valid shop domain.
    pub fn shop(&self) -> Result<ShopDomain, SessionTokenError> {
        let host = self.dest.strip_prefix("https://").unwrap_or(&self.dest);
        ShopDomain::new(host).map_err(|_| SessionTokenError::InvalidDestination {
            dest: self.dest.clone(),
        })
    }

    /// Returns the user id for admin session tokens with a numeric `sub`.
    #[must_use]
    pub fn user_id(&self) -> Option<u64> {
        if !self.iss.ends_with("/admin") {
            return None;
        }
        self.sub
            .as_deref()
            .filter(|sub| !sub.is_empty() && sub.chars().all(|c| c.is_ascii_digit()))
            .and_then(|sub| sub.parse().ok())
    }
}

/// Extracts the bearer token from the `Authorization` header.
///
/// ```rust
/// use axum::http::{header, HeaderMap, HeaderValue};
/// use shopify_app_auth::auth::bearer_token;
///
/// let mut headers = HeaderMap::new();
/// headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
/// assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));
/// ```
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

// Verify session token types are Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<SessionTokenClaims>();
    assert_send_sync::<SessionTokenError>();
};
