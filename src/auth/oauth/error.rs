//! OAuth-specific error types.
//!
//! [`OAuthError`] covers both halves of the authorization code flow: starting
//! it ([`OAuthProvider::begin_auth`](crate::auth::oauth::OAuthProvider::begin_auth))
//! and finishing it in the callback. The request gate sorts the variants into
//! three outcomes:
//!
//! - [`OAuthError::is_invalid_callback`] variants are answered with `400`
//! - [`OAuthError::CookieNotFound`] and [`OAuthError::SessionNotFound`] restart OAuth
//! - everything else is an internal failure
//!
//! # Example
//!
//! ```rust
//! use shopify_app_auth::auth::oauth::OAuthError;
//!
//! let error = OAuthError::InvalidHmac;
//! assert_eq!(error.to_string(), "HMAC signature validation failed");
//! assert!(error.is_invalid_callback());
//! ```

use crate::auth::SessionStoreError;
use thiserror::Error;

/// Errors that can occur during OAuth operations.
#[derive(Debug, Error)]
pub enum OAuthError {
    /// The callback `hmac` parameter does not match any configured secret.
    #[error("HMAC signature validation failed")]
    InvalidHmac,

    /// The callback `state` does not match the nonce stored at `begin_auth`.
    ///
    /// This is the CSRF check of the flow.
    #[error("OAuth state mismatch")]
    StateMismatch,

    /// Callback parameters are missing or malformed.
    #[error("Invalid OAuth callback: {reason}")]
    InvalidCallback {
        /// Description of what is wrong with the callback.
        reason: String,
    },

    /// The signed OAuth session cookie is absent or its signature is wrong.
    #[error("Cannot complete OAuth process. Could not find an OAuth cookie for shop url: {shop}")]
    CookieNotFound {
        /// Shop named by the callback.
        shop: String,
    },

    /// The cookie points at a session the store no longer holds.
    #[error("Cannot complete OAuth process. No session found for the specified shop url: {shop}")]
    SessionNotFound {
        /// Shop named by the callback.
        shop: String,
    },

    /// The POST exchanging the code for a token did not succeed.
    #[error("Token exchange failed with status {status}: {message}")]
    TokenExchangeFailed {
        /// HTTP status returned, `0` for transport failures.
        status: u16,
        /// Response body or transport error.
        message: String,
    },

    /// The session store failed while persisting or loading OAuth state.
    #[error(transparent)]
    Store(#[from] SessionStoreError),
}

impl OAuthError {
    /// Returns `true` when the callback itself is not trustworthy.
    ///
    /// These failures are reported to the client as `400 Bad Request`.
    #[must_use]
    pub const fn is_invalid_callback(&self) -> bool {
        matches!(
            self,
            Self::InvalidHmac | Self::StateMismatch | Self::InvalidCallback { .. }
        )
    }

    /// Returns `true` when OAuth should simply be started again.
    #[must_use]
    pub const fn should_restart(&self) -> bool {
        matches!(
            self,
            Self::CookieNotFound { .. } | Self::SessionNotFound { .. }
        )
    }
}

// Verify OAuthError is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<OAuthError>();
};
