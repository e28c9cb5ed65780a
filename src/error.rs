//! Error types for the authentication middleware.
//!
//! Two families live here:
//!
//! - [`ConfigError`]: raised while building [`AppConfig`](crate::AppConfig) and
//!   its validated newtypes.
//! - [`AuthError`]: the closed set of request-level failures produced by the
//!   request gate and the OAuth routes. Every variant maps to exactly one HTTP
//!   status; recoverable session states never become an `AuthError`, they are
//!   turned into redirects instead.
//!
//! # Example
//!
//! ```rust
//! use shopify_app_auth::{ApiKey, ConfigError};
//!
//! let result = ApiKey::new("");
//! assert!(matches!(result, Err(ConfigError::EmptyApiKey)));
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::auth::oauth::OAuthError;
use crate::auth::SessionStoreError;
use crate::billing::BillingError;
use crate::probe::ProbeError;

/// Errors that can occur while configuring the middleware.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// API key cannot be empty.
    #[error("API key cannot be empty. Please provide a valid Shopify API key.")]
    EmptyApiKey,

    /// API secret key cannot be empty.
    #[error("API secret key cannot be empty. Please provide a valid Shopify API secret key.")]
    EmptyApiSecretKey,

    /// Shop domain is invalid.
    #[error("Invalid shop domain '{domain}'. Expected format: 'shop-name.myshopify.com'.")]
    InvalidShopDomain {
        /// The invalid domain that was provided.
        domain: String,
    },

    /// The `host` query parameter is not a base64-encoded Shopify admin host.
    #[error("Invalid host parameter '{host}'.")]
    InvalidHostParam {
        /// The raw parameter value.
        host: String,
    },

    /// API version is invalid.
    #[error("Invalid API version '{version}'. Expected format: 'YYYY-MM' (e.g., '2025-10') or 'unstable'.")]
    InvalidApiVersion {
        /// The invalid version string that was provided.
        version: String,
    },

    /// Scopes are invalid.
    #[error("Invalid scopes: {reason}")]
    InvalidScopes {
        /// The reason the scopes are invalid.
        reason: String,
    },

    /// A required field is missing.
    #[error("Missing required field: '{field}'. This field must be set before building the configuration.")]
    MissingRequiredField {
        /// The name of the missing field.
        field: &'static str,
    },

    /// Host URL is invalid.
    #[error("Invalid host URL '{url}'. Please provide a valid URL with scheme (e.g., 'https://myapp.example.com').")]
    InvalidHostUrl {
        /// The invalid URL that was provided.
        url: String,
    },

    /// An environment variable required by [`AppConfig::from_env`](crate::AppConfig::from_env) is not set.
    #[error("Environment variable {var} is not set")]
    MissingEnvVar {
        /// Name of the variable.
        var: &'static str,
    },

    /// An environment variable holds a value that cannot be parsed.
    #[error("Environment variable {var} has invalid value '{value}'")]
    InvalidEnvVar {
        /// Name of the variable.
        var: &'static str,
        /// The rejected value.
        value: String,
    },
}

/// Request-level failures surfaced by the gate and the OAuth routes.
///
/// Matching on this enum is exhaustive by design of the HTTP layer: the
/// [`IntoResponse`] implementation decides status and body for every kind.
/// Server-side failures (`500`) never leak provider details to the client.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The request carries no `shop` and none could be recovered.
    #[error("No shop provided")]
    MissingShop,

    /// The `shop` parameter is present but is not a valid shop domain.
    #[error("Invalid shop provided: {shop}")]
    InvalidShop {
        /// The raw parameter value.
        shop: String,
    },

    /// The OAuth callback failed signature or state validation.
    #[error("{0}")]
    InvalidOAuth(String),

    /// The billing provider call itself failed.
    #[error(transparent)]
    Billing(#[from] BillingError),

    /// The token validity probe failed with something other than a 401.
    #[error(transparent)]
    Probe(#[from] ProbeError),

    /// Any other OAuth failure, such as a rejected token exchange.
    #[error(transparent)]
    OAuth(OAuthError),

    /// The session store failed while loading the current session.
    #[error(transparent)]
    Session(#[from] SessionStoreError),

    /// Catch-all for unexpected failures.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Returns the HTTP status this error is reported with.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MissingShop | Self::InvalidShop { .. } | Self::InvalidOAuth(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Billing(_)
            | Self::Probe(_)
            | Self::OAuth(_)
            | Self::Session(_)
            | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<OAuthError> for AuthError {
    fn from(error: OAuthError) -> Self {
        if error.is_invalid_callback() {
            Self::InvalidOAuth(error.to_string())
        } else {
            Self::OAuth(error)
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            match &self {
                Self::Billing(e) => {
                    tracing::error!(error = %e, error_data = %e.error_data, "Billing check failed");
                }
                other => tracing::error!(error = %other, "Request failed"),
            }
            return (status, "Internal Server Error").into_response();
        }

        tracing::warn!(error = %self, status = status.as_u16(), "Rejecting request");
        (status, self.to_string()).into_response()
    }
}

// Verify error types are Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ConfigError>();
    assert_send_sync::<AuthError>();
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::HttpResponseError;

    #[test]
    fn test_empty_api_key_error_message() {
        let message = ConfigError::EmptyApiKey.to_string();
        assert!(message.contains("API key cannot be empty"));
    }

    #[test]
    fn test_missing_env_var_names_variable() {
        let error = ConfigError::MissingEnvVar {
            var: "SHOPIFY_API_KEY",
        };
        assert!(error.to_string().contains("SHOPIFY_API_KEY"));
    }

    #[test]
    fn test_missing_shop_is_bad_request_with_fixed_message() {
        let error = AuthError::MissingShop;
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error.to_string(), "No shop provided");
    }

    #[test]
    fn test_invalid_oauth_is_bad_request() {
        let error = AuthError::InvalidOAuth("HMAC signature validation failed".to_string());
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_billing_error_is_server_error() {
        let error = AuthError::Billing(BillingError {
            message: "Error while billing the store".to_string(),
            error_data: serde_json::json!([{ "message": "boom" }]),
            status: None,
        });
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_probe_error_is_server_error() {
        let error = AuthError::Probe(ProbeError::Http(HttpResponseError {
            code: 503,
            message: "unavailable".to_string(),
            error_reference: None,
        }));
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_server_error_body_is_opaque() {
        let response = AuthError::Internal("database password is hunter2".to_string())
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert_eq!(body, "Internal Server Error");
        assert!(!body.contains("hunter2"));
    }

    #[test]
    fn test_oauth_error_conversion() {
        let invalid: AuthError = OAuthError::InvalidHmac.into();
        assert!(matches!(invalid, AuthError::InvalidOAuth(_)));
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let exchange: AuthError = OAuthError::TokenExchangeFailed {
            status: 400,
            message: "bad code".to_string(),
        }
        .into();
        assert_eq!(exchange.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
