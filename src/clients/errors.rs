//! HTTP error types for outbound Admin API calls.
//!
//! - [`HttpResponseError`]: a non-2xx response from Shopify
//! - [`HttpError`]: any failure of an outbound call
//!
//! ```rust
//! use shopify_app_auth::clients::{HttpError, HttpResponseError};
//!
//! let error = HttpError::Response(HttpResponseError {
//!     code: 401,
//!     message: r#"{"errors":"Invalid API key or access token"}"#.to_string(),
//!     error_reference: None,
//! });
//! assert_eq!(error.status(), Some(401));
//! ```

use thiserror::Error;

/// Error for a non-2xx HTTP response.
///
/// `message` is a JSON string built from the `errors`, `error` and
/// `error_description` fields of the body.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct HttpResponseError {
    /// The HTTP status code.
    pub code: u16,
    /// Serialized error body.
    pub message: String,
    /// The `X-Request-Id` of the failed request, if Shopify sent one.
    pub error_reference: Option<String>,
}

/// Unified error type for outbound HTTP calls.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Shopify answered with a non-2xx status.
    #[error(transparent)]
    Response(#[from] HttpResponseError),

    /// The request never produced a response.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl HttpError {
    /// Returns the HTTP status code when Shopify answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Response(e) => Some(e.code),
            Self::Network(_) => None,
        }
    }
}

// Verify error types are Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<HttpResponseError>();
    assert_send_sync::<HttpError>();
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_response_error_displays_message() {
        let error = HttpResponseError {
            code: 404,
            message: r#"{"error":"Not Found"}"#.to_string(),
            error_reference: None,
        };
        assert_eq!(error.to_string(), r#"{"error":"Not Found"}"#);
    }

    #[test]
    fn test_from_response_error() {
        let error: HttpError = HttpResponseError {
            code: 500,
            message: "boom".to_string(),
            error_reference: Some("abc-123".to_string()),
        }
        .into();
        assert_eq!(error.status(), Some(500));
    }
}
