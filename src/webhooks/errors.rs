//! Webhook registration errors.

use crate::clients::HttpError;
use thiserror::Error;

/// Failure to register one webhook topic.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// The Admin API call failed.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// Shopify answered but refused the registration.
    #[error("Shopify API error: {message}")]
    ShopifyError {
        /// Joined `userErrors` / `errors` messages.
        message: String,
    },
}

// Verify WebhookError is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<WebhookError>();
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::HttpResponseError;

    #[test]
    fn test_shopify_error_message() {
        let error = WebhookError::ShopifyError {
            message: "Invalid callback URL".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("Shopify API error"));
        assert!(message.contains("Invalid callback URL"));
    }

    #[test]
    fn test_from_http_error() {
        let error: WebhookError = HttpError::Response(HttpResponseError {
            code: 401,
            message: r#"{"error":"Unauthorized"}"#.to_string(),
            error_reference: None,
        })
        .into();
        assert!(matches!(error, WebhookError::Http(_)));
        assert!(error.to_string().contains("Unauthorized"));
    }
}
