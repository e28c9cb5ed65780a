//! Webhook registration after install.
//!
//! Once OAuth completes, every configured topic is registered for the shop.
//! Registration never blocks the install: failures are reported per topic in
//! [`RegisterOutcome`] and the caller decides what to log.
//!
//! The mandatory privacy topics ([`PRIVACY_TOPICS`]) are configured in the
//! Partner Dashboard rather than through the API, so failures for them are
//! expected and ignored.
//!
//! # Example
//!
//! ```rust
//! use shopify_app_auth::webhooks::{is_privacy_topic, ShopifyWebhookRegistry, WebhookSubscription};
//!
//! let registry = ShopifyWebhookRegistry::new(vec![
//!     WebhookSubscription::new("APP_UNINSTALLED", "/api/webhooks"),
//! ]);
//! assert_eq!(registry.subscriptions().len(), 1);
//! assert!(is_privacy_topic("SHOP_REDACT"));
//! ```

mod errors;
mod registry;

pub use errors::WebhookError;
pub use registry::{ShopifyWebhookRegistry, WebhookSubscription};

use std::collections::HashMap;

use async_trait::async_trait;

use crate::auth::Session;
use crate::config::AppConfig;

/// Topics whose registration failures are ignored.
pub const PRIVACY_TOPICS: [&str; 3] = ["CUSTOMERS_DATA_REQUEST", "CUSTOMERS_REDACT", "SHOP_REDACT"];

/// Returns `true` for the mandatory privacy topics.
#[must_use]
pub fn is_privacy_topic(topic: &str) -> bool {
    PRIVACY_TOPICS.contains(&topic)
}

/// Result of registering one topic.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegisterOutcome {
    /// Whether the subscription exists after the call.
    pub success: bool,
    /// Messages explaining a failure.
    pub errors: Vec<String>,
}

impl RegisterOutcome {
    /// A successful registration.
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            success: true,
            errors: Vec::new(),
        }
    }

    /// A failed registration with one message.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            errors: vec![message.into()],
        }
    }
}

/// Registers the app's webhooks for a freshly authorized shop.
#[async_trait]
pub trait WebhookRegistry: Send + Sync {
    /// Registers every configured topic and reports each outcome by topic.
    async fn register_all(
        &self,
        session: &Session,
        config: &AppConfig,
    ) -> HashMap<String, RegisterOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_privacy_topics() {
        for topic in PRIVACY_TOPICS {
            assert!(is_privacy_topic(topic));
        }
        assert!(!is_privacy_topic("APP_UNINSTALLED"));
    }

    #[test]
    fn test_outcome_constructors() {
        assert!(RegisterOutcome::ok().success);
        let failed = RegisterOutcome::failed("nope");
        assert!(!failed.success);
        assert_eq!(failed.errors, vec!["nope".to_string()]);
    }
}
