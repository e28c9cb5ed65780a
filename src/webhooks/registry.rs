//! Admin GraphQL webhook registration.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::auth::Session;
use crate::clients::AdminClient;
use crate::config::AppConfig;

use super::errors::WebhookError;
use super::{RegisterOutcome, WebhookRegistry};

const EXISTING_SUBSCRIPTIONS_QUERY: &str = r"
query existingSubscriptions($topic: WebhookSubscriptionTopic!) {
  webhookSubscriptions(first: 25, topics: [$topic]) {
    edges {
      node {
        id
        endpoint { ... on WebhookHttpEndpoint { callbackUrl } }
      }
    }
  }
}";

const CREATE_SUBSCRIPTION_MUTATION: &str = r"
mutation createSubscription($topic: WebhookSubscriptionTopic!, $callbackUrl: URL!) {
  webhookSubscriptionCreate(topic: $topic, webhookSubscription: { callbackUrl: $callbackUrl }) {
    webhookSubscription { id }
    userErrors { field message }
  }
}";

const UPDATE_SUBSCRIPTION_MUTATION: &str = r"
mutation updateSubscription($id: ID!, $callbackUrl: URL!) {
  webhookSubscriptionUpdate(id: $id, webhookSubscription: { callbackUrl: $callbackUrl }) {
    webhookSubscription { id }
    userErrors { field message }
  }
}";

/// One topic delivered over HTTP to a path on the app host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookSubscription {
    /// GraphQL topic name, e.g. `APP_UNINSTALLED`.
    pub topic: String,
    /// Path on the app host receiving deliveries.
    pub path: String,
}

impl WebhookSubscription {
    /// Creates a subscription for `topic` delivered to `path`.
    #[must_use]
    pub fn new(topic: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            path: path.into(),
        }
    }
}

/// [`WebhookRegistry`] creating HTTP webhook subscriptions through the
/// Admin GraphQL API.
///
/// Each topic is looked up first: an existing subscription with the same
/// callback URL is left alone, one with another URL is updated, and a
/// missing one is created.
#[derive(Debug, Clone, Default)]
pub struct ShopifyWebhookRegistry {
    subscriptions: Vec<WebhookSubscription>,
    base_uri: Option<String>,
}

// Verify ShopifyWebhookRegistry is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ShopifyWebhookRegistry>();
};

impl ShopifyWebhookRegistry {
    /// Creates a registry for `subscriptions`.
    #[must_use]
    pub const fn new(subscriptions: Vec<WebhookSubscription>) -> Self {
        Self {
            subscriptions,
            base_uri: None,
        }
    }

    /// Sends registration calls to `base_uri` instead of the shop host.
    #[must_use]
    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = Some(base_uri.into());
        self
    }

    /// Returns the configured subscriptions.
    #[must_use]
    pub fn subscriptions(&self) -> &[WebhookSubscription] {
        &self.subscriptions
    }

    async fn register(
        client: &AdminClient,
        topic: &str,
        callback_url: &str,
    ) -> Result<(), WebhookError> {
        let body = client
            .query(EXISTING_SUBSCRIPTIONS_QUERY, Some(json!({ "topic": topic })))
            .await?;
        check_graphql_errors(&body)?;

        let existing: Vec<(String, Option<String>)> = body["data"]["webhookSubscriptions"]["edges"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|edge| {
                let node = &edge["node"];
                let id = node["id"].as_str()?.to_string();
                let url = node["endpoint"]["callbackUrl"].as_str().map(String::from);
                Some((id, url))
            })
            .collect();

        if existing
            .iter()
            .any(|(_, url)| url.as_deref() == Some(callback_url))
        {
            tracing::debug!(topic, "Webhook already registered");
            return Ok(());
        }

        let (mutation, variables, field) = match existing.first() {
            Some((id, _)) => (
                UPDATE_SUBSCRIPTION_MUTATION,
                json!({ "id": id, "callbackUrl": callback_url }),
                "webhookSubscriptionUpdate",
            ),
            None => (
                CREATE_SUBSCRIPTION_MUTATION,
                json!({ "topic": topic, "callbackUrl": callback_url }),
                "webhookSubscriptionCreate",
            ),
        };

        let body = client.query(mutation, Some(variables)).await?;
        check_graphql_errors(&body)?;

        let user_errors = error_messages(&body["data"][field]["userErrors"]);
        if !user_errors.is_empty() {
            return Err(WebhookError::ShopifyError {
                message: user_errors.join("; "),
            });
        }

        Ok(())
    }
}

fn error_messages(errors: &Value) -> Vec<String> {
    errors
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|e| e["message"].as_str().map(String::from))
        .collect()
}

fn check_graphql_errors(body: &Value) -> Result<(), WebhookError> {
    match body.get("errors") {
        Some(errors) => {
            let messages = error_messages(errors);
            Err(WebhookError::ShopifyError {
                message: if messages.is_empty() {
                    errors.to_string()
                } else {
                    messages.join("; ")
                },
            })
        }
        None => Ok(()),
    }
}

#[async_trait]
impl WebhookRegistry for ShopifyWebhookRegistry {
    async fn register_all(
        &self,
        session: &Session,
        config: &AppConfig,
    ) -> HashMap<String, RegisterOutcome> {
        let mut client = AdminClient::new(session, config.api_version());
        if let Some(base_uri) = &self.base_uri {
            client = client.with_base_uri(base_uri.clone());
        }

        let mut outcomes = HashMap::new();
        for subscription in &self.subscriptions {
            let callback_url = format!("{}{}", config.host().as_ref(), subscription.path);
            let outcome = match Self::register(&client, &subscription.topic, &callback_url).await {
                Ok(()) => RegisterOutcome::ok(),
                Err(e) => RegisterOutcome::failed(e.to_string()),
            };
            outcomes.insert(subscription.topic.clone(), outcome);
        }
        outcomes
    }
}
