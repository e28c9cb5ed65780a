//! App billing.
//!
//! When [`BillingConfig::required`](crate::BillingConfig) is set, a shop must
//! have paid for the configured charge before protected routes are served.
//! [`BillingProvider::ensure_billing`] answers that question and, when the
//! shop has not paid, creates the charge and returns the URL where the
//! merchant approves it.
//!
//! [`BillingStatus`] makes the "unpaid" answer carry its confirmation URL, so
//! an unpaid result without somewhere to send the merchant cannot exist.

use async_trait::async_trait;
use base64::prelude::*;
use serde_json::{json, Value};
use thiserror::Error;

use crate::auth::Session;
use crate::clients::{AdminClient, HttpError};
use crate::config::{AppConfig, BillingConfig};

const RECURRING_PURCHASES_QUERY: &str = r"
query appSubscription {
  currentAppInstallation {
    activeSubscriptions { name test }
  }
}";

const ONE_TIME_PURCHASES_QUERY: &str = r"
query appPurchases($endCursor: String) {
  currentAppInstallation {
    oneTimePurchases(first: 250, sortKey: CREATED_AT, after: $endCursor) {
      edges { node { name test status } }
      pageInfo { hasNextPage endCursor }
    }
  }
}";

const RECURRING_PURCHASE_MUTATION: &str = r"
mutation createSubscription(
  $name: String!
  $lineItems: [AppSubscriptionLineItemInput!]!
  $returnUrl: URL!
  $test: Boolean
) {
  appSubscriptionCreate(name: $name, lineItems: $lineItems, returnUrl: $returnUrl, test: $test) {
    confirmationUrl
    userErrors { field message }
  }
}";

const ONE_TIME_PURCHASE_MUTATION: &str = r"
mutation createPurchase($name: String!, $price: MoneyInput!, $returnUrl: URL!, $test: Boolean) {
  appPurchaseOneTimeCreate(name: $name, price: $price, returnUrl: $returnUrl, test: $test) {
    confirmationUrl
    userErrors { field message }
  }
}";

/// Outcome of a billing check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingStatus {
    /// The shop has an active payment for the configured charge.
    Paid,
    /// The shop has not paid; the merchant must approve the charge at
    /// `confirmation_url`.
    Unpaid {
        /// Shopify page where the merchant approves the new charge.
        confirmation_url: String,
    },
}

/// The billing API call itself failed.
///
/// Distinct from [`BillingStatus::Unpaid`]: this means no answer could be
/// obtained. `error_data` carries Shopify's structured errors for logging
/// and is never shown to the client.
#[derive(Debug, Error, Clone)]
#[error("{message}")]
pub struct BillingError {
    /// Human-readable summary.
    pub message: String,
    /// Structured error payload from Shopify.
    pub error_data: Value,
    /// HTTP status when Shopify answered with a non-2xx response.
    pub status: Option<u16>,
}

impl BillingError {
    fn new(error_data: Value) -> Self {
        Self {
            message: "Error while billing the store".to_string(),
            error_data,
            status: None,
        }
    }

    /// Returns `true` when the failure was Shopify rejecting the access
    /// token, which means the session needs OAuth again.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self.status, Some(401))
    }
}

impl From<HttpError> for BillingError {
    fn from(error: HttpError) -> Self {
        let status = error.status();
        Self {
            status,
            ..Self::new(json!(error.to_string()))
        }
    }
}

/// Checks and requests payment for a shop.
#[async_trait]
pub trait BillingProvider: Send + Sync {
    /// Returns whether the session's shop has paid for `config.billing()`.
    ///
    /// # Errors
    ///
    /// Returns [`BillingError`] when Shopify cannot be asked or rejects the
    /// request.
    async fn ensure_billing(
        &self,
        session: &Session,
        config: &AppConfig,
    ) -> Result<BillingStatus, BillingError>;
}

/// Where Shopify sends the merchant after approving a charge.
///
/// Embedded apps return into the admin
/// (`https://admin.shopify.com/store/{shop}/apps/{api_key}`); others return
/// to the app host with `shop` and `host` parameters.
#[must_use]
pub fn return_url(session: &Session, config: &AppConfig) -> String {
    if config.is_embedded() {
        return config.embedded_app_url(&session.shop, None);
    }
    let admin_host = format!("admin.shopify.com/store/{}", session.shop.shop_name());
    format!(
        "{}?shop={}&host={}",
        config.host().as_ref(),
        urlencoding::encode(session.shop.as_ref()),
        urlencoding::encode(&BASE64_STANDARD.encode(admin_host))
    )
}

/// [`BillingProvider`] using the Admin GraphQL billing API.
#[derive(Debug, Clone, Default)]
pub struct ShopifyBilling {
    base_uri: Option<String>,
}

impl ShopifyBilling {
    /// Creates a provider calling each shop's Admin API.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_uri: None }
    }

    /// Sends billing calls to `base_uri` instead of the shop host.
    #[must_use]
    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = Some(base_uri.into());
        self
    }

    fn client(&self, session: &Session, config: &AppConfig) -> AdminClient {
        let client = AdminClient::new(session, config.api_version());
        match &self.base_uri {
            Some(base_uri) => client.with_base_uri(base_uri.clone()),
            None => client,
        }
    }

    async fn graphql(
        client: &AdminClient,
        query: &str,
        variables: Option<Value>,
    ) -> Result<Value, BillingError> {
        let body = client.query(query, variables).await?;
        if let Some(errors) = body.get("errors") {
            return Err(BillingError::new(errors.clone()));
        }
        Ok(body)
    }

    fn matches(node: &Value, billing: &BillingConfig) -> bool {
        let name_matches = node["name"].as_str() == Some(billing.charge_name.as_str());
        let is_test = node["test"].as_bool().unwrap_or(false);
        name_matches && (billing.test || !is_test)
    }

    async fn has_active_payment(
        client: &AdminClient,
        billing: &BillingConfig,
    ) -> Result<bool, BillingError> {
        if billing.interval.is_recurring() {
            let body = Self::graphql(client, RECURRING_PURCHASES_QUERY, None).await?;
            let subscriptions = body["data"]["currentAppInstallation"]["activeSubscriptions"]
                .as_array()
                .cloned()
                .unwrap_or_default();
            return Ok(subscriptions.iter().any(|s| Self::matches(s, billing)));
        }

        let mut end_cursor: Option<String> = None;
        loop {
            let body = Self::graphql(
                client,
                ONE_TIME_PURCHASES_QUERY,
                Some(json!({ "endCursor": end_cursor })),
            )
            .await?;
            let purchases = &body["data"]["currentAppInstallation"]["oneTimePurchases"];

            let paid = purchases["edges"]
                .as_array()
                .into_iter()
                .flatten()
                .map(|edge| &edge["node"])
                .any(|node| Self::matches(node, billing) && node["status"] == "ACTIVE");
            if paid {
                return Ok(true);
            }

            let page_info = &purchases["pageInfo"];
            if page_info["hasNextPage"].as_bool() != Some(true) {
                return Ok(false);
            }
            let next = page_info["endCursor"].as_str().map(String::from);
            if next.is_none() || next == end_cursor {
                tracing::debug!("One-time purchase pagination did not advance");
                return Ok(false);
            }
            end_cursor = next;
        }
    }

    async fn request_payment(
        client: &AdminClient,
        session: &Session,
        config: &AppConfig,
    ) -> Result<String, BillingError> {
        let billing = config.billing();
        let return_url = return_url(session, config);
        let price = json!({
            "amount": billing.amount,
            "currencyCode": billing.currency_code,
        });

        let (mutation, variables, field) = if billing.interval.is_recurring() {
            (
                RECURRING_PURCHASE_MUTATION,
                json!({
                    "name": billing.charge_name,
                    "lineItems": [{
                        "plan": {
                            "appRecurringPricingDetails": {
                                "interval": billing.interval.as_graphql(),
                                "price": price,
                            }
                        }
                    }],
                    "returnUrl": return_url,
                    "test": billing.test,
                }),
                "appSubscriptionCreate",
            )
        } else {
            (
                ONE_TIME_PURCHASE_MUTATION,
                json!({
                    "name": billing.charge_name,
                    "price": price,
                    "returnUrl": return_url,
                    "test": billing.test,
                }),
                "appPurchaseOneTimeCreate",
            )
        };

        let body = Self::graphql(client, mutation, Some(variables)).await?;
        let payload = &body["data"][field];

        if let Some(user_errors) = payload["userErrors"].as_array().filter(|e| !e.is_empty()) {
            return Err(BillingError::new(Value::Array(user_errors.clone())));
        }

        payload["confirmationUrl"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| BillingError::new(json!("Missing confirmationUrl in billing response")))
    }
}

#[async_trait]
impl BillingProvider for ShopifyBilling {
    async fn ensure_billing(
        &self,
        session: &Session,
        config: &AppConfig,
    ) -> Result<BillingStatus, BillingError> {
        let client = self.client(session, config);

        if Self::has_active_payment(&client, config.billing()).await? {
            return Ok(BillingStatus::Paid);
        }

        let confirmation_url = Self::request_payment(&client, session, config).await?;
        tracing::info!(shop = %session.shop, "Shop has not paid, requesting payment");
        Ok(BillingStatus::Unpaid { confirmation_url })
    }
}

// Verify billing types are Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<BillingStatus>();
    assert_send_sync::<BillingError>();
    assert_send_sync::<ShopifyBilling>();
};
