//! Minimal Admin GraphQL client.

use crate::auth::Session;
use crate::clients::errors::{HttpError, HttpResponseError};
use crate::config::ApiVersion;

/// Crate version, sent in the `User-Agent` header.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Client for the Admin GraphQL API of one shop.
///
/// Requests go to `{base}/admin/api/{version}/graphql.json` with the
/// session's `X-Shopify-Access-Token`. The base is `https://{shop}` unless
/// overridden with [`AdminClient::with_base_uri`]. Calls are never retried.
///
/// ```rust
/// use shopify_app_auth::{ApiVersion, AuthScopes, Session, ShopDomain};
/// use shopify_app_auth::clients::AdminClient;
///
/// let session = Session::new(
///     "offline_my-store.myshopify.com".to_string(),
///     ShopDomain::new("my-store.myshopify.com").unwrap(),
///     "token".to_string(),
///     AuthScopes::new(),
///     false,
///     None,
/// );
/// let client = AdminClient::new(&session, &ApiVersion::latest());
/// assert_eq!(
///     client.endpoint(),
///     "https://my-store.myshopify.com/admin/api/2025-10/graphql.json"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct AdminClient {
    client: reqwest::Client,
    base_uri: String,
    api_version: ApiVersion,
    access_token: String,
}

// Verify AdminClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<AdminClient>();
};

impl AdminClient {
    /// Creates a client for the session's shop.
    #[must_use]
    pub fn new(session: &Session, api_version: &ApiVersion) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_uri: format!("https://{}", session.shop),
            api_version: api_version.clone(),
            access_token: session.access_token.clone(),
        }
    }

    /// Sends requests to `base_uri` instead of the shop host.
    #[must_use]
    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        let base_uri: String = base_uri.into();
        self.base_uri = base_uri.trim_end_matches('/').to_string();
        self
    }

    /// Returns the GraphQL endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!(
            "{}/admin/api/{}/graphql.json",
            self.base_uri, self.api_version
        )
    }

    /// Runs a GraphQL query or mutation and returns the response body.
    ///
    /// GraphQL-level `errors` in a 200 response are returned in the body
    /// for the caller to inspect.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Response`] for non-2xx responses and
    /// [`HttpError::Network`] when no response was received.
    pub async fn query(
        &self,
        query: &str,
        variables: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, HttpError> {
        let body = serde_json::json!({
            "query": query,
            "variables": variables,
        });

        let res = self
            .client
            .post(self.endpoint())
            .header("User-Agent", format!("shopify-app-auth v{SDK_VERSION}"))
            .header("Accept", "application/json")
            .header("X-Shopify-Access-Token", &self.access_token)
            .json(&body)
            .send()
            .await?;

        let code = res.status().as_u16();
        let request_id = res
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body_text = res.text().await.unwrap_or_default();

        let body = if body_text.is_empty() {
            serde_json::json!({})
        } else {
            serde_json::from_str(&body_text).unwrap_or_else(|_| {
                if code >= 500 {
                    serde_json::json!({ "raw_body": body_text })
                } else {
                    serde_json::json!({})
                }
            })
        };

        if (200..300).contains(&code) {
            return Ok(body);
        }

        Err(HttpError::Response(HttpResponseError {
            code,
            message: serialize_error(&body, request_id.as_deref()),
            error_reference: request_id,
        }))
    }
}

fn serialize_error(body: &serde_json::Value, request_id: Option<&str>) -> String {
    let mut error_body = serde_json::Map::new();

    if let Some(errors) = body.get("errors") {
        error_body.insert("errors".to_string(), errors.clone());
    }
    if let Some(error) = body.get("error") {
        error_body.insert("error".to_string(), error.clone());
        if let Some(desc) = body.get("error_description") {
            error_body.insert("error_description".to_string(), desc.clone());
        }
    }
    if let Some(request_id) = request_id {
        error_body.insert(
            "error_reference".to_string(),
            serde_json::json!(format!(
                "If you report this error, please include this id: {request_id}."
            )),
        );
    }

    serde_json::Value::Object(error_body).to_string()
}
