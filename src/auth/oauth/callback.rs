//! OAuth callback parameters and authorization-code exchange.

use crate::auth::oauth::error::OAuthError;
use crate::auth::{AuthScopes, Session};
use crate::config::{AppConfig, ShopDomain};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

/// Query parameters Shopify sends to the OAuth callback route.
///
/// The full parameter list is kept because the `hmac` signature covers every
/// parameter Shopify sent, not only the ones this crate reads.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallbackQuery {
    params: Vec<(String, String)>,
}

impl CallbackQuery {
    /// Wraps decoded query pairs.
    #[must_use]
    pub const fn new(params: Vec<(String, String)>) -> Self {
        Self { params }
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The authorization code.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.get("code")
    }

    /// The shop that approved the install.
    #[must_use]
    pub fn shop(&self) -> Option<&str> {
        self.get("shop")
    }

    /// The state nonce echoed back from `begin_auth`.
    #[must_use]
    pub fn state(&self) -> Option<&str> {
        self.get("state")
    }

    /// The hex HMAC-SHA256 signature.
    #[must_use]
    pub fn hmac(&self) -> Option<&str> {
        self.get("hmac")
    }

    /// The base64 admin host, when present.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.get("host")
    }

    /// Builds the message Shopify signed: every parameter except `hmac` and
    /// `signature`, sorted by key, joined as `key=value` with `&`.
    #[must_use]
    pub fn to_signable_string(&self) -> String {
        let mut pairs: Vec<&(String, String)> = self
            .params
            .iter()
            .filter(|(k, _)| k != "hmac" && k != "signature")
            .collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Online-token user details returned by the token endpoint.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub(crate) struct AssociatedUser {
    pub id: u64,
}

/// Body returned by `POST /admin/oauth/access_token`.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct AccessTokenResponse {
    pub access_token: String,
    pub scope: String,
    pub expires_in: Option<i64>,
    pub associated_user: Option<AssociatedUser>,
}

#[derive(Serialize)]
struct TokenExchangeRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
}

/// Exchanges an authorization code for an access token and builds the
/// resulting session.
///
/// `base_uri` overrides `https://{shop}` so the exchange can be pointed at a
/// mock server.
pub(crate) async fn exchange_code(
    client: &reqwest::Client,
    config: &AppConfig,
    shop: &ShopDomain,
    code: &str,
    base_uri: Option<&str>,
) -> Result<Session, OAuthError> {
    let base = base_uri.map_or_else(|| format!("https://{shop}"), ToString::to_string);
    let token_url = format!("{base}/admin/oauth/access_token");

    let body = TokenExchangeRequest {
        client_id: config.api_key().as_ref(),
        client_secret: config.api_secret_key().as_ref(),
        code,
    };

    let response = client
        .post(&token_url)
        .json(&body)
        .send()
        .await
        .map_err(|e| OAuthError::TokenExchangeFailed {
            status: 0,
            message: format!("Network error: {e}"),
        })?;

    let status = response.status().as_u16();
    if !response.status().is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(OAuthError::TokenExchangeFailed { status, message });
    }

    let token: AccessTokenResponse =
        response
            .json()
            .await
            .map_err(|e| OAuthError::TokenExchangeFailed {
                status,
                message: format!("Failed to parse token response: {e}"),
            })?;

    Ok(session_from_token(shop.clone(), token))
}

fn session_from_token(shop: ShopDomain, token: AccessTokenResponse) -> Session {
    let scopes: AuthScopes = token.scope.parse().unwrap_or_default();

    match token.associated_user {
        Some(user) => {
            let expires = token
                .expires_in
                .map(|seconds| Utc::now() + Duration::seconds(seconds));
            let mut session = Session::new(
                Session::online_id(&shop, user.id),
                shop,
                token.access_token,
                scopes,
                true,
                expires,
            );
            session.user_id = Some(user.id);
            session
        }
        None => Session::new(
            Session::offline_id(&shop),
            shop,
            token.access_token,
            scopes,
            false,
            None,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiKey, ApiSecretKey, HostUrl};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config() -> AppConfig {
        AppConfig::builder()
            .api_key(ApiKey::new("test-api-key").unwrap())
            .api_secret_key(ApiSecretKey::new("test-secret").unwrap())
            .host(HostUrl::new("https://myapp.example.com").unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn test_signable_string_sorts_and_skips_hmac() {
        let query = CallbackQuery::new(vec![
            ("timestamp".to_string(), "1".to_string()),
            ("hmac".to_string(), "ignored".to_string()),
            ("code".to_string(), "c".to_string()),
            ("shop".to_string(), "s.myshopify.com".to_string()),
        ]);
        assert_eq!(
            query.to_signable_string(),
            "code=c&shop=s.myshopify.com&timestamp=1"
        );
    }

    #[test]
    fn test_accessors_read_named_params() {
        let query = CallbackQuery::new(vec![
            ("code".to_string(), "abc".to_string()),
            ("host".to_string(), "aG9zdA".to_string()),
        ]);
        assert_eq!(query.code(), Some("abc"));
        assert_eq!(query.host(), Some("aG9zdA"));
        assert_eq!(query.state(), None);
    }

    #[tokio::test]
    async fn test_exchange_code_builds_offline_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/admin/oauth/access_token"))
            .and(body_json(serde_json::json!({
                "client_id": "test-api-key",
                "client_secret": "test-secret",
                "code": "auth-code"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "shpat_123",
                "scope": "write_products"
            })))
            .mount(&server)
            .await;

        let shop = ShopDomain::new("test.myshopify.com").unwrap();
        let session = exchange_code(
            &reqwest::Client::new(),
            &config(),
            &shop,
            "auth-code",
            Some(server.uri().as_str()),
        )
        .await
        .unwrap();

        assert_eq!(session.id, "offline_test.myshopify.com");
        assert_eq!(session.access_token, "shpat_123");
        assert!(!session.is_online);
        assert!(session.scopes.iter().any(|s| s == "read_products"));
    }

    #[tokio::test]
    async fn test_exchange_code_builds_online_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/admin/oauth/access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "online-token",
                "scope": "read_products",
                "expires_in": 86399,
                "associated_user": { "id": 42 }
            })))
            .mount(&server)
            .await;

        let shop = ShopDomain::new("test.myshopify.com").unwrap();
        let session = exchange_code(
            &reqwest::Client::new(),
            &config(),
            &shop,
            "code",
            Some(server.uri().as_str()),
        )
        .await
        .unwrap();

        assert_eq!(session.id, "test.myshopify.com_42");
        assert!(session.is_online);
        assert_eq!(session.user_id, Some(42));
        assert!(session.expires.is_some());
        assert!(session.is_active());
    }

    #[tokio::test]
    async fn test_exchange_code_reports_status_on_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/admin/oauth/access_token"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid code"))
            .mount(&server)
            .await;

        let shop = ShopDomain::new("test.myshopify.com").unwrap();
        let result = exchange_code(
            &reqwest::Client::new(),
            &config(),
            &shop,
            "bad",
            Some(server.uri().as_str()),
        )
        .await;

        match result {
            Err(OAuthError::TokenExchangeFailed { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "invalid code");
            }
            other => panic!("Expected TokenExchangeFailed, got {other:?}"),
        }
    }
}
