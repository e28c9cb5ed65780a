//! OAuth authorization URL generation.

use crate::auth::oauth::state::StateParam;
use crate::config::{AppConfig, ShopDomain};
use axum_extra::extract::cookie::Cookie;

/// Result of starting OAuth for a shop.
///
/// The caller redirects the browser to `auth_url` and must attach `cookies`
/// to that same response; the callback cannot be completed without them.
#[derive(Clone, Debug)]
pub struct BeginAuth {
    /// Shopify authorization URL to redirect the browser to.
    pub auth_url: String,
    /// Signed cookies identifying the in-progress OAuth session.
    pub cookies: Vec<Cookie<'static>>,
}

/// Builds the Shopify authorization URL.
///
/// `redirect_path` is appended to the configured app host to form the
/// `redirect_uri`. Online requests add `grant_options[]=per-user`.
///
/// ```rust
/// use shopify_app_auth::{AppConfig, ApiKey, ApiSecretKey, HostUrl, ShopDomain};
/// use shopify_app_auth::auth::oauth::{authorization_url, StateParam};
///
/// let config = AppConfig::builder()
///     .api_key(ApiKey::new("api-key").unwrap())
///     .api_secret_key(ApiSecretKey::new("secret").unwrap())
///     .host(HostUrl::new("https://myapp.example.com").unwrap())
///     .scopes("read_products".parse().unwrap())
///     .build()
///     .unwrap();
///
/// let shop = ShopDomain::new("test-shop.myshopify.com").unwrap();
/// let url = authorization_url(&config, &shop, &StateParam::new(), "/api/auth/callback", false);
/// assert!(url.starts_with("https://test-shop.myshopify.com/admin/oauth/authorize?"));
/// assert!(url.contains("client_id=api-key"));
/// ```
#[must_use]
pub fn authorization_url(
    config: &AppConfig,
    shop: &ShopDomain,
    state: &StateParam,
    redirect_path: &str,
    is_online: bool,
) -> String {
    let redirect_uri = format!("{}{}", config.host().as_ref(), redirect_path);

    let mut params = vec![
        ("client_id", config.api_key().as_ref().to_string()),
        ("scope", config.scopes().to_string()),
        ("redirect_uri", redirect_uri),
        ("state", state.to_string()),
    ];

    if is_online {
        params.push(("grant_options[]", "per-user".to_string()));
    }

    let query_string = params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    format!("https://{shop}/admin/oauth/authorize?{query_string}")
}

// Verify BeginAuth is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<BeginAuth>();
};
