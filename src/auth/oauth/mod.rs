//! OAuth 2.0 authorization code flow for Shopify apps.
//!
//! The flow has two halves, both behind the [`OAuthProvider`] trait so the
//! request gate can be driven by any implementation:
//!
//! 1. [`OAuthProvider::begin_auth`] creates an in-progress OAuth session
//!    holding a fresh [`StateParam`], persists it, and returns the Shopify
//!    authorization URL together with signed cookies pointing at it.
//! 2. [`OAuthProvider::validate_callback`] reads those cookies back, checks
//!    the `hmac` signature and `state` nonce in constant time, exchanges the
//!    authorization code for an access token and persists the finished
//!    session.
//!
//! [`ShopifyOAuth`] is the implementation talking to Shopify.
//!
//! # Key Rotation
//!
//! Callback HMACs and cookie signatures are accepted under the primary
//! secret or `old_api_secret_key`.

mod begin_auth;
mod callback;
mod error;
pub mod hmac;
mod state;

pub use begin_auth::{authorization_url, BeginAuth};
pub use callback::CallbackQuery;
pub use error::OAuthError;
pub use hmac::{compute_signature, constant_time_compare, validate_hmac};
pub use state::StateParam;

use std::sync::Arc;

use async_trait::async_trait;
use axum_extra::extract::cookie::CookieJar;
use chrono::{Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::auth::cookies::{read_session_id, session_cookies, OAUTH_COOKIE_MAX_AGE_SECS};
use crate::auth::{AuthScopes, Session, SessionStore};
use crate::config::{AppConfig, ShopDomain};

/// Starts and completes the OAuth authorization code flow.
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Starts OAuth for `shop`, sending Shopify back to `callback_path`.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::Store`] if the in-progress session cannot be
    /// persisted.
    async fn begin_auth(
        &self,
        shop: &ShopDomain,
        callback_path: &str,
        is_online: bool,
    ) -> Result<BeginAuth, OAuthError>;

    /// Completes OAuth from the callback request and returns the new session.
    ///
    /// # Errors
    ///
    /// - [`OAuthError::CookieNotFound`] if the signed OAuth cookie is missing
    /// - [`OAuthError::SessionNotFound`] if the cookie points at nothing
    /// - [`OAuthError::InvalidHmac`] / [`OAuthError::StateMismatch`] /
    ///   [`OAuthError::InvalidCallback`] if the callback cannot be trusted
    /// - [`OAuthError::TokenExchangeFailed`] if Shopify rejects the code
    async fn validate_callback(
        &self,
        jar: &CookieJar,
        query: &CallbackQuery,
    ) -> Result<Session, OAuthError>;
}

/// [`OAuthProvider`] backed by Shopify's OAuth endpoints and a
/// [`SessionStore`].
///
/// ```rust
/// use std::sync::Arc;
/// use shopify_app_auth::{AppConfig, ApiKey, ApiSecretKey, HostUrl, MemorySessionStore};
/// use shopify_app_auth::auth::oauth::ShopifyOAuth;
///
/// let config = AppConfig::builder()
///     .api_key(ApiKey::new("key").unwrap())
///     .api_secret_key(ApiSecretKey::new("secret").unwrap())
///     .host(HostUrl::new("https://myapp.example.com").unwrap())
///     .build()
///     .unwrap();
///
/// let oauth = ShopifyOAuth::new(Arc::new(config), Arc::new(MemorySessionStore::new()));
/// ```
pub struct ShopifyOAuth {
    config: Arc<AppConfig>,
    store: Arc<dyn SessionStore>,
    client: reqwest::Client,
    token_base_uri: Option<String>,
}

impl std::fmt::Debug for ShopifyOAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyOAuth")
            .field("config", &self.config)
            .field("token_base_uri", &self.token_base_uri)
            .finish_non_exhaustive()
    }
}

impl ShopifyOAuth {
    /// Length of random ids given to in-progress OAuth sessions.
    const OAUTH_SESSION_ID_LENGTH: usize = 32;

    /// Creates a provider persisting sessions in `store`.
    #[must_use]
    pub fn new(config: Arc<AppConfig>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            config,
            store,
            client: reqwest::Client::new(),
            token_base_uri: None,
        }
    }

    /// Sends the token exchange to `base_uri` instead of `https://{shop}`.
    #[must_use]
    pub fn with_token_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.token_base_uri = Some(base_uri.into());
        self
    }

    fn oauth_session_id() -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(Self::OAUTH_SESSION_ID_LENGTH)
            .map(char::from)
            .collect()
    }

    fn parse_callback(query: &CallbackQuery) -> Result<(ShopDomain, &str, &str), OAuthError> {
        let invalid = |reason: &str| OAuthError::InvalidCallback {
            reason: reason.to_string(),
        };

        let shop = query
            .shop()
            .ok_or_else(|| invalid("missing shop"))
            .and_then(|shop| ShopDomain::new(shop).map_err(|_| invalid("invalid shop")))?;
        let code = query
            .code()
            .filter(|code| !code.is_empty())
            .ok_or_else(|| invalid("missing code"))?;
        let state = query.state().ok_or_else(|| invalid("missing state"))?;

        Ok((shop, code, state))
    }
}

#[async_trait]
impl OAuthProvider for ShopifyOAuth {
    async fn begin_auth(
        &self,
        shop: &ShopDomain,
        callback_path: &str,
        is_online: bool,
    ) -> Result<BeginAuth, OAuthError> {
        let state = StateParam::new();

        let mut session = Session::new(
            Self::oauth_session_id(),
            shop.clone(),
            String::new(),
            AuthScopes::new(),
            is_online,
            Some(Utc::now() + Duration::seconds(OAUTH_COOKIE_MAX_AGE_SECS)),
        );
        session.state = Some(state.to_string());
        self.store.store_session(&session).await?;

        tracing::debug!(shop = %shop, is_online, "Beginning OAuth");

        Ok(BeginAuth {
            auth_url: authorization_url(&self.config, shop, &state, callback_path, is_online),
            cookies: session_cookies(&session.id, &self.config, Some(OAUTH_COOKIE_MAX_AGE_SECS))
                .to_vec(),
        })
    }

    async fn validate_callback(
        &self,
        jar: &CookieJar,
        query: &CallbackQuery,
    ) -> Result<Session, OAuthError> {
        let (shop, code, received_state) = Self::parse_callback(query)?;

        let oauth_session_id =
            read_session_id(jar, &self.config).ok_or_else(|| OAuthError::CookieNotFound {
                shop: shop.to_string(),
            })?;
        let oauth_session = self
            .store
            .load_session(&oauth_session_id)
            .await?
            .ok_or_else(|| OAuthError::SessionNotFound {
                shop: shop.to_string(),
            })?;

        // The in-progress session is single-use whatever the outcome.
        self.store.delete_session(&oauth_session.id).await?;

        if !validate_hmac(query, &self.config) {
            tracing::warn!(shop = %shop, "OAuth callback failed HMAC validation");
            return Err(OAuthError::InvalidHmac);
        }

        let expected_state = oauth_session.state.as_deref().unwrap_or_default();
        if expected_state.is_empty() || !constant_time_compare(expected_state, received_state) {
            tracing::warn!(shop = %shop, "OAuth callback state mismatch");
            return Err(OAuthError::StateMismatch);
        }

        let session = callback::exchange_code(
            &self.client,
            &self.config,
            &shop,
            code,
            self.token_base_uri.as_deref(),
        )
        .await?;

        self.store.store_session(&session).await?;

        tracing::info!(shop = %shop, is_online = session.is_online, "OAuth completed");
        Ok(session)
    }
}

// Verify ShopifyOAuth is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ShopifyOAuth>();
};
