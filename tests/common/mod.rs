//! Shared fixtures for the gate and HTTP integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{header, HeaderMap, HeaderValue};
use axum_extra::extract::cookie::CookieJar;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use shopify_app_auth::auth::cookies::session_cookies;
use shopify_app_auth::auth::oauth::{BeginAuth, CallbackQuery};
use shopify_app_auth::clients::HttpResponseError;
use shopify_app_auth::gate::AuthGate;
use shopify_app_auth::{
    ApiKey, ApiSecretKey, AppConfig, AuthScopes, BillingConfig, BillingError, BillingInterval,
    BillingProvider, BillingStatus, HostUrl, MemorySessionStore, OAuthError, OAuthProvider,
    ProbeError, RegisterOutcome, Session, SessionStore, ShopDomain, ValidityProbe,
    WebhookRegistry,
};

pub const API_KEY: &str = "api-key";
pub const SECRET: &str = "secret";
pub const SHOP: &str = "test.myshopify.com";
pub const CONFIRMATION_URL: &str = "https://test.myshopify.com/admin/charges/confirm?id=1";
/// base64 of `admin.shopify.com/store/test`.
pub const HOST_PARAM: &str = "YWRtaW4uc2hvcGlmeS5jb20vc3RvcmUvdGVzdA==";

pub fn config(embedded: bool, billing_required: bool) -> AppConfig {
    let mut builder = AppConfig::builder()
        .api_key(ApiKey::new(API_KEY).unwrap())
        .api_secret_key(ApiSecretKey::new(SECRET).unwrap())
        .host(HostUrl::new("https://app.example.com").unwrap())
        .is_embedded(embedded);
    if billing_required {
        builder = builder.billing(BillingConfig::required(
            "Pro plan",
            9.99,
            "USD",
            BillingInterval::Every30Days,
        ));
    }
    builder.build().unwrap()
}

pub fn shop(domain: &str) -> ShopDomain {
    ShopDomain::new(domain).unwrap()
}

pub fn active_session(domain: &str) -> Session {
    let shop = shop(domain);
    Session::new(
        Session::offline_id(&shop),
        shop,
        "shpat_token".to_string(),
        AuthScopes::new(),
        false,
        None,
    )
}

pub fn expired_session(domain: &str) -> Session {
    let shop = shop(domain);
    Session::new(
        Session::offline_id(&shop),
        shop,
        "shpat_token".to_string(),
        AuthScopes::new(),
        false,
        Some(Utc::now() - Duration::hours(1)),
    )
}

pub fn session_token(domain: &str) -> String {
    let now = Utc::now().timestamp();
    encode(
        &Header::default(),
        &serde_json::json!({
            "iss": format!("https://{domain}/admin"),
            "dest": format!("https://{domain}"),
            "aud": API_KEY,
            "sub": "42",
            "exp": now + 60,
            "nbf": now - 5,
            "iat": now,
            "jti": "jti",
            "sid": "sid",
        }),
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

/// `Cookie` header value carrying a signed session cookie for `session_id`.
pub fn cookie_header(session_id: &str, config: &AppConfig) -> String {
    session_cookies(session_id, config, None)
        .iter()
        .map(|c| format!("{}={}", c.name(), c.value()))
        .collect::<Vec<_>>()
        .join("; ")
}

pub fn bearer_headers(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
    );
    headers
}

pub fn cookie_headers(session_id: &str, config: &AppConfig) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::COOKIE,
        HeaderValue::from_str(&cookie_header(session_id, config)).unwrap(),
    );
    headers
}

/// How [`FakeOAuth::validate_callback`] answers.
#[derive(Clone)]
pub enum CallbackBehavior {
    Succeed(Session),
    InvalidHmac,
    CookieNotFound,
    SessionNotFound,
    ExchangeFailed,
}

pub struct FakeOAuth {
    pub behavior: CallbackBehavior,
    pub begin_calls: AtomicUsize,
    pub callback_calls: AtomicUsize,
}

impl FakeOAuth {
    pub fn new(behavior: CallbackBehavior) -> Self {
        Self {
            behavior,
            begin_calls: AtomicUsize::new(0),
            callback_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl OAuthProvider for FakeOAuth {
    async fn begin_auth(
        &self,
        shop: &ShopDomain,
        callback_path: &str,
        _is_online: bool,
    ) -> Result<BeginAuth, OAuthError> {
        self.begin_calls.fetch_add(1, Ordering::SeqCst);
        Ok(BeginAuth {
            auth_url: format!("https://{shop}/admin/oauth/authorize?redirect={callback_path}"),
            cookies: Vec::new(),
        })
    }

    async fn validate_callback(
        &self,
        _jar: &CookieJar,
        query: &CallbackQuery,
    ) -> Result<Session, OAuthError> {
        self.callback_calls.fetch_add(1, Ordering::SeqCst);
        let shop = query.shop().unwrap_or_default().to_string();
        match &self.behavior {
            CallbackBehavior::Succeed(session) => Ok(session.clone()),
            CallbackBehavior::InvalidHmac => Err(OAuthError::InvalidHmac),
            CallbackBehavior::CookieNotFound => Err(OAuthError::CookieNotFound { shop }),
            CallbackBehavior::SessionNotFound => Err(OAuthError::SessionNotFound { shop }),
            CallbackBehavior::ExchangeFailed => Err(OAuthError::TokenExchangeFailed {
                status: 400,
                message: "invalid code".to_string(),
            }),
        }
    }
}

pub struct FakeBilling {
    pub result: Result<BillingStatus, BillingError>,
    pub calls: AtomicUsize,
}

impl FakeBilling {
    pub fn paid() -> Self {
        Self::with(Ok(BillingStatus::Paid))
    }

    pub fn unpaid() -> Self {
        Self::with(Ok(BillingStatus::Unpaid {
            confirmation_url: CONFIRMATION_URL.to_string(),
        }))
    }

    pub fn failing(status: Option<u16>) -> Self {
        Self::with(Err(BillingError {
            message: "Error while billing the store".to_string(),
            error_data: serde_json::json!([{ "message": "boom" }]),
            status,
        }))
    }

    fn with(result: Result<BillingStatus, BillingError>) -> Self {
        Self {
            result,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl BillingProvider for FakeBilling {
    async fn ensure_billing(
        &self,
        _session: &Session,
        _config: &AppConfig,
    ) -> Result<BillingStatus, BillingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Status the fake probe fails with, or `None` to succeed.
pub struct FakeProbe {
    pub failure: Option<u16>,
    pub calls: AtomicUsize,
}

impl FakeProbe {
    pub fn ok() -> Self {
        Self::failing_with(None)
    }

    pub fn failing_with(failure: Option<u16>) -> Self {
        Self {
            failure,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ValidityProbe for FakeProbe {
    async fn probe(&self, _session: &Session) -> Result<(), ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.failure {
            None => Ok(()),
            Some(code) => Err(ProbeError::Http(HttpResponseError {
                code,
                message: "probe failed".to_string(),
                error_reference: None,
            })),
        }
    }
}

pub struct FakeWebhooks {
    pub outcomes: HashMap<String, RegisterOutcome>,
    pub calls: AtomicUsize,
}

impl FakeWebhooks {
    pub fn new(outcomes: &[(&str, RegisterOutcome)]) -> Self {
        Self {
            outcomes: outcomes
                .iter()
                .map(|(topic, outcome)| ((*topic).to_string(), outcome.clone()))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl WebhookRegistry for FakeWebhooks {
    async fn register_all(
        &self,
        _session: &Session,
        _config: &AppConfig,
    ) -> HashMap<String, RegisterOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcomes.clone()
    }
}

/// A gate wired to fakes, keeping handles to inspect them.
pub struct Harness {
    pub gate: AuthGate,
    pub store: Arc<MemorySessionStore>,
    pub oauth: Arc<FakeOAuth>,
    pub billing: Arc<FakeBilling>,
    pub probe: Arc<FakeProbe>,
    pub webhooks: Arc<FakeWebhooks>,
}

pub struct HarnessBuilder {
    config: AppConfig,
    sessions: Vec<Session>,
    oauth: FakeOAuth,
    billing: FakeBilling,
    probe: FakeProbe,
    webhooks: FakeWebhooks,
}

impl HarnessBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            sessions: Vec::new(),
            oauth: FakeOAuth::new(CallbackBehavior::Succeed(active_session(SHOP))),
            billing: FakeBilling::paid(),
            probe: FakeProbe::ok(),
            webhooks: FakeWebhooks::new(&[]),
        }
    }

    pub fn session(mut self, session: Session) -> Self {
        self.sessions.push(session);
        self
    }

    pub fn oauth(mut self, oauth: FakeOAuth) -> Self {
        self.oauth = oauth;
        self
    }

    pub fn billing(mut self, billing: FakeBilling) -> Self {
        self.billing = billing;
        self
    }

    pub fn probe(mut self, probe: FakeProbe) -> Self {
        self.probe = probe;
        self
    }

    pub fn webhooks(mut self, webhooks: FakeWebhooks) -> Self {
        self.webhooks = webhooks;
        self
    }

    pub async fn build(self) -> Harness {
        let store = Arc::new(MemorySessionStore::new());
        for session in &self.sessions {
            store.store_session(session).await.unwrap();
        }

        let oauth = Arc::new(self.oauth);
        let billing = Arc::new(self.billing);
        let probe = Arc::new(self.probe);
        let webhooks = Arc::new(self.webhooks);

        let gate = AuthGate::new(Arc::new(self.config), store.clone())
            .with_oauth(oauth.clone())
            .with_billing(billing.clone())
            .with_probe(probe.clone())
            .with_webhooks(webhooks.clone());

        Harness {
            gate,
            store,
            oauth,
            billing,
            probe,
            webhooks,
        }
    }
}

pub fn calls(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}
