//! The request gate.
//!
//! [`AuthGate::authorize`] decides, for each request to a protected route,
//! whether it may proceed with its session or where it must be redirected:
//!
//! ```text
//! Loading ─► Validating ─┬─ Mismatched ─────────────► redirect_to_auth
//!                        ├─ Missing / Expired ──────► RedirectTopLevel(auth),
//!                        │                            exit-iframe when embedded=1
//!                        └─ Active ─┬─ billing ─────► Paid: Proceed
//!                                   │                 Unpaid: RedirectTopLevel(charge)
//!                                   └─ probe ───────► Ok: Proceed
//!                                                     401: RedirectTopLevel(auth)
//! ```
//!
//! The gate never writes sessions and never retries; the same inputs always
//! produce the same decision. Every collaborator is a trait object so tests
//! and hosts can substitute their own.

mod billing_gate;
mod callback;
mod context;
mod redirect;
mod validator;

pub use billing_gate::check_billing;
pub use callback::{home_url, CallbackOutcome};
pub use context::{AuthRequestContext, ShopParam};
pub use redirect::{exit_iframe_url, reauth_url, redirect_to_auth, resolve_reauth_shop};
pub use validator::{validate, SessionStatus};

use std::sync::Arc;

use crate::auth::oauth::{BeginAuth, OAuthProvider, ShopifyOAuth};
use crate::auth::{load_current_session, Session, SessionStore};
use crate::billing::{BillingProvider, BillingStatus, ShopifyBilling};
use crate::config::{AppConfig, ShopDomain};
use crate::error::AuthError;
use crate::probe::{GraphqlProbe, ValidityProbe};
use crate::webhooks::{ShopifyWebhookRegistry, WebhookRegistry};

/// What to do with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectDecision {
    /// Run the handler with this active session.
    Proceed {
        /// The request's session.
        session: Session,
    },
    /// Leave the admin iframe and load `url` in the top frame.
    RedirectTopLevel(String),
    /// Plain redirect to `url`, used to reach the exit-iframe page.
    RedirectClientSide(String),
    /// Start OAuth for the shop.
    BeginOAuth(ShopDomain),
}

/// Steps of [`AuthGate::authorize`], logged at `debug`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Loading the session from the store.
    Loading,
    /// Comparing the session with the request.
    Validating,
    /// Asking the billing provider.
    BillingCheck,
    /// Probing the access token.
    Probing,
    /// A decision was made.
    Decided,
}

/// Decides the fate of requests to protected routes.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use shopify_app_auth::{AppConfig, ApiKey, ApiSecretKey, HostUrl, MemorySessionStore};
/// use shopify_app_auth::gate::AuthGate;
///
/// let config = AppConfig::builder()
///     .api_key(ApiKey::new("key").unwrap())
///     .api_secret_key(ApiSecretKey::new("secret").unwrap())
///     .host(HostUrl::new("https://myapp.example.com").unwrap())
///     .build()
///     .unwrap();
///
/// let gate = AuthGate::new(Arc::new(config), Arc::new(MemorySessionStore::new()));
/// assert_eq!(gate.config().auth_path(), "/api/auth");
/// ```
#[derive(Clone)]
pub struct AuthGate {
    config: Arc<AppConfig>,
    sessions: Arc<dyn SessionStore>,
    oauth: Arc<dyn OAuthProvider>,
    billing: Arc<dyn BillingProvider>,
    probe: Arc<dyn ValidityProbe>,
    webhooks: Arc<dyn WebhookRegistry>,
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// Verify AuthGate is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<AuthGate>();
};

impl AuthGate {
    /// Creates a gate using the Shopify implementations of every
    /// collaborator and no webhook subscriptions.
    #[must_use]
    pub fn new(config: Arc<AppConfig>, sessions: Arc<dyn SessionStore>) -> Self {
        let oauth = ShopifyOAuth::new(Arc::clone(&config), Arc::clone(&sessions));
        let probe = GraphqlProbe::new(config.api_version().clone());
        Self {
            oauth: Arc::new(oauth),
            billing: Arc::new(ShopifyBilling::new()),
            probe: Arc::new(probe),
            webhooks: Arc::new(ShopifyWebhookRegistry::new(Vec::new())),
            config,
            sessions,
        }
    }

    /// Replaces the OAuth provider.
    #[must_use]
    pub fn with_oauth(mut self, oauth: Arc<dyn OAuthProvider>) -> Self {
        self.oauth = oauth;
        self
    }

    /// Replaces the billing provider.
    #[must_use]
    pub fn with_billing(mut self, billing: Arc<dyn BillingProvider>) -> Self {
        self.billing = billing;
        self
    }

    /// Replaces the validity probe.
    #[must_use]
    pub fn with_probe(mut self, probe: Arc<dyn ValidityProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Replaces the webhook registry.
    #[must_use]
    pub fn with_webhooks(mut self, webhooks: Arc<dyn WebhookRegistry>) -> Self {
        self.webhooks = webhooks;
        self
    }

    /// Returns the app configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Decides what happens to a request for a protected route.
    ///
    /// # Errors
    ///
    /// - [`AuthError::MissingShop`] / [`AuthError::InvalidShop`] when
    ///   re-auth is needed but no usable shop is known
    /// - [`AuthError::Billing`] when the billing check fails
    /// - [`AuthError::Probe`] when the probe fails with anything but `401`
    /// - [`AuthError::Session`] when the session store fails
    pub async fn authorize(&self, ctx: &AuthRequestContext) -> Result<RedirectDecision, AuthError> {
        trace_state(GateState::Loading);
        let session = load_current_session(
            self.sessions.as_ref(),
            &self.config,
            &ctx.headers,
            &ctx.cookies,
            self.config.use_online_tokens(),
        )
        .await?;

        trace_state(GateState::Validating);
        let decision = match validate(ctx, session) {
            SessionStatus::Mismatched(session) => {
                tracing::info!(
                    session_shop = %session.shop,
                    requested_shop = ?ctx.requested_shop,
                    "Session belongs to another shop"
                );
                redirect_to_auth(ctx, &self.config)?
            }
            SessionStatus::Missing => self.reauth(ctx, None)?,
            SessionStatus::Expired(session) => self.reauth(ctx, Some(&session))?,
            SessionStatus::Active(session) if self.config.billing().required => {
                trace_state(GateState::BillingCheck);
                match check_billing(self.billing.as_ref(), &session, &self.config).await {
                    Ok(BillingStatus::Paid) => RedirectDecision::Proceed { session },
                    Ok(BillingStatus::Unpaid { confirmation_url }) => {
                        RedirectDecision::RedirectTopLevel(confirmation_url)
                    }
                    Err(e) if e.is_unauthorized() => {
                        tracing::info!(shop = %session.shop, "Access token rejected during billing check");
                        self.reauth(ctx, Some(&session))?
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            SessionStatus::Active(session) => {
                trace_state(GateState::Probing);
                match self.probe.probe(&session).await {
                    Ok(()) => RedirectDecision::Proceed { session },
                    Err(e) if e.is_unauthorized() => {
                        tracing::info!(shop = %session.shop, "Access token revoked");
                        self.reauth(ctx, Some(&session))?
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };

        trace_state(GateState::Decided);
        tracing::debug!(decision = ?decision, "Gate decision");
        Ok(decision)
    }

    /// Starts OAuth for `shop` with the configured callback path and token
    /// mode.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::OAuth`] if the provider cannot start the flow.
    pub async fn begin_oauth(&self, shop: &ShopDomain) -> Result<BeginAuth, AuthError> {
        let begin = self
            .oauth
            .begin_auth(
                shop,
                self.config.callback_path(),
                self.config.use_online_tokens(),
            )
            .await?;
        Ok(begin)
    }

    /// Embedded document loads leave the iframe first; everything else gets
    /// a top-level redirect to the auth route.
    fn reauth(
        &self,
        ctx: &AuthRequestContext,
        session: Option<&Session>,
    ) -> Result<RedirectDecision, AuthError> {
        let shop = resolve_reauth_shop(ctx, session, &self.config)?;
        if ctx.embedded {
            return Ok(RedirectDecision::RedirectClientSide(exit_iframe_url(
                ctx,
                &shop,
                &self.config,
            )));
        }
        Ok(RedirectDecision::RedirectTopLevel(reauth_url(&shop, &self.config)))
    }
}

fn trace_state(state: GateState) {
    tracing::debug!(state = ?state, "Auth gate");
}
