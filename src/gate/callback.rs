//! OAuth completion: callback validation, webhooks, billing, home redirect.

use std::collections::HashMap;

use crate::auth::oauth::CallbackQuery;
use crate::auth::Session;
use crate::billing::BillingStatus;
use crate::config::AppConfig;
use crate::error::AuthError;
use crate::gate::billing_gate::check_billing;
use crate::gate::context::AuthRequestContext;
use crate::gate::redirect::redirect_to_auth;
use crate::gate::{AuthGate, RedirectDecision};
use crate::webhooks::{is_privacy_topic, RegisterOutcome};

/// Result of handling the OAuth callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// OAuth finished; point the session cookie at `session` and redirect.
    Completed {
        /// The newly stored session.
        session: Session,
        /// The app home, or the charge confirmation page when unpaid.
        redirect_url: String,
    },
    /// The OAuth cookie or session was lost; start over.
    Restart(RedirectDecision),
}

impl AuthGate {
    /// Completes OAuth for a callback request.
    ///
    /// Steps run in order: the provider validates the callback and stores
    /// the session, webhooks are registered, billing is checked when
    /// required, and the merchant is sent to the app home.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidOAuth`] if the callback fails HMAC or state checks
    /// - [`AuthError::Billing`] if the billing check fails
    /// - [`AuthError::OAuth`] for any other provider failure
    pub async fn complete_oauth(&self, ctx: &AuthRequestContext) -> Result<CallbackOutcome, AuthError> {
        let query = CallbackQuery::new(ctx.query.clone());

        let session = match self.oauth.validate_callback(&ctx.cookies, &query).await {
            Ok(session) => session,
            Err(e) if e.should_restart() => {
                tracing::info!(error = %e, "Restarting OAuth");
                return redirect_to_auth(ctx, &self.config).map(CallbackOutcome::Restart);
            }
            Err(e) => return Err(e.into()),
        };

        let outcomes = self.webhooks.register_all(&session, &self.config).await;
        log_webhook_failures(&outcomes);

        if self.config.billing().required {
            if let BillingStatus::Unpaid { confirmation_url } =
                check_billing(self.billing.as_ref(), &session, &self.config).await?
            {
                return Ok(CallbackOutcome::Completed {
                    session,
                    redirect_url: confirmation_url,
                });
            }
        }

        let redirect_url = home_url(ctx, &session, &self.config);
        tracing::debug!(shop = %session.shop, url = %redirect_url, "Redirecting to app home");
        Ok(CallbackOutcome::Completed {
            session,
            redirect_url,
        })
    }
}

fn log_webhook_failures(outcomes: &HashMap<String, RegisterOutcome>) {
    for topic in failed_topics(outcomes) {
        tracing::warn!(
            topic = %topic,
            errors = ?outcomes[topic].errors,
            "Failed to register webhook"
        );
    }
}

/// Failed registrations worth reporting, sorted by topic.
///
/// Privacy topics are configured in the Partner Dashboard and never count.
fn failed_topics(outcomes: &HashMap<String, RegisterOutcome>) -> Vec<&str> {
    let mut topics: Vec<&str> = outcomes
        .iter()
        .filter(|(topic, outcome)| !outcome.success && !is_privacy_topic(topic))
        .map(|(topic, _)| topic.as_str())
        .collect();
    topics.sort_unstable();
    topics
}

/// Where the merchant lands after OAuth.
///
/// Embedded apps open inside the admin; others get `/?shop=..&host=..`.
#[must_use]
pub fn home_url(ctx: &AuthRequestContext, session: &Session, config: &AppConfig) -> String {
    if config.is_embedded() {
        return config.embedded_app_url(&session.shop, ctx.host_param().as_ref());
    }

    let mut url = format!("/?shop={}", urlencoding::encode(session.shop.as_ref()));
    if let Some(host) = &ctx.host {
        url.push_str("&host=");
        url.push_str(&urlencoding::encode(host));
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthScopes;
    use crate::config::{ApiKey, ApiSecretKey, HostUrl, ShopDomain};
    use axum::http::HeaderMap;

    fn config(embedded: bool) -> AppConfig {
        AppConfig::builder()
            .api_key(ApiKey::new("api-key").unwrap())
            .api_secret_key(ApiSecretKey::new("secret").unwrap())
            .host(HostUrl::new("https://app.example.com").unwrap())
            .is_embedded(embedded)
            .build()
            .unwrap()
    }

    fn session() -> Session {
        Session::new(
            "offline_my-store.myshopify.com".to_string(),
            ShopDomain::new("my-store.myshopify.com").unwrap(),
            "tok".to_string(),
            AuthScopes::new(),
            false,
            None,
        )
    }

    fn ctx(host: Option<&str>) -> AuthRequestContext {
        let mut query = vec![("shop".to_string(), "my-store.myshopify.com".to_string())];
        if let Some(host) = host {
            query.push(("host".to_string(), host.to_string()));
        }
        AuthRequestContext::new(query, HeaderMap::new())
    }

    #[test]
    fn test_failed_topics_skip_privacy_topics() {
        let outcomes: HashMap<String, RegisterOutcome> = [
            ("APP_UNINSTALLED", RegisterOutcome::failed("address is invalid")),
            ("SHOP_REDACT", RegisterOutcome::failed("not registrable")),
            ("CUSTOMERS_DATA_REQUEST", RegisterOutcome::failed("not registrable")),
            ("PRODUCTS_UPDATE", RegisterOutcome::ok()),
        ]
        .into_iter()
        .map(|(topic, outcome)| (topic.to_string(), outcome))
        .collect();

        assert_eq!(failed_topics(&outcomes), vec!["APP_UNINSTALLED"]);
    }

    #[test]
    fn test_embedded_home_uses_decoded_host() {
        let url = home_url(
            &ctx(Some("YWRtaW4uc2hvcGlmeS5jb20vc3RvcmUvbXktc3RvcmU=")),
            &session(),
            &config(true),
        );
        assert_eq!(url, "https://admin.shopify.com/store/my-store/apps/api-key");
    }

    #[test]
    fn test_non_embedded_home_keeps_shop_and_host() {
        let url = home_url(&ctx(Some("abc==")), &session(), &config(false));
        assert_eq!(url, "/?shop=my-store.myshopify.com&host=abc%3D%3D");

        let url = home_url(&ctx(None), &session(), &config(false));
        assert_eq!(url, "/?shop=my-store.myshopify.com");
    }
}
