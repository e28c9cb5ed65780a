//! Where to send a request that must (re)authenticate.

use crate::auth::{Session, SessionTokenClaims};
use crate::config::{AppConfig, ShopDomain};
use crate::error::AuthError;
use crate::gate::context::{AuthRequestContext, ShopParam};
use crate::gate::RedirectDecision;

/// Decides how to start OAuth for the shop named by the request.
///
/// Embedded requests (`embedded=1`) cannot follow a redirect to Shopify
/// from inside the admin iframe, so they are sent to the exit-iframe page
/// with a `redirectUri` pointing back at the auth route. Everything else
/// begins OAuth directly.
///
/// # Errors
///
/// - [`AuthError::MissingShop`] if the request has no `shop`
/// - [`AuthError::InvalidShop`] if `shop` is not a Shopify shop domain
pub fn redirect_to_auth(
    ctx: &AuthRequestContext,
    config: &AppConfig,
) -> Result<RedirectDecision, AuthError> {
    let shop = match &ctx.requested_shop {
        ShopParam::Absent => return Err(AuthError::MissingShop),
        ShopParam::Invalid(raw) => return Err(AuthError::InvalidShop { shop: raw.clone() }),
        ShopParam::Valid(shop) => shop.clone(),
    };

    if ctx.embedded {
        let url = exit_iframe_url(ctx, &shop, config);
        tracing::debug!(shop = %shop, url = %url, "Breaking out of iframe");
        Ok(RedirectDecision::RedirectClientSide(url))
    } else {
        Ok(RedirectDecision::BeginOAuth(shop))
    }
}

/// Builds `{exit_iframe_path}?{query}` for an embedded re-auth.
///
/// Every original parameter is kept in order, `shop` is replaced with its
/// sanitized form and `redirectUri` is set to the absolute auth URL.
#[must_use]
pub fn exit_iframe_url(ctx: &AuthRequestContext, shop: &ShopDomain, config: &AppConfig) -> String {
    let mut redirect_uri = format!(
        "https://{}{}?shop={}",
        config.host().authority(),
        config.auth_path(),
        urlencoding::encode(shop.as_ref())
    );
    if let Some(host) = &ctx.host {
        redirect_uri.push_str("&host=");
        redirect_uri.push_str(&urlencoding::encode(host));
    }

    let mut pairs: Vec<(&str, &str)> = ctx
        .query
        .iter()
        .filter(|(k, _)| k != "redirectUri")
        .map(|(k, v)| {
            if k == "shop" {
                (k.as_str(), shop.as_ref())
            } else {
                (k.as_str(), v.as_str())
            }
        })
        .collect();
    pairs.push(("redirectUri", redirect_uri.as_str()));

    let query = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}?{query}", config.exit_iframe_path())
}

/// Recovers the shop to re-authenticate.
///
/// Tries, in order: the request's `shop` parameter, the session's shop,
/// and (embedded apps only) the `dest` of a verified session token.
///
/// # Errors
///
/// - [`AuthError::InvalidShop`] if the request names an unsanitizable shop
/// - [`AuthError::MissingShop`] if no source yields a shop
pub fn resolve_reauth_shop(
    ctx: &AuthRequestContext,
    session: Option<&Session>,
    config: &AppConfig,
) -> Result<ShopDomain, AuthError> {
    match &ctx.requested_shop {
        ShopParam::Valid(shop) => return Ok(shop.clone()),
        ShopParam::Invalid(raw) => return Err(AuthError::InvalidShop { shop: raw.clone() }),
        ShopParam::Absent => {}
    }

    if let Some(session) = session {
        return Ok(session.shop.clone());
    }

    if config.is_embedded() {
        if let Some(token) = &ctx.bearer_token {
            match SessionTokenClaims::decode(token, config).and_then(|claims| claims.shop()) {
                Ok(shop) => return Ok(shop),
                Err(e) => tracing::debug!(error = %e, "Session token does not name a shop"),
            }
        }
    }

    Err(AuthError::MissingShop)
}

/// Top-level re-auth target: `{auth_path}?shop={shop}`.
#[must_use]
pub fn reauth_url(shop: &ShopDomain, config: &AppConfig) -> String {
    format!(
        "{}?shop={}",
        config.auth_path(),
        urlencoding::encode(shop.as_ref())
    )
}
