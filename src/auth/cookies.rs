//! Signed session cookies.
//!
//! A session id travels in two cookies: `shopify_app_session` holds the id and
//! `shopify_app_session.sig` holds an HMAC-SHA256 of `name=value` under the
//! app secret. A value whose signature does not verify is treated as absent.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::auth::oauth::hmac::{compute_signature_base64, verify_signature_base64};
use crate::config::AppConfig;

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE_NAME: &str = "shopify_app_session";

/// Lifetime of the cookie set while OAuth is in progress.
pub const OAUTH_COOKIE_MAX_AGE_SECS: i64 = 60;

fn signature_cookie_name() -> String {
    format!("{SESSION_COOKIE_NAME}.sig")
}

fn build(name: String, value: String, max_age_secs: Option<i64>) -> Cookie<'static> {
    let mut builder = Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax);
    if let Some(secs) = max_age_secs {
        builder = builder.max_age(time::Duration::seconds(secs.max(0)));
    }
    builder.build()
}

/// Builds the session cookie and its signature cookie for `session_id`.
///
/// `max_age_secs` of `None` produces browser-session cookies.
#[must_use]
pub fn session_cookies(
    session_id: &str,
    config: &AppConfig,
    max_age_secs: Option<i64>,
) -> [Cookie<'static>; 2] {
    let signed = format!("{SESSION_COOKIE_NAME}={session_id}");
    let signature = compute_signature_base64(signed.as_bytes(), config.api_secret_key().as_ref());

    [
        build(
            SESSION_COOKIE_NAME.to_string(),
            session_id.to_string(),
            max_age_secs,
        ),
        build(signature_cookie_name(), signature, max_age_secs),
    ]
}

/// Reads the session id from `jar` if its signature verifies under any
/// configured secret.
#[must_use]
pub fn read_session_id(jar: &CookieJar, config: &AppConfig) -> Option<String> {
    let value = jar.get(SESSION_COOKIE_NAME)?.value().to_string();
    let signature = jar.get(&signature_cookie_name())?.value().to_string();

    let signed = format!("{SESSION_COOKIE_NAME}={value}");
    if verify_signature_base64(signed.as_bytes(), &signature, config) {
        Some(value)
    } else {
        tracing::debug!("Ignoring session cookie with invalid signature");
        None
    }
}
