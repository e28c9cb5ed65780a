//! The authenticated session record.

use std::fmt;

use crate::auth::AuthScopes;
use crate::config::ShopDomain;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An authenticated session for one shop, and optionally one user.
///
/// Sessions are produced by OAuth and persisted through a
/// [`SessionStore`](crate::auth::SessionStore); the request gate only reads
/// them. The access token is masked in `Debug` output.
///
/// # Example
///
/// ```rust
/// use shopify_app_auth::{Session, ShopDomain, AuthScopes};
///
/// let shop = ShopDomain::new("my-store.myshopify.com").unwrap();
/// let session = Session::new(
///     Session::offline_id(&shop),
///     shop,
///     "access-token".to_string(),
///     "read_products".parse().unwrap(),
///     false,
///     None,
/// );
///
/// assert_eq!(session.id, "offline_my-store.myshopify.com");
/// assert!(session.is_active());
/// assert!(!format!("{session:?}").contains("access-token"));
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier for this session.
    pub id: String,

    /// The shop this session is for.
    pub shop: ShopDomain,

    /// The access token for API authentication; empty while OAuth is in progress.
    pub access_token: String,

    /// The OAuth scopes granted to this session.
    pub scopes: AuthScopes,

    /// Whether this is an online (user-specific) session.
    pub is_online: bool,

    /// When this session expires, if applicable.
    pub expires: Option<DateTime<Utc>>,

    /// OAuth state nonce while the flow is in progress.
    pub state: Option<String>,

    /// Shopify user id for online sessions.
    pub user_id: Option<u64>,
}

impl Session {
    /// Creates a new session with the specified parameters.
    #[must_use]
    pub const fn new(
        id: String,
        shop: ShopDomain,
        access_token: String,
        scopes: AuthScopes,
        is_online: bool,
        expires: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            shop,
            access_token,
            scopes,
            is_online,
            expires,
            state: None,
            user_id: None,
        }
    }

    /// Id of the offline session for `shop`: `offline_{shop}`.
    #[must_use]
    pub fn offline_id(shop: &ShopDomain) -> String {
        format!("offline_{shop}")
    }

    /// Id of the online session for `shop` and `user`: `{shop}_{user}`.
    #[must_use]
    pub fn online_id(shop: &ShopDomain, user: impl fmt::Display) -> String {
        format!("{shop}_{user}")
    }

    /// Returns `true` if this session has expired.
    ///
    /// Sessions without an expiration time are considered never expired.
    #[must_use]
    pub fn expired(&self) -> bool {
        self.expires.is_some_and(|expires| Utc::now() > expires)
    }

    /// Returns `true` if this session is active (not expired and has access token).
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.access_token.is_empty() && !self.expired()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("shop", &self.shop)
            .field("access_token", &"*****")
            .field("scopes", &self.scopes)
            .field("is_online", &self.is_online)
            .field("expires", &self.expires)
            .field("state", &self.state.as_ref().map(|_| "*****"))
            .field("user_id", &self.user_id)
            .finish()
    }
}

// Verify Session is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Session>();
};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn shop() -> ShopDomain {
        ShopDomain::new("shop.myshopify.com").unwrap()
    }

    fn session(token: &str, expires: Option<DateTime<Utc>>) -> Session {
        Session::new(
            "id".to_string(),
            shop(),
            token.to_string(),
            AuthScopes::new(),
            false,
            expires,
        )
    }

    #[test]
    fn test_session_expired() {
        assert!(session("token", Some(Utc::now() - Duration::hours(1))).expired());
        assert!(!session("token", Some(Utc::now() + Duration::hours(1))).expired());
        assert!(!session("token", None).expired());
    }

    #[test]
    fn test_session_is_active() {
        assert!(session("token", None).is_active());
        assert!(!session("", None).is_active());
        assert!(!session("token", Some(Utc::now() - Duration::hours(1))).is_active());
    }

    #[test]
    fn test_session_ids() {
        assert_eq!(Session::offline_id(&shop()), "offline_shop.myshopify.com");
        assert_eq!(Session::online_id(&shop(), 42), "shop.myshopify.com_42");
    }

    #[test]
    fn test_session_serde_round_trip() {
        let mut original = session("token", Some(Utc::now()));
        original.user_id = Some(7);
        let json = serde_json::to_string(&original).unwrap();
        let restored: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn test_debug_masks_secrets() {
        let mut s = session("shpat_secret", None);
        s.state = Some("nonce-value".to_string());
        let debug = format!("{s:?}");
        assert!(!debug.contains("shpat_secret"));
        assert!(!debug.contains("nonce-value"));
    }
}
