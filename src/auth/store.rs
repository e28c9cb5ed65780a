//! Session persistence and current-session lookup.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::http::HeaderMap;
use axum_extra::extract::cookie::CookieJar;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::auth::cookies::read_session_id;
use crate::auth::session_token::{bearer_token, SessionTokenClaims};
use crate::auth::Session;
use crate::config::AppConfig;

/// Failure of a session storage backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionStoreError {
    /// The backend could not complete the operation.
    #[error("Session storage failed: {0}")]
    Backend(String),
}

/// Storage for sessions, keyed by [`Session::id`].
///
/// Implementations must be safe to call from concurrent requests.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Inserts or replaces `session`.
    async fn store_session(&self, session: &Session) -> Result<(), SessionStoreError>;

    /// Loads the session with `id`, if any.
    async fn load_session(&self, id: &str) -> Result<Option<Session>, SessionStoreError>;

    /// Removes the session with `id`; removing a missing id is not an error.
    async fn delete_session(&self, id: &str) -> Result<(), SessionStoreError>;
}

/// In-process [`SessionStore`] for development and tests.
///
/// Sessions are lost on restart and not shared between processes. Expired
/// sessions without an access token (abandoned OAuth attempts) are evicted
/// whenever a session is stored.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns `true` if no sessions are stored.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn store_session(&self, session: &Session) -> Result<(), SessionStoreError> {
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, stored| !(stored.access_token.is_empty() && stored.expired()));
        sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn load_session(&self, id: &str) -> Result<Option<Session>, SessionStoreError> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn delete_session(&self, id: &str) -> Result<(), SessionStoreError> {
        self.sessions.write().await.remove(id);
        Ok(())
    }
}

/// Resolves the id of the session the request belongs to.
///
/// Embedded apps first look at the `Authorization: Bearer` session token:
/// online requests map to `{shop}_{user}`, offline ones to `offline_{shop}`.
/// Without a token, or for non-embedded apps, the signed
/// `shopify_app_session` cookie is used. An invalid token yields `None`.
#[must_use]
pub fn current_session_id(
    config: &AppConfig,
    headers: &HeaderMap,
    jar: &CookieJar,
    is_online: bool,
) -> Option<String> {
    if config.is_embedded() {
        if let Some(token) = bearer_token(headers) {
            let claims = match SessionTokenClaims::decode(token, config) {
                Ok(claims) => claims,
                Err(e) => {
                    tracing::debug!(error = %e, "Ignoring invalid session token");
                    return None;
                }
            };
            let shop = match claims.shop() {
                Ok(shop) => shop,
                Err(e) => {
                    tracing::debug!(error = %e, "Ignoring session token without shop");
                    return None;
                }
            };

            return if is_online {
                claims
                    .sub
                    .as_deref()
                    .map(|user| Session::online_id(&shop, user))
            } else {
                Some(Session::offline_id(&shop))
            };
        }
    }

    read_session_id(jar, config)
}

/// Loads the session the request belongs to, if any.
///
/// # Errors
///
/// Returns the store's error if loading fails.
pub async fn load_current_session(
    store: &dyn SessionStore,
    config: &AppConfig,
    headers: &HeaderMap,
    jar: &CookieJar,
    is_online: bool,
) -> Result<Option<Session>, SessionStoreError> {
    match current_session_id(config, headers, jar, is_online) {
        Some(id) => store.load_session(&id).await,
        None => Ok(None),
    }
}
