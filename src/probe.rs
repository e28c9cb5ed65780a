//! Access token validity probe.
//!
//! A stored session can look active while Shopify has already revoked its
//! token (app uninstalled, scopes changed). The probe makes one cheap Admin
//! API call; a `401` means the token is dead and OAuth must run again.

use async_trait::async_trait;
use thiserror::Error;

use crate::auth::Session;
use crate::clients::{AdminClient, HttpError, HttpResponseError};
use crate::config::ApiVersion;

const SHOP_NAME_QUERY: &str = "{ shop { name } }";

/// Failure of a validity probe.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Shopify answered with a non-2xx status.
    #[error(transparent)]
    Http(HttpResponseError),

    /// The probe never got an answer.
    #[error("Validity probe failed: {0}")]
    Transport(String),
}

impl ProbeError {
    /// Returns `true` when Shopify rejected the access token.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Http(HttpResponseError { code: 401, .. }))
    }
}

impl From<HttpError> for ProbeError {
    fn from(error: HttpError) -> Self {
        match error {
            HttpError::Response(e) => Self::Http(e),
            HttpError::Network(e) => Self::Transport(e.to_string()),
        }
    }
}

/// Checks that a session's access token is still accepted by Shopify.
#[async_trait]
pub trait ValidityProbe: Send + Sync {
    /// Makes a minimal authenticated call with `session`.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Http`] with code `401` when the token has been
    /// revoked, and other [`ProbeError`]s for unrelated failures.
    async fn probe(&self, session: &Session) -> Result<(), ProbeError>;
}

/// [`ValidityProbe`] querying `{ shop { name } }` on the Admin GraphQL API.
#[derive(Debug, Clone, Default)]
pub struct GraphqlProbe {
    api_version: ApiVersion,
    base_uri: Option<String>,
}

impl GraphqlProbe {
    /// Creates a probe using `api_version`.
    #[must_use]
    pub const fn new(api_version: ApiVersion) -> Self {
        Self {
            api_version,
            base_uri: None,
        }
    }

    /// Sends probes to `base_uri` instead of the shop host.
    #[must_use]
    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = Some(base_uri.into());
        self
    }
}

#[async_trait]
impl ValidityProbe for GraphqlProbe {
    async fn probe(&self, session: &Session) -> Result<(), ProbeError> {
        let mut client = AdminClient::new(session, &self.api_version);
        if let Some(base_uri) = &self.base_uri {
            client = client.with_base_uri(base_uri.clone());
        }

        client.query(SHOP_NAME_QUERY, None).await?;
        Ok(())
    }
}

// Verify probe types are Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ProbeError>();
    assert_send_sync::<GraphqlProbe>();
};
