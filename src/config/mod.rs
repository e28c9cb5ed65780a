//! Configuration types for the authentication middleware.
//!
//! The main types in this module are:
//!
//! - [`AppConfig`]: immutable configuration shared by every component
//! - [`AppConfigBuilder`]: a builder for constructing [`AppConfig`] instances
//! - [`BillingConfig`]: the optional billing requirement
//! - Validated newtypes: [`ApiKey`], [`ApiSecretKey`], [`ShopDomain`],
//!   [`HostParam`], [`HostUrl`] and [`ApiVersion`]
//!
//! # Example
//!
//! ```rust
//! use shopify_app_auth::{AppConfig, ApiKey, ApiSecretKey, HostUrl};
//!
//! let config = AppConfig::builder()
//!     .api_key(ApiKey::new("my-api-key").unwrap())
//!     .api_secret_key(ApiSecretKey::new("my-secret").unwrap())
//!     .host(HostUrl::new("https://myapp.example.com").unwrap())
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.auth_path(), "/api/auth");
//! ```

mod billing;
mod newtypes;

pub use billing::{BillingConfig, BillingInterval};
pub use newtypes::{ApiKey, ApiSecretKey, ApiVersion, HostParam, HostUrl, ShopDomain};

use crate::auth::AuthScopes;
use crate::error::ConfigError;

/// Configuration for the authentication middleware.
///
/// Built once at startup and injected into every component; it is never
/// mutated afterwards.
///
/// # Key Rotation
///
/// `old_api_secret_key` is tried after the primary secret when validating
/// OAuth callback signatures, signed cookies and App Bridge session tokens,
/// so in-flight requests survive a secret rotation.
#[derive(Clone, Debug)]
pub struct AppConfig {
    api_key: ApiKey,
    api_secret_key: ApiSecretKey,
    old_api_secret_key: Option<ApiSecretKey>,
    scopes: AuthScopes,
    host: HostUrl,
    api_version: ApiVersion,
    is_embedded: bool,
    use_online_tokens: bool,
    billing: BillingConfig,
    auth_path: String,
    callback_path: String,
    exit_iframe_path: String,
}

impl AppConfig {
    /// Creates a new builder for constructing an `AppConfig`.
    #[must_use]
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::new()
    }

    /// Builds a configuration from process environment variables.
    ///
    /// | Variable | Required | Meaning |
    /// |---|---|---|
    /// | `SHOPIFY_API_KEY` | yes | app API key |
    /// | `SHOPIFY_API_SECRET` | yes | app API secret |
    /// | `HOST` | yes | public app URL |
    /// | `SHOPIFY_API_SECRET_OLD` | no | previous secret during rotation |
    /// | `SCOPES` | no | comma separated scopes |
    /// | `SHOPIFY_API_VERSION` | no | Admin API version |
    /// | `SHOPIFY_EMBEDDED` | no | `true`/`false`, default `true` |
    /// | `SHOPIFY_USE_ONLINE_TOKENS` | no | `true`/`false`, default `false` |
    ///
    /// Billing cannot be expressed through the environment; set it on the
    /// returned builder.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] for absent required variables,
    /// [`ConfigError::InvalidEnvVar`] for unparsable booleans, and the
    /// newtype validation errors for malformed values.
    pub fn from_env() -> Result<AppConfigBuilder, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(
        lookup: impl Fn(&'static str) -> Option<String>,
    ) -> Result<AppConfigBuilder, ConfigError> {
        let required = |var: &'static str| lookup(var).ok_or(ConfigError::MissingEnvVar { var });
        let flag = |var: &'static str| -> Result<Option<bool>, ConfigError> {
            lookup(var)
                .map(|value| match value.to_ascii_lowercase().as_str() {
                    "1" | "true" | "yes" => Ok(true),
                    "0" | "false" | "no" => Ok(false),
                    _ => Err(ConfigError::InvalidEnvVar { var, value }),
                })
                .transpose()
        };

        let mut builder = AppConfigBuilder::new()
            .api_key(ApiKey::new(required("SHOPIFY_API_KEY")?)?)
            .api_secret_key(ApiSecretKey::new(required("SHOPIFY_API_SECRET")?)?)
            .host(HostUrl::new(required("HOST")?)?);

        if let Some(old) = lookup("SHOPIFY_API_SECRET_OLD") {
            builder = builder.old_api_secret_key(ApiSecretKey::new(old)?);
        }
        if let Some(scopes) = lookup("SCOPES") {
            builder = builder.scopes(scopes.parse()?);
        }
        if let Some(version) = lookup("SHOPIFY_API_VERSION") {
            builder = builder.api_version(ApiVersion::new(version)?);
        }
        if let Some(embedded) = flag("SHOPIFY_EMBEDDED")? {
            builder = builder.is_embedded(embedded);
        }
        if let Some(online) = flag("SHOPIFY_USE_ONLINE_TOKENS")? {
            builder = builder.use_online_tokens(online);
        }

        Ok(builder)
    }

    /// Returns the API key.
    #[must_use]
    pub const fn api_key(&self) -> &ApiKey {
        &self.api_key
    }

    /// Returns the API secret key.
    #[must_use]
    pub const fn api_secret_key(&self) -> &ApiSecretKey {
        &self.api_secret_key
    }

    /// Returns the old API secret key, if configured.
    #[must_use]
    pub const fn old_api_secret_key(&self) -> Option<&ApiSecretKey> {
        self.old_api_secret_key.as_ref()
    }

    /// Returns the primary secret followed by the old one, if any.
    pub fn secrets(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.api_secret_key.as_ref())
            .chain(self.old_api_secret_key.as_ref().map(AsRef::as_ref))
    }

    /// Returns the OAuth scopes requested at install time.
    #[must_use]
    pub const fn scopes(&self) -> &AuthScopes {
        &self.scopes
    }

    /// Returns the public URL of the app.
    #[must_use]
    pub const fn host(&self) -> &HostUrl {
        &self.host
    }

    /// Returns the Admin API version.
    #[must_use]
    pub const fn api_version(&self) -> &ApiVersion {
        &self.api_version
    }

    /// Returns whether the app is embedded in the Shopify admin.
    #[must_use]
    pub const fn is_embedded(&self) -> bool {
        self.is_embedded
    }

    /// Returns whether OAuth requests online (per-user) access tokens.
    #[must_use]
    pub const fn use_online_tokens(&self) -> bool {
        self.use_online_tokens
    }

    /// Returns the billing requirement.
    #[must_use]
    pub const fn billing(&self) -> &BillingConfig {
        &self.billing
    }

    /// Path of the route that starts OAuth (default `/api/auth`).
    #[must_use]
    pub fn auth_path(&self) -> &str {
        &self.auth_path
    }

    /// Path Shopify redirects back to after approval (default `/api/auth/callback`).
    #[must_use]
    pub fn callback_path(&self) -> &str {
        &self.callback_path
    }

    /// Frontend path that breaks out of the admin iframe (default `/exitiframe`).
    #[must_use]
    pub fn exit_iframe_path(&self) -> &str {
        &self.exit_iframe_path
    }

    /// URL of the app inside the Shopify admin.
    ///
    /// Uses the decoded `host` parameter when the request carried one,
    /// otherwise the shop's admin at `admin.shopify.com`.
    ///
    /// ```rust
    /// use shopify_app_auth::{AppConfig, ApiKey, ApiSecretKey, HostParam, HostUrl, ShopDomain};
    ///
    /// let config = AppConfig::builder()
    ///     .api_key(ApiKey::new("api-key").unwrap())
    ///     .api_secret_key(ApiSecretKey::new("secret").unwrap())
    ///     .host(HostUrl::new("https://myapp.example.com").unwrap())
    ///     .build()
    ///     .unwrap();
    /// let shop = ShopDomain::new("my-store.myshopify.com").unwrap();
    ///
    /// assert_eq!(
    ///     config.embedded_app_url(&shop, None),
    ///     "https://admin.shopify.com/store/my-store/apps/api-key"
    /// );
    ///
    /// let host = HostParam::new("bXktc3RvcmUubXlzaG9waWZ5LmNvbS9hZG1pbg").unwrap();
    /// assert_eq!(
    ///     config.embedded_app_url(&shop, Some(&host)),
    ///     "https://my-store.myshopify.com/admin/apps/api-key"
    /// );
    /// ```
    #[must_use]
    pub fn embedded_app_url(&self, shop: &ShopDomain, host: Option<&HostParam>) -> String {
        let admin = host.map_or_else(
            || format!("admin.shopify.com/store/{}", shop.shop_name()),
            |host| host.decoded().trim_end_matches('/').to_string(),
        );
        format!("https://{admin}/apps/{}", self.api_key.as_ref())
    }
}

// Verify AppConfig is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<AppConfig>();
};

/// Builder for constructing [`AppConfig`] instances.
///
/// Required fields are `api_key`, `api_secret_key` and `host`.
///
/// # Defaults
///
/// - `api_version`: latest stable version
/// - `is_embedded`: `true`
/// - `use_online_tokens`: `false`
/// - `scopes`: empty
/// - `billing`: not required
/// - paths: `/api/auth`, `/api/auth/callback`, `/exitiframe`
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    api_key: Option<ApiKey>,
    api_secret_key: Option<ApiSecretKey>,
    old_api_secret_key: Option<ApiSecretKey>,
    scopes: Option<AuthScopes>,
    host: Option<HostUrl>,
    api_version: Option<ApiVersion>,
    is_embedded: Option<bool>,
    use_online_tokens: Option<bool>,
    billing: Option<BillingConfig>,
    auth_path: Option<String>,
    callback_path: Option<String>,
    exit_iframe_path: Option<String>,
}

impl AppConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key (required).
    #[must_use]
    pub fn api_key(mut self, key: ApiKey) -> Self {
        self.api_key = Some(key);
        self
    }

    /// Sets the API secret key (required).
    #[must_use]
    pub fn api_secret_key(mut self, key: ApiSecretKey) -> Self {
        self.api_secret_key = Some(key);
        self
    }

    /// Sets the previous API secret key for rotation.
    #[must_use]
    pub fn old_api_secret_key(mut self, key: ApiSecretKey) -> Self {
        self.old_api_secret_key = Some(key);
        self
    }

    /// Sets the OAuth scopes.
    #[must_use]
    pub fn scopes(mut self, scopes: AuthScopes) -> Self {
        self.scopes = Some(scopes);
        self
    }

    /// Sets the public app URL (required).
    #[must_use]
    pub fn host(mut self, host: HostUrl) -> Self {
        self.host = Some(host);
        self
    }

    /// Sets the Admin API version.
    #[must_use]
    pub fn api_version(mut self, version: ApiVersion) -> Self {
        self.api_version = Some(version);
        self
    }

    /// Sets whether the app is embedded in the Shopify admin.
    #[must_use]
    pub const fn is_embedded(mut self, embedded: bool) -> Self {
        self.is_embedded = Some(embedded);
        self
    }

    /// Sets whether OAuth requests online access tokens.
    #[must_use]
    pub const fn use_online_tokens(mut self, online: bool) -> Self {
        self.use_online_tokens = Some(online);
        self
    }

    /// Sets the billing requirement.
    #[must_use]
    pub fn billing(mut self, billing: BillingConfig) -> Self {
        self.billing = Some(billing);
        self
    }

    /// Overrides the path of the route that starts OAuth.
    #[must_use]
    pub fn auth_path(mut self, path: impl Into<String>) -> Self {
        self.auth_path = Some(path.into());
        self
    }

    /// Overrides the OAuth callback path.
    #[must_use]
    pub fn callback_path(mut self, path: impl Into<String>) -> Self {
        self.callback_path = Some(path.into());
        self
    }

    /// Overrides the iframe escape page path.
    #[must_use]
    pub fn exit_iframe_path(mut self, path: impl Into<String>) -> Self {
        self.exit_iframe_path = Some(path.into());
        self
    }

    /// Builds the [`AppConfig`], validating that required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRequiredField`] if `api_key`,
    /// `api_secret_key` or `host` are not set.
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        let api_key = self
            .api_key
            .ok_or(ConfigError::MissingRequiredField { field: "api_key" })?;
        let api_secret_key = self
            .api_secret_key
            .ok_or(ConfigError::MissingRequiredField {
                field: "api_secret_key",
            })?;
        let host = self
            .host
            .ok_or(ConfigError::MissingRequiredField { field: "host" })?;

        Ok(AppConfig {
            api_key,
            api_secret_key,
            old_api_secret_key: self.old_api_secret_key,
            scopes: self.scopes.unwrap_or_default(),
            host,
            api_version: self.api_version.unwrap_or_default(),
            is_embedded: self.is_embedded.unwrap_or(true),
            use_online_tokens: self.use_online_tokens.unwrap_or(false),
            billing: self.billing.unwrap_or_default(),
            auth_path: self.auth_path.unwrap_or_else(|| "/api/auth".to_string()),
            callback_path: self
                .callback_path
                .unwrap_or_else(|| "/api/auth/callback".to_string()),
            exit_iframe_path: self
                .exit_iframe_path
                .unwrap_or_else(|| "/exitiframe".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn minimal_builder() -> AppConfigBuilder {
        AppConfig::builder()
            .api_key(ApiKey::new("key").unwrap())
            .api_secret_key(ApiSecretKey::new("secret").unwrap())
            .host(HostUrl::new("https://myapp.example.com").unwrap())
    }

    #[test]
    fn test_builder_requires_host() {
        let result = AppConfigBuilder::new()
            .api_key(ApiKey::new("key").unwrap())
            .api_secret_key(ApiSecretKey::new("secret").unwrap())
            .build();

        assert!(matches!(
            result,
            Err(ConfigError::MissingRequiredField { field: "host" })
        ));
    }

    #[test]
    fn test_builder_requires_api_key() {
        let result = AppConfigBuilder::new()
            .api_secret_key(ApiSecretKey::new("secret").unwrap())
            .host(HostUrl::new("https://myapp.example.com").unwrap())
            .build();

        assert!(matches!(
            result,
            Err(ConfigError::MissingRequiredField { field: "api_key" })
        ));
    }

    #[test]
    fn test_builder_provides_sensible_defaults() {
        let config = minimal_builder().build().unwrap();

        assert_eq!(config.api_version(), &ApiVersion::latest());
        assert!(config.is_embedded());
        assert!(!config.use_online_tokens());
        assert!(!config.billing().required);
        assert!(config.scopes().is_empty());
        assert_eq!(config.auth_path(), "/api/auth");
        assert_eq!(config.callback_path(), "/api/auth/callback");
        assert_eq!(config.exit_iframe_path(), "/exitiframe");
    }

    #[test]
    fn test_secrets_yields_primary_then_old() {
        let config = minimal_builder()
            .old_api_secret_key(ApiSecretKey::new("old-secret").unwrap())
            .build()
            .unwrap();

        let secrets: Vec<&str> = config.secrets().collect();
        assert_eq!(secrets, vec!["secret", "old-secret"]);
    }

    #[test]
    fn test_from_lookup_reads_all_variables() {
        let env: HashMap<&str, &str> = [
            ("SHOPIFY_API_KEY", "env-key"),
            ("SHOPIFY_API_SECRET", "env-secret"),
            ("SHOPIFY_API_SECRET_OLD", "env-old"),
            ("HOST", "https://env.example.com"),
            ("SCOPES", "write_products"),
            ("SHOPIFY_API_VERSION", "2025-01"),
            ("SHOPIFY_EMBEDDED", "false"),
            ("SHOPIFY_USE_ONLINE_TOKENS", "1"),
        ]
        .into_iter()
        .collect();

        let config = AppConfig::from_lookup(|var| env.get(var).map(ToString::to_string))
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(config.api_key().as_ref(), "env-key");
        assert_eq!(config.host().host_name(), "env.example.com");
        assert!(config.old_api_secret_key().is_some());
        assert!(config.scopes().iter().any(|s| s == "read_products"));
        assert_eq!(config.api_version().as_ref(), "2025-01");
        assert!(!config.is_embedded());
        assert!(config.use_online_tokens());
    }

    #[test]
    fn test_from_lookup_reports_missing_variable() {
        let result = AppConfig::from_lookup(|var| match var {
            "SHOPIFY_API_KEY" => Some("key".to_string()),
            _ => None,
        });

        assert!(matches!(
            result,
            Err(ConfigError::MissingEnvVar {
                var: "SHOPIFY_API_SECRET"
            })
        ));
    }

    #[test]
    fn test_from_lookup_rejects_bad_flag() {
        let result = AppConfig::from_lookup(|var| match var {
            "SHOPIFY_API_KEY" | "SHOPIFY_API_SECRET" => Some("x".to_string()),
            "HOST" => Some("https://app.example.com".to_string()),
            "SHOPIFY_EMBEDDED" => Some("maybe".to_string()),
            _ => None,
        });

        assert!(matches!(result, Err(ConfigError::InvalidEnvVar { .. })));
    }
}
