//! Validated newtype wrappers for configuration and request values.
//!
//! This module provides type-safe wrappers around string values that validate
//! their contents on construction. Values that arrive on the wire (`shop`,
//! `host`) are sanitized here before any redirect URL is built from them.

use crate::error::ConfigError;
use base64::prelude::*;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A validated Shopify API key.
///
/// # Example
///
/// ```rust
/// use shopify_app_auth::ApiKey;
///
/// let key = ApiKey::new("my-api-key").unwrap();
/// assert_eq!(key.as_ref(), "my-api-key");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Creates a new validated API key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyApiKey`] if the key is empty.
    pub fn new(key: impl Into<String>) -> Result<Self, ConfigError> {
        let key = key.into();
        if key.is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }
        Ok(Self(key))
    }
}

impl AsRef<str> for ApiKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A validated Shopify API secret key.
///
/// The `Debug` implementation masks the secret value, displaying only
/// `ApiSecretKey(*****)`.
///
/// ```rust
/// use shopify_app_auth::ApiSecretKey;
///
/// let secret = ApiSecretKey::new("my-secret").unwrap();
/// assert_eq!(format!("{:?}", secret), "ApiSecretKey(*****)");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct ApiSecretKey(String);

impl ApiSecretKey {
    /// Creates a new validated API secret key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyApiSecretKey`] if the key is empty.
    pub fn new(key: impl Into<String>) -> Result<Self, ConfigError> {
        let key = key.into();
        if key.is_empty() {
            return Err(ConfigError::EmptyApiSecretKey);
        }
        Ok(Self(key))
    }
}

impl AsRef<str> for ApiSecretKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiSecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiSecretKey(*****)")
    }
}

/// A sanitized shop domain.
///
/// Only hosts on Shopify-owned domains are accepted: the first label must
/// start with an ASCII letter or digit and may contain letters, digits, `-`
/// and `_`; the rest must be `myshopify.com`, `myshopify.io` or
/// `shopify.com`. Values are lowercased and trailing slashes are dropped.
///
/// # Example
///
/// ```rust
/// use shopify_app_auth::ShopDomain;
///
/// let domain = ShopDomain::new("My-Store.myshopify.com/").unwrap();
/// assert_eq!(domain.as_ref(), "my-store.myshopify.com");
/// assert_eq!(domain.shop_name(), "my-store");
///
/// assert!(ShopDomain::new("my-store.evil.com").is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ShopDomain {
    full_domain: String,
    shop_name_end: usize,
}

impl ShopDomain {
    const ALLOWED_SUFFIXES: [&'static str; 3] = [".myshopify.com", ".myshopify.io", ".shopify.com"];

    /// Creates a new sanitized shop domain.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidShopDomain`] if the domain is not a
    /// Shopify shop host.
    pub fn new(domain: impl Into<String>) -> Result<Self, ConfigError> {
        let raw: String = domain.into();
        let domain = raw.trim().trim_end_matches('/').to_lowercase();

        let shop_name = Self::ALLOWED_SUFFIXES
            .iter()
            .find_map(|suffix| domain.strip_suffix(suffix))
            .ok_or_else(|| ConfigError::InvalidShopDomain { domain: raw.clone() })?;

        if !Self::is_valid_shop_name(shop_name) {
            return Err(ConfigError::InvalidShopDomain { domain: raw });
        }

        Ok(Self {
            shop_name_end: shop_name.len(),
            full_domain: domain,
        })
    }

    /// Returns the shop name portion of the domain.
    ///
    /// For `my-store.myshopify.com`, this returns `my-store`.
    #[must_use]
    pub fn shop_name(&self) -> &str {
        &self.full_domain[..self.shop_name_end]
    }

    fn is_valid_shop_name(name: &str) -> bool {
        let mut chars = name.chars();
        let Some(first) = chars.next() else {
            return false;
        };
        first.is_ascii_alphanumeric()
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }
}

impl AsRef<str> for ShopDomain {
    fn as_ref(&self) -> &str {
        &self.full_domain
    }
}

impl fmt::Display for ShopDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_domain)
    }
}

impl Serialize for ShopDomain {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.full_domain)
    }
}

impl<'de> Deserialize<'de> for ShopDomain {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(de::Error::custom)
    }
}

/// The `host` query parameter Shopify appends to embedded app URLs.
///
/// It is the base64 encoding of the admin host the app is framed in, for
/// example `admin.shopify.com/store/my-store`. The encoded form is kept
/// verbatim so it can be echoed back; the decoded form is used to build the
/// embedded app URL.
///
/// ```rust
/// use shopify_app_auth::HostParam;
///
/// let host = HostParam::new("YWRtaW4uc2hvcGlmeS5jb20vc3RvcmUvbXktc3RvcmU=").unwrap();
/// assert_eq!(host.decoded(), "admin.shopify.com/store/my-store");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostParam {
    encoded: String,
    decoded: String,
}

impl HostParam {
    /// Validates and decodes a raw `host` parameter.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidHostParam`] if the value is not
    /// base64, or if the decoded host name is not a Shopify domain.
    pub fn new(encoded: impl Into<String>) -> Result<Self, ConfigError> {
        let encoded: String = encoded.into();
        let invalid = || ConfigError::InvalidHostParam {
            host: encoded.clone(),
        };

        let is_base64 = !encoded.is_empty()
            && encoded
                .trim_end_matches('=')
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/')
            && encoded.len() - encoded.trim_end_matches('=').len() <= 2;
        if !is_base64 {
            return Err(invalid());
        }

        let bytes = BASE64_STANDARD
            .decode(encoded.as_bytes())
            .or_else(|_| BASE64_STANDARD_NO_PAD.decode(encoded.trim_end_matches('=')))
            .map_err(|_| invalid())?;
        let decoded = String::from_utf8(bytes).map_err(|_| invalid())?;

        let host_name = decoded
            .split(['/', ':', '?', '#'])
            .next()
            .unwrap_or_default();
        ShopDomain::new(host_name).map_err(|_| invalid())?;

        Ok(Self { encoded, decoded })
    }

    /// Returns the decoded admin host (`admin.shopify.com/store/my-store`).
    #[must_use]
    pub fn decoded(&self) -> &str {
        &self.decoded
    }
}

impl AsRef<str> for HostParam {
    fn as_ref(&self) -> &str {
        &self.encoded
    }
}

/// A validated host URL for the application.
///
/// # Example
///
/// ```rust
/// use shopify_app_auth::HostUrl;
///
/// let url = HostUrl::new("https://myapp.example.com").unwrap();
/// assert_eq!(url.scheme(), "https");
/// assert_eq!(url.host_name(), "myapp.example.com");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostUrl {
    url: String,
    scheme_end: usize,
    host_start: usize,
    authority_end: usize,
}

impl HostUrl {
    /// Creates a new validated host URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidHostUrl`] if the URL is invalid.
    pub fn new(url: impl Into<String>) -> Result<Self, ConfigError> {
        let url: String = url.into();
        let url = url.trim().trim_end_matches('/').to_string();
        let invalid = || ConfigError::InvalidHostUrl { url: url.clone() };

        let scheme_end = url.find("://").ok_or_else(invalid)?;
        let scheme = &url[..scheme_end];
        if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(invalid());
        }

        let host_start = scheme_end + 3;
        if host_start >= url.len() {
            return Err(invalid());
        }

        // Authority (host plus optional port) ends at path, query, or fragment
        let authority_end = url[host_start..]
            .find(['/', '?', '#'])
            .map_or(url.len(), |i| host_start + i);

        let host = url[host_start..authority_end].split(':').next().unwrap_or_default();
        if host.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            url,
            scheme_end,
            host_start,
            authority_end,
        })
    }

    /// Returns the URL scheme (e.g., "https").
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.url[..self.scheme_end]
    }

    /// Returns the host name and port, without scheme or path.
    ///
    /// For `http://localhost:3000/app` this returns `localhost:3000`.
    #[must_use]
    pub fn authority(&self) -> &str {
        &self.url[self.host_start..self.authority_end]
    }

    /// Returns the host name without port.
    #[must_use]
    pub fn host_name(&self) -> &str {
        self.authority().split(':').next().unwrap_or_default()
    }
}

impl AsRef<str> for HostUrl {
    fn as_ref(&self) -> &str {
        &self.url
    }
}

/// The Admin API version requests are made against.
///
/// ```rust
/// use shopify_app_auth::ApiVersion;
///
/// assert_eq!(ApiVersion::new("2025-01").unwrap().as_ref(), "2025-01");
/// assert!(ApiVersion::new("2025-13").is_err());
/// assert!(ApiVersion::new("unstable").is_ok());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiVersion(String);

impl ApiVersion {
    const LATEST: &'static str = "2025-10";

    /// Parses a version string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidApiVersion`] unless the value is
    /// `unstable` or `YYYY-MM` with a valid month.
    pub fn new(version: impl Into<String>) -> Result<Self, ConfigError> {
        let version: String = version.into();
        if version == "unstable" {
            return Ok(Self(version));
        }

        let valid = version.split_once('-').is_some_and(|(year, month)| {
            year.len() == 4
                && month.len() == 2
                && year.chars().all(|c| c.is_ascii_digit())
                && month.parse::<u8>().is_ok_and(|m| (1..=12).contains(&m))
        });
        if !valid {
            return Err(ConfigError::InvalidApiVersion { version });
        }

        Ok(Self(version))
    }

    /// The latest stable version this crate was written against.
    #[must_use]
    pub fn latest() -> Self {
        Self(Self::LATEST.to_string())
    }
}

impl Default for ApiVersion {
    fn default() -> Self {
        Self::latest()
    }
}

impl AsRef<str> for ApiVersion {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
