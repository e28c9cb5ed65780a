//! OAuth access scopes.

use crate::error::ConfigError;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A set of OAuth scopes requested at install time or granted to a session.
///
/// Write scopes imply their read counterpart (`write_products` adds
/// `read_products`, `unauthenticated_write_x` adds `unauthenticated_read_x`).
/// The set is kept sorted so its string form is stable.
///
/// ```rust
/// use shopify_app_auth::AuthScopes;
///
/// let scopes: AuthScopes = "write_orders, read_products".parse().unwrap();
/// assert_eq!(scopes.to_string(), "read_orders,read_products,write_orders");
///
/// let required: AuthScopes = "read_orders".parse().unwrap();
/// assert!(scopes.covers(&required));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct AuthScopes {
    scopes: BTreeSet<String>,
}

impl AuthScopes {
    /// Creates an empty scope set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the scope set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Returns `true` if every scope of `other` is contained in `self`.
    #[must_use]
    pub fn covers(&self, other: &Self) -> bool {
        other.scopes.is_subset(&self.scopes)
    }

    /// Returns an iterator over the scopes in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.scopes.iter().map(String::as_str)
    }

    fn with_implied(mut scopes: BTreeSet<String>) -> Self {
        let implied: Vec<String> = scopes
            .iter()
            .filter_map(|scope| {
                scope
                    .strip_prefix("unauthenticated_write_")
                    .map(|rest| format!("unauthenticated_read_{rest}"))
                    .or_else(|| scope.strip_prefix("write_").map(|rest| format!("read_{rest}")))
            })
            .collect();
        scopes.extend(implied);
        Self { scopes }
    }
}

impl FromStr for AuthScopes {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut scopes = BTreeSet::new();

        for scope in s.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if !scope.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(ConfigError::InvalidScopes {
                    reason: format!("Invalid characters in scope: '{scope}'"),
                });
            }
            scopes.insert(scope.to_string());
        }

        Ok(Self::with_implied(scopes))
    }
}

impl fmt::Display for AuthScopes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.iter().collect();
        f.write_str(&joined.join(","))
    }
}

impl Serialize for AuthScopes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AuthScopes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_and_adds_implied_scopes() {
        let scopes: AuthScopes = "write_products, unauthenticated_write_checkouts".parse().unwrap();
        assert!(scopes.iter().any(|s| s == "read_products"));
        assert!(scopes.iter().any(|s| s == "unauthenticated_read_checkouts"));
    }

    #[test]
    fn test_rejects_invalid_characters() {
        let result: Result<AuthScopes, _> = "read products".parse();
        assert!(matches!(result, Err(ConfigError::InvalidScopes { .. })));
    }

    #[test]
    fn test_ignores_empty_entries() {
        let scopes: AuthScopes = " , read_products,,".parse().unwrap();
        assert_eq!(scopes.to_string(), "read_products");
    }

    #[test]
    fn test_covers() {
        let granted: AuthScopes = "read_products".parse().unwrap();
        let required: AuthScopes = "read_products,read_customers".parse().unwrap();
        assert!(!granted.covers(&required));
        assert!(required.covers(&granted));
    }

    #[test]
    fn test_serializes_as_sorted_string() {
        let scopes: AuthScopes = "write_orders".parse().unwrap();
        assert_eq!(
            serde_json::to_string(&scopes).unwrap(),
            r#""read_orders,write_orders""#
        );
    }
}
