//! Billing plan configuration.
//!
//! A [`BillingConfig`] is fixed at startup. When `required` is `false` the
//! billing gate is never consulted; otherwise every authorized request and
//! every completed install is checked against the plan described here.

use serde::{Deserialize, Serialize};

/// How often the configured plan is charged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingInterval {
    /// A single, non-recurring purchase.
    OneTime,
    /// A subscription renewed every 30 days.
    #[default]
    #[serde(rename = "EVERY_30_DAYS")]
    Every30Days,
    /// A subscription renewed every year.
    Annual,
}

impl BillingInterval {
    /// Returns `true` for subscription intervals.
    #[must_use]
    pub const fn is_recurring(self) -> bool {
        !matches!(self, Self::OneTime)
    }

    /// The Admin GraphQL `AppPricingInterval` value for recurring plans.
    #[must_use]
    pub const fn as_graphql(self) -> &'static str {
        match self {
            Self::OneTime => "ONE_TIME",
            Self::Every30Days => "EVERY_30_DAYS",
            Self::Annual => "ANNUAL",
        }
    }
}

/// Billing requirements applied by the billing gate.
///
/// # Example
///
/// ```rust
/// use shopify_app_auth::{BillingConfig, BillingInterval};
///
/// let billing = BillingConfig::required("Pro plan", 9.99, "USD", BillingInterval::Every30Days)
///     .test(false);
/// assert!(billing.required);
/// assert!(!billing.test);
///
/// assert!(!BillingConfig::default().required);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BillingConfig {
    /// Whether a paid plan is needed before protected routes are served.
    pub required: bool,
    /// Name of the charge; also used to recognise an existing payment.
    pub charge_name: String,
    /// Price per interval.
    pub amount: f64,
    /// ISO 4217 currency code.
    pub currency_code: String,
    /// Charge interval.
    pub interval: BillingInterval,
    /// Create test charges that are never actually billed.
    pub test: bool,
}

impl BillingConfig {
    /// Creates a plan that must be paid before access is granted.
    ///
    /// Test charges are enabled by default.
    #[must_use]
    pub fn required(
        charge_name: impl Into<String>,
        amount: f64,
        currency_code: impl Into<String>,
        interval: BillingInterval,
    ) -> Self {
        Self {
            required: true,
            charge_name: charge_name.into(),
            amount,
            currency_code: currency_code.into(),
            interval,
            test: true,
        }
    }

    /// Sets whether charges are created in test mode.
    #[must_use]
    pub const fn test(mut self, test: bool) -> Self {
        self.test = test;
        self
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            required: false,
            charge_name: "My Shopify One-Time Charge".to_string(),
            amount: 5.0,
            currency_code: "USD".to_string(),
            interval: BillingInterval::OneTime,
            test: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_graphql_names() {
        assert_eq!(BillingInterval::Every30Days.as_graphql(), "EVERY_30_DAYS");
        assert_eq!(BillingInterval::Annual.as_graphql(), "ANNUAL");
        assert!(!BillingInterval::OneTime.is_recurring());
        assert!(BillingInterval::Annual.is_recurring());
    }

    #[test]
    fn test_interval_deserializes_from_graphql_names() {
        let interval: BillingInterval = serde_json::from_str(r#""EVERY_30_DAYS""#).unwrap();
        assert_eq!(interval, BillingInterval::Every30Days);
        let interval: BillingInterval = serde_json::from_str(r#""ONE_TIME""#).unwrap();
        assert_eq!(interval, BillingInterval::OneTime);
    }
}
