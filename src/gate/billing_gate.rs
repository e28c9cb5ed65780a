//! Billing check for active sessions.

use crate::auth::Session;
use crate::billing::{BillingError, BillingProvider, BillingStatus};
use crate::config::AppConfig;

/// Asks `provider` whether the session's shop has paid.
///
/// Only meaningful when `config.billing().required` is set; the gate does
/// not call it otherwise. A provider failure is returned as
/// [`BillingError`], never as [`BillingStatus::Unpaid`].
///
/// # Errors
///
/// Returns the provider's [`BillingError`] unchanged.
pub async fn check_billing(
    provider: &dyn BillingProvider,
    session: &Session,
    config: &AppConfig,
) -> Result<BillingStatus, BillingError> {
    let status = provider.ensure_billing(session, config).await?;
    match &status {
        BillingStatus::Paid => tracing::debug!(shop = %session.shop, "Billing paid"),
        BillingStatus::Unpaid { .. } => tracing::info!(shop = %session.shop, "Billing unpaid"),
    }
    Ok(status)
}
