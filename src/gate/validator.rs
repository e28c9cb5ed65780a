//! Classifies the session a request carries.

use crate::auth::Session;
use crate::gate::context::{AuthRequestContext, ShopParam};

/// How the loaded session relates to the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// No session could be found.
    Missing,
    /// A session exists but the request names another shop.
    Mismatched(Session),
    /// The session has a token and has not expired.
    Active(Session),
    /// The session exists but has no token or has expired.
    Expired(Session),
}

/// Classifies `session` against the request.
///
/// A request naming a shop that cannot be sanitized never matches a
/// session. Shop mismatch is checked before activity. No network calls are
/// made; token revocation is found by the probe afterwards.
#[must_use]
pub fn validate(ctx: &AuthRequestContext, session: Option<Session>) -> SessionStatus {
    let Some(session) = session else {
        return SessionStatus::Missing;
    };

    let mismatched = match &ctx.requested_shop {
        ShopParam::Absent => false,
        ShopParam::Invalid(_) => true,
        ShopParam::Valid(shop) => *shop != session.shop,
    };

    if mismatched {
        SessionStatus::Mismatched(session)
    } else if session.is_active() {
        SessionStatus::Active(session)
    } else {
        SessionStatus::Expired(session)
    }
}
