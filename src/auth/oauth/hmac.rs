//! HMAC-SHA256 signing for OAuth callbacks and signed cookies.
//!
//! All comparisons are constant-time. Verification helpers try every
//! configured secret (primary first, then the rotated-out one).
//!
//! ```rust
//! use shopify_app_auth::auth::oauth::hmac::{compute_signature, compute_signature_base64};
//!
//! let signature = compute_signature("code=abc&shop=test.myshopify.com", "secret");
//! assert_eq!(signature.len(), 64);
//!
//! let cookie_sig = compute_signature_base64(b"shopify_app_session=abc", "secret");
//! assert_eq!(cookie_sig.len(), 43);
//! ```

use base64::prelude::*;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::auth::oauth::CallbackQuery;
use crate::config::AppConfig;

type HmacSha256 = Hmac<Sha256>;

#[allow(clippy::missing_panics_doc)] // HMAC accepts any key size, so this never panics
fn mac(message: &[u8], secret: &str) -> Vec<u8> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

/// Computes a lowercase hex HMAC-SHA256 signature, the format Shopify uses
/// for the `hmac` OAuth callback parameter.
#[must_use]
pub fn compute_signature(message: &str, secret: &str) -> String {
    mac(message.as_bytes(), secret)
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

/// Computes an unpadded URL-safe base64 HMAC-SHA256 signature, the format
/// used for `.sig` cookies.
#[must_use]
pub fn compute_signature_base64(message: &[u8], secret: &str) -> String {
    BASE64_URL_SAFE_NO_PAD.encode(mac(message, secret))
}

/// Performs constant-time comparison of two strings.
#[must_use]
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Validates the `hmac` parameter of an OAuth callback against every
/// configured secret.
#[must_use]
pub fn validate_hmac(query: &CallbackQuery, config: &AppConfig) -> bool {
    let Some(received) = query.hmac() else {
        return false;
    };
    let signable = query.to_signable_string();

    config
        .secrets()
        .any(|secret| constant_time_compare(&compute_signature(&signable, secret), received))
}

/// Verifies a base64 signature produced by [`compute_signature_base64`]
/// against every configured secret.
#[must_use]
pub fn verify_signature_base64(message: &[u8], signature: &str, config: &AppConfig) -> bool {
    config.secrets().any(|secret| {
        constant_time_compare(&compute_signature_base64(message, secret), signature)
    })
}
