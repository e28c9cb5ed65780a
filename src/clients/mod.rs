//! Outbound Admin API access.
//!
//! The middleware talks to Shopify only through GraphQL: the token validity
//! probe, billing and webhook registration all go through [`AdminClient`].

mod admin;
mod errors;

pub use admin::{AdminClient, SDK_VERSION};
pub use errors::{HttpError, HttpResponseError};
