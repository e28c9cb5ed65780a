//! Authentication primitives.
//!
//! - [`AuthScopes`]: a set of OAuth scopes with implied scope handling
//! - [`Session`]: an authenticated shop (and optionally user) session
//! - [`SessionStore`] / [`MemorySessionStore`]: session persistence
//! - [`load_current_session`]: finds the session a request belongs to, from
//!   the App Bridge session token or the signed session cookie
//! - [`oauth`]: the OAuth authorization code flow
//!
//! # Session Types
//!
//! - **Offline sessions** (`offline_{shop}`): app-level tokens that do not
//!   expire.
//! - **Online sessions** (`{shop}_{user}`): per-user tokens that expire.

pub mod cookies;
pub mod oauth;
mod scopes;
mod session;
pub mod session_token;
mod store;

pub use scopes::AuthScopes;
pub use session::Session;
pub use session_token::{bearer_token, SessionTokenClaims, SessionTokenError};
pub use store::{
    current_session_id, load_current_session, MemorySessionStore, SessionStore,
    SessionStoreError,
};
