//! # Shopify App Auth
//!
//! Session authentication middleware for embedded Shopify apps built on
//! axum: it decides, for every request, whether the app may serve it with
//! a valid session or must send the merchant through OAuth or a billing
//! confirmation first.
//!
//! ## Overview
//!
//! This crate provides:
//! - Type-safe configuration via [`AppConfig`] and [`AppConfigBuilder`]
//! - Validated newtypes for credentials and wire values ([`ShopDomain`],
//!   [`HostParam`])
//! - Session loading from App Bridge session tokens or signed cookies
//! - The OAuth 2.0 authorization code flow via [`auth::oauth`]
//! - Webhook registration after install via [`webhooks`]
//! - Billing checks and charge creation via [`billing`]
//! - The request gate ([`gate::AuthGate`]) and its axum surface ([`http`])
//!
//! ## Quick Start
//!
//! ```rust
//! use shopify_app_auth::{AppConfig, ApiKey, ApiSecretKey, HostUrl, BillingConfig, BillingInterval};
//!
//! let config = AppConfig::builder()
//!     .api_key(ApiKey::new("your-api-key").unwrap())
//!     .api_secret_key(ApiSecretKey::new("your-api-secret").unwrap())
//!     .host(HostUrl::new("https://your-app.example.com").unwrap())
//!     .scopes("read_products,write_orders".parse().unwrap())
//!     .billing(BillingConfig::required("Pro plan", 9.99, "USD", BillingInterval::Every30Days))
//!     .build()
//!     .unwrap();
//!
//! assert!(config.billing().required);
//! ```
//!
//! ## Protecting Routes
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use axum::{middleware, routing::get, Extension, Router};
//! use shopify_app_auth::gate::AuthGate;
//! use shopify_app_auth::http::{router, verify_request, AuthState};
//! use shopify_app_auth::{MemorySessionStore, Session};
//!
//! let gate = AuthGate::new(Arc::new(config), Arc::new(MemorySessionStore::new()));
//! let state = AuthState::new(gate);
//!
//! let api = Router::new()
//!     .route("/api/products", get(|Extension(session): Extension<Session>| async move {
//!         session.shop.to_string()
//!     }))
//!     .route_layer(middleware::from_fn_with_state(state.clone(), verify_request));
//!
//! let app = router(state).merge(api);
//! ```
//!
//! ## Sessions
//!
//! Sessions are either offline (app-level) or online (user-specific):
//!
//! ```rust
//! use shopify_app_auth::{Session, ShopDomain, AuthScopes};
//!
//! let shop = ShopDomain::new("my-store.myshopify.com").unwrap();
//! let offline_session = Session::new(
//!     Session::offline_id(&shop),
//!     shop,
//!     "access-token".to_string(),
//!     "read_products".parse().unwrap(),
//!     false,
//!     None,
//! );
//! assert!(offline_session.is_active());
//!
//! // Sessions can be serialized for storage
//! let json = serde_json::to_string(&offline_session).unwrap();
//! assert!(json.contains("offline_my-store.myshopify.com"));
//! ```
//!
//! ## Design Principles
//!
//! - **No global state**: configuration is instance-based and passed explicitly
//! - **Fail-fast validation**: all newtypes validate on construction
//! - **Thread-safe**: all types are `Send + Sync`
//! - **Injectable collaborators**: OAuth, billing, probing, webhooks and
//!   session storage are traits

pub mod auth;
pub mod billing;
pub mod clients;
pub mod config;
pub mod error;
pub mod gate;
pub mod http;
pub mod probe;
pub mod webhooks;

// Re-export public types at crate root for convenience
pub use auth::{AuthScopes, MemorySessionStore, Session, SessionStore, SessionStoreError};
pub use config::{
    ApiKey, ApiSecretKey, ApiVersion, AppConfig, AppConfigBuilder, BillingConfig,
    BillingInterval, HostParam, HostUrl, ShopDomain,
};
pub use error::{AuthError, ConfigError};

pub use auth::oauth::{OAuthError, OAuthProvider, ShopifyOAuth};
pub use billing::{BillingError, BillingProvider, BillingStatus};
pub use gate::{AuthGate, RedirectDecision};
pub use probe::{ProbeError, ValidityProbe};
pub use webhooks::{RegisterOutcome, WebhookRegistry};
