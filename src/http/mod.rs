//! Axum routes and middleware.
//!
//! [`router`] mounts the OAuth routes (`GET {auth_path}` and
//! `GET {callback_path}`). Protected routes are wrapped with
//! [`verify_request`], which runs the gate and either hands the request's
//! [`Session`] to the handler through request extensions or answers with a
//! redirect.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use axum::{middleware, routing::get, Extension, Router};
//! use shopify_app_auth::gate::AuthGate;
//! use shopify_app_auth::http::{router, verify_request, AuthState};
//! use shopify_app_auth::{AppConfig, MemorySessionStore, Session};
//!
//! async fn products(Extension(session): Extension<Session>) -> String {
//!     format!("Products for {}", session.shop)
//! }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::from_env()?.build()?;
//! let gate = AuthGate::new(Arc::new(config), Arc::new(MemorySessionStore::new()));
//! let state = AuthState::new(gate);
//!
//! let api = Router::new()
//!     .route("/api/products", get(products))
//!     .route_layer(middleware::from_fn_with_state(state.clone(), verify_request));
//! let app = router(state).merge(api);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderName, StatusCode, Uri};
use axum::middleware::Next;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use axum_extra::extract::cookie::CookieJar;
use tower_http::trace::TraceLayer;

use crate::auth::cookies::session_cookies;
use crate::auth::Session;
use crate::error::AuthError;
use crate::gate::{redirect_to_auth, AuthGate, AuthRequestContext, CallbackOutcome, RedirectDecision};

/// Header telling App Bridge that the app must re-authorize.
pub const REAUTHORIZE_HEADER: HeaderName =
    HeaderName::from_static("x-shopify-api-request-failure-reauthorize");

/// Header carrying the URL App Bridge should load to re-authorize.
pub const REAUTHORIZE_URL_HEADER: HeaderName =
    HeaderName::from_static("x-shopify-api-request-failure-reauthorize-url");

/// Shared state for the routes and the middleware.
#[derive(Debug, Clone)]
pub struct AuthState {
    gate: Arc<AuthGate>,
}

impl AuthState {
    /// Wraps `gate` for use as router state.
    #[must_use]
    pub fn new(gate: AuthGate) -> Self {
        Self {
            gate: Arc::new(gate),
        }
    }

    /// Returns the gate.
    #[must_use]
    pub fn gate(&self) -> &AuthGate {
        &self.gate
    }

    async fn render(
        &self,
        ctx: &AuthRequestContext,
        decision: RedirectDecision,
    ) -> Result<Response, AuthError> {
        match decision {
            RedirectDecision::RedirectTopLevel(url) => Ok(top_level_response(ctx, &url)),
            RedirectDecision::RedirectClientSide(url) => Ok(found(&url)),
            RedirectDecision::BeginOAuth(shop) => {
                let begin = self.gate.begin_oauth(&shop).await?;
                let jar = begin
                    .cookies
                    .into_iter()
                    .fold(CookieJar::new(), CookieJar::add);
                Ok((jar, found(&begin.auth_url)).into_response())
            }
            RedirectDecision::Proceed { .. } => Err(AuthError::Internal(
                "Cannot render a proceed decision".to_string(),
            )),
        }
    }
}

/// Builds the router serving the OAuth routes.
pub fn router(state: AuthState) -> Router {
    let config = state.gate.config();
    Router::new()
        .route(config.auth_path(), get(begin_auth))
        .route(config.callback_path(), get(auth_callback))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Middleware guarding protected routes.
///
/// On [`RedirectDecision::Proceed`] the [`Session`] is inserted into the
/// request extensions and the inner handler runs. Any other decision is
/// answered directly and the handler never runs.
pub async fn verify_request(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let ctx = AuthRequestContext::from_request(request.uri(), request.headers());

    match state.gate.authorize(&ctx).await {
        Ok(RedirectDecision::Proceed { session }) => {
            request.extensions_mut().insert::<Session>(session);
            next.run(request).await
        }
        Ok(decision) => state.render(&ctx, decision).await.into_response(),
        Err(e) => e.into_response(),
    }
}

/// Renders a top-level redirect for the kind of request that needs it.
///
/// - App Bridge requests (bearer token): `403` with the reauthorize headers
/// - embedded document loads (`embedded=1`): an HTML page that navigates
///   `window.top`
/// - anything else: `302`
#[must_use]
pub fn top_level_response(ctx: &AuthRequestContext, url: &str) -> Response {
    if ctx.bearer_token.is_some() {
        let mut headers = HeaderMap::new();
        headers.insert(REAUTHORIZE_HEADER, header::HeaderValue::from_static("1"));
        match header::HeaderValue::from_str(url) {
            Ok(value) => {
                headers.insert(REAUTHORIZE_URL_HEADER, value);
            }
            Err(e) => tracing::warn!(error = %e, url = %url, "Reauthorize URL is not a valid header"),
        }
        return (StatusCode::FORBIDDEN, headers).into_response();
    }

    if ctx.embedded {
        return Html(exit_frame_page(url)).into_response();
    }

    found(url)
}

async fn begin_auth(
    State(state): State<AuthState>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, AuthError> {
    let ctx = AuthRequestContext::from_request(&uri, &headers);
    let decision = redirect_to_auth(&ctx, state.gate.config())?;
    state.render(&ctx, decision).await
}

async fn auth_callback(
    State(state): State<AuthState>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, AuthError> {
    let ctx = AuthRequestContext::from_request(&uri, &headers);

    match state.gate.complete_oauth(&ctx).await? {
        CallbackOutcome::Completed {
            session,
            redirect_url,
        } => {
            let jar = session_cookies(&session.id, state.gate.config(), None)
                .into_iter()
                .fold(CookieJar::new(), CookieJar::add);
            Ok((jar, found(&redirect_url)).into_response())
        }
        CallbackOutcome::Restart(decision) => state.render(&ctx, decision).await,
    }
}

fn found(url: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, url.to_string())]).into_response()
}

fn exit_frame_page(url: &str) -> String {
    // JSON string literals are valid JS; `</` must not close the script tag
    let target = serde_json::to_string(url)
        .unwrap_or_else(|_| "\"/\"".to_string())
        .replace("</", "<\\/");
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<script>window.top.location.href = {target};</script>\n</head>\n<body></body>\n</html>\n"
    )
}
