//! Per-request authentication context.

use axum::extract::Query;
use axum::http::{HeaderMap, Uri};
use axum_extra::extract::cookie::CookieJar;

use crate::auth::bearer_token;
use crate::config::{HostParam, ShopDomain};

/// The `shop` query parameter after sanitization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShopParam {
    /// The request has no `shop` parameter.
    Absent,
    /// `shop` is present but is not a Shopify shop domain.
    Invalid(String),
    /// A sanitized shop domain.
    Valid(ShopDomain),
}

impl ShopParam {
    /// Sanitizes a raw `shop` value.
    ///
    /// ```rust
    /// use shopify_app_auth::gate::ShopParam;
    ///
    /// assert_eq!(ShopParam::parse(None), ShopParam::Absent);
    /// assert!(matches!(ShopParam::parse(Some("evil.com")), ShopParam::Invalid(_)));
    /// assert!(ShopParam::parse(Some("My-Store.myshopify.com")).valid().is_some());
    /// ```
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None => Self::Absent,
            Some(raw) => ShopDomain::new(raw).map_or_else(|_| Self::Invalid(raw.to_string()), Self::Valid),
        }
    }

    /// Returns the shop when it is valid.
    #[must_use]
    pub const fn valid(&self) -> Option<&ShopDomain> {
        match self {
            Self::Valid(shop) => Some(shop),
            Self::Absent | Self::Invalid(_) => None,
        }
    }
}

/// Everything the gate reads from one request.
///
/// Built once per request and dropped with it.
#[derive(Debug, Clone)]
pub struct AuthRequestContext {
    /// The sanitized `shop` parameter.
    pub requested_shop: ShopParam,
    /// The raw `host` parameter, passed through untouched.
    pub host: Option<String>,
    /// The App Bridge session token from `Authorization: Bearer`.
    pub bearer_token: Option<String>,
    /// `true` when the request carries `embedded=1`.
    pub embedded: bool,
    /// Every query parameter in request order.
    pub query: Vec<(String, String)>,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request cookies.
    pub cookies: CookieJar,
}

impl AuthRequestContext {
    /// Builds the context from decoded query pairs and headers.
    #[must_use]
    pub fn new(query: Vec<(String, String)>, headers: HeaderMap) -> Self {
        let param = |name: &str| {
            query
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
        };

        let requested_shop = ShopParam::parse(param("shop").as_deref());
        let host = param("host");
        let embedded = param("embedded").as_deref() == Some("1");
        let bearer_token = bearer_token(&headers).map(String::from);
        let cookies = CookieJar::from_headers(&headers);

        Self {
            requested_shop,
            host,
            bearer_token,
            embedded,
            query,
            headers,
            cookies,
        }
    }

    /// Builds the context from a request URI and headers.
    ///
    /// An unparsable query string is treated as empty.
    #[must_use]
    pub fn from_request(uri: &Uri, headers: &HeaderMap) -> Self {
        let query = Query::<Vec<(String, String)>>::try_from_uri(uri)
            .map(|Query(pairs)| pairs)
            .unwrap_or_default();
        Self::new(query, headers.clone())
    }

    /// Returns the `host` parameter when it decodes to a Shopify admin host.
    #[must_use]
    pub fn host_param(&self) -> Option<HostParam> {
        self.host
            .as_deref()
            .and_then(|host| HostParam::new(host).ok())
    }
}
