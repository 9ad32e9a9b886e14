//! The seam between routing decisions and whatever produces responses

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Response, StatusCode};
use url::Url;
use vinext_router::{AppRoute, PageRoute, Params};

/// The route a request resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedRoute {
    App(AppRoute),
    Pages(PageRoute),
    PagesApi(PageRoute),
}

impl ResolvedRoute {
    pub fn pattern(&self) -> &str {
        match self {
            ResolvedRoute::App(route) => &route.pattern,
            ResolvedRoute::Pages(route) | ResolvedRoute::PagesApi(route) => &route.pattern,
        }
    }

    /// API handler rather than a page: Pages API routes and App route handlers
    pub fn is_handler(&self) -> bool {
        match self {
            ResolvedRoute::App(route) => route.page_path.is_none() && route.route_path.is_some(),
            ResolvedRoute::Pages(_) => false,
            ResolvedRoute::PagesApi(_) => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteResolution {
    pub route: ResolvedRoute,
    pub params: Params,
}

/// A request after every routing transformation
#[derive(Debug)]
pub struct RenderRequest {
    pub method: Method,
    /// Path the route was matched against, base path excluded
    pub pathname: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Body,
    pub resolution: RouteResolution,
}

#[derive(Debug)]
pub struct NotFoundRequest {
    pub method: Method,
    pub pathname: String,
    pub headers: HeaderMap,
}

/// A request destined for another origin
#[derive(Debug)]
pub struct ProxyRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Body,
}

/// Produces responses for resolved routes
#[async_trait]
pub trait Backend: Send + Sync {
    async fn dispatch_api(&self, request: RenderRequest) -> anyhow::Result<Response<Body>>;

    async fn render_page(&self, request: RenderRequest) -> anyhow::Result<Response<Body>>;

    async fn render_not_found(&self, _request: NotFoundRequest) -> anyhow::Result<Response<Body>> {
        Ok(plain_response(StatusCode::NOT_FOUND, "Not Found"))
    }

    /// External rewrite targets; the default refuses to proxy
    async fn proxy_external(&self, request: ProxyRequest) -> anyhow::Result<Response<Body>> {
        Ok(plain_response(
            StatusCode::BAD_GATEWAY,
            &format!("no proxy configured for {}", request.url),
        ))
    }
}

pub(crate) fn plain_response(status: StatusCode, body: &str) -> Response<Body> {
    let mut response = Response::new(Body::from(body.to_string()));
    *response.status_mut() = status;
    response.headers_mut().insert(
        axum::http::header::CONTENT_TYPE,
        axum::http::HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
