//! The ordered request pipeline
//!
//! 1. reject `//`-prefixed paths, decode, reject control characters, and
//!    canonicalize
//! 2. strip the base path
//! 3. trailing-slash redirect
//! 4. build the request context
//! 5. middleware
//! 6. config headers
//! 7. config redirects
//! 8. `beforeFiles` rewrites
//! 9. Pages API dispatch
//! 10. `afterFiles` rewrites, unless a static route matched exactly
//! 11. page render
//! 12. `fallback` rewrites when nothing matched or the page rendered 404
//!
//! Every stage can end the request. Middleware and config headers are merged
//! into whatever response ends it.

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{LOCATION, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Request, Response, StatusCode};
use tracing::{debug, error, warn};
use url::Url;
use vinext_router::{decode_pathname, normalize_pathname};

use crate::backend::{plain_response, Backend, NotFoundRequest, ProxyRequest, RenderRequest, RouteResolution};
use crate::config::Config;
use crate::error::PipelineError;
use crate::middleware::response::is_middleware_header;
use crate::middleware::{locate_middleware, run_middleware, Middleware, MiddlewareOutcome, MiddlewareRequest, ModuleLoader};
use crate::request_context::RequestContext;
use crate::rules::{CompiledRules, RewritePhase, RewriteTarget};
use crate::tables::RouteTables;

/// Request pipeline for one project
pub struct Pipeline {
    rules: CompiledRules,
    base_path: Option<String>,
    trailing_slash: bool,
    dev: bool,
    tables: Arc<RouteTables>,
    middleware: Option<Middleware>,
    backend: Arc<dyn Backend>,
}

/// Headers collected before the terminal stage
#[derive(Default)]
struct PendingHeaders {
    middleware: HeaderMap,
    config: Vec<(HeaderName, HeaderValue)>,
}

/// Where routing currently points
#[derive(Clone)]
struct Target {
    pathname: String,
    query: Option<String>,
}

impl Pipeline {
    pub fn new(config: &Config, tables: Arc<RouteTables>, backend: Arc<dyn Backend>) -> Self {
        Self {
            rules: CompiledRules::compile(config),
            base_path: config.routing.base_path().map(str::to_string),
            trailing_slash: config.routing.trailing_slash,
            dev: config.dev.enabled,
            tables,
            middleware: None,
            backend,
        }
    }

    pub fn with_middleware(mut self, middleware: Middleware) -> Self {
        self.middleware = Some(middleware);
        self
    }

    /// Pipeline for a project directory
    ///
    /// Route tables are scanned lazily. A middleware file is loaded through
    /// `loader`; one without a usable export fails here, before any request.
    pub async fn for_project(
        config: &Config,
        root: &Path,
        loader: &dyn ModuleLoader,
        backend: Arc<dyn Backend>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        let tables = Arc::new(RouteTables::from_config(root, &config.routing));
        let mut pipeline = Self::new(config, tables, backend);

        if let Some(file) = locate_middleware(root, &config.routing.page_extensions) {
            pipeline.middleware = Some(Middleware::load(file, loader).await?);
        }
        Ok(pipeline)
    }

    pub fn tables(&self) -> &Arc<RouteTables> {
        &self.tables
    }

    pub fn middleware(&self) -> Option<&Middleware> {
        self.middleware.as_ref()
    }

    /// Runs one request through every stage
    pub async fn handle(&self, request: Request<Body>) -> Response<Body> {
        let (mut parts, body) = request.into_parts();
        let query = parts.uri.query().map(str::to_string);

        // Stage 1
        let raw = parts.uri.path().replace('\\', "/");
        if raw.starts_with("//") {
            debug!(path = %raw, "protocol-relative path rejected");
            return plain_response(StatusCode::NOT_FOUND, "Not Found");
        }
        let decoded = match decode_pathname(&raw) {
            Ok(decoded) => decoded,
            Err(err) => {
                debug!(path = %raw, error = %err, "malformed request path");
                return plain_response(StatusCode::BAD_REQUEST, "Bad Request");
            }
        };
        if is_unsafe_path(&decoded) {
            debug!(path = %raw, "unsafe characters in request path");
            return plain_response(StatusCode::BAD_REQUEST, "Bad Request");
        }
        let normalized = normalize_pathname(&decoded).into_owned();

        // Stage 2
        let Some(path) = self.strip_base_path(&normalized) else {
            debug!(path = %normalized, "outside base path");
            return plain_response(StatusCode::NOT_FOUND, "Not Found");
        };

        // Stage 3
        if let Some(location) = self.trailing_slash_redirect(&path, query.as_deref()) {
            return redirect_response(&location, StatusCode::PERMANENT_REDIRECT);
        }
        let canonical = strip_trailing_slash(&path).to_string();

        // Stage 4
        let Some(request_url) = request_url(&parts, &canonical, query.as_deref()) else {
            debug!("unusable host header");
            return plain_response(StatusCode::BAD_REQUEST, "Bad Request");
        };
        let mut ctx = RequestContext::from_parts(&parts).with_path(canonical.clone());
        let mut target = Target {
            pathname: canonical.clone(),
            query,
        };
        let mut pending = PendingHeaders::default();

        // Stage 5
        if let Some(middleware) = self.middleware.as_ref().filter(|m| m.matches(&canonical, &ctx)) {
            let outcome = run_middleware(middleware, MiddlewareRequest::new(&ctx, request_url.clone()), self.dev).await;
            match outcome {
                MiddlewareOutcome::Continue {
                    request_headers,
                    response_headers,
                } => {
                    if let Some(headers) = request_headers {
                        parts.headers = headers;
                    }
                    pending.middleware = response_headers;
                }
                MiddlewareOutcome::Redirect {
                    location,
                    status,
                    response_headers,
                } => {
                    let mut response = Response::new(Body::empty());
                    *response.status_mut() = status;
                    response.headers_mut().insert(LOCATION, location);
                    pending.middleware = response_headers;
                    return finish(response, pending);
                }
                MiddlewareOutcome::Rewrite {
                    url,
                    request_headers,
                    response_headers,
                } => {
                    if let Some(headers) = request_headers {
                        parts.headers = headers;
                    }
                    pending.middleware = response_headers;

                    if url.origin() != request_url.origin() {
                        debug!(%url, "middleware rewrite to external origin");
                        return self.proxy(&parts, url, body, pending).await;
                    }
                    match internal_path(url.path()) {
                        Some(pathname) => {
                            target = Target {
                                pathname,
                                query: url.query().map(str::to_string),
                            };
                        }
                        None => return finish(plain_response(StatusCode::BAD_REQUEST, "Bad Request"), pending),
                    }
                }
                MiddlewareOutcome::Respond(response) => return finish(response, PendingHeaders::default()),
            }
            ctx = RequestContext::new(parts.method.clone(), &parts.uri, parts.headers.clone())
                .with_path(target.pathname.clone())
                .with_query(target.query.as_deref());
        }

        // Stage 6
        pending.config = self.rules.headers_for(&target.pathname, &ctx);

        // Stage 7
        if let Some(redirect) = self.rules.redirect_for(&target.pathname, &ctx, target.query.as_deref()) {
            return finish(redirect_response(&redirect.location, redirect.status), pending);
        }

        // Stage 8
        match self.rewrite(RewritePhase::BeforeFiles, &target, &ctx) {
            Some(RewriteTarget::External(url)) => return self.proxy(&parts, url, body, pending).await,
            Some(RewriteTarget::Internal { pathname, query }) => target = Target { pathname, query },
            None => {}
        }

        // Stage 9
        if is_api_path(&target.pathname) {
            match self.tables.match_api(&target.pathname) {
                Ok(Some(resolution)) => return self.dispatch(&parts, body, target, resolution, pending).await,
                Ok(None) => {}
                Err(err) => return self.table_error(err, pending),
            }
        }

        // Stage 10
        let mut resolution = match self.resolve(&target.pathname) {
            Ok(resolution) => resolution,
            Err(err) => return self.table_error(err, pending),
        };
        if !resolution.as_ref().is_some_and(is_static_match) {
            match self.rewrite(RewritePhase::AfterFiles, &target, &ctx) {
                Some(RewriteTarget::External(url)) => return self.proxy(&parts, url, body, pending).await,
                Some(RewriteTarget::Internal { pathname, query }) => {
                    target = Target { pathname, query };
                    resolution = match self.resolve(&target.pathname) {
                        Ok(resolution) => resolution,
                        Err(err) => return self.table_error(err, pending),
                    };
                }
                None => {}
            }
        }

        // Stage 11
        let Some(resolution) = resolution else {
            return self.fallback(&parts, body, target, &ctx, None, pending).await;
        };
        let is_handler = resolution.route.is_handler();
        let response = match self.call_backend(&parts, body, target.clone(), resolution).await {
            Ok(response) => response,
            Err(err) => return self.backend_error(err, pending),
        };
        if is_handler || response.status() != StatusCode::NOT_FOUND {
            return finish(response, pending);
        }

        // Stage 12. The request body went to the first render.
        debug!(path = %target.pathname, "page rendered 404");
        self.fallback(&parts, Body::empty(), target, &ctx, Some(response), pending)
            .await
    }

    /// `fallback` rewrites, then the 404 page
    ///
    /// `not_found` is the 404 a matched page already rendered; it is sent as is
    /// when no fallback applies.
    async fn fallback(
        &self,
        parts: &Parts,
        body: Body,
        mut target: Target,
        ctx: &RequestContext,
        not_found: Option<Response<Body>>,
        pending: PendingHeaders,
    ) -> Response<Body> {
        match self.rewrite(RewritePhase::Fallback, &target, ctx) {
            Some(RewriteTarget::External(url)) => return self.proxy(parts, url, body, pending).await,
            Some(RewriteTarget::Internal { pathname, query }) => {
                target = Target { pathname, query };
                match self.resolve(&target.pathname) {
                    Ok(Some(resolution)) => return self.dispatch(parts, body, target, resolution, pending).await,
                    Ok(None) => {}
                    Err(err) => return self.table_error(err, pending),
                }
            }
            None => {
                if let Some(response) = not_found {
                    return finish(response, pending);
                }
            }
        }

        debug!(path = %target.pathname, "no route");
        let request = NotFoundRequest {
            method: parts.method.clone(),
            pathname: target.pathname,
            headers: parts.headers.clone(),
        };
        match self.backend.render_not_found(request).await {
            Ok(response) => finish(with_status(response, StatusCode::NOT_FOUND), pending),
            Err(err) => self.backend_error(err, pending),
        }
    }

    fn strip_base_path(&self, path: &str) -> Option<String> {
        let Some(base_path) = &self.base_path else {
            return Some(path.to_string());
        };
        let rest = path.strip_prefix(base_path.as_str())?;
        if rest.is_empty() {
            Some("/".to_string())
        } else if rest.starts_with('/') {
            Some(rest.to_string())
        } else {
            None
        }
    }

    /// Location of the canonical URL, if the path is not canonical
    fn trailing_slash_redirect(&self, path: &str, query: Option<&str>) -> Option<String> {
        if path == "/" || is_api_path(path) || is_file_like(path) {
            return None;
        }

        let canonical = match (self.trailing_slash, path.ends_with('/')) {
            (false, true) => strip_trailing_slash(path).to_string(),
            (true, false) => format!("{path}/"),
            _ => return None,
        };

        let mut location = format!("{}{}", self.base_path.as_deref().unwrap_or(""), encode_path(&canonical)?);
        if let Some(query) = query {
            location.push('?');
            location.push_str(query);
        }
        Some(location)
    }

    fn rewrite(&self, phase: RewritePhase, target: &Target, ctx: &RequestContext) -> Option<RewriteTarget> {
        let rewritten = self
            .rules
            .rewrite_for(phase, &target.pathname, ctx, target.query.as_deref())?;
        match rewritten {
            RewriteTarget::Internal { pathname, query } => match internal_path(&pathname) {
                Some(pathname) => Some(RewriteTarget::Internal { pathname, query }),
                None => {
                    warn!(?phase, %pathname, "rewrite produced an undecodable path; ignored");
                    None
                }
            },
            external => Some(external),
        }
    }

    fn resolve(&self, pathname: &str) -> Result<Option<RouteResolution>, vinext_router::RouterError> {
        self.tables.match_handler(pathname)
    }

    async fn dispatch(
        &self,
        parts: &Parts,
        body: Body,
        target: Target,
        resolution: RouteResolution,
        pending: PendingHeaders,
    ) -> Response<Body> {
        match self.call_backend(parts, body, target, resolution).await {
            Ok(response) => finish(response, pending),
            Err(err) => self.backend_error(err, pending),
        }
    }

    async fn call_backend(
        &self,
        parts: &Parts,
        body: Body,
        target: Target,
        resolution: RouteResolution,
    ) -> anyhow::Result<Response<Body>> {
        debug!(path = %target.pathname, route = resolution.route.pattern(), "route matched");
        let is_handler = resolution.route.is_handler();
        let request = RenderRequest {
            method: parts.method.clone(),
            pathname: target.pathname,
            query: target.query,
            headers: parts.headers.clone(),
            body,
            resolution,
        };

        if is_handler {
            self.backend.dispatch_api(request).await
        } else {
            self.backend.render_page(request).await
        }
    }

    async fn proxy(&self, parts: &Parts, url: Url, body: Body, pending: PendingHeaders) -> Response<Body> {
        debug!(%url, "proxying external rewrite");
        let request = ProxyRequest {
            method: parts.method.clone(),
            url,
            headers: parts.headers.clone(),
            body,
        };
        match self.backend.proxy_external(request).await {
            Ok(response) => finish(response, pending),
            Err(err) => self.backend_error(err, pending),
        }
    }

    fn backend_error(&self, err: anyhow::Error, pending: PendingHeaders) -> Response<Body> {
        error!(error = %err, "backend failed");
        let body = if self.dev {
            format!("Internal Server Error: {err:#}")
        } else {
            "Internal Server Error".to_string()
        };
        finish(plain_response(StatusCode::INTERNAL_SERVER_ERROR, &body), pending)
    }

    fn table_error(&self, err: vinext_router::RouterError, pending: PendingHeaders) -> Response<Body> {
        error!(error = %err, "route table unavailable");
        finish(
            plain_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
            pending,
        )
    }
}

/// Merges collected headers under a terminal response
///
/// Middleware headers go first, config headers replace them, and the
/// response's own headers replace both. `set-cookie` accumulates instead.
/// Routing sentinels never reach the client.
fn finish(response: Response<Body>, pending: PendingHeaders) -> Response<Body> {
    let (mut parts, body) = response.into_parts();

    let mut merged = pending.middleware;
    for (name, value) in pending.config {
        merged.insert(name, value);
    }

    let own = std::mem::take(&mut parts.headers);
    let mut current: Option<HeaderName> = None;
    let mut replaced: Vec<HeaderName> = Vec::new();
    for (name, value) in own {
        // `HeaderMap::into_iter` yields the name only for the first value.
        let name = match name {
            Some(name) => {
                current = Some(name.clone());
                name
            }
            None => match &current {
                Some(name) => name.clone(),
                None => continue,
            },
        };
        if name != SET_COOKIE && !replaced.contains(&name) {
            merged.remove(&name);
            replaced.push(name.clone());
        }
        merged.append(name, value);
    }

    let internal: Vec<HeaderName> = merged.keys().filter(|name| is_middleware_header(name)).cloned().collect();
    for name in internal {
        merged.remove(&name);
    }

    parts.headers = merged;
    Response::from_parts(parts, body)
}

fn redirect_response(location: &str, status: StatusCode) -> Response<Body> {
    match HeaderValue::from_str(location) {
        Ok(value) => {
            let mut response = Response::new(Body::empty());
            *response.status_mut() = status;
            response.headers_mut().insert(LOCATION, value);
            response
        }
        Err(_) => {
            warn!(%location, "redirect location is not a valid header value");
            plain_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}

fn with_status(mut response: Response<Body>, status: StatusCode) -> Response<Body> {
    if response.status() == StatusCode::OK {
        *response.status_mut() = status;
    }
    response
}

/// Full request URL with the base path removed; `None` for an unusable `Host`
fn request_url(parts: &Parts, pathname: &str, query: Option<&str>) -> Option<Url> {
    let scheme = parts
        .headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .filter(|v| *v == "https" || *v == "http")
        .or_else(|| parts.uri.scheme_str())
        .unwrap_or("http");
    let authority = parts
        .headers
        .get("host")
        .and_then(|v| v.to_str().ok())
        .or_else(|| parts.uri.authority().map(|a| a.as_str()))
        .unwrap_or("localhost");

    let mut url = Url::parse(&format!("{scheme}://{authority}/")).ok()?;
    url.set_path(pathname);
    url.set_query(query);
    Some(url)
}

/// Canonical form of a path produced by a rewrite
fn internal_path(path: &str) -> Option<String> {
    let decoded = decode_pathname(path).ok()?;
    Some(strip_trailing_slash(&normalize_pathname(&decoded)).to_string())
}

/// Percent-encodes a decoded path for use in a `Location` header
///
/// Characters a URL path may not carry raw (space, `?`, `#`, non-ASCII) are
/// encoded; escapes kept by decoding, like `%2F`, pass through unchanged.
/// Callers must have rejected control characters first, since URL parsing
/// drops tabs and newlines.
fn encode_path(path: &str) -> Option<String> {
    let mut url = Url::parse("http://localhost/").ok()?;
    url.set_path(path);
    Some(url.path().to_string())
}

/// Decoded paths that must never be routed or echoed back
///
/// Browsers drop tabs and newlines when parsing a URL, and a leading
/// whitespace-only segment sits one stripped character away from `//`.
fn is_unsafe_path(decoded: &str) -> bool {
    if decoded.chars().any(char::is_control) {
        return true;
    }
    decoded
        .strip_prefix('/')
        .and_then(|rest| rest.split_once('/'))
        .is_some_and(|(first, _)| !first.is_empty() && first.trim().is_empty())
}

/// A route without dynamic segments matched the path exactly
fn is_static_match(resolution: &RouteResolution) -> bool {
    !resolution.route.pattern().contains(':')
}

fn strip_trailing_slash(path: &str) -> &str {
    vinext_router::path::strip_trailing_slash(path)
}

fn is_api_path(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/")
}

/// Last segment has an extension, like `/favicon.ico`
fn is_file_like(path: &str) -> bool {
    strip_trailing_slash(path)
        .rsplit('/')
        .next()
        .is_some_and(|segment| segment.contains('.'))
}
