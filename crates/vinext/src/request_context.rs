// File: src/request_context.rs
// Purpose: Request view used to evaluate has/missing conditions

use axum::http::request::Parts;
use axum::http::{HeaderMap, Method, Request, Uri};
use std::collections::HashMap;

/// The parts of a request that routing conditions can look at
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// HTTP method (GET, POST, PUT, DELETE, etc.)
    pub method: Method,

    /// Canonical request path
    pub path: String,

    /// Query parameters from URL (?key=value); the last value wins
    pub query: HashMap<String, String>,

    /// Request headers
    pub headers: HeaderMap,

    /// Parsed cookies
    pub cookies: HashMap<String, String>,

    /// Host name without port
    pub host: Option<String>,
}

impl RequestContext {
    /// Create a new request context
    pub fn new(method: Method, uri: &Uri, headers: HeaderMap) -> Self {
        let cookies = Self::parse_cookies(&headers);
        let query = uri.query().map(Self::parse_query).unwrap_or_default();
        let host = Self::parse_host(uri, &headers);

        Self {
            method,
            path: uri.path().to_string(),
            query,
            headers,
            cookies,
            host,
        }
    }

    pub fn from_request<B>(request: &Request<B>) -> Self {
        Self::new(request.method().clone(), request.uri(), request.headers().clone())
    }

    pub fn from_parts(parts: &Parts) -> Self {
        Self::new(parts.method.clone(), &parts.uri, parts.headers.clone())
    }

    /// Replaces the path with an already canonicalized one
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Replaces the query, e.g. after a rewrite changed it
    pub fn with_query(mut self, query: Option<&str>) -> Self {
        self.query = query.map(Self::parse_query).unwrap_or_default();
        self
    }

    /// Parse cookies from every Cookie header
    fn parse_cookies(headers: &HeaderMap) -> HashMap<String, String> {
        let mut cookies = HashMap::new();

        for cookie_header in headers.get_all("cookie") {
            if let Ok(cookie_str) = cookie_header.to_str() {
                for cookie in cookie_str.split(';') {
                    let cookie = cookie.trim();
                    if let Some((key, value)) = cookie.split_once('=') {
                        cookies.insert(key.to_string(), value.to_string());
                    }
                }
            }
        }

        cookies
    }

    fn parse_query(query: &str) -> HashMap<String, String> {
        url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect()
    }

    fn parse_host(uri: &Uri, headers: &HeaderMap) -> Option<String> {
        let authority = headers
            .get("host")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .or_else(|| uri.authority().map(|a| a.as_str().to_string()))?;

        let host = match authority.rsplit_once(':') {
            // Keep IPv6 literals like `[::1]` intact.
            Some((host, port)) if !host.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => {
                host.to_string()
            }
            _ => authority,
        };
        Some(host.to_ascii_lowercase())
    }

    /// Get a cookie value
    pub fn get_cookie(&self, name: &str) -> Option<&String> {
        self.cookies.get(name)
    }

    /// Get a header value
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// Get a query parameter
    pub fn get_query(&self, name: &str) -> Option<&String> {
        self.query.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(uri: &str, headers: &[(&str, &str)]) -> Request<()> {
        let mut builder = Request::builder().uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap()
    }

    #[test]
    fn test_parses_cookies_query_and_host() {
        let req = request(
            "/search?q=rust&page=2&q=async",
            &[("cookie", "session=abc; theme=dark"), ("host", "Example.com:3000")],
        );
        let ctx = RequestContext::from_request(&req);

        assert_eq!(ctx.path, "/search");
        assert_eq!(ctx.get_cookie("session").map(String::as_str), Some("abc"));
        assert_eq!(ctx.get_cookie("theme").map(String::as_str), Some("dark"));
        assert_eq!(ctx.get_query("q").map(String::as_str), Some("async"));
        assert_eq!(ctx.get_query("page").map(String::as_str), Some("2"));
        assert_eq!(ctx.host.as_deref(), Some("example.com"));
    }

    #[test]
    fn test_host_falls_back_to_uri_authority() {
        let req = request("http://api.example.com/x", &[]);
        let ctx = RequestContext::from_request(&req);
        assert_eq!(ctx.host.as_deref(), Some("api.example.com"));
    }

    #[test]
    fn test_ipv6_host_keeps_brackets() {
        let req = request("/", &[("host", "[::1]")]);
        assert_eq!(RequestContext::from_request(&req).host.as_deref(), Some("[::1]"));
    }

    #[test]
    fn test_with_path() {
        let req = request("/a//b", &[]);
        let ctx = RequestContext::from_request(&req).with_path("/a/b");
        assert_eq!(ctx.path, "/a/b");
    }
}
