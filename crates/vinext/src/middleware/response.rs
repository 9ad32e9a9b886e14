//! Routing sentinels and the responses middleware builds with them

use axum::body::Body;
use axum::http::header::{InvalidHeaderValue, CONTENT_TYPE, LOCATION};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Response, StatusCode};
use serde_json::Value;

pub const MIDDLEWARE_NEXT: &str = "x-middleware-next";
pub const MIDDLEWARE_REWRITE: &str = "x-middleware-rewrite";
pub const MIDDLEWARE_REQUEST_PREFIX: &str = "x-middleware-request-";
pub const MIDDLEWARE_OVERRIDE_HEADERS: &str = "x-middleware-override-headers";
/// Every header with this prefix is internal and never reaches the client
pub const MIDDLEWARE_PREFIX: &str = "x-middleware-";

pub fn is_middleware_header(name: &HeaderName) -> bool {
    name.as_str().starts_with(MIDDLEWARE_PREFIX)
}

/// Response builders for middleware handlers
pub struct NextResponse;

impl NextResponse {
    /// Continue to routing unchanged
    pub fn next() -> Response<Body> {
        let mut response = Response::new(Body::empty());
        response
            .headers_mut()
            .insert(MIDDLEWARE_NEXT, HeaderValue::from_static("1"));
        response
    }

    /// Continue with a replaced set of request headers
    pub fn next_with_headers(request_headers: &HeaderMap) -> Response<Body> {
        let mut response = Self::next();
        pack_request_headers(response.headers_mut(), request_headers);
        response
    }

    pub fn redirect(url: &str, status: StatusCode) -> Result<Response<Body>, InvalidHeaderValue> {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = status;
        response.headers_mut().insert(LOCATION, HeaderValue::from_str(url)?);
        Ok(response)
    }

    /// Serve another URL; relative URLs resolve against the request URL
    pub fn rewrite(url: &str) -> Result<Response<Body>, InvalidHeaderValue> {
        let mut response = Response::new(Body::empty());
        response
            .headers_mut()
            .insert(MIDDLEWARE_REWRITE, HeaderValue::from_str(url)?);
        Ok(response)
    }

    pub fn json(status: StatusCode, value: &Value) -> Response<Body> {
        let mut response = Response::new(Body::from(value.to_string()));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }
}

/// Encodes request headers as `x-middleware-request-*` plus the override list
fn pack_request_headers(target: &mut HeaderMap, request_headers: &HeaderMap) {
    let mut names: Vec<&str> = Vec::new();
    for (name, value) in request_headers {
        let packed = format!("{MIDDLEWARE_REQUEST_PREFIX}{}", name.as_str());
        if let Ok(packed) = HeaderName::try_from(packed) {
            target.append(packed, value.clone());
        }
        if !names.contains(&name.as_str()) {
            names.push(name.as_str());
        }
    }

    if let Ok(list) = HeaderValue::from_str(&names.join(",")) {
        target.insert(MIDDLEWARE_OVERRIDE_HEADERS, list);
    }
}
