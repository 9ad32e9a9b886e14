use std::collections::HashMap;

use axum::http::{HeaderMap, Method};
use url::Url;

use crate::request_context::RequestContext;

/// Geolocation derived from edge headers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Geo {
    pub city: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
}

impl Geo {
    /// Reads `x-vercel-ip-*` headers, then Cloudflare's `cf-ip*`
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let read = |names: &[&str]| {
            names.iter().find_map(|name| {
                headers
                    .get(*name)
                    .and_then(|v| v.to_str().ok())
                    .filter(|v| !v.is_empty())
                    .map(|v| urlencoding::decode(v).map(|d| d.into_owned()).unwrap_or_else(|_| v.to_string()))
            })
        };

        Self {
            city: read(&["x-vercel-ip-city", "cf-ipcity"]),
            country: read(&["x-vercel-ip-country", "cf-ipcountry"]),
            region: read(&["x-vercel-ip-country-region", "cf-region"]),
            latitude: read(&["x-vercel-ip-latitude", "cf-iplatitude"]),
            longitude: read(&["x-vercel-ip-longitude", "cf-iplongitude"]),
        }
    }
}

/// The request a middleware handler sees
#[derive(Debug, Clone)]
pub struct MiddlewareRequest {
    pub method: Method,
    /// Full URL, base path excluded
    pub url: Url,
    pub headers: HeaderMap,
    pub cookies: HashMap<String, String>,
    pub geo: Geo,
    pub ip: Option<String>,
}

impl MiddlewareRequest {
    pub fn new(ctx: &RequestContext, url: Url) -> Self {
        Self {
            method: ctx.method.clone(),
            url,
            headers: ctx.headers.clone(),
            cookies: ctx.cookies.clone(),
            geo: Geo::from_headers(&ctx.headers),
            ip: client_ip(&ctx.headers),
        }
    }

    pub fn next_url(&self) -> &Url {
        &self.url
    }

    pub fn pathname(&self) -> &str {
        self.url.path()
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}

/// First hop of `x-forwarded-for`, else `x-real-ip`
fn client_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    forwarded
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
        .map(str::to_string)
}
