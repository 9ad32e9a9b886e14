use std::any::Any;
use std::panic::AssertUnwindSafe;

use axum::body::Body;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Response, StatusCode};
use futures_util::FutureExt;
use tracing::{debug, error, warn};
use url::Url;

use super::response::{
    is_middleware_header, MIDDLEWARE_NEXT, MIDDLEWARE_OVERRIDE_HEADERS, MIDDLEWARE_REQUEST_PREFIX,
    MIDDLEWARE_REWRITE,
};
use super::{Middleware, MiddlewareRequest};

/// What the pipeline does after middleware ran
#[derive(Debug)]
pub enum MiddlewareOutcome {
    /// Carry on routing
    Continue {
        /// Replacement request headers, if middleware changed them
        request_headers: Option<HeaderMap>,
        response_headers: HeaderMap,
    },
    /// Send a redirect as returned
    Redirect {
        location: HeaderValue,
        status: StatusCode,
        response_headers: HeaderMap,
    },
    /// Route against another URL, possibly on another origin
    Rewrite {
        url: Url,
        request_headers: Option<HeaderMap>,
        response_headers: HeaderMap,
    },
    /// Terminal response produced by middleware
    Respond(Response<Body>),
}

/// Runs middleware and interprets its response
///
/// Errors and panics both end in a 500; the message is only shown in
/// development.
pub async fn run_middleware(middleware: &Middleware, request: MiddlewareRequest, dev: bool) -> MiddlewareOutcome {
    let request_url = request.url.clone();
    let request_headers = request.headers.clone();
    let path = middleware.file.path.display().to_string();

    let result = AssertUnwindSafe(middleware.handler().call(request))
        .catch_unwind()
        .await;

    let response = match result {
        Ok(Ok(response)) => response,
        Ok(Err(err)) => {
            error!(middleware = %path, error = %err, "middleware failed");
            return MiddlewareOutcome::Respond(error_response(&err.to_string(), dev));
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            error!(middleware = %path, %message, "middleware panicked");
            return MiddlewareOutcome::Respond(error_response(&message, dev));
        }
    };

    interpret(response, &request_url, &request_headers)
}

/// Maps a middleware response to an outcome
///
/// Precedence: next sentinel, 3xx with `Location`, rewrite sentinel, then
/// anything else is terminal.
pub fn interpret(response: Response<Body>, request_url: &Url, request_headers: &HeaderMap) -> MiddlewareOutcome {
    let headers = response.headers();

    if headers.contains_key(MIDDLEWARE_NEXT) {
        return MiddlewareOutcome::Continue {
            request_headers: unpack_request_headers(headers, request_headers),
            response_headers: forwarded_headers(headers),
        };
    }

    if response.status().is_redirection() {
        if let Some(location) = headers.get(LOCATION) {
            return MiddlewareOutcome::Redirect {
                location: location.clone(),
                status: response.status(),
                response_headers: forwarded_headers(headers),
            };
        }
    }

    if let Some(rewrite) = headers.get(MIDDLEWARE_REWRITE) {
        let target = rewrite.to_str().ok().and_then(|value| request_url.join(value).ok());
        return match target {
            Some(url) => {
                debug!(%url, "middleware rewrite");
                MiddlewareOutcome::Rewrite {
                    url,
                    request_headers: unpack_request_headers(headers, request_headers),
                    response_headers: forwarded_headers(headers),
                }
            }
            None => {
                warn!(value = ?rewrite, "middleware rewrite target is not a URL");
                MiddlewareOutcome::Respond(error_response("invalid rewrite target", false))
            }
        };
    }

    MiddlewareOutcome::Respond(response)
}

/// Headers middleware adds to the eventual response
fn forwarded_headers(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = HeaderMap::new();
    for (name, value) in headers {
        if is_middleware_header(name) || name == CONTENT_LENGTH || name == LOCATION {
            continue;
        }
        forwarded.append(name.clone(), value.clone());
    }
    forwarded
}

/// Rebuilds the forwarded request headers from `x-middleware-request-*`
///
/// With `x-middleware-override-headers`, only the listed names survive.
/// Returns `None` when middleware did not touch request headers.
fn unpack_request_headers(headers: &HeaderMap, original: &HeaderMap) -> Option<HeaderMap> {
    let mut unpacked = HeaderMap::new();
    for (name, value) in headers {
        if let Some(target) = name.as_str().strip_prefix(MIDDLEWARE_REQUEST_PREFIX) {
            if let Ok(target) = HeaderName::try_from(target) {
                unpacked.append(target, value.clone());
            }
        }
    }

    let overrides: Option<Vec<String>> = headers
        .get(MIDDLEWARE_OVERRIDE_HEADERS)
        .and_then(|v| v.to_str().ok())
        .map(|list| {
            list.split(',')
                .map(|name| name.trim().to_ascii_lowercase())
                .filter(|name| !name.is_empty())
                .collect()
        });

    if unpacked.is_empty() && overrides.is_none() {
        return None;
    }

    let mut result = match &overrides {
        Some(names) => {
            let mut kept = HeaderMap::new();
            for (name, value) in original {
                if names.iter().any(|n| n == name.as_str()) {
                    kept.append(name.clone(), value.clone());
                }
            }
            kept
        }
        None => original.clone(),
    };

    for name in unpacked.keys() {
        result.remove(name);
    }
    for (name, value) in &unpacked {
        result.append(name.clone(), value.clone());
    }
    Some(result)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "middleware panicked".to_string()
    }
}

fn error_response(message: &str, dev: bool) -> Response<Body> {
    let body = if dev {
        format!("Middleware error: {message}")
    } else {
        "Internal Server Error".to_string()
    };

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    response
}
