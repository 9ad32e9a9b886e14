//! `config.matcher` of a middleware module

use serde::Deserialize;
use serde_json::Value;
use vinext_router::{normalize_pathname, CompiledPattern};

use crate::conditions::Conditions;
use crate::config::RouteHas;
use crate::request_context::RequestContext;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMatcher {
    One(String),
    Many(Vec<RawEntry>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Source(String),
    Object {
        source: String,
        #[serde(default)]
        has: Vec<RouteHas>,
        #[serde(default)]
        missing: Vec<RouteHas>,
    },
}

#[derive(Debug, Clone)]
struct MatcherEntry {
    pattern: CompiledPattern,
    conditions: Conditions,
}

/// Compiled middleware matcher; a path matches if any entry matches
#[derive(Debug, Clone)]
pub struct MiddlewareMatcher {
    entries: Vec<MatcherEntry>,
}

impl MiddlewareMatcher {
    /// Parses `string | string[] | {source, has?, missing?}[]`
    pub fn from_value(value: &Value) -> Result<Self, String> {
        let raw: RawMatcher = serde_json::from_value(value.clone())
            .map_err(|_| "expected a string, an array of strings or an array of {source} objects".to_string())?;

        let entries = match raw {
            RawMatcher::One(source) => vec![RawEntry::Source(source)],
            RawMatcher::Many(entries) => entries,
        };

        entries
            .into_iter()
            .map(|entry| {
                let (source, has, missing) = match entry {
                    RawEntry::Source(source) => (source, Vec::new(), Vec::new()),
                    RawEntry::Object { source, has, missing } => (source, has, missing),
                };
                if !source.starts_with('/') {
                    return Err(format!("matcher source `{source}` must start with `/`"));
                }
                Ok(MatcherEntry {
                    pattern: CompiledPattern::compile(&source),
                    conditions: Conditions::compile(&has, &missing),
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(|entries| Self { entries })
    }

    pub fn from_sources<S: AsRef<str>>(sources: &[S]) -> Self {
        Self {
            entries: sources
                .iter()
                .map(|source| MatcherEntry {
                    pattern: CompiledPattern::compile(source.as_ref()),
                    conditions: Conditions::default(),
                })
                .collect(),
        }
    }

    pub fn matches(&self, pathname: &str, ctx: &RequestContext) -> bool {
        let pathname = normalize_pathname(pathname);
        self.entries.iter().any(|entry| {
            entry.pattern.is_match(&pathname) && entry.conditions.evaluate(ctx).is_some()
        })
    }
}

/// Whether middleware runs for a decoded pathname
///
/// Without a matcher, middleware runs for every path.
pub fn matches_middleware(pathname: &str, matcher: Option<&MiddlewareMatcher>, ctx: &RequestContext) -> bool {
    match matcher {
        None => true,
        Some(matcher) => matcher.matches(pathname, ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use serde_json::json;

    fn ctx(uri: &str) -> RequestContext {
        RequestContext::from_request(&Request::builder().uri(uri).body(()).unwrap())
    }

    #[test]
    fn test_no_matcher_always_matches() {
        assert!(matches_middleware("/anything", None, &ctx("/anything")));
        assert!(matches_middleware("/", None, &ctx("/")));
    }

    #[test]
    fn test_string_and_array_forms() {
        let one = MiddlewareMatcher::from_value(&json!("/admin/:path*")).unwrap();
        assert!(one.matches("/admin", &ctx("/admin")));
        assert!(one.matches("/admin/users", &ctx("/admin/users")));
        assert!(!one.matches("/public", &ctx("/public")));

        let many = MiddlewareMatcher::from_value(&json!(["/about", "/blog/:slug"])).unwrap();
        assert!(many.matches("/blog/hello", &ctx("/blog/hello")));
        assert!(!many.matches("/blog", &ctx("/blog")));
    }

    #[test]
    fn test_object_form_with_conditions() {
        let matcher = MiddlewareMatcher::from_value(&json!([
            { "source": "/dashboard", "missing": [{ "type": "cookie", "key": "session" }] }
        ]))
        .unwrap();
        assert!(matcher.matches("/dashboard", &ctx("/dashboard")));

        let with_cookie = RequestContext::from_request(
            &Request::builder()
                .uri("/dashboard")
                .header("cookie", "session=1")
                .body(())
                .unwrap(),
        );
        assert!(!matcher.matches("/dashboard", &with_cookie));
    }

    #[test]
    fn test_regex_source() {
        let matcher = MiddlewareMatcher::from_value(&json!("/((?!api|_next).*)")).unwrap();
        assert!(matcher.matches("/dashboard", &ctx("/dashboard")));
        assert!(!matcher.matches("/api/users", &ctx("/api/users")));
    }

    #[test]
    fn test_path_is_normalized_before_matching() {
        let matcher = MiddlewareMatcher::from_sources(&["/admin/:path*"]);
        assert!(matcher.matches("//admin", &ctx("/")));
        assert!(matcher.matches("/public/../admin", &ctx("/")));
    }

    #[test]
    fn test_invalid_matcher() {
        assert!(MiddlewareMatcher::from_value(&json!(42)).is_err());
        assert!(MiddlewareMatcher::from_value(&json!(["admin"])).is_err());
    }
}
