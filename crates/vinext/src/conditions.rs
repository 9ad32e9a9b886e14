use std::collections::HashMap;

use fancy_regex::Regex;
use tracing::warn;
use vinext_router::safe_regex::compile_safe_regex;

use crate::config::RouteHas;
use crate::request_context::RequestContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Header,
    Cookie,
    Query,
    Host,
}

#[derive(Debug, Clone)]
struct Condition {
    source: Source,
    key: String,
    /// `None` means "present"; `Some(None)` means the value regex was rejected
    value: Option<Option<Regex>>,
}

/// Compiled `has` / `missing` lists of one rule
#[derive(Debug, Clone, Default)]
pub struct Conditions {
    has: Vec<Condition>,
    missing: Vec<Condition>,
}

impl Conditions {
    pub fn compile(has: &[RouteHas], missing: &[RouteHas]) -> Self {
        Self {
            has: has.iter().map(Condition::compile).collect(),
            missing: missing.iter().map(Condition::compile).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.has.is_empty() && self.missing.is_empty()
    }

    /// Evaluates every condition against a request
    ///
    /// Returns the parameters captured by `has` items, or `None` if any `has`
    /// item fails or any `missing` item matches.
    pub fn evaluate(&self, ctx: &RequestContext) -> Option<HashMap<String, String>> {
        let mut params = HashMap::new();
        for condition in &self.has {
            if !condition.matches(ctx, &mut params) {
                return None;
            }
        }
        let mut ignored = HashMap::new();
        for condition in &self.missing {
            if condition.matches(ctx, &mut ignored) {
                return None;
            }
        }
        Some(params)
    }
}

impl Condition {
    fn compile(item: &RouteHas) -> Self {
        let (source, key, value) = match item {
            RouteHas::Header { key, value } => (Source::Header, key.to_ascii_lowercase(), value.as_deref()),
            RouteHas::Cookie { key, value } => (Source::Cookie, key.clone(), value.as_deref()),
            RouteHas::Query { key, value } => (Source::Query, key.clone(), value.as_deref()),
            RouteHas::Host { value } => (Source::Host, String::new(), Some(value.as_str())),
        };

        let value = value.map(|pattern| {
            compile_safe_regex(&format!("^(?:{pattern})$"), "")
                .map_err(|reason| {
                    warn!(pattern, %reason, "condition value rejected; condition never matches");
                })
                .ok()
        });

        Self { source, key, value }
    }

    fn actual<'c>(&self, ctx: &'c RequestContext) -> Option<&'c str> {
        match self.source {
            Source::Header => ctx.get_header(&self.key),
            Source::Cookie => ctx.get_cookie(&self.key).map(String::as_str),
            Source::Query => ctx.get_query(&self.key).map(String::as_str),
            Source::Host => ctx.host.as_deref(),
        }
    }

    fn matches(&self, ctx: &RequestContext, params: &mut HashMap<String, String>) -> bool {
        let Some(actual) = self.actual(ctx) else {
            return false;
        };

        match &self.value {
            None => {
                params.insert(safe_param_name(&self.key), actual.to_string());
                true
            }
            Some(None) => false,
            Some(Some(regex)) => match regex.captures(actual) {
                Ok(Some(captures)) => {
                    for name in regex.capture_names().flatten() {
                        if let Some(value) = captures.name(name) {
                            params.insert(name.to_string(), value.as_str().to_string());
                        }
                    }
                    if self.source == Source::Host {
                        params.insert("host".to_string(), actual.to_string());
                    }
                    true
                }
                Ok(None) => false,
                Err(error) => {
                    warn!(%error, "condition regex aborted");
                    false
                }
            },
        }
    }
}

/// Keys like `x-user-id` become usable destination params (`xuserid`).
fn safe_param_name(key: &str) -> String {
    key.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}
