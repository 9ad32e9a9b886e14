//! Compiled `headers`, `redirects` and `rewrites` config rules
//!
//! Every rule source goes through [`CompiledPattern`], so config rules and the
//! middleware matcher share one template/regex classification.

use std::collections::HashSet;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use tracing::{debug, warn};
use url::Url;
use vinext_router::{CompiledPattern, ParamValue, Params};

use crate::conditions::Conditions;
use crate::config::{Config, HeaderRule, RedirectRule, RewriteRule};
use crate::request_context::RequestContext;

/// Where a rewrite sends the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteTarget {
    /// Same-app path; re-enters route matching
    Internal { pathname: String, query: Option<String> },
    /// Absolute URL on another origin; proxied
    External(Url),
}

/// A resolved redirect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub location: String,
    pub status: StatusCode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewritePhase {
    BeforeFiles,
    AfterFiles,
    Fallback,
}

#[derive(Debug, Clone)]
struct CompiledHeaderRule {
    pattern: CompiledPattern,
    conditions: Conditions,
    headers: Vec<(HeaderName, HeaderValue)>,
}

#[derive(Debug, Clone)]
struct CompiledRedirect {
    pattern: CompiledPattern,
    conditions: Conditions,
    destination: String,
    permanent: bool,
    base_path: bool,
}

#[derive(Debug, Clone)]
struct CompiledRewrite {
    pattern: CompiledPattern,
    conditions: Conditions,
    destination: String,
}

/// All config rules, compiled once
#[derive(Debug, Clone, Default)]
pub struct CompiledRules {
    base_path: Option<String>,
    headers: Vec<CompiledHeaderRule>,
    redirects: Vec<CompiledRedirect>,
    before_files: Vec<CompiledRewrite>,
    after_files: Vec<CompiledRewrite>,
    fallback: Vec<CompiledRewrite>,
}

impl CompiledRules {
    pub fn compile(config: &Config) -> Self {
        let rewrites = |rules: &[RewriteRule]| rules.iter().map(compile_rewrite).collect::<Vec<_>>();

        Self {
            base_path: config.routing.base_path().map(str::to_string),
            headers: config.headers.iter().map(compile_header_rule).collect(),
            redirects: config.redirects.iter().map(compile_redirect).collect(),
            before_files: rewrites(&config.rewrites.before_files),
            after_files: rewrites(&config.rewrites.after_files),
            fallback: rewrites(&config.rewrites.fallback),
        }
    }

    /// Headers of every matching rule, in rule order
    pub fn headers_for(&self, pathname: &str, ctx: &RequestContext) -> Vec<(HeaderName, HeaderValue)> {
        self.headers
            .iter()
            .filter(|rule| rule.pattern.is_match(pathname) && rule.conditions.evaluate(ctx).is_some())
            .flat_map(|rule| rule.headers.iter().cloned())
            .collect()
    }

    /// First matching redirect
    ///
    /// The request query is carried over to the destination. Internal
    /// destinations are prefixed with the base path unless the rule opts out.
    pub fn redirect_for(&self, pathname: &str, ctx: &RequestContext, query: Option<&str>) -> Option<Redirect> {
        self.redirects.iter().find_map(|rule| {
            let params = match_rule(&rule.pattern, &rule.conditions, pathname, ctx)?;
            let (destination, _) = substitute(&rule.destination, &params);
            let mut location = merge_query(&destination, query, &[]);

            if location.starts_with('/') && rule.base_path {
                if let Some(base_path) = &self.base_path {
                    location = format!("{base_path}{location}");
                }
            }

            let status = if rule.permanent {
                StatusCode::PERMANENT_REDIRECT
            } else {
                StatusCode::TEMPORARY_REDIRECT
            };
            debug!(source = rule.pattern.source(), %location, %status, "redirect");
            Some(Redirect { location, status })
        })
    }

    /// First matching rewrite of a phase
    ///
    /// Source params the destination does not reference are appended to its
    /// query, after the request's own query.
    pub fn rewrite_for(
        &self,
        phase: RewritePhase,
        pathname: &str,
        ctx: &RequestContext,
        query: Option<&str>,
    ) -> Option<RewriteTarget> {
        let rules = match phase {
            RewritePhase::BeforeFiles => &self.before_files,
            RewritePhase::AfterFiles => &self.after_files,
            RewritePhase::Fallback => &self.fallback,
        };

        rules.iter().find_map(|rule| {
            let params = match_rule(&rule.pattern, &rule.conditions, pathname, ctx)?;
            let (destination, used) = substitute(&rule.destination, &params);

            let mut unused: Vec<(String, String)> = params
                .iter()
                .filter(|(name, _)| !used.contains(name.as_str()))
                .map(|(name, value)| (name.clone(), value.to_path_string()))
                .collect();
            unused.sort();

            let target = merge_query(&destination, query, &unused);
            debug!(?phase, source = rule.pattern.source(), %target, "rewrite");
            Some(parse_target(&target))
        })
    }
}

fn compile_header_rule(rule: &HeaderRule) -> CompiledHeaderRule {
    let headers = rule
        .headers
        .iter()
        .filter_map(|entry| {
            let name = HeaderName::try_from(entry.key.as_str());
            let value = HeaderValue::try_from(entry.value.as_str());
            match (name, value) {
                (Ok(name), Ok(value)) => Some((name, value)),
                _ => {
                    warn!(source = %rule.source, key = %entry.key, "invalid header in config rule; skipped");
                    None
                }
            }
        })
        .collect();

    CompiledHeaderRule {
        pattern: compile_source(&rule.source),
        conditions: Conditions::compile(&rule.has, &rule.missing),
        headers,
    }
}

fn compile_redirect(rule: &RedirectRule) -> CompiledRedirect {
    CompiledRedirect {
        pattern: compile_source(&rule.source),
        conditions: Conditions::compile(&rule.has, &rule.missing),
        destination: rule.destination.clone(),
        permanent: rule.permanent,
        base_path: rule.base_path != Some(false),
    }
}

fn compile_rewrite(rule: &RewriteRule) -> CompiledRewrite {
    CompiledRewrite {
        pattern: compile_source(&rule.source),
        conditions: Conditions::compile(&rule.has, &rule.missing),
        destination: rule.destination.clone(),
    }
}

fn compile_source(source: &str) -> CompiledPattern {
    let pattern = CompiledPattern::compile(source);
    if pattern.is_exact_fallback() {
        warn!(source, "rule source compiled to exact match only");
    }
    pattern
}

/// Source params plus condition captures, or `None` if the rule does not apply.
fn match_rule(
    pattern: &CompiledPattern,
    conditions: &Conditions,
    pathname: &str,
    ctx: &RequestContext,
) -> Option<Params> {
    let mut params = pattern.captures(pathname)?;
    let captured = conditions.evaluate(ctx)?;
    for (name, value) in captured {
        params.entry(name).or_insert(ParamValue::Single(value));
    }
    Some(params)
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Fills `:name` placeholders in one left-to-right pass
///
/// Modifiers (`*`, `+`, `?`) after a placeholder are consumed. Unknown names
/// are left verbatim, so ports like `:8080` survive. Substituted values are
/// never scanned again. Returns the names that were used.
pub fn substitute(destination: &str, params: &Params) -> (String, HashSet<String>) {
    let chars: Vec<char> = destination.chars().collect();
    let mut out = String::with_capacity(destination.len());
    let mut used = HashSet::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == ':' {
            let start = i + 1;
            let mut end = start;
            while end < chars.len() && is_name_char(chars[end]) {
                end += 1;
            }
            let name: String = chars[start..end].iter().collect();
            if let Some(value) = params.get(&name) {
                if matches!(chars.get(end), Some('*') | Some('+') | Some('?')) {
                    end += 1;
                }
                match value {
                    ParamValue::Multi(segments) if segments.is_empty() => {
                        // `/blog/:path*` with nothing captured is `/blog`.
                        if out.ends_with('/') && out.len() > 1 {
                            out.pop();
                        }
                    }
                    ParamValue::Multi(segments) => {
                        let encoded: Vec<String> = segments
                            .iter()
                            .map(|s| urlencoding::encode(s).into_owned())
                            .collect();
                        out.push_str(&encoded.join("/"));
                    }
                    ParamValue::Single(value) => out.push_str(&urlencoding::encode(value)),
                }
                used.insert(name);
                i = end;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }

    (out, used)
}

/// Merges the request query and extra params into a destination
///
/// Keys already present in the destination keep the destination's value.
fn merge_query(destination: &str, request_query: Option<&str>, extra: &[(String, String)]) -> String {
    let (base, fragment) = match destination.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (destination, None),
    };
    let (path, dest_query) = match base.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (base, None),
    };

    let mut pairs: Vec<(String, String)> = dest_query
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();
    let mut seen: HashSet<String> = pairs.iter().map(|(k, _)| k.clone()).collect();

    let request_pairs = request_query
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect::<Vec<_>>())
        .unwrap_or_default();
    let mut added = HashSet::new();
    for (key, value) in request_pairs.into_iter().chain(extra.iter().cloned()) {
        if seen.contains(&key) && !added.contains(&key) {
            continue;
        }
        added.insert(key.clone());
        seen.insert(key.clone());
        pairs.push((key, value));
    }

    let mut result = path.to_string();
    if !pairs.is_empty() {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        result.push('?');
        result.push_str(&query);
    }
    if let Some(fragment) = fragment {
        result.push('#');
        result.push_str(fragment);
    }
    result
}

fn parse_target(target: &str) -> RewriteTarget {
    if target.starts_with("http://") || target.starts_with("https://") {
        if let Ok(url) = Url::parse(target) {
            return RewriteTarget::External(url);
        }
        warn!(target, "rewrite destination is not a valid URL; treating as a path");
    }

    let without_fragment = target.split('#').next().unwrap_or(target);
    match without_fragment.split_once('?') {
        Some((pathname, query)) => RewriteTarget::Internal {
            pathname: pathname.to_string(),
            query: Some(query.to_string()).filter(|q| !q.is_empty()),
        },
        None => RewriteTarget::Internal {
            pathname: without_fragment.to_string(),
            query: None,
        },
    }
}
