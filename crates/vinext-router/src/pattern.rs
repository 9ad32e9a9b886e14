//! Path patterns for matcher config, redirects, rewrites and headers
//!
//! Two syntaxes share one entry point. [`classify_pattern`] decides which one
//! a source string uses, and it is the only place that decision is made:
//!
//! - **Template** (`/posts/:id`, `/docs/:slug+`, `/shop/:path*`): tokenized
//!   once, left to right, into a linear-time `regex::Regex`.
//! - **Regex** (anything containing `(` or `\`): compiled as an anchored
//!   regex through [`safe_regex`](crate::safe_regex). The only rewriting
//!   applied is the `:name(...)` shorthand for a named capture group.
//!
//! A pattern that fails to compile degrades to exact string equality.

use std::collections::HashMap;
use std::fmt;

use tracing::warn;

use crate::safe_regex::{check_regex_safety, compile_safe_regex};

/// How a pattern source is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    /// Path template with `:name`, `:name*`, `:name+`, `:name?` tokens
    Template,
    /// Raw anchored regular expression
    Regex,
}

/// Classifies a pattern source
///
/// ```
/// use vinext_router::pattern::{classify_pattern, PatternKind};
///
/// assert_eq!(classify_pattern("/dashboard/:path*"), PatternKind::Template);
/// assert_eq!(classify_pattern("/((?!api|_next).*)"), PatternKind::Regex);
/// assert_eq!(classify_pattern("/posts/\\d+"), PatternKind::Regex);
/// ```
pub fn classify_pattern(pattern: &str) -> PatternKind {
    if pattern.contains('(') || pattern.contains('\\') {
        PatternKind::Regex
    } else {
        PatternKind::Template
    }
}

/// A captured parameter value
///
/// Catch-all parameters capture a list of segments; everything else captures
/// a single string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Single(String),
    Multi(Vec<String>),
}

impl ParamValue {
    /// Single values as-is, segment lists joined by `/`
    pub fn to_path_string(&self) -> String {
        match self {
            ParamValue::Single(value) => value.clone(),
            ParamValue::Multi(segments) => segments.join("/"),
        }
    }

    pub fn as_single(&self) -> Option<&str> {
        match self {
            ParamValue::Single(value) => Some(value),
            ParamValue::Multi(_) => None,
        }
    }

    pub fn as_multi(&self) -> Option<&[String]> {
        match self {
            ParamValue::Single(_) => None,
            ParamValue::Multi(segments) => Some(segments),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_path_string())
    }
}

/// Parameters captured by a match
pub type Params = HashMap<String, ParamValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    Single,
    Optional,
    CatchAll,
    OptionalCatchAll,
}

#[derive(Debug, Clone)]
enum Engine {
    Template(regex::Regex),
    Regex(fancy_regex::Regex),
    Exact,
}

/// A compiled pattern, ready to test many pathnames
///
/// # Examples
///
/// ```
/// use vinext_router::pattern::{CompiledPattern, ParamValue};
///
/// let pattern = CompiledPattern::compile("/docs/:slug+");
/// assert!(!pattern.is_match("/docs"));
///
/// let params = pattern.captures("/docs/a/b").unwrap();
/// assert_eq!(
///     params.get("slug"),
///     Some(&ParamValue::Multi(vec!["a".into(), "b".into()]))
/// );
/// ```
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    source: String,
    kind: PatternKind,
    engine: Engine,
    names: Vec<String>,
    captures: Vec<Capture>,
}

impl CompiledPattern {
    pub fn compile(source: &str) -> Self {
        match classify_pattern(source) {
            PatternKind::Template => Self::compile_template(source),
            PatternKind::Regex => Self::compile_regex(source),
        }
    }

    fn compile_template(source: &str) -> Self {
        let tokens = tokenize_template(source);
        let compiled = check_regex_safety(&tokens.regex)
            .map_err(|reason| reason.to_string())
            .and_then(|()| regex::Regex::new(&tokens.regex).map_err(|e| e.to_string()));

        let engine = match compiled {
            Ok(regex) => Engine::Template(regex),
            Err(reason) => {
                warn!(pattern = source, %reason, "path template did not compile; falling back to exact match");
                Engine::Exact
            }
        };

        Self {
            source: source.to_string(),
            kind: PatternKind::Template,
            engine,
            names: tokens.names,
            captures: tokens.captures,
        }
    }

    fn compile_regex(source: &str) -> Self {
        let groups = translate_regex(source);
        let anchored = format!("^(?:{})$", groups.regex);

        let engine = match compile_safe_regex(&anchored, "") {
            Ok(regex) => Engine::Regex(regex),
            Err(reason) => {
                warn!(pattern = source, %reason, "regex pattern rejected; falling back to exact match");
                Engine::Exact
            }
        };

        let captures = vec![Capture::Single; groups.names.len()];
        Self {
            source: source.to_string(),
            kind: PatternKind::Regex,
            engine,
            names: groups.names,
            captures,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    /// Parameter names in capture order
    pub fn param_names(&self) -> &[String] {
        &self.names
    }

    /// True if the pattern degraded to exact string comparison
    pub fn is_exact_fallback(&self) -> bool {
        matches!(self.engine, Engine::Exact)
    }

    pub fn is_match(&self, pathname: &str) -> bool {
        match &self.engine {
            Engine::Template(regex) => regex.is_match(pathname),
            Engine::Regex(regex) => regex.is_match(pathname).unwrap_or_else(|e| {
                warn!(pattern = %self.source, error = %e, "regex match aborted");
                false
            }),
            Engine::Exact => pathname == self.source,
        }
    }

    /// Tests a pathname and extracts its parameters
    pub fn captures(&self, pathname: &str) -> Option<Params> {
        let values: Vec<Option<String>> = match &self.engine {
            Engine::Template(regex) => {
                let caps = regex.captures(pathname)?;
                (1..=self.names.len())
                    .map(|i| caps.get(i).map(|m| m.as_str().to_string()))
                    .collect()
            }
            Engine::Regex(regex) => {
                let caps = match regex.captures(pathname) {
                    Ok(caps) => caps?,
                    Err(e) => {
                        warn!(pattern = %self.source, error = %e, "regex match aborted");
                        return None;
                    }
                };
                (1..=self.names.len())
                    .map(|i| caps.get(i).map(|m| m.as_str().to_string()))
                    .collect()
            }
            Engine::Exact => {
                return (pathname == self.source).then(Params::new);
            }
        };

        let mut params = Params::new();
        for ((name, capture), value) in self.names.iter().zip(&self.captures).zip(values) {
            match (capture, value) {
                (Capture::CatchAll | Capture::OptionalCatchAll, Some(value)) => {
                    let segments = value
                        .split('/')
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect();
                    params.insert(name.clone(), ParamValue::Multi(segments));
                }
                (Capture::OptionalCatchAll, None) => {
                    params.insert(name.clone(), ParamValue::Multi(Vec::new()));
                }
                (_, Some(value)) => {
                    params.insert(name.clone(), ParamValue::Single(value));
                }
                (Capture::Single | Capture::Optional | Capture::CatchAll, None) => {}
            }
        }
        Some(params)
    }
}

/// Tests a pathname against a pattern source
///
/// ```
/// use vinext_router::pattern::match_pattern;
///
/// assert!(match_pattern("/posts/42", "/posts/:id"));
/// assert!(match_pattern("/optional", "/optional/:path*"));
/// assert!(!match_pattern("/api/users", "/((?!api).*)"));
/// ```
pub fn match_pattern(pathname: &str, pattern: &str) -> bool {
    CompiledPattern::compile(pattern).is_match(pathname)
}

/// Tests a pathname against a pattern source, extracting parameters
pub fn match_pattern_params(pathname: &str, pattern: &str) -> Option<Params> {
    CompiledPattern::compile(pattern).captures(pathname)
}

struct Tokens {
    regex: String,
    names: Vec<String>,
    captures: Vec<Capture>,
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Reads a parameter name starting at `start`; returns the end index.
fn read_name(chars: &[char], start: usize) -> usize {
    let mut end = start;
    while end < chars.len() && is_name_char(chars[end]) {
        end += 1;
    }
    end
}

/// Single left-to-right pass; no output is ever re-scanned.
fn tokenize_template(source: &str) -> Tokens {
    let chars: Vec<char> = source.chars().collect();
    let mut regex = String::from("^");
    let mut names = Vec::new();
    let mut captures = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '/' && chars.get(i + 1) == Some(&':') {
            let end = read_name(&chars, i + 2);
            if end > i + 2 {
                names.push(chars[i + 2..end].iter().collect());
                match chars.get(end) {
                    Some('*') => {
                        regex.push_str("(?:/(.*))?");
                        captures.push(Capture::OptionalCatchAll);
                        i = end + 1;
                    }
                    Some('+') => {
                        regex.push_str("(?:/(.+))");
                        captures.push(Capture::CatchAll);
                        i = end + 1;
                    }
                    Some('?') => {
                        regex.push_str("(?:/([^/]+))?");
                        captures.push(Capture::Optional);
                        i = end + 1;
                    }
                    _ => {
                        regex.push_str("/([^/]+)");
                        captures.push(Capture::Single);
                        i = end;
                    }
                }
                continue;
            }
        }

        if c == ':' {
            let end = read_name(&chars, i + 1);
            if end > i + 1 {
                names.push(chars[i + 1..end].iter().collect());
                regex.push_str("([^/]+)");
                captures.push(Capture::Single);
                i = end;
                continue;
            }
        }

        if c == '.' {
            regex.push_str("\\.");
        } else {
            regex.push(c);
        }
        i += 1;
    }

    regex.push('$');
    Tokens {
        regex,
        names,
        captures,
    }
}

struct Groups {
    regex: String,
    names: Vec<String>,
}

/// Names every capturing group in a regex-form source, in order
///
/// `:name(` becomes a plain capturing group recorded as `name`, named groups
/// keep their names, and unnamed capturing groups are numbered `0`, `1`, …
/// Escapes and character classes are copied through untouched.
fn translate_regex(source: &str) -> Groups {
    let chars: Vec<char> = source.chars().collect();
    let mut regex = String::with_capacity(source.len());
    let mut names = Vec::new();
    let mut unnamed = 0usize;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\\' => {
                regex.push(c);
                if let Some(next) = chars.get(i + 1) {
                    regex.push(*next);
                }
                i += 2;
                continue;
            }
            '[' => {
                let start = i;
                i += 1;
                while i < chars.len() && chars[i] != ']' {
                    if chars[i] == '\\' {
                        i += 1;
                    }
                    i += 1;
                }
                let end = (i + 1).min(chars.len());
                regex.extend(&chars[start..end]);
                i = end;
                continue;
            }
            ':' if i == 0 || chars[i - 1] != '?' => {
                let end = read_name(&chars, i + 1);
                if end > i + 1 && chars.get(end) == Some(&'(') {
                    names.push(chars[i + 1..end].iter().collect());
                    regex.push('(');
                    i = end + 1;
                    continue;
                }
            }
            '(' => {
                if chars.get(i + 1) == Some(&'?') {
                    if let Some(name) = named_group(&chars, i) {
                        names.push(name);
                    }
                } else {
                    names.push(unnamed.to_string());
                    unnamed += 1;
                }
            }
            _ => {}
        }
        regex.push(c);
        i += 1;
    }

    Groups { regex, names }
}

/// Name of a `(?<name>` or `(?P<name>` group opening at `open`.
fn named_group(chars: &[char], open: usize) -> Option<String> {
    let mut start = open + 2;
    if chars.get(start) == Some(&'P') {
        start += 1;
    }
    if chars.get(start) != Some(&'<') {
        return None;
    }
    // `(?<=` and `(?<!` are lookbehinds, not captures.
    if matches!(chars.get(start + 1), Some('=') | Some('!')) {
        return None;
    }
    let end = chars[start + 1..].iter().position(|c| *c == '>')? + start + 1;
    Some(chars[start + 1..end].iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn single(value: &str) -> ParamValue {
        ParamValue::Single(value.to_string())
    }

    fn multi(values: &[&str]) -> ParamValue {
        ParamValue::Multi(values.iter().map(|v| v.to_string()).collect())
    }

    #[test]
    fn test_template_tokens() {
        assert_eq!(tokenize_template("/posts/:id").regex, "^/posts/([^/]+)$");
        assert_eq!(tokenize_template("/docs/:slug+").regex, "^/docs(?:/(.+))$");
        assert_eq!(tokenize_template("/shop/:path*").regex, "^/shop(?:/(.*))?$");
        assert_eq!(tokenize_template("/feed.xml").regex, "^/feed\\.xml$");
    }

    #[test]
    fn test_single_segment_param() {
        let params = match_pattern_params("/posts/42", "/posts/:id").unwrap();
        assert_eq!(params.get("id"), Some(&single("42")));
        assert!(!match_pattern("/posts/42/comments", "/posts/:id"));
    }

    #[test]
    fn test_required_catch_all() {
        assert!(!match_pattern("/docs", "/docs/:slug+"));
        let params = match_pattern_params("/docs/a/b", "/docs/:slug+").unwrap();
        assert_eq!(params.get("slug"), Some(&multi(&["a", "b"])));
    }

    #[test]
    fn test_optional_catch_all() {
        let params = match_pattern_params("/optional", "/optional/:path*").unwrap();
        assert_eq!(params.get("path"), Some(&multi(&[])));

        let params = match_pattern_params("/optional/x/y", "/optional/:path*").unwrap();
        assert_eq!(params.get("path"), Some(&multi(&["x", "y"])));
    }

    #[test]
    fn test_hyphenated_names() {
        let pattern = CompiledPattern::compile("/:team-slug/settings/:setting-id");
        assert_eq!(pattern.param_names(), ["team-slug", "setting-id"]);
        let params = pattern.captures("/acme/settings/billing").unwrap();
        assert_eq!(params.get("team-slug"), Some(&single("acme")));
        assert_eq!(params.get("setting-id"), Some(&single("billing")));
    }

    #[test]
    fn test_optional_single_param() {
        let pattern = CompiledPattern::compile("/posts/:id?");
        assert!(pattern.is_match("/posts"));
        assert!(pattern.is_match("/posts/1"));
        assert!(pattern.captures("/posts").unwrap().is_empty());
    }

    #[test]
    fn test_regex_is_not_tokenized() {
        let pattern = CompiledPattern::compile("/((?!api|_next).*)");
        assert_eq!(pattern.kind(), PatternKind::Regex);
        assert!(pattern.is_match("/dashboard/settings"));
        assert!(!pattern.is_match("/api/hello"));
        assert!(!pattern.is_match("/_next/static/a.js"));
    }

    #[test]
    fn test_regex_named_shorthand_and_numbered_groups() {
        let pattern = CompiledPattern::compile("/blog/:year(\\d{4})/(.*)");
        assert_eq!(pattern.param_names(), ["year", "0"]);
        let params = pattern.captures("/blog/2024/hello/world").unwrap();
        assert_eq!(params.get("year"), Some(&single("2024")));
        assert_eq!(params.get("0"), Some(&single("hello/world")));
        assert!(pattern.captures("/blog/24/x").is_none());
    }

    #[test]
    fn test_regex_non_capturing_groups_are_not_named() {
        let pattern = CompiledPattern::compile("/(?:a|b)/(?<rest>.*)");
        assert_eq!(pattern.param_names(), ["rest"]);
        assert!(pattern.is_match("/a/anything"));
    }

    #[test]
    fn test_unsafe_regex_falls_back_to_exact() {
        let pattern = CompiledPattern::compile("/(a+)+");
        assert!(pattern.is_exact_fallback());
        assert!(!pattern.is_match("/aaaa"));
        assert!(pattern.is_match("/(a+)+"));
    }

    #[rstest]
    #[case("/about", "/about", true)]
    #[case("/about", "/about/team", false)]
    #[case("/:locale/about", "/en/about", true)]
    #[case("/dashboard/:path*", "/dashboard", true)]
    #[case("/dashboard/:path*", "/dashboard/a/b/c", true)]
    #[case("/dashboard/:path*", "/dashboards", false)]
    #[case("/api/:path+", "/api", false)]
    #[case("/files/:name.json", "/files/data.json", true)]
    #[case("/files/:name.json", "/files/dataxjson", false)]
    fn test_match_table(#[case] pattern: &str, #[case] path: &str, #[case] expected: bool) {
        assert_eq!(match_pattern(path, pattern), expected, "{pattern} vs {path}");
    }
}
