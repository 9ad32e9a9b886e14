/// Pathname canonicalization
///
/// Every matcher in the pipeline (middleware matcher, config rules, route
/// tables) sees the output of [`normalize_pathname`], so an encoded or
/// slash-padded variant of a path can never reach the router in a shape the
/// middleware matcher did not see.
use std::borrow::Cow;

pub mod decode;
pub use decode::{decode_pathname, DecodeError};

/// Checks if a pathname is already canonical
///
/// # Rules
///
/// - Must start with a single `/`
/// - Must not contain `//`, `/./` or `/../`
/// - Must not end with `/.` or `/..`
///
/// A trailing slash is allowed; normalization never adds or removes one.
///
/// # Examples
///
/// ```
/// use vinext_router::path::is_canonical;
///
/// assert!(is_canonical("/"));
/// assert!(is_canonical("/about"));
/// assert!(is_canonical("/about/"));
///
/// assert!(!is_canonical(""));
/// assert!(!is_canonical("about"));
/// assert!(!is_canonical("/about//page"));
/// assert!(!is_canonical("/a/./b"));
/// assert!(!is_canonical("/a/.."));
/// ```
pub fn is_canonical(path: &str) -> bool {
    if path == "/" {
        return true;
    }

    path.starts_with('/')
        && !path.contains("//")
        && !path.contains("/./")
        && !path.contains("/../")
        && !path.ends_with("/.")
        && !path.ends_with("/..")
}

/// Normalize a decoded pathname to canonical form
///
/// Returns `Cow::Borrowed` when the input is already canonical.
///
/// - Empty segments collapse: `/a//b` → `/a/b`
/// - `.` segments drop: `/a/./b` → `/a/b`
/// - `..` pops the previous segment and never climbs above root:
///   `/../../admin` → `/admin`
/// - A trailing slash survives, and a trailing `.`/`..` resolves to a
///   directory (`/a/b/..` → `/a/`), so the slow path agrees with the fast path
///   on every input.
///
/// Percent-encoding, case and trailing-slash policy are left alone.
///
/// # Examples
///
/// ```
/// use vinext_router::path::normalize_pathname;
/// use std::borrow::Cow;
///
/// assert!(matches!(normalize_pathname("/about"), Cow::Borrowed("/about")));
/// assert_eq!(normalize_pathname("/dashboard//settings"), "/dashboard/settings");
/// assert_eq!(normalize_pathname("/a/b/../c"), "/a/c");
/// assert_eq!(normalize_pathname("/../admin"), "/admin");
/// ```
pub fn normalize_pathname(path: &str) -> Cow<'_, str> {
    if is_canonical(path) {
        return Cow::Borrowed(path);
    }

    let mut resolved: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                resolved.pop();
            }
            other => resolved.push(other),
        }
    }

    if resolved.is_empty() {
        return Cow::Borrowed("/");
    }

    let directory = path.ends_with('/') || path.ends_with("/.") || path.ends_with("/..");
    let mut normalized = String::with_capacity(path.len());
    for segment in &resolved {
        normalized.push('/');
        normalized.push_str(segment);
    }
    if directory {
        normalized.push('/');
    }

    Cow::Owned(normalized)
}

/// Strips the query string (and fragment) from a request path
pub fn strip_query(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    &path[..end]
}

/// Strips one trailing slash, keeping the root path intact
///
/// ```
/// use vinext_router::path::strip_trailing_slash;
///
/// assert_eq!(strip_trailing_slash("/about/"), "/about");
/// assert_eq!(strip_trailing_slash("/"), "/");
/// ```
pub fn strip_trailing_slash(path: &str) -> &str {
    if path.len() > 1 {
        path.strip_suffix('/').unwrap_or(path)
    } else {
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_canonical() {
        assert!(is_canonical("/"));
        assert!(is_canonical("/users/123"));
        assert!(is_canonical("/blog/posts/hello-world/"));
        assert!(is_canonical("/a/.hidden"));
        assert!(is_canonical("/a/..b"));

        assert!(!is_canonical(""));
        assert!(!is_canonical("about"));
        assert!(!is_canonical("//evil.com"));
        assert!(!is_canonical("/a/../b"));
        assert!(!is_canonical("/a/."));
    }

    #[test]
    fn test_normalize_canonical_is_borrowed() {
        assert!(matches!(normalize_pathname("/about"), Cow::Borrowed("/about")));
        assert!(matches!(normalize_pathname("/"), Cow::Borrowed("/")));
        assert!(matches!(normalize_pathname("/about/"), Cow::Borrowed("/about/")));
    }

    #[test]
    fn test_normalize_double_slash() {
        assert_eq!(normalize_pathname("/about//page"), "/about/page");
        assert_eq!(normalize_pathname("/path///to////page"), "/path/to/page");
        assert_eq!(normalize_pathname("//"), "/");
    }

    #[test]
    fn test_normalize_dot_segments() {
        assert_eq!(normalize_pathname("/a/./b"), "/a/b");
        assert_eq!(normalize_pathname("/a/b/../c"), "/a/c");
        assert_eq!(normalize_pathname("/a/b/.."), "/a/");
        assert_eq!(normalize_pathname("/a/."), "/a/");
    }

    #[test]
    fn test_normalize_never_underflows_root() {
        assert_eq!(normalize_pathname("/../admin"), "/admin");
        assert_eq!(normalize_pathname("/../../../admin"), "/admin");
        assert_eq!(normalize_pathname("/.."), "/");
    }

    #[test]
    fn test_normalize_adds_leading_slash() {
        assert_eq!(normalize_pathname("about"), "/about");
        assert_eq!(normalize_pathname(""), "/");
    }

    #[test]
    fn test_normalize_keeps_trailing_slash_on_slow_path() {
        // Fast path keeps `/a/b/`, so the slow path must agree.
        assert_eq!(normalize_pathname("/a//b/"), "/a/b/");
        assert_eq!(normalize_pathname("/a/b/"), "/a/b/");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = [
            "/a//b/./c/../d",
            "/../x/",
            "//",
            "/a/b/..",
            "relative/./path",
            "/dashboard//settings",
        ];
        for input in inputs {
            let once = normalize_pathname(input).into_owned();
            let twice = normalize_pathname(&once).into_owned();
            assert_eq!(once, twice, "not idempotent for {input}");
            assert!(is_canonical(&once), "{once} is not canonical");
        }
    }

    #[test]
    fn test_strip_query() {
        assert_eq!(strip_query("/a?b=c"), "/a");
        assert_eq!(strip_query("/a#frag"), "/a");
        assert_eq!(strip_query("/a"), "/a");
    }
}
