/// Route matching against a sorted table
///
/// Route tables only hold template patterns (`/blog/:slug`, `/docs/:rest+`,
/// `/shop/:path*`), so matching is a structural walk over segments rather than
/// a regex test.
use crate::path::{strip_query, strip_trailing_slash};
use crate::pattern::{ParamValue, Params};

use super::Routable;

/// A route matched against a pathname
#[derive(Debug, Clone, PartialEq)]
pub struct RouteMatch<'r, R> {
    pub route: &'r R,
    pub params: Params,
}

/// Finds the first route in table order whose pattern matches
///
/// The query string and one trailing slash (except on `/`) are ignored.
/// `None` means no route, which callers turn into a 404.
///
/// # Examples
///
/// ```
/// use vinext_router::route::matcher::match_route;
/// use vinext_router::pattern::ParamValue;
///
/// let routes = vec!["/about".to_string(), "/blog/:slug".to_string()];
/// let m = match_route("/blog/hello?ref=home", &routes).unwrap();
/// assert_eq!(m.route, "/blog/:slug");
/// assert_eq!(m.params.get("slug"), Some(&ParamValue::Single("hello".into())));
/// ```
pub fn match_route<'r, R: Routable>(pathname: &str, routes: &'r [R]) -> Option<RouteMatch<'r, R>> {
    let path = strip_trailing_slash(strip_query(pathname));
    let path_segments: Vec<&str> = split(path);

    routes.iter().find_map(|route| {
        let pattern_segments = split(route.pattern());
        match_segments(&pattern_segments, &path_segments, Params::new())
            .map(|params| RouteMatch { route, params })
    })
}

/// Matches a single template pattern against a pathname
///
/// ```
/// use vinext_router::route::matcher::match_template;
///
/// assert!(match_template("/photo/:id", "/photo/7").is_some());
/// assert!(match_template("/photo/:id", "/photo").is_none());
/// ```
pub fn match_template(pattern: &str, pathname: &str) -> Option<Params> {
    let path = strip_trailing_slash(strip_query(pathname));
    match_segments(&split(pattern), &split(path), Params::new())
}

fn split(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Tail-recursive segment walk
fn match_segments(pattern: &[&str], path: &[&str], mut params: Params) -> Option<Params> {
    let Some((head, rest)) = pattern.split_first() else {
        return path.is_empty().then_some(params);
    };

    match head.strip_prefix(':') {
        Some(name) if name.ends_with('*') => {
            // Optional catch-all swallows everything that is left, possibly nothing.
            let values = path.iter().map(|s| s.to_string()).collect();
            params.insert(name.trim_end_matches('*').to_string(), ParamValue::Multi(values));
            rest.is_empty().then_some(params)
        }
        Some(name) if name.ends_with('+') => {
            if path.is_empty() {
                return None;
            }
            let values = path.iter().map(|s| s.to_string()).collect();
            params.insert(name.trim_end_matches('+').to_string(), ParamValue::Multi(values));
            rest.is_empty().then_some(params)
        }
        Some(name) => {
            let (segment, path_rest) = path.split_first()?;
            params.insert(name.to_string(), ParamValue::Single(segment.to_string()));
            match_segments(rest, path_rest, params)
        }
        None => {
            let (segment, path_rest) = path.split_first()?;
            if segment != head {
                return None;
            }
            match_segments(rest, path_rest, params)
        }
    }
}
