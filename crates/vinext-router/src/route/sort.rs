/// Route precedence
///
/// [`compare_patterns`] is the only definition of route ordering. Both route
/// builders sort with it and the matcher relies on the resulting order, since
/// the first structural match wins.
use std::cmp::Ordering;

use super::Routable;

/// Rank of one pattern segment: lower ranks are tried first.
fn segment_rank(part: &str) -> u8 {
    match part.strip_prefix(':') {
        None => 0,
        Some(name) if name.ends_with('*') => 3,
        Some(name) if name.ends_with('+') => 2,
        Some(_) => 1,
    }
}

fn is_static(pattern: &str) -> bool {
    !pattern.contains(':')
}

/// Orders two route patterns by precedence
///
/// 1. Fully static patterns precede every dynamic pattern.
/// 2. Segment by segment, static beats `:name`, which beats `:name+`, which
///    beats `:name*`. The first differing segment decides, so a longer static
///    prefix wins: `/_sites/:subdomain` before `/optional/:path*`, `/blog/:id`
///    before `/:slug`.
/// 3. More segments first, then lexicographic for a total order.
///
/// # Examples
///
/// ```
/// use std::cmp::Ordering;
/// use vinext_router::route::sort::compare_patterns;
///
/// assert_eq!(compare_patterns("/about", "/:slug"), Ordering::Less);
/// assert_eq!(compare_patterns("/blog/:id", "/:slug"), Ordering::Less);
/// assert_eq!(compare_patterns("/docs/:slug*", "/docs/:slug+"), Ordering::Greater);
/// ```
pub fn compare_patterns(a: &str, b: &str) -> Ordering {
    match (is_static(a), is_static(b)) {
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        _ => {}
    }

    let a_parts: Vec<&str> = a.split('/').filter(|s| !s.is_empty()).collect();
    let b_parts: Vec<&str> = b.split('/').filter(|s| !s.is_empty()).collect();

    a_parts
        .iter()
        .zip(&b_parts)
        .map(|(x, y)| segment_rank(x).cmp(&segment_rank(y)))
        .find(|ordering| ordering.is_ne())
        .unwrap_or_else(|| b_parts.len().cmp(&a_parts.len()))
        .then_with(|| a.cmp(b))
}

/// Sorts routes into match order
pub fn sort_routes<R: Routable>(routes: &mut [R]) {
    routes.sort_by(|a, b| compare_patterns(a.pattern(), b.pattern()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sorted(patterns: &[&str]) -> Vec<String> {
        let mut patterns: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
        patterns.sort_by(|a, b| compare_patterns(a, b));
        patterns
    }

    #[test]
    fn test_segment_rank() {
        assert_eq!(segment_rank("about"), 0);
        assert_eq!(segment_rank(":id"), 1);
        assert_eq!(segment_rank(":slug+"), 2);
        assert_eq!(segment_rank(":path*"), 3);
    }

    #[test]
    fn test_static_before_dynamic() {
        assert_eq!(
            sorted(&["/:slug", "/about", "/blog/:id", "/", "/blog/archive"]),
            vec!["/blog/archive", "/about", "/", "/blog/:id", "/:slug"]
        );
    }

    #[test]
    fn test_static_prefix_beats_bare_dynamic() {
        assert_eq!(
            sorted(&["/optional/:path*", "/:slug", "/_sites/:subdomain"]),
            vec!["/_sites/:subdomain", "/optional/:path*", "/:slug"]
        );
    }

    #[test]
    fn test_catch_all_ordering() {
        assert_eq!(
            sorted(&["/docs/:slug*", "/docs/:slug+", "/docs/:id", "/docs/:id/edit"]),
            vec!["/docs/:id/edit", "/docs/:id", "/docs/:slug+", "/docs/:slug*"]
        );
    }

    #[test]
    fn test_order_is_total_and_stable_under_input_permutation() {
        let inputs = [
            "/",
            "/about",
            "/blog",
            "/blog/:slug",
            "/blog/:slug/comments",
            "/shop/:path*",
            "/:locale",
            "/:locale/about",
            "/api/:rest+",
            "/_sites/:subdomain",
        ];
        let forward = sorted(&inputs);
        let mut reversed_inputs = inputs;
        reversed_inputs.reverse();
        let backward = sorted(&reversed_inputs);
        assert_eq!(forward, backward);

        for window in forward.windows(2) {
            assert_eq!(
                compare_patterns(&window[0], &window[1]),
                Ordering::Less,
                "{} should sort before {}",
                window[0],
                window[1]
            );
        }
    }
}
