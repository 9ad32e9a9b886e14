/// Integration tests comparing vinext-router with Next.js routing behavior
///
/// Each test documents the equivalent Next.js convention for reference.
use std::path::Path;

use vinext_router::{
    build_app_routes, decode_pathname, is_safe_regex, match_pattern, match_pattern_params,
    normalize_pathname, safe_regex, ParamValue,
};

fn extensions() -> Vec<String> {
    vec!["tsx".to_string(), "ts".to_string()]
}

// ============================================================================
// File-System Routing Conventions
// ============================================================================

#[test]
fn test_nextjs_basic_and_dynamic_routing() {
    // Next.js: app/page.tsx → /
    // Next.js: app/about/page.tsx → /about
    // Next.js: app/[slug]/page.tsx → /:slug

    let table = build_app_routes(
        Path::new("app"),
        &["page.tsx", "about/page.tsx", "[slug]/page.tsx"],
        &extensions(),
    )
    .unwrap();

    assert_eq!(table.match_route("/about").unwrap().route.pattern, "/about");
    let m = table.match_route("/pricing").unwrap();
    assert_eq!(m.route.pattern, "/:slug");
    assert_eq!(m.params.get("slug"), Some(&ParamValue::Single("pricing".into())));
}

#[test]
fn test_nextjs_encoded_and_private_folders() {
    // Next.js: app/_components/ → private, never routed
    // Next.js: app/%5Fsites/[subdomain]/page.tsx → /_sites/:subdomain

    let table = build_app_routes(
        Path::new("app"),
        &[
            "_components/page.tsx",
            "%5Fsites/[subdomain]/page.tsx",
            "optional/[[...path]]/page.tsx",
        ],
        &extensions(),
    )
    .unwrap();

    let patterns: Vec<&str> = table.routes.iter().map(|r| r.pattern.as_str()).collect();
    assert_eq!(patterns, vec!["/_sites/:subdomain", "/optional/:path*"]);

    let m = table.match_route("/_sites/acme").unwrap();
    assert_eq!(m.params.get("subdomain"), Some(&ParamValue::Single("acme".into())));

    let m = table.match_route("/optional").unwrap();
    assert_eq!(m.params.get("path"), Some(&ParamValue::Multi(vec![])));
}

#[test]
fn test_nextjs_route_groups_share_layouts() {
    // Next.js: app/(shop)/layout.tsx wraps app/(shop)/cart/page.tsx, URL /cart

    let table = build_app_routes(
        Path::new("app"),
        &["(shop)/layout.tsx", "(shop)/cart/page.tsx", "(marketing)/page.tsx"],
        &extensions(),
    )
    .unwrap();

    let cart = table.get("/cart").unwrap();
    assert_eq!(cart.layouts.len(), 1);
    assert!(table.get("/").unwrap().layouts.is_empty());
}

// ============================================================================
// Middleware Matcher Patterns
// ============================================================================

#[test]
fn test_nextjs_matcher_templates() {
    // matcher: '/posts/:id'
    let params = match_pattern_params("/posts/42", "/posts/:id").unwrap();
    assert_eq!(params.get("id"), Some(&ParamValue::Single("42".into())));

    // matcher: '/docs/:slug+'
    assert!(!match_pattern("/docs", "/docs/:slug+"));
    let params = match_pattern_params("/docs/a/b", "/docs/:slug+").unwrap();
    assert_eq!(
        params.get("slug"),
        Some(&ParamValue::Multi(vec!["a".into(), "b".into()]))
    );

    // matcher: '/optional/:path*'
    let params = match_pattern_params("/optional", "/optional/:path*").unwrap();
    assert_eq!(params.get("path"), Some(&ParamValue::Multi(vec![])));
}

#[test]
fn test_nextjs_negative_lookahead_matcher() {
    // matcher: '/((?!api|_next/static|_next/image|favicon.ico).*)'
    let matcher = "/((?!api|_next/static|_next/image|favicon.ico).*)";
    assert!(match_pattern("/", matcher));
    assert!(match_pattern("/dashboard", matcher));
    assert!(!match_pattern("/api/users", matcher));
    assert!(!match_pattern("/_next/static/chunks/main.js", matcher));
    assert!(!match_pattern("/favicon.ico", matcher));
}

#[test]
fn test_safe_regex_agrees_with_native_engine() {
    for pattern in ["^/blog/\\d+$", "^/(en|fr)/about$", "^/files/[^/]+\\.pdf$"] {
        assert!(is_safe_regex(pattern));
        let ours = safe_regex(pattern, "").unwrap();
        let native = regex::Regex::new(pattern).unwrap();
        for input in ["/blog/12", "/blog/x", "/fr/about", "/de/about", "/files/a.pdf", "/files/a/b.pdf"] {
            assert_eq!(ours.is_match(input).unwrap(), native.is_match(input), "{pattern} on {input}");
        }
    }
    assert!(safe_regex("^(a+)+$", "").is_none());
}

// ============================================================================
// Path Canonicalization
// ============================================================================

#[test]
fn test_encoded_traversal_resolves_to_same_route() {
    // GET /%2e%2e/admin must reach the same route as /admin.
    let table =
        build_app_routes(Path::new("app"), &["admin/page.tsx", "[slug]/page.tsx"], &extensions())
            .unwrap();

    let decoded = decode_pathname("/%2e%2e/admin").unwrap();
    let canonical = normalize_pathname(&decoded);
    assert_eq!(canonical, "/admin");
    assert_eq!(table.match_route(&canonical).unwrap().route.pattern, "/admin");
    assert!(match_pattern(&canonical, "/admin/:path*"));
}

#[test]
fn test_normalize_is_idempotent() {
    for input in ["/a//b", "/a/./b/../c", "/../../x", "//", "/x/y/"] {
        let once = normalize_pathname(input).into_owned();
        assert_eq!(normalize_pathname(&once), once.as_str());
        assert!(!once.contains("//"));
        assert!(!once.contains("/./"));
        assert!(!once.contains("/../"));
    }
}
