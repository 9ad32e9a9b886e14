/// Integration tests for the Pages Router table and matcher
use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use rstest::rstest;
use vinext_router::{build_pages_routes, scan_pages_routes, ParamValue, PagesRouteTable};

fn extensions() -> Vec<String> {
    ["tsx", "ts", "jsx", "js"].iter().map(|e| e.to_string()).collect()
}

fn table() -> PagesRouteTable {
    let files = [
        "_app.tsx",
        "_document.tsx",
        "index.tsx",
        "about.tsx",
        "blog/index.tsx",
        "blog/[slug].tsx",
        "blog/archive.tsx",
        "docs/[...slug].tsx",
        "shop/[[...path]].tsx",
        "[team-slug]/settings.tsx",
        "api/hello.ts",
        "api/posts/[id].ts",
    ];
    build_pages_routes(Path::new("pages"), &files, &extensions()).unwrap()
}

fn single(value: &str) -> ParamValue {
    ParamValue::Single(value.to_string())
}

fn multi(values: &[&str]) -> ParamValue {
    ParamValue::Multi(values.iter().map(|v| v.to_string()).collect())
}

#[test]
fn test_table_is_sorted_static_first() {
    let table = table();
    let patterns: Vec<&str> = table.pages.iter().map(|r| r.pattern.as_str()).collect();
    assert_eq!(
        patterns,
        vec![
            "/blog/archive",
            "/about",
            "/blog",
            "/",
            "/blog/:slug",
            "/docs/:slug+",
            "/shop/:path*",
            "/:team-slug/settings",
        ]
    );
}

#[rstest]
#[case("/", "/")]
#[case("/about", "/about")]
#[case("/about/", "/about")]
#[case("/blog", "/blog")]
#[case("/blog/archive", "/blog/archive")]
#[case("/blog/hello-world", "/blog/:slug")]
#[case("/docs/a/b/c", "/docs/:slug+")]
#[case("/shop", "/shop/:path*")]
#[case("/acme/settings", "/:team-slug/settings")]
fn test_matches_expected_route(#[case] path: &str, #[case] pattern: &str) {
    let table = table();
    let m = table.match_page(path).unwrap_or_else(|| panic!("no match for {path}"));
    assert_eq!(m.route.pattern, pattern);
}

#[test]
fn test_param_shapes() {
    let table = table();

    let m = table.match_page("/blog/hello?draft=1").unwrap();
    assert_eq!(m.params.get("slug"), Some(&single("hello")));

    let m = table.match_page("/docs/getting-started/install").unwrap();
    assert_eq!(m.params.get("slug"), Some(&multi(&["getting-started", "install"])));

    let m = table.match_page("/shop").unwrap();
    assert_eq!(m.params.get("path"), Some(&multi(&[])));

    let m = table.match_page("/acme/settings").unwrap();
    assert_eq!(m.params.get("team-slug"), Some(&single("acme")));
}

#[test]
fn test_unmatched_is_none() {
    let table = table();
    assert!(table.match_page("/docs").is_none());
    assert!(table.match_page("/blog/a/b").is_none());
}

#[test]
fn test_api_table() {
    let table = table();
    assert!(table.match_page("/api/hello").is_none());

    let m = table.match_api("/api/posts/9").unwrap();
    assert_eq!(m.route.file_path, Path::new("pages/api/posts/[id].ts"));
    assert_eq!(m.params.get("id"), Some(&single("9")));
}

#[test]
fn test_scan_pages_directory() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("posts")).unwrap();
    fs::write(dir.path().join("index.tsx"), "").unwrap();
    fs::write(dir.path().join("_app.tsx"), "").unwrap();
    fs::write(dir.path().join("posts/[id].tsx"), "").unwrap();
    fs::write(dir.path().join("posts/util.module.css"), "").unwrap();

    let table = scan_pages_routes(dir.path(), &extensions()).unwrap();
    let patterns: Vec<&str> = table.pages.iter().map(|r| r.pattern.as_str()).collect();
    assert_eq!(patterns, vec!["/", "/posts/:id"]);
    assert!(table.api.is_empty());
}
