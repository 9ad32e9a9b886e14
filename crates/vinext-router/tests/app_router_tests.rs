/// Integration tests for the App Router table builder
use std::fs;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use vinext_router::{
    build_app_routes, find_intercept, scan_app_routes, AppRouteTable, InterceptConvention,
    InterceptingRoute, ParamValue, RouteCache, RouterError,
};

fn extensions() -> Vec<String> {
    ["tsx", "ts", "jsx", "js"].iter().map(|e| e.to_string()).collect()
}

fn build(files: &[&str]) -> AppRouteTable {
    build_app_routes(Path::new("app"), files, &extensions()).unwrap()
}

fn patterns(table: &AppRouteTable) -> Vec<&str> {
    table.routes.iter().map(|r| r.pattern.as_str()).collect()
}

fn app(path: &str) -> PathBuf {
    Path::new("app").join(path)
}

// ============================================================================
// Parallel Slots
// ============================================================================

#[test]
fn test_slot_inherited_by_child_without_own_page() {
    let table = build(&[
        "layout.tsx",
        "dashboard/layout.tsx",
        "dashboard/page.tsx",
        "dashboard/@team/page.tsx",
        "dashboard/@team/layout.tsx",
        "dashboard/@team/default.tsx",
        "dashboard/settings/page.tsx",
    ]);

    let dashboard = table.get("/dashboard").unwrap();
    let team = dashboard.slot("team").unwrap();
    assert_eq!(team.page_path, Some(app("dashboard/@team/page.tsx")));

    let settings = table.get("/dashboard/settings").unwrap();
    let team = settings.slot("team").unwrap();
    assert_eq!(team.page_path, None);
    assert_eq!(team.default_path, Some(app("dashboard/@team/default.tsx")));
    assert_eq!(team.layout_path, Some(app("dashboard/@team/layout.tsx")));
}

#[test]
fn test_slot_default_comes_from_nearest_ancestor() {
    let table = build(&[
        "shop/page.tsx",
        "shop/@side/default.tsx",
        "shop/@side/items/default.tsx",
        "shop/items/[id]/page.tsx",
    ]);

    let item = table.get("/shop/items/:id").unwrap();
    let side = item.slot("side").unwrap();
    assert_eq!(side.page_path, None);
    assert_eq!(side.default_path, Some(app("shop/@side/items/default.tsx")));
}

#[test]
fn test_slot_does_not_create_its_own_route() {
    let table = build(&["dashboard/page.tsx", "dashboard/@analytics/page.tsx"]);
    assert_eq!(patterns(&table), vec!["/dashboard"]);
    assert!(table.routes.iter().all(|r| !r.pattern.contains('@')));
}

#[test]
fn test_slot_only_url_produces_route_without_page() {
    let table = build(&[
        "dashboard/layout.tsx",
        "dashboard/page.tsx",
        "dashboard/@analytics/page.tsx",
        "dashboard/@analytics/visitors/page.tsx",
    ]);

    let visitors = table.get("/dashboard/visitors").unwrap();
    assert!(visitors.is_slot_only());
    assert_eq!(visitors.layouts, vec![app("dashboard/layout.tsx")]);
    assert_eq!(
        visitors.slot("analytics").unwrap().page_path,
        Some(app("dashboard/@analytics/visitors/page.tsx"))
    );
}

#[test]
fn test_slot_catch_all_matches_any_child_url() {
    let table = build(&[
        "page.tsx",
        "@modal/default.tsx",
        "@modal/[...catchAll]/page.tsx",
        "blog/[slug]/page.tsx",
    ]);

    let post = table.get("/blog/:slug").unwrap();
    assert_eq!(
        post.slot("modal").unwrap().page_path,
        Some(app("@modal/[...catchAll]/page.tsx"))
    );
}

// ============================================================================
// Intercepting Routes
// ============================================================================

#[test]
fn test_slot_intercept_resolves_target_above_slot() {
    let table = build(&[
        "feed/page.tsx",
        "feed/@modal/default.tsx",
        "feed/@modal/(..)photo/[id]/page.tsx",
        "photo/[id]/page.tsx",
    ]);

    assert_eq!(patterns(&table), vec!["/feed", "/photo/:id"]);

    let feed = table.get("/feed").unwrap();
    let modal = feed.slot("modal").unwrap();
    assert_eq!(
        modal.intercepting_routes,
        vec![InterceptingRoute {
            convention: InterceptConvention::OneLevelUp,
            target_pattern: "/photo/:id".to_string(),
            params: vec!["id".to_string()],
            page_path: app("feed/@modal/(..)photo/[id]/page.tsx"),
        }]
    );

    let hit = find_intercept(feed, "/photo/42").unwrap();
    assert_eq!(hit.slot, Some("modal"));
    assert_eq!(hit.params.get("id"), Some(&ParamValue::Single("42".into())));
    assert!(find_intercept(feed, "/feed").is_none());
}

#[test]
fn test_children_intercept_is_inherited_by_descendants() {
    let table = build(&[
        "photos/page.tsx",
        "photos/(.)[id]/page.tsx",
        "photos/[id]/page.tsx",
    ]);

    assert_eq!(patterns(&table), vec!["/photos", "/photos/:id"]);
    for route in &table.routes {
        assert_eq!(route.intercepting_routes.len(), 1, "{}", route.pattern);
        assert_eq!(route.intercepting_routes[0].target_pattern, "/photos/:id");
        assert_eq!(route.intercepting_routes[0].convention, InterceptConvention::SameLevel);
    }

    let photos = table.get("/photos").unwrap();
    let hit = find_intercept(photos, "/photos/7").unwrap();
    assert_eq!(hit.slot, None);
}

#[test]
fn test_intercept_levels_count_url_segments() {
    let table = build(&[
        "shop/(cart)/checkout/page.tsx",
        "shop/(cart)/checkout/(..)(..)login/page.tsx",
        "shop/(cart)/checkout/(...)help/page.tsx",
    ]);

    let checkout = table.get("/shop/checkout").unwrap();
    let targets: Vec<&str> = checkout
        .intercepting_routes
        .iter()
        .map(|i| i.target_pattern.as_str())
        .collect();
    assert_eq!(targets, vec!["/help", "/login"]);
}

// ============================================================================
// Inherited Metadata
// ============================================================================

#[test]
fn test_boundaries_inherit_and_forbidden_does_not() {
    let table = build(&[
        "error.tsx",
        "not-found.tsx",
        "admin/loading.tsx",
        "admin/forbidden.tsx",
        "admin/unauthorized.tsx",
        "admin/page.tsx",
        "admin/users/page.tsx",
        "admin/users/error.tsx",
    ]);

    let admin = table.get("/admin").unwrap();
    assert_eq!(admin.error_path, Some(app("error.tsx")));
    assert_eq!(admin.not_found_path, Some(app("not-found.tsx")));
    assert_eq!(admin.loading_path, Some(app("admin/loading.tsx")));
    assert_eq!(admin.forbidden_path, Some(app("admin/forbidden.tsx")));
    assert_eq!(admin.unauthorized_path, Some(app("admin/unauthorized.tsx")));

    let users = table.get("/admin/users").unwrap();
    assert_eq!(users.error_path, Some(app("admin/users/error.tsx")));
    assert_eq!(users.loading_path, Some(app("admin/loading.tsx")));
    assert_eq!(users.forbidden_path, None);
    assert_eq!(users.unauthorized_path, None);
}

#[test]
fn test_templates_accumulate() {
    let table = build(&["template.tsx", "blog/template.tsx", "blog/[slug]/page.tsx"]);
    let post = table.get("/blog/:slug").unwrap();
    assert_eq!(post.templates, vec![app("template.tsx"), app("blog/template.tsx")]);
}

#[test]
fn test_global_error_is_table_level() {
    let table = build(&["global-error.tsx", "page.tsx"]);
    assert_eq!(table.global_error_path, Some(app("global-error.tsx")));
}

#[test]
fn test_route_handler() {
    let table = build(&["api/users/[id]/route.ts"]);
    let route = table.get("/api/users/:id").unwrap();
    assert_eq!(route.page_path, None);
    assert_eq!(route.route_path, Some(app("api/users/[id]/route.ts")));
    assert!(route.is_dynamic);
    assert_eq!(route.params, vec!["id"]);
}

// ============================================================================
// Conflicts
// ============================================================================

#[test]
fn test_page_and_route_in_same_segment_conflict() {
    let result = build_app_routes(
        Path::new("app"),
        &["api/page.tsx", "api/route.ts"],
        &extensions(),
    );
    assert!(matches!(result, Err(RouterError::PageRouteConflict { .. })));
}

#[test]
fn test_groups_resolving_to_same_url_conflict() {
    let result = build_app_routes(
        Path::new("app"),
        &["(a)/about/page.tsx", "(b)/about/page.tsx"],
        &extensions(),
    );
    match result {
        Err(RouterError::Conflict { pattern, first, second }) => {
            assert_eq!(pattern, "/about");
            assert_eq!(first, app("(a)/about/page.tsx"));
            assert_eq!(second, app("(b)/about/page.tsx"));
        }
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[test]
fn test_different_names_at_same_position_conflict() {
    let result = build_app_routes(
        Path::new("app"),
        &["users/[id]/page.tsx", "users/[slug]/edit/page.tsx"],
        &extensions(),
    );
    assert!(matches!(result, Err(RouterError::DynamicNameMismatch { .. })));
}

// ============================================================================
// Filesystem
// ============================================================================

fn touch(root: &Path, file: &str) {
    let path = root.join(file);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, "export default function Page() {}").unwrap();
}

#[test]
fn test_scan_app_directory() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "page.tsx");
    touch(dir.path(), "blog/[slug]/page.tsx");
    touch(dir.path(), "blog/[slug]/Comments.tsx");
    touch(dir.path(), "_lib/page.tsx");

    let table = scan_app_routes(dir.path(), &extensions()).unwrap();
    assert_eq!(patterns(&table), vec!["/", "/blog/:slug"]);
    assert_eq!(
        table.get("/blog/:slug").unwrap().page_path,
        Some(dir.path().join("blog/[slug]/page.tsx"))
    );
}

#[test]
fn test_cache_picks_up_new_routes_after_invalidate() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "page.tsx");

    let root = dir.path().to_path_buf();
    let cache = RouteCache::new(move || scan_app_routes(&root, &extensions()));

    let before = cache.get().unwrap();
    assert!(before.match_route("/about").is_none());

    touch(dir.path(), "about/page.tsx");
    assert!(cache.get().unwrap().match_route("/about").is_none());

    cache.invalidate();
    assert!(cache.get().unwrap().match_route("/about").is_some());
    // The old snapshot is untouched.
    assert!(before.match_route("/about").is_none());
}
