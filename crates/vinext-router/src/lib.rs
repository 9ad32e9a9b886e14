//! # vinext Router
//!
//! File-system route discovery and matching for the Next.js routing
//! conventions:
//! - Static routes (`/about`)
//! - Dynamic segments (`/blog/:slug`)
//! - Catch-all (`/docs/:slug+`) and optional catch-all (`/shop/:path*`)
//! - Route groups, parallel slots and intercepting routes (App Router)
//! - Percent-encoded and hyphenated segment names
//!
//! It also carries the pattern machinery shared by middleware matchers and
//! config rules: path templates, anchored raw regexes, and a ReDoS screen in
//! front of the backtracking engine.
//!
//! ## Path Handling
//!
//! Request paths are decoded once with [`decode_pathname`] and canonicalized
//! with [`normalize_pathname`] before any matcher sees them.
//!
//! ## Example
//!
//! ```
//! use std::path::Path;
//! use vinext_router::{build_app_routes, ParamValue};
//!
//! let files = ["page.tsx", "blog/[slug]/page.tsx", "docs/[...slug]/page.tsx"];
//! let exts = vec!["tsx".to_string()];
//! let table = build_app_routes(Path::new("app"), &files, &exts).unwrap();
//!
//! let m = table.match_route("/docs/intro/setup").unwrap();
//! assert_eq!(m.route.pattern, "/docs/:slug+");
//! assert_eq!(
//!     m.params.get("slug"),
//!     Some(&ParamValue::Multi(vec!["intro".into(), "setup".into()]))
//! );
//! ```

// ============================================================================
// Module Declarations
// ============================================================================

pub mod app;
pub mod cache;
pub mod error;
pub mod pages;
pub mod path;
pub mod pattern;
pub mod route;
pub mod safe_regex;
pub mod scan;

// ============================================================================
// Re-exports
// ============================================================================

pub use app::{
    build_app_routes, find_intercept, scan_app_routes, AppRoute, AppRouteTable, InterceptConvention,
    InterceptMatch, InterceptingRoute, ParallelSlot,
};
pub use cache::RouteCache;
pub use error::RouterError;
pub use pages::{build_pages_routes, scan_pages_routes, PageRoute, PagesRouteTable};
pub use path::{decode_pathname, normalize_pathname, DecodeError};
pub use pattern::{
    classify_pattern, match_pattern, match_pattern_params, CompiledPattern, ParamValue, Params,
    PatternKind,
};
pub use route::{compare_patterns, match_route, RouteMatch, Routable};
pub use safe_regex::{is_safe_regex, safe_regex, RegexRejection};
