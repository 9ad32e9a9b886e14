//! Pages Router route table
//!
//! ```text
//! pages/index.tsx            → /
//! pages/about.tsx            → /about
//! pages/blog/[slug].tsx      → /blog/:slug
//! pages/docs/[...slug].tsx   → /docs/:slug+
//! pages/shop/[[...path]].tsx → /shop/:path*
//! pages/api/users/[id].ts    → /api/users/:id   (API table)
//! pages/_app.tsx             → (not a route)
//! ```

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::RouterError;
use crate::route::segment::{classify_segment, join_pattern, pattern_params, RouterKind};
use crate::route::{match_route, sort_routes, validate::validate_routes, RouteMatch, Routable};
use crate::scan::list_files;

/// File stems at the pages root that configure the app instead of routing.
const RESERVED_STEMS: [&str; 3] = ["_app", "_document", "_error"];

/// A Pages Router route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRoute {
    pub pattern: String,
    pub file_path: PathBuf,
    pub is_dynamic: bool,
    pub params: Vec<String>,
}

impl Routable for PageRoute {
    fn pattern(&self) -> &str {
        &self.pattern
    }

    fn source_path(&self) -> &Path {
        &self.file_path
    }
}

/// Sorted page and API route tables
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PagesRouteTable {
    pub pages: Vec<PageRoute>,
    pub api: Vec<PageRoute>,
}

impl PagesRouteTable {
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty() && self.api.is_empty()
    }

    pub fn match_page(&self, pathname: &str) -> Option<RouteMatch<'_, PageRoute>> {
        match_route(pathname, &self.pages)
    }

    pub fn match_api(&self, pathname: &str) -> Option<RouteMatch<'_, PageRoute>> {
        match_route(pathname, &self.api)
    }
}

/// Scans a `pages/` directory and builds its route tables
pub fn scan_pages_routes(root: &Path, extensions: &[String]) -> Result<PagesRouteTable, RouterError> {
    let files = list_files(root)?;
    build_pages_routes(root, &files, extensions)
}

/// Builds the route tables from `/`-separated paths relative to `root`
///
/// Files whose extension is not in `extensions` are ignored.
pub fn build_pages_routes<S: AsRef<str>>(
    root: &Path,
    files: &[S],
    extensions: &[String],
) -> Result<PagesRouteTable, RouterError> {
    let mut table = PagesRouteTable::default();

    for file in files {
        let file = file.as_ref();
        let Some(stem_path) = strip_page_extension(file, extensions) else {
            continue;
        };
        if RESERVED_STEMS.contains(&stem_path) {
            continue;
        }

        let route = page_route(root, file, stem_path);
        debug!(pattern = %route.pattern, file = %route.file_path.display(), "pages route");

        if stem_path == "api" || stem_path.starts_with("api/") {
            table.api.push(route);
        } else {
            table.pages.push(route);
        }
    }

    sort_routes(&mut table.pages);
    sort_routes(&mut table.api);
    validate_routes(&table.pages)?;
    validate_routes(&table.api)?;

    Ok(table)
}

fn strip_page_extension<'a>(file: &'a str, extensions: &[String]) -> Option<&'a str> {
    let (stem, extension) = file.rsplit_once('.')?;
    if stem.is_empty() || stem.ends_with('/') {
        return None;
    }
    extensions
        .iter()
        .any(|allowed| allowed == extension)
        .then_some(stem)
}

fn page_route(root: &Path, file: &str, stem_path: &str) -> PageRoute {
    let mut names: Vec<&str> = stem_path.split('/').collect();
    if names.last() == Some(&"index") {
        names.pop();
    }

    let segments: Vec<_> = names
        .iter()
        .map(|name| classify_segment(name, RouterKind::Pages))
        .collect();
    let parts: Vec<String> = segments.iter().filter_map(|s| s.url_part()).collect();
    let pattern = join_pattern(&parts);

    PageRoute {
        params: pattern_params(&pattern),
        is_dynamic: segments.iter().any(|s| s.is_dynamic()),
        file_path: root.join(file),
        pattern,
    }
}
