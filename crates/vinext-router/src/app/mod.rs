//! App Router route table
//!
//! ```text
//! app/layout.tsx                          → layout for every route
//! app/(marketing)/about/page.tsx          → /about
//! app/blog/[slug]/page.tsx                → /blog/:slug
//! app/api/users/route.ts                  → /api/users (route handler)
//! app/dashboard/@team/page.tsx            → slot `team` of /dashboard
//! app/feed/(..)photo/[id]/page.tsx        → intercepts /photo/:id
//! app/_components/Nav.tsx                 → private, not routed
//! app/%5Fsites/[subdomain]/page.tsx       → /_sites/:subdomain
//! ```

use std::path::{Path, PathBuf};

mod builder;
pub mod intercept;
pub mod tree;

pub use builder::{build_app_routes, scan_app_routes};
pub use intercept::InterceptConvention;
pub use tree::{AppNode, SpecialFiles};

use crate::pattern::Params;
use crate::route::{match_route, RouteMatch, Routable};

/// An App Router route with everything inherited from its ancestors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppRoute {
    pub pattern: String,
    pub params: Vec<String>,
    pub is_dynamic: bool,
    /// `page.*`; `None` for route handlers and slot-only routes
    pub page_path: Option<PathBuf>,
    /// `route.*` handler
    pub route_path: Option<PathBuf>,
    /// Root to leaf
    pub layouts: Vec<PathBuf>,
    /// URL depth of each entry in `layouts`
    pub layout_segment_depths: Vec<usize>,
    /// Root to leaf
    pub templates: Vec<PathBuf>,
    pub parallel_slots: Vec<ParallelSlot>,
    /// Intercepts declared in the children position of an ancestor
    pub intercepting_routes: Vec<InterceptingRoute>,
    pub loading_path: Option<PathBuf>,
    pub error_path: Option<PathBuf>,
    pub not_found_path: Option<PathBuf>,
    pub forbidden_path: Option<PathBuf>,
    pub unauthorized_path: Option<PathBuf>,
}

impl AppRoute {
    /// Reachable only through a parallel slot
    pub fn is_slot_only(&self) -> bool {
        self.page_path.is_none() && self.route_path.is_none()
    }

    pub fn slot(&self, name: &str) -> Option<&ParallelSlot> {
        self.parallel_slots.iter().find(|slot| slot.name == name)
    }
}

impl Routable for AppRoute {
    fn pattern(&self) -> &str {
        &self.pattern
    }

    fn source_path(&self) -> &Path {
        self.page_path
            .as_deref()
            .or(self.route_path.as_deref())
            .unwrap_or_else(|| Path::new(&self.pattern))
    }
}

/// A `@name` slot as seen from one route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParallelSlot {
    pub name: String,
    pub page_path: Option<PathBuf>,
    pub default_path: Option<PathBuf>,
    pub layout_path: Option<PathBuf>,
    pub intercepting_routes: Vec<InterceptingRoute>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptingRoute {
    pub convention: InterceptConvention,
    pub target_pattern: String,
    pub params: Vec<String>,
    pub page_path: PathBuf,
}

impl Routable for InterceptingRoute {
    fn pattern(&self) -> &str {
        &self.target_pattern
    }

    fn source_path(&self) -> &Path {
        &self.page_path
    }
}

/// An intercept that applies to a client-side navigation
#[derive(Debug, Clone, PartialEq)]
pub struct InterceptMatch<'r> {
    /// Slot holding the intercept, `None` for the children position
    pub slot: Option<&'r str>,
    pub intercept: &'r InterceptingRoute,
    pub params: Params,
}

/// Sorted App Router table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppRouteTable {
    pub routes: Vec<AppRoute>,
    pub global_error_path: Option<PathBuf>,
}

impl AppRouteTable {
    pub fn match_route(&self, pathname: &str) -> Option<RouteMatch<'_, AppRoute>> {
        match_route(pathname, &self.routes)
    }

    pub fn get(&self, pattern: &str) -> Option<&AppRoute> {
        self.routes.iter().find(|route| route.pattern == pattern)
    }
}

/// Resolves the intercept, if any, for navigating from `from` to `target`
///
/// Slot intercepts are consulted before children-position intercepts, each
/// list in route order.
pub fn find_intercept<'r>(from: &'r AppRoute, target: &str) -> Option<InterceptMatch<'r>> {
    from.parallel_slots
        .iter()
        .find_map(|slot| {
            match_route(target, &slot.intercepting_routes).map(|m| InterceptMatch {
                slot: Some(slot.name.as_str()),
                intercept: m.route,
                params: m.params,
            })
        })
        .or_else(|| {
            match_route(target, &from.intercepting_routes).map(|m| InterceptMatch {
                slot: None,
                intercept: m.route,
                params: m.params,
            })
        })
}
