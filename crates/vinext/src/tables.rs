use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;
use vinext_router::{
    scan_app_routes, scan_pages_routes, AppRouteTable, PagesRouteTable, RouteCache, RouterError,
};

use crate::backend::{ResolvedRoute, RouteResolution};
use crate::config::RoutingConfig;

/// App and Pages route tables behind invalidatable caches
#[derive(Debug)]
pub struct RouteTables {
    app: RouteCache<AppRouteTable>,
    pages: RouteCache<PagesRouteTable>,
    dirs: Vec<PathBuf>,
}

impl RouteTables {
    /// Tables scanned from `<root>/<app_dir>` and `<root>/<pages_dir>`
    ///
    /// A missing directory is an empty table. Scanning happens on first use.
    pub fn from_config(root: &Path, routing: &RoutingConfig) -> Self {
        let app_dir = root.join(&routing.app_dir);
        let pages_dir = root.join(&routing.pages_dir);
        let extensions = routing.page_extensions.clone();

        let app = {
            let dir = app_dir.clone();
            let extensions = extensions.clone();
            RouteCache::new(move || scan_app_routes(&dir, &extensions))
        };
        let pages = {
            let dir = pages_dir.clone();
            RouteCache::new(move || scan_pages_routes(&dir, &extensions))
        };

        Self {
            app,
            pages,
            dirs: vec![app_dir, pages_dir],
        }
    }

    /// Fixed tables, for callers that build routes themselves
    pub fn from_tables(app: AppRouteTable, pages: PagesRouteTable) -> Self {
        Self {
            app: RouteCache::new(move || Ok(app.clone())),
            pages: RouteCache::new(move || Ok(pages.clone())),
            dirs: Vec::new(),
        }
    }

    /// Directories the tables were scanned from
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    pub fn app(&self) -> Result<Arc<AppRouteTable>, RouterError> {
        self.app.get()
    }

    pub fn pages(&self) -> Result<Arc<PagesRouteTable>, RouterError> {
        self.pages.get()
    }

    /// Page or route handler for a path; the App Router wins over Pages
    pub fn match_handler(&self, pathname: &str) -> Result<Option<RouteResolution>, RouterError> {
        let app = self.app()?;
        if let Some(m) = app.match_route(pathname) {
            return Ok(Some(RouteResolution {
                route: ResolvedRoute::App(m.route.clone()),
                params: m.params,
            }));
        }

        let pages = self.pages()?;
        Ok(pages.match_page(pathname).map(|m| RouteResolution {
            route: ResolvedRoute::Pages(m.route.clone()),
            params: m.params,
        }))
    }

    /// Pages Router API route for a path
    pub fn match_api(&self, pathname: &str) -> Result<Option<RouteResolution>, RouterError> {
        let pages = self.pages()?;
        Ok(pages.match_api(pathname).map(|m| RouteResolution {
            route: ResolvedRoute::PagesApi(m.route.clone()),
            params: m.params,
        }))
    }

    pub fn invalidate(&self) {
        self.app.invalidate();
        self.pages.invalidate();
        info!("route tables invalidated");
    }
}
