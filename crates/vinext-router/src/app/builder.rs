use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::tree::AppNode;
use super::{AppRoute, AppRouteTable, InterceptConvention, InterceptingRoute, ParallelSlot};
use crate::error::RouterError;
use crate::route::segment::{join_pattern, pattern_params, Segment};
use crate::route::{sort_routes, validate::validate_routes, Routable};
use crate::scan::list_files;

/// Scans an `app/` directory and builds its route table
pub fn scan_app_routes(root: &Path, extensions: &[String]) -> Result<AppRouteTable, RouterError> {
    let files = list_files(root)?;
    build_app_routes(root, &files, extensions)
}

/// Builds the route table from `/`-separated paths relative to `root`
pub fn build_app_routes<S: AsRef<str>>(
    root: &Path,
    files: &[S],
    extensions: &[String],
) -> Result<AppRouteTable, RouterError> {
    let tree = AppNode::build(root, files, extensions);

    let mut builder = Builder::default();
    builder.walk(&tree, &Inherited::default())?;
    builder.add_pending_slot_routes()?;

    let mut routes: Vec<AppRoute> = builder.routes;
    sort_routes(&mut routes);
    validate_routes(&routes)?;

    Ok(AppRouteTable {
        routes,
        global_error_path: tree.files.global_error.clone(),
    })
}

/// State passed from a directory to its children
#[derive(Debug, Clone, Default)]
struct Inherited<'t> {
    url: Vec<String>,
    layouts: Vec<PathBuf>,
    layout_depths: Vec<usize>,
    templates: Vec<PathBuf>,
    loading: Option<PathBuf>,
    error: Option<PathBuf>,
    not_found: Option<PathBuf>,
    slots: Vec<SlotScope<'t>>,
    intercepts: Vec<InterceptingRoute>,
}

/// A slot directory and the URL depth it was declared at
#[derive(Debug, Clone)]
struct SlotScope<'t> {
    name: String,
    root: &'t AppNode,
    base_depth: usize,
    intercepts: Vec<InterceptingRoute>,
}

/// What a slot renders for one URL
#[derive(Debug, Clone, Default)]
struct SlotLookup {
    page: Option<PathBuf>,
    default: Option<PathBuf>,
    layout: Option<PathBuf>,
}

#[derive(Default)]
struct Builder<'t> {
    routes: Vec<AppRoute>,
    by_pattern: HashMap<String, usize>,
    /// Slot URLs that may have no directory in the children tree
    pending: Vec<Inherited<'t>>,
}

impl<'t> Builder<'t> {
    fn walk(&mut self, node: &'t AppNode, parent: &Inherited<'t>) -> Result<(), RouterError> {
        let mut ctx = parent.clone();
        if let Some(part) = node.segment.url_part() {
            ctx.url.push(part);
        }

        let files = &node.files;
        if let Some(layout) = &files.layout {
            ctx.layouts.push(layout.clone());
            ctx.layout_depths.push(ctx.url.len());
        }
        if let Some(template) = &files.template {
            ctx.templates.push(template.clone());
        }
        if files.loading.is_some() {
            ctx.loading.clone_from(&files.loading);
        }
        if files.error.is_some() {
            ctx.error.clone_from(&files.error);
        }
        if files.not_found.is_some() {
            ctx.not_found.clone_from(&files.not_found);
        }

        for child in node.children.values() {
            match &child.segment {
                Segment::Slot(name) => {
                    let mut intercepts = Vec::new();
                    collect_slot_intercepts(child, &ctx.url, &mut intercepts);
                    sort_routes(&mut intercepts);

                    ctx.slots.retain(|scope| scope.name != *name);
                    ctx.slots.push(SlotScope {
                        name: name.clone(),
                        root: child,
                        base_depth: ctx.url.len(),
                        intercepts,
                    });
                }
                Segment::Intercept(convention, inner) => {
                    collect_intercepts(child, *convention, inner, &ctx.url, &mut ctx.intercepts);
                    sort_routes(&mut ctx.intercepts);
                }
                _ => {}
            }
        }

        self.queue_slot_urls(node, &ctx);

        match (&files.page, &files.route) {
            (Some(_), Some(_)) => {
                return Err(RouterError::PageRouteConflict {
                    dir: node.dir.clone(),
                });
            }
            (None, None) => {
                if ctx.slots.iter().any(|scope| lookup_slot(scope, &ctx.url).page.is_some()) {
                    self.insert(route_at(&ctx, None))?;
                }
            }
            _ => self.insert(route_at(&ctx, Some(node)))?,
        }

        for child in node.route_children() {
            self.walk(child, &ctx)?;
        }
        Ok(())
    }

    /// Records the URLs of every page inside slots declared at `node`.
    fn queue_slot_urls(&mut self, node: &'t AppNode, ctx: &Inherited<'t>) {
        for child in node.children.values() {
            if !matches!(child.segment, Segment::Slot(_)) {
                continue;
            }
            let mut urls = Vec::new();
            collect_page_urls(child, &mut Vec::new(), &mut urls);
            for relative in urls {
                let mut pending = ctx.clone();
                pending.url.extend(relative);
                self.pending.push(pending);
            }
        }
    }

    fn add_pending_slot_routes(&mut self) -> Result<(), RouterError> {
        for ctx in std::mem::take(&mut self.pending) {
            let pattern = join_pattern(&ctx.url);
            if !self.by_pattern.contains_key(&pattern) {
                self.insert(route_at(&ctx, None))?;
            }
        }
        Ok(())
    }

    /// Adds a route, letting a real route replace a slot-only one
    fn insert(&mut self, route: AppRoute) -> Result<(), RouterError> {
        let Some(&index) = self.by_pattern.get(&route.pattern) else {
            debug!(pattern = %route.pattern, slot_only = route.is_slot_only(), "app route");
            self.by_pattern.insert(route.pattern.clone(), self.routes.len());
            self.routes.push(route);
            return Ok(());
        };

        let existing = &mut self.routes[index];
        if route.is_slot_only() {
            return Ok(());
        }
        if existing.is_slot_only() {
            *existing = route;
            return Ok(());
        }

        Err(RouterError::Conflict {
            pattern: route.pattern.clone(),
            first: existing.source_path().to_path_buf(),
            second: route.source_path().to_path_buf(),
        })
    }
}

fn route_at(ctx: &Inherited<'_>, node: Option<&AppNode>) -> AppRoute {
    let pattern = join_pattern(&ctx.url);
    let files = node.map(|node| &node.files);

    AppRoute {
        params: pattern_params(&pattern),
        is_dynamic: pattern.contains(':'),
        page_path: files.and_then(|f| f.page.clone()),
        route_path: files.and_then(|f| f.route.clone()),
        layouts: ctx.layouts.clone(),
        layout_segment_depths: ctx.layout_depths.clone(),
        templates: ctx.templates.clone(),
        parallel_slots: ctx
            .slots
            .iter()
            .map(|scope| {
                let found = lookup_slot(scope, &ctx.url);
                ParallelSlot {
                    name: scope.name.clone(),
                    page_path: found.page,
                    default_path: found.default,
                    layout_path: found.layout,
                    intercepting_routes: scope.intercepts.clone(),
                }
            })
            .collect(),
        intercepting_routes: ctx.intercepts.clone(),
        loading_path: ctx.loading.clone(),
        error_path: ctx.error.clone(),
        not_found_path: ctx.not_found.clone(),
        forbidden_path: files.and_then(|f| f.forbidden.clone()),
        unauthorized_path: files.and_then(|f| f.unauthorized.clone()),
        pattern,
    }
}

/// Resolves a slot against a route URL
fn lookup_slot(scope: &SlotScope<'_>, url: &[String]) -> SlotLookup {
    let relative = &url[scope.base_depth.min(url.len())..];
    descend_slot(scope.root, relative, SlotLookup::default())
}

/// Walks a slot subtree along `remaining`, keeping the nearest `default` and
/// `layout` seen on the way down.
fn descend_slot(node: &AppNode, remaining: &[String], mut found: SlotLookup) -> SlotLookup {
    if node.files.default.is_some() {
        found.default.clone_from(&node.files.default);
    }
    if node.files.layout.is_some() {
        found.layout.clone_from(&node.files.layout);
    }
    if remaining.is_empty() && node.files.page.is_some() {
        found.page.clone_from(&node.files.page);
        return found;
    }

    let mut fallback = None;
    for (child, rest) in slot_candidates(node, remaining) {
        let result = descend_slot(child, rest, found.clone());
        if result.page.is_some() {
            return result;
        }
        fallback.get_or_insert(result);
    }
    fallback.unwrap_or(found)
}

/// Slot children that can stand for the next URL part, best match first.
fn slot_candidates<'a, 'n>(
    node: &'n AppNode,
    remaining: &'a [String],
) -> Vec<(&'n AppNode, &'a [String])> {
    let mut exact = Vec::new();
    let mut groups = Vec::new();
    let mut dynamic = Vec::new();
    let mut catch_all = Vec::new();

    for child in node.children.values() {
        match &child.segment {
            Segment::Group(_) => groups.push((child, remaining)),
            Segment::Static(name) => {
                if remaining.first() == Some(name) {
                    exact.push((child, &remaining[1..]));
                }
            }
            Segment::Dynamic(_) => match remaining.first() {
                Some(next) if child.segment.url_part().as_ref() == Some(next) => {
                    exact.push((child, &remaining[1..]));
                }
                Some(next) if !next.ends_with(['+', '*']) => {
                    dynamic.push((child, &remaining[1..]));
                }
                _ => {}
            },
            Segment::CatchAll(_) => {
                if !remaining.is_empty() {
                    catch_all.push((child, &remaining[remaining.len()..]));
                }
            }
            Segment::OptionalCatchAll(_) => {
                catch_all.push((child, &remaining[remaining.len()..]));
            }
            Segment::Slot(_) | Segment::Intercept(..) | Segment::Private(_) => {}
        }
    }

    exact
        .into_iter()
        .chain(groups)
        .chain(dynamic)
        .chain(catch_all)
        .collect()
}

/// Relative URL parts of every page in a slot subtree
fn collect_page_urls(node: &AppNode, parts: &mut Vec<String>, out: &mut Vec<Vec<String>>) {
    if node.files.page.is_some() {
        out.push(parts.clone());
    }
    for child in node.route_children() {
        let part = child.segment.url_part();
        if let Some(part) = &part {
            parts.push(part.clone());
        }
        collect_page_urls(child, parts, out);
        if part.is_some() {
            parts.pop();
        }
    }
}

/// Intercepts anywhere inside a slot subtree
fn collect_slot_intercepts(node: &AppNode, url: &[String], out: &mut Vec<InterceptingRoute>) {
    for child in node.children.values() {
        match &child.segment {
            Segment::Intercept(convention, inner) => {
                collect_intercepts(child, *convention, inner, url, out);
            }
            segment @ (Segment::Static(_)
            | Segment::Dynamic(_)
            | Segment::CatchAll(_)
            | Segment::OptionalCatchAll(_)
            | Segment::Group(_)) => {
                let mut child_url = url.to_vec();
                child_url.extend(segment.url_part());
                collect_slot_intercepts(child, &child_url, out);
            }
            Segment::Slot(_) | Segment::Private(_) => {}
        }
    }
}

/// Intercepting routes declared by one intercept directory sitting at `url`
fn collect_intercepts(
    node: &AppNode,
    convention: InterceptConvention,
    inner: &Segment,
    url: &[String],
    out: &mut Vec<InterceptingRoute>,
) {
    let mut target: Vec<String> = convention.resolve_base(url).to_vec();
    target.extend(inner.url_part());

    let mut pages = Vec::new();
    collect_page_urls(node, &mut Vec::new(), &mut pages);
    for relative in pages {
        let Some(page_path) = page_at(node, &relative) else {
            continue;
        };
        let mut parts = target.clone();
        parts.extend(relative);
        let target_pattern = join_pattern(&parts);
        debug!(%target_pattern, convention = %convention, "intercepting route");
        out.push(InterceptingRoute {
            convention,
            params: pattern_params(&target_pattern),
            target_pattern,
            page_path,
        });
    }
}

/// Page file at a relative URL below `node`, looking through groups.
fn page_at(node: &AppNode, relative: &[String]) -> Option<PathBuf> {
    if relative.is_empty() {
        if let Some(page) = &node.files.page {
            return Some(page.clone());
        }
    }
    node.route_children().find_map(|child| match child.segment.url_part() {
        None => page_at(child, relative),
        Some(part) if relative.first() == Some(&part) => page_at(child, &relative[1..]),
        Some(_) => None,
    })
}
