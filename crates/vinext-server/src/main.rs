mod inspector;

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::response::Response;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vinext::{Config, Pipeline, PipelineError, RouteTables, RouteWatcher, StaticModuleLoader};

use crate::inspector::InspectorBackend;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load_default().unwrap_or_else(|e| {
        warn!("Failed to load config: {:#}, using defaults", e);
        Config::default()
    });
    let root = std::env::current_dir()?;
    info!(
        project = %config.project.name,
        app_dir = %config.routing.app_dir,
        pages_dir = %config.routing.pages_dir,
        "vinext starting"
    );

    let backend = Arc::new(InspectorBackend::new(config.project.name.clone()));
    // Module evaluation needs an external loader; without one a middleware
    // file is reported and skipped.
    let loader = StaticModuleLoader::new();
    let pipeline = match Pipeline::for_project(&config, &root, &loader, backend.clone()).await {
        Ok(pipeline) => pipeline,
        Err(PipelineError::ModuleLoad { file, .. }) => {
            warn!(path = %file.display(), "no module loader for middleware; running without it");
            let tables = Arc::new(RouteTables::from_config(&root, &config.routing));
            Pipeline::new(&config, tables, backend)
        }
        Err(e) => return Err(e.into()),
    };

    log_routes(pipeline.tables());

    let _watcher = if config.dev.hot_reload {
        let watch_paths: Vec<PathBuf> = config.dev.watch_paths.iter().map(|p| root.join(p)).collect();
        match RouteWatcher::watch(Arc::clone(pipeline.tables()), watch_paths) {
            Ok(watcher) => {
                let mut changes = watcher.subscribe();
                tokio::spawn(async move {
                    while let Ok(change) = changes.recv().await {
                        info!(path = %change.path.display(), kind = ?change.kind, "routes will rebuild on next request");
                    }
                });
                Some(watcher)
            }
            Err(e) => {
                warn!("Failed to create file watcher: {:#}", e);
                None
            }
        }
    } else {
        None
    };

    let app = Router::new()
        .fallback(handle)
        .with_state(Arc::new(pipeline))
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server running at http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn handle(State(pipeline): State<Arc<Pipeline>>, request: Request) -> Response {
    pipeline.handle(request).await
}

fn log_routes(tables: &RouteTables) {
    match tables.app() {
        Ok(app) => {
            for route in &app.routes {
                info!("  {} -> {:?}", route.pattern, route.page_path.as_ref().or(route.route_path.as_ref()));
            }
        }
        Err(e) => warn!("Failed to scan app routes: {}", e),
    }
    match tables.pages() {
        Ok(pages) => {
            for route in pages.pages.iter().chain(&pages.api) {
                info!("  {} -> {:?}", route.pattern, route.file_path);
            }
        }
        Err(e) => warn!("Failed to scan pages routes: {}", e),
    }
}
