//! Middleware / proxy modules
//!
//! The module loader is a collaborator: this crate only locates the file,
//! validates the resolved exports and runs the handler.

pub mod matcher;
pub mod request;
pub mod response;
pub mod runner;

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Response;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::PipelineError;
use crate::request_context::RequestContext;

pub use matcher::{matches_middleware, MiddlewareMatcher};
pub use request::{Geo, MiddlewareRequest};
pub use response::NextResponse;
pub use runner::{run_middleware, MiddlewareOutcome};

/// `proxy.*` is the newer name for `middleware.*`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiddlewareKind {
    Proxy,
    Middleware,
}

impl MiddlewareKind {
    /// Named export the module must provide (or `default`)
    pub fn export_name(&self) -> &'static str {
        match self {
            MiddlewareKind::Proxy => "proxy",
            MiddlewareKind::Middleware => "middleware",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiddlewareFile {
    pub path: PathBuf,
    pub kind: MiddlewareKind,
}

/// Finds the project's middleware file
///
/// `proxy.*` wins over `middleware.*`; the project root wins over `src/`.
pub fn locate_middleware(root: &Path, extensions: &[String]) -> Option<MiddlewareFile> {
    for kind in [MiddlewareKind::Proxy, MiddlewareKind::Middleware] {
        for dir in [root.to_path_buf(), root.join("src")] {
            for ext in extensions {
                let path = dir.join(format!("{}.{ext}", kind.export_name()));
                if path.is_file() {
                    debug!(path = %path.display(), "middleware located");
                    return Some(MiddlewareFile { path, kind });
                }
            }
        }
    }
    None
}

/// A callable middleware export
#[async_trait]
pub trait MiddlewareHandler: Send + Sync {
    async fn call(&self, request: MiddlewareRequest) -> anyhow::Result<Response<Body>>;
}

#[async_trait]
impl<F, Fut> MiddlewareHandler for F
where
    F: Fn(MiddlewareRequest) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Response<Body>>> + Send + 'static,
{
    async fn call(&self, request: MiddlewareRequest) -> anyhow::Result<Response<Body>> {
        (self)(request).await
    }
}

/// One resolved module export
#[derive(Clone)]
pub enum Export {
    Function(Arc<dyn MiddlewareHandler>),
    Value(Value),
}

impl std::fmt::Debug for Export {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Export::Function(_) => f.write_str("Function"),
            Export::Value(value) => f.debug_tuple("Value").field(value).finish(),
        }
    }
}

/// Resolved exports of a middleware module, keyed by export name
#[derive(Debug, Clone, Default)]
pub struct ModuleExports {
    pub exports: HashMap<String, Export>,
}

impl ModuleExports {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_function(mut self, name: &str, handler: impl MiddlewareHandler + 'static) -> Self {
        self.exports.insert(name.to_string(), Export::Function(Arc::new(handler)));
        self
    }

    pub fn with_value(mut self, name: &str, value: Value) -> Self {
        self.exports.insert(name.to_string(), Export::Value(value));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Export> {
        self.exports.get(name)
    }
}

/// Resolves a module file to its exports
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    async fn load(&self, path: &Path) -> anyhow::Result<ModuleExports>;
}

/// Loader over modules registered ahead of time
#[derive(Debug, Clone, Default)]
pub struct StaticModuleLoader {
    modules: HashMap<PathBuf, ModuleExports>,
}

impl StaticModuleLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, path: impl Into<PathBuf>, exports: ModuleExports) -> Self {
        self.modules.insert(path.into(), exports);
        self
    }
}

#[async_trait]
impl ModuleLoader for StaticModuleLoader {
    async fn load(&self, path: &Path) -> anyhow::Result<ModuleExports> {
        self.modules
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no module registered for {}", path.display()))
    }
}

/// A loaded, validated middleware
#[derive(Clone)]
pub struct Middleware {
    pub file: MiddlewareFile,
    handler: Arc<dyn MiddlewareHandler>,
    matcher: Option<MiddlewareMatcher>,
}

impl std::fmt::Debug for Middleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Middleware")
            .field("file", &self.file)
            .field("matcher", &self.matcher)
            .finish()
    }
}

impl Middleware {
    pub fn new(file: MiddlewareFile, handler: Arc<dyn MiddlewareHandler>, matcher: Option<MiddlewareMatcher>) -> Self {
        Self { file, handler, matcher }
    }

    /// Loads a module and validates its exports
    ///
    /// A module without a callable `proxy`/`middleware` (or `default`) export
    /// is a configuration error, as is an unparseable `config.matcher`.
    pub async fn load(file: MiddlewareFile, loader: &dyn ModuleLoader) -> Result<Self, PipelineError> {
        let exports = loader
            .load(&file.path)
            .await
            .map_err(|source| PipelineError::ModuleLoad {
                file: file.path.clone(),
                source: source.into(),
            })?;

        let expected = file.kind.export_name();
        let (export_name, export) = exports
            .get(expected)
            .map(|export| (expected, export))
            .or_else(|| exports.get("default").map(|export| ("default", export)))
            .ok_or_else(|| PipelineError::MissingExport {
                file: file.path.clone(),
                expected,
            })?;

        let handler = match export {
            Export::Function(handler) => Arc::clone(handler),
            Export::Value(_) => {
                return Err(PipelineError::NotCallable {
                    file: file.path.clone(),
                    export: export_name.to_string(),
                })
            }
        };

        let matcher = match exports.get("config") {
            Some(Export::Value(config)) => match config.get("matcher") {
                Some(value) => Some(MiddlewareMatcher::from_value(value).map_err(|reason| {
                    PipelineError::InvalidMatcher {
                        file: file.path.clone(),
                        reason,
                    }
                })?),
                None => None,
            },
            _ => None,
        };

        info!(
            path = %file.path.display(),
            export = export_name,
            has_matcher = matcher.is_some(),
            "middleware loaded"
        );
        Ok(Self { file, handler, matcher })
    }

    pub fn matcher(&self) -> Option<&MiddlewareMatcher> {
        self.matcher.as_ref()
    }

    pub fn handler(&self) -> &Arc<dyn MiddlewareHandler> {
        &self.handler
    }

    pub fn matches(&self, pathname: &str, ctx: &RequestContext) -> bool {
        matches_middleware(pathname, self.matcher.as_ref(), ctx)
    }
}
