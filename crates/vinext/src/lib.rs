//! # vinext
//!
//! Request pipeline for Next.js-style projects. Given an incoming request it
//! decides which route answers and under which URL and headers:
//! - Base path and trailing-slash canonicalization
//! - Middleware (`proxy.*` / `middleware.*`) with matcher and header passing
//! - `headers`, `redirects` and three-phase `rewrites` from `vinext.toml`
//! - App Router, Pages Router and Pages API dispatch through a [`Backend`]
//!
//! Rendering is the backend's job; this crate never renders anything itself.

// ============================================================================
// Module Declarations
// ============================================================================

pub mod backend;
pub mod conditions;
pub mod config;
pub mod error;
pub mod middleware;
pub mod pipeline;
pub mod request_context;
pub mod rules;
pub mod tables;
pub mod watcher;

// ============================================================================
// Re-exports
// ============================================================================

pub use backend::{Backend, NotFoundRequest, ProxyRequest, RenderRequest, ResolvedRoute, RouteResolution};
pub use conditions::Conditions;
pub use config::{Config, RouteHas};
pub use error::PipelineError;
pub use middleware::{
    locate_middleware, matches_middleware, Middleware, MiddlewareFile, MiddlewareHandler, MiddlewareKind,
    MiddlewareMatcher, MiddlewareOutcome, MiddlewareRequest, ModuleExports, ModuleLoader, NextResponse,
    StaticModuleLoader,
};
pub use pipeline::Pipeline;
pub use request_context::RequestContext;
pub use rules::{CompiledRules, Redirect, RewritePhase, RewriteTarget};
pub use tables::RouteTables;
pub use watcher::{ChangeKind, RouteChange, RouteWatcher};

// Re-export the router so callers need one dependency
pub use vinext_router;
