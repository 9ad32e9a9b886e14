/// Route module shared by both routers
///
/// - [`segment`]: the tagged segment AST built from filesystem names
/// - [`sort`]: the precedence comparator
/// - [`matcher`]: first-match lookup over a sorted table
/// - [`validate`]: conflict checks run once per build
pub mod matcher;
pub mod segment;
pub mod sort;
pub mod validate;

pub use matcher::{match_route, match_template, RouteMatch};
pub use segment::{classify_segment, RouterKind, Segment};
pub use sort::{compare_patterns, sort_routes};

use std::path::Path;

/// Anything that can sit in a route table
pub trait Routable {
    /// Template pattern, e.g. `/blog/:slug`
    fn pattern(&self) -> &str;

    /// File that defines the route, used in conflict errors
    fn source_path(&self) -> &Path {
        Path::new(self.pattern())
    }
}

impl Routable for String {
    fn pattern(&self) -> &str {
        self
    }
}

impl Routable for &str {
    fn pattern(&self) -> &str {
        self
    }
}
