use std::path::PathBuf;

/// Errors raised while building a route table.
///
/// Matching never fails; a path with no route is `None`, not an error.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("failed to scan route directory {}: {source}", .root.display())]
    Scan {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("conflicting routes for `{pattern}`: {} and {}", .first.display(), .second.display())]
    Conflict {
        pattern: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("different dynamic segment names at `{position}`: `{first}` and `{second}`")]
    DynamicNameMismatch {
        position: String,
        first: String,
        second: String,
    },

    #[error("{} defines both a page and a route handler", .dir.display())]
    PageRouteConflict { dir: PathBuf },
}
