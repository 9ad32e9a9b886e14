use std::path::PathBuf;

use vinext_router::RouterError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Setup and configuration errors for the request pipeline
///
/// Per-request failures never surface as this type; they become HTTP
/// responses (400, 404, 500) inside the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{} exports neither `{expected}` nor `default`", .file.display())]
    MissingExport { file: PathBuf, expected: &'static str },

    #[error("`{export}` export of {} is not a function", .file.display())]
    NotCallable { file: PathBuf, export: String },

    #[error("failed to load middleware module {}", .file.display())]
    ModuleLoad {
        file: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("invalid middleware matcher in {}: {reason}", .file.display())]
    InvalidMatcher { file: PathBuf, reason: String },

    #[error("invalid {kind} rule `{pattern}`: {reason}")]
    InvalidRule {
        kind: &'static str,
        pattern: String,
        reason: String,
    },

    #[error(transparent)]
    Router(#[from] RouterError),
}
