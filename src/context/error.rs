// ABOUTME: Build context packaging error types with SNAFU pattern.
// ABOUTME: Exposes a kind() accessor so callers can branch without matching fields.

use snafu::Snafu;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ContextError {
    #[snafu(display("build context not found: {}", path.display()))]
    ContextNotFound { path: PathBuf },

    #[snafu(display("the specified dockerfile could not be read: {dockerfile:?}"))]
    DockerfileNotFound { dockerfile: String },

    #[snafu(display("build context {} exceeds the {limit} byte limit", path.display()))]
    SizeLimit { path: PathBuf, limit: usize },

    #[snafu(display("invalid ignore pattern {pattern:?}: {source}"))]
    Pattern {
        pattern: String,
        source: globset::Error,
    },

    #[snafu(display("packaging cancelled"))]
    Cancelled,

    #[snafu(display("failed to package {}: {source}", path.display()))]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to walk build context: {source}"))]
    Walk { source: walkdir::Error },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextErrorKind {
    /// Context directory is missing or not a directory.
    ContextNotFound,
    /// Dockerfile was not among the packaged files.
    DockerfileNotFound,
    /// Compressed archive grew past the limit.
    SizeLimit,
    InvalidPattern,
    Cancelled,
    Io,
}

impl ContextError {
    pub fn kind(&self) -> ContextErrorKind {
        match self {
            ContextError::ContextNotFound { .. } => ContextErrorKind::ContextNotFound,
            ContextError::DockerfileNotFound { .. } => ContextErrorKind::DockerfileNotFound,
            ContextError::SizeLimit { .. } => ContextErrorKind::SizeLimit,
            ContextError::Pattern { .. } => ContextErrorKind::InvalidPattern,
            ContextError::Cancelled => ContextErrorKind::Cancelled,
            ContextError::Io { .. } | ContextError::Walk { .. } => ContextErrorKind::Io,
        }
    }
}
