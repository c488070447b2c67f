// ABOUTME: Error types for manifest discovery, parsing, interpolation and validation.
// ABOUTME: Every variant names the offending file, service or value.

use std::path::PathBuf;
use thiserror::Error;

use crate::types::{ProjectNameError, ServiceNameError};

/// Errors raised while locating and loading a compose manifest.
#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("multiple Compose files found: {0:?}; use -f to specify which one to use")]
    AmbiguousManifest(Vec<PathBuf>),

    #[error("invalid manifest pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("invalid interpolation in {value:?}: {reason}")]
    Interpolation { value: String, reason: String },

    #[error("required variable {name} is missing a value: {message}")]
    RequiredVariable { name: String, message: String },

    #[error("invalid project name: {0}")]
    ProjectName(#[from] ProjectNameError),

    #[error("failed to read env file {}: {source}", path.display())]
    EnvFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("service {service} refers to undefined {kind} {name}")]
    Inconsistent {
        service: String,
        kind: &'static str,
        name: String,
    },
}

/// Fatal problems found by project validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("service {service:?}: {source}")]
    ServiceName {
        service: String,
        source: ServiceNameError,
    },

    #[error("service {0:?} must specify an image or a build section")]
    MissingImage(String),
}
