// ABOUTME: Application-wide error type for hoist.
// ABOUTME: Aggregates module errors with thiserror so callers can use one Result.

use thiserror::Error;

use crate::compose::{ComposeError, ValidationError};
use crate::context::ContextError;
use crate::descriptor::ConvertError;
use crate::upload::UploadError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error("invalid project: {0}")]
    Validation(#[from] ValidationError),

    #[error("conversion failed: {0}")]
    Convert(#[from] ConvertError),

    #[error("failed to package build context for service {service}: {source}")]
    Context {
        service: String,
        #[source]
        source: ContextError,
    },

    #[error("failed to upload build context for service {service}: {source}")]
    Upload {
        service: String,
        #[source]
        source: UploadError,
    },

    #[error("failed to set up uploads: {0}")]
    UploadSetup(#[from] UploadError),

    #[error("service not found in project: {0}")]
    UnknownService(String),

    #[error("service {0} has no build section")]
    NoBuild(String),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
