// ABOUTME: Upload error types.
// ABOUTME: Separates remote refusals (status) from transport and provider failures.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to obtain upload URL: {0}")]
    Provider(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("invalid upload URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("HTTP PUT failed with status code {status}")]
    Status { status: reqwest::StatusCode },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upload cancelled")]
    Cancelled,
}

impl UploadError {
    /// Wrap any provider-side failure.
    pub fn provider(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        UploadError::Provider(err.into())
    }
}
