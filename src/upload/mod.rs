// ABOUTME: Upload of packaged build contexts to a remote write destination.
// ABOUTME: The destination URL comes from a provider; the returned URL has its credentials stripped.

mod error;

pub use error::UploadError;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use std::time::Duration;
use url::Url;

use crate::cancel::CancelSignal;
use crate::types::ContentDigest;

/// Content type sent with every archive.
pub const ARCHIVE_CONTENT_TYPE: &str = "application/gzip";

const USER_AGENT_VALUE: &str = concat!("hoist/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Hands out write destinations for archives.
///
/// With a digest, the remote side may recognise content it already holds.
/// Without one (a forced rebuild) it must hand out a fresh destination.
#[async_trait]
pub trait UploadUrlProvider: Send + Sync {
    async fn create_upload_url(&self, digest: Option<&ContentDigest>)
    -> Result<String, UploadError>;
}

#[async_trait]
impl<P: UploadUrlProvider + ?Sized> UploadUrlProvider for std::sync::Arc<P> {
    async fn create_upload_url(
        &self,
        digest: Option<&ContentDigest>,
    ) -> Result<String, UploadError> {
        (**self).create_upload_url(digest).await
    }
}

/// Appends the digest to a fixed base URL.
#[derive(Debug, Clone)]
pub struct StaticUrlProvider {
    base: String,
}

impl StaticUrlProvider {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }
}

#[async_trait]
impl UploadUrlProvider for StaticUrlProvider {
    async fn create_upload_url(
        &self,
        digest: Option<&ContentDigest>,
    ) -> Result<String, UploadError> {
        Ok(match digest {
            Some(digest) => format!("{}{}", self.base, digest),
            None => self.base.clone(),
        })
    }
}

/// Transfers archives to provider-issued destinations.
#[derive(Debug, Clone)]
pub struct UploadCoordinator<P> {
    provider: P,
    client: reqwest::Client,
}

impl<P: UploadUrlProvider> UploadCoordinator<P> {
    pub fn new(provider: P) -> Result<Self, UploadError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self::with_client(provider, client))
    }

    pub fn with_client(provider: P, client: reqwest::Client) -> Self {
        Self { provider, client }
    }

    /// PUT `archive` to a destination obtained for `digest`.
    ///
    /// The PUT happens even when the remote side already holds the digest;
    /// skipping it is the service's business. Returns the destination without
    /// its query string.
    pub async fn upload(
        &self,
        archive: Bytes,
        digest: Option<&ContentDigest>,
        cancel: &CancelSignal,
    ) -> Result<String, UploadError> {
        let target = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(UploadError::Cancelled),
            issued = self.provider.create_upload_url(digest) => issued?,
        };
        let mut url = Url::parse(&target).map_err(|source| UploadError::InvalidUrl {
            url: target.clone(),
            source,
        })?;

        let size = archive.len();
        tracing::debug!(host = url.host_str().unwrap_or_default(), path = url.path(), size, "uploading build context");

        let request = self
            .client
            .put(url.clone())
            .header(CONTENT_TYPE, ARCHIVE_CONTENT_TYPE)
            .body(archive)
            .send();
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(UploadError::Cancelled),
            response = request => response?,
        };

        let status = response.status();
        if status != StatusCode::OK {
            return Err(UploadError::Status { status });
        }

        url.set_query(None);
        url.set_fragment(None);
        tracing::info!(url = %url, size, "uploaded build context");
        Ok(url.into())
    }
}
