// ABOUTME: Content digest of a build context archive.
// ABOUTME: SHA-256 of the uncompressed tar stream, rendered as "sha256-<base64>".

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

/// Remote-side cache key and upload path suffix for an archive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ContentDigest(String);

impl ContentDigest {
    pub fn from_sha256(raw: [u8; 32]) -> Self {
        Self(format!("sha256-{}", STANDARD.encode(raw)))
    }

    /// Digest of a complete byte slice.
    pub fn of(bytes: &[u8]) -> Self {
        Self::from_sha256(Sha256::digest(bytes).into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
