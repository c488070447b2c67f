// ABOUTME: Platform service name normalization and validation.
// ABOUTME: Lowercases and collapses non-alphanumeric runs to a single hyphen; bounds the length.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Longest normalized service name the platform accepts (an RFC 1123 label).
pub const MAX_SERVICE_NAME_LENGTH: usize = 63;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServiceNameError {
    #[error("service name cannot be empty")]
    Empty,

    #[error(
        "service name {name:?} exceeds maximum length of {MAX_SERVICE_NAME_LENGTH} characters ({len})"
    )]
    TooLong { name: String, len: usize },
}

/// Map a manifest service name onto the platform's charset.
///
/// Not injective: `my_app` and `my.app` both become `my-app`. Leading and
/// trailing separators are kept as hyphens rather than stripped.
pub fn normalize_service_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_run = false;
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('-');
            in_run = true;
        }
    }
    out
}

/// A normalized service name that fits the platform limit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ServiceName(String);

impl ServiceName {
    pub fn normalize(raw: &str) -> Result<Self, ServiceNameError> {
        let name = normalize_service_name(raw);
        if name.is_empty() {
            return Err(ServiceNameError::Empty);
        }
        let len = name.chars().count();
        if len > MAX_SERVICE_NAME_LENGTH {
            return Err(ServiceNameError::TooLong { name, len });
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
