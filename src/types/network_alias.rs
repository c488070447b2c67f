// ABOUTME: Validated network alias attached to a service's network membership.
// ABOUTME: Aliases must be non-empty DNS-ish labels (alphanumerics, hyphen, underscore, dot).

use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkAliasError {
    #[error("network alias cannot be empty")]
    Empty,

    #[error("invalid character in network alias {alias:?}: '{found}'")]
    InvalidChar { alias: String, found: char },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct NetworkAlias(String);

impl NetworkAlias {
    pub fn new(value: &str) -> Result<Self, NetworkAliasError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(NetworkAliasError::Empty);
        }

        if let Some(found) = trimmed
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '-' | '_' | '.'))
        {
            return Err(NetworkAliasError::InvalidChar {
                alias: trimmed.to_string(),
                found,
            });
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NetworkAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
