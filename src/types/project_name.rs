// ABOUTME: Project name type: lowercase alphanumerics and hyphens only.
// ABOUTME: Input is lowercased first, so tenant ids like "Valid-Username" are accepted.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProjectNameError {
    #[error("project name cannot be empty")]
    Empty,

    #[error("invalid character in project name {name:?}: '{found}'")]
    InvalidChar { name: String, found: char },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ProjectName(String);

impl ProjectName {
    pub fn new(value: &str) -> Result<Self, ProjectNameError> {
        let name = value.trim().to_lowercase();
        if name.is_empty() {
            return Err(ProjectNameError::Empty);
        }
        if let Some(found) = name
            .chars()
            .find(|c| !c.is_ascii_lowercase() && !c.is_ascii_digit() && *c != '-')
        {
            return Err(ProjectNameError::InvalidChar { name, found });
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
