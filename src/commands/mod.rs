// ABOUTME: Command module aggregator for the hoist CLI.
// ABOUTME: Re-exports command handlers and the shared project loader.

mod config;
mod package;
mod prepare;

pub use config::config;
pub use package::package;
pub use prepare::prepare;

use hoist::compose::{self, LoadOptions, Project};
use hoist::diagnostics::Diagnostics;
use hoist::error::Result;

/// Where the project name comes from on the command line.
pub struct ProjectSource<'a> {
    pub file: &'a str,
    pub project_name: Option<&'a str>,
    pub tenant: &'a str,
}

/// Load the compose project, interpolating against the process environment.
pub fn load_project(source: &ProjectSource<'_>, diag: &mut Diagnostics) -> Result<Project> {
    let options = match source.project_name {
        Some(name) => LoadOptions::with_project_name(name),
        None => LoadOptions::with_fallback_name(source.tenant),
    }
    .environment(std::env::vars().collect());
    Ok(compose::load(source.file, &options, diag)?)
}
