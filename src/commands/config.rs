// ABOUTME: Config command implementation.
// ABOUTME: Loads, validates and converts the project, then prints the deployment descriptor.

use super::{ProjectSource, load_project};
use hoist::compose::validate_project;
use hoist::descriptor::convert_project;
use hoist::diagnostics::Diagnostics;
use hoist::error::Result;
use hoist::output::Output;

pub fn config(source: &ProjectSource<'_>, output: &Output) -> Result<()> {
    let mut diag = Diagnostics::default();
    let mut project = load_project(source, &mut diag)?;
    validate_project(&mut project, &mut diag)?;
    let request = convert_project(&project, &mut diag)?;

    output.warnings(&diag);
    output.document(&request)?;
    Ok(())
}
