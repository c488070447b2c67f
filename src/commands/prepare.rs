// ABOUTME: Prepare command implementation.
// ABOUTME: Runs the full pipeline and prints the deployment request with build context references.

use super::{ProjectSource, load_project};
use hoist::cancel::CancelSignal;
use hoist::deploy::{PrepareOptions, prepare as prepare_project};
use hoist::diagnostics::Diagnostics;
use hoist::error::Result;
use hoist::output::Output;
use hoist::upload::{StaticUrlProvider, UploadCoordinator};

pub async fn prepare(
    source: &ProjectSource<'_>,
    upload_url: Option<&str>,
    force: bool,
    cancel: &CancelSignal,
    mut output: Output,
) -> Result<()> {
    output.start_timer();
    let mut load_diag = Diagnostics::default();
    let mut project = load_project(source, &mut load_diag)?;

    let options = PrepareOptions {
        force,
        dry_run: upload_url.is_none(),
    };
    let uploader = UploadCoordinator::new(StaticUrlProvider::new(upload_url.unwrap_or_default()))?;

    output.progress(&format!(
        "Preparing {} ({} services{})",
        project.name,
        project.services.len(),
        if options.dry_run { ", dry run" } else { "" }
    ));
    let prepared = prepare_project(&mut project, &uploader, options, cancel).await?;

    for context in &prepared.contexts {
        output.progress(&format!(
            "  {}: {} ({} bytes) -> {}",
            context.service, context.digest, context.size, context.location
        ));
    }

    output.warnings(&load_diag);
    output.warnings(&prepared.diagnostics);
    output.document(&prepared.request)?;
    Ok(())
}
