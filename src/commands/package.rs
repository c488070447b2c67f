// ABOUTME: Package command implementation.
// ABOUTME: Builds one service's context archive and reports its digest.

use super::{ProjectSource, load_project};
use hoist::cancel::CancelSignal;
use hoist::deploy::package_service;
use hoist::diagnostics::Diagnostics;
use hoist::error::Result;
use hoist::output::Output;
use std::path::Path;

pub async fn package(
    source: &ProjectSource<'_>,
    service: &str,
    destination: Option<&Path>,
    cancel: &CancelSignal,
    mut output: Output,
) -> Result<()> {
    output.start_timer();
    let mut diag = Diagnostics::default();
    let project = load_project(source, &mut diag)?;

    output.progress(&format!("Packaging build context for {service}"));
    let archive = package_service(&project, service, cancel, &mut diag).await?;

    if let Some(path) = destination {
        tokio::fs::write(path, &archive.bytes).await?;
        output.progress(&format!(
            "Wrote {} bytes ({} files) to {}",
            archive.bytes.len(),
            archive.file_count,
            path.display()
        ));
    }

    output.warnings(&diag);
    output.success(archive.digest.as_str());
    Ok(())
}
