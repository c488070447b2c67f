// ABOUTME: Deployment preparation: validate, convert, package and upload build contexts.
// ABOUTME: Services with a build section are packaged concurrently and attached in service order.

use futures::TryFutureExt;
use futures::future::try_join_all;
use std::path::PathBuf;

use crate::cancel::CancelSignal;
use crate::compose::{Project, validate_project};
use crate::context::{self, Archive};
use crate::descriptor::{DeployRequest, convert_project};
use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};
use crate::types::ContentDigest;
use crate::upload::{UploadCoordinator, UploadUrlProvider};

/// Options for [`prepare`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PrepareOptions {
    /// Withhold digests so the remote side can't reuse a previous build.
    pub force: bool,
    /// Package but don't upload; build contexts point at local directories.
    pub dry_run: bool,
}

/// Summary of one packaged build context.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PackagedContext {
    pub service: String,
    pub digest: ContentDigest,
    pub size: usize,
    pub file_count: usize,
    /// Upload URL, or the local context directory in a dry run.
    pub location: String,
}

/// A deployment request ready to hand to the remote service.
#[derive(Debug)]
pub struct Prepared {
    pub request: DeployRequest,
    pub contexts: Vec<PackagedContext>,
    pub diagnostics: Diagnostics,
}

/// Turn a loaded project into a deployment request.
///
/// The project is repaired in place by validation. Any fatal error from any
/// service aborts the whole preparation.
pub async fn prepare<P: UploadUrlProvider>(
    project: &mut Project,
    uploader: &UploadCoordinator<P>,
    options: PrepareOptions,
    cancel: &CancelSignal,
) -> Result<Prepared> {
    let mut diagnostics = Diagnostics::default();
    validate_project(project, &mut diagnostics)?;
    let mut request = convert_project(project, &mut diagnostics)?;
    tracing::info!(project = %request.project, services = request.services.len(), "converted project");

    let builds: Vec<(usize, String, PathBuf, String)> = request
        .services
        .iter()
        .enumerate()
        .filter_map(|(index, service)| {
            let build = service.build.as_ref()?;
            Some((
                index,
                service.name.to_string(),
                PathBuf::from(&build.context),
                build.dockerfile.clone(),
            ))
        })
        .collect();

    // Tripped on the first failure so sibling packaging stops early.
    let siblings = cancel.child();
    let jobs = builds.into_iter().map(|(index, service, root, dockerfile)| {
        let cancel = siblings.clone();
        async move {
            let (archive, service_diag) = package_blocking(&service, root.clone(), dockerfile, &cancel).await?;
            let digest = (!options.force).then_some(&archive.digest);

            let location = if options.dry_run {
                root.display().to_string()
            } else {
                uploader
                    .upload(archive.bytes.clone(), digest, &cancel)
                    .await
                    .map_err(|source| Error::Upload {
                        service: service.clone(),
                        source,
                    })?
            };

            let summary = PackagedContext {
                service,
                digest: archive.digest,
                size: archive.bytes.len(),
                file_count: archive.file_count,
                location,
            };
            Ok::<_, Error>((index, summary, service_diag))
        }
        .inspect_err(|_| siblings.cancel())
    });

    let mut contexts = Vec::new();
    for (index, summary, service_diag) in try_join_all(jobs).await? {
        if let Some(build) = request.services[index].build.as_mut() {
            build.context = summary.location.clone();
        }
        diagnostics.absorb(service_diag);
        contexts.push(summary);
    }

    Ok(Prepared {
        request,
        contexts,
        diagnostics,
    })
}

/// Package a single service's build context.
pub async fn package_service(
    project: &Project,
    service: &str,
    cancel: &CancelSignal,
    diag: &mut Diagnostics,
) -> Result<Archive> {
    let config = project
        .services
        .get(service)
        .ok_or_else(|| Error::UnknownService(service.to_string()))?;
    let build = config
        .build
        .as_ref()
        .ok_or_else(|| Error::NoBuild(service.to_string()))?;
    let dockerfile = build
        .dockerfile
        .clone()
        .unwrap_or_else(|| context::DEFAULT_DOCKERFILE.to_string());

    let (archive, service_diag) =
        package_blocking(service, build.context.clone(), dockerfile, cancel).await?;
    diag.absorb(service_diag);
    Ok(archive)
}

// Directory walking and compression are blocking; keep them off the async workers.
async fn package_blocking(
    service: &str,
    root: PathBuf,
    dockerfile: String,
    cancel: &CancelSignal,
) -> Result<(Archive, Diagnostics)> {
    let cancel = cancel.clone();
    let packaged = tokio::task::spawn_blocking(move || {
        let mut diag = Diagnostics::default();
        context::package(&root, Some(&dockerfile), &cancel, &mut diag).map(|a| (a, diag))
    })
    .await?;

    let (archive, diag) = packaged.map_err(|source| Error::Context {
        service: service.to_string(),
        source,
    })?;
    tracing::info!(
        service,
        digest = %archive.digest,
        size = archive.bytes.len(),
        files = archive.file_count,
        "packaged build context"
    );
    Ok((archive, diag))
}
