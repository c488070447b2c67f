// ABOUTME: Manifest discovery and loading policy.
// ABOUTME: Glob resolution, project-name precedence, interpolation, env files and consistency checks.

use globset::Glob;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::interpolate::interpolate_value;
use super::{ComposeError, ComposeFile, Project};
use crate::diagnostics::Diagnostics;
use crate::types::ProjectName;

/// Matches `compose.yaml`, `compose.yml`, `docker-compose.yaml` and `docker-compose.yml`.
pub const DEFAULT_MANIFEST_PATTERN: &str = "*compose.y*ml";

/// Options for [`load`].
#[derive(Debug, Clone)]
pub struct LoadOptions {
    project_name: String,
    override_project_name: bool,
    environment: BTreeMap<String, String>,
    discard_env_files: bool,
    skip_consistency_check: bool,
}

impl LoadOptions {
    /// Use `name` only when the manifest doesn't declare its own.
    pub fn with_fallback_name(name: impl Into<String>) -> Self {
        Self::new(name.into(), false)
    }

    /// Use `name` regardless of what the manifest declares.
    pub fn with_project_name(name: impl Into<String>) -> Self {
        Self::new(name.into(), true)
    }

    fn new(project_name: String, override_project_name: bool) -> Self {
        Self {
            project_name,
            override_project_name,
            environment: BTreeMap::new(),
            discard_env_files: true,
            skip_consistency_check: true,
        }
    }

    /// Variables available to `${...}` interpolation. Empty by default.
    pub fn environment(mut self, environment: BTreeMap<String, String>) -> Self {
        self.environment = environment;
        self
    }

    pub fn discard_env_files(mut self, discard: bool) -> Self {
        self.discard_env_files = discard;
        self
    }

    /// When disabled, service secrets and named volumes must be declared at top level.
    pub fn skip_consistency_check(mut self, skip: bool) -> Self {
        self.skip_consistency_check = skip;
        self
    }
}

/// Load with the tenant id as fallback project name.
pub fn load_compose(
    file: &str,
    tenant: &str,
    diag: &mut Diagnostics,
) -> Result<Project, ComposeError> {
    load(file, &LoadOptions::with_fallback_name(tenant), diag)
}

/// Load with an explicit project name that overrides the manifest's.
pub fn load_compose_with_project_name(
    file: &str,
    project_name: &str,
    diag: &mut Diagnostics,
) -> Result<Project, ComposeError> {
    load(file, &LoadOptions::with_project_name(project_name), diag)
}

/// Resolve `file` (possibly a glob), read and parse it.
pub fn load(
    file: &str,
    options: &LoadOptions,
    diag: &mut Diagnostics,
) -> Result<Project, ComposeError> {
    let path = resolve_manifest_path(file)?;
    tracing::debug!(path = %path.display(), "loading compose file");

    let content = std::fs::read_to_string(&path).map_err(|source| ComposeError::Read {
        path: path.clone(),
        source,
    })?;
    let working_dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let working_dir = std::path::absolute(&working_dir).map_err(|source| ComposeError::Read {
        path: working_dir.clone(),
        source,
    })?;

    parse(&content, &path, working_dir, options, diag)
}

/// Load a manifest from memory, resolving relative paths against `working_dir`.
pub fn from_yaml(
    yaml: &str,
    working_dir: &Path,
    options: &LoadOptions,
    diag: &mut Diagnostics,
) -> Result<Project, ComposeError> {
    parse(
        yaml,
        &working_dir.join("compose.yaml"),
        working_dir.to_path_buf(),
        options,
        diag,
    )
}

/// Expand a glob to exactly one manifest path.
///
/// Only the final path component may contain wildcards. Zero matches fall back
/// to the literal path so the read fails with a natural error; more than one
/// match is ambiguous.
pub fn resolve_manifest_path(pattern: &str) -> Result<PathBuf, ComposeError> {
    let literal = PathBuf::from(pattern);
    let Some(file_pattern) = literal.file_name().and_then(|f| f.to_str()) else {
        return Ok(literal);
    };
    if !file_pattern.contains(['*', '?', '[', '{']) {
        return Ok(literal);
    }

    let matcher = Glob::new(file_pattern)
        .map_err(|e| ComposeError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?
        .compile_matcher();

    let dir = match literal.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let Ok(entries) = std::fs::read_dir(&dir) else {
        return Ok(literal);
    };

    let mut matches: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_ok_and(|t| !t.is_dir()))
        .filter(|e| matcher.is_match(e.file_name()))
        .map(|e| {
            if literal.parent().is_some_and(|p| !p.as_os_str().is_empty()) {
                dir.join(e.file_name())
            } else {
                PathBuf::from(e.file_name())
            }
        })
        .collect();
    matches.sort();

    match matches.len() {
        0 => Ok(literal),
        1 => Ok(matches.remove(0)),
        _ => Err(ComposeError::AmbiguousManifest(matches)),
    }
}

fn parse(
    content: &str,
    path: &Path,
    working_dir: PathBuf,
    options: &LoadOptions,
    diag: &mut Diagnostics,
) -> Result<Project, ComposeError> {
    let parse_err = |source| ComposeError::Parse {
        path: path.to_path_buf(),
        source,
    };

    let mut value: serde_yaml::Value = serde_yaml::from_str(content).map_err(parse_err)?;
    if value.is_null() {
        value = serde_yaml::Value::Mapping(Default::default());
    }
    value.apply_merge().map_err(parse_err)?;
    interpolate_value(&mut value, &options.environment, diag)?;
    let file: ComposeFile = serde_yaml::from_value(value).map_err(parse_err)?;

    let name = match (&file.name, options.override_project_name) {
        (Some(declared), false) if !declared.trim().is_empty() => declared.as_str(),
        _ => options.project_name.as_str(),
    };
    let name = ProjectName::new(name)?;

    let mut project = Project {
        name,
        working_dir,
        services: file.services,
        networks: file.networks,
        volumes: file.volumes,
        secrets: file.secrets,
    };

    for (key, service) in project.services.iter_mut() {
        service.name = key.clone();

        if let Some(build) = service.build.as_mut()
            && build.context.is_relative()
        {
            build.context = project.working_dir.join(&build.context);
        }

        if service.networks.is_empty() {
            service
                .networks
                .insert(super::DEFAULT_NETWORK.to_string(), Default::default());
        }

        if options.discard_env_files {
            service.env_file.clear();
        } else {
            for env_file in std::mem::take(&mut service.env_file) {
                let path = project.working_dir.join(&env_file);
                for (k, v) in read_env_file(&path)? {
                    service.environment.entry(k).or_insert(Some(v));
                }
            }
        }
    }

    if !options.skip_consistency_check {
        check_consistency(&project)?;
    }

    if tracing::enabled!(tracing::Level::DEBUG)
        && let Ok(dump) = serde_yaml::to_string(&project)
    {
        tracing::debug!("resolved project:\n{dump}");
    }

    Ok(project)
}

fn read_env_file(path: &Path) -> Result<Vec<(String, String)>, ComposeError> {
    let content = std::fs::read_to_string(path).map_err(|source| ComposeError::EnvFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter_map(|l| l.split_once('='))
        .map(|(k, v)| {
            let v = v.trim();
            let v = v
                .strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .or_else(|| v.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
                .unwrap_or(v);
            (k.trim().to_string(), v.to_string())
        })
        .collect())
}

fn check_consistency(project: &Project) -> Result<(), ComposeError> {
    for service in project.services.values() {
        if let Some(secret) = service
            .secrets
            .iter()
            .find(|s| !project.secrets.contains_key(*s))
        {
            return Err(ComposeError::Inconsistent {
                service: service.name.clone(),
                kind: "secret",
                name: secret.clone(),
            });
        }
        let undeclared_volume = service.volumes.iter().find_map(|v| match (&v.kind, &v.source) {
            (super::MountKind::Volume, Some(source)) if !project.volumes.contains_key(source) => {
                Some(source)
            }
            _ => None,
        });
        if let Some(volume) = undeclared_volume {
            return Err(ComposeError::Inconsistent {
                service: service.name.clone(),
                kind: "volume",
                name: volume.clone(),
            });
        }
    }
    Ok(())
}
