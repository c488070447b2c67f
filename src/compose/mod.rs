// ABOUTME: In-memory model of a compose manifest and the policy around loading it.
// ABOUTME: Loader resolves the file and project name; validator checks platform constraints.

mod deserialize;
mod error;
mod interpolate;
mod loader;
mod validate;

pub use error::{ComposeError, ValidationError};
pub use interpolate::interpolate;
pub use loader::{
    DEFAULT_MANIFEST_PATTERN, LoadOptions, from_yaml, load, load_compose,
    load_compose_with_project_name, resolve_manifest_path,
};
pub use validate::{DEFAULT_NETWORK, validate_project};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::types::ProjectName;
use deserialize::{
    deserialize_build, deserialize_command, deserialize_cpus, deserialize_environment,
    deserialize_health_test, deserialize_list_or_string, deserialize_memory,
    deserialize_nullable_map, deserialize_ports, deserialize_published, deserialize_secrets,
    deserialize_service_networks, deserialize_volumes,
};

/// A loaded compose project. Built once per invocation, repaired in place by
/// validation, then converted into a deployment descriptor.
#[derive(Debug, Clone, Serialize)]
pub struct Project {
    pub name: ProjectName,
    pub working_dir: PathBuf,
    pub services: BTreeMap<String, ServiceConfig>,
    pub networks: BTreeMap<String, NetworkConfig>,
    pub volumes: BTreeMap<String, serde_yaml::Value>,
    pub secrets: BTreeMap<String, serde_yaml::Value>,
}

impl Project {
    /// Services that carry a build section and therefore need a packaged context.
    pub fn build_services(&self) -> impl Iterator<Item = &ServiceConfig> {
        self.services.values().filter(|s| s.build.is_some())
    }
}

/// Raw top-level manifest document.
#[derive(Debug, Deserialize)]
pub(crate) struct ComposeFile {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub services: BTreeMap<String, ServiceConfig>,

    #[serde(default, deserialize_with = "deserialize_nullable_map")]
    pub networks: BTreeMap<String, NetworkConfig>,

    #[serde(default, deserialize_with = "deserialize_nullable_map")]
    pub volumes: BTreeMap<String, serde_yaml::Value>,

    #[serde(default, deserialize_with = "deserialize_nullable_map")]
    pub secrets: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Key under `services:`; filled in by the loader.
    #[serde(skip_deserializing)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(
        default,
        deserialize_with = "deserialize_build",
        skip_serializing_if = "Option::is_none"
    )]
    pub build: Option<BuildConfig>,

    #[serde(default, deserialize_with = "deserialize_ports")]
    pub ports: Vec<PortConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy: Option<DeployConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healthcheck: Option<HealthcheckConfig>,

    #[serde(default, deserialize_with = "deserialize_service_networks")]
    pub networks: BTreeMap<String, ServiceNetworkConfig>,

    /// `None` values are keys listed without a value; they are resolved from
    /// the process environment during conversion.
    #[serde(default, deserialize_with = "deserialize_environment")]
    pub environment: BTreeMap<String, Option<String>>,

    #[serde(default, deserialize_with = "deserialize_list_or_string")]
    pub env_file: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    #[serde(default, deserialize_with = "deserialize_command")]
    pub command: Option<Vec<String>>,

    #[serde(default, deserialize_with = "deserialize_command")]
    pub entrypoint: Option<Vec<String>>,

    #[serde(default, deserialize_with = "deserialize_secrets")]
    pub secrets: Vec<String>,

    #[serde(default, deserialize_with = "deserialize_volumes")]
    pub volumes: Vec<VolumeMount>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Absolute after loading.
    #[serde(default = "default_context")]
    pub context: PathBuf,

    /// Relative to `context`; `None` means `Dockerfile`.
    #[serde(default)]
    pub dockerfile: Option<String>,

    #[serde(default, deserialize_with = "deserialize_environment")]
    pub args: BTreeMap<String, Option<String>>,

    #[serde(default)]
    pub target: Option<String>,
}

fn default_context() -> PathBuf {
    PathBuf::from(".")
}

/// A port as written in the manifest, before platform conversion. Mode and
/// protocol stay free-form strings; empty means unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortConfig {
    #[serde(default)]
    pub mode: String,

    #[serde(default)]
    pub host_ip: String,

    #[serde(default)]
    pub target: u32,

    #[serde(default, deserialize_with = "deserialize_published")]
    pub published: String,

    #[serde(default)]
    pub protocol: String,
}

impl PortConfig {
    pub fn target(target: u32) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeployConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Resources>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resources {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<ResourceSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservations: Option<ResourceSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSpec {
    #[serde(
        default,
        deserialize_with = "deserialize_cpus",
        skip_serializing_if = "Option::is_none"
    )]
    pub cpus: Option<f32>,

    /// Raw compose byte value such as `512M` or `1gb`.
    #[serde(
        default,
        deserialize_with = "deserialize_memory",
        skip_serializing_if = "Option::is_none"
    )]
    pub memory: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthcheckConfig {
    #[serde(default, deserialize_with = "deserialize_health_test")]
    pub test: Vec<String>,

    #[serde(default, with = "humantime_serde")]
    pub interval: Option<Duration>,

    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,

    #[serde(default, with = "humantime_serde")]
    pub start_period: Option<Duration>,

    #[serde(default)]
    pub retries: Option<u32>,

    #[serde(default)]
    pub disable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,

    #[serde(default)]
    pub external: bool,

    #[serde(default)]
    pub internal: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceNetworkConfig {
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MountKind {
    Volume,
    Bind,
    Tmpfs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeMount {
    pub kind: MountKind,
    pub source: Option<String>,
    pub target: String,
}
