// ABOUTME: Strict deployment descriptor produced from a validated compose project.
// ABOUTME: Enumerated ports, modes, protocols and platforms; no free-form strings survive conversion.

mod convert;
mod error;

pub use convert::{
    convert_platform, convert_port, convert_ports, convert_project, convert_service,
    parse_memory_mib, resolve_environment,
};
pub use error::ConvertError;

use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::types::{NetworkAlias, ProjectName, ServiceName};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    Host,
    Ingress,
}

/// `Any` leaves the choice to the platform (HTTP for ingress ports).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    #[default]
    Any,
    Tcp,
    Udp,
    Http,
    Http2,
    Grpc,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Platform {
    #[default]
    LinuxAny,
    LinuxAmd64,
    LinuxArm64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PortDescriptor {
    pub target: u16,
    pub protocol: Protocol,
    pub mode: Mode,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceDescriptor {
    pub name: ServiceName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub platform: Platform,
    pub ports: Vec<PortDescriptor>,
    pub environment: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildDescriptor>,
    pub networks: Vec<NetworkAttachment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reservations: Option<Reservations>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub healthcheck: Option<HealthcheckDescriptor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub entrypoint: Vec<String>,
    pub replicas: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<String>,
}

/// Where the remote builder finds this service's context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildDescriptor {
    /// Upload URL after preparation; a local path before upload or in dry runs.
    pub context: String,
    pub dockerfile: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub args: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkAttachment {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<NetworkAlias>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reservations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpus: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_mib: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthcheckDescriptor {
    pub test: Vec<String>,
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub interval: Option<Duration>,
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
}

/// The full request handed to the remote deployment service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeployRequest {
    pub project: ProjectName,
    pub services: Vec<ServiceDescriptor>,
}
