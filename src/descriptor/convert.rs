// ABOUTME: Conversion from flexible compose constructs to the strict deployment descriptor.
// ABOUTME: Port rules apply in a fixed order; downgrades are recorded as warnings, not errors.

use std::collections::BTreeMap;

use super::{
    BuildDescriptor, ConvertError, DeployRequest, HealthcheckDescriptor, Mode, NetworkAttachment,
    Platform, PortDescriptor, Protocol, Reservations, ServiceDescriptor,
};
use crate::compose::{PortConfig, Project, ServiceConfig};
use crate::diagnostics::{Diagnostics, Warning, WarningKind};
use crate::types::{NetworkAlias, ServiceName};

const MAX_PORT_TARGET: u32 = 32767;
const MIB: u64 = 1024 * 1024;

/// Convert one manifest port.
///
/// Checks run in order: target range, host IP, published value, protocol, then mode.
pub fn convert_port(port: &PortConfig, diag: &mut Diagnostics) -> Result<PortDescriptor, ConvertError> {
    if !(1..=MAX_PORT_TARGET).contains(&port.target) {
        return Err(ConvertError::TargetOutOfRange(port.target));
    }
    if !port.host_ip.is_empty() {
        return Err(ConvertError::HostIpUnsupported(port.host_ip.clone()));
    }
    if !port.published.is_empty() && port.published != port.target.to_string() {
        return Err(ConvertError::PublishedMismatch(port.published.clone()));
    }

    let mut protocol = match port.protocol.as_str() {
        "" => Protocol::Any,
        "tcp" => Protocol::Tcp,
        "udp" => Protocol::Udp,
        "http" => Protocol::Http,
        "http2" => Protocol::Http2,
        "grpc" => Protocol::Grpc,
        other => return Err(ConvertError::UnknownProtocol(other.to_string())),
    };

    let target = port.target;
    let mode = match port.mode.as_str() {
        "" => {
            diag.warn(Warning::new(
                WarningKind::PortModeDefaulted,
                format!("no port mode was specified for {target}; assuming 'host' (add 'mode' to silence)"),
            ));
            Mode::Host
        }
        "host" => Mode::Host,
        // The short port syntax silently produces ingress+tcp, hence the downgrades.
        "ingress" if !port.published.is_empty() => {
            diag.warn(Warning::new(
                WarningKind::PublishedIngress,
                format!("published ports are not supported in ingress mode ({target}); assuming 'host' (add 'mode' to silence)"),
            ));
            Mode::Host
        }
        "ingress" => {
            if matches!(protocol, Protocol::Tcp | Protocol::Udp) {
                diag.warn(Warning::new(
                    WarningKind::TcpIngress,
                    format!("TCP ingress is not supported ({target}); assuming HTTP"),
                ));
                protocol = Protocol::Http;
            }
            Mode::Ingress
        }
        other => return Err(ConvertError::UnknownMode(other.to_string())),
    };

    Ok(PortDescriptor {
        // Range checked above.
        target: target as u16,
        protocol,
        mode,
    })
}

pub fn convert_ports(
    ports: &[PortConfig],
    diag: &mut Diagnostics,
) -> Result<Vec<PortDescriptor>, ConvertError> {
    ports.iter().map(|p| convert_port(p, diag)).collect()
}

/// Platform strings are advisory: anything unrecognized falls back to generic linux.
pub fn convert_platform(platform: Option<&str>, diag: &mut Diagnostics) -> Platform {
    match platform.unwrap_or_default() {
        "" | "linux" => Platform::LinuxAny,
        "linux/amd64" => Platform::LinuxAmd64,
        "linux/arm64" | "linux/arm64/v8" | "linux/arm64/v7" | "linux/arm64/v6" => {
            Platform::LinuxArm64
        }
        other => {
            diag.warn(Warning::unsupported_platform(other));
            Platform::LinuxAny
        }
    }
}

/// Fill keys listed without a value from the process environment. Keys that
/// can't be resolved are dropped with a warning.
pub fn resolve_environment(
    environment: &BTreeMap<String, Option<String>>,
    diag: &mut Diagnostics,
) -> BTreeMap<String, String> {
    environment
        .iter()
        .filter_map(|(key, value)| match value {
            Some(v) => Some((key.clone(), v.clone())),
            None => match std::env::var(key) {
                Ok(v) => Some((key.clone(), v)),
                Err(_) => {
                    diag.warn(Warning::missing_env(key));
                    None
                }
            },
        })
        .collect()
}

/// Parse a compose byte value (`512m`, `1gb`, `1048576`) into MiB, rounding up.
pub fn parse_memory_mib(value: &str) -> Result<u64, ConvertError> {
    let invalid = |reason: &str| ConvertError::InvalidMemory {
        value: value.to_string(),
        reason: reason.to_string(),
    };
    let trimmed = value.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);
    let number: f64 = number.parse().map_err(|_| invalid("not a number"))?;

    let multiplier: u64 = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" | "kib" => 1024,
        "m" | "mb" | "mib" => MIB,
        "g" | "gb" | "gib" => 1024 * MIB,
        "t" | "tb" | "tib" => 1024 * 1024 * MIB,
        _ => return Err(invalid("unknown unit")),
    };

    let bytes = number * multiplier as f64;
    Ok((bytes / MIB as f64).ceil() as u64)
}

pub fn convert_service(
    service: &ServiceConfig,
    diag: &mut Diagnostics,
) -> Result<ServiceDescriptor, ConvertError> {
    let name = ServiceName::normalize(&service.name).map_err(|source| ConvertError::ServiceName {
        service: service.name.clone(),
        source,
    })?;

    let ports = convert_ports(&service.ports, diag).map_err(|e| ConvertError::Port {
        service: service.name.clone(),
        source: Box::new(e),
    })?;

    let build = service.build.as_ref().map(|build| BuildDescriptor {
        context: build.context.display().to_string(),
        dockerfile: build
            .dockerfile
            .clone()
            .unwrap_or_else(|| crate::context::DEFAULT_DOCKERFILE.to_string()),
        args: resolve_environment(&build.args, diag),
        target: build.target.clone(),
    });

    let networks = service
        .networks
        .iter()
        .map(|(name, config)| {
            let aliases = config
                .aliases
                .iter()
                .map(|a| NetworkAlias::new(a))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|source| ConvertError::NetworkAlias {
                    service: service.name.clone(),
                    source,
                })?;
            Ok(NetworkAttachment {
                name: name.clone(),
                aliases,
            })
        })
        .collect::<Result<Vec<_>, ConvertError>>()?;

    let reservations = match service
        .deploy
        .as_ref()
        .and_then(|d| d.resources.as_ref())
        .and_then(|r| r.reservations.as_ref())
    {
        Some(spec) => Some(Reservations {
            cpus: spec.cpus,
            memory_mib: spec.memory.as_deref().map(parse_memory_mib).transpose()?,
        }),
        None => None,
    };

    let healthcheck = service
        .healthcheck
        .as_ref()
        .filter(|h| !h.disable && !h.test.is_empty() && h.test[0] != "NONE")
        .map(|h| HealthcheckDescriptor {
            test: h.test.clone(),
            interval: h.interval,
            timeout: h.timeout,
            retries: h.retries,
        });

    Ok(ServiceDescriptor {
        name,
        image: service.image.clone(),
        platform: convert_platform(service.platform.as_deref(), diag),
        ports,
        environment: resolve_environment(&service.environment, diag),
        build,
        networks,
        reservations,
        healthcheck,
        command: service.command.clone().unwrap_or_default(),
        entrypoint: service.entrypoint.clone().unwrap_or_default(),
        replicas: service
            .deploy
            .as_ref()
            .and_then(|d| d.replicas)
            .unwrap_or(1),
        secrets: service.secrets.clone(),
    })
}

/// Convert every service; the first failure aborts the whole conversion.
pub fn convert_project(project: &Project, diag: &mut Diagnostics) -> Result<DeployRequest, ConvertError> {
    let services = project
        .services
        .values()
        .map(|s| convert_service(s, diag))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(DeployRequest {
        project: project.name.clone(),
        services,
    })
}
