// ABOUTME: Error types for compose-to-descriptor conversion.
// ABOUTME: Conversion is all-or-nothing; each variant carries the rejected value.

use thiserror::Error;

use crate::types::{NetworkAliasError, ServiceNameError};

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("port target must be an integer between 1 and 32767: {0}")]
    TargetOutOfRange(u32),

    #[error("port host_ip is not supported: {0}")]
    HostIpUnsupported(String),

    #[error("port published must be empty or equal to target: {0}")]
    PublishedMismatch(String),

    #[error("port protocol not one of [tcp udp http http2 grpc]: {0}")]
    UnknownProtocol(String),

    #[error("port mode not one of [host ingress]: {0}")]
    UnknownMode(String),

    #[error("invalid memory value {value:?}: {reason}")]
    InvalidMemory { value: String, reason: String },

    #[error("service {service:?}: {source}")]
    ServiceName {
        service: String,
        source: ServiceNameError,
    },

    #[error("service {service:?}: {source}")]
    NetworkAlias {
        service: String,
        source: NetworkAliasError,
    },

    #[error("service {service:?}: {source}")]
    Port {
        service: String,
        source: Box<ConvertError>,
    },
}
