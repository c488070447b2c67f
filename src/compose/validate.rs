// ABOUTME: Platform constraint checks for a loaded project.
// ABOUTME: Fails on bad service names; repairs port modes and warns on undeclared networks.

use std::collections::BTreeMap;

use super::{Project, ValidationError};
use crate::diagnostics::{Diagnostics, Warning, WarningKind};
use crate::types::ServiceName;

/// Network every service joins when it names none.
pub const DEFAULT_NETWORK: &str = "default";

/// Check `project` against platform constraints, repairing what can be repaired.
///
/// A missing `deploy` section is fine; resource reservations are optional.
pub fn validate_project(
    project: &mut Project,
    diag: &mut Diagnostics,
) -> Result<(), ValidationError> {
    let mut normalized: BTreeMap<ServiceName, &str> = BTreeMap::new();

    for (key, service) in project.services.iter_mut() {
        let name = ServiceName::normalize(&service.name).map_err(|source| {
            ValidationError::ServiceName {
                service: service.name.clone(),
                source,
            }
        })?;

        if service.image.is_none() && service.build.is_none() {
            return Err(ValidationError::MissingImage(service.name.clone()));
        }

        if let Some(previous) = normalized.insert(name.clone(), key.as_str()) {
            diag.warn(Warning::new(
                WarningKind::NameCollision,
                format!("services {previous:?} and {key:?} both deploy as {name}"),
            ));
        }

        for network in service.networks.keys() {
            if network != DEFAULT_NETWORK && !project.networks.contains_key(network) {
                diag.warn(Warning::undefined_network(network, &service.name));
            }
        }

        for port in service.ports.iter_mut().filter(|p| p.mode.is_empty()) {
            diag.warn(Warning::new(
                WarningKind::PortModeDefaulted,
                format!(
                    "service {}: no port mode was specified for {}; assuming 'host' (add 'mode' to silence)",
                    service.name, port.target
                ),
            ));
            port.mode = "host".to_string();
        }
    }

    Ok(())
}
