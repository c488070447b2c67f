// ABOUTME: Validated domain types shared by the translator and the packager.
// ABOUTME: Service and project names, network aliases, and archive content digests.

mod digest;
mod network_alias;
mod project_name;
mod service_name;

pub use digest::ContentDigest;
pub use network_alias::{NetworkAlias, NetworkAliasError};
pub use project_name::{ProjectName, ProjectNameError};
pub use service_name::{MAX_SERVICE_NAME_LENGTH, ServiceName, ServiceNameError, normalize_service_name};
