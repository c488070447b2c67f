// ABOUTME: Diagnostics accumulator for non-fatal warnings during manifest translation and packaging.
// ABOUTME: Threaded explicitly through calls; anything recorded here means the run "had warnings".

use serde::Serialize;

/// Collects non-fatal warnings raised while loading, validating, converting or packaging.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!(kind = ?warning.kind, "{}", warning.message);
        self.warnings.push(warning);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Whether a warning of the given kind was collected.
    pub fn contains(&self, kind: WarningKind) -> bool {
        self.warnings.iter().any(|w| w.kind == kind)
    }

    /// Move warnings collected elsewhere (e.g. by a per-service task) into this one.
    /// They were already logged when first recorded.
    pub fn absorb(&mut self, other: Diagnostics) {
        self.warnings.extend(other.warnings);
    }
}

/// A non-fatal warning.
#[derive(Debug, Clone, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unset_variable(name: &str) -> Self {
        Self::new(
            WarningKind::UnsetVariable,
            format!("the {name:?} variable is not set; defaulting to a blank string"),
        )
    }

    pub fn missing_env(name: &str) -> Self {
        Self::new(
            WarningKind::MissingEnv,
            format!("environment variable not found: {name:?}"),
        )
    }

    pub fn unsupported_platform(platform: &str) -> Self {
        Self::new(
            WarningKind::UnsupportedPlatform,
            format!("unsupported platform: {platform:?} (assuming linux)"),
        )
    }

    pub fn undefined_network(network: &str, service: &str) -> Self {
        Self::new(
            WarningKind::UndefinedNetwork,
            format!("network {network} used by service {service} is not defined"),
        )
    }

    pub fn large_context(root: &str, files: usize) -> Self {
        Self::new(
            WarningKind::LargeContext,
            format!(
                "the build context at {root} contains more than {files} files; press Ctrl+C if this is unexpected"
            ),
        )
    }
}

/// Categories of warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// `${VAR}` interpolation hit an unset variable.
    UnsetVariable,
    /// A service environment key without a value had no process env counterpart.
    MissingEnv,
    /// Platform string not recognized; generic linux assumed.
    UnsupportedPlatform,
    /// Port without a mode; host assumed.
    PortModeDefaulted,
    /// Ingress port with a published value; host assumed.
    PublishedIngress,
    /// Ingress port with tcp/udp; http assumed.
    TcpIngress,
    /// Service references a network that isn't declared at top level.
    UndefinedNetwork,
    /// Two services normalize to the same platform name.
    NameCollision,
    /// Build context has an unexpectedly large number of files.
    LargeContext,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_starts_empty() {
        let diag = Diagnostics::default();
        assert!(!diag.has_warnings());
        assert!(diag.warnings().is_empty());
    }

    #[test]
    fn diagnostics_collects_warnings() {
        let mut diag = Diagnostics::default();

        diag.warn(Warning::unsupported_platform("windows"));
        diag.warn(Warning::undefined_network("public", "web"));

        assert!(diag.has_warnings());
        assert_eq!(diag.warnings().len(), 2);
        assert!(diag.contains(WarningKind::UndefinedNetwork));
        assert!(!diag.contains(WarningKind::TcpIngress));
    }

    #[test]
    fn absorb_keeps_order() {
        let mut first = Diagnostics::default();
        first.warn(Warning::missing_env("A"));
        let mut second = Diagnostics::default();
        second.warn(Warning::missing_env("B"));

        first.absorb(second);
        let messages: Vec<_> = first.warnings().iter().map(|w| w.message.as_str()).collect();
        assert_eq!(
            messages,
            [
                "environment variable not found: \"A\"",
                "environment variable not found: \"B\""
            ]
        );
    }

    #[test]
    fn undefined_network_message_names_both_sides() {
        let warning = Warning::undefined_network("invalid-network-name", "dfnx");
        assert_eq!(warning.kind, WarningKind::UndefinedNetwork);
        assert_eq!(
            warning.message,
            "network invalid-network-name used by service dfnx is not defined"
        );
    }
}
