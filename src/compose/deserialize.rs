// ABOUTME: Custom serde deserializers for the flexible compose syntaxes.
// ABOUTME: Short/long ports, builds, env lists vs maps, network lists vs maps, commands, volumes.

use serde::Deserialize;
use serde::de::Error as _;
use std::collections::BTreeMap;

use super::{BuildConfig, MountKind, PortConfig, ServiceNetworkConfig, VolumeMount};

pub fn deserialize_nullable_map<'de, D, T>(deserializer: D) -> Result<BTreeMap<String, T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    let map: Option<BTreeMap<String, Option<T>>> = Option::deserialize(deserializer)?;
    Ok(map
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k, v.unwrap_or_default()))
        .collect())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BuildEntry {
    Short(String),
    Long(BuildConfig),
}

pub fn deserialize_build<'de, D>(deserializer: D) -> Result<Option<BuildConfig>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<BuildEntry>::deserialize(deserializer)? {
        None => None,
        Some(BuildEntry::Short(context)) => Some(BuildConfig {
            context: context.into(),
            dockerfile: None,
            args: BTreeMap::new(),
            target: None,
        }),
        Some(BuildEntry::Long(build)) => Some(build),
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PortEntry {
    Number(u32),
    Short(String),
    Long(PortConfig),
}

pub fn deserialize_ports<'de, D>(deserializer: D) -> Result<Vec<PortConfig>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let entries: Option<Vec<PortEntry>> = Option::deserialize(deserializer)?;
    let mut ports = Vec::new();
    for entry in entries.unwrap_or_default() {
        match entry {
            PortEntry::Number(target) => ports.push(short_port(String::new(), String::new(), target, "")),
            PortEntry::Short(spec) => ports.extend(parse_port_short(&spec).map_err(D::Error::custom)?),
            PortEntry::Long(port) => ports.push(port),
        }
    }
    Ok(ports)
}

// Short syntax always means ingress with tcp unless a protocol is given,
// matching the reference compose loader.
fn short_port(host_ip: String, published: String, target: u32, protocol: &str) -> PortConfig {
    PortConfig {
        mode: "ingress".to_string(),
        host_ip,
        target,
        published,
        protocol: if protocol.is_empty() { "tcp" } else { protocol }.to_string(),
    }
}

/// Parse `[host_ip:][published:]target[/protocol]`. A target range expands into
/// one port per target; a published range against a single target is kept as-is.
pub fn parse_port_short(spec: &str) -> Result<Vec<PortConfig>, String> {
    let spec = spec.trim();
    let (rest, protocol) = match spec.rsplit_once('/') {
        Some((rest, protocol)) => (rest, protocol),
        None => (spec, ""),
    };

    let (host_ip, rest) = if let Some(stripped) = rest.strip_prefix('[') {
        let (ip, after) = stripped
            .split_once(']')
            .ok_or_else(|| format!("invalid port {spec:?}: unterminated IPv6 address"))?;
        let after = after
            .strip_prefix(':')
            .ok_or_else(|| format!("invalid port {spec:?}: expected ':' after host IP"))?;
        (ip.to_string(), after)
    } else {
        match rest.matches(':').count() {
            0 | 1 => (String::new(), rest),
            2 => {
                let (ip, after) = rest.split_once(':').unwrap_or(("", rest));
                (ip.to_string(), after)
            }
            _ => return Err(format!("invalid port {spec:?}: too many ':' separators")),
        }
    };

    let (published, target) = match rest.split_once(':') {
        Some((published, target)) => (published, target),
        None => ("", rest),
    };

    let (first, last) = parse_range(target).map_err(|e| format!("invalid port {spec:?}: {e}"))?;
    if first == last {
        return Ok(vec![short_port(host_ip, published.to_string(), first, protocol)]);
    }

    let published_range = if published.is_empty() {
        None
    } else {
        let (p_first, p_last) =
            parse_range(published).map_err(|e| format!("invalid port {spec:?}: {e}"))?;
        if p_last - p_first != last - first {
            return Err(format!(
                "invalid port {spec:?}: published and target ranges differ in size"
            ));
        }
        Some(p_first)
    };

    Ok((first..=last)
        .map(|target| {
            let published = published_range
                .map(|p| (p + target - first).to_string())
                .unwrap_or_default();
            short_port(host_ip.clone(), published, target, protocol)
        })
        .collect())
}

/// Highest port number a short-syntax entry may name.
const MAX_PORT: u32 = 65535;

// Bounded before expansion so a huge range is a load error, not a huge allocation.
fn parse_range(value: &str) -> Result<(u32, u32), String> {
    let parse = |v: &str| {
        let port = v
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("{v:?} is not a port number"))?;
        if port > MAX_PORT {
            return Err(format!("port {port} is above {MAX_PORT}"));
        }
        Ok(port)
    };
    match value.split_once('-') {
        Some((first, last)) => {
            let (first, last) = (parse(first)?, parse(last)?);
            if last < first {
                return Err(format!("range {value:?} is reversed"));
            }
            Ok((first, last))
        }
        None => {
            let port = parse(value)?;
            Ok((port, port))
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Published {
    Number(u64),
    Text(String),
}

pub fn deserialize_published<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<Published>::deserialize(deserializer)? {
        None => String::new(),
        Some(Published::Number(n)) => n.to_string(),
        Some(Published::Text(s)) => s,
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EnvEntries {
    List(Vec<String>),
    Map(BTreeMap<String, serde_yaml::Value>),
}

/// `environment` and `build.args` accept `["K=V", "K"]` or `{K: V, K: null}`.
pub fn deserialize_environment<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let mut env = BTreeMap::new();
    match Option::<EnvEntries>::deserialize(deserializer)? {
        None => {}
        Some(EnvEntries::List(items)) => {
            for item in items {
                match item.split_once('=') {
                    Some((k, v)) => env.insert(k.to_string(), Some(v.to_string())),
                    None => env.insert(item, None),
                };
            }
        }
        Some(EnvEntries::Map(map)) => {
            for (k, v) in map {
                let value = match v {
                    serde_yaml::Value::Null => None,
                    serde_yaml::Value::String(s) => Some(s),
                    serde_yaml::Value::Bool(b) => Some(b.to_string()),
                    serde_yaml::Value::Number(n) => Some(n.to_string()),
                    _ => {
                        return Err(D::Error::custom(format!(
                            "environment value for {k} must be a scalar"
                        )));
                    }
                };
                env.insert(k, value);
            }
        }
    }
    Ok(env)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListOrString {
    One(String),
    Many(Vec<String>),
}

pub fn deserialize_list_or_string<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<ListOrString>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(ListOrString::One(s)) => vec![s],
        Some(ListOrString::Many(v)) => v,
    })
}

/// A string command is split the way a POSIX shell would tokenize it.
pub fn deserialize_command<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<ListOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(ListOrString::One(s)) => split_command(&s).map(Some).map_err(D::Error::custom),
        Some(ListOrString::Many(v)) => Ok(Some(v)),
    }
}

/// A string healthcheck test runs through the container's shell.
pub fn deserialize_health_test<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<ListOrString>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(ListOrString::One(s)) => vec!["CMD-SHELL".to_string(), s],
        Some(ListOrString::Many(v)) => v,
    })
}

pub fn split_command(input: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => current.push(c),
                        None => return Err(format!("unterminated quote in {input:?}")),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(c @ ('"' | '\\' | '$' | '`')) => current.push(c),
                            Some(c) => {
                                current.push('\\');
                                current.push(c);
                            }
                            None => return Err(format!("unterminated quote in {input:?}")),
                        },
                        Some(c) => current.push(c),
                        None => return Err(format!("unterminated quote in {input:?}")),
                    }
                }
            }
            '\\' => {
                in_word = true;
                if let Some(c) = chars.next() {
                    current.push(c);
                }
            }
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NetworkEntries {
    List(Vec<String>),
    Map(BTreeMap<String, Option<ServiceNetworkConfig>>),
}

pub fn deserialize_service_networks<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, ServiceNetworkConfig>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<NetworkEntries>::deserialize(deserializer)? {
        None => BTreeMap::new(),
        Some(NetworkEntries::List(names)) => names
            .into_iter()
            .map(|n| (n, ServiceNetworkConfig::default()))
            .collect(),
        Some(NetworkEntries::Map(map)) => map
            .into_iter()
            .map(|(k, v)| (k, v.unwrap_or_default()))
            .collect(),
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SecretEntry {
    Name(String),
    Long { source: String },
}

pub fn deserialize_secrets<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let entries: Option<Vec<SecretEntry>> = Option::deserialize(deserializer)?;
    Ok(entries
        .unwrap_or_default()
        .into_iter()
        .map(|e| match e {
            SecretEntry::Name(name) => name,
            SecretEntry::Long { source } => source,
        })
        .collect())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum VolumeEntry {
    Short(String),
    Long {
        #[serde(rename = "type")]
        kind: MountKind,
        #[serde(default)]
        source: Option<String>,
        target: String,
    },
}

pub fn deserialize_volumes<'de, D>(deserializer: D) -> Result<Vec<VolumeMount>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let entries: Option<Vec<VolumeEntry>> = Option::deserialize(deserializer)?;
    entries
        .unwrap_or_default()
        .into_iter()
        .map(|e| match e {
            VolumeEntry::Short(spec) => parse_volume_short(&spec).map_err(D::Error::custom),
            VolumeEntry::Long {
                kind,
                source,
                target,
            } => Ok(VolumeMount {
                kind,
                source,
                target,
            }),
        })
        .collect()
}

fn parse_volume_short(spec: &str) -> Result<VolumeMount, String> {
    let mut parts = spec.splitn(3, ':');
    let first = parts.next().unwrap_or_default();
    match parts.next() {
        None if first.is_empty() => Err("volume cannot be empty".to_string()),
        None => Ok(VolumeMount {
            kind: MountKind::Volume,
            source: None,
            target: first.to_string(),
        }),
        Some(target) => {
            let is_path = first.starts_with(['.', '/', '~']);
            Ok(VolumeMount {
                kind: if is_path {
                    MountKind::Bind
                } else {
                    MountKind::Volume
                },
                source: Some(first.to_string()),
                target: target.to_string(),
            })
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

pub fn deserialize_cpus<'de, D>(deserializer: D) -> Result<Option<f32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(Some(n as f32)),
        Some(NumberOrString::Text(s)) => s
            .trim()
            .parse::<f32>()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("invalid cpus value: {s:?}"))),
    }
}

pub fn deserialize_memory<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<NumberOrString>::deserialize(deserializer)? {
        None => None,
        Some(NumberOrString::Number(n)) => Some(format!("{}", n as u64)),
        Some(NumberOrString::Text(s)) => Some(s),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_port_defaults_to_ingress_tcp() {
        let ports = parse_port_short("8080:80").unwrap();
        assert_eq!(
            ports,
            vec![PortConfig {
                mode: "ingress".into(),
                host_ip: String::new(),
                target: 80,
                published: "8080".into(),
                protocol: "tcp".into(),
            }]
        );
    }

    #[test]
    fn short_port_with_host_ip_and_protocol() {
        let ports = parse_port_short("127.0.0.1:53:53/udp").unwrap();
        assert_eq!(ports[0].host_ip, "127.0.0.1");
        assert_eq!(ports[0].published, "53");
        assert_eq!(ports[0].protocol, "udp");
    }

    #[test]
    fn short_port_ipv6_host() {
        let ports = parse_port_short("[::1]:80:80").unwrap();
        assert_eq!(ports[0].host_ip, "::1");
        assert_eq!(ports[0].target, 80);
    }

    #[test]
    fn short_port_target_range_expands() {
        let ports = parse_port_short("9000-9002").unwrap();
        let targets: Vec<_> = ports.iter().map(|p| p.target).collect();
        assert_eq!(targets, [9000, 9001, 9002]);
        assert!(ports.iter().all(|p| p.published.is_empty()));
    }

    #[test]
    fn short_port_published_range_kept_verbatim() {
        let ports = parse_port_short("1111-2222:80").unwrap();
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].published, "1111-2222");
    }

    #[test]
    fn short_port_mismatched_ranges_rejected() {
        assert!(parse_port_short("8000-8001:9000-9005").is_err());
        assert!(parse_port_short("http").is_err());
    }

    #[test]
    fn short_port_range_above_65535_rejected() {
        let err = parse_port_short("1-2000000").unwrap_err();
        assert!(err.contains("above 65535"), "{err}");
        assert!(parse_port_short("0-4294967295").is_err());
        assert!(parse_port_short("70000:80").is_err());
        assert!(parse_port_short("99999").is_err());
        assert_eq!(parse_port_short("65534-65535").unwrap().len(), 2);
    }

    #[test]
    fn split_command_handles_quotes() {
        assert_eq!(
            split_command(r#"sh -c 'echo "hi there"' "a\"b" c\ d"#).unwrap(),
            ["sh", "-c", "echo \"hi there\"", "a\"b", "c d"]
        );
        assert_eq!(split_command("  ").unwrap(), Vec::<String>::new());
        assert!(split_command("echo 'oops").is_err());
    }

    #[test]
    fn volume_short_syntax_distinguishes_binds() {
        let bind = parse_volume_short("./data:/data").unwrap();
        assert_eq!(bind.kind, MountKind::Bind);
        let named = parse_volume_short("db-data:/var/lib/db:ro").unwrap();
        assert_eq!(named.kind, MountKind::Volume);
        assert_eq!(named.source.as_deref(), Some("db-data"));
        assert_eq!(named.target, "/var/lib/db");
        let anonymous = parse_volume_short("/cache").unwrap();
        assert_eq!(anonymous.source, None);
    }
}
