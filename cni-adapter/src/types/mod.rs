use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-interface arguments handed to a plugin invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeContext {
    /// Container ID (the container handle)
    pub container_id: String,
    /// Network namespace path
    pub netns: String,
    /// Interface name
    pub ifname: String,
}

impl RuntimeContext {
    /// Build the context for the network at `index` in a config set
    pub fn new(container_id: &str, netns: &str, index: usize) -> Self {
        Self {
            container_id: container_id.to_string(),
            netns: netns.to_string(),
            ifname: interface_name(index),
        }
    }
}

/// Interface name for the network at zero-based position `index`
pub fn interface_name(index: usize) -> String {
    format!("eth{}", index)
}

/// CNI plugin command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Add,
    Del,
}

impl Command {
    /// Value of `CNI_COMMAND`
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Add => "ADD",
            Command::Del => "DEL",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result printed by a plugin on a successful ADD.
///
/// Accepts both the current layout (`interfaces`/`ips`/`routes`) and the
/// legacy `ip4`/`ip6` blocks of CNI 0.1 and 0.2.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Result {
    /// CNI specification version
    #[serde(rename = "cniVersion", default)]
    pub cni_version: String,
    /// Interfaces created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interfaces: Option<Vec<Interface>>,
    /// IP configurations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ips: Option<Vec<IPConfig>>,
    /// Legacy IPv4 configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip4: Option<LegacyIPConfig>,
    /// Legacy IPv6 configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip6: Option<LegacyIPConfig>,
    /// DNS configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns: Option<DNS>,
    /// Routes to configure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routes: Option<Vec<Route>>,
}

/// Interface information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interface {
    /// Interface name
    pub name: String,
    /// MAC address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    /// Sandbox path (network namespace)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sandbox: Option<String>,
}

/// IP configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IPConfig {
    /// Interface index this IP is assigned to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<usize>,
    /// IP address with prefix length
    pub address: String,
    /// Gateway
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
}

/// `ip4`/`ip6` block of a pre-0.3 result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyIPConfig {
    /// IP address with prefix length
    pub ip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routes: Option<Vec<Route>>,
}

/// DNS configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DNS {
    /// DNS nameservers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nameservers: Option<Vec<String>>,
    /// DNS search domains
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<Vec<String>>,
    /// DNS options
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

/// Route configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Destination CIDR
    pub dst: String,
    /// Gateway for this route
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gw: Option<String>,
}

impl Result {
    /// Every address assigned by the plugin, in result order
    pub fn addresses(&self) -> Vec<&str> {
        let mut addrs: Vec<&str> = self
            .ips
            .iter()
            .flatten()
            .map(|ip| ip.address.as_str())
            .collect();
        addrs.extend(self.ip4.iter().chain(self.ip6.iter()).map(|ip| ip.ip.as_str()));
        addrs
    }
}

impl fmt::Display for Result {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let addrs = self.addresses();
        if addrs.is_empty() {
            write!(f, "cniVersion={} (no addresses)", self.cni_version)
        } else {
            write!(f, "cniVersion={} addresses={}", self.cni_version, addrs.join(","))
        }
    }
}

/// Error reply printed by a failing plugin
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorReply {
    #[serde(rename = "cniVersion", default)]
    pub cni_version: String,
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub details: String,
}
