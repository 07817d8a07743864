use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{ConfigError, LoadError};

/// Configuration for the adapter, built once at start-up
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Directory holding the CNI plugin binaries
    #[serde(default)]
    pub cni_plugin_dir: PathBuf,
    /// Directory holding the `.conf` network configurations
    #[serde(default)]
    pub cni_config_dir: PathBuf,
    /// Root under which network namespaces are bind-mounted
    #[serde(default)]
    pub bind_mount_dir: PathBuf,
    /// Directory for per-container log files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
    /// Extra environment passed to every plugin
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub plugin_env: BTreeMap<String, String>,
    /// Garden API used to look up the container network spec
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub garden: Option<GardenConfig>,
    /// Base URL that receives ADD/DEL outcomes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_url: Option<String>,
}

/// Garden API endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GardenConfig {
    #[serde(default = "default_garden_network")]
    pub network: String,
    pub address: String,
}

fn default_garden_network() -> String {
    "tcp".to_string()
}

impl AdapterConfig {
    /// Read an adapter config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let bytes = fs::read(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check that every required directory is set
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.cni_plugin_dir.as_os_str().is_empty() {
            return Err(ConfigError::Missing("cni_plugin_dir"));
        }
        if self.cni_config_dir.as_os_str().is_empty() {
            return Err(ConfigError::Missing("cni_config_dir"));
        }
        if self.bind_mount_dir.as_os_str().is_empty() {
            return Err(ConfigError::Missing("bind_mount_dir"));
        }
        Ok(self)
    }
}

/// One plugin's network configuration, as loaded from a `.conf` file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Name of the network
    pub name: String,
    /// Type of CNI plugin, which is also the plugin binary name
    pub plugin_type: String,
    /// The file contents, handed to the plugin on stdin
    pub bytes: Vec<u8>,
}

#[derive(Deserialize)]
struct Header {
    name: Option<String>,
    #[serde(rename = "type")]
    plugin_type: Option<String>,
}

impl NetworkConfig {
    /// Parse a network configuration; `path` is only used for error context
    pub fn parse(path: &Path, bytes: Vec<u8>) -> Result<Self, LoadError> {
        let header: Header = serde_json::from_slice(&bytes).map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let missing = |field| LoadError::MissingField {
            path: path.to_path_buf(),
            field,
        };
        let name = header.name.ok_or_else(|| missing("name"))?;
        let plugin_type = header
            .plugin_type
            .filter(|t| !t.is_empty())
            .ok_or_else(|| missing("type"))?;

        Ok(Self {
            name,
            plugin_type,
            bytes,
        })
    }
}

/// Network configurations in interface order.
///
/// The position of a config is its interface index, so the order must be the
/// same every time a directory is loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSet {
    configs: Vec<NetworkConfig>,
}

impl ConfigSet {
    /// Load every `.conf` file directly inside `dir`, sorted by path
    pub fn load(dir: &Path) -> Result<Self, LoadError> {
        let read_dir_err = |source| LoadError::ReadDir {
            path: dir.to_path_buf(),
            source,
        };

        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).map_err(read_dir_err)? {
            let path = entry.map_err(read_dir_err)?.path();
            let is_conf = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(".conf"));
            if is_conf && path.is_file() {
                paths.push(path);
            } else {
                debug!("skipping {}", path.display());
            }
        }

        let mut configs = Vec::with_capacity(paths.len());
        for path in paths.into_iter().sorted() {
            let bytes = fs::read(&path).map_err(|source| LoadError::Read {
                path: path.clone(),
                source,
            })?;
            let conf = NetworkConfig::parse(&path, bytes)?;
            info!(
                "loaded config name={} type={} from {}",
                conf.name,
                conf.plugin_type,
                path.display()
            );
            configs.push(conf);
        }

        Ok(Self { configs })
    }

    /// Configs paired with their interface index
    pub fn iter(&self) -> impl Iterator<Item = (usize, &NetworkConfig)> {
        self.configs.iter().enumerate()
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}
