use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used by the lifecycle manager
pub type Result<T> = std::result::Result<T, Error>;

/// Any failure raised while bringing a container network up or down
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Merge(#[from] MergeError),
    #[error(transparent)]
    Mount(#[from] MountError),
    #[error(transparent)]
    Plugin(#[from] PluginError),
    #[error(transparent)]
    Report(#[from] ReportError),
}

/// A plugin configuration directory could not be loaded
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unable to read config dir {}: {source}", path.display())]
    ReadDir { path: PathBuf, source: io::Error },

    #[error("unable to load config from {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("unable to load config from {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("unable to load config from {}: missing '{field}'", path.display())]
    MissingField { path: PathBuf, field: &'static str },
}

/// The runtime network spec could not be merged into a plugin config
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("unmarshal existing network bytes for {name:?}: {source}")]
    Base {
        name: String,
        source: serde_json::Error,
    },

    #[error("existing network bytes for {name:?} are not a JSON object")]
    BaseNotObject { name: String },

    #[error("unmarshal runtime network spec: {0}")]
    Spec(serde_json::Error),

    #[error("runtime network spec is not a JSON object: {0:?}")]
    SpecNotObject(String),

    #[error("marshal enriched config for {name:?}: {source}")]
    Encode {
        name: String,
        source: serde_json::Error,
    },
}

/// Creating or tearing down a namespace bind mount failed
#[derive(Debug, Error)]
pub enum MountError {
    #[error("invalid container handle {0:?}: must be a single path component")]
    InvalidHandle(String),

    #[error("process {pid} is gone: {} does not exist", path.display())]
    ProcessGone { pid: i32, path: PathBuf },

    #[error("unable to create bind mount root {}: {source}", path.display())]
    CreateRoot { path: PathBuf, source: io::Error },

    #[error("stale mount point {} already exists", path.display())]
    StaleMountPoint { path: PathBuf },

    #[error("unable to create mount point {}: {source}", path.display())]
    Placeholder { path: PathBuf, source: io::Error },

    #[error("bind mount {} onto {}: {errno}", netns.display(), target.display())]
    Bind {
        netns: PathBuf,
        target: PathBuf,
        errno: nix::Error,
    },

    #[error("{} is not a mount point", path.display())]
    NotMounted { path: PathBuf },

    #[error("unmount {}: {errno}", path.display())]
    Unmount { path: PathBuf, errno: nix::Error },

    #[error("unable to remove mount point {}: {source}", path.display())]
    Remove { path: PathBuf, source: io::Error },
}

/// Failure reported by the plugin execution capability
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("plugin binary {} not found", path.display())]
    NotFound { path: PathBuf },

    #[error("unable to run plugin: {0}")]
    Spawn(io::Error),

    #[error("unable to write plugin stdin: {0}")]
    Stdin(io::Error),

    #[error("plugin exited with {status}: code {code}: {msg}{}", fmt_details(.details))]
    Failed {
        status: String,
        code: u32,
        msg: String,
        details: String,
    },

    #[error("unable to decode plugin result: {0}")]
    Decode(serde_json::Error),

    /// Free-form failure, used by substitute executors
    #[error("{0}")]
    Other(String),
}

fn fmt_details(details: &str) -> String {
    if details.is_empty() {
        String::new()
    } else {
        format!(" ({details})")
    }
}

/// A plugin ADD or DEL failed for one network
#[derive(Debug, Error)]
#[error("{command} network failed for name={name}, type={plugin_type}, ifname={ifname}: {source}")]
pub struct PluginError {
    pub command: &'static str,
    pub name: String,
    pub plugin_type: String,
    pub ifname: String,
    #[source]
    pub source: ExecError,
}

/// Posting a plugin outcome to the result endpoint failed
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("{action} result: {source}")]
    Http {
        action: &'static str,
        source: reqwest::Error,
    },

    #[error("{action} result: unexpected status code: {status}")]
    Status {
        action: &'static str,
        status: reqwest::StatusCode,
    },

    #[error("{action} result: {msg}")]
    Other { action: &'static str, msg: String },
}

/// The adapter configuration is incomplete or unreadable
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config file {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("parsing config ({}): {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("missing required config '{0}'")]
    Missing(&'static str),
}

/// Container properties could not be resolved into a network spec
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("lookup container {handle:?}: {msg}")]
    Lookup { handle: String, msg: String },

    #[error("properties for {handle:?}: {msg}")]
    Properties { handle: String, msg: String },

    #[error("marshal spec for {handle:?}: {source}")]
    Marshal {
        handle: String,
        source: serde_json::Error,
    },

    #[error("unsupported garden network {0:?}: only tcp is supported")]
    UnsupportedNetwork(String),

    #[error("unable to start lookup runtime: {0}")]
    Runtime(io::Error),

    #[error("unable to build lookup client: {0}")]
    Client(reqwest::Error),
}

/// The container state on stdin is unusable
#[derive(Debug, Error)]
pub enum StateError {
    #[error("input is not valid json: {source}: {input:?}")]
    Json {
        input: String,
        source: serde_json::Error,
    },

    #[error("missing pid in container state: {0:?}")]
    MissingPid(String),
}
