use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::info;

use crate::config::AdapterConfig;
use crate::error::{ConfigError, StateError};
use crate::lookup::{self, GardenClient};
use crate::manager::Manager;
use crate::netns::BindMounter;
use crate::plugin::ExecPlugin;
use crate::report::HttpReporter;

/// Printed when the hook is run by hand
pub const HOOK_USAGE: &str =
    "this is a OCI prestart/poststop hook.  see https://github.com/opencontainers/specs/blob/master/runtime-config.md";

/// OCI prestart/poststop hook that wires containers up with CNI plugins
#[derive(Parser, Debug)]
#[clap(name = "cni-adapter", version, about)]
pub struct Cli {
    /// Lifecycle action to run
    #[clap(long, value_enum)]
    pub action: Action,

    /// Container handle
    #[clap(long)]
    pub handle: String,

    /// Runtime network spec; looked up from Garden when omitted
    #[clap(long)]
    pub network: Option<String>,

    /// JSON adapter config file
    #[clap(long, alias = "configFile")]
    pub config_file: Option<PathBuf>,

    /// Directory holding the CNI plugin binaries
    #[clap(long)]
    pub cni_plugin_dir: Option<PathBuf>,

    /// Directory holding the `.conf` network configurations
    #[clap(long)]
    pub cni_config_dir: Option<PathBuf>,

    /// Root under which network namespaces are bind-mounted
    #[clap(long)]
    pub bind_mount_dir: Option<PathBuf>,

    /// Directory for per-container log files
    #[clap(long)]
    pub log_dir: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Attach networks (prestart)
    Up,
    /// Detach networks (poststop)
    Down,
}

/// True when the hook was run without arguments or asked for help
pub fn wants_usage(args: &[OsString]) -> bool {
    match args.get(1).and_then(|a| a.to_str()) {
        None => args.len() <= 1,
        Some(arg) => arg == "-h" || arg == "--help",
    }
}

/// Build the adapter config from the config file and flag overrides
pub fn resolve_config(cli: &Cli) -> Result<AdapterConfig, ConfigError> {
    let mut config = match &cli.config_file {
        Some(path) => AdapterConfig::from_file(path)?,
        None => AdapterConfig::default(),
    };

    if let Some(dir) = &cli.cni_plugin_dir {
        config.cni_plugin_dir = dir.clone();
    }
    if let Some(dir) = &cli.cni_config_dir {
        config.cni_config_dir = dir.clone();
    }
    if let Some(dir) = &cli.bind_mount_dir {
        config.bind_mount_dir = dir.clone();
    }
    if let Some(dir) = &cli.log_dir {
        config.log_dir = Some(dir.clone());
    }

    config.validate()
}

/// Container state handed to the hook on stdin
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ContainerState {
    #[serde(default)]
    pub pid: Option<i32>,
}

/// Parse the container state from stdin
pub fn parse_state(input: &[u8]) -> Result<ContainerState, StateError> {
    serde_json::from_slice(input).map_err(|source| StateError::Json {
        input: String::from_utf8_lossy(input).into_owned(),
        source,
    })
}

impl ContainerState {
    pub fn require_pid(&self) -> Result<i32, StateError> {
        self.pid
            .ok_or_else(|| StateError::MissingPid(format!("{:?}", self)))
    }
}

/// Build a manager backed by real plugins and bind mounts
pub fn build_manager(config: &AdapterConfig) -> Result<Manager<ExecPlugin, BindMounter>> {
    let executor = ExecPlugin::new(&config.cni_plugin_dir).with_env(config.plugin_env.clone());
    let mounter = BindMounter::new(&config.bind_mount_dir);
    let mut manager = Manager::new(executor, mounter, &config.cni_config_dir);

    if let Some(url) = &config.report_url {
        let reporter = HttpReporter::new(url).context("Failed to create result reporter")?;
        manager = manager.with_reporter(Box::new(reporter));
    }

    Ok(manager)
}

/// Network spec for `up`: the flag, else the Garden properties, else empty
pub fn resolve_network_spec(cli: &Cli, config: &AdapterConfig) -> Result<String> {
    if let Some(spec) = &cli.network {
        return Ok(spec.clone());
    }

    match &config.garden {
        Some(garden) => {
            let client = GardenClient::new(garden)?;
            lookup::network_spec(&client, &cli.handle).context("get network spec")
        }
        None => Ok(String::new()),
    }
}

/// Execute the up action
pub fn cmd_up(cli: &Cli, config: &AdapterConfig, state: &ContainerState) -> Result<()> {
    let pid = state.require_pid()?;
    let spec = resolve_network_spec(cli, config)?;
    let manager = build_manager(config)?;

    info!("up handle={} pid={} spec={:?}", cli.handle, pid, spec);
    manager.up(pid, &cli.handle, &spec).context("up failed")
}

/// Execute the down action
pub fn cmd_down(cli: &Cli, config: &AdapterConfig) -> Result<()> {
    let manager = build_manager(config)?;

    info!("down handle={}", cli.handle);
    manager.down(&cli.handle).context("down failed")
}

/// Main entry point for the hook, once arguments and config are resolved
pub fn run_hook(cli: &Cli, config: &AdapterConfig, stdin: &[u8]) -> Result<()> {
    let state = parse_state(stdin)?;

    match cli.action {
        Action::Up => cmd_up(cli, config, &state),
        Action::Down => cmd_down(cli, config),
    }
}
