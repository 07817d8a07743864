use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command as Process, Output, Stdio};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::NetworkConfig;
use crate::enrich::EnrichedConfig;
use crate::error::{ExecError, PluginError};
use crate::types::{Command, ErrorReply, Result as CniResult, RuntimeContext};

/// Runs one plugin command against one network.
///
/// ADD returns the decoded plugin result; DEL returns `None`.
pub trait PluginExecutor {
    fn invoke(
        &self,
        command: Command,
        config: &NetworkConfig,
        ctx: &RuntimeContext,
    ) -> Result<Option<CniResult>, ExecError>;
}

const SPAWN_ATTEMPTS: u32 = 5;

/// Executes plugin binaries from a directory using the CNI exec protocol
#[derive(Debug, Clone)]
pub struct ExecPlugin {
    /// Directory holding the plugin binaries, also exported as `CNI_PATH`
    plugin_dir: PathBuf,
    /// Extra environment for every plugin
    extra_env: BTreeMap<String, String>,
}

impl ExecPlugin {
    pub fn new(plugin_dir: impl Into<PathBuf>) -> Self {
        Self {
            plugin_dir: plugin_dir.into(),
            extra_env: BTreeMap::new(),
        }
    }

    /// Add environment variables passed to every plugin
    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.extra_env.extend(env);
        self
    }

    fn run(&self, binary: &Path, command: Command, stdin: &[u8], ctx: &RuntimeContext) -> Result<Output, ExecError> {
        let mut attempt = 1;
        let mut child = loop {
            let spawned = Process::new(binary)
                .env("CNI_COMMAND", command.as_str())
                .env("CNI_CONTAINERID", &ctx.container_id)
                .env("CNI_NETNS", &ctx.netns)
                .env("CNI_IFNAME", &ctx.ifname)
                .env("CNI_PATH", &self.plugin_dir)
                .env("CNI_ARGS", "")
                .envs(&self.extra_env)
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .spawn();

            match spawned {
                Ok(child) => break child,
                // The binary may still be open for writing by whoever installed it
                Err(e) if e.raw_os_error() == Some(nix::libc::ETXTBSY) && attempt < SPAWN_ATTEMPTS => {
                    warn!("{} is busy, retrying", binary.display());
                    thread::sleep(Duration::from_millis(50 * u64::from(attempt)));
                    attempt += 1;
                }
                Err(e) => return Err(ExecError::Spawn(e)),
            }
        };

        if let Some(mut pipe) = child.stdin.take() {
            match pipe.write_all(stdin) {
                Ok(()) => {}
                // A plugin may exit without reading its config
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {}
                Err(e) => return Err(ExecError::Stdin(e)),
            }
        }

        child.wait_with_output().map_err(ExecError::Spawn)
    }
}

fn failure(output: &Output) -> ExecError {
    let status = output.status.to_string();
    match serde_json::from_slice::<ErrorReply>(&output.stdout) {
        Ok(reply) if !reply.msg.is_empty() || reply.code != 0 => ExecError::Failed {
            status,
            code: reply.code,
            msg: reply.msg,
            details: reply.details,
        },
        _ => ExecError::Failed {
            status,
            code: 0,
            msg: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            details: String::new(),
        },
    }
}

impl PluginExecutor for ExecPlugin {
    fn invoke(
        &self,
        command: Command,
        config: &NetworkConfig,
        ctx: &RuntimeContext,
    ) -> Result<Option<CniResult>, ExecError> {
        let binary = self.plugin_dir.join(&config.plugin_type);
        if !binary.is_file() {
            return Err(ExecError::NotFound { path: binary });
        }

        debug!(
            "exec {} {} ifname={} netns={}",
            binary.display(),
            command,
            ctx.ifname,
            ctx.netns
        );
        let output = self.run(&binary, command, &config.bytes, ctx)?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            debug!("{} stderr: {}", config.plugin_type, stderr.trim());
        }

        if !output.status.success() {
            return Err(failure(&output));
        }

        match command {
            Command::Add => serde_json::from_slice(&output.stdout)
                .map(Some)
                .map_err(ExecError::Decode),
            Command::Del => Ok(None),
        }
    }
}

/// Boundary between the lifecycle manager and plugin execution
#[derive(Debug, Clone)]
pub struct PluginInvoker<E> {
    executor: E,
}

impl<E: PluginExecutor> PluginInvoker<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Attach one network
    pub fn add(&self, config: &EnrichedConfig, ctx: &RuntimeContext) -> Result<CniResult, PluginError> {
        let conf = &config.config;
        let result = self
            .executor
            .invoke(Command::Add, conf, ctx)
            .map_err(|source| plugin_error(Command::Add, conf, ctx, source))?
            .unwrap_or_default();

        info!(
            "up result for name={}, type={}, ifname={}: {}",
            conf.name, conf.plugin_type, ctx.ifname, result
        );
        Ok(result)
    }

    /// Detach one network
    pub fn del(&self, config: &NetworkConfig, ctx: &RuntimeContext) -> Result<(), PluginError> {
        self.executor
            .invoke(Command::Del, config, ctx)
            .map_err(|source| plugin_error(Command::Del, config, ctx, source))?;

        info!(
            "down complete for name={}, type={}, ifname={}",
            config.name, config.plugin_type, ctx.ifname
        );
        Ok(())
    }
}

fn plugin_error(command: Command, config: &NetworkConfig, ctx: &RuntimeContext, source: ExecError) -> PluginError {
    PluginError {
        command: match command {
            Command::Add => "add",
            Command::Del => "del",
        },
        name: config.name.clone(),
        plugin_type: config.plugin_type.clone(),
        ifname: ctx.ifname.clone(),
        source,
    }
}
