// Shared test doubles. Each test binary uses a different subset.
#![allow(dead_code)]

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use cni_adapter::error::{ExecError, MountError, ReportError};
use cni_adapter::netns::{mount_path, NamespaceMounter};
use cni_adapter::types::{Command, IPConfig, Result as CniResult, RuntimeContext};
use cni_adapter::{NetworkConfig, PluginExecutor, ResultReporter};

/// Write `<10*index>-plugin-<index>.conf` naming network `some-net-<index>`
/// and plugin type `plugin-<index>`
pub fn write_config(dir: &Path, index: usize) -> PathBuf {
    let path = dir.join(format!("{}-plugin-{}.conf", 10 * index, index));
    let body = format!(
        r#"{{"cniVersion": "0.1.0", "name": "some-net-{}", "type": "plugin-{}"}}"#,
        index, index
    );
    fs::write(&path, body).unwrap();
    path
}

/// Simulates namespace mounts with plain files holding the pid
#[derive(Debug)]
pub struct FakeMounter {
    root: PathBuf,
}

impl FakeMounter {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn is_mounted(&self, handle: &str) -> bool {
        self.root.join(handle).exists()
    }
}

impl NamespaceMounter for FakeMounter {
    fn path_for(&self, handle: &str) -> Result<PathBuf, MountError> {
        mount_path(&self.root, handle)
    }

    fn create(&self, handle: &str, pid: i32) -> Result<PathBuf, MountError> {
        let target = self.path_for(handle)?;
        if pid <= 0 {
            return Err(MountError::ProcessGone {
                pid,
                path: PathBuf::from(format!("/proc/{}/ns/net", pid)),
            });
        }
        if target.exists() {
            return Err(MountError::StaleMountPoint { path: target });
        }
        fs::create_dir_all(&self.root).unwrap();
        fs::write(&target, pid.to_string()).unwrap();
        Ok(target)
    }

    fn destroy(&self, handle: &str) -> Result<(), MountError> {
        let target = self.path_for(handle)?;
        if target.exists() {
            fs::remove_file(&target).unwrap();
        }
        Ok(())
    }
}

/// One recorded plugin invocation
#[derive(Debug, Clone)]
pub struct Call {
    pub command: Command,
    pub name: String,
    pub plugin_type: String,
    pub ctx: RuntimeContext,
    pub stdin: serde_json::Value,
}

/// Records invocations instead of running plugins
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    pub calls: RefCell<Vec<Call>>,
    /// Fail this command for this plugin type
    pub fail: Option<(Command, String)>,
}

impl RecordingExecutor {
    pub fn failing(command: Command, plugin_type: &str) -> Self {
        Self {
            calls: RefCell::default(),
            fail: Some((command, plugin_type.to_string())),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn calls_for(&self, command: Command) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.command == command)
            .collect()
    }
}

impl PluginExecutor for RecordingExecutor {
    fn invoke(
        &self,
        command: Command,
        config: &NetworkConfig,
        ctx: &RuntimeContext,
    ) -> Result<Option<CniResult>, ExecError> {
        self.calls.borrow_mut().push(Call {
            command,
            name: config.name.clone(),
            plugin_type: config.plugin_type.clone(),
            ctx: ctx.clone(),
            stdin: serde_json::from_slice(&config.bytes).unwrap(),
        });

        if let Some((fail_command, fail_type)) = &self.fail {
            if *fail_command == command && *fail_type == config.plugin_type {
                return Err(ExecError::Other("potato".to_string()));
            }
        }

        match command {
            Command::Add => Ok(Some(CniResult {
                cni_version: "1.0.0".to_string(),
                ips: Some(vec![IPConfig {
                    interface: Some(0),
                    address: "10.255.0.2/24".to_string(),
                    gateway: None,
                }]),
                ..CniResult::default()
            })),
            Command::Del => Ok(None),
        }
    }
}

/// Records reports; shares its log with the test through an Rc
#[derive(Debug, Default, Clone)]
pub struct RecordingReporter {
    pub log: std::rc::Rc<RefCell<Vec<String>>>,
    pub fail: bool,
}

impl ResultReporter for RecordingReporter {
    fn report_add(&self, container_id: &str, config: &NetworkConfig, result: &CniResult) -> Result<(), ReportError> {
        self.log.borrow_mut().push(format!(
            "add {} {} {}",
            container_id,
            config.plugin_type,
            result.addresses().join(",")
        ));
        if self.fail {
            return Err(ReportError::Other {
                action: "add",
                msg: "endpoint down".to_string(),
            });
        }
        Ok(())
    }

    fn report_del(&self, container_id: &str, config: &NetworkConfig) -> Result<(), ReportError> {
        self.log
            .borrow_mut()
            .push(format!("del {} {}", container_id, config.plugin_type));
        Ok(())
    }
}
