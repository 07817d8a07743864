//! Durable handles to container network namespaces.
//!
//! `/proc/<pid>/ns/net` stops resolving as soon as the process exits, so the
//! namespace is bind-mounted onto `root/<handle>`. The mount keeps the
//! namespace alive and gives the later teardown a path that does not depend
//! on the process. It is the only state shared between the `up` and the
//! `down` invocation.

use nix::errno::Errno;
use nix::mount::{mount, umount2, MntFlags, MsFlags};
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

use crate::error::MountError;

/// Creates and destroys namespace bind mounts
pub trait NamespaceMounter {
    /// Path where the namespace for `handle` lives
    fn path_for(&self, handle: &str) -> Result<PathBuf, MountError>;

    /// Bind-mount the network namespace of `pid` to `path_for(handle)`
    fn create(&self, handle: &str, pid: i32) -> Result<PathBuf, MountError>;

    /// Unmount and remove `path_for(handle)`; succeeds if it is already gone
    fn destroy(&self, handle: &str) -> Result<(), MountError>;
}

/// `root/handle`, rejecting handles that would escape `root`
pub fn mount_path(root: &Path, handle: &str) -> Result<PathBuf, MountError> {
    let mut components = Path::new(handle).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) if name == handle => Ok(root.join(handle)),
        _ => Err(MountError::InvalidHandle(handle.to_string())),
    }
}

/// Kernel path of the network namespace of `pid`
pub fn netns_source(pid: i32) -> PathBuf {
    PathBuf::from(format!("/proc/{}/ns/net", pid))
}

/// Bind mounts under a root directory; requires CAP_SYS_ADMIN
#[derive(Debug, Clone)]
pub struct BindMounter {
    root: PathBuf,
}

impl BindMounter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl NamespaceMounter for BindMounter {
    fn path_for(&self, handle: &str) -> Result<PathBuf, MountError> {
        mount_path(&self.root, handle)
    }

    fn create(&self, handle: &str, pid: i32) -> Result<PathBuf, MountError> {
        let target = self.path_for(handle)?;
        let source = netns_source(pid);
        if !source.exists() {
            return Err(MountError::ProcessGone { pid, path: source });
        }

        fs::create_dir_all(&self.root).map_err(|e| MountError::CreateRoot {
            path: self.root.clone(),
            source: e,
        })?;

        match OpenOptions::new().write(true).create_new(true).open(&target) {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(MountError::StaleMountPoint { path: target });
            }
            Err(e) => {
                return Err(MountError::Placeholder {
                    path: target,
                    source: e,
                });
            }
        }

        debug!(
            "bind mounting {} onto {}",
            source.display(),
            target.display()
        );
        if let Err(errno) = mount(
            Some(source.as_path()),
            target.as_path(),
            None::<&str>,
            MsFlags::MS_BIND,
            None::<&str>,
        ) {
            let _ = fs::remove_file(&target);
            if errno == Errno::ENOENT {
                return Err(MountError::ProcessGone { pid, path: source });
            }
            return Err(MountError::Bind {
                netns: source,
                target,
                errno,
            });
        }

        info!("mounted network namespace of pid {} at {}", pid, target.display());
        Ok(target)
    }

    fn destroy(&self, handle: &str) -> Result<(), MountError> {
        let target = self.path_for(handle)?;
        match fs::symlink_metadata(&target) {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("{} already removed", target.display());
                return Ok(());
            }
            Err(e) => {
                return Err(MountError::Remove {
                    path: target,
                    source: e,
                });
            }
        }

        match umount2(target.as_path(), MntFlags::MNT_DETACH) {
            Ok(()) => {}
            Err(Errno::EINVAL) => return Err(MountError::NotMounted { path: target }),
            Err(errno) => return Err(MountError::Unmount { path: target, errno }),
        }

        fs::remove_file(&target).map_err(|e| MountError::Remove {
            path: target.clone(),
            source: e,
        })?;

        info!("unmounted and removed {}", target.display());
        Ok(())
    }
}
