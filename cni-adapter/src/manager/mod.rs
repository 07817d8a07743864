//! Network attachment lifecycle.
//!
//! A container handle moves through `UNATTACHED -> ATTACHING -> ATTACHED ->
//! DETACHING -> UNATTACHED`. The state is never stored: it is whatever the
//! namespace mount and the plugins leave behind. Callers must serialize `up`
//! and `down` for the same handle.
//!
//! Both directions fail fast without rollback. A failed `up` leaves earlier
//! interfaces attached and the namespace mounted so that `down` can clean up;
//! a failed `down` keeps the mount so a retry can reach the remaining
//! interfaces.

use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::ConfigSet;
use crate::enrich;
use crate::error::Result;
use crate::netns::NamespaceMounter;
use crate::plugin::{PluginExecutor, PluginInvoker};
use crate::report::ResultReporter;
use crate::types::RuntimeContext;

pub struct Manager<E, M> {
    invoker: PluginInvoker<E>,
    mounter: M,
    config_dir: PathBuf,
    reporter: Option<Box<dyn ResultReporter>>,
}

impl<E: PluginExecutor, M: NamespaceMounter> Manager<E, M> {
    pub fn new(executor: E, mounter: M, config_dir: impl Into<PathBuf>) -> Self {
        Self {
            invoker: PluginInvoker::new(executor),
            mounter,
            config_dir: config_dir.into(),
            reporter: None,
        }
    }

    /// Report every successful ADD and DEL to `reporter`
    pub fn with_reporter(mut self, reporter: Box<dyn ResultReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn executor(&self) -> &E {
        self.invoker.executor()
    }

    pub fn mounter(&self) -> &M {
        &self.mounter
    }

    /// Mount the namespace of `pid` and attach every configured network
    pub fn up(&self, pid: i32, handle: &str, spec: &str) -> Result<()> {
        let netns = self.mounter.create(handle, pid)?;
        let netns = netns.to_string_lossy();

        let configs = ConfigSet::load(&self.config_dir)?;
        if configs.is_empty() {
            warn!("no network configs in {}", self.config_dir.display());
        }

        for (index, conf) in configs.iter() {
            let ctx = RuntimeContext::new(handle, &netns, index);
            let enriched = enrich::merge(conf, spec)?;
            let result = self.invoker.add(&enriched, &ctx)?;
            if let Some(reporter) = &self.reporter {
                reporter.report_add(handle, &enriched.config, &result)?;
            }
        }

        info!("attached {} network(s) to {}", configs.len(), handle);
        Ok(())
    }

    /// Detach every configured network, then remove the namespace mount
    pub fn down(&self, handle: &str) -> Result<()> {
        let netns = self.mounter.path_for(handle)?;
        let netns = netns.to_string_lossy();

        let configs = ConfigSet::load(&self.config_dir)?;
        for (index, conf) in configs.iter() {
            let ctx = RuntimeContext::new(handle, &netns, index);
            self.invoker.del(conf, &ctx)?;
            if let Some(reporter) = &self.reporter {
                reporter.report_del(handle, conf)?;
            }
        }

        self.mounter.destroy(handle)?;
        info!("detached {} network(s) from {}", configs.len(), handle);
        Ok(())
    }
}
