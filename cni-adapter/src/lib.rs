//! OCI lifecycle hook that attaches containers to networks with CNI plugins
//!
//! On `up` the hook:
//! - Bind-mounts the container's network namespace under a root directory
//! - Loads the `.conf` network configs in lexical order
//! - Merges the container's network spec into each config
//! - Runs every plugin with ADD, naming interfaces `eth0`, `eth1`, ...
//!
//! On `down` it runs every plugin with DEL in the same order and removes the
//! namespace mount.

pub mod commands;
pub mod config;
pub mod enrich;
pub mod error;
pub mod logging;
pub mod lookup;
pub mod manager;
pub mod netns;
pub mod plugin;
pub mod report;
pub mod types;

// Re-export commonly used items
pub use config::{AdapterConfig, ConfigSet, NetworkConfig};
pub use enrich::{merge, EnrichedConfig};
pub use error::{Error, Result};
pub use manager::Manager;
pub use netns::{BindMounter, NamespaceMounter};
pub use plugin::{ExecPlugin, PluginExecutor, PluginInvoker};
pub use report::{HttpReporter, ResultReporter};
pub use types::RuntimeContext;
