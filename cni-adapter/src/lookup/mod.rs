use std::collections::{BTreeMap, HashMap};
use tokio::runtime::Runtime;
use tracing::debug;

use crate::config::GardenConfig;
use crate::error::LookupError;

const NETWORK_PREFIX: &str = "network.";

/// Source of container properties
pub trait ContainerProperties {
    fn properties(&self, handle: &str) -> Result<HashMap<String, String>, LookupError>;
}

/// The network spec of a container: its `network.*` properties, prefix
/// stripped, as a JSON object. Empty if there are none.
pub fn network_spec<P: ContainerProperties + ?Sized>(source: &P, handle: &str) -> Result<String, LookupError> {
    let properties = source.properties(handle)?;
    let specs: BTreeMap<&str, &str> = properties
        .iter()
        .filter_map(|(key, val)| {
            key.strip_prefix(NETWORK_PREFIX)
                .map(|short| (short, val.as_str()))
        })
        .collect();

    if specs.is_empty() {
        return Ok(String::new());
    }

    serde_json::to_string(&specs).map_err(|source| LookupError::Marshal {
        handle: handle.to_string(),
        source,
    })
}

/// Client for the Garden container API over TCP
pub struct GardenClient {
    address: String,
    client: reqwest::Client,
    runtime: Runtime,
}

impl GardenClient {
    pub fn new(config: &GardenConfig) -> Result<Self, LookupError> {
        if config.network != "tcp" {
            return Err(LookupError::UnsupportedNetwork(config.network.clone()));
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(LookupError::Runtime)?;

        let client = reqwest::Client::builder()
            .no_proxy()
            .build()
            .map_err(LookupError::Client)?;

        Ok(Self {
            address: config.address.clone(),
            client,
            runtime,
        })
    }
}

impl ContainerProperties for GardenClient {
    fn properties(&self, handle: &str) -> Result<HashMap<String, String>, LookupError> {
        let url = format!("http://{}/containers/{}/properties", self.address, handle);
        debug!("fetching properties from {}", url);

        self.runtime.block_on(async {
            let resp = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| LookupError::Lookup {
                    handle: handle.to_string(),
                    msg: e.to_string(),
                })?;

            let status = resp.status();
            if !status.is_success() {
                return Err(LookupError::Lookup {
                    handle: handle.to_string(),
                    msg: format!("unexpected status code: {}", status),
                });
            }

            resp.json::<HashMap<String, String>>()
                .await
                .map_err(|e| LookupError::Properties {
                    handle: handle.to_string(),
                    msg: e.to_string(),
                })
        })
    }
}
