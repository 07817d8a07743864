//! Merging of the runtime network spec into plugin configurations.
//!
//! The network spec comes from the container's metadata and is forwarded to every
//! plugin as the `network` field, so plugins never need to know where it
//! came from.

use ipnetwork::IpNetwork;
use serde_json::{Map, Value};
use std::net::IpAddr;

use crate::config::NetworkConfig;
use crate::error::MergeError;

/// A network configuration carrying the merged `network` field
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedConfig {
    /// The original config with its bytes replaced by the merged document
    pub config: NetworkConfig,
    /// Value written to the `network` field
    pub network: Value,
}

fn is_ip(spec: &str) -> bool {
    spec.parse::<IpAddr>().is_ok()
}

fn is_cidr(spec: &str) -> bool {
    spec.contains('/') && spec.parse::<IpNetwork>().is_ok()
}

/// Decode the runtime spec into the value stored under `network`.
///
/// An empty spec, a bare IP or a CIDR is kept as a plain string; anything
/// else must be a JSON object.
pub fn network_value(spec: &str) -> Result<Value, MergeError> {
    if spec.is_empty() || is_ip(spec) || is_cidr(spec) {
        return Ok(Value::String(spec.to_string()));
    }

    match serde_json::from_str::<Value>(spec).map_err(MergeError::Spec)? {
        Value::Object(map) => Ok(Value::Object(map)),
        _ => Err(MergeError::SpecNotObject(spec.to_string())),
    }
}

/// Set `network` on a copy of `config`
pub fn merge(config: &NetworkConfig, spec: &str) -> Result<EnrichedConfig, MergeError> {
    let mut doc: Map<String, Value> = match serde_json::from_slice(&config.bytes) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            return Err(MergeError::BaseNotObject {
                name: config.name.clone(),
            })
        }
        Err(source) => {
            return Err(MergeError::Base {
                name: config.name.clone(),
                source,
            })
        }
    };

    let network = network_value(spec)?;
    doc.insert("network".to_string(), network.clone());

    let bytes = serde_json::to_vec(&doc).map_err(|source| MergeError::Encode {
        name: config.name.clone(),
        source,
    })?;

    Ok(EnrichedConfig {
        config: NetworkConfig {
            bytes,
            ..config.clone()
        },
        network,
    })
}
