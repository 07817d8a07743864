use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Runtime;

use crate::config::NetworkConfig;
use crate::error::ReportError;
use crate::types::Result as CniResult;

/// Receives the outcome of every plugin ADD and DEL
pub trait ResultReporter {
    fn report_add(&self, container_id: &str, config: &NetworkConfig, result: &CniResult) -> Result<(), ReportError>;

    fn report_del(&self, container_id: &str, config: &NetworkConfig) -> Result<(), ReportError>;
}

/// Network config as it appears in a report
#[derive(Debug, Serialize)]
struct ReportedConfig<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    plugin_type: &'a str,
    /// The config document itself, or its text if it is not JSON
    config: Value,
}

impl<'a> From<&'a NetworkConfig> for ReportedConfig<'a> {
    fn from(conf: &'a NetworkConfig) -> Self {
        let config = serde_json::from_slice(&conf.bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&conf.bytes).into_owned()));
        Self {
            name: &conf.name,
            plugin_type: &conf.plugin_type,
            config,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct AddPayload<'a> {
    #[serde(rename = "ContainerID")]
    container_id: &'a str,
    config: ReportedConfig<'a>,
    result: &'a CniResult,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DelPayload<'a> {
    #[serde(rename = "ContainerID")]
    container_id: &'a str,
    config: ReportedConfig<'a>,
}

/// Posts outcomes as JSON to `<base>/cni-result/add` and `<base>/cni-result/del`
pub struct HttpReporter {
    base_url: String,
    client: reqwest::Client,
    runtime: Runtime,
}

impl HttpReporter {
    pub fn new(base_url: &str) -> Result<Self, ReportError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ReportError::Other {
                action: "init",
                msg: format!("failed to create Tokio runtime: {}", e),
            })?;

        // The endpoint is a local daemon; never route it through a proxy
        let client = reqwest::Client::builder()
            .no_proxy()
            .build()
            .map_err(|source| ReportError::Http {
                action: "init",
                source,
            })?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            runtime,
        })
    }

    fn post<T: Serialize>(&self, action: &'static str, path: &str, payload: &T) -> Result<(), ReportError> {
        let url = format!("{}{}", self.base_url, path);
        let status = self.runtime.block_on(async {
            self.client
                .post(&url)
                .header(reqwest::header::ACCEPT, "application/json")
                .json(payload)
                .send()
                .await
                .map(|resp| resp.status())
        });

        match status {
            Ok(StatusCode::OK) => Ok(()),
            Ok(status) => Err(ReportError::Status { action, status }),
            Err(source) => Err(ReportError::Http { action, source }),
        }
    }
}

impl ResultReporter for HttpReporter {
    fn report_add(&self, container_id: &str, config: &NetworkConfig, result: &CniResult) -> Result<(), ReportError> {
        let payload = AddPayload {
            container_id,
            config: config.into(),
            result,
        };
        self.post("add", "/cni-result/add", &payload)
    }

    fn report_del(&self, container_id: &str, config: &NetworkConfig) -> Result<(), ReportError> {
        let payload = DelPayload {
            container_id,
            config: config.into(),
        };
        self.post("del", "/cni-result/del", &payload)
    }
}
