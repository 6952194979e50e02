// # Gateway State Source
//
// This crate polls a Gladius network gateway for the current peer-to-peer
// node state and turns it into a `NodeState` (address -> IP).
//
// ## Endpoint
//
// `GET {gateway_url}/api/p2p/state`
//
// ```json
// {
//   "response": {
//     "node_data_map": {
//       "0xabc...": { "data": { "ip_address": "1.2.3.4" } }
//     }
//   }
// }
// ```
//
// ## Failure Handling
//
// - Unreachable gateway or non-2xx status: `Error::Transport`
// - Body is not JSON or lacks `response.node_data_map`: `Error::Decode`
// - A node without a parseable `data.ip_address` is dropped from the state,
//   not reported as an error
//
// The poller never schedules itself; the engine calls `fetch` once per tick.

use async_trait::async_trait;
use gladns_core::config::GatewayConfig;
use gladns_core::traits::StateSource;
use gladns_core::{Error, NodeState, Result};
use serde_json::Value;
use std::net::IpAddr;
use std::time::Duration;
use tracing::debug;

/// Path of the state endpoint below the gateway base URL
pub const STATE_PATH: &str = "/api/p2p/state";

/// JSON pointer to the node map inside the state payload
const NODE_MAP_POINTER: &str = "/response/node_data_map";

/// JSON pointer to the IP inside one node entry
const NODE_IP_POINTER: &str = "/data/ip_address";

/// HTTP poller for the gateway state endpoint
pub struct GatewayPoller {
    /// Full URL of the state endpoint
    endpoint: String,

    /// HTTP client
    client: reqwest::Client,
}

impl GatewayPoller {
    /// Create a poller for a gateway base URL
    ///
    /// # Parameters
    ///
    /// - `base_url`: Gateway base URL (e.g., "http://127.0.0.1:3001")
    /// - `timeout`: Per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build gateway HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), STATE_PATH),
            client,
        })
    }

    /// Create a poller from validated gateway configuration
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        config.validate()?;
        Self::new(&config.url, Duration::from_secs(config.timeout_secs))
    }

    /// Full URL polled each tick
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl StateSource for GatewayPoller {
    async fn fetch(&self) -> Result<NodeState> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| Error::transport(format!("GET {} failed: {}", self.endpoint, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::transport(format!(
                "GET {} returned {}",
                self.endpoint, status
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::transport(format!("Failed to read gateway response: {}", e)))?;

        decode_node_state(&body)
    }

    fn describe(&self) -> String {
        format!("gateway {}", self.endpoint)
    }
}

/// Decode a gateway state payload into a [`NodeState`]
///
/// Node entries without a parseable `data.ip_address` are skipped.
pub fn decode_node_state(body: &[u8]) -> Result<NodeState> {
    let payload: Value = serde_json::from_slice(body)
        .map_err(|e| Error::decode(format!("gateway response is not JSON: {}", e)))?;

    let nodes = payload
        .pointer(NODE_MAP_POINTER)
        .and_then(Value::as_object)
        .ok_or_else(|| Error::decode("gateway response has no response.node_data_map object"))?;

    let mut state = NodeState::with_capacity(nodes.len());
    for (address, node) in nodes {
        let ip = node
            .pointer(NODE_IP_POINTER)
            .and_then(Value::as_str)
            .and_then(|raw| raw.trim().parse::<IpAddr>().ok());

        match ip {
            Some(ip) => {
                state.insert(address.clone(), ip);
            }
            None => debug!("Skipping node {}: no usable data.ip_address", address),
        }
    }

    Ok(state)
}
