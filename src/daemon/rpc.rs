//! aria2 JSON-RPC transport
//!
//! Requests are JSON-RPC 2.0 objects POSTed to `http://<host>:<port>/jsonrpc`.
//! When the daemon runs with `--rpc-secret`, every call carries
//! `token:<secret>` as its first positional parameter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, trace};

use crate::error::{ClientError, Result};

/// JSON-RPC error object
#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

impl RpcErrorObject {
    /// Map a daemon error onto the client taxonomy
    pub fn into_client_error(self) -> ClientError {
        // aria2 reports unknown identifiers as "GID <gid> is not found"
        if self.message.ends_with("is not found") {
            let gid = self
                .message
                .split_whitespace()
                .nth(1)
                .unwrap_or_default()
                .to_string();
            return ClientError::not_found(gid);
        }
        ClientError::daemon_with_code(self.message, self.code)
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

/// Low-level JSON-RPC client for one aria2 endpoint
pub struct RpcClient {
    client: reqwest::Client,
    endpoint: String,
    secret: Option<String>,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Create a client for `endpoint`
    pub fn new(endpoint: impl Into<String>, secret: Option<String>, request_timeout: Duration) -> Result<Self> {
        let endpoint = endpoint.into();
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ClientError::connectivity_full("Failed to build HTTP client", endpoint.clone(), e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            secret,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Invoke `method` with positional `params` and decode the result
    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Vec<Value>) -> Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut full_params = Vec::with_capacity(params.len() + 1);
        if let Some(secret) = &self.secret {
            full_params.push(Value::String(format!("token:{}", secret)));
        }
        full_params.extend(params);

        let body = json!({
            "jsonrpc": "2.0",
            "id": id.to_string(),
            "method": method,
            "params": full_params,
        });

        debug!("RPC call {} (id {})", method, id);

        let response = self.client.post(&self.endpoint).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await?;
        trace!("RPC response {} (HTTP {}): {}", method, status, text);

        // aria2 answers JSON-RPC errors with a non-2xx status but a normal body
        let envelope: RpcResponse = serde_json::from_str(&text).map_err(|e| {
            ClientError::daemon(format!(
                "Unexpected response to {} (HTTP {}): {}",
                method, status, e
            ))
        })?;

        if let Some(error) = envelope.error {
            debug!("RPC {} failed: {} (code {})", method, error.message, error.code);
            return Err(error.into_client_error());
        }

        let result = envelope
            .result
            .ok_or_else(|| ClientError::daemon(format!("{} returned neither result nor error", method)))?;

        serde_json::from_value(result).map_err(|e| {
            ClientError::daemon(format!("Unexpected result shape from {}: {}", method, e))
        })
    }
}
