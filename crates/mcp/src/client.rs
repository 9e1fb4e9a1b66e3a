//! Transport seam between tool adapters and the remote automation services.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

/// JSON object exchanged with an automation service.
pub type McpPayload = Map<String, Value>;

#[derive(Debug, Error)]
pub enum McpTransportError {
    #[error("MCP call to `{endpoint}` failed with status {status}: {body}")]
    Status { endpoint: String, status: u16, body: String },
    #[error("MCP call to `{endpoint}` timed out after {timeout_ms}ms")]
    Timeout { endpoint: String, timeout_ms: u128 },
    #[error("MCP call to `{endpoint}` could not be completed: {message}")]
    Request { endpoint: String, message: String },
    #[error("MCP response from `{endpoint}` is not a JSON object: {message}")]
    InvalidResponse { endpoint: String, message: String },
    #[error("MCP client could not be constructed: {0}")]
    Client(String),
}

impl McpTransportError {
    /// HTTP status reported by the remote service, when it answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[async_trait]
pub trait McpClient: Send + Sync {
    /// Invokes `action` inside `namespace` and returns the raw response object.
    async fn invoke(
        &self,
        namespace: &str,
        action: &str,
        payload: &McpPayload,
    ) -> Result<McpPayload, McpTransportError>;
}

/// In-memory client for local development and tests. Never fails and always
/// echoes the call back, so identical inputs yield identical outputs.
#[derive(Clone, Copy, Debug, Default)]
pub struct SimulatedMcpClient;

#[async_trait]
impl McpClient for SimulatedMcpClient {
    async fn invoke(
        &self,
        namespace: &str,
        action: &str,
        payload: &McpPayload,
    ) -> Result<McpPayload, McpTransportError> {
        let payload = Value::Object(payload.clone());
        let summary = format!("Simulated {namespace}.{action} executed with payload: {payload}.");

        let mut result = Map::new();
        result.insert("namespace".to_string(), Value::from(namespace));
        result.insert("action".to_string(), Value::from(action));
        result.insert("payload".to_string(), payload);

        let mut response = Map::new();
        response.insert("result".to_string(), Value::Object(result));
        response.insert("summary".to_string(), Value::String(summary));
        Ok(response)
    }
}

/// Reaches automation services that expose `POST /{namespace}/{action}` and
/// answer with a JSON object carrying `result` and `summary`.
#[derive(Clone, Debug)]
pub struct HttpMcpClient {
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpMcpClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, McpTransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| McpTransportError::Client(error.to_string()))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { base_url, timeout, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, namespace: &str, action: &str) -> String {
        format!("{}/{namespace}/{action}", self.base_url)
    }

    fn transport_error(&self, endpoint: &str, error: reqwest::Error) -> McpTransportError {
        if error.is_timeout() {
            McpTransportError::Timeout {
                endpoint: endpoint.to_string(),
                timeout_ms: self.timeout.as_millis(),
            }
        } else if error.is_decode() {
            McpTransportError::InvalidResponse {
                endpoint: endpoint.to_string(),
                message: error.to_string(),
            }
        } else {
            McpTransportError::Request {
                endpoint: endpoint.to_string(),
                message: error.to_string(),
            }
        }
    }
}

#[async_trait]
impl McpClient for HttpMcpClient {
    async fn invoke(
        &self,
        namespace: &str,
        action: &str,
        payload: &McpPayload,
    ) -> Result<McpPayload, McpTransportError> {
        let endpoint = self.endpoint(namespace, action);
        debug!(
            event_name = "mcp.http.request",
            namespace = namespace,
            action = action,
            endpoint = %endpoint,
            "dispatching MCP call"
        );

        let response = self
            .client
            .post(&endpoint)
            .json(payload)
            .send()
            .await
            .map_err(|error| self.transport_error(&endpoint, error))?;

        let status = response.status();
        if status.as_u16() >= 400 {
            let body = response.text().await.unwrap_or_default();
            warn!(
                event_name = "mcp.http.rejected",
                namespace = namespace,
                action = action,
                status = status.as_u16(),
                "MCP service returned an error status"
            );
            return Err(McpTransportError::Status { endpoint, status: status.as_u16(), body });
        }

        let value: Value =
            response.json().await.map_err(|error| self.transport_error(&endpoint, error))?;
        match value {
            Value::Object(object) => Ok(object),
            other => Err(McpTransportError::InvalidResponse {
                endpoint,
                message: format!("expected an object, received `{other}`"),
            }),
        }
    }
}
