/// Outbound HTTP transport for REQUEST nodes
///
/// One shared reqwest client serves every run. A request either dials its
/// target directly or is wrapped in a JSON envelope and posted to the
/// configured relay endpoint, the editor's escape hatch for cross-origin
/// restrictions. The relay server itself is an external collaborator; this
/// module only chooses which path to invoke.

use crate::runtime::error::EngineError;
use anyhow::Result;
use reqwest::Method;
use serde_json::{json, Map, Value};
use std::time::Duration;

/// A fully prepared outbound call
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub url: String,
    pub method: Method,
    /// Final header set, defaults already merged
    pub headers: Map<String, Value>,
    /// Body text, already omitted for GET/HEAD
    pub body: Option<String>,
}

/// Status and raw body of a completed call
#[derive(Debug, Clone)]
pub struct OutboundResponse {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

impl OutboundResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Shared HTTP client with optional relay routing
#[derive(Debug, Clone)]
pub struct HttpDispatcher {
    client: reqwest::Client,
    relay_url: Option<String>,
}

impl HttpDispatcher {
    pub fn new(timeout: Duration, relay_url: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;
        Ok(Self { client, relay_url })
    }

    /// Send a request, directly or through the relay
    pub async fn dispatch(
        &self,
        request: OutboundRequest,
        via_relay: bool,
    ) -> Result<OutboundResponse, EngineError> {
        if via_relay {
            self.via_relay(&request).await
        } else {
            self.direct(&request).await
        }
    }

    async fn direct(&self, request: &OutboundRequest) -> Result<OutboundResponse, EngineError> {
        tracing::debug!("🌍 HTTP {} {}", request.method, request.url);

        let mut builder = self.client.request(request.method.clone(), &request.url);
        for (name, value) in &request.headers {
            match value.as_str() {
                Some(text) => builder = builder.header(name.as_str(), text),
                None => builder = builder.header(name.as_str(), value.to_string()),
            }
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| EngineError::transport(&request.url, e))?;
        Self::read(response, &request.url).await
    }

    /// Post the request envelope to the relay instead of dialing the target
    async fn via_relay(&self, request: &OutboundRequest) -> Result<OutboundResponse, EngineError> {
        let relay = self
            .relay_url
            .as_deref()
            .ok_or(EngineError::RelayUnconfigured)?;

        tracing::debug!("🌍 HTTP {} {} (via relay {})", request.method, request.url, relay);

        let envelope = json!({
            "url": request.url,
            "method": request.method.as_str(),
            "headers": Value::Object(request.headers.clone()),
            "body": request.body,
        });

        let response = self
            .client
            .post(relay)
            .header("Content-Type", "application/json")
            .json(&envelope)
            .send()
            .await
            .map_err(|e| EngineError::transport(relay, e))?;
        Self::read(response, &request.url).await
    }

    async fn read(
        response: reqwest::Response,
        url: &str,
    ) -> Result<OutboundResponse, EngineError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| EngineError::transport(url, e))?;

        Ok(OutboundResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            body,
        })
    }
}
