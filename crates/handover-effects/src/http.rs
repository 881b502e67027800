//! HTTP effect handler backed by reqwest

use async_trait::async_trait;
use handover_core::effects::{HttpEffects, HttpRequest, HttpResponse};
use handover_core::{HandoverError, HandoverResult};
use std::time::Duration;

/// Default bound on a single request, including reading the body
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP handler for production use.
///
/// Performs exactly one attempt per call. Retry cadence belongs to the caller.
#[derive(Debug, Clone)]
pub struct ReqwestHttpHandler {
    client: reqwest::Client,
}

impl ReqwestHttpHandler {
    /// Create a handler with the default request timeout
    pub fn new() -> HandoverResult<Self> {
        Self::with_timeout(DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a handler with a custom request timeout
    pub fn with_timeout(timeout: Duration) -> HandoverResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HandoverError::internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpEffects for ReqwestHttpHandler {
    async fn get(&self, request: HttpRequest) -> HandoverResult<HttpResponse> {
        let mut builder = self.client.get(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_builder() {
                HandoverError::invalid(format!("Invalid request for {}: {e}", request.url))
            } else if e.is_timeout() {
                HandoverError::network(format!("Request to {} timed out: {e}", request.url))
            } else {
                HandoverError::network(format!("Request to {} failed: {e}", request.url))
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| HandoverError::network(format!("Failed to read response body: {e}")))?;

        tracing::trace!(url = %request.url, status, bytes = body.len(), "HTTP GET completed");

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_url_is_rejected() {
        let handler = ReqwestHttpHandler::new().unwrap();
        let result = handler.get(HttpRequest::get("not a url")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let handler = ReqwestHttpHandler::with_timeout(Duration::from_secs(2)).unwrap();
        let result = handler
            .get(HttpRequest::get("http://127.0.0.1:9/version.json"))
            .await;
        assert!(matches!(result, Err(HandoverError::Network { .. })));
    }
}
