//! HTTP effect interface used by the version probe

use crate::errors::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// A single GET request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Absolute or base-relative URL
    pub url: String,
    /// Request headers in send order
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    /// Create a GET request without headers
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    /// Append a header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Look up a header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Response status and raw body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body bytes
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Network access for advisory requests.
///
/// Implementations report transport failures as `HandoverError::Network` and
/// return non-2xx responses as `Ok`; interpreting the status is the caller's job.
#[async_trait]
pub trait HttpEffects: Send + Sync {
    /// Perform one request without retrying
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Blanket implementation for Arc<T> where T: HttpEffects
#[async_trait]
impl<T: HttpEffects + ?Sized> HttpEffects for Arc<T> {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse> {
        (**self).get(request).await
    }
}
