//! Scripted HTTP handler for the version probe

use async_trait::async_trait;
use handover_core::effects::{HttpEffects, HttpRequest, HttpResponse};
use handover_core::{HandoverError, HandoverResult};
use parking_lot::Mutex;
use std::collections::VecDeque;

/// HTTP handler answering from a script, then from a fallback
#[derive(Debug)]
pub struct MockHttp {
    scripted: Mutex<VecDeque<HandoverResult<HttpResponse>>>,
    fallback: Mutex<HandoverResult<HttpResponse>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockHttp {
    /// Server that publishes `version`
    pub fn publishing(version: &str) -> Self {
        Self::with_fallback(Ok(Self::descriptor(version)))
    }

    /// Server that cannot be reached
    pub fn unreachable() -> Self {
        Self::with_fallback(Err(HandoverError::network("connection refused")))
    }

    fn with_fallback(fallback: HandoverResult<HttpResponse>) -> Self {
        Self {
            scripted: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(fallback),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// 200 response carrying a version descriptor
    pub fn descriptor(version: &str) -> HttpResponse {
        HttpResponse {
            status: 200,
            body: serde_json::json!({ "version": version }).to_string().into_bytes(),
        }
    }

    /// Queue a one-off response ahead of the fallback
    pub fn push_response(&self, response: HandoverResult<HttpResponse>) {
        self.scripted.lock().push_back(response);
    }

    /// Change the published version
    pub fn publish(&self, version: &str) {
        *self.fallback.lock() = Ok(Self::descriptor(version));
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests received
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl HttpEffects for MockHttp {
    async fn get(&self, request: HttpRequest) -> HandoverResult<HttpResponse> {
        self.requests.lock().push(request);
        let scripted = self.scripted.lock().pop_front();
        match scripted {
            Some(response) => response,
            None => self.fallback.lock().clone(),
        }
    }
}
