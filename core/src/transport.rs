//! Executing requests.
//!
//! # Design
//! `ApiClient` never touches the network itself; it hands finished
//! `HttpRequest` values to a `Transport`. `UreqTransport` is the production
//! implementation and runs `ureq`'s blocking agent on tokio's blocking pool so
//! callers can await it. Tests substitute a scripted transport.
//!
//! Non-2xx statuses are returned as data, not errors, so the client can apply
//! its own message precedence to them.

#[cfg(any(test, feature = "test-util"))]
use std::collections::VecDeque;
#[cfg(any(test, feature = "test-util"))]
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes one HTTP round-trip.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fails only when no response was obtained (network error, timeout).
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// `ureq`-backed transport with the client's fixed timeout.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(config: &ClientConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(config.timeout))
            .build()
            .new_agent();
        Self { agent }
    }

    fn execute_blocking(agent: &ureq::Agent, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let result = match (method, body) {
            (HttpMethod::Get, _) => with_headers(agent.get(&url), &headers).call(),
            (HttpMethod::Delete, None) => with_headers(agent.delete(&url), &headers).call(),
            // The remote API identifies the entity to delete by a JSON body.
            (HttpMethod::Delete, Some(body)) => with_headers(agent.delete(&url), &headers)
                .force_send_body()
                .send(&body[..]),
            (HttpMethod::Post, Some(body)) => with_headers(agent.post(&url), &headers).send(&body[..]),
            (HttpMethod::Post, None) => with_headers(agent.post(&url), &headers).send_empty(),
            (HttpMethod::Put, Some(body)) => with_headers(agent.put(&url), &headers).send(&body[..]),
            (HttpMethod::Put, None) => with_headers(agent.put(&url), &headers).send_empty(),
        };

        let mut response = result.map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), v.to_str().unwrap_or_default().to_string()))
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn with_headers<B>(mut builder: ureq::RequestBuilder<B>, headers: &[(String, String)]) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

#[async_trait]
impl Transport for UreqTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(method = request.method.as_str(), url = %request.url, "sending request");
        let agent = self.agent.clone();
        tokio::task::spawn_blocking(move || Self::execute_blocking(&agent, request))
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?
    }
}

/// Substitute transport that records requests and replays queued responses
/// in order. Once the queue is empty every call fails with a transport error.
///
/// Only built for tests or with the `test-util` feature.
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, ApiError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

#[cfg(any(test, feature = "test-util"))]
impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, status: u16, body: &str) {
        lock(&self.responses).push_back(Ok(HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }));
    }

    pub fn push_error(&self, error: ApiError) {
        lock(&self.responses).push_back(Err(error));
    }

    /// Requests seen so far, oldest first.
    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.requests).clone()
    }

    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }
}

#[cfg(any(test, feature = "test-util"))]
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(any(test, feature = "test-util"))]
#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        lock(&self.requests).push(request);
        lock(&self.responses)
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Transport("no scripted response left".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: "http://localhost:8000/categoria".to_string(),
            headers: Vec::new(),
            body: None,
        }
    }

    #[tokio::test]
    async fn scripted_transport_replays_in_order_then_fails() {
        let transport = ScriptedTransport::new();
        transport.push_response(200, "first");
        transport.push_error(ApiError::Transport("offline".to_string()));

        assert_eq!(transport.execute(request()).await.unwrap().body, "first");
        assert_eq!(transport.execute(request()).await.unwrap_err().message(), "offline");
        assert!(transport.execute(request()).await.is_err());
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test]
    async fn ureq_transport_reports_unreachable_host_as_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = ClientConfig::new(&format!("http://{addr}"));
        let transport = UreqTransport::new(&config);
        let mut req = request();
        req.url = format!("http://{addr}/categoria");
        let err = transport.execute(req).await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
        assert!(!err.message().is_empty());
    }
}
