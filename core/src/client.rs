//! Request builder, response parser and async verbs for the remote API.
//!
//! # Design
//! `ApiClient` holds its configuration and an injected `Transport`; there is
//! no process-wide instance. Each verb is split the same way: a `build_*`
//! method that produces an `HttpRequest` as plain data, `parse_envelope` that
//! turns an `HttpResponse` into an `Envelope` or an `ApiError`, and an async
//! method that runs both around `Transport::execute`. The build/parse halves
//! stay synchronous and deterministic so they can be tested without I/O.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::multipart::MultipartForm;
use crate::transport::{Transport, UreqTransport};

const JSON_CONTENT_TYPE: &str = "application/json";

/// Client for the retail admin API.
#[derive(Clone)]
pub struct ApiClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Client using the `ureq` transport.
    pub fn new(config: ClientConfig) -> Self {
        let transport = Arc::new(UreqTransport::new(&config));
        Self::with_transport(config, transport)
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    pub fn build_get(&self, path: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: self.url(path),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn build_post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<HttpRequest, ApiError> {
        self.build_json(HttpMethod::Post, path, body)
    }

    pub fn build_put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<HttpRequest, ApiError> {
        self.build_json(HttpMethod::Put, path, body)
    }

    /// DELETE with an optional JSON body.
    pub fn build_delete(&self, path: &str, body: Option<&serde_json::Value>) -> Result<HttpRequest, ApiError> {
        match body {
            Some(body) => self.build_json(HttpMethod::Delete, path, body),
            None => Ok(HttpRequest {
                method: HttpMethod::Delete,
                url: self.url(path),
                headers: Vec::new(),
                body: None,
            }),
        }
    }

    pub fn build_post_form(&self, path: &str, form: &MultipartForm) -> HttpRequest {
        self.build_form(HttpMethod::Post, path, form)
    }

    pub fn build_put_form(&self, path: &str, form: &MultipartForm) -> HttpRequest {
        self.build_form(HttpMethod::Put, path, form)
    }

    fn build_json<B: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        path: &str,
        body: &B,
    ) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_vec(body).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(HttpRequest {
            method,
            url: self.url(path),
            headers: vec![("content-type".to_string(), JSON_CONTENT_TYPE.to_string())],
            body: Some(body),
        })
    }

    fn build_form(&self, method: HttpMethod, path: &str, form: &MultipartForm) -> HttpRequest {
        HttpRequest {
            method,
            url: self.url(path),
            headers: vec![("content-type".to_string(), form.content_type())],
            body: Some(form.encode()),
        }
    }

    /// Map a response to its envelope.
    ///
    /// Non-2xx statuses become `ApiError::Status`, carrying the server's `msg`
    /// when the error body is an envelope. A 2xx envelope reporting failure
    /// becomes `ApiError::Application`.
    pub fn parse_envelope<T: DeserializeOwned>(&self, response: HttpResponse) -> Result<Envelope<T>, ApiError> {
        if !response.is_success() {
            return Err(status_error(&response));
        }
        if response.body.trim().is_empty() {
            return Ok(Envelope::empty());
        }
        let envelope: Envelope<T> =
            serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))?;
        envelope.check()
    }

    async fn send<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<Envelope<T>, ApiError> {
        let method = request.method;
        let url = request.url.clone();
        debug!(method = method.as_str(), %url, "api request");
        let result = match self.transport.execute(request).await {
            Ok(response) => self.parse_envelope(response),
            Err(err) => Err(err),
        };
        if let Err(err) = &result {
            warn!(method = method.as_str(), %url, error = %err.message(), "api request failed");
        }
        result
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Envelope<T>, ApiError> {
        self.send(self.build_get(path)).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Envelope<T>, ApiError> {
        self.send(self.build_post(path, body)?).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Envelope<T>, ApiError> {
        self.send(self.build_put(path, body)?).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Envelope<T>, ApiError> {
        self.send(self.build_delete(path, body)?).await
    }

    pub async fn post_form<T: DeserializeOwned>(&self, path: &str, form: &MultipartForm) -> Result<Envelope<T>, ApiError> {
        self.send(self.build_post_form(path, form)).await
    }

    pub async fn put_form<T: DeserializeOwned>(&self, path: &str, form: &MultipartForm) -> Result<Envelope<T>, ApiError> {
        self.send(self.build_put_form(path, form)).await
    }

    /// Absolute URL for a server image path. See [`resolve_image_url`].
    pub fn resolve_image_url(&self, path: &str) -> String {
        resolve_image_url(&self.config.base_url, path)
    }
}

/// Resolve an image path returned by the server against `base_url`.
///
/// Empty input stays empty and absolute URLs pass through unchanged, so the
/// function is idempotent.
pub fn resolve_image_url(base_url: &str, path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn status_error(response: &HttpResponse) -> ApiError {
    let server_msg = serde_json::from_str::<Envelope<serde_json::Value>>(&response.body)
        .ok()
        .and_then(|env| env.msg)
        .filter(|m| !m.trim().is_empty());
    ApiError::Status {
        status: response.status,
        message: server_msg.unwrap_or_else(|| format!("request failed with status code {}", response.status)),
    }
}
