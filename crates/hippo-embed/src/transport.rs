//! Pluggable HTTP transport for remote embedding calls.
//!
//! Hosts that sandbox the network stack (mobile webviews, CORS-restricted
//! runtimes) inject their own [`HttpTransport`]; everything else uses
//! [`ReqwestTransport`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{EmbedError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Request / Response
// ─────────────────────────────────────────────────────────────────────────────

/// A single outbound HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Absolute URL.
    pub url: String,
    /// HTTP method (`POST`, `GET`, ...).
    pub method: String,
    /// Header name/value pairs.
    pub headers: Vec<(String, String)>,
    /// Request body.
    pub body: String,
    /// Deadline for the whole exchange.
    pub timeout: Duration,
}

impl HttpRequest {
    /// Create a JSON POST request.
    pub fn post_json(url: impl Into<String>, body: String, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            method: "POST".to_string(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body,
            timeout,
        }
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// The response to an [`HttpRequest`].
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status_code: u16,
    /// Raw body.
    pub body: String,
}

impl HttpResponse {
    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transport Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Performs HTTP exchanges on behalf of the remote embedder.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send the request and return the response, whatever its status.
    ///
    /// Only failures to complete the exchange are errors; non-2xx statuses
    /// are returned as regular responses.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// A transport that can be shared across embedders.
pub type SharedTransport = Arc<dyn HttpTransport>;

// ─────────────────────────────────────────────────────────────────────────────
// Reqwest Transport
// ─────────────────────────────────────────────────────────────────────────────

/// Default transport backed by `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport with a fresh client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport reusing an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|e| EmbedError::Config(format!("invalid HTTP method: {}", e)))?;

        let mut builder = self
            .client
            .request(method, &request.url)
            .timeout(request.timeout)
            .body(request.body);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                EmbedError::Timeout(request.timeout)
            } else {
                EmbedError::from(e)
            }
        })?;

        let status_code = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpResponse { status_code, body })
    }
}
