//! HTTP boundary towards the provider API.
//!
//! Components never talk to `reqwest` directly; they go through
//! [`HttpTransport`] so the network call is a single explicit suspension point
//! that tests can replace.

use crate::errors::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;

/// Response as seen by the components: status, headers and the raw body.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP status
    pub status: StatusCode,

    /// Response headers as `(name, value)` pairs
    pub headers: Vec<(String, String)>,

    /// Body read so far
    pub body: String,
}

impl TransportResponse {
    /// Creates a response with no headers.
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Trait for sending JSON requests to the provider.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// POSTs `body` as JSON to `url` and returns the response without
    /// interpreting its status.
    async fn post_json(&self, url: &str, body: &Value) -> Result<TransportResponse>;
}

/// [`HttpTransport`] backed by a `reqwest::Client`.
///
/// Timeouts and proxies are configured on the client passed to
/// [`ReqwestTransport::with_client`].
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport {
    http_client: Client,
}

impl ReqwestTransport {
    /// Creates a transport with a default client.
    pub fn new() -> Self {
        Self {
            http_client: Client::new(),
        }
    }

    /// Sets a custom HTTP client.
    pub fn with_client(mut self, client: Client) -> Self {
        self.http_client = client;
        self
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_json(&self, url: &str, body: &Value) -> Result<TransportResponse> {
        let response = self.http_client.post(url).json(body).send().await?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or("<binary>").to_string(),
                )
            })
            .collect();
        let body = response.text().await?;

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}
