//! Transport trait for abstracting the HTTP call.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

use crate::error::Result;

/// Name of the header carrying the opaque document signature.
pub const SIGNATURE_HEADER: &str = "Signature";

/// Raw response from the registration endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body, unmodified
    pub body: String,
}

impl TransportResponse {
    /// Whether the status code is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for sending an encoded document to the endpoint.
///
/// This is the seam between admission control and the network, letting
/// `DocumentClient` run against a real HTTP client or a test double.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` as JSON to `url` with the given signature header.
    async fn post(&self, url: &str, signature: &str, body: Vec<u8>) -> Result<TransportResponse>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn post(&self, url: &str, signature: &str, body: Vec<u8>) -> Result<TransportResponse> {
        (**self).post(url, signature, body).await
    }
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, url: &str, signature: &str, body: Vec<u8>) -> Result<TransportResponse> {
        trace!(url, bytes = body.len(), "Sending document");

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, signature)
            .body(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(TransportResponse { status, body })
    }
}
