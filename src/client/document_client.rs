//! Rate-limited document submission.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, instrument, warn};

use super::transport::{HttpTransport, Transport};
use crate::config::DocgateConfig;
use crate::document::Document;
use crate::error::{DocgateError, Result};
use crate::ratelimit::RateLimiter;

/// Client for the document registration endpoint.
///
/// Every submission first takes an admission from the [`RateLimiter`], so
/// no more than `request_limit` documents are sent per window no matter how
/// many tasks call [`DocumentClient::submit`] at once. Admitted callers
/// run their HTTP calls concurrently.
pub struct DocumentClient<T: Transport = HttpTransport> {
    endpoint: String,
    limiter: Arc<RateLimiter>,
    transport: T,
    /// Submissions that were admitted and handed to the transport
    submitted: AtomicU64,
    reject_error_status: bool,
}

impl DocumentClient<HttpTransport> {
    /// Create a client backed by a `reqwest` transport.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: &DocgateConfig) -> Result<Self> {
        let transport = HttpTransport::new(config.client.timeout())?;
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> DocumentClient<T> {
    /// Create a client with a custom transport.
    pub fn with_transport(config: &DocgateConfig, transport: T) -> Result<Self> {
        config.validate()?;

        let limiter = RateLimiter::with_period(
            config.rate_limiting.request_limit,
            config.rate_limiting.period(),
        )?;

        info!(
            endpoint = %config.client.endpoint,
            request_limit = config.rate_limiting.request_limit,
            period_ms = config.rate_limiting.period().as_millis() as u64,
            "Document client initialized"
        );

        let mut client = Self::with_limiter(
            config.client.endpoint.clone(),
            Arc::new(limiter),
            transport,
        );
        client.reject_error_status = config.client.reject_error_status;
        Ok(client)
    }

    /// Create a client around an existing limiter.
    ///
    /// Clients sharing a limiter share its budget; shutting down any of
    /// them shuts down the limiter for all.
    pub fn with_limiter(
        endpoint: impl Into<String>,
        limiter: Arc<RateLimiter>,
        transport: T,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            limiter,
            transport,
            submitted: AtomicU64::new(0),
            reject_error_status: false,
        }
    }

    /// Submit a document, waiting for admission if the window is exhausted.
    ///
    /// Returns the response body as-is. Non-2xx statuses are not errors
    /// unless `reject_error_status` is configured.
    #[instrument(skip(self, document, signature), fields(doc_id = %document.doc_id))]
    pub async fn submit(&self, document: &Document, signature: &str) -> Result<String> {
        self.limiter.acquire().await?;
        self.send(document, signature).await
    }

    /// Like [`DocumentClient::submit`], but waits at most `wait` for admission.
    #[instrument(skip(self, document, signature), fields(doc_id = %document.doc_id))]
    pub async fn submit_with_timeout(
        &self,
        document: &Document,
        signature: &str,
        wait: Duration,
    ) -> Result<String> {
        self.limiter.acquire_timeout(wait).await?;
        self.send(document, signature).await
    }

    async fn send(&self, document: &Document, signature: &str) -> Result<String> {
        let body = document.to_json()?;

        let submitted = self.submitted.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(submitted, bytes = body.len(), "Submitting document");

        let response = self
            .transport
            .post(&self.endpoint, signature, body)
            .await
            .map_err(|e| {
                error!(error = %e, "Document submission failed");
                e
            })?;

        if !response.is_success() {
            warn!(status = response.status, "Endpoint returned non-success status");
            if self.reject_error_status {
                return Err(DocgateError::Status {
                    status: response.status,
                    body: response.body,
                });
            }
        }

        Ok(response.body)
    }

    /// Total submissions admitted and sent since construction.
    pub fn submitted_count(&self) -> u64 {
        self.submitted.load(Ordering::SeqCst)
    }

    /// The configured endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The limiter gating this client.
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Stop replenishment; callers waiting for admission get
    /// [`DocgateError::Cancelled`]. Idempotent.
    pub fn shutdown(&self) {
        self.limiter.shutdown();
    }
}
