//! End-to-end tests for rate-limited submission against a recording transport.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::Mutex;
use tokio::time::Instant;

use docgate::client::{Transport, TransportResponse};
use docgate::{DocgateConfig, DocgateError, Document, DocumentClient, RateLimiter, Result};

const PERIOD: Duration = Duration::from_secs(1);

/// Transport that records when each call reached it.
#[derive(Default)]
struct TimedTransport {
    calls: Mutex<Vec<Instant>>,
}

impl TimedTransport {
    fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Transport for TimedTransport {
    async fn post(
        &self,
        _url: &str,
        _signature: &str,
        _body: Vec<u8>,
    ) -> Result<TransportResponse> {
        self.calls.lock().push(Instant::now());
        Ok(TransportResponse {
            status: 200,
            body: "{\"value\":\"accepted\"}".to_string(),
        })
    }
}

fn config(request_limit: u32) -> DocgateConfig {
    let mut config = DocgateConfig::default();
    config.client.endpoint = "http://registry.test/api/v3/1k/documents/create".to_string();
    config.rate_limiting.request_limit = request_limit;
    config.rate_limiting.period_ms = Some(PERIOD.as_millis() as u64);
    config
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_submissions_respect_window() {
    let transport = Arc::new(TimedTransport::default());
    let client = DocumentClient::with_transport(&config(2), Arc::clone(&transport)).unwrap();
    let document = Document::sample();
    let start = Instant::now();

    let results = join_all((0..5).map(|_| client.submit(&document, "sig"))).await;

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(client.submitted_count(), 5);

    let times = transport.call_times();
    assert_eq!(times.len(), 5);

    let immediate = times.iter().filter(|t| **t == start).count();
    assert_eq!(immediate, 2);
    assert!(times
        .iter()
        .filter(|t| **t != start)
        .all(|t| t.duration_since(start) >= PERIOD));

    // Two per window: 0s, 1s, 2s
    let last = times.iter().max().unwrap().duration_since(start);
    assert!(last >= PERIOD * 2 && last < PERIOD * 3);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_waiting_submissions() {
    let transport = Arc::new(TimedTransport::default());
    let client =
        Arc::new(DocumentClient::with_transport(&config(1), Arc::clone(&transport)).unwrap());

    client.submit(&Document::sample(), "sig").await.unwrap();

    let waiters: Vec<_> = (0..3)
        .map(|_| {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.submit(&Document::sample(), "sig").await })
        })
        .collect();
    tokio::task::yield_now().await;

    client.shutdown();

    for waiter in waiters {
        let result = tokio::time::timeout(Duration::from_millis(100), waiter)
            .await
            .expect("waiting submission hung after shutdown")
            .unwrap();
        assert!(matches!(result, Err(DocgateError::Cancelled)));
    }

    assert_eq!(transport.call_times().len(), 1);
    assert_eq!(client.submitted_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_clients_sharing_a_limiter_share_the_budget() {
    let limiter = Arc::new(RateLimiter::with_period(3, PERIOD).unwrap());
    let transport = Arc::new(TimedTransport::default());

    let first =
        DocumentClient::with_limiter("http://a.test", Arc::clone(&limiter), Arc::clone(&transport));
    let second =
        DocumentClient::with_limiter("http://b.test", Arc::clone(&limiter), Arc::clone(&transport));
    let document = Document::sample();
    let start = Instant::now();

    let (a, b) = tokio::join!(
        join_all((0..3).map(|_| first.submit(&document, "sig"))),
        join_all((0..3).map(|_| second.submit(&document, "sig"))),
    );
    assert!(a.iter().chain(b.iter()).all(|r| r.is_ok()));

    let times = transport.call_times();
    assert_eq!(times.iter().filter(|t| **t == start).count(), 3);
    assert_eq!(first.submitted_count() + second.submitted_count(), 6);
}
