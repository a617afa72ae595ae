//! Scripted transport for testing adapters without a network.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::utils::{Transport, TransportError, TransportRequest, TransportResponse};

#[derive(Debug)]
struct Rule {
    url_part: String,
    outcome: Result<TransportResponse, TransportError>,
}

/// A transport that answers from predefined rules.
///
/// The first rule whose fragment occurs in the request URL wins. Requests
/// that match no rule fail as unsendable, so a missing fixture is loud.
#[derive(Debug, Default)]
pub struct MockTransport {
    rules: Vec<Rule>,
    delay: Option<Duration>,
    requests: Mutex<Vec<TransportRequest>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockTransport {
    /// Create a mock transport with no rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer requests whose URL contains `url_part` with a 200 and `body`.
    pub fn respond(mut self, url_part: impl Into<String>, body: impl Into<String>) -> Self {
        self.rules.push(Rule {
            url_part: url_part.into(),
            outcome: Ok(TransportResponse {
                status: 200,
                body: body.into(),
            }),
        });
        self
    }

    /// Fail requests whose URL contains `url_part`.
    pub fn fail(mut self, url_part: impl Into<String>, error: TransportError) -> Self {
        self.rules.push(Rule {
            url_part: url_part.into(),
            outcome: Err(error),
        });
        self
    }

    /// Fail requests whose URL contains `url_part` with an HTTP status.
    pub fn status(self, url_part: impl Into<String>, status: u16) -> Self {
        self.fail(
            url_part,
            TransportError::Status {
                status,
                body: String::new(),
            },
        )
    }

    /// Hold every response for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// URLs received so far, in arrival order.
    pub fn urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url).collect()
    }

    /// Highest number of requests that were pending at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let outcome = self
            .rules
            .iter()
            .find(|rule| request.url.contains(&rule.url_part))
            .map(|rule| rule.outcome.clone())
            .unwrap_or_else(|| {
                Err(TransportError::Request(format!(
                    "no scripted response for {}",
                    request.url
                )))
            });
        self.requests.lock().unwrap().push(request);

        let pending = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(pending, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        outcome
    }
}
