// SPDX-FileCopyrightText: 2026 Adlift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock network transport for deterministic testing.
//!
//! `MockTransport` implements [`Transport`] with pre-scripted outcomes,
//! enabling fast, CI-runnable tests without a live backend. Outcomes are
//! popped from a FIFO queue; when the queue is empty, every exchange
//! succeeds with HTTP 200 and an empty JSON object. All requests are
//! captured for assertion, and a high-water mark of concurrent exchanges
//! lets tests verify the at-most-one-in-flight discipline.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use adlift_core::{AdliftError, Transport, WireRequest, WireResponse};
use async_trait::async_trait;
use tokio::sync::Mutex;

/// One scripted exchange result.
#[derive(Debug, Clone)]
pub enum ScriptedOutcome {
    /// HTTP response with the given status and body.
    Status(u16, String),
    /// Connectivity-level failure (maps to `AdliftError::Network`).
    NetworkError,
}

impl ScriptedOutcome {
    /// 200 with an empty JSON object.
    pub fn ok() -> Self {
        ScriptedOutcome::Status(200, "{}".to_string())
    }

    /// 200 with the given JSON body.
    pub fn ok_with(body: &str) -> Self {
        ScriptedOutcome::Status(200, body.to_string())
    }

    /// Retryable server error.
    pub fn unavailable() -> Self {
        ScriptedOutcome::Status(503, String::new())
    }

    /// Terminal client error.
    pub fn rejected() -> Self {
        ScriptedOutcome::Status(404, String::new())
    }
}

/// A mock transport returning pre-scripted outcomes.
pub struct MockTransport {
    outcomes: Mutex<VecDeque<ScriptedOutcome>>,
    requests: Mutex<Vec<WireRequest>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    latency: Duration,
}

impl MockTransport {
    /// Create a mock transport with an empty script (every exchange
    /// returns 200 `{}`).
    pub fn new() -> Arc<Self> {
        Self::with_outcomes(Vec::new())
    }

    /// Create a mock transport pre-loaded with the given outcomes.
    pub fn with_outcomes(outcomes: Vec<ScriptedOutcome>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(VecDeque::from(outcomes)),
            requests: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            latency: Duration::from_millis(5),
        })
    }

    /// Append an outcome to the script.
    pub async fn push_outcome(&self, outcome: ScriptedOutcome) {
        self.outcomes.lock().await.push_back(outcome);
    }

    /// All requests seen so far, in arrival order.
    pub async fn requests(&self) -> Vec<WireRequest> {
        self.requests.lock().await.clone()
    }

    /// Number of exchanges performed.
    pub async fn request_count(&self) -> usize {
        self.requests.lock().await.len()
    }

    /// Highest number of exchanges that were ever in flight concurrently.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn next_outcome(&self) -> ScriptedOutcome {
        self.outcomes
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(ScriptedOutcome::ok)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn exchange(&self, request: WireRequest) -> Result<WireResponse, AdliftError> {
        self.requests.lock().await.push(request);

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        // Hold the exchange open briefly so overlapping sends would be
        // observable through max_in_flight.
        tokio::time::sleep(self.latency).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.next_outcome().await {
            ScriptedOutcome::Status(status, body) => Ok(WireResponse { status, body }),
            ScriptedOutcome::NetworkError => Err(AdliftError::Network {
                message: "scripted connection failure".to_string(),
                source: None,
            }),
        }
    }
}
