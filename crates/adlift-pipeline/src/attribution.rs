// SPDX-FileCopyrightText: 2026 Adlift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Attribution fetching.
//!
//! Fetches attribution data on demand (the activity handler asks after the
//! first session) or on a timer (the server answered with an `ask_in`
//! delay). Only one fetch runs at a time; retryable failures back off with
//! the handler's own strategy, and every completed fetch, success or
//! terminal failure, is reported exactly once on the results channel. The
//! activity handler consumes that channel, owns the `asking_attribution`
//! flag, and decides whether the attribution actually changed.

use std::sync::Arc;
use std::time::Duration;

use adlift_core::{ActivityPackage, BackoffStrategy, ResponseData};
use adlift_net::RequestHandler;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};

struct Inner {
    request_handler: RequestHandler,
    backoff: BackoffStrategy,
    paused: Mutex<bool>,
    in_flight: Mutex<bool>,
    results_tx: mpsc::Sender<ResponseData>,
}

/// Single-flight attribution fetcher with its own pause toggle.
#[derive(Clone)]
pub struct AttributionHandler {
    inner: Arc<Inner>,
}

impl AttributionHandler {
    /// Completed fetches are reported on `results_tx`.
    pub fn new(
        request_handler: RequestHandler,
        backoff: BackoffStrategy,
        results_tx: mpsc::Sender<ResponseData>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                request_handler,
                backoff,
                paused: Mutex::new(false),
                in_flight: Mutex::new(false),
                results_tx,
            }),
        }
    }

    /// Start a fetch unless one is already running (then this is a no-op).
    pub async fn fetch(&self, package: ActivityPackage) {
        {
            let mut in_flight = self.inner.in_flight.lock().await;
            if *in_flight {
                debug!("attribution fetch already in flight");
                return;
            }
            *in_flight = true;
        }

        let handler = self.clone();
        tokio::spawn(async move {
            handler.run_fetch(package).await;
            *handler.inner.in_flight.lock().await = false;
        });
    }

    /// Start a fetch after `delay` (server-directed `ask_in` re-query).
    pub fn schedule_fetch(&self, package: ActivityPackage, delay: Duration) {
        debug!(delay_ms = delay.as_millis() as u64, "attribution re-query scheduled");
        let handler = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            handler.fetch(package).await;
        });
    }

    /// Stop new attempts. A fetch loop observing the pause gives up; the
    /// activity handler re-asks on the next trigger.
    pub async fn pause_sending(&self) {
        *self.inner.paused.lock().await = true;
        debug!("attribution handler paused");
    }

    pub async fn resume_sending(&self) {
        *self.inner.paused.lock().await = false;
        debug!("attribution handler resumed");
    }

    /// Attempt loop: retry on retryable failures, report the final outcome.
    async fn run_fetch(&self, mut package: ActivityPackage) {
        loop {
            if *self.inner.paused.lock().await {
                debug!("attribution fetch abandoned while paused");
                return;
            }

            let response = self.inner.request_handler.send_package(&package).await;
            let retryable =
                !response.success && response.will_retry && !self.inner.backoff.is_no_retry();

            if !retryable {
                if self.inner.results_tx.send(response).await.is_err() {
                    warn!("attribution results channel closed, dropping result");
                }
                return;
            }

            package.increment_retries();
            let delay = self.inner.backoff.delay_for(package.retries);
            warn!(retries = package.retries, delay_ms = delay.as_millis() as u64,
                "attribution fetch failed, retrying after backoff");
            tokio::time::sleep(delay).await;
        }
    }
}
