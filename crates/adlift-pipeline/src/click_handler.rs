// SPDX-FileCopyrightText: 2026 Adlift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable FIFO queue for click/deep-link packages.
//!
//! Deliberately a separate pipeline from [`PackageHandler`]: click
//! attribution has its own privacy/consent and timing requirements, so it
//! gets its own persisted queue file, its own pause/resume toggle (it is
//! never gated by the main queue's send-in-background setting), and its
//! own `starts_sending` flag at construction. The retry discipline is the
//! same: at most one click on the wire, strict FIFO, terminal failures
//! dropped, retryable failures backed off.
//!
//! [`PackageHandler`]: crate::package_handler::PackageHandler

use std::collections::VecDeque;
use std::sync::Arc;

use adlift_core::{ActivityPackage, BackoffStrategy, ResponseData, SessionParameters};
use adlift_net::RequestHandler;
use adlift_storage::{PackageStore, StoredPackage};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::builder::apply_session_parameters;

const UNPERSISTED: i64 = -1;

#[derive(Default)]
struct Flags {
    paused: bool,
    in_flight: bool,
    closed: bool,
}

struct Inner {
    store: PackageStore,
    queue: Mutex<VecDeque<StoredPackage>>,
    flags: Mutex<Flags>,
    request_handler: RequestHandler,
    backoff: BackoffStrategy,
}

/// Independent delivery pipeline for click packages.
#[derive(Clone)]
pub struct SdkClickHandler {
    inner: Arc<Inner>,
}

impl SdkClickHandler {
    /// Open the click queue database at `path` and reload any clicks left
    /// from a previous run. With `starts_sending` false the handler waits
    /// for an explicit resume before touching the network.
    pub async fn init(
        path: impl AsRef<std::path::Path>,
        request_handler: RequestHandler,
        backoff: BackoffStrategy,
        starts_sending: bool,
    ) -> Result<Self, adlift_core::AdliftError> {
        let store = PackageStore::open(path).await?;
        let queue: VecDeque<StoredPackage> = store.load().await?.into();
        if !queue.is_empty() {
            info!(depth = queue.len(), "restored click queue from storage");
        }

        Ok(Self {
            inner: Arc::new(Inner {
                store,
                queue: Mutex::new(queue),
                flags: Mutex::new(Flags {
                    paused: !starts_sending,
                    ..Flags::default()
                }),
                request_handler,
                backoff,
            }),
        })
    }

    /// Append a click package, persist it, and immediately try to send.
    ///
    /// Clicks are low priority but latency matters for deferred deep
    /// linking, so enqueue kicks the sender directly.
    pub async fn add_click(&self, package: ActivityPackage) {
        let id = match self.inner.store.append(&package).await {
            Ok(id) => id,
            Err(e) => {
                error!(package = %package.log_label(), error = %e,
                    "failed to persist click, keeping it in memory only");
                UNPERSISTED
            }
        };

        {
            let mut queue = self.inner.queue.lock().await;
            queue.push_back(StoredPackage { id, package });
            info!(depth = queue.len(), "click queued");
        }
        self.send_first().await;
    }

    /// Send the head click unless paused, closed, empty, or already sending.
    pub fn send_first(&self) -> impl std::future::Future<Output = ()> + Send + '_ {
        async move {
            let stored = {
                let mut flags = self.inner.flags.lock().await;
                if flags.paused || flags.in_flight || flags.closed {
                    return;
                }
                let queue = self.inner.queue.lock().await;
                match queue.front() {
                    Some(stored) => {
                        flags.in_flight = true;
                        stored.clone()
                    }
                    None => return,
                }
            };

            debug!(package = %stored.package.log_label(), retries = stored.package.retries,
                "sending click");
            let handler = self.clone();
            tokio::spawn(async move {
                let response = handler
                    .inner
                    .request_handler
                    .send_package(&stored.package)
                    .await;
                handler.send_next(response).await;
            });
        }
    }

    /// Completion callback for one click attempt.
    pub async fn send_next(&self, response: ResponseData) {
        self.inner.flags.lock().await.in_flight = false;

        let retryable =
            !response.success && response.will_retry && !self.inner.backoff.is_no_retry();
        if !retryable {
            self.close_first(&response).await;
            self.send_first().await;
            return;
        }

        let rescheduled = {
            let mut queue = self.inner.queue.lock().await;
            queue.front_mut().map(|head| {
                head.package.increment_retries();
                (head.id, head.package.clone())
            })
        };
        let Some((id, package)) = rescheduled else {
            return;
        };

        if id != UNPERSISTED
            && let Err(e) = self.inner.store.update(id, &package).await
        {
            error!(error = %e, "failed to persist click retry count");
        }

        let delay = self.inner.backoff.delay_for(package.retries);
        warn!(package = %package.log_label(), retries = package.retries,
            delay_ms = delay.as_millis() as u64, "click delivery failed, retrying after backoff");

        let handler = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            handler.send_first().await;
        });
    }

    /// Remove the head click after a definitive outcome.
    pub async fn close_first(&self, response: &ResponseData) {
        let removed = {
            let mut queue = self.inner.queue.lock().await;
            queue.pop_front()
        };
        let Some(stored) = removed else {
            return;
        };

        if response.success {
            info!(package = %stored.package.log_label(), "click delivered");
        } else {
            warn!(package = %stored.package.log_label(), message = ?response.message,
                "click dropped after terminal failure");
        }

        if stored.id != UNPERSISTED
            && let Err(e) = self.inner.store.remove(stored.id).await
        {
            error!(error = %e, "failed to remove delivered click from storage");
        }
    }

    /// Stop starting new sends; independent of the main queue's state.
    pub async fn pause_sending(&self) {
        self.inner.flags.lock().await.paused = true;
        debug!("click handler paused");
    }

    /// Allow sends again and drain the queue.
    pub async fn resume_sending(&self) {
        self.inner.flags.lock().await.paused = false;
        debug!("click handler resumed");
        self.send_first().await;
    }

    /// Re-merge queued clicks' callback/partner parameters.
    pub async fn update_packages(&self, session_params: &SessionParameters) {
        let updates: Vec<(i64, ActivityPackage)> = {
            let mut queue = self.inner.queue.lock().await;
            queue
                .iter_mut()
                .map(|stored| {
                    apply_session_parameters(&mut stored.package, session_params);
                    (stored.id, stored.package.clone())
                })
                .collect()
        };

        for (id, package) in updates {
            if id != UNPERSISTED
                && let Err(e) = self.inner.store.update(id, &package).await
            {
                error!(error = %e, "failed to persist rewritten click");
            }
        }
    }

    /// Stop the handler, optionally erasing the persisted queue.
    pub async fn teardown(&self, delete_state: bool) {
        self.inner.flags.lock().await.closed = true;
        self.inner.queue.lock().await.clear();
        if delete_state
            && let Err(e) = self.inner.store.clear().await
        {
            error!(error = %e, "failed to erase persisted click queue");
        }
        info!(delete_state, "click handler torn down");
    }

    /// Current queue depth.
    pub async fn depth(&self) -> usize {
        self.inner.queue.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use adlift_core::{ActivityKind, Transport};
    use adlift_test_utils::{MockTransport, ScriptedOutcome};
    use tempfile::tempdir;

    fn click(suffix: &str) -> ActivityPackage {
        let mut parameters = std::collections::BTreeMap::new();
        parameters.insert("source".to_string(), "deeplink".to_string());
        ActivityPackage {
            activity_kind: ActivityKind::Click,
            path: "/sdk_click".to_string(),
            client_sdk: "rust0.1.0".to_string(),
            parameters,
            retries: 0,
            suffix: suffix.to_string(),
            callback_params: std::collections::BTreeMap::new(),
            partner_params: std::collections::BTreeMap::new(),
        }
    }

    async fn handler_with(
        dir: &std::path::Path,
        transport: Arc<MockTransport>,
        starts_sending: bool,
    ) -> SdkClickHandler {
        let request_handler =
            RequestHandler::new(transport as Arc<dyn Transport>, "abc123");
        SdkClickHandler::init(
            dir.join("clicks.db"),
            request_handler,
            BackoffStrategy::no_wait(),
            starts_sending,
        )
        .await
        .unwrap()
    }

    async fn wait_for_depth(handler: &SdkClickHandler, depth: usize) {
        for _ in 0..200 {
            if handler.depth().await == depth {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("click queue never reached depth {depth}");
    }

    #[tokio::test]
    async fn add_click_sends_immediately() {
        let dir = tempdir().unwrap();
        let transport = MockTransport::new();
        let handler = handler_with(dir.path(), Arc::clone(&transport), true).await;

        handler.add_click(click("c1")).await;
        wait_for_depth(&handler, 0).await;
        assert_eq!(transport.request_count().await, 1);
    }

    #[tokio::test]
    async fn starts_sending_false_holds_queue_until_resume() {
        let dir = tempdir().unwrap();
        let transport = MockTransport::new();
        let handler = handler_with(dir.path(), Arc::clone(&transport), false).await;

        handler.add_click(click("c1")).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(transport.request_count().await, 0);
        assert_eq!(handler.depth().await, 1);

        handler.resume_sending().await;
        wait_for_depth(&handler, 0).await;
        assert_eq!(transport.request_count().await, 1);
    }

    #[tokio::test]
    async fn click_retry_discipline_matches_main_queue() {
        let dir = tempdir().unwrap();
        let transport = MockTransport::with_outcomes(vec![
            ScriptedOutcome::unavailable(),
            ScriptedOutcome::ok(),
        ]);
        let handler = handler_with(dir.path(), Arc::clone(&transport), true).await;

        handler.add_click(click("c1")).await;
        wait_for_depth(&handler, 0).await;
        assert_eq!(transport.request_count().await, 2);
    }

    #[tokio::test]
    async fn terminal_click_failure_drops_package() {
        let dir = tempdir().unwrap();
        let transport = MockTransport::with_outcomes(vec![ScriptedOutcome::rejected()]);
        let handler = handler_with(dir.path(), Arc::clone(&transport), true).await;

        handler.add_click(click("c1")).await;
        wait_for_depth(&handler, 0).await;
        assert_eq!(transport.request_count().await, 1);
    }

    #[tokio::test]
    async fn click_queue_restores_across_restart() {
        let dir = tempdir().unwrap();
        let transport = MockTransport::new();
        {
            let handler = handler_with(dir.path(), Arc::clone(&transport), false).await;
            handler.add_click(click("c1")).await;
            handler.teardown(false).await;
        }

        let restored = handler_with(dir.path(), MockTransport::new(), false).await;
        assert_eq!(restored.depth().await, 1);
    }
}
