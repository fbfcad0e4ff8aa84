// SPDX-FileCopyrightText: 2026 Adlift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable FIFO queue for session/event packages.
//!
//! The handler owns its queue exclusively: an in-memory mirror of the
//! persisted rows, reloaded on construction so delivery resumes after a
//! crash or restart. At most one package is on the wire at any time, and
//! packages leave the head strictly in enqueue order: a head package's
//! retries never let a later package jump ahead.
//!
//! A persisted write failure is logged and the operation continues on the
//! in-memory state; a crash before the next successful write loses that
//! one mutation. This is the component's accepted durability trade-off.

use std::collections::VecDeque;
use std::sync::Arc;

use adlift_core::{ActivityPackage, BackoffStrategy, ResponseData, SessionParameters};
use adlift_net::RequestHandler;
use adlift_storage::{PackageStore, StoredPackage};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::builder::apply_session_parameters;

/// Rowid stand-in for a package whose persist failed; never matches a row.
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

/// Ordered, persisted queue of activity packages with retry bookkeeping.
#[derive(Clone)]
pub struct PackageHandler {
    inner: Arc<Inner>,
}

impl PackageHandler {
    /// Open the queue database at `path`, reload any packages left from a
    /// previous run, and start in the paused state unless `starts_sending`.
    pub async fn init(
        path: impl AsRef<std::path::Path>,
        request_handler: RequestHandler,
        backoff: BackoffStrategy,
        starts_sending: bool,
    ) -> Result<Self, adlift_core::AdliftError> {
        let store = PackageStore::open(path).await?;
        let queue: VecDeque<StoredPackage> = store.load().await?.into();
        if !queue.is_empty() {
            info!(depth = queue.len(), "restored package queue from storage");
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

    /// Append a package to the tail, persisting it before returning.
    pub async fn add_package(&self, package: ActivityPackage) {
        let id = match self.inner.store.append(&package).await {
            Ok(id) => id,
            Err(e) => {
                error!(package = %package.log_label(), error = %e,
                    "failed to persist package, keeping it in memory only");
                UNPERSISTED
            }
        };

        let mut queue = self.inner.queue.lock().await;
        queue.push_back(StoredPackage { id, package });
        info!(depth = queue.len(), "package queued");
    }

    /// Hand the head package to the request handler, unless paused, closed,
    /// empty, or a send is already in flight (then this is a no-op).
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
                "sending package");
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

    /// Completion callback: record the attempt's outcome and keep draining.
    ///
    /// Success or a terminal failure removes the head; a retryable failure
    /// bumps its retry count and reschedules the same head after backoff.
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
            error!(error = %e, "failed to persist retry count");
        }

        let delay = self.inner.backoff.delay_for(package.retries);
        warn!(package = %package.log_label(), retries = package.retries,
            delay_ms = delay.as_millis() as u64, "delivery failed, retrying after backoff");

        let handler = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            handler.send_first().await;
        });
    }

    /// Remove the head package after a definitive outcome.
    pub async fn close_first(&self, response: &ResponseData) {
        let removed = {
            let mut queue = self.inner.queue.lock().await;
            queue.pop_front()
        };
        let Some(stored) = removed else {
            return;
        };

        if response.success {
            info!(package = %stored.package.log_label(), "package delivered");
        } else {
            warn!(package = %stored.package.log_label(), message = ?response.message,
                "package dropped after terminal failure");
        }

        if stored.id != UNPERSISTED
            && let Err(e) = self.inner.store.remove(stored.id).await
        {
            error!(error = %e, "failed to remove delivered package from storage");
        }
    }

    /// Stop starting new sends. An in-flight send completes normally.
    pub async fn pause_sending(&self) {
        self.inner.flags.lock().await.paused = true;
        debug!("package handler paused");
    }

    /// Allow sends again and drain the queue.
    pub async fn resume_sending(&self) {
        self.inner.flags.lock().await.paused = false;
        debug!("package handler resumed");
        self.send_first().await;
    }

    /// Re-merge the callback/partner parameters of every queued package
    /// against the new session parameters. Order and other fields are
    /// untouched; the attempt already on the wire (a clone of the head)
    /// is unaffected until its next retry.
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

        debug!(count = updates.len(), "rewriting queued package parameters");
        for (id, package) in updates {
            if id != UNPERSISTED
                && let Err(e) = self.inner.store.update(id, &package).await
            {
                error!(error = %e, "failed to persist rewritten package");
            }
        }
    }

    /// Stop the handler. With `delete_state`, the persisted queue is
    /// erased as well; otherwise it remains for the next launch.
    pub async fn teardown(&self, delete_state: bool) {
        self.inner.flags.lock().await.closed = true;
        self.inner.queue.lock().await.clear();
        if delete_state
            && let Err(e) = self.inner.store.clear().await
        {
            error!(error = %e, "failed to erase persisted queue");
        }
        info!(delete_state, "package handler torn down");
    }

    /// Current queue depth.
    pub async fn depth(&self) -> usize {
        self.inner.queue.lock().await.len()
    }
}
