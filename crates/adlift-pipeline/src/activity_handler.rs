// SPDX-FileCopyrightText: 2026 Adlift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The pipeline orchestrator.
//!
//! [`ActivityHandler`] exclusively owns the per-install [`ActivityState`]
//! and the user-supplied session parameters, wires the package builder to
//! the delivery queues, and maps app lifecycle transitions onto
//! session/subsession boundaries. All state mutations go through one
//! mutex, giving the single-writer discipline the persisted snapshot
//! relies on. Nothing here surfaces failures to the app: delivery is
//! best-effort and problems end up in the log.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use adlift_config::AdliftConfig;
use adlift_core::{
    ActivityState, AdliftError, AdliftEvent, Attribution, DeviceInfo, ResponseData,
    SessionParameters, Transport,
};
use adlift_net::RequestHandler;
use adlift_storage::StateStore;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info, warn};

use crate::attribution::AttributionHandler;
use crate::builder::PackageBuilder;
use crate::click_handler::SdkClickHandler;
use crate::package_handler::PackageHandler;

type AttributionCallback = Box<dyn Fn(Attribution) + Send + Sync>;

/// Root of the tracking pipeline; one per app install.
pub struct ActivityHandler {
    config: AdliftConfig,
    device: DeviceInfo,
    state: Mutex<ActivityState>,
    session_params: Mutex<SessionParameters>,
    state_store: StateStore,
    package_handler: PackageHandler,
    click_handler: SdkClickHandler,
    attribution_handler: AttributionHandler,
    attribution_callback: Mutex<Option<AttributionCallback>>,
    /// Set by teardown; read and written under the state lock so no late
    /// completion can write to storage after an erase.
    closed: AtomicBool,
}

impl ActivityHandler {
    /// Construct the pipeline: open the stores, restore state (or create a
    /// fresh install), and wire the handlers to the injected transport.
    ///
    /// The main package queue starts paused and resumes on the first
    /// foreground; the click queue starts sending immediately.
    pub async fn init(
        config: AdliftConfig,
        device: DeviceInfo,
        transport: Arc<dyn Transport>,
    ) -> Result<Arc<Self>, AdliftError> {
        let state_store = StateStore::open(config.storage.state_db_path()).await?;

        let state = match state_store.load_state().await? {
            Some(state) => state,
            None => {
                let state = ActivityState::new();
                state_store.save_state(&state).await?;
                info!(uuid = %state.uuid, "created fresh activity state");
                state
            }
        };
        let session_params = state_store.load_session_params().await?.unwrap_or_default();

        let request_handler =
            RequestHandler::new(Arc::clone(&transport), config.app.app_token.clone());

        // Strategy names were validated with the config; fall back defensively anyway.
        let package_backoff = adlift_core::BackoffStrategy::by_name(&config.backoff.package_strategy)
            .unwrap_or_else(adlift_core::BackoffStrategy::long_wait);
        let click_backoff = adlift_core::BackoffStrategy::by_name(&config.backoff.click_strategy)
            .unwrap_or_else(adlift_core::BackoffStrategy::short_wait);
        let attribution_backoff =
            adlift_core::BackoffStrategy::by_name(&config.backoff.attribution_strategy)
                .unwrap_or_else(adlift_core::BackoffStrategy::short_wait);

        let package_handler = PackageHandler::init(
            config.storage.package_queue_db_path(),
            request_handler.clone(),
            package_backoff,
            false,
        )
        .await?;

        let click_handler = SdkClickHandler::init(
            config.storage.click_queue_db_path(),
            request_handler.clone(),
            click_backoff,
            true,
        )
        .await?;

        let (results_tx, mut results_rx) = mpsc::channel::<ResponseData>(16);
        let attribution_handler =
            AttributionHandler::new(request_handler, attribution_backoff, results_tx);

        let handler = Arc::new(Self {
            config,
            device,
            state: Mutex::new(state),
            session_params: Mutex::new(session_params),
            state_store,
            package_handler,
            click_handler,
            attribution_handler,
            attribution_callback: Mutex::new(None),
            closed: AtomicBool::new(false),
        });

        // Consume attribution results for the handler's lifetime. Weak so
        // a dropped pipeline tears the task down with it.
        let weak: Weak<Self> = Arc::downgrade(&handler);
        tokio::spawn(async move {
            while let Some(response) = results_rx.recv().await {
                match weak.upgrade() {
                    Some(handler) => handler.handle_attribution_response(response).await,
                    None => break,
                }
            }
        });

        Ok(handler)
    }

    /// Register a callback fired whenever the backend-assigned attribution
    /// actually changes.
    pub async fn on_attribution_changed(
        &self,
        callback: impl Fn(Attribution) + Send + Sync + 'static,
    ) {
        *self.attribution_callback.lock().await = Some(Box::new(callback));
    }

    /// App came to the foreground: decide between first session, new
    /// session, subsession continuation, and plain activity update.
    pub async fn on_foreground(&self) {
        let now = chrono::Utc::now().timestamp();
        self.on_foreground_at(now).await;
    }

    /// Testable entry point with an explicit clock.
    pub async fn on_foreground_at(&self, now: i64) {
        let mut first_session = false;
        {
            let mut state = self.state.lock().await;
            if !tracking_allowed(&state) {
                debug!("foreground ignored, tracking disabled");
                return;
            }

            if state.session_count == 0 {
                state.start_new_session(now);
                first_session = true;
                info!(session_count = state.session_count, "first session started");
                self.enqueue_session_package(&state).await;
            } else {
                let gap = now - state.last_activity;
                if gap < 0 {
                    // Clock moved backwards; re-anchor without counting time.
                    state.last_activity = now;
                } else if gap > self.config.session.session_window_secs {
                    state.start_new_session(now);
                    info!(session_count = state.session_count, "new session started");
                    self.enqueue_session_package(&state).await;
                } else if gap > self.config.session.subsession_window_secs {
                    state.start_subsession();
                    state.update_activity(now);
                    debug!(subsession_count = state.subsession_count, "subsession started");
                } else {
                    state.update_activity(now);
                }
            }
            self.persist_state(&state).await;
        }

        self.package_handler.resume_sending().await;
        self.click_handler.send_first().await;

        if first_session {
            self.ask_attribution().await;
        }
    }

    /// App went to the background: fold in elapsed time and, unless
    /// configured otherwise, stop the main queue. The click queue keeps
    /// its own schedule.
    pub async fn on_background(&self) {
        let now = chrono::Utc::now().timestamp();
        self.on_background_at(now).await;
    }

    /// Testable entry point with an explicit clock.
    pub async fn on_background_at(&self, now: i64) {
        {
            let mut state = self.state.lock().await;
            if state.session_count > 0 {
                state.update_activity(now);
                self.persist_state(&state).await;
            }
        }

        if !self.config.network.send_in_background {
            self.package_handler.pause_sending().await;
        }
        debug!("backgrounded");
    }

    /// Track one event: validate, de-duplicate revenue transactions,
    /// count, build, enqueue, send.
    pub async fn track_event(&self, event: AdliftEvent) {
        if !event.is_valid() {
            return;
        }

        let now = chrono::Utc::now().timestamp();
        {
            let mut state = self.state.lock().await;
            if !tracking_allowed(&state) {
                debug!("event ignored, tracking disabled");
                return;
            }

            if let Some(transaction_id) = &event.transaction_id {
                if state.find_transaction_id(transaction_id) {
                    info!(transaction_id = %transaction_id, "skipping duplicate transaction");
                    return;
                }
                state.add_transaction_id(transaction_id);
            }

            state.record_event();
            state.update_activity(now);
            self.persist_state(&state).await;

            let session_params = self.session_params.lock().await;
            let builder =
                PackageBuilder::new(&self.config, &self.device, &state, &session_params, now);
            let package = builder.build_event_package(&event, false);
            self.package_handler.add_package(package).await;
        }
        self.package_handler.send_first().await;
    }

    /// Track a deep-link/referrer click through the independent click queue.
    pub async fn track_click(&self, source: &str, deep_link: Option<&str>) {
        let now = chrono::Utc::now().timestamp();
        let package = {
            let state = self.state.lock().await;
            if !tracking_allowed(&state) {
                debug!("click ignored, tracking disabled");
                return;
            }
            let session_params = self.session_params.lock().await;
            let builder =
                PackageBuilder::new(&self.config, &self.device, &state, &session_params, now);
            builder.build_click_package(source, deep_link)
        };
        self.click_handler.add_click(package).await;
    }

    /// Wrap an opaque ad-revenue payload and enqueue it.
    pub async fn track_ad_revenue(&self, source: &str, payload: serde_json::Value) {
        let now = chrono::Utc::now().timestamp();
        {
            let state = self.state.lock().await;
            if !tracking_allowed(&state) {
                debug!("ad revenue ignored, tracking disabled");
                return;
            }
            let session_params = self.session_params.lock().await;
            let builder =
                PackageBuilder::new(&self.config, &self.device, &state, &session_params, now);
            let package = builder.build_ad_revenue_package(source, &payload);
            self.package_handler.add_package(package).await;
        }
        self.package_handler.send_first().await;
    }

    /// Toggle tracking. Disabling pauses every delivery pipeline; enabling
    /// resumes them.
    pub async fn set_enabled(&self, enabled: bool) {
        {
            let mut state = self.state.lock().await;
            if state.enabled == enabled {
                warn!(enabled, "tracking already in requested state");
                return;
            }
            if state.is_gdpr_forgotten {
                warn!("install is forgotten, ignoring enable toggle");
                return;
            }
            state.enabled = enabled;
            self.persist_state(&state).await;
        }

        if enabled {
            info!("tracking enabled");
            self.package_handler.resume_sending().await;
            self.click_handler.resume_sending().await;
            self.attribution_handler.resume_sending().await;
        } else {
            info!("tracking disabled");
            self.package_handler.pause_sending().await;
            self.click_handler.pause_sending().await;
            self.attribution_handler.pause_sending().await;
        }
    }

    /// Hand the pipeline a new push token; unchanged tokens are ignored.
    pub async fn set_push_token(&self, token: &str) {
        let now = chrono::Utc::now().timestamp();
        {
            let mut state = self.state.lock().await;
            if !tracking_allowed(&state) {
                return;
            }
            if state.push_token.as_deref() == Some(token) {
                debug!("push token unchanged");
                return;
            }
            state.push_token = Some(token.to_string());
            self.persist_state(&state).await;

            let session_params = self.session_params.lock().await;
            let builder =
                PackageBuilder::new(&self.config, &self.device, &state, &session_params, now);
            let package = builder.build_info_package("push");
            self.package_handler.add_package(package).await;
        }
        self.package_handler.send_first().await;
    }

    /// Ask the backend to forget this install. Tracking stops permanently;
    /// the forget-me package itself still drains through the main queue.
    pub async fn gdpr_forget_me(&self) {
        let now = chrono::Utc::now().timestamp();
        {
            let mut state = self.state.lock().await;
            if state.is_gdpr_forgotten {
                debug!("install already forgotten");
                return;
            }

            let session_params = self.session_params.lock().await;
            let builder =
                PackageBuilder::new(&self.config, &self.device, &state, &session_params, now);
            let package = builder.build_gdpr_package();
            drop(session_params);

            state.is_gdpr_forgotten = true;
            self.persist_state(&state).await;
            self.package_handler.add_package(package).await;
            info!("forget-me requested, tracking permanently disabled");
        }
        // The forget-me package itself must go out even if the queue was
        // paused (backgrounded app, disabled-then-forgotten install).
        self.package_handler.resume_sending().await;
    }

    /// Add a session-level callback parameter, rewriting queued packages.
    pub async fn add_session_callback_parameter(&self, key: &str, value: &str) {
        let changed = {
            let mut params = self.session_params.lock().await;
            params.add_callback_param(key, value)
        };
        if changed {
            self.propagate_session_params().await;
        }
    }

    /// Add a session-level partner parameter, rewriting queued packages.
    pub async fn add_session_partner_parameter(&self, key: &str, value: &str) {
        let changed = {
            let mut params = self.session_params.lock().await;
            params.add_partner_param(key, value)
        };
        if changed {
            self.propagate_session_params().await;
        }
    }

    pub async fn remove_session_callback_parameter(&self, key: &str) {
        let changed = {
            let mut params = self.session_params.lock().await;
            params.remove_callback_param(key)
        };
        if changed {
            self.propagate_session_params().await;
        }
    }

    pub async fn remove_session_partner_parameter(&self, key: &str) {
        let changed = {
            let mut params = self.session_params.lock().await;
            params.remove_partner_param(key)
        };
        if changed {
            self.propagate_session_params().await;
        }
    }

    /// Trigger an attribution fetch unless one is already outstanding.
    pub async fn ask_attribution(&self) {
        let package = {
            let mut state = self.state.lock().await;
            if state.asking_attribution {
                debug!("attribution already being fetched");
                return;
            }
            if !tracking_allowed(&state) {
                return;
            }
            state.asking_attribution = true;
            self.persist_state(&state).await;

            let session_params = self.session_params.lock().await;
            let builder = PackageBuilder::new(
                &self.config,
                &self.device,
                &state,
                &session_params,
                chrono::Utc::now().timestamp(),
            );
            builder.build_attribution_package("sdk")
        };
        self.attribution_handler.fetch(package).await;
    }

    /// Resume both delivery queues without recording any lifecycle
    /// activity. Used by operational tooling to flush whatever is queued.
    pub async fn resume_delivery(&self) {
        self.package_handler.resume_sending().await;
        self.click_handler.resume_sending().await;
    }

    /// Stop the pipeline, persisting (or with `delete_state`, erasing)
    /// everything durable.
    pub async fn teardown(&self, delete_state: bool) {
        {
            let state = self.state.lock().await;
            self.closed.store(true, Ordering::SeqCst);
            if delete_state {
                if let Err(e) = self.state_store.erase().await {
                    error!(error = %e, "failed to erase persisted state");
                }
            } else {
                self.persist_state(&state).await;
            }
        }
        self.package_handler.teardown(delete_state).await;
        self.click_handler.teardown(delete_state).await;
        info!(delete_state, "pipeline torn down");
    }

    /// Copy of the current activity state, for status display and tests.
    pub async fn state_snapshot(&self) -> ActivityState {
        self.state.lock().await.clone()
    }

    /// Depths of (main queue, click queue).
    pub async fn queue_depths(&self) -> (usize, usize) {
        (
            self.package_handler.depth().await,
            self.click_handler.depth().await,
        )
    }

    /// One completed attribution fetch from the attribution handler.
    async fn handle_attribution_response(&self, response: ResponseData) {
        let ask_again = {
            let mut state = self.state.lock().await;
            if self.closed.load(Ordering::SeqCst) {
                return;
            }
            state.asking_attribution = false;

            if let Some(attribution) = &response.attribution
                && state.attribution.as_ref() != Some(attribution)
            {
                state.attribution = Some(attribution.clone());
                info!("attribution changed");
                let callback = self.attribution_callback.lock().await;
                if let Some(callback) = callback.as_ref() {
                    callback(attribution.clone());
                }
            }

            let ask_again = response.ask_in_secs.map(Duration::from_secs);
            if ask_again.is_some() {
                state.asking_attribution = true;
            }
            self.persist_state(&state).await;

            if let Some(delay) = ask_again {
                let session_params = self.session_params.lock().await;
                let builder = PackageBuilder::new(
                    &self.config,
                    &self.device,
                    &state,
                    &session_params,
                    chrono::Utc::now().timestamp(),
                );
                Some((builder.build_attribution_package("backend"), delay))
            } else {
                None
            }
        };

        if let Some((package, delay)) = ask_again {
            self.attribution_handler.schedule_fetch(package, delay);
        }
    }

    /// Build and enqueue a session package for the current state. Callers
    /// hold the state lock.
    async fn enqueue_session_package(&self, state: &ActivityState) {
        let session_params = self.session_params.lock().await;
        let builder = PackageBuilder::new(
            &self.config,
            &self.device,
            state,
            &session_params,
            state.last_activity,
        );
        let package = builder.build_session_package(false);
        drop(session_params);
        self.package_handler.add_package(package).await;
    }

    /// Persist the state snapshot; a failure is logged and the pipeline
    /// continues on the in-memory copy.
    async fn persist_state(&self, state: &ActivityState) {
        if let Err(e) = self.state_store.save_state(state).await {
            error!(error = %e, "failed to persist activity state, continuing in memory");
        }
    }

    /// Push the new session parameters to storage and every queued package.
    async fn propagate_session_params(&self) {
        let snapshot = self.session_params.lock().await.clone();
        if let Err(e) = self.state_store.save_session_params(&snapshot).await {
            error!(error = %e, "failed to persist session parameters, continuing in memory");
        }
        self.package_handler.update_packages(&snapshot).await;
        self.click_handler.update_packages(&snapshot).await;
    }
}

fn tracking_allowed(state: &ActivityState) -> bool {
    state.enabled && !state.is_gdpr_forgotten
}
