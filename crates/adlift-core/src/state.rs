// SPDX-FileCopyrightText: 2026 Adlift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-install activity state.
//!
//! One [`ActivityState`] exists per installed app instance. It is owned and
//! mutated exclusively by the activity handler and persisted on every
//! mutation that affects retried delivery guarantees. The install `uuid`
//! is generated once and never changes; counters only ever increase, with
//! the single documented exception that `subsession_count` restarts at 1
//! when a new session begins.

use serde::{Deserialize, Serialize};

use crate::types::Attribution;

/// Most-recent transaction ids kept for revenue de-duplication.
pub const TRANSACTION_ID_CAPACITY: usize = 10;

/// Mutable counters and flags describing one install's tracking history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityState {
    /// Stable per-install identifier, generated once at first launch.
    pub uuid: String,
    /// Whether tracking is currently active.
    pub enabled: bool,
    /// Whether an attribution fetch is outstanding.
    pub asking_attribution: bool,
    /// Set once a forget-me request is accepted; permanently disables tracking.
    pub is_gdpr_forgotten: bool,
    pub event_count: u64,
    pub session_count: u64,
    pub subsession_count: u64,
    /// Accumulated foreground+background length of the current session.
    pub session_length_secs: i64,
    /// Accumulated foreground time of the current session.
    pub time_spent_secs: i64,
    /// Unix seconds of the last recorded activity; 0 before the first session.
    pub last_activity: i64,
    /// Recently seen purchase transaction ids, oldest first.
    pub transaction_ids: Vec<String>,
    /// Push token last handed to the pipeline, if any.
    pub push_token: Option<String>,
    /// Attribution snapshot last received from the backend, if any.
    pub attribution: Option<Attribution>,
}

impl ActivityState {
    /// Fresh state for a new install.
    pub fn new() -> Self {
        ActivityState {
            uuid: uuid::Uuid::new_v4().to_string(),
            enabled: true,
            asking_attribution: false,
            is_gdpr_forgotten: false,
            event_count: 0,
            session_count: 0,
            subsession_count: 0,
            session_length_secs: 0,
            time_spent_secs: 0,
            last_activity: 0,
            transaction_ids: Vec::new(),
            push_token: None,
            attribution: None,
        }
    }

    /// Begin a new session at `now` (unix seconds).
    ///
    /// Resets the subsession counter and the per-session durations.
    pub fn start_new_session(&mut self, now: i64) {
        self.session_count += 1;
        self.subsession_count = 1;
        self.session_length_secs = 0;
        self.time_spent_secs = 0;
        self.last_activity = now;
    }

    /// Continue the current session with a new subsession.
    pub fn start_subsession(&mut self) {
        self.subsession_count += 1;
    }

    /// Fold elapsed foreground time into the session durations.
    ///
    /// Negative deltas (clock adjustment) are ignored.
    pub fn update_activity(&mut self, now: i64) {
        let delta = now - self.last_activity;
        if delta >= 0 {
            self.session_length_secs += delta;
            self.time_spent_secs += delta;
        }
        self.last_activity = now;
    }

    /// Count one tracked event.
    pub fn record_event(&mut self) {
        self.event_count += 1;
    }

    /// Remember a purchase transaction id, evicting the oldest entry once
    /// the capacity bound is reached. Re-adding a known id is a no-op.
    pub fn add_transaction_id(&mut self, transaction_id: &str) {
        if self.find_transaction_id(transaction_id) {
            return;
        }
        if self.transaction_ids.len() >= TRANSACTION_ID_CAPACITY {
            self.transaction_ids.remove(0);
        }
        self.transaction_ids.push(transaction_id.to_string());
    }

    /// Whether this transaction id was seen recently.
    pub fn find_transaction_id(&self, transaction_id: &str) -> bool {
        self.transaction_ids.iter().any(|id| id == transaction_id)
    }
}

impl Default for ActivityState {
    fn default() -> Self {
        Self::new()
    }
}
