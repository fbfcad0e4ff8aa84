// SPDX-FileCopyrightText: 2026 Adlift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User-facing event type with validation.
//!
//! An [`AdliftEvent`] describes one trackable in-app action: an event token
//! assigned by the backend dashboard, optional revenue with its currency,
//! an optional purchase transaction id for revenue de-duplication, and
//! per-event callback/partner parameters that override the session-level
//! ones on key collision.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::error;

/// One trackable in-app action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdliftEvent {
    /// Backend-assigned event token.
    pub event_token: String,
    /// Revenue in currency units (1.50 EUR is 1.5).
    pub revenue: Option<f64>,
    /// ISO 4217 currency code, required when revenue is set.
    pub currency: Option<String>,
    /// Purchase transaction id used to suppress duplicate revenue events.
    pub transaction_id: Option<String>,
    /// User-defined id reported back in success/failure callbacks.
    pub callback_id: Option<String>,
    /// Opaque purchase receipt, already encoded by the caller.
    pub receipt: Option<String>,
    pub callback_params: BTreeMap<String, String>,
    pub partner_params: BTreeMap<String, String>,
}

impl AdliftEvent {
    /// Create an event for the given token.
    pub fn new(event_token: impl Into<String>) -> Self {
        AdliftEvent {
            event_token: event_token.into(),
            ..AdliftEvent::default()
        }
    }

    /// Attach revenue in units with its ISO 4217 currency.
    pub fn set_revenue(&mut self, amount: f64, currency: impl Into<String>) {
        self.revenue = Some(amount);
        self.currency = Some(currency.into());
    }

    /// Set the purchase transaction id used for revenue de-duplication.
    pub fn set_transaction_id(&mut self, transaction_id: impl Into<String>) {
        self.transaction_id = Some(transaction_id.into());
    }

    pub fn add_callback_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.callback_params.insert(key.into(), value.into());
    }

    pub fn add_partner_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.partner_params.insert(key.into(), value.into());
    }

    /// Whether the event is well-formed enough to track.
    ///
    /// Invalid events are rejected before a package is built; optional
    /// fields that are merely absent never make an event invalid.
    pub fn is_valid(&self) -> bool {
        if self.event_token.is_empty() {
            error!("event rejected: missing event token");
            return false;
        }
        if let Some(revenue) = self.revenue {
            if revenue < 0.0 {
                error!(revenue, "event rejected: negative revenue");
                return false;
            }
            if self.currency.as_deref().is_none_or(str::is_empty) {
                error!("event rejected: revenue without currency");
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_event_is_valid() {
        assert!(AdliftEvent::new("abc123").is_valid());
    }

    #[test]
    fn empty_token_is_invalid() {
        assert!(!AdliftEvent::new("").is_valid());
    }

    #[test]
    fn revenue_requires_currency() {
        let mut event = AdliftEvent::new("abc123");
        event.revenue = Some(1.5);
        assert!(!event.is_valid());

        event.set_revenue(1.5, "EUR");
        assert!(event.is_valid());
    }

    #[test]
    fn negative_revenue_is_invalid() {
        let mut event = AdliftEvent::new("abc123");
        event.set_revenue(-0.01, "EUR");
        assert!(!event.is_valid());
    }

    #[test]
    fn event_level_params_accumulate() {
        let mut event = AdliftEvent::new("abc123");
        event.add_callback_param("a", "1");
        event.add_partner_param("b", "2");
        assert_eq!(event.callback_params.len(), 1);
        assert_eq!(event.partner_params.len(), 1);
    }
}
