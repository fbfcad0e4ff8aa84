// SPDX-FileCopyrightText: 2026 Adlift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the Adlift pipeline crates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::warn;

/// The kind of trackable action a package describes.
///
/// The string form (via `Display`/`FromStr`) is what goes on the wire and
/// into storage, so the serialized names are part of the backend contract.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    #[strum(serialize = "session")]
    Session,
    #[strum(serialize = "event")]
    Event,
    #[strum(serialize = "click")]
    Click,
    #[strum(serialize = "attribution")]
    Attribution,
    #[strum(serialize = "info")]
    Info,
    #[strum(serialize = "gdpr")]
    Gdpr,
    #[strum(serialize = "ad_revenue")]
    AdRevenue,
}

impl ActivityKind {
    /// Backend endpoint suffix for this kind of package.
    pub fn path(&self) -> &'static str {
        match self {
            ActivityKind::Session => "/session",
            ActivityKind::Event => "/event",
            ActivityKind::Click => "/sdk_click",
            ActivityKind::Attribution => "/attribution",
            ActivityKind::Info => "/sdk_info",
            ActivityKind::Gdpr => "/gdpr_forget_device",
            ActivityKind::AdRevenue => "/ad_revenue",
        }
    }
}

/// One fully-parameterized, immutable unit of trackable data destined for
/// one HTTP call.
///
/// Built by the package builder at the moment a trackable action occurs,
/// then owned by a queue until a definitive delivery outcome is recorded.
/// The only mutation after construction is the retry counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityPackage {
    pub activity_kind: ActivityKind,
    /// Backend endpoint suffix, e.g. `/session`.
    pub path: String,
    /// SDK version string sent with every request.
    pub client_sdk: String,
    /// Full request body as key-value pairs. Values are pre-formatted
    /// strings; empty values are never inserted.
    pub parameters: BTreeMap<String, String>,
    /// Delivery attempts so far.
    pub retries: u32,
    /// Human-readable description used in log lines, e.g. `event 'abc123'`.
    pub suffix: String,
    /// Package-level callback parameters, kept separate from the merged
    /// `parameters` so queued packages can be re-merged when the
    /// session-level parameters change after enqueue.
    #[serde(default)]
    pub callback_params: BTreeMap<String, String>,
    /// Package-level partner parameters, kept for the same reason.
    #[serde(default)]
    pub partner_params: BTreeMap<String, String>,
}

impl ActivityPackage {
    /// Record one more failed delivery attempt.
    pub fn increment_retries(&mut self) {
        self.retries += 1;
    }

    /// Short log label: kind plus suffix.
    pub fn log_label(&self) -> String {
        if self.suffix.is_empty() {
            self.activity_kind.to_string()
        } else {
            format!("{} {}", self.activity_kind, self.suffix)
        }
    }
}

/// Attribution data assigned to this install by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribution {
    pub tracker_token: Option<String>,
    pub tracker_name: Option<String>,
    pub network: Option<String>,
    pub campaign: Option<String>,
    pub adgroup: Option<String>,
    pub creative: Option<String>,
    pub click_label: Option<String>,
    pub adid: Option<String>,
}

impl Attribution {
    /// Parse attribution out of a server response body.
    ///
    /// Missing or non-object `attribution` keys yield `None`.
    pub fn from_json(json: &serde_json::Value) -> Option<Self> {
        let obj = json.get("attribution")?.as_object()?;
        let field = |key: &str| obj.get(key).and_then(|v| v.as_str()).map(str::to_string);
        Some(Attribution {
            tracker_token: field("tracker_token"),
            tracker_name: field("tracker_name"),
            network: field("network"),
            campaign: field("campaign"),
            adgroup: field("adgroup"),
            creative: field("creative"),
            click_label: field("click_label"),
            adid: field("adid"),
        })
    }
}

/// Transient result of one network attempt. Never persisted.
#[derive(Debug, Clone, Default)]
pub struct ResponseData {
    pub activity_kind: Option<ActivityKind>,
    pub message: Option<String>,
    pub timestamp: Option<String>,
    /// Server-assigned device id.
    pub adid: Option<String>,
    pub success: bool,
    pub will_retry: bool,
    pub json_response: Option<serde_json::Value>,
    pub attribution: Option<Attribution>,
    /// Server request to re-fetch attribution after this many seconds.
    pub ask_in_secs: Option<u64>,
}

impl ResponseData {
    /// Empty response pre-tagged with the package's kind.
    pub fn for_package(package: &ActivityPackage) -> Self {
        ResponseData {
            activity_kind: Some(package.activity_kind),
            ..ResponseData::default()
        }
    }
}

/// User-supplied callback/partner parameters merged into every package
/// built after they are set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionParameters {
    pub callback_params: BTreeMap<String, String>,
    pub partner_params: BTreeMap<String, String>,
}

impl SessionParameters {
    /// Add a callback parameter. Returns `false` (and leaves the map
    /// untouched) when the same key already holds the same value.
    pub fn add_callback_param(&mut self, key: &str, value: &str) -> bool {
        Self::add(&mut self.callback_params, "callback", key, value)
    }

    /// Add a partner parameter, same overwrite rules as callback params.
    pub fn add_partner_param(&mut self, key: &str, value: &str) -> bool {
        Self::add(&mut self.partner_params, "partner", key, value)
    }

    pub fn remove_callback_param(&mut self, key: &str) -> bool {
        self.callback_params.remove(key).is_some()
    }

    pub fn remove_partner_param(&mut self, key: &str) -> bool {
        self.partner_params.remove(key).is_some()
    }

    fn add(map: &mut BTreeMap<String, String>, label: &str, key: &str, value: &str) -> bool {
        if key.is_empty() || value.is_empty() {
            warn!(kind = label, "ignoring session parameter with empty key or value");
            return false;
        }
        match map.get(key) {
            Some(existing) if existing == value => {
                warn!(kind = label, key, "session parameter already set to this value");
                false
            }
            Some(_) => {
                warn!(kind = label, key, "overwriting session parameter");
                map.insert(key.to_string(), value.to_string());
                true
            }
            None => {
                map.insert(key.to_string(), value.to_string());
                true
            }
        }
    }
}

/// Read-only device/application snapshot consumed by the package builder.
///
/// Discovery of these values belongs to the embedding application; the
/// pipeline only copies them into package parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub os_name: String,
    pub os_version: String,
    pub device_type: String,
    pub device_name: String,
    pub language: String,
    pub country: String,
    pub bundle_id: String,
    pub app_version: String,
    /// Stable hardware identifier, when the platform exposes one.
    pub hardware_id: Option<String>,
}
