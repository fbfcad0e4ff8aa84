// SPDX-FileCopyrightText: 2026 Adlift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pure package construction.
//!
//! A [`PackageBuilder`] is created over a consistent snapshot of device
//! info, activity state, configuration, and session parameters, and turns
//! one trackable action into one immutable [`ActivityPackage`]. Building
//! never fails: a missing optional input produces a package without that
//! parameter, not an error. Parameter helpers skip empty values, so the
//! wire payload never carries empty-string keys.

use std::collections::BTreeMap;

use adlift_core::{
    ActivityKind, ActivityPackage, ActivityState, AdliftEvent, DeviceInfo, SessionParameters,
};
use adlift_config::AdliftConfig;

/// Version reported to the backend in every request.
pub const SDK_VERSION: &str = "rust0.1.0";

/// Builds activity packages from one consistent snapshot.
pub struct PackageBuilder<'a> {
    config: &'a AdliftConfig,
    device: &'a DeviceInfo,
    state: &'a ActivityState,
    session_params: &'a SessionParameters,
    /// Unix seconds the trackable action occurred.
    created_at: i64,
}

impl<'a> PackageBuilder<'a> {
    pub fn new(
        config: &'a AdliftConfig,
        device: &'a DeviceInfo,
        state: &'a ActivityState,
        session_params: &'a SessionParameters,
        created_at: i64,
    ) -> Self {
        Self {
            config,
            device,
            state,
            session_params,
            created_at,
        }
    }

    /// Session start (or subsession report).
    pub fn build_session_package(&self, is_in_delay: bool) -> ActivityPackage {
        let mut parameters = self.default_parameters();
        set(&mut parameters, "session_count", self.state.session_count.to_string());
        set(&mut parameters, "subsession_count", self.state.subsession_count.to_string());
        set(&mut parameters, "session_length", self.state.session_length_secs.to_string());
        set(&mut parameters, "time_spent", self.state.time_spent_secs.to_string());
        if !is_in_delay {
            self.inject_session_parameters(&mut parameters, &BTreeMap::new(), &BTreeMap::new());
        }

        self.package(
            ActivityKind::Session,
            parameters,
            BTreeMap::new(),
            BTreeMap::new(),
            String::new(),
        )
    }

    /// One tracked event, with event-level parameters winning over
    /// session-level ones on key collision.
    pub fn build_event_package(&self, event: &AdliftEvent, is_in_delay: bool) -> ActivityPackage {
        let mut parameters = self.default_parameters();
        set(&mut parameters, "event_token", event.event_token.clone());
        set(&mut parameters, "event_count", self.state.event_count.to_string());
        if let Some(revenue) = event.revenue {
            set(&mut parameters, "revenue", format!("{revenue:.5}"));
        }
        set_opt(&mut parameters, "currency", event.currency.as_deref());
        set_opt(&mut parameters, "transaction_id", event.transaction_id.as_deref());
        set_opt(&mut parameters, "callback_id", event.callback_id.as_deref());
        set_opt(&mut parameters, "receipt", event.receipt.as_deref());
        if !is_in_delay {
            self.inject_session_parameters(
                &mut parameters,
                &event.callback_params,
                &event.partner_params,
            );
        }

        self.package(
            ActivityKind::Event,
            parameters,
            event.callback_params.clone(),
            event.partner_params.clone(),
            event_suffix(event),
        )
    }

    /// Deep-link/referrer click, carrying the current attribution snapshot.
    pub fn build_click_package(&self, source: &str, deep_link: Option<&str>) -> ActivityPackage {
        let mut parameters = self.default_parameters();
        set(&mut parameters, "source", source.to_string());
        set_opt(&mut parameters, "deeplink", deep_link);
        set(&mut parameters, "click_time", self.created_at.to_string());
        if let Some(attribution) = &self.state.attribution {
            set_opt(&mut parameters, "tracker", attribution.tracker_name.as_deref());
            set_opt(&mut parameters, "campaign", attribution.campaign.as_deref());
            set_opt(&mut parameters, "adgroup", attribution.adgroup.as_deref());
            set_opt(&mut parameters, "creative", attribution.creative.as_deref());
        }
        self.inject_session_parameters(&mut parameters, &BTreeMap::new(), &BTreeMap::new());

        self.package(
            ActivityKind::Click,
            parameters,
            BTreeMap::new(),
            BTreeMap::new(),
            format!("click '{source}'"),
        )
    }

    /// Minimal package to (re-)fetch attribution.
    pub fn build_attribution_package(&self, initiated_by: &str) -> ActivityPackage {
        let mut parameters = self.default_parameters();
        set(&mut parameters, "initiated_by", initiated_by.to_string());

        self.package(
            ActivityKind::Attribution,
            parameters,
            BTreeMap::new(),
            BTreeMap::new(),
            format!("attribution ({initiated_by})"),
        )
    }

    /// Forget-me request.
    pub fn build_gdpr_package(&self) -> ActivityPackage {
        self.package(
            ActivityKind::Gdpr,
            self.default_parameters(),
            BTreeMap::new(),
            BTreeMap::new(),
            String::new(),
        )
    }

    /// Push-token (or similar) info update.
    pub fn build_info_package(&self, source: &str) -> ActivityPackage {
        let mut parameters = self.default_parameters();
        set(&mut parameters, "source", source.to_string());
        set_opt(&mut parameters, "push_token", self.state.push_token.as_deref());

        self.package(
            ActivityKind::Info,
            parameters,
            BTreeMap::new(),
            BTreeMap::new(),
            format!("info ({source})"),
        )
    }

    /// Opaque ad-revenue payload from a named source.
    pub fn build_ad_revenue_package(
        &self,
        source: &str,
        payload: &serde_json::Value,
    ) -> ActivityPackage {
        let mut parameters = self.default_parameters();
        set(&mut parameters, "source", source.to_string());
        set(&mut parameters, "payload", payload.to_string());

        self.package(
            ActivityKind::AdRevenue,
            parameters,
            BTreeMap::new(),
            BTreeMap::new(),
            format!("ad revenue '{source}'"),
        )
    }

    /// Parameters common to every package kind.
    fn default_parameters(&self) -> BTreeMap<String, String> {
        let mut parameters = BTreeMap::new();
        set(&mut parameters, "app_token", self.config.app.app_token.clone());
        set(&mut parameters, "environment", self.config.app.environment.clone());
        set(&mut parameters, "install_uuid", self.state.uuid.clone());
        set(&mut parameters, "created_at", self.created_at.to_string());
        set_opt(&mut parameters, "default_tracker", self.config.app.default_tracker.as_deref());
        set(&mut parameters, "os_name", self.device.os_name.clone());
        set(&mut parameters, "os_version", self.device.os_version.clone());
        set(&mut parameters, "device_type", self.device.device_type.clone());
        set(&mut parameters, "device_name", self.device.device_name.clone());
        set(&mut parameters, "language", self.device.language.clone());
        set(&mut parameters, "country", self.device.country.clone());
        set(&mut parameters, "bundle_id", self.device.bundle_id.clone());
        set(&mut parameters, "app_version", self.device.app_version.clone());
        set_opt(&mut parameters, "hardware_id", self.device.hardware_id.as_deref());
        parameters
    }

    /// Merge session-level and package-level parameters into the wire
    /// payload. Package-level values win on key collision.
    fn inject_session_parameters(
        &self,
        parameters: &mut BTreeMap<String, String>,
        callback_overrides: &BTreeMap<String, String>,
        partner_overrides: &BTreeMap<String, String>,
    ) {
        let callback = merge_params(&self.session_params.callback_params, callback_overrides);
        let partner = merge_params(&self.session_params.partner_params, partner_overrides);
        set_map(parameters, "callback_params", &callback);
        set_map(parameters, "partner_params", &partner);
    }

    fn package(
        &self,
        kind: ActivityKind,
        parameters: BTreeMap<String, String>,
        callback_params: BTreeMap<String, String>,
        partner_params: BTreeMap<String, String>,
        suffix: String,
    ) -> ActivityPackage {
        ActivityPackage {
            activity_kind: kind,
            path: kind.path().to_string(),
            client_sdk: client_sdk(self.config.app.sdk_prefix.as_deref()),
            parameters,
            retries: 0,
            suffix,
            callback_params,
            partner_params,
        }
    }
}

/// Re-merge a queued package's callback/partner parameters against new
/// session-level parameters. Package-level values still win; all other
/// fields and the queue position are untouched.
pub fn apply_session_parameters(package: &mut ActivityPackage, session_params: &SessionParameters) {
    let callback = merge_params(&session_params.callback_params, &package.callback_params);
    let partner = merge_params(&session_params.partner_params, &package.partner_params);
    package.parameters.remove("callback_params");
    package.parameters.remove("partner_params");
    set_map(&mut package.parameters, "callback_params", &callback);
    set_map(&mut package.parameters, "partner_params", &partner);
}

/// SDK version string, with the wrapper prefix when one is configured.
fn client_sdk(prefix: Option<&str>) -> String {
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}@{SDK_VERSION}"),
        _ => SDK_VERSION.to_string(),
    }
}

/// Base merged with overrides; override values win on collision.
fn merge_params(
    base: &BTreeMap<String, String>,
    overrides: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = base.clone();
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Insert a parameter unless its value is empty.
fn set(parameters: &mut BTreeMap<String, String>, key: &str, value: String) {
    if !value.is_empty() {
        parameters.insert(key.to_string(), value);
    }
}

/// Insert an optional parameter unless it is absent or empty.
fn set_opt(parameters: &mut BTreeMap<String, String>, key: &str, value: Option<&str>) {
    if let Some(value) = value
        && !value.is_empty()
    {
        parameters.insert(key.to_string(), value.to_string());
    }
}

/// Insert a map-valued parameter as a JSON object, unless it is empty.
fn set_map(parameters: &mut BTreeMap<String, String>, key: &str, map: &BTreeMap<String, String>) {
    if !map.is_empty()
        && let Ok(json) = serde_json::to_string(map)
    {
        parameters.insert(key.to_string(), json);
    }
}

fn event_suffix(event: &AdliftEvent) -> String {
    match (event.revenue, event.currency.as_deref()) {
        (Some(revenue), Some(currency)) => {
            format!("event '{}' ({revenue} {currency})", event.event_token)
        }
        _ => format!("event '{}'", event.event_token),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AdliftConfig {
        let mut config = AdliftConfig::default();
        config.app.app_token = "abc123xyz789".to_string();
        config.app.environment = "production".to_string();
        config
    }

    fn device() -> DeviceInfo {
        DeviceInfo {
            os_name: "ios".into(),
            os_version: "17.2".into(),
            device_type: "phone".into(),
            device_name: "iPhone16,1".into(),
            language: "en".into(),
            country: "US".into(),
            bundle_id: "com.example.app".into(),
            app_version: "2.4.0".into(),
            hardware_id: None,
        }
    }

    fn state() -> ActivityState {
        let mut state = ActivityState::new();
        state.start_new_session(1_700_000_000);
        state
    }

    #[test]
    fn session_package_carries_counters_and_defaults() {
        let config = config();
        let device = device();
        let state = state();
        let params = SessionParameters::default();
        let builder = PackageBuilder::new(&config, &device, &state, &params, 1_700_000_100);

        let pkg = builder.build_session_package(false);
        assert_eq!(pkg.activity_kind, ActivityKind::Session);
        assert_eq!(pkg.path, "/session");
        assert_eq!(pkg.parameters["app_token"], "abc123xyz789");
        assert_eq!(pkg.parameters["environment"], "production");
        assert_eq!(pkg.parameters["session_count"], "1");
        assert_eq!(pkg.parameters["subsession_count"], "1");
        assert_eq!(pkg.parameters["created_at"], "1700000100");
        assert_eq!(pkg.parameters["install_uuid"], state.uuid);
        assert_eq!(pkg.retries, 0);
    }

    #[test]
    fn empty_values_never_reach_the_payload() {
        let mut config = config();
        config.app.default_tracker = Some(String::new());
        let mut device = device();
        device.hardware_id = Some(String::new());
        device.country = String::new();
        let state = state();
        let params = SessionParameters::default();
        let builder = PackageBuilder::new(&config, &device, &state, &params, 1_700_000_100);

        let pkg = builder.build_session_package(false);
        assert!(!pkg.parameters.contains_key("default_tracker"));
        assert!(!pkg.parameters.contains_key("hardware_id"));
        assert!(!pkg.parameters.contains_key("country"));
        assert!(!pkg.parameters.contains_key("callback_params"));
    }

    #[test]
    fn event_params_win_over_session_params() {
        let config = config();
        let device = device();
        let state = state();
        let mut session_params = SessionParameters::default();
        session_params.add_callback_param("a", "1");

        let mut event = AdliftEvent::new("tok123");
        event.add_callback_param("a", "2");
        event.add_callback_param("b", "3");

        let builder = PackageBuilder::new(&config, &device, &state, &session_params, 1_700_000_100);
        let pkg = builder.build_event_package(&event, false);

        let merged: BTreeMap<String, String> =
            serde_json::from_str(&pkg.parameters["callback_params"]).unwrap();
        assert_eq!(merged["a"], "2");
        assert_eq!(merged["b"], "3");
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn event_revenue_fields_present_only_when_set() {
        let config = config();
        let device = device();
        let state = state();
        let params = SessionParameters::default();
        let builder = PackageBuilder::new(&config, &device, &state, &params, 1_700_000_100);

        let plain = builder.build_event_package(&AdliftEvent::new("tok123"), false);
        assert!(!plain.parameters.contains_key("revenue"));
        assert!(!plain.parameters.contains_key("currency"));

        let mut event = AdliftEvent::new("tok123");
        event.set_revenue(1.5, "EUR");
        event.set_transaction_id("t-1");
        let revenue = builder.build_event_package(&event, false);
        assert_eq!(revenue.parameters["revenue"], "1.50000");
        assert_eq!(revenue.parameters["currency"], "EUR");
        assert_eq!(revenue.parameters["transaction_id"], "t-1");
        assert_eq!(revenue.suffix, "event 'tok123' (1.5 EUR)");
    }

    #[test]
    fn in_delay_suppresses_session_parameter_injection() {
        let config = config();
        let device = device();
        let state = state();
        let mut session_params = SessionParameters::default();
        session_params.add_callback_param("a", "1");
        let builder = PackageBuilder::new(&config, &device, &state, &session_params, 1_700_000_100);

        let delayed = builder.build_session_package(true);
        assert!(!delayed.parameters.contains_key("callback_params"));

        let normal = builder.build_session_package(false);
        assert!(normal.parameters.contains_key("callback_params"));
    }

    #[test]
    fn click_package_includes_attribution_snapshot() {
        let config = config();
        let device = device();
        let mut state = state();
        state.attribution = Some(adlift_core::Attribution {
            tracker_name: Some("tracker-1".into()),
            campaign: Some("spring".into()),
            ..Default::default()
        });
        let params = SessionParameters::default();
        let builder = PackageBuilder::new(&config, &device, &state, &params, 1_700_000_100);

        let pkg = builder.build_click_package("deeplink", Some("myapp://offer"));
        assert_eq!(pkg.activity_kind, ActivityKind::Click);
        assert_eq!(pkg.path, "/sdk_click");
        assert_eq!(pkg.parameters["source"], "deeplink");
        assert_eq!(pkg.parameters["deeplink"], "myapp://offer");
        assert_eq!(pkg.parameters["tracker"], "tracker-1");
        assert_eq!(pkg.parameters["campaign"], "spring");
    }

    #[test]
    fn gdpr_and_attribution_packages_are_minimal() {
        let config = config();
        let device = device();
        let state = state();
        let params = SessionParameters::default();
        let builder = PackageBuilder::new(&config, &device, &state, &params, 1_700_000_100);

        let gdpr = builder.build_gdpr_package();
        assert_eq!(gdpr.path, "/gdpr_forget_device");
        assert!(gdpr.parameters.contains_key("app_token"));

        let attribution = builder.build_attribution_package("sdk");
        assert_eq!(attribution.path, "/attribution");
        assert_eq!(attribution.parameters["initiated_by"], "sdk");
    }

    #[test]
    fn ad_revenue_wraps_payload() {
        let config = config();
        let device = device();
        let state = state();
        let params = SessionParameters::default();
        let builder = PackageBuilder::new(&config, &device, &state, &params, 1_700_000_100);

        let payload = serde_json::json!({"impressions": 3, "network": "acme"});
        let pkg = builder.build_ad_revenue_package("acme", &payload);
        assert_eq!(pkg.activity_kind, ActivityKind::AdRevenue);
        assert_eq!(pkg.parameters["source"], "acme");
        let round_trip: serde_json::Value =
            serde_json::from_str(&pkg.parameters["payload"]).unwrap();
        assert_eq!(round_trip, payload);
    }

    #[test]
    fn client_sdk_prefix_applied() {
        let mut config = config();
        config.app.sdk_prefix = Some("flutter1.2.3".into());
        let device = device();
        let state = state();
        let params = SessionParameters::default();
        let builder = PackageBuilder::new(&config, &device, &state, &params, 1_700_000_100);

        let pkg = builder.build_session_package(false);
        assert_eq!(pkg.client_sdk, format!("flutter1.2.3@{SDK_VERSION}"));
    }

    #[test]
    fn apply_session_parameters_keeps_package_level_overrides() {
        let config = config();
        let device = device();
        let state = state();
        let mut session_params = SessionParameters::default();
        session_params.add_callback_param("a", "1");

        let mut event = AdliftEvent::new("tok123");
        event.add_callback_param("a", "2");
        let builder = PackageBuilder::new(&config, &device, &state, &session_params, 1_700_000_100);
        let mut pkg = builder.build_event_package(&event, false);

        // User replaces the session parameters after the package was queued.
        let mut updated = SessionParameters::default();
        updated.add_callback_param("a", "9");
        updated.add_callback_param("c", "7");
        apply_session_parameters(&mut pkg, &updated);

        let merged: BTreeMap<String, String> =
            serde_json::from_str(&pkg.parameters["callback_params"]).unwrap();
        assert_eq!(merged["a"], "2", "event-level value must still win");
        assert_eq!(merged["c"], "7", "new session key must appear");
    }

    #[test]
    fn apply_session_parameters_clears_stale_maps() {
        let config = config();
        let device = device();
        let state = state();
        let mut session_params = SessionParameters::default();
        session_params.add_callback_param("a", "1");
        let builder = PackageBuilder::new(&config, &device, &state, &session_params, 1_700_000_100);
        let mut pkg = builder.build_session_package(false);

        // All session parameters removed: the payload key disappears.
        apply_session_parameters(&mut pkg, &SessionParameters::default());
        assert!(!pkg.parameters.contains_key("callback_params"));
    }
}
