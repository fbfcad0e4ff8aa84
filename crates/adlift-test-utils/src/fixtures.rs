// SPDX-FileCopyrightText: 2026 Adlift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared fixtures for pipeline tests.

use adlift_config::AdliftConfig;
use adlift_core::DeviceInfo;

/// A validating config rooted in the given data directory, using the
/// test-friendly backoff strategies.
pub fn test_config(data_dir: &str) -> AdliftConfig {
    let mut config = AdliftConfig::default();
    config.app.app_token = "abc123xyz789".to_string();
    config.storage.data_dir = data_dir.to_string();
    config.backoff.package_strategy = "no_wait".to_string();
    config.backoff.click_strategy = "no_wait".to_string();
    config.backoff.attribution_strategy = "no_wait".to_string();
    config
}

/// A plausible device snapshot.
pub fn test_device() -> DeviceInfo {
    DeviceInfo {
        os_name: "ios".to_string(),
        os_version: "17.2".to_string(),
        device_type: "phone".to_string(),
        device_name: "iPhone16,1".to_string(),
        language: "en".to_string(),
        country: "US".to_string(),
        bundle_id: "com.example.app".to_string(),
        app_version: "2.4.0".to_string(),
        hardware_id: Some("hw-0001".to_string()),
    }
}
