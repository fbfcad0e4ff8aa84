// SPDX-FileCopyrightText: 2026 Adlift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Adlift pipeline.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level Adlift configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values,
/// except that `app.app_token` must be set for the pipeline to start.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AdliftConfig {
    /// App identity and environment settings.
    #[serde(default)]
    pub app: AppConfig,

    /// Backend endpoint and transport settings.
    #[serde(default)]
    pub network: NetworkConfig,

    /// Durable queue/state storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Retry backoff strategy selection per queue.
    #[serde(default)]
    pub backoff: BackoffConfig,

    /// Session/subsession boundary windows.
    #[serde(default)]
    pub session: SessionConfig,
}

/// App identity and environment configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Backend-assigned app token. Required.
    #[serde(default)]
    pub app_token: String,

    /// Tracking environment: `sandbox` or `production`.
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Prefix prepended to the client SDK version string, used by wrapper
    /// SDKs built on top of this one.
    #[serde(default)]
    pub sdk_prefix: Option<String>,

    /// Tracker to attribute organic installs to.
    #[serde(default)]
    pub default_tracker: Option<String>,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_token: String::new(),
            environment: default_environment(),
            sdk_prefix: None,
            default_tracker: None,
            log_level: default_log_level(),
        }
    }
}

fn default_environment() -> String {
    "sandbox".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Backend endpoint and transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkConfig {
    /// Base URL the per-package path suffixes are appended to.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Whether the main package queue may send while the app is backgrounded.
    /// The click queue is never gated by this.
    #[serde(default)]
    pub send_in_background: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            send_in_background: false,
        }
    }
}

fn default_base_url() -> String {
    "https://app.adlift.io".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

/// Durable storage configuration.
///
/// Each handler owns its own database file under `data_dir`: the main
/// package queue, the click queue, and the activity state never share a
/// writer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory holding the pipeline's database files.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl StorageConfig {
    pub fn state_db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("state.db")
    }

    pub fn package_queue_db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("packages.db")
    }

    pub fn click_queue_db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("clicks.db")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> String {
    dirs::data_dir()
        .map(|p| p.join("adlift"))
        .unwrap_or_else(|| PathBuf::from(".adlift"))
        .display()
        .to_string()
}

/// Backoff strategy names per delivery pipeline.
///
/// Valid names: `long_wait`, `short_wait`, `test_wait`, `no_wait`, `no_retry`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BackoffConfig {
    #[serde(default = "default_package_strategy")]
    pub package_strategy: String,

    #[serde(default = "default_click_strategy")]
    pub click_strategy: String,

    #[serde(default = "default_click_strategy")]
    pub attribution_strategy: String,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            package_strategy: default_package_strategy(),
            click_strategy: default_click_strategy(),
            attribution_strategy: default_click_strategy(),
        }
    }
}

fn default_package_strategy() -> String {
    "long_wait".to_string()
}

fn default_click_strategy() -> String {
    "short_wait".to_string()
}

/// Session boundary windows.
///
/// A foreground after more than `session_window_secs` of inactivity starts
/// a new session; after more than `subsession_window_secs` it continues the
/// session with a new subsession.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    #[serde(default = "default_session_window_secs")]
    pub session_window_secs: i64,

    #[serde(default = "default_subsession_window_secs")]
    pub subsession_window_secs: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_window_secs: default_session_window_secs(),
            subsession_window_secs: default_subsession_window_secs(),
        }
    }
}

fn default_session_window_secs() -> i64 {
    30 * 60
}

fn default_subsession_window_secs() -> i64 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = AdliftConfig::default();
        assert_eq!(config.app.environment, "sandbox");
        assert_eq!(config.network.base_url, "https://app.adlift.io");
        assert_eq!(config.network.timeout_secs, 60);
        assert!(!config.network.send_in_background);
        assert_eq!(config.backoff.package_strategy, "long_wait");
        assert_eq!(config.backoff.click_strategy, "short_wait");
        assert_eq!(config.session.session_window_secs, 1800);
        assert_eq!(config.session.subsession_window_secs, 1);
    }

    #[test]
    fn storage_paths_derive_from_data_dir() {
        let storage = StorageConfig {
            data_dir: "/tmp/adlift".to_string(),
        };
        assert_eq!(storage.state_db_path(), PathBuf::from("/tmp/adlift/state.db"));
        assert_eq!(
            storage.package_queue_db_path(),
            PathBuf::from("/tmp/adlift/packages.db")
        );
        assert_eq!(
            storage.click_queue_db_path(),
            PathBuf::from("/tmp/adlift/clicks.db")
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let toml_str = r#"
[app]
app_token = "abc123"
unknown_key = true
"#;
        assert!(toml::from_str::<AdliftConfig>(toml_str).is_err());
    }

    #[test]
    fn partial_sections_fill_defaults() {
        let toml_str = r#"
[app]
app_token = "abc123"

[network]
base_url = "https://sandbox.adlift.io"
"#;
        let config: AdliftConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.app.app_token, "abc123");
        assert_eq!(config.network.base_url, "https://sandbox.adlift.io");
        assert_eq!(config.network.timeout_secs, 60);
    }
}
