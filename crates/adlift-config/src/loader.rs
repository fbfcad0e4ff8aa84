// SPDX-FileCopyrightText: 2026 Adlift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./adlift.toml` > `~/.config/adlift/adlift.toml` > `/etc/adlift/adlift.toml`
//! with environment variable overrides via `ADLIFT_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::AdliftConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/adlift/adlift.toml` (system-wide)
/// 3. `~/.config/adlift/adlift.toml` (user XDG config)
/// 4. `./adlift.toml` (local directory)
/// 5. `ADLIFT_*` environment variables
pub fn load_config() -> Result<AdliftConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AdliftConfig::default()))
        .merge(Toml::file("/etc/adlift/adlift.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("adlift/adlift.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("adlift.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<AdliftConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AdliftConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<AdliftConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AdliftConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `ADLIFT_APP_APP_TOKEN` must map to
/// `app.app_token`, not `app.app.token`.
fn env_provider() -> Env {
    Env::prefixed("ADLIFT_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: ADLIFT_NETWORK_BASE_URL -> "network_base_url"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("app_", "app.", 1)
            .replacen("network_", "network.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("backoff_", "backoff.", 1)
            .replacen("session_", "session.", 1);
        mapped.into()
    })
}
