// SPDX-FileCopyrightText: 2026 Adlift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as required tokens, known strategy names, and
//! consistent session windows.

use adlift_core::BackoffStrategy;

use crate::diagnostic::ConfigError;
use crate::model::AdliftConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &AdliftConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.app.app_token.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "app.app_token must be set".to_string(),
        });
    }

    if !matches!(config.app.environment.as_str(), "sandbox" | "production") {
        errors.push(ConfigError::Validation {
            message: format!(
                "app.environment must be `sandbox` or `production`, got `{}`",
                config.app.environment
            ),
        });
    }

    if !config.network.base_url.starts_with("http://")
        && !config.network.base_url.starts_with("https://")
    {
        errors.push(ConfigError::Validation {
            message: format!(
                "network.base_url must be an http(s) URL, got `{}`",
                config.network.base_url
            ),
        });
    }

    if config.network.timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "network.timeout_secs must be positive".to_string(),
        });
    }

    if config.storage.data_dir.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.data_dir must not be empty".to_string(),
        });
    }

    for (key, name) in [
        ("backoff.package_strategy", &config.backoff.package_strategy),
        ("backoff.click_strategy", &config.backoff.click_strategy),
        (
            "backoff.attribution_strategy",
            &config.backoff.attribution_strategy,
        ),
    ] {
        if BackoffStrategy::by_name(name).is_none() {
            errors.push(ConfigError::Validation {
                message: format!("{key} `{name}` is not a known backoff strategy"),
            });
        }
    }

    if config.session.subsession_window_secs < 1 {
        errors.push(ConfigError::Validation {
            message: "session.subsession_window_secs must be at least 1".to_string(),
        });
    }

    if config.session.session_window_secs <= config.session.subsession_window_secs {
        errors.push(ConfigError::Validation {
            message: format!(
                "session.session_window_secs ({}) must exceed subsession_window_secs ({})",
                config.session.session_window_secs, config.session.subsession_window_secs
            ),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
