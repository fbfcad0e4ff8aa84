// SPDX-FileCopyrightText: 2026 Adlift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration error types and terminal rendering.
//!
//! Figment parse errors and post-deserialization validation failures are
//! collected into [`ConfigError`] values and rendered as one line each so
//! a misconfigured deployment reports every problem at once.

use std::fmt;

/// One configuration problem, either from parsing or validation.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML/env parsing or type error, as reported by figment.
    Parse { message: String },
    /// Semantic constraint violation found after deserialization.
    Validation { message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse { message } => write!(f, "config parse error: {message}"),
            ConfigError::Validation { message } => write!(f, "config error: {message}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Convert a figment error (which may aggregate several failures) into
/// individual [`ConfigError`] values.
pub fn figment_to_config_errors(err: figment::Error) -> Vec<ConfigError> {
    err.into_iter()
        .map(|e| ConfigError::Parse {
            message: e.to_string(),
        })
        .collect()
}

/// Print all collected errors to stderr, one per line.
pub fn render_errors(errors: &[ConfigError]) {
    for error in errors {
        eprintln!("{error}");
    }
}
