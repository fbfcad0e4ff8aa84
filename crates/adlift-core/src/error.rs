// SPDX-FileCopyrightText: 2026 Adlift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Adlift tracking pipeline.

use thiserror::Error;

/// The primary error type used across all Adlift crates.
#[derive(Debug, Error)]
pub enum AdliftError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database open, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Network transport errors (connect failure, timeout, TLS).
    ///
    /// A transport-level error is always classified as retryable by the
    /// request handler; HTTP-status classification happens above this layer.
    #[error("network error: {message}")]
    Network {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
