// SPDX-FileCopyrightText: 2026 Adlift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Network transport trait.
//!
//! The request handler serializes one package into a [`WireRequest`] and
//! hands it to an injected [`Transport`]. Production code uses the reqwest
//! implementation in `adlift-net`; tests inject a scripted mock. A
//! transport returns `Err` only for connectivity-level failures (connect,
//! timeout, TLS); any response with an HTTP status, including 4xx/5xx,
//! comes back as `Ok(WireResponse)` for the caller to classify.

use async_trait::async_trait;

use crate::error::AdliftError;

/// One HTTP exchange, fully prepared: endpoint path, JSON body, and
/// request headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRequest {
    /// Endpoint suffix appended to the configured base URL, e.g. `/session`.
    pub path: String,
    /// JSON-encoded request body.
    pub body: String,
    pub headers: Vec<(String, String)>,
}

/// Raw result of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireResponse {
    pub status: u16,
    pub body: String,
}

/// Executes one wire exchange against the backend.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn exchange(&self, request: WireRequest) -> Result<WireResponse, AdliftError>;
}
