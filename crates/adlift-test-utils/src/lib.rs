// SPDX-FileCopyrightText: 2026 Adlift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Adlift integration tests.
//!
//! Provides a scripted mock transport and config/device fixtures for fast,
//! deterministic, CI-runnable tests without a live backend.
//!
//! # Components
//!
//! - [`MockTransport`] - Mock network transport with pre-scripted outcomes
//! - [`fixtures`] - Config and device snapshots for pipeline tests

pub mod fixtures;
pub mod mock_transport;

pub use mock_transport::{MockTransport, ScriptedOutcome};
