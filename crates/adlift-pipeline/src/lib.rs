// SPDX-FileCopyrightText: 2026 Adlift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Adlift delivery pipeline.
//!
//! Lifecycle and purchase events become immutable activity packages
//! (built by [`PackageBuilder`]), persisted in durable FIFO queues
//! ([`PackageHandler`] for sessions/events, [`SdkClickHandler`] for
//! clicks) and drained over HTTP with at most one request in flight per
//! queue, strict per-queue ordering, and retry with randomized
//! exponential backoff. [`ActivityHandler`] is the root: it owns the
//! per-install state and maps app lifecycle transitions onto the queues.

pub mod activity_handler;
pub mod attribution;
pub mod builder;
pub mod click_handler;
pub mod package_handler;

pub use activity_handler::ActivityHandler;
pub use attribution::AttributionHandler;
pub use builder::{PackageBuilder, SDK_VERSION};
pub use click_handler::SdkClickHandler;
pub use package_handler::PackageHandler;
