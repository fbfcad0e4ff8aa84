// SPDX-FileCopyrightText: 2026 Adlift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP layer for the Adlift pipeline.
//!
//! [`RequestHandler`] turns one activity package into one classified
//! delivery outcome; [`HttpTransport`] is the production [`Transport`]
//! implementation behind it.
//!
//! [`Transport`]: adlift_core::Transport

pub mod http;
pub mod request;

pub use http::HttpTransport;
pub use request::RequestHandler;
