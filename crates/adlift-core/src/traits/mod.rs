// SPDX-FileCopyrightText: 2026 Adlift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the pipeline and its injected collaborators.

pub mod transport;

pub use transport::{Transport, WireRequest, WireResponse};
