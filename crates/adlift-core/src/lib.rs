// SPDX-FileCopyrightText: 2026 Adlift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Adlift tracking pipeline.
//!
//! This crate provides the types shared across the workspace: the error
//! type, activity packages and per-install state, the user-facing event
//! type, the retry backoff policy, and the transport trait the request
//! handler sends through.

pub mod backoff;
pub mod error;
pub mod event;
pub mod state;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use backoff::BackoffStrategy;
pub use error::AdliftError;
pub use event::AdliftEvent;
pub use state::ActivityState;
pub use traits::{Transport, WireRequest, WireResponse};
pub use types::{
    ActivityKind, ActivityPackage, Attribution, DeviceInfo, ResponseData, SessionParameters,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_variants_construct() {
        let _config = AdliftError::Config("test".into());
        let _storage = AdliftError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _network = AdliftError::Network {
            message: "test".into(),
            source: None,
        };
        let _internal = AdliftError::Internal("test".into());
    }

    #[test]
    fn transport_trait_is_object_safe() {
        fn _assert(_t: &dyn Transport) {}
    }
}
