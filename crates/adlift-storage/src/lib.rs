// SPDX-FileCopyrightText: 2026 Adlift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the Adlift pipeline.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a
//! single-writer concurrency model via `tokio-rusqlite`, and typed stores
//! for the durable package queues and the activity-state snapshot. Each
//! pipeline handler owns its own database file; no two handlers write the
//! same persisted resource.

pub mod database;
pub mod migrations;
pub mod models;
pub mod package_store;
pub mod state_store;

pub use database::Database;
pub use models::StoredPackage;
pub use package_store::PackageStore;
pub use state_store::StateStore;
