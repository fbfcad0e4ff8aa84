// SPDX-FileCopyrightText: 2026 Adlift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Activity state and session parameter persistence.
//!
//! Both records are single-row JSON snapshots replaced wholesale on every
//! save. SQLite's transactional UPDATE gives the atomic whole-record
//! replace the pipeline relies on: a crash mid-save leaves the previous
//! durable snapshot intact.

use std::path::Path;

use adlift_core::{ActivityState, AdliftError, SessionParameters};
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::database::{Database, map_tr_err};
use crate::migrations::Schema;

/// SQLite-backed store for the per-install activity state and the
/// user-supplied session parameters.
pub struct StateStore {
    db: Database,
}

impl StateStore {
    /// Open (creating if necessary) the state database at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, AdliftError> {
        let db = Database::open(path, Schema::ActivityState).await?;
        Ok(Self { db })
    }

    /// Load the persisted activity state, if any.
    pub async fn load_state(&self) -> Result<Option<ActivityState>, AdliftError> {
        self.load_snapshot("activity_state").await
    }

    /// Replace the persisted activity state.
    pub async fn save_state(&self, state: &ActivityState) -> Result<(), AdliftError> {
        self.save_snapshot("activity_state", state).await
    }

    /// Load the persisted session parameters, if any.
    pub async fn load_session_params(&self) -> Result<Option<SessionParameters>, AdliftError> {
        self.load_snapshot("session_params").await
    }

    /// Replace the persisted session parameters.
    pub async fn save_session_params(
        &self,
        params: &SessionParameters,
    ) -> Result<(), AdliftError> {
        self.save_snapshot("session_params", params).await
    }

    /// Drop both snapshots (forget-me / teardown with state deletion).
    pub async fn erase(&self) -> Result<(), AdliftError> {
        self.db
            .connection()
            .call(|conn| {
                conn.execute("DELETE FROM activity_state", [])?;
                conn.execute("DELETE FROM session_params", [])?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Close the store, flushing WAL.
    pub async fn close(self) -> Result<(), AdliftError> {
        self.db.close().await
    }

    async fn load_snapshot<T: DeserializeOwned>(
        &self,
        table: &'static str,
    ) -> Result<Option<T>, AdliftError> {
        let snapshot: Option<String> = self
            .db
            .connection()
            .call(move |conn| {
                let row = conn
                    .query_row(
                        &format!("SELECT snapshot FROM {table} WHERE id = 1"),
                        [],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(row)
            })
            .await
            .map_err(map_tr_err)?;

        snapshot
            .map(|s| {
                serde_json::from_str(&s).map_err(|e| AdliftError::Storage {
                    source: Box::new(e),
                })
            })
            .transpose()
    }

    async fn save_snapshot<T: Serialize>(
        &self,
        table: &'static str,
        value: &T,
    ) -> Result<(), AdliftError> {
        let snapshot = serde_json::to_string(value).map_err(|e| AdliftError::Storage {
            source: Box::new(e),
        })?;
        self.db
            .connection()
            .call(move |conn| {
                conn.execute(
                    &format!(
                        "INSERT INTO {table} (id, snapshot) VALUES (1, ?1)
                         ON CONFLICT (id) DO UPDATE SET
                             snapshot = excluded.snapshot,
                             updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')"
                    ),
                    params![snapshot],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}
