// SPDX-FileCopyrightText: 2026 Adlift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread: one `Database` IS the single writer for its file. Each pipeline
//! handler owns exactly one `Database`; no two handlers share a file.

use std::path::Path;

use adlift_core::AdliftError;
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::migrations::{self, Schema};

/// Convert tokio_rusqlite errors into AdliftError::Storage.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error) -> AdliftError {
    AdliftError::Storage {
        source: Box::new(e),
    }
}

/// Convert a `conn.call` error whose closure returned an `AdliftError` back
/// into that `AdliftError`, surfacing the original storage failure.
fn map_mig_err(e: tokio_rusqlite::Error<AdliftError>) -> AdliftError {
    match e {
        tokio_rusqlite::Error::Error(inner) => inner,
        tokio_rusqlite::Error::Close((_, src)) => AdliftError::Storage {
            source: Box::new(src),
        },
        tokio_rusqlite::Error::ConnectionClosed => AdliftError::Storage {
            source: "database connection closed".into(),
        },
        _ => AdliftError::Storage {
            source: "unknown storage error".into(),
        },
    }
}

/// One open SQLite database with its migrations applied.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (creating if necessary) the database at `path` and run the
    /// migrations for `schema`.
    ///
    /// Sets WAL journal mode and a busy timeout so a concurrent reader
    /// (e.g. the status command) never surfaces SQLITE_BUSY to callers.
    pub async fn open(path: impl AsRef<Path>, schema: Schema) -> Result<Self, AdliftError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| AdliftError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = Connection::open(path)
            .await
            .map_err(|e| map_tr_err(e.into()))?;

        conn.call(move |conn| {
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "busy_timeout", 5000)?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(move |conn| migrations::run(conn, schema))
            .await
            .map_err(map_mig_err)?;

        debug!(path = %path.display(), ?schema, "database opened");
        Ok(Self { conn })
    }

    /// The underlying single-writer connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Close the database, flushing WAL.
    pub async fn close(self) -> Result<(), AdliftError> {
        self.conn
            .close()
            .await
            .map_err(|e| AdliftError::Storage {
                source: Box::new(e),
            })
    }
}
