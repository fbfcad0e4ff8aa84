// SPDX-FileCopyrightText: 2026 Adlift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable package queue storage.
//!
//! One [`PackageStore`] owns one database file. Packages are stored as JSON
//! payloads ordered by rowid; delivery order is rowid order. Rows are
//! removed only after a definitive delivery outcome, so a crash between
//! enqueue and outcome always replays the package on the next launch.

use std::path::Path;

use adlift_core::{ActivityPackage, AdliftError};
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::migrations::Schema;
use crate::models::StoredPackage;

/// SQLite-backed FIFO queue of activity packages.
pub struct PackageStore {
    db: Database,
}

impl PackageStore {
    /// Open (creating if necessary) the queue database at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, AdliftError> {
        let db = Database::open(path, Schema::PackageQueue).await?;
        Ok(Self { db })
    }

    /// Load the full queue in delivery order.
    pub async fn load(&self) -> Result<Vec<StoredPackage>, AdliftError> {
        self.db
            .connection()
            .call(|conn| {
                let mut stmt =
                    conn.prepare("SELECT id, payload FROM packages ORDER BY id ASC")?;
                let rows = stmt
                    .query_map([], |row| {
                        let id: i64 = row.get(0)?;
                        let payload: String = row.get(1)?;
                        Ok((id, payload))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(map_tr_err)?
            .into_iter()
            .map(|(id, payload)| {
                let package: ActivityPackage =
                    serde_json::from_str(&payload).map_err(|e| AdliftError::Storage {
                        source: Box::new(e),
                    })?;
                Ok(StoredPackage { id, package })
            })
            .collect()
    }

    /// Append a package to the tail. Returns the assigned rowid.
    pub async fn append(&self, package: &ActivityPackage) -> Result<i64, AdliftError> {
        let kind = package.activity_kind.to_string();
        let payload = serde_json::to_string(package).map_err(|e| AdliftError::Storage {
            source: Box::new(e),
        })?;
        self.db
            .connection()
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO packages (kind, payload) VALUES (?1, ?2)",
                    params![kind, payload],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Replace a row's payload with the package's current contents.
    ///
    /// Used for retry-count bumps and for session-parameter rewrites of
    /// queued-but-unsent packages. The rowid (and therefore the delivery
    /// order) is unchanged.
    pub async fn update(&self, id: i64, package: &ActivityPackage) -> Result<(), AdliftError> {
        let payload = serde_json::to_string(package).map_err(|e| AdliftError::Storage {
            source: Box::new(e),
        })?;
        self.db
            .connection()
            .call(move |conn| {
                conn.execute(
                    "UPDATE packages SET payload = ?1 WHERE id = ?2",
                    params![payload, id],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Remove a delivered (or terminally failed) package.
    pub async fn remove(&self, id: i64) -> Result<(), AdliftError> {
        self.db
            .connection()
            .call(move |conn| {
                conn.execute("DELETE FROM packages WHERE id = ?1", params![id])?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Drop every queued package.
    pub async fn clear(&self) -> Result<(), AdliftError> {
        self.db
            .connection()
            .call(|conn| {
                conn.execute("DELETE FROM packages", [])?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Number of queued packages.
    pub async fn depth(&self) -> Result<u64, AdliftError> {
        self.db
            .connection()
            .call(|conn| {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM packages", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(map_tr_err)
    }

    /// Close the store, flushing WAL.
    pub async fn close(self) -> Result<(), AdliftError> {
        self.db.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use adlift_core::ActivityKind;
    use tempfile::tempdir;

    fn package(kind: ActivityKind, suffix: &str) -> ActivityPackage {
        let mut parameters = BTreeMap::new();
        parameters.insert("app_token".to_string(), "abc123".to_string());
        ActivityPackage {
            activity_kind: kind,
            path: kind.path().to_string(),
            client_sdk: "adlift0.1.0".to_string(),
            parameters,
            retries: 0,
            suffix: suffix.to_string(),
            callback_params: BTreeMap::new(),
            partner_params: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn append_preserves_fifo_order() {
        let dir = tempdir().unwrap();
        let store = PackageStore::open(dir.path().join("q.db")).await.unwrap();

        store.append(&package(ActivityKind::Session, "s1")).await.unwrap();
        store.append(&package(ActivityKind::Event, "e1")).await.unwrap();
        store.append(&package(ActivityKind::Event, "e2")).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[0].package.suffix, "s1");
        assert_eq!(loaded[1].package.suffix, "e1");
        assert_eq!(loaded[2].package.suffix, "e2");
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn queue_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("q.db");

        let store = PackageStore::open(&path).await.unwrap();
        let id = store.append(&package(ActivityKind::Session, "s1")).await.unwrap();
        store.close().await.unwrap();

        let store = PackageStore::open(&path).await.unwrap();
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, id);
        assert_eq!(loaded[0].package.suffix, "s1");
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn update_rewrites_payload_in_place() {
        let dir = tempdir().unwrap();
        let store = PackageStore::open(dir.path().join("q.db")).await.unwrap();

        let mut pkg = package(ActivityKind::Event, "e1");
        let id = store.append(&pkg).await.unwrap();
        store.append(&package(ActivityKind::Event, "e2")).await.unwrap();

        pkg.increment_retries();
        store.update(id, &pkg).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded[0].package.retries, 1);
        // Order unchanged by the update.
        assert_eq!(loaded[1].package.suffix, "e2");
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn remove_and_clear() {
        let dir = tempdir().unwrap();
        let store = PackageStore::open(dir.path().join("q.db")).await.unwrap();

        let id = store.append(&package(ActivityKind::Session, "s1")).await.unwrap();
        store.append(&package(ActivityKind::Event, "e1")).await.unwrap();
        assert_eq!(store.depth().await.unwrap(), 2);

        store.remove(id).await.unwrap();
        assert_eq!(store.depth().await.unwrap(), 1);

        store.clear().await.unwrap();
        assert_eq!(store.depth().await.unwrap(), 0);
        store.close().await.unwrap();
    }
}
