// SPDX-FileCopyrightText: 2026 Adlift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded database migrations using refinery.
//!
//! SQL migration files are compiled into the binary at build time via
//! `embed_migrations!`. The package-queue databases and the activity-state
//! database carry different schemas, so each has its own migration set.
//! Migrations run automatically on database open.

use adlift_core::AdliftError;

mod queue_embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations/queue");
}

mod state_embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations/state");
}

/// Which schema a database file carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    /// Ordered package rows (main queue and click queue files).
    PackageQueue,
    /// Activity state + session parameter snapshots.
    ActivityState,
}

/// Run all pending migrations for `schema` against the given connection.
///
/// Refinery tracks applied migrations in its own `refinery_schema_history`
/// table, so re-running is a no-op.
pub fn run(conn: &mut rusqlite::Connection, schema: Schema) -> Result<(), AdliftError> {
    let result = match schema {
        Schema::PackageQueue => queue_embedded::migrations::runner().run(conn),
        Schema::ActivityState => state_embedded::migrations::runner().run(conn),
    };
    result.map_err(|e| AdliftError::Storage {
        source: Box::new(e),
    })?;
    Ok(())
}
