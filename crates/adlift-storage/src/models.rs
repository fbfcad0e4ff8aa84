// SPDX-FileCopyrightText: 2026 Adlift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types for storage entities.
//!
//! The canonical package type lives in `adlift-core`; storage pairs it with
//! its queue rowid, which fixes the delivery order and addresses the row
//! for update/remove.

use adlift_core::ActivityPackage;

/// One persisted queue entry: the package plus its rowid.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPackage {
    pub id: i64,
    pub package: ActivityPackage,
}
