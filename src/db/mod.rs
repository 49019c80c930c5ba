// SPDX-License-Identifier: MIT

//! Database layer (Firestore).

pub mod firestore;

pub use firestore::{CreateOutcome, FirestoreDb};

/// Collection names as constants.
pub mod collections {
    pub const ACTIVITIES: &str = "activities";
    pub const LEADERS: &str = "leaders";
    pub const PLACES: &str = "places";
    /// Single `status` document tracking per-stage health
    pub const BOOKKEEPING: &str = "bookkeeping";
    /// Single `config` document holding the processing-enabled flag
    pub const SYSTEM: &str = "system";
}

/// Document ID of the bookkeeping status record.
pub const BOOKKEEPING_DOC: &str = "status";
/// Document ID of the system config record.
pub const SYSTEM_CONFIG_DOC: &str = "config";
