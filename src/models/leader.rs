// SPDX-License-Identifier: MIT

//! Trip leader record.

use serde::{Deserialize, Serialize};

/// A trip leader, identified by their profile permalink.
/// Upserted on every scrape; retained indefinitely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leader {
    pub permalink: String,
    pub name: String,
}

impl Leader {
    /// Document ID: final path segment of the permalink.
    pub fn document_id(&self) -> String {
        let trimmed = self.permalink.trim_end_matches('/');
        trimmed.rsplit('/').next().unwrap_or(trimmed).to_string()
    }
}
