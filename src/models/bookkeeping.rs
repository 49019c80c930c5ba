// SPDX-License-Identifier: MIT

//! Per-stage health bookkeeping and the pipeline stage table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline stages.
///
/// The pipeline shape is data, not control flow: `emits()` lists which
/// stages a given stage may enqueue tasks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Search,
    Scrape,
    Publish,
    Catchup,
}

impl Stage {
    /// Stages this stage may enqueue tasks for.
    pub fn emits(self) -> &'static [Stage] {
        match self {
            // Search fans out to detail scrapes and requeues itself for
            // the next results page.
            Stage::Search => &[Stage::Scrape, Stage::Search],
            Stage::Scrape => &[Stage::Publish],
            Stage::Publish => &[],
            Stage::Catchup => &[Stage::Publish],
        }
    }

    /// Bookkeeping slot this stage reports into. Catchup is publish-side
    /// health, so it shares the publish slot.
    pub fn bookkeeping_slot(self) -> Stage {
        match self {
            Stage::Catchup => Stage::Publish,
            other => other,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Search => "search",
            Stage::Scrape => "scrape",
            Stage::Publish => "publish",
            Stage::Catchup => "catchup",
        };
        f.write_str(name)
    }
}

/// Tri-state stage health written to bookkeeping on every invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageStatus {
    Green,
    /// Upstream returned a rate-limit signal; the queue will back off.
    Yellow,
    /// Unrecoverable failure with a short description.
    Red(String),
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageStatus::Green => f.write_str("Green"),
            StageStatus::Yellow => f.write_str("Yellow: Backing off."),
            StageStatus::Red(msg) => write!(f, "Red: {}", msg),
        }
    }
}

/// The single bookkeeping document: per-stage status string plus the
/// timestamp of the most recent actually-performed success.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Bookkeeping {
    pub search_status: Option<String>,
    pub last_search_success: Option<String>,
    pub scrape_status: Option<String>,
    pub last_scrape_success: Option<String>,
    pub publish_status: Option<String>,
    pub last_publish_success: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_match_contract() {
        assert_eq!(StageStatus::Green.to_string(), "Green");
        assert_eq!(StageStatus::Yellow.to_string(), "Yellow: Backing off.");
        assert_eq!(
            StageStatus::Red("Connection timeout".to_string()).to_string(),
            "Red: Connection timeout"
        );
    }

    #[test]
    fn transition_table_matches_pipeline_shape() {
        assert_eq!(Stage::Search.emits(), &[Stage::Scrape, Stage::Search]);
        assert_eq!(Stage::Scrape.emits(), &[Stage::Publish]);
        assert!(Stage::Publish.emits().is_empty());
        assert_eq!(Stage::Catchup.emits(), &[Stage::Publish]);
    }

    #[test]
    fn catchup_reports_into_publish_slot() {
        assert_eq!(Stage::Catchup.bookkeeping_slot(), Stage::Publish);
        assert_eq!(Stage::Search.bookkeeping_slot(), Stage::Search);
    }
}
