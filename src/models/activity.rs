// SPDX-License-Identifier: MIT

//! Activity records: the extraction-layer draft and the stored document.

use crate::models::{Leader, Place};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored activity record in Firestore.
///
/// Immutable after creation, except for the single `message_id` write once
/// the announcement has been sent. Leader and place are weak references
/// (document IDs) into their own collections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    /// Stable source-site URI; basis of the document ID
    pub permalink: String,
    /// Activity type label (e.g. "Backcountry Skiing")
    pub activity_type: String,
    /// Activity title
    pub title: String,
    /// Short description (may be empty)
    pub description: String,
    /// Normalized difficulty ratings, in page order
    pub difficulty_ratings: Vec<String>,
    /// Activity date as RFC 3339 UTC (sourced as a Pacific-time calendar date)
    pub activity_date: String,
    /// Sponsoring branch, when the page lists one
    pub branch: Option<String>,
    /// Document ID of the leader record
    pub leader_id: String,
    /// Document ID of the place record
    pub place_id: String,
    /// Discord message ID, set exactly once after successful publication
    pub message_id: Option<String>,
}

impl Activity {
    /// Document ID: final path segment of the permalink.
    pub fn document_id(&self) -> String {
        document_id_for(&self.permalink)
    }

    /// Build the stored record from an extraction draft, resolving the
    /// leader/place cross-references to their document IDs.
    pub fn from_draft(draft: ActivityDraft) -> Self {
        let leader_id = draft.leader.document_id();
        let place_id = draft.place.document_id();
        Self {
            permalink: draft.permalink,
            activity_type: draft.activity_type,
            title: draft.title,
            description: draft.description,
            difficulty_ratings: draft.difficulty_ratings,
            activity_date: draft.activity_date.to_rfc3339(),
            branch: draft.branch,
            leader_id,
            place_id,
            message_id: None,
        }
    }
}

/// Derive an activity document ID from its permalink.
pub fn document_id_for(permalink: &str) -> String {
    let trimmed = permalink.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed).to_string()
}

/// Extraction-layer output for one detail page, before persistence.
/// Carries the full leader/place records rather than cache keys.
#[derive(Debug, Clone)]
pub struct ActivityDraft {
    pub permalink: String,
    pub activity_type: String,
    pub title: String,
    pub description: String,
    pub difficulty_ratings: Vec<String>,
    pub activity_date: DateTime<Utc>,
    pub branch: Option<String>,
    pub leader: Leader,
    pub place: Place,
}
