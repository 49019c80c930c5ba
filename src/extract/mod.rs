// SPDX-License-Identifier: MIT

//! HTML extraction layer.
//!
//! Pure functions that turn one source-site HTML document into typed
//! records. All of the source site's markup brittleness is isolated here:
//! the detail-page layout is position-dependent, so each known page shape
//! has a test fixture and markup drift shows up as a failed extraction, not
//! a corrupted record.

pub mod detail;
pub mod search;

pub use detail::extract_detail_record;
pub use search::{extract_listing_links, SearchPage};

use crate::error::AppError;

/// Extraction failure: an expected structural element is missing or
/// malformed. Whether this is fatal is the caller's decision.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("malformed {field}: {value:?}")]
    Malformed { field: &'static str, value: String },
}

impl From<ExtractError> for AppError {
    fn from(err: ExtractError) -> Self {
        AppError::Extraction(err.to_string())
    }
}

/// Collapse runs of whitespace to single spaces and trim.
pub(crate) fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
