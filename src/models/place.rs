// SPDX-License-Identifier: MIT

//! Route/place record.

use serde::{Deserialize, Serialize};

/// A route or place, identified by its permalink.
/// Upserted on every scrape; retained indefinitely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub permalink: String,
    pub name: String,
}

impl Place {
    /// Document ID: last two path segments joined with `_`.
    ///
    /// Place permalinks nest one level deeper than activities
    /// (`.../routes-places/<category>/<route>`), so the final segment alone
    /// is not unique.
    pub fn document_id(&self) -> String {
        let trimmed = self.permalink.trim_end_matches('/');
        let mut segments = trimmed.rsplit('/');
        let last = segments.next().unwrap_or(trimmed);
        match segments.next() {
            Some(parent) => format!("{}_{}", parent, last),
            None => last.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_id_joins_last_two_segments() {
        let place = Place {
            permalink: "https://host/activities/routes-places/ski-resorts-nordic-centers/snoqualmie-summit-ski-areas"
                .to_string(),
            name: "Snoqualmie Summit".to_string(),
        };
        assert_eq!(
            place.document_id(),
            "ski-resorts-nordic-centers_snoqualmie-summit-ski-areas"
        );
    }

    #[test]
    fn document_id_handles_trailing_slash() {
        let place = Place {
            permalink: "https://host/routes-places/foo/bar/".to_string(),
            name: "Bar".to_string(),
        };
        assert_eq!(place.document_id(), "foo_bar");
    }
}
