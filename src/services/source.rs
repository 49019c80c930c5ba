// SPDX-License-Identifier: MIT

//! HTTP client for the source website.
//!
//! Handles:
//! - Search-results fetches (faceted query endpoint, form-encoded offset)
//! - Detail-page fetches by permalink
//! - Rate limit detection (surfaced for queue-level backoff, never retried here)

use crate::error::AppError;
use reqwest::header::USER_AGENT;
use std::time::Duration;

/// Bounded timeout on every source fetch; a timeout is a retryable failure.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Faceted search endpoint, relative to the site base URL.
const SEARCH_ENDPOINT: &str = "/activities/activities/@@faceted_query";

/// Source website client.
#[derive(Clone)]
pub struct SourceClient {
    http: reqwest::Client,
    base_url: String,
    user_agent: String,
}

impl SourceClient {
    pub fn new(base_url: &str, user_agent: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            user_agent: user_agent.to_string(),
        }
    }

    /// Build the faceted-query URL for one search-results page.
    ///
    /// `start_index` is the zero-based record offset (`b_start:int`); the
    /// activity type is the `c4[]` facet. The bracket/colon characters are
    /// part of the query protocol and stay unescaped.
    fn search_url(&self, start_index: u32, activity_type: &str) -> String {
        format!(
            "{}{}?b_start:int={}&c4[]={}",
            self.base_url,
            SEARCH_ENDPOINT,
            start_index,
            urlencoding::encode(activity_type)
        )
    }

    /// Fetch one search-results page.
    pub async fn fetch_search_page(
        &self,
        start_index: u32,
        activity_type: &str,
    ) -> Result<String, AppError> {
        let url = self.search_url(start_index, activity_type);
        self.fetch_page(&url).await
    }

    /// Fetch one page by URL and return its body.
    pub async fn fetch_page(&self, url: &str) -> Result<String, AppError> {
        let response = self
            .http
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
            .map_err(|e| AppError::Fetch(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();

        if status.as_u16() == 429 {
            tracing::warn!(%url, "Source rate limit hit (429)");
            return Err(AppError::RateLimited);
        }

        if !status.is_success() {
            return Err(AppError::Fetch(format!("HTTP {} from {}", status, url)));
        }

        response
            .text()
            .await
            .map_err(|e| AppError::Fetch(format!("failed reading body from {}: {}", url, e)))
    }
}
