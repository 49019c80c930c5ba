// SPDX-License-Identifier: MIT

//! Application configuration loaded from environment variables.
//!
//! Secrets (the Discord bot token) are injected as environment variables by
//! Cloud Run secret bindings and cached in memory at startup.

use std::env;

/// Pipeline queue names. Rate limits and retry policy live on the queues
/// themselves: search-queue runs strictly sequential (each page enqueues the
/// next), scrape-queue allows 5 concurrent detail fetches, publish-queue is
/// serialized against Discord's rate limit.
pub const SEARCH_QUEUE_NAME: &str = "search-queue";
pub const SCRAPE_QUEUE_NAME: &str = "scrape-queue";
pub const PUBLISH_QUEUE_NAME: &str = "publish-queue";

/// Number of listings per search-results page on the source site.
pub const SEARCH_PAGE_SIZE: u32 = 20;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// GCP project ID
    pub gcp_project_id: String,
    /// GCP region for Cloud Tasks queues
    pub gcp_region: String,
    /// Server port
    pub port: u16,
    /// Public URL of this service, used as the Cloud Tasks callback target
    pub service_url: String,
    /// Base URL of the source website
    pub source_base_url: String,
    /// Activity type facet searched by default
    pub default_activity_type: String,
    /// Days after the activity date before the retention sweep deletes it
    pub retention_days: i64,
    /// Version string used in the outbound User-Agent header
    pub app_version: String,

    // --- Secrets (injected via Cloud Run secret bindings) ---
    /// Discord bot token (trimmed; Secret Manager values may carry newlines)
    pub discord_bot_token: String,
    /// Destination Discord channel ID
    pub discord_channel_id: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            gcp_region: env::var("GCP_REGION").unwrap_or_else(|_| "us-central1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            service_url: env::var("SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            source_base_url: env::var("SOURCE_BASE_URL")
                .unwrap_or_else(|_| "https://www.mountaineers.org".to_string()),
            default_activity_type: env::var("ACTIVITY_TYPE")
                .unwrap_or_else(|_| "Backcountry Skiing".to_string()),
            retention_days: env::var("RETENTION_DAYS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
            app_version: env::var("APP_VERSION").unwrap_or_else(|_| "dev".to_string()),

            discord_bot_token: env::var("DISCORD_BOT_TOKEN")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("DISCORD_BOT_TOKEN"))?,
            discord_channel_id: env::var("DISCORD_CHANNEL_ID")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("DISCORD_CHANNEL_ID"))?,
        })
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            gcp_project_id: "test-project".to_string(),
            gcp_region: "us-central1".to_string(),
            port: 8080,
            service_url: "http://localhost:8080".to_string(),
            source_base_url: "https://www.mountaineers.org".to_string(),
            default_activity_type: "Backcountry Skiing".to_string(),
            retention_days: 30,
            app_version: "test".to_string(),
            discord_bot_token: "test-bot-token".to_string(),
            discord_channel_id: "123456789".to_string(),
        }
    }

    /// User-Agent value sent on every outbound request (source site and
    /// Discord both want a stable client identifier).
    pub fn user_agent(&self) -> String {
        format!("trip-herald/{}", self.app_version)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_has_sane_values() {
        let config = Config::test_default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.default_activity_type, "Backcountry Skiing");
        assert_eq!(config.retention_days, 30);
    }

    #[test]
    fn user_agent_carries_version() {
        let config = Config::test_default();
        assert_eq!(config.user_agent(), "trip-herald/test");
    }
}
