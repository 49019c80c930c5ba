// SPDX-License-Identifier: MIT

//! Discord client: announcement formatting and delivery.
//!
//! Formatting renders the activity date back in the source timezone, uses
//! `[text](<url>)` no-preview links for leader and place so the channel is
//! not flooded with unfurled previews, and prefixes difficulty ratings
//! with glyphs chosen from fixed match tables.

use crate::error::AppError;
use crate::models::{Activity, Leader, Place};
use chrono::DateTime;
use chrono_tz::America::Los_Angeles;
use reqwest::header::{AUTHORIZATION, USER_AGENT};
use serde::Deserialize;
use std::time::Duration;

const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Bounded timeout on message sends.
const SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Glyph prefixed to the announcement, by activity type.
const TYPE_GLYPHS: &[(&str, &str)] = &[
    ("Backcountry Skiing", "\u{26f7}\u{fe0f}"), // ⛷️
    ("Climbing", "\u{1f9d7}"),                  // 🧗
    ("Scrambling", "\u{26f0}\u{fe0f}"),         // ⛰️
    ("Day Hiking", "\u{1f97e}"),                // 🥾
    ("Snowshoeing", "\u{2744}\u{fe0f}"),        // ❄️
    ("Sea Kayaking", "\u{1f6f6}"),              // 🛶
];
const DEFAULT_TYPE_GLYPH: &str = "\u{1f3d4}\u{fe0f}"; // 🏔️

/// Difficulty-tier glyphs keyed by rating prefix. The longest matching
/// prefix governs when several match.
const TIER_GLYPHS: &[(&str, &str)] = &[
    ("M1", "\u{1f7e2}"), // 🟢
    ("M2", "\u{1f7e1}"), // 🟡
    ("M3", "\u{1f534}"), // 🔴
];

/// Appended to any rating mentioning glacier travel, whatever its tier.
const GLACIER_GLYPH: &str = "\u{1f9ca}"; // 🧊

/// Format one activity announcement.
///
/// Layout: a header line with the type glyph, date (`YYYY-MM-DD`, Pacific),
/// linked title, leader, place, and branch; then one line per difficulty
/// rating, glyph(s) first.
pub fn format_message(activity: &Activity, leader: &Leader, place: &Place) -> String {
    let date = DateTime::parse_from_rfc3339(&activity.activity_date)
        .map(|dt| dt.with_timezone(&Los_Angeles).format("%Y-%m-%d").to_string())
        .unwrap_or_else(|_| activity.activity_date.clone());

    let mut message = format!(
        "{} {} [{}]({}) led by [{}](<{}>) at [{}](<{}>)",
        type_glyph(&activity.activity_type),
        date,
        activity.title,
        activity.permalink,
        leader.name,
        leader.permalink,
        place.name,
        place.permalink,
    );

    if let Some(branch) = &activity.branch {
        message.push_str(&format!(" ({} Branch)", branch));
    }

    for rating in &activity.difficulty_ratings {
        message.push('\n');
        message.push_str(&format_rating(rating));
    }

    message
}

fn type_glyph(activity_type: &str) -> &'static str {
    TYPE_GLYPHS
        .iter()
        .find(|(label, _)| *label == activity_type)
        .map(|(_, glyph)| *glyph)
        .unwrap_or(DEFAULT_TYPE_GLYPH)
}

/// Glyph-prefix one difficulty rating: the most specific tier prefix plus
/// the glacier marker when it applies, then one space, then the rating.
fn format_rating(rating: &str) -> String {
    let mut glyphs = String::new();

    if let Some((_, glyph)) = TIER_GLYPHS
        .iter()
        .filter(|(prefix, _)| rating.starts_with(prefix))
        .max_by_key(|(prefix, _)| prefix.len())
    {
        glyphs.push_str(glyph);
    }

    if rating.contains("Glacier") {
        glyphs.push_str(GLACIER_GLYPH);
    }

    if glyphs.is_empty() {
        rating.to_string()
    } else {
        format!("{} {}", glyphs, rating)
    }
}

/// Discord API client.
#[derive(Clone)]
pub struct DiscordClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
    channel_id: String,
    user_agent: String,
}

/// Message creation response; only the ID matters here.
#[derive(Debug, Deserialize)]
struct MessageResponse {
    id: String,
}

impl DiscordClient {
    pub fn new(bot_token: &str, channel_id: &str, user_agent: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: DISCORD_API_BASE.to_string(),
            // Secret Manager values may carry trailing newlines
            bot_token: bot_token.trim().to_string(),
            channel_id: channel_id.to_string(),
            user_agent: user_agent.to_string(),
        }
    }

    /// Send a message to the configured channel; returns the message ID.
    ///
    /// HTTP 429 surfaces as `RateLimited` for the caller to convert into
    /// queue-level backoff; there is no internal retry.
    pub async fn send(&self, content: &str) -> Result<String, AppError> {
        let url = format!("{}/channels/{}/messages", self.api_base, self.channel_id);

        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, format!("Bot {}", self.bot_token))
            .header(USER_AGENT, &self.user_agent)
            .json(&serde_json::json!({ "content": content }))
            .timeout(SEND_TIMEOUT)
            .send()
            .await
            .map_err(|e| AppError::Fetch(format!("Discord request failed: {}", e)))?;

        let status = response.status();

        if status.as_u16() == 429 {
            tracing::warn!("Discord rate limit hit (429)");
            return Err(AppError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Fetch(format!("Discord HTTP {}: {}", status, body)));
        }

        let message: MessageResponse = response
            .json()
            .await
            .map_err(|e| AppError::Fetch(format!("Discord JSON parse error: {}", e)))?;

        Ok(message.id)
    }
}
