// SPDX-License-Identifier: MIT

//! Activity detail page extraction.
//!
//! The detail page layout is position-dependent: the first `ul.details`
//! under `div.program-core` carries the date and labeled facts, the second
//! carries the difficulty field. The leader's profile permalink is only
//! available by truncating their roster image URL at the `@@` view suffix.

use crate::extract::{normalize_whitespace, ExtractError};
use crate::models::{ActivityDraft, Leader, Place};
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::America::Los_Angeles;
use scraper::{ElementRef, Html, Selector};

/// Textual date pattern on detail pages, e.g. "Tue, Feb 10, 2026".
const DATE_FORMAT: &str = "%a, %b %d, %Y";

const ACTIVITY_TYPE_LABEL: &str = "Activity Type:";
const BRANCH_LABEL: &str = "Branch:";
const DIFFICULTY_LABEL: &str = "Difficulty:";

/// Roster image URLs carry a Plone view suffix after this token; everything
/// before it is the leader's profile permalink.
const LEADER_IMG_DELIMITER: &str = "@@";

/// Extract the full activity draft from a detail page.
///
/// Dates are calendar dates in Pacific time on the page; they are stored as
/// UTC instants (local midnight converted).
pub fn extract_detail_record(html: &str, permalink: &str) -> Result<ActivityDraft, ExtractError> {
    let document = Html::parse_document(html);

    let title = extract_title(&document)?;
    let description = extract_description(&document);

    let details = detail_lists(&document);
    let activity_date = extract_activity_date(&details)?;
    let activity_type = extract_labeled(&details, ACTIVITY_TYPE_LABEL)
        .ok_or(ExtractError::MissingField("activity type"))?;
    let branch = extract_labeled(&details, BRANCH_LABEL);
    let difficulty_ratings = extract_difficulty_ratings(&details);

    let leader = extract_leader(&document)?;
    let place = extract_place(&document)?;

    Ok(ActivityDraft {
        permalink: permalink.to_string(),
        activity_type,
        title,
        description,
        difficulty_ratings,
        activity_date,
        branch,
        leader,
        place,
    })
}

fn extract_title(document: &Html) -> Result<String, ExtractError> {
    let selector = Selector::parse(".documentFirstHeading").unwrap();
    document
        .select(&selector)
        .next()
        .map(|el| normalize_whitespace(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty())
        .ok_or(ExtractError::MissingField("title"))
}

fn extract_description(document: &Html) -> String {
    let selector = Selector::parse("p.documentDescription").unwrap();
    document
        .select(&selector)
        .next()
        .map(|el| normalize_whitespace(&el.text().collect::<String>()))
        .unwrap_or_default()
}

/// Normalized text of every `li` in each `ul.details` under the program
/// core, in page order.
fn detail_lists(document: &Html) -> Vec<Vec<String>> {
    let list_selector = Selector::parse("div.program-core > ul.details").unwrap();
    let item_selector = Selector::parse("li").unwrap();

    document
        .select(&list_selector)
        .map(|list| {
            list.select(&item_selector)
                .map(|item| normalize_whitespace(&item.text().collect::<String>()))
                .collect()
        })
        .collect()
}

/// The date is the first item of the first details list.
fn extract_activity_date(
    details: &[Vec<String>],
) -> Result<chrono::DateTime<Utc>, ExtractError> {
    let text = details
        .first()
        .and_then(|items| items.first())
        .ok_or(ExtractError::MissingField("activity date"))?;

    let date = NaiveDate::parse_from_str(text, DATE_FORMAT).map_err(|_| {
        ExtractError::Malformed {
            field: "activity date",
            value: text.clone(),
        }
    })?;

    // Local midnight in the source timezone; LA has no DST transition at
    // midnight, so the local time is never skipped or ambiguous.
    Los_Angeles
        .from_local_datetime(&date.and_time(NaiveTime::MIN))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or(ExtractError::Malformed {
            field: "activity date",
            value: text.clone(),
        })
}

/// Find a labeled entry (e.g. "Branch: Seattle") anywhere in the details
/// lists and return its value with the label stripped.
fn extract_labeled(details: &[Vec<String>], label: &str) -> Option<String> {
    details
        .iter()
        .flatten()
        .find_map(|item| item.strip_prefix(label))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// The difficulty field is the first item of the second details list:
/// label stripped, whitespace collapsed, comma-split, blanks dropped.
fn extract_difficulty_ratings(details: &[Vec<String>]) -> Vec<String> {
    let Some(text) = details.get(1).and_then(|items| items.first()) else {
        return Vec::new();
    };

    let text = text.strip_prefix(DIFFICULTY_LABEL).unwrap_or(text);

    text.split(',')
        .map(|rating| normalize_whitespace(rating))
        .filter(|rating| !rating.is_empty())
        .collect()
}

fn extract_leader(document: &Html) -> Result<Leader, ExtractError> {
    let contact_selector = Selector::parse("div.leaders div.roster-contact").unwrap();
    let img_selector = Selector::parse("img[src]").unwrap();

    let contact = document
        .select(&contact_selector)
        .next()
        .ok_or(ExtractError::MissingField("leader"))?;

    // The name lives in the roster contact's only unclassed child div.
    let name = contact
        .children()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "div" && el.value().attr("class").is_none())
        .map(|el| normalize_whitespace(&el.text().collect::<String>()))
        .filter(|name| !name.is_empty())
        .ok_or(ExtractError::MissingField("leader name"))?;

    let img_url = contact
        .select(&img_selector)
        .next()
        .and_then(|img| img.value().attr("src"))
        .map(str::trim)
        .ok_or(ExtractError::MissingField("leader image"))?;

    let permalink = img_url
        .split_once(LEADER_IMG_DELIMITER)
        .map(|(profile, _)| profile.to_string())
        .ok_or_else(|| ExtractError::Malformed {
            field: "leader permalink",
            value: img_url.to_string(),
        })?;

    Ok(Leader { permalink, name })
}

fn extract_place(document: &Html) -> Result<Place, ExtractError> {
    let tab_title_selector = Selector::parse("div.tab-title").unwrap();
    let name_selector = Selector::parse("h3").unwrap();
    let link_selector = Selector::parse("a[href]").unwrap();

    for tab_title in document.select(&tab_title_selector) {
        let heading: String = tab_title.text().collect();
        if !heading.contains("Route/Place") {
            continue;
        }

        let content = tab_title
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .find(|el| has_class(el, "tab-content"))
            .ok_or(ExtractError::MissingField("place"))?;

        let name = content
            .select(&name_selector)
            .next()
            .map(|el| normalize_whitespace(&el.text().collect::<String>()))
            .filter(|name| !name.is_empty())
            .ok_or(ExtractError::MissingField("place name"))?;

        let permalink = content
            .select(&link_selector)
            .find(|a| a.text().collect::<String>().contains("See full"))
            .and_then(|a| a.value().attr("href"))
            .map(|href| href.trim().to_string())
            .ok_or(ExtractError::MissingField("place permalink"))?;

        return Ok(Place { permalink, name });
    }

    Err(ExtractError::MissingField("place"))
}

fn has_class(el: &ElementRef, class: &str) -> bool {
    el.value()
        .attr("class")
        .is_some_and(|attr| attr.split_whitespace().any(|token| token == class))
}
