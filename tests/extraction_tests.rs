// SPDX-License-Identifier: MIT

//! Extraction tests against full-page fixtures.
//!
//! The unit tests in src/extract cover minimal documents; these exercise
//! pages with the surrounding chrome the source site actually ships, so
//! selector drift against realistic markup is caught here.

use trip_herald::extract::{extract_detail_record, extract_listing_links};
use trip_herald::models::activity;

const SEARCH_PAGE: &str = include_str!("fixtures/search_results.html");
const DETAIL_PAGE: &str = include_str!("fixtures/activity_detail.html");

#[test]
fn search_fixture_yields_links_and_next_page() {
    let page = extract_listing_links(SEARCH_PAGE);

    assert_eq!(
        page.listing_urls,
        vec![
            "https://www.mountaineers.org/activities/activities/backcountry-ski-death-gully-72",
            "https://www.mountaineers.org/activities/activities/backcountry-ski-kendall-knob-3",
            "/activities/activities/intermediate-ski-jolly-mountain",
        ]
    );
    assert_eq!(
        page.next_page_url.as_deref(),
        Some("https://www.mountaineers.org/activities/@@faceted_query?b_start:int=40")
    );
}

#[test]
fn detail_fixture_extracts_complete_draft() {
    let permalink =
        "https://www.mountaineers.org/activities/activities/backcountry-ski-death-gully-72";
    let draft = extract_detail_record(DETAIL_PAGE, permalink).unwrap();

    assert_eq!(draft.title, "Backcountry Ski - Death Gully");
    assert_eq!(
        draft.description,
        "An early-season tour up the classic gully, conditions permitting."
    );
    assert_eq!(draft.activity_type, "Backcountry Skiing");
    assert_eq!(draft.branch.as_deref(), Some("Seattle"));
    assert_eq!(
        draft.difficulty_ratings,
        vec!["M2G", "Advanced Glacier Ski"]
    );
    // Sat, Feb 14 2026 00:00 PST == 08:00 UTC
    assert_eq!(draft.activity_date.to_rfc3339(), "2026-02-14T08:00:00+00:00");

    assert_eq!(draft.leader.name, "Jo Smith");
    assert_eq!(
        draft.leader.permalink,
        "https://www.mountaineers.org/members/jo-smith/"
    );
    assert_eq!(draft.leader.document_id(), "jo-smith");

    assert_eq!(draft.place.name, "Death Gully, Snoqualmie Pass");
    assert_eq!(
        draft.place.permalink,
        "https://www.mountaineers.org/activities/routes-places/snoqualmie/death-gully"
    );
    assert_eq!(draft.place.document_id(), "snoqualmie_death-gully");

    assert_eq!(activity::document_id_for(permalink), "backcountry-ski-death-gully-72");
}
