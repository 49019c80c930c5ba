// SPDX-License-Identifier: MIT

//! Search-results page extraction.
//!
//! A results page is a sequence of `div.result-item` blocks, each holding
//! one detail-page link, plus an optional pagination "next" control. An
//! empty page is a valid terminal state, never an error.

use scraper::{Html, Selector};

/// Extracted contents of one search-results page.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    /// Detail-page URLs, in page order.
    pub listing_urls: Vec<String>,
    /// Href of the pagination "next" control, when present.
    pub next_page_url: Option<String>,
}

impl SearchPage {
    /// True when the page has an explicit next-page link.
    pub fn has_next_page(&self) -> bool {
        self.next_page_url.is_some()
    }
}

/// Extract listing links and the next-page URL from a search-results page.
pub fn extract_listing_links(html: &str) -> SearchPage {
    if html.trim().is_empty() {
        return SearchPage::default();
    }

    let document = Html::parse_document(html);
    let item_selector = Selector::parse("div.result-item").unwrap();
    let link_selector = Selector::parse("h3.result-title > a[href]").unwrap();
    let next_selector = Selector::parse("nav.pagination li.next a[href]").unwrap();

    let mut listing_urls = Vec::new();
    for item in document.select(&item_selector) {
        if let Some(link) = item.select(&link_selector).next() {
            if let Some(href) = link.value().attr("href") {
                listing_urls.push(href.to_string());
            }
        }
    }

    let next_page_url = document
        .select(&next_selector)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string);

    SearchPage {
        listing_urls,
        next_page_url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results_page(items: usize, with_next: bool) -> String {
        let mut html = String::from("<html><body>");
        for i in 0..items {
            html.push_str(&format!(
                r#"<div class="result-item contenttype-activity">
                     <h3 class="result-title"><a href="https://host/activities/activities/trip-{i}">Trip {i}</a></h3>
                   </div>"#
            ));
        }
        if with_next {
            html.push_str(
                r#"<nav class="pagination"><ul>
                     <li class="next"><a href="https://host/search?b_start:int=20">Next</a></li>
                   </ul></nav>"#,
            );
        }
        html.push_str("</body></html>");
        html
    }

    #[test]
    fn extracts_urls_in_page_order() {
        let page = extract_listing_links(&results_page(3, false));
        assert_eq!(
            page.listing_urls,
            vec![
                "https://host/activities/activities/trip-0",
                "https://host/activities/activities/trip-1",
                "https://host/activities/activities/trip-2",
            ]
        );
        assert!(!page.has_next_page());
    }

    #[test]
    fn finds_next_page_link() {
        let page = extract_listing_links(&results_page(20, true));
        assert_eq!(page.listing_urls.len(), 20);
        assert_eq!(
            page.next_page_url.as_deref(),
            Some("https://host/search?b_start:int=20")
        );
    }

    #[test]
    fn empty_document_is_a_valid_terminal_state() {
        let page = extract_listing_links("");
        assert!(page.listing_urls.is_empty());
        assert!(page.next_page_url.is_none());

        let page = extract_listing_links("<html><body><p>No results.</p></body></html>");
        assert!(page.listing_urls.is_empty());
    }

    #[test]
    fn item_without_title_link_is_skipped() {
        let html = r#"<div class="result-item"><h3 class="result-title">no link</h3></div>
                      <div class="result-item">
                        <h3 class="result-title"><a href="https://host/a/b/trip">Trip</a></h3>
                      </div>"#;
        let page = extract_listing_links(html);
        assert_eq!(page.listing_urls, vec!["https://host/a/b/trip"]);
    }
}
