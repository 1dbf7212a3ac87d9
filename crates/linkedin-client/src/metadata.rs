//! Link preview metadata
//!
//! Best effort: any failure (transport, non-2xx, unreadable body) yields the
//! fallback record instead of an error, so a slow or broken page never blocks
//! a post.

use scraper::{Html, Selector};
use serde::Serialize;
use tracing::{debug, warn};

use crate::client::LinkedInClient;

const NO_TITLE: &str = "No Title";

const DESCRIPTION_SELECTORS: &[&str] = &[
    r#"meta[name="description"]"#,
    r#"meta[property="og:description"]"#,
];

const IMAGE_SELECTORS: &[&str] = &[
    r#"meta[property="og:image"]"#,
    r#"meta[name="twitter:image"]"#,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrlMetadata {
    pub title: String,
    pub description: String,
    pub image: String,
}

impl UrlMetadata {
    /// Returned whenever the page cannot be fetched.
    pub fn fallback() -> Self {
        Self {
            title: NO_TITLE.to_string(),
            description: String::new(),
            image: String::new(),
        }
    }
}

impl LinkedInClient {
    /// Fetch `url` and extract title, description and preview image.
    pub async fn fetch_url_metadata(&self, url: &str) -> UrlMetadata {
        let response = match self
            .http
            .get(url)
            .timeout(self.metadata_timeout)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
        {
            Ok(r) => r,
            Err(e) => {
                warn!(url, error = %e, "error fetching metadata");
                return UrlMetadata::fallback();
            }
        };

        match response.text().await {
            Ok(html) => {
                let metadata = parse_metadata(&html);
                debug!(url, title = %metadata.title, "fetched link metadata");
                metadata
            }
            Err(e) => {
                warn!(url, error = %e, "error reading metadata body");
                UrlMetadata::fallback()
            }
        }
    }
}

/// Extract metadata from an HTML document. Missing elements give empty
/// strings (or "No Title"), never an error.
pub fn parse_metadata(html: &str) -> UrlMetadata {
    let document = Html::parse_document(html);

    let title = Selector::parse("title")
        .ok()
        .and_then(|sel| {
            document
                .select(&sel)
                .next()
                .map(|el| el.text().collect::<String>().trim().to_string())
        })
        .unwrap_or_else(|| NO_TITLE.to_string());

    UrlMetadata {
        title,
        description: first_meta_content(&document, DESCRIPTION_SELECTORS),
        image: first_meta_content(&document, IMAGE_SELECTORS),
    }
}

/// `content` of the first element matching the first selector that matches
/// anything at all.
fn first_meta_content(document: &Html, selectors: &[&str]) -> String {
    selectors
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .find_map(|sel| document.select(&sel).next())
        .and_then(|el| el.value().attr("content"))
        .unwrap_or_default()
        .to_string()
}
