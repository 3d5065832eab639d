//! Retrieval paths for search result pages.
//!
//! Two implementations of one capability: `StaticRetriever` fetches raw HTML
//! over HTTP, `DynamicRetriever` renders the page in Chromium. The scraper
//! tries them in a fixed order.

pub mod dynamic;
pub mod http_client;
pub mod static_html;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Result, ScrapeError};
use crate::query::absolutize;
use crate::types::{PublicationRecord, RawCard, RetrievalSource};

pub use dynamic::DynamicRetriever;
pub use http_client::HttpClient;
pub use static_html::StaticRetriever;

/// Fetches candidate records for one search URL.
///
/// `Err(RetrievalUnavailable)` means this path cannot be used and the caller
/// should try another. Zero results are `Ok(vec![])`.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Which path this is; results are tagged with it.
    fn source(&self) -> RetrievalSource;

    async fn retrieve(&self, search_url: &str) -> Result<Vec<PublicationRecord>>;
}

fn required(value: Option<String>, field: &'static str) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ScrapeError::ExtractionIncomplete { field })
}

/// Validate a raw card and resolve its links against the platform origin.
pub fn build_record(base_url: &str, card: RawCard) -> Result<PublicationRecord> {
    let title = required(card.title, "title")?;
    let author = required(card.author_link, "author_link")?;
    let price = required(card.price, "price")?;
    let link = required(card.publication_link, "publication_link")?;

    let author_link = absolutize(base_url, &author)
        .ok_or(ScrapeError::ExtractionIncomplete { field: "author_link" })?;
    let publication_link = absolutize(base_url, &link)
        .ok_or(ScrapeError::ExtractionIncomplete { field: "publication_link" })?;

    Ok(PublicationRecord {
        title,
        author_link,
        price,
        publication_link,
    })
}

/// Convert raw cards to records, silently dropping incomplete ones.
pub fn build_records(base_url: &str, cards: Vec<RawCard>) -> Vec<PublicationRecord> {
    cards
        .into_iter()
        .filter_map(|card| match build_record(base_url, card) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!("dropping card: {e}");
                None
            }
        })
        .collect()
}
