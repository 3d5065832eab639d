//! Static retrieval: plain GET plus HTML parsing, no script execution.
//!
//! Server-rendered markup carries far less than the rendered page. Result
//! containers are `li` elements holding a publication link (`/docs/` in the
//! path). Authorship is inferred from the link itself, so every record this
//! path returns is reported as matching and tagged `RetrievalSource::Static`.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

use super::http_client::HttpClient;
use super::{build_records, Retriever};
use crate::config::ScrapeContext;
use crate::error::{Result, ScrapeError};
use crate::types::{PublicationRecord, RawCard, RetrievalSource};

/// Price recorded when the static markup has no price element.
pub const UNKNOWN_PRICE: &str = "unknown";

struct CardSelectors {
    container: Selector,
    publication: Selector,
    title: Selector,
    author: Selector,
    price: Selector,
}

impl CardSelectors {
    fn new() -> Result<Self> {
        let parse = |s: &str| {
            Selector::parse(s).map_err(|e| ScrapeError::Config(format!("selector `{s}`: {e:?}")))
        };
        Ok(Self {
            container: parse("li")?,
            publication: parse(r#"a[href*="/docs/"]"#)?,
            title: parse("h3")?,
            author: parse(r#"a[class*="author"]"#)?,
            price: parse(r#"[class*="price"]"#)?,
        })
    }
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join(" ").trim().to_string()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Profile link derived from the first path segment of a publication link.
fn author_from_publication(base_url: &str, publication_href: &str) -> Option<String> {
    let base = Url::parse(&format!("{}/", base_url.trim_end_matches('/'))).ok()?;
    let url = base.join(publication_href).ok()?;
    let slug = url.path_segments()?.find(|s| !s.is_empty())?;
    if slug == "docs" {
        return None;
    }
    Some(format!("/{slug}"))
}

fn read_card(item: ElementRef<'_>, sel: &CardSelectors, base_url: &str) -> Option<RawCard> {
    let link = item.select(&sel.publication).next()?;
    let href = link.value().attr("href").map(str::to_string);

    let title = item
        .select(&sel.title)
        .next()
        .map(text_of)
        .and_then(non_empty)
        .or_else(|| link.value().attr("title").map(str::to_string).and_then(non_empty))
        .or_else(|| non_empty(text_of(link)));

    let author_link = item
        .select(&sel.author)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string)
        .or_else(|| href.as_deref().and_then(|h| author_from_publication(base_url, h)));

    let price = item
        .select(&sel.price)
        .next()
        .map(text_of)
        .and_then(non_empty)
        .unwrap_or_else(|| UNKNOWN_PRICE.to_string());

    Some(RawCard {
        title,
        author_link,
        price: Some(price),
        publication_link: href,
    })
}

/// Extract records from a server-rendered search page.
pub fn parse_results(html: &str, base_url: &str) -> Result<Vec<PublicationRecord>> {
    let sel = CardSelectors::new()?;
    let document = Html::parse_document(html);

    let cards: Vec<RawCard> = document
        .select(&sel.container)
        .filter_map(|item| read_card(item, &sel, base_url))
        .collect();

    Ok(build_records(base_url, cards))
}

/// Degraded-mode retriever for environments without a browser.
///
/// Every `retrieve` call builds its own client, so concurrent pipelines never
/// share a connection pool.
pub struct StaticRetriever {
    ctx: ScrapeContext,
}

impl StaticRetriever {
    /// Fails when no HTTP client can be built for `ctx`.
    pub fn new(ctx: &ScrapeContext) -> Result<Self> {
        HttpClient::new(ctx)?;
        Ok(Self { ctx: ctx.clone() })
    }
}

#[async_trait]
impl Retriever for StaticRetriever {
    fn source(&self) -> RetrievalSource {
        RetrievalSource::Static
    }

    async fn retrieve(&self, search_url: &str) -> Result<Vec<PublicationRecord>> {
        let client = HttpClient::new(&self.ctx)?;
        let resp = client.get(search_url).await.map_err(|e| {
            warn!("static fetch of {search_url} failed: {e}");
            e
        })?;

        if resp.final_url != resp.url {
            debug!("static fetch redirected: {} -> {}", resp.url, resp.final_url);
        }
        if !resp.is_success() {
            return Err(ScrapeError::RetrievalUnavailable(format!(
                "HTTP {} from {}",
                resp.status, resp.final_url
            )));
        }

        let base = self.ctx.base_url.clone();
        let body = resp.body;
        let records = tokio::task::spawn_blocking(move || parse_results(&body, &base))
            .await
            .map_err(|e| ScrapeError::RetrievalUnavailable(format!("HTML parse task: {e}")))??;

        info!("static path extracted {} records from {search_url}", records.len());
        Ok(records)
    }
}
