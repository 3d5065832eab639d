//! Single-company scraper: retrieval fallback chain, dedup, classification.

use std::sync::Arc;

use tracing::{info, warn};

use crate::classify::classify;
use crate::config::ScrapeContext;
use crate::normalize::dedup_by_title;
use crate::query::build_search_url;
use crate::renderer::{ChromiumRenderer, CommandInstaller, NoRemediation, Remediator};
use crate::retriever::{DynamicRetriever, Retriever, StaticRetriever};
use crate::types::{ClassifiedResult, CompanyQuery, PublicationRecord, RetrievalSource};

/// Runs the whole pipeline for one company name.
///
/// Retrievers are tried in order. One that is unavailable, or that yields
/// no records while another path remains, hands over to the next. The last
/// path's answer stands, even when empty.
pub struct Scraper {
    ctx: ScrapeContext,
    retrievers: Vec<Arc<dyn Retriever>>,
}

impl Scraper {
    /// Static path first (when it can be built), Chromium second.
    pub fn new(ctx: ScrapeContext) -> Self {
        let mut retrievers: Vec<Arc<dyn Retriever>> = Vec::new();

        if ctx.static_first {
            match StaticRetriever::new(&ctx) {
                Ok(r) => retrievers.push(Arc::new(r)),
                Err(e) => warn!("static path unavailable: {e}"),
            }
        }

        let remediator: Arc<dyn Remediator> = if ctx.remediate {
            match CommandInstaller::default_location() {
                Ok(installer) => Arc::new(installer),
                Err(e) => {
                    warn!("browser remediation unavailable: {e:#}");
                    Arc::new(NoRemediation)
                }
            }
        } else {
            Arc::new(NoRemediation)
        };
        retrievers.push(Arc::new(DynamicRetriever::new(
            Arc::new(ChromiumRenderer::new()),
            remediator,
            ctx.clone(),
        )));

        Self { ctx, retrievers }
    }

    /// Use an explicit, ordered list of retrieval paths.
    pub fn with_retrievers(ctx: ScrapeContext, retrievers: Vec<Arc<dyn Retriever>>) -> Self {
        Self { ctx, retrievers }
    }

    /// Scrape one company. Never fails: every unrecoverable error yields an
    /// empty result.
    pub async fn scrape(&self, company: &str) -> ClassifiedResult {
        let query = CompanyQuery::new(company);
        if query.is_blank() {
            info!("blank company name, skipping");
            return ClassifiedResult::empty();
        }

        let url = build_search_url(&self.ctx.base_url, company);
        info!("generated URL for company '{company}': {url}");

        let last = self.retrievers.len().saturating_sub(1);
        for (idx, retriever) in self.retrievers.iter().enumerate() {
            let source = retriever.source();
            match retriever.retrieve(&url).await {
                Ok(records) if records.is_empty() && idx < last => {
                    info!("{source:?} path found nothing for '{company}', falling back");
                }
                Ok(records) => return self.finish(&query, records, source),
                Err(e) => warn!("{source:?} path failed for '{company}': {e}"),
            }
        }

        warn!("no retrieval path usable for '{company}'");
        ClassifiedResult::empty()
    }

    /// `(matching, non_matching)` for callers that do not care about the source.
    pub async fn scrape_pair(
        &self,
        company: &str,
    ) -> (Vec<PublicationRecord>, Vec<PublicationRecord>) {
        let result = self.scrape(company).await;
        (result.matching, result.non_matching)
    }

    fn finish(
        &self,
        query: &CompanyQuery,
        records: Vec<PublicationRecord>,
        source: RetrievalSource,
    ) -> ClassifiedResult {
        let unique = dedup_by_title(records);

        let result = match source {
            // No reliable authorship without rendering.
            RetrievalSource::Static => ClassifiedResult {
                matching: unique,
                non_matching: Vec::new(),
                source,
            },
            _ => classify(unique, query, &self.ctx.origin_prefix()),
        };

        info!(
            "scraping completed for '{}': {} matching, {} non-matching ({:?})",
            query.raw_name,
            result.matching.len(),
            result.non_matching.len(),
            result.source
        );
        result
    }
}
