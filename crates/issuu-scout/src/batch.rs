//! Chunked multi-company orchestration.
//!
//! Names are split into fixed-size chunks. A chunk's pipelines run
//! interleaved on the calling task and the next chunk starts only after every
//! member of the current one has finished. A failure or panic in one pipeline
//! is recorded against that company alone.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::future::join_all;
use futures::FutureExt;
use tracing::{info, warn};

use crate::config::DEFAULT_CONCURRENCY;
use crate::error::{Result, ScrapeError};
use crate::scraper::Scraper;
use crate::types::{ClassifiedResult, CompanyScrapeResult};

/// Anything that can scrape a single company.
#[async_trait]
pub trait CompanyScraper: Send + Sync {
    async fn scrape_company(&self, company: &str) -> Result<ClassifiedResult>;
}

#[async_trait]
impl CompanyScraper for Scraper {
    async fn scrape_company(&self, company: &str) -> Result<ClassifiedResult> {
        Ok(self.scrape(company).await)
    }
}

/// Sizes of the chunks a batch of `total` names is split into.
pub fn chunk_sizes(total: usize, concurrency: usize) -> Vec<usize> {
    let limit = concurrency.max(1);
    (0..total)
        .step_by(limit)
        .map(|start| limit.min(total - start))
        .collect()
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Runs a `CompanyScraper` over many names.
pub struct BatchOrchestrator {
    scraper: Arc<dyn CompanyScraper>,
}

impl BatchOrchestrator {
    pub fn new(scraper: Arc<dyn CompanyScraper>) -> Self {
        Self { scraper }
    }

    async fn run_one(&self, company: &str) -> CompanyScrapeResult {
        let outcome = AssertUnwindSafe(self.scraper.scrape_company(company))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(result)) => CompanyScrapeResult::from_classified(company, result),
            Ok(Err(e)) => {
                warn!("scrape failed for '{company}': {e}");
                CompanyScrapeResult::failed(company, e.to_string())
            }
            Err(payload) => {
                let err = ScrapeError::TaskFailure(panic_message(payload));
                warn!("scrape panicked for '{company}': {err}");
                CompanyScrapeResult::failed(company, err.to_string())
            }
        }
    }

    /// One result per input name, in input order.
    ///
    /// A `concurrency` of zero is treated as one.
    pub async fn run(&self, companies: &[String], concurrency: usize) -> Vec<CompanyScrapeResult> {
        let limit = concurrency.max(1);
        let chunk_count = chunk_sizes(companies.len(), limit).len();
        let start = Instant::now();
        info!(
            "batch of {} companies, concurrency {limit}, {chunk_count} chunk(s)",
            companies.len()
        );

        let mut results = Vec::with_capacity(companies.len());
        for (n, chunk) in companies.chunks(limit).enumerate() {
            info!("chunk {}/{chunk_count}: {}", n + 1, chunk.join(", "));
            let chunk_results = join_all(chunk.iter().map(|c| self.run_one(c))).await;
            results.extend(chunk_results);
        }

        let failed = results.iter().filter(|r| r.is_error()).count();
        info!(
            "batch finished in {:.1}s: {} ok, {failed} failed",
            start.elapsed().as_secs_f64(),
            results.len() - failed
        );
        results
    }

    /// `run` with the default concurrency.
    pub async fn run_default(&self, companies: &[String]) -> Vec<CompanyScrapeResult> {
        self.run(companies, DEFAULT_CONCURRENCY).await
    }
}
