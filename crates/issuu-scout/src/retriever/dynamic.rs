//! Dynamic retrieval: render the search page in Chromium and read the DOM.
//!
//! Protocol per company:
//!
//! 1. Acquire a session. A launch failure triggers remediation (installing
//!    Chromium) and a single retry; if that fails too the error propagates as
//!    `RetrievalUnavailable`. Remediation runs at most once per retriever;
//!    concurrent and later callers reuse its outcome.
//! 2. Navigate, waiting only for the base document.
//! 3. Dismiss the cookie consent dialog if it shows up (non-fatal).
//! 4. Wait for a price-bearing result card. Timing out here means zero results.
//! 5. Scroll to the bottom once and let lazy cards attach.
//! 6. Extract every card; incomplete cards are dropped.
//! 7. Close the session on every path.
//!
//! Everything after step 1 degrades to an empty result instead of an error.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::{build_records, Retriever};
use crate::config::ScrapeContext;
use crate::error::{Result, ScrapeError};
use crate::renderer::{Remediator, RenderSession, Renderer};
use crate::types::{PublicationRecord, RawCard, RetrievalSource};

/// Cookiebot "accept all" button.
pub const CONSENT_ACCEPT_SELECTOR: &str = "#CybotCookiebotDialogBodyButtonAccept";
/// Cookiebot dialog container.
pub const CONSENT_DIALOG_SELECTOR: &str = "#CybotCookiebotDialog";
/// A result card: a list item holding a price element.
pub const RESULT_CARD_SELECTOR: &str =
    r#"li:has([class*="PublicationCard__publication-card__price"])"#;

const SCROLL_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight); true";

/// Reads raw fields from every result card; links are returned as found.
pub const EXTRACT_SCRIPT: &str = r#"
(() => {
  const PRICE = '[class*="PublicationCard__publication-card__price"]';
  const TITLE = 'h3[class*="PublicationCard__publication-card__card-title"]';
  const AUTHOR = 'a[class*="PublicationCard__publication-card__author-link"]';
  const text = (el) => (el && el.innerText ? el.innerText.trim() : null);
  return Array.from(document.querySelectorAll(`li:has(${PRICE})`)).map((item) => {
    const titleEl = item.querySelector(TITLE);
    const linkEl = (titleEl && titleEl.closest('a')) || item.querySelector(`a:has(${TITLE})`);
    const authorEl = item.querySelector(AUTHOR);
    return {
      title: text(titleEl),
      author_link: authorEl ? authorEl.getAttribute('href') : null,
      price: text(item.querySelector(PRICE)),
      publication_link: linkEl ? linkEl.getAttribute('href') : null,
    };
  });
})()
"#;

/// Chromium-backed retriever.
pub struct DynamicRetriever {
    renderer: Arc<dyn Renderer>,
    remediator: Arc<dyn Remediator>,
    remediation: OnceCell<std::result::Result<(), String>>,
    ctx: ScrapeContext,
}

impl DynamicRetriever {
    pub fn new(
        renderer: Arc<dyn Renderer>,
        remediator: Arc<dyn Remediator>,
        ctx: ScrapeContext,
    ) -> Self {
        Self {
            renderer,
            remediator,
            remediation: OnceCell::new(),
            ctx,
        }
    }

    /// Open a session, remediating on failure.
    async fn acquire(&self) -> Result<Box<dyn RenderSession>> {
        let first = match self.renderer.open_session(&self.ctx).await {
            Ok(session) => return Ok(session),
            Err(e) => e,
        };
        warn!("failed to launch browser: {first:#}");

        if !self.ctx.remediate {
            return Err(ScrapeError::RetrievalUnavailable(format!("{first:#}")));
        }

        let outcome = self
            .remediation
            .get_or_init(|| async {
                self.remediator.remediate().await.map_err(|e| {
                    warn!("browser remediation failed: {e:#}");
                    format!("{e:#}")
                })
            })
            .await;
        if let Err(e) = outcome {
            return Err(ScrapeError::RetrievalUnavailable(format!(
                "{first:#}; remediation failed: {e}"
            )));
        }

        self.renderer.open_session(&self.ctx).await.map_err(|e| {
            warn!("browser still unavailable after remediation: {e:#}");
            ScrapeError::RetrievalUnavailable(format!("{e:#}"))
        })
    }

    /// Click through the cookie dialog if it appears. Returns whether it was dismissed.
    async fn dismiss_consent(&self, session: &dyn RenderSession) -> bool {
        match session
            .wait_visible(CONSENT_ACCEPT_SELECTOR, self.ctx.consent_timeout)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                info!("no cookie consent dialog detected");
                return false;
            }
            Err(e) => {
                info!("cookie consent check failed: {e:#}");
                return false;
            }
        }

        if let Err(e) = session.click(CONSENT_ACCEPT_SELECTOR).await {
            info!("failed to dismiss cookie consent: {e:#}");
            return false;
        }

        match session
            .wait_hidden(CONSENT_DIALOG_SELECTOR, self.ctx.consent_dismiss_timeout)
            .await
        {
            Ok(true) => {
                info!("cookie consent dismissed");
                true
            }
            Ok(false) => {
                info!("cookie consent dialog still visible after click");
                false
            }
            Err(e) => {
                info!("cookie consent dismissal not confirmed: {e:#}");
                false
            }
        }
    }

    /// Steps 2 to 6 on an acquired session.
    async fn drive(
        &self,
        session: &mut dyn RenderSession,
        search_url: &str,
    ) -> Result<Vec<PublicationRecord>> {
        info!("navigating to {search_url}");
        let nav = session
            .navigate(search_url, self.ctx.navigation_timeout)
            .await
            .map_err(into_scrape_error)?;
        debug!("document parsed in {}ms at {}", nav.load_time_ms, nav.final_url);

        self.dismiss_consent(&*session).await;

        let visible = session
            .wait_visible(RESULT_CARD_SELECTOR, self.ctx.results_timeout)
            .await
            .map_err(into_scrape_error)?;
        if !visible {
            return Err(ScrapeError::SelectorTimeout {
                selector: RESULT_CARD_SELECTOR.to_string(),
                timeout_ms: self.ctx.results_timeout.as_millis() as u64,
            });
        }
        info!("search results loaded");

        session
            .execute_js(SCROLL_SCRIPT)
            .await
            .map_err(into_scrape_error)?;
        tokio::time::sleep(self.ctx.settle_delay).await;

        let raw = session
            .execute_js(EXTRACT_SCRIPT)
            .await
            .map_err(into_scrape_error)?;
        let cards: Vec<RawCard> = serde_json::from_value(raw)
            .map_err(|e| ScrapeError::Navigation(format!("unexpected extraction result: {e}")))?;
        debug!("found {} result cards", cards.len());

        let records = build_records(&self.ctx.base_url, cards);
        info!("extracted {} valid results", records.len());
        Ok(records)
    }
}

/// Recover a typed error raised by the renderer, or wrap an untyped one.
fn into_scrape_error(e: anyhow::Error) -> ScrapeError {
    match e.downcast::<ScrapeError>() {
        Ok(typed) => typed,
        Err(other) => ScrapeError::Navigation(format!("{other:#}")),
    }
}

#[async_trait]
impl Retriever for DynamicRetriever {
    fn source(&self) -> RetrievalSource {
        RetrievalSource::Dynamic
    }

    async fn retrieve(&self, search_url: &str) -> Result<Vec<PublicationRecord>> {
        let mut session = self.acquire().await?;

        let outcome = self.drive(session.as_mut(), search_url).await;

        info!("closing browser");
        if let Err(e) = session.close().await {
            warn!("failed to close browser cleanly: {e:#}");
        }

        match outcome {
            Ok(records) => Ok(records),
            Err(e) if e.is_empty_outcome() => {
                info!("no results for {search_url}: {e}");
                Ok(Vec::new())
            }
            Err(e) => {
                warn!("error during scraping of {search_url}: {e}");
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::{NavigationResult, NoRemediation};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Scripted page behavior shared by the fake renderer and its sessions.
    #[derive(Default)]
    struct Script {
        launch_failures: usize,
        consent_visible: bool,
        results_visible: bool,
        navigate_error: bool,
        cards: serde_json::Value,
    }

    #[derive(Default)]
    struct Probe {
        opened: AtomicUsize,
        closed: AtomicUsize,
        clicks: Mutex<Vec<String>>,
        scripts: Mutex<Vec<String>>,
    }

    struct FakeRenderer {
        script: Arc<Script>,
        probe: Arc<Probe>,
        attempts: AtomicUsize,
    }

    struct FakeSession {
        script: Arc<Script>,
        probe: Arc<Probe>,
    }

    #[async_trait]
    impl Renderer for FakeRenderer {
        async fn open_session(
            &self,
            _ctx: &ScrapeContext,
        ) -> anyhow::Result<Box<dyn RenderSession>> {
            let n = self.attempts.fetch_add(1, Ordering::SeqCst);
            if n < self.script.launch_failures {
                anyhow::bail!("chromium missing");
            }
            self.probe.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeSession {
                script: Arc::clone(&self.script),
                probe: Arc::clone(&self.probe),
            }))
        }
    }

    #[async_trait]
    impl RenderSession for FakeSession {
        async fn navigate(
            &mut self,
            url: &str,
            timeout: Duration,
        ) -> anyhow::Result<NavigationResult> {
            if self.script.navigate_error {
                anyhow::bail!(ScrapeError::NavigationTimeout {
                    timeout_ms: timeout.as_millis() as u64
                });
            }
            Ok(NavigationResult {
                final_url: url.to_string(),
                load_time_ms: 5,
            })
        }

        async fn wait_visible(&self, selector: &str, _timeout: Duration) -> anyhow::Result<bool> {
            Ok(match selector {
                CONSENT_ACCEPT_SELECTOR => self.script.consent_visible,
                RESULT_CARD_SELECTOR => self.script.results_visible,
                _ => false,
            })
        }

        async fn wait_hidden(&self, _selector: &str, _timeout: Duration) -> anyhow::Result<bool> {
            Ok(true)
        }

        async fn click(&self, selector: &str) -> anyhow::Result<()> {
            self.probe.clicks.lock().unwrap().push(selector.to_string());
            Ok(())
        }

        async fn execute_js(&self, script: &str) -> anyhow::Result<serde_json::Value> {
            self.probe.scripts.lock().unwrap().push(script.to_string());
            if script == EXTRACT_SCRIPT {
                Ok(self.script.cards.clone())
            } else {
                Ok(json!(true))
            }
        }

        async fn close(self: Box<Self>) -> anyhow::Result<()> {
            self.probe.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct CountingRemediator(AtomicUsize);

    #[async_trait]
    impl Remediator for CountingRemediator {
        async fn remediate(&self) -> anyhow::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn fast_ctx() -> ScrapeContext {
        ScrapeContext {
            settle_delay: Duration::from_millis(1),
            ..ScrapeContext::default()
        }
    }

    fn retriever(
        script: Script,
        remediator: Arc<dyn Remediator>,
    ) -> (DynamicRetriever, Arc<Probe>) {
        let probe = Arc::new(Probe::default());
        let renderer = FakeRenderer {
            script: Arc::new(script),
            probe: Arc::clone(&probe),
            attempts: AtomicUsize::new(0),
        };
        (
            DynamicRetriever::new(Arc::new(renderer), remediator, fast_ctx()),
            probe,
        )
    }

    fn sample_cards() -> serde_json::Value {
        json!([
            {"title": "Annual Report", "author_link": "/acmecorp", "price": "Free",
             "publication_link": "/acmecorp/docs/annual"},
            {"title": "Catalog", "author_link": "/acmeenterprises", "price": "$4.99",
             "publication_link": "https://issuu.com/acmeenterprises/docs/catalog"},
            {"title": null, "author_link": "/x", "price": "Free", "publication_link": "/x/docs/y"}
        ])
    }

    #[tokio::test]
    async fn test_full_protocol_extracts_and_closes() {
        let (r, probe) = retriever(
            Script {
                consent_visible: true,
                results_visible: true,
                cards: sample_cards(),
                ..Script::default()
            },
            Arc::new(NoRemediation),
        );

        let records = r.retrieve("https://issuu.com/search?q=Acme").await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].author_link, "https://issuu.com/acmecorp");
        assert_eq!(records[0].publication_link, "https://issuu.com/acmecorp/docs/annual");
        assert_eq!(records[1].price, "$4.99");

        assert_eq!(*probe.clicks.lock().unwrap(), vec![CONSENT_ACCEPT_SELECTOR.to_string()]);
        let scripts = probe.scripts.lock().unwrap();
        assert_eq!(scripts[0], SCROLL_SCRIPT);
        assert_eq!(scripts[1], EXTRACT_SCRIPT);
        assert_eq!(probe.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_consent_is_not_fatal() {
        let (r, probe) = retriever(
            Script {
                results_visible: true,
                cards: sample_cards(),
                ..Script::default()
            },
            Arc::new(NoRemediation),
        );
        let records = r.retrieve("u").await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(probe.clicks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_results_timeout_is_zero_results() {
        let (r, probe) = retriever(Script::default(), Arc::new(NoRemediation));
        let records = r.retrieve("u").await.unwrap();
        assert!(records.is_empty());
        assert!(probe.scripts.lock().unwrap().is_empty());
        assert_eq!(probe.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_navigation_failure_is_zero_results_and_closes() {
        let (r, probe) = retriever(
            Script {
                navigate_error: true,
                ..Script::default()
            },
            Arc::new(NoRemediation),
        );
        assert!(r.retrieve("u").await.unwrap().is_empty());
        assert_eq!(probe.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_malformed_extraction_is_zero_results() {
        let (r, _) = retriever(
            Script {
                results_visible: true,
                cards: json!({"not": "a list"}),
                ..Script::default()
            },
            Arc::new(NoRemediation),
        );
        assert!(r.retrieve("u").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_launch_failure_remediates_once_then_succeeds() {
        let remediator = Arc::new(CountingRemediator(AtomicUsize::new(0)));
        let (r, probe) = retriever(
            Script {
                launch_failures: 1,
                results_visible: true,
                cards: sample_cards(),
                ..Script::default()
            },
            remediator.clone(),
        );
        let records = r.retrieve("u").await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(remediator.0.load(Ordering::SeqCst), 1);
        assert_eq!(probe.opened.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_launch_failure_after_remediation_propagates() {
        let remediator = Arc::new(CountingRemediator(AtomicUsize::new(0)));
        let (r, probe) = retriever(
            Script {
                launch_failures: 2,
                ..Script::default()
            },
            remediator.clone(),
        );
        let err = r.retrieve("u").await.unwrap_err();
        assert!(matches!(err, ScrapeError::RetrievalUnavailable(_)));
        assert_eq!(remediator.0.load(Ordering::SeqCst), 1);
        assert_eq!(probe.closed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_remediation_propagates() {
        let (r, _) = retriever(
            Script {
                launch_failures: 1,
                ..Script::default()
            },
            Arc::new(NoRemediation),
        );
        let err = r.retrieve("u").await.unwrap_err();
        assert!(err.to_string().contains("remediation failed"));
    }

    /// Slow installer that never fixes anything.
    #[derive(Default)]
    struct SlowFailingInstaller {
        runs: AtomicUsize,
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Remediator for SlowFailingInstaller {
        async fn remediate(&self) -> anyhow::Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            anyhow::bail!("npx exited with 1")
        }
    }

    #[tokio::test]
    async fn test_batch_runs_installer_once() {
        use crate::batch::BatchOrchestrator;
        use crate::scraper::Scraper;

        let installer = Arc::new(SlowFailingInstaller::default());
        let (r, probe) = retriever(
            Script {
                launch_failures: usize::MAX,
                ..Script::default()
            },
            installer.clone(),
        );
        let retrievers: Vec<Arc<dyn Retriever>> = vec![Arc::new(r)];
        let scraper = Scraper::with_retrievers(fast_ctx(), retrievers);
        let names: Vec<String> = (1..=10).map(|i| format!("company {i}")).collect();

        let results = BatchOrchestrator::new(Arc::new(scraper)).run(&names, 5).await;

        assert_eq!(results.len(), 10);
        assert!(results.iter().all(|r| r.matching.is_empty() && r.error.is_none()));
        assert_eq!(installer.runs.load(Ordering::SeqCst), 1);
        assert_eq!(installer.peak.load(Ordering::SeqCst), 1);
        assert_eq!(probe.opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_successful_remediation_is_not_repeated() {
        let remediator = Arc::new(CountingRemediator(AtomicUsize::new(0)));
        let (r, _) = retriever(
            Script {
                launch_failures: 4,
                ..Script::default()
            },
            remediator.clone(),
        );
        for _ in 0..2 {
            assert!(r.retrieve("u").await.is_err());
        }
        assert_eq!(remediator.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_into_scrape_error_keeps_typed_errors() {
        let e = anyhow::Error::new(ScrapeError::NavigationTimeout { timeout_ms: 10 });
        assert!(into_scrape_error(e).is_empty_outcome());
        let e = anyhow::anyhow!("socket closed");
        assert!(matches!(into_scrape_error(e), ScrapeError::Navigation(_)));
    }
}
