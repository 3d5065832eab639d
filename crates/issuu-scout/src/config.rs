//! Execution context passed down through the pipeline.
//!
//! Every timeout, the client identity and the platform origin live here
//! instead of in process-wide state. `from_env` overlays `ISSUU_SCOUT_*`
//! variables on the defaults; callers may overlay CLI flags on top.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, ScrapeError};

/// Platform origin used to build search URLs and resolve relative links.
pub const DEFAULT_BASE_URL: &str = "https://issuu.com";

/// Desktop Chrome identity presented to the platform.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/129.0.0.0 Safari/537.36";

pub const DEFAULT_CONCURRENCY: usize = 5;

/// Timeouts and identity for one scraping run.
#[derive(Debug, Clone)]
pub struct ScrapeContext {
    /// Platform origin without trailing slash.
    pub base_url: String,
    pub user_agent: String,
    /// Page navigation bound (base document parsed).
    pub navigation_timeout: Duration,
    /// How long to wait for the cookie "accept" control.
    pub consent_timeout: Duration,
    /// How long to wait for the consent dialog to disappear after clicking.
    pub consent_dismiss_timeout: Duration,
    /// How long to wait for the first result card.
    pub results_timeout: Duration,
    /// Pause after scrolling so lazily loaded cards can attach.
    pub settle_delay: Duration,
    /// Bound on the static path's single GET.
    pub http_timeout: Duration,
    /// Batch chunk size.
    pub concurrency: usize,
    /// Explicit Chromium binary; discovered when `None`.
    pub chromium_path: Option<PathBuf>,
    /// Try the static path before launching a browser.
    pub static_first: bool,
    /// Allow one installer run when Chromium cannot be launched.
    pub remediate: bool,
}

impl Default for ScrapeContext {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            navigation_timeout: Duration::from_secs(60),
            consent_timeout: Duration::from_secs(7),
            consent_dismiss_timeout: Duration::from_secs(10),
            results_timeout: Duration::from_secs(30),
            settle_delay: Duration::from_secs(1),
            http_timeout: Duration::from_secs(30),
            concurrency: DEFAULT_CONCURRENCY,
            chromium_path: None,
            static_first: true,
            remediate: true,
        }
    }
}

impl ScrapeContext {
    /// Defaults overlaid with `ISSUU_SCOUT_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let mut ctx = Self::default();

        if let Ok(v) = std::env::var("ISSUU_SCOUT_BASE_URL") {
            ctx = ctx.with_base_url(&v)?;
        }
        if let Ok(v) = std::env::var("ISSUU_SCOUT_USER_AGENT") {
            if !v.trim().is_empty() {
                ctx.user_agent = v;
            }
        }
        if let Ok(v) = std::env::var("ISSUU_SCOUT_CONCURRENCY") {
            let n = v
                .parse::<usize>()
                .map_err(|e| ScrapeError::Config(format!("ISSUU_SCOUT_CONCURRENCY: {e}")))?;
            ctx.concurrency = n.max(1);
        }
        if let Ok(v) = std::env::var("ISSUU_SCOUT_NAV_TIMEOUT_MS") {
            let ms = v
                .parse::<u64>()
                .map_err(|e| ScrapeError::Config(format!("ISSUU_SCOUT_NAV_TIMEOUT_MS: {e}")))?;
            ctx.navigation_timeout = Duration::from_millis(ms);
        }
        if let Ok(v) = std::env::var("ISSUU_SCOUT_CHROMIUM_PATH") {
            ctx.chromium_path = Some(PathBuf::from(v));
        }

        Ok(ctx)
    }

    /// Replace the platform origin. The value must parse as an absolute URL.
    pub fn with_base_url(mut self, base: &str) -> Result<Self> {
        let parsed = url::Url::parse(base)?;
        if parsed.cannot_be_a_base() {
            return Err(ScrapeError::Config(format!("not a base URL: {base}")));
        }
        self.base_url = base.trim_end_matches('/').to_string();
        Ok(self)
    }

    /// Origin with exactly one trailing slash, the prefix stripped from author links.
    pub fn origin_prefix(&self) -> String {
        format!("{}/", self.base_url.trim_end_matches('/'))
    }
}
