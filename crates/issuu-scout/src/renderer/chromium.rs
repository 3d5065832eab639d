//! Chromium-based renderer using chromiumoxide.

use super::{NavigationResult, RenderSession, Renderer};
use crate::config::ScrapeContext;
use crate::error::ScrapeError;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::debug;

/// How often visibility conditions are re-checked.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Distinguishes user-data directories of concurrently launched browsers.
static SESSION_SEQ: AtomicU64 = AtomicU64::new(0);

/// Directory the installer downloads Chromium into.
pub fn install_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".issuu-scout/chromium"))
}

/// Find the Chromium binary path.
pub fn find_chromium(explicit: Option<&Path>) -> Option<PathBuf> {
    // 1. Explicit path from the context
    if let Some(p) = explicit {
        if p.exists() {
            return Some(p.to_path_buf());
        }
    }

    // 2. ISSUU_SCOUT_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("ISSUU_SCOUT_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 3. ~/.issuu-scout/chromium/
    if let Some(dir) = install_dir() {
        if let Some(found) = find_installed(&dir) {
            return Some(found);
        }
    }

    // 4. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 5. Common macOS location
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Look for a browser laid out as `<dir>/chrome/<platform-version>/<bundle>/chrome`.
fn find_installed(dir: &Path) -> Option<PathBuf> {
    let direct = dir.join("chrome");
    if direct.is_file() {
        return Some(direct);
    }

    let bundles: &[&str] = if cfg!(target_os = "macos") {
        &[
            "chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing",
            "chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing",
        ]
    } else {
        &["chrome-linux64/chrome"]
    };

    let versions = std::fs::read_dir(dir.join("chrome")).ok()?;
    versions
        .filter_map(|entry| entry.ok())
        .flat_map(|entry| bundles.iter().map(move |b| entry.path().join(b)))
        .find(|candidate| candidate.is_file())
}

/// Chromium-based renderer. Each session is a separate browser process.
#[derive(Debug, Default, Clone)]
pub struct ChromiumRenderer;

impl ChromiumRenderer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn open_session(&self, ctx: &ScrapeContext) -> Result<Box<dyn RenderSession>> {
        let chrome_path = find_chromium(ctx.chromium_path.as_deref())
            .context("Chromium not found. Run `issuu-scout install`.")?;

        let seq = SESSION_SEQ.fetch_add(1, Ordering::Relaxed);
        let profile_dir = std::env::temp_dir()
            .join(format!("issuu-scout-{}-{seq}", std::process::id()));

        let config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .user_data_dir(&profile_dir)
            .request_timeout(ctx.navigation_timeout)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .arg(format!("--user-agent={}", ctx.user_agent))
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        // Spawn the handler task
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                let _ = browser.wait().await;
                handler_task.abort();
                let _ = tokio::fs::remove_dir_all(&profile_dir).await;
                return Err(e).context("failed to create new page");
            }
        };

        Ok(Box::new(ChromiumSession {
            browser,
            page,
            handler_task,
            profile_dir,
        }))
    }
}

/// One Chromium process with a single page.
pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    profile_dir: PathBuf,
}

impl ChromiumSession {
    async fn eval_bool(&self, script: &str) -> Result<bool> {
        let result = self
            .page
            .evaluate(script)
            .await
            .context("JS execution failed")?;
        Ok(result.into_value::<bool>().unwrap_or(false))
    }

    /// Re-evaluate `script` until it yields `true` or the timeout elapses.
    ///
    /// Evaluation errors count as "not yet": the execution context is
    /// replaced during navigation and redirects.
    async fn poll_until(&self, script: &str, timeout: Duration) -> Result<bool> {
        poll_deadline(timeout, move || self.eval_bool(script)).await
    }
}

/// Run `check` every [`POLL_INTERVAL`] until it returns `Ok(true)` or
/// `timeout` elapses. Errors are logged and retried.
async fn poll_deadline<F, Fut>(timeout: Duration, mut check: F) -> Result<bool>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<bool>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        match check().await {
            Ok(true) => return Ok(true),
            Ok(false) => {}
            Err(e) => debug!("page not ready for evaluation: {e:#}"),
        }
        if Instant::now() >= deadline {
            return Ok(false);
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// JS predicate: some element matching `selector` is rendered and not hidden.
fn visible_script(selector: &str) -> String {
    let sel = serde_json::Value::String(selector.to_string());
    format!(
        "(() => Array.from(document.querySelectorAll({sel})).some(el => {{ \
            const s = window.getComputedStyle(el); \
            const r = el.getBoundingClientRect(); \
            return s.display !== 'none' && s.visibility !== 'hidden' && (r.width > 0 || r.height > 0); \
        }}))()"
    )
}

#[async_trait]
impl RenderSession for ChromiumSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<NavigationResult> {
        let start = Instant::now();
        let timeout_ms = timeout.as_millis() as u64;

        let params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|e| anyhow::anyhow!("bad navigation target: {e}"))?;

        let response = match tokio::time::timeout(timeout, self.page.execute(params)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => bail!(ScrapeError::Navigation(e.to_string())),
            Err(_) => bail!(ScrapeError::NavigationTimeout { timeout_ms }),
        };
        if let Some(error_text) = &response.result.error_text {
            bail!(ScrapeError::Navigation(error_text.clone()));
        }

        // Only wait for the base document, not for every subresource.
        let remaining = timeout.saturating_sub(start.elapsed());
        if !self
            .poll_until("document.readyState !== 'loading'", remaining)
            .await?
        {
            bail!(ScrapeError::NavigationTimeout { timeout_ms });
        }

        let final_url = self
            .page
            .url()
            .await
            .unwrap_or_default()
            .map(|u| u.to_string())
            .unwrap_or_else(|| url.to_string());

        Ok(NavigationResult {
            final_url,
            load_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn wait_visible(&self, selector: &str, timeout: Duration) -> Result<bool> {
        self.poll_until(&visible_script(selector), timeout).await
    }

    async fn wait_hidden(&self, selector: &str, timeout: Duration) -> Result<bool> {
        let script = format!("!{}", visible_script(selector));
        self.poll_until(&script, timeout).await
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.page
            .find_element(selector)
            .await
            .with_context(|| format!("no element for `{selector}`"))?
            .click()
            .await
            .with_context(|| format!("click on `{selector}` failed"))?;
        Ok(())
    }

    async fn execute_js(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .context("JS execution failed")?;

        result
            .into_value()
            .map_err(|e| anyhow::anyhow!("failed to convert JS result: {e:?}"))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let ChromiumSession {
            mut browser,
            page,
            handler_task,
            profile_dir,
        } = *self;

        let _ = page.close().await;
        let closed = browser.close().await;
        let _ = browser.wait().await;
        handler_task.abort();
        let _ = tokio::fs::remove_dir_all(&profile_dir).await;

        closed.context("failed to close Chromium")?;
        Ok(())
    }
}
