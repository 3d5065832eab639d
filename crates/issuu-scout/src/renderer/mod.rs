//! Renderer abstraction for browser-based page rendering.
//!
//! Defines the `Renderer` and `RenderSession` traits that abstract over
//! the browser engine (currently Chromium via chromiumoxide). Every session
//! is an isolated browser instance owned by exactly one company pipeline.

pub mod chromium;
pub mod install;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ScrapeContext;

pub use chromium::{find_chromium, ChromiumRenderer};
pub use install::{CommandInstaller, NoRemediation, Remediator};

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The URL the page settled on.
    pub final_url: String,
    /// Time until the base document was parsed, in milliseconds.
    pub load_time_ms: u64,
}

/// A browser engine that can open rendering sessions.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Launch a fresh session presenting the context's client identity.
    async fn open_session(&self, ctx: &ScrapeContext) -> Result<Box<dyn RenderSession>>;
}

/// A single rendering session (one browser, one page).
#[async_trait]
pub trait RenderSession: Send + Sync {
    /// Navigate and wait until the base document is parsed.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<NavigationResult>;
    /// Wait for an element matching `selector` to be visible.
    ///
    /// `Ok(false)` means the timeout elapsed.
    async fn wait_visible(&self, selector: &str, timeout: Duration) -> Result<bool>;
    /// Wait for every element matching `selector` to be hidden or gone.
    async fn wait_hidden(&self, selector: &str, timeout: Duration) -> Result<bool>;
    /// Click the first element matching `selector`.
    async fn click(&self, selector: &str) -> Result<()>;
    /// Execute JavaScript in the page context and return the result.
    async fn execute_js(&self, script: &str) -> Result<serde_json::Value>;
    /// Release the session and everything it holds.
    async fn close(self: Box<Self>) -> Result<()>;
}
