//! Error taxonomy for the scraping pipeline.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScrapeError>;

/// All errors the pipeline distinguishes.
///
/// Only `RetrievalUnavailable` and `TaskFailure` ever leave a component;
/// timeouts and incomplete cards are absorbed into "zero results".
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// A retrieval backend is missing, failed to start, or the request failed.
    #[error("retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("navigation timed out after {timeout_ms}ms")]
    NavigationTimeout { timeout_ms: u64 },

    #[error("selector `{selector}` not visible after {timeout_ms}ms")]
    SelectorTimeout { selector: String, timeout_ms: u64 },

    #[error("card is missing field `{field}`")]
    ExtractionIncomplete { field: &'static str },

    /// Something escaped a single company's pipeline during a batch run.
    #[error("task failed: {0}")]
    TaskFailure(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for ScrapeError {
    fn from(err: reqwest::Error) -> Self {
        ScrapeError::RetrievalUnavailable(err.to_string())
    }
}

impl From<url::ParseError> for ScrapeError {
    fn from(err: url::ParseError) -> Self {
        ScrapeError::Config(format!("bad URL: {err}"))
    }
}

impl ScrapeError {
    /// Whether this error means "no results" rather than a broken backend.
    pub fn is_empty_outcome(&self) -> bool {
        matches!(
            self,
            ScrapeError::NavigationTimeout { .. }
                | ScrapeError::SelectorTimeout { .. }
                | ScrapeError::ExtractionIncomplete { .. }
        )
    }
}
