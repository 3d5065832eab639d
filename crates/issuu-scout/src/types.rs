//! Core data types for publication search results.

use serde::{Deserialize, Serialize};

/// A single publication card extracted from a search results page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationRecord {
    pub title: String,
    /// Absolute URL of the uploading account's profile.
    pub author_link: String,
    pub price: String,
    /// Absolute URL of the publication itself.
    pub publication_link: String,
}

/// Fields read from one result card before validation.
///
/// Links are still as found in the markup (possibly platform-relative).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawCard {
    pub title: Option<String>,
    pub author_link: Option<String>,
    pub price: Option<String>,
    pub publication_link: Option<String>,
}

/// A company name prepared for similarity scoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyQuery {
    pub raw_name: String,
    pub normalized_domain: String,
}

impl CompanyQuery {
    pub fn new(raw_name: &str) -> Self {
        Self {
            raw_name: raw_name.to_string(),
            normalized_domain: normalize_identity(raw_name),
        }
    }

    /// Whether the name is empty or whitespace-only.
    pub fn is_blank(&self) -> bool {
        self.raw_name.trim().is_empty()
    }
}

/// Lower-case and strip spaces and periods.
///
/// Applied identically to company names and author slugs.
pub fn normalize_identity(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .filter(|c| *c != ' ' && *c != '.')
        .collect()
}

/// Which retrieval path produced a result set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalSource {
    /// Plain HTML; authorship is inferred, every record lands in `matching`.
    Static,
    /// Rendered page; records were classified by author similarity.
    Dynamic,
    /// Nothing was retrieved.
    #[default]
    None,
}

/// Records partitioned by whether they belong to the queried company.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedResult {
    pub matching: Vec<PublicationRecord>,
    pub non_matching: Vec<PublicationRecord>,
    #[serde(default)]
    pub source: RetrievalSource,
}

impl ClassifiedResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.matching.is_empty() && self.non_matching.is_empty()
    }

    /// All records, matching first, as offered for download.
    pub fn all_records(&self) -> Vec<PublicationRecord> {
        self.matching
            .iter()
            .chain(self.non_matching.iter())
            .cloned()
            .collect()
    }
}

/// Outcome for one company in a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyScrapeResult {
    pub company: String,
    pub matching: Vec<PublicationRecord>,
    pub non_matching: Vec<PublicationRecord>,
    #[serde(default)]
    pub source: RetrievalSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CompanyScrapeResult {
    pub fn from_classified(company: &str, result: ClassifiedResult) -> Self {
        Self {
            company: company.to_string(),
            matching: result.matching,
            non_matching: result.non_matching,
            source: result.source,
            error: None,
        }
    }

    pub fn failed(company: &str, error: impl Into<String>) -> Self {
        Self {
            company: company.to_string(),
            matching: Vec::new(),
            non_matching: Vec::new(),
            source: RetrievalSource::None,
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
