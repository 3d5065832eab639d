// Copyright 2026 Issuu Scout Contributors
// SPDX-License-Identifier: MIT

//! Issuu Scout — find publications that belong to a company and separate
//! them from look-alikes.
//!
//! The pipeline per company: build the search URL, retrieve result cards
//! (static HTML first, headless Chromium as fallback), deduplicate by title,
//! and classify each card by how closely its author slug matches the company
//! name. `BatchOrchestrator` runs the pipeline over many names in fixed-size
//! concurrent chunks.

pub mod batch;
pub mod classify;
pub mod config;
pub mod error;
pub mod normalize;
pub mod query;
pub mod renderer;
pub mod retriever;
pub mod scraper;
pub mod similarity;
pub mod types;

pub use batch::{BatchOrchestrator, CompanyScraper};
pub use classify::{classify, MATCH_THRESHOLD};
pub use config::ScrapeContext;
pub use error::{Result, ScrapeError};
pub use normalize::dedup_by_title;
pub use query::build_search_url;
pub use scraper::Scraper;
pub use similarity::similarity_ratio;
pub use types::*;
