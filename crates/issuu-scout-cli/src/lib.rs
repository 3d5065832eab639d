//! Issuu Scout command-line support: CSV ingestion, reports, diagnostics.

pub mod doctor;
pub mod ingest;
pub mod logging;
pub mod report;

pub use ingest::{load_company_names, read_company_names, IngestError, DEFAULT_COLUMN};
pub use report::{default_output_name, BatchReport};
