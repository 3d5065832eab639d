//! JSON documents and plain-text tables for scrape results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use issuu_scout::{ClassifiedResult, CompanyScrapeResult, PublicationRecord, RetrievalSource};

/// Full result of a batch run, as written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub generated_at: DateTime<Utc>,
    pub concurrency: usize,
    pub results: Vec<CompanyScrapeResult>,
}

impl BatchReport {
    pub fn new(concurrency: usize, results: Vec<CompanyScrapeResult>) -> Self {
        Self {
            generated_at: Utc::now(),
            concurrency,
            results,
        }
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| r.is_error()).count()
    }
}

/// File name offered for a single-company download.
pub fn default_output_name(company: &str) -> String {
    format!("issuu_results_{}.json", company.trim().replace(' ', "_"))
}

/// Pretty JSON for a single company: matching records then non-matching.
pub fn search_json(result: &ClassifiedResult) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&result.all_records())
}

fn clip(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Render records as an aligned text table (title, author link, price).
pub fn render_table(records: &[PublicationRecord]) -> String {
    const TITLE_W: usize = 48;
    const AUTHOR_W: usize = 40;

    let mut out = format!("  {:<TITLE_W$}  {:<AUTHOR_W$}  PRICE\n", "TITLE", "AUTHOR");
    for r in records {
        out.push_str(&format!(
            "  {:<TITLE_W$}  {:<AUTHOR_W$}  {}\n",
            clip(&r.title, TITLE_W),
            clip(&r.author_link, AUTHOR_W),
            r.price
        ));
        out.push_str(&format!("    {}\n", r.publication_link));
    }
    out
}

/// Human-readable summary of one company's result.
pub fn render_search(company: &str, result: &ClassifiedResult) -> String {
    let mut out = String::new();

    if result.is_empty() {
        out.push_str(&format!("No results found for '{company}'.\n"));
        return out;
    }

    out.push_str(&format!(
        "Found {} matching and {} non-matching publications for '{company}'.\n",
        result.matching.len(),
        result.non_matching.len()
    ));
    if result.source == RetrievalSource::Static {
        out.push_str("Note: static fallback was used; authorship was not verified.\n");
    }

    out.push_str("\nMatching results (author similar to company name)\n");
    if result.matching.is_empty() {
        out.push_str("  none\n");
    } else {
        out.push_str(&render_table(&result.matching));
    }

    out.push_str("\nNon-matching results\n");
    if result.non_matching.is_empty() {
        out.push_str("  none\n");
    } else {
        out.push_str(&render_table(&result.non_matching));
    }
    out
}

/// One line per company for batch runs.
pub fn render_batch_summary(report: &BatchReport) -> String {
    let mut out = String::new();
    for r in &report.results {
        match &r.error {
            Some(e) => out.push_str(&format!("  [!!] {}: {e}\n", r.company)),
            None => out.push_str(&format!(
                "  [OK] {}: {} matching, {} non-matching ({:?})\n",
                r.company,
                r.matching.len(),
                r.non_matching.len(),
                r.source
            )),
        }
    }
    out.push_str(&format!(
        "\n{} companies, {} failed\n",
        report.results.len(),
        report.failed()
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(title: &str) -> PublicationRecord {
        PublicationRecord {
            title: title.to_string(),
            author_link: "https://issuu.com/acmecorp".to_string(),
            price: "Free".to_string(),
            publication_link: "https://issuu.com/acmecorp/docs/x".to_string(),
        }
    }

    #[test]
    fn test_default_output_name() {
        assert_eq!(default_output_name("Acme Corp"), "issuu_results_Acme_Corp.json");
    }

    #[test]
    fn test_search_json_orders_matching_first() {
        let result = ClassifiedResult {
            matching: vec![rec("a")],
            non_matching: vec![rec("b")],
            source: RetrievalSource::Dynamic,
        };
        let v: serde_json::Value = serde_json::from_str(&search_json(&result).unwrap()).unwrap();
        assert_eq!(v[0]["title"], "a");
        assert_eq!(v[1]["title"], "b");
    }

    #[test]
    fn test_render_search_flags_static_source() {
        let result = ClassifiedResult {
            matching: vec![rec("a")],
            non_matching: Vec::new(),
            source: RetrievalSource::Static,
        };
        let text = render_search("Acme", &result);
        assert!(text.contains("authorship was not verified"));
        assert!(text.contains("https://issuu.com/acmecorp/docs/x"));
    }

    #[test]
    fn test_render_search_empty() {
        let text = render_search("Acme", &ClassifiedResult::empty());
        assert!(text.starts_with("No results found"));
    }

    #[test]
    fn test_clip_long_titles() {
        let long = "x".repeat(100);
        assert_eq!(clip(&long, 10).chars().count(), 10);
        assert_eq!(clip("short", 10), "short");
    }

    #[test]
    fn test_batch_report_round_trip() {
        let report = BatchReport::new(
            5,
            vec![
                CompanyScrapeResult::from_classified(
                    "Acme",
                    ClassifiedResult {
                        matching: vec![rec("a")],
                        non_matching: vec![rec("b")],
                        source: RetrievalSource::Dynamic,
                    },
                ),
                CompanyScrapeResult::failed("Globex", "task failed: boom"),
            ],
        );
        let json = serde_json::to_string(&report).unwrap();
        let back: BatchReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
        assert_eq!(back.failed(), 1);
        assert!(render_batch_summary(&back).contains("[!!] Globex"));
    }
}
