//! CSV in, report file out, with a stand-in scraper.

use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;

use issuu_scout::{
    BatchOrchestrator, ClassifiedResult, CompanyScraper, PublicationRecord, RetrievalSource,
    ScrapeError,
};
use issuu_scout_cli::{load_company_names, BatchReport};

struct Echo;

#[async_trait]
impl CompanyScraper for Echo {
    async fn scrape_company(&self, company: &str) -> issuu_scout::Result<ClassifiedResult> {
        if company == "Broken Ltd" {
            return Err(ScrapeError::TaskFailure("renderer crashed".into()));
        }
        let slug = company.to_lowercase().replace(' ', "");
        Ok(ClassifiedResult {
            matching: vec![PublicationRecord {
                title: format!("{company} brochure"),
                author_link: format!("https://issuu.com/{slug}"),
                price: "Free".into(),
                publication_link: format!("https://issuu.com/{slug}/docs/brochure"),
            }],
            non_matching: Vec::new(),
            source: RetrievalSource::Dynamic,
        })
    }
}

#[tokio::test]
async fn csv_batch_writes_ordered_report() {
    let mut csv = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv, "id,company_name").unwrap();
    for (i, name) in ["Acme Corp", "Globex", " ", "Broken Ltd", "Acme Corp", "Initech"]
        .iter()
        .enumerate()
    {
        writeln!(csv, "{i},{name}").unwrap();
    }

    let names = load_company_names(csv.path(), "company_name").unwrap();
    assert_eq!(names, vec!["Acme Corp", "Globex", "Broken Ltd", "Initech"]);

    let results = BatchOrchestrator::new(Arc::new(Echo)).run(&names, 3).await;
    let report = BatchReport::new(3, results);

    let out = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(out.path(), serde_json::to_string_pretty(&report).unwrap()).unwrap();
    let back: BatchReport =
        serde_json::from_str(&std::fs::read_to_string(out.path()).unwrap()).unwrap();

    let companies: Vec<&str> = back.results.iter().map(|r| r.company.as_str()).collect();
    assert_eq!(companies, names.iter().map(String::as_str).collect::<Vec<_>>());
    assert_eq!(back.failed(), 1);
    assert!(back.results[2].error.as_deref().unwrap().contains("renderer crashed"));
    assert_eq!(back.results[3].matching[0].title, "Initech brochure");
}
