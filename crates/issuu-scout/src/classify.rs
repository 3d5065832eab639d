//! Partition records by whether their author looks like the queried company.

use tracing::debug;

use crate::similarity::similarity_ratio;
use crate::types::{
    normalize_identity, ClassifiedResult, CompanyQuery, PublicationRecord, RetrievalSource,
};

/// Minimum similarity for an author to count as the company.
pub const MATCH_THRESHOLD: f64 = 0.8;

/// Whether a similarity score clears the match threshold (inclusive).
pub fn is_match(score: f64) -> bool {
    score >= MATCH_THRESHOLD
}

/// Author identity slug from a profile link.
///
/// Strips the platform origin prefix, undoes percent-encoding, then applies
/// the same normalization as company names. Links outside the platform are
/// normalized whole.
pub fn author_domain(author_link: &str, origin_prefix: &str) -> String {
    let slug = author_link
        .strip_prefix(origin_prefix)
        .unwrap_or(author_link)
        .trim_end_matches('/');
    match urlencoding::decode(slug) {
        Ok(decoded) => normalize_identity(&decoded),
        Err(_) => normalize_identity(slug),
    }
}

/// Score one record's author against the company.
pub fn score(query: &CompanyQuery, record: &PublicationRecord, origin_prefix: &str) -> f64 {
    similarity_ratio(
        &query.normalized_domain,
        &author_domain(&record.author_link, origin_prefix),
    )
}

/// Split deduplicated records into matching and non-matching sets.
///
/// Pure; relative order within each set follows the input.
pub fn classify(
    records: Vec<PublicationRecord>,
    query: &CompanyQuery,
    origin_prefix: &str,
) -> ClassifiedResult {
    let mut result = ClassifiedResult {
        source: RetrievalSource::Dynamic,
        ..ClassifiedResult::default()
    };

    for record in records {
        let s = score(query, &record, origin_prefix);
        if is_match(s) {
            debug!("matched: {} (similarity {s:.2})", record.title);
            result.matching.push(record);
        } else {
            debug!("non-matched: {} (similarity {s:.2})", record.title);
            result.non_matching.push(record);
        }
    }

    result
}
