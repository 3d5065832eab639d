//! Deduplication of extracted records.

use std::collections::HashSet;

use tracing::debug;

use crate::types::PublicationRecord;

/// Keep the first record for each distinct title, in encounter order.
///
/// Titles compare exactly (case-sensitive, no trimming).
pub fn dedup_by_title(records: Vec<PublicationRecord>) -> Vec<PublicationRecord> {
    let mut seen: HashSet<String> = HashSet::with_capacity(records.len());
    let mut unique = Vec::with_capacity(records.len());

    for record in records {
        if seen.insert(record.title.clone()) {
            debug!("kept: {}", record.title);
            unique.push(record);
        } else {
            debug!("skipped duplicate: {}", record.title);
        }
    }

    unique
}
