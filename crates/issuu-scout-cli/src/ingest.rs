//! Company-name ingestion from CSV files.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use thiserror::Error;

/// Header read when the caller does not name one.
pub const DEFAULT_COLUMN: &str = "company_name";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("column `{column}` not found (available: {available})")]
    MissingColumn { column: String, available: String },
}

/// Read names from `column` of a CSV file. See [`read_company_names`].
pub fn load_company_names(path: &Path, column: &str) -> Result<Vec<String>, IngestError> {
    let file = std::fs::File::open(path).map_err(|source| IngestError::Io {
        path: path.display().to_string(),
        source,
    })?;
    read_company_names(file, column)
}

/// Read names from `column` (header matched case-insensitively).
///
/// Values are trimmed; empty cells are skipped; repeated names keep their
/// first position.
pub fn read_company_names<R: Read>(reader: R, column: &str) -> Result<Vec<String>, IngestError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let idx = headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(column.trim()))
        .ok_or_else(|| IngestError::MissingColumn {
            column: column.to_string(),
            available: headers.iter().collect::<Vec<_>>().join(", "),
        })?;

    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for row in rdr.records() {
        let row = row?;
        let Some(name) = row.get(idx).map(str::trim) else {
            continue;
        };
        if name.is_empty() {
            continue;
        }
        if seen.insert(name.to_string()) {
            names.push(name.to_string());
        }
    }

    Ok(names)
}
