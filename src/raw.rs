//! Reader for the scraper's CSV export.
//!
//! The scraper writes columns named after the IMDb listing (`Title`,
//! `IMDb Rating`, ...). Lower-case aliases are accepted too, extra columns
//! are ignored, and missing columns read as empty text, which the cleaner
//! then rejects with a precise reason.

use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use imdb_pipeline_core::models::RawRecord;

use crate::error::DatasetError;

#[derive(Debug, Deserialize)]
struct ScrapedRow {
    #[serde(rename = "Title", alias = "title", default)]
    title: String,
    #[serde(rename = "Year", alias = "year", default)]
    year: String,
    #[serde(rename = "IMDb Rating", alias = "rating", alias = "Rating", default)]
    rating: String,
    #[serde(rename = "Votes", alias = "votes", default)]
    votes: String,
    #[serde(rename = "Votes_Numeric", alias = "votes_numeric", default)]
    votes_numeric: Option<String>,
    #[serde(rename = "Runtime", alias = "runtime", default)]
    runtime: String,
    #[serde(rename = "Genres", alias = "genres", alias = "Genre", default)]
    genres: String,
    #[serde(rename = "Rank", alias = "rank", default)]
    rank: Option<String>,
    #[serde(rename = "URL", alias = "url", default)]
    url: Option<String>,
}

impl From<ScrapedRow> for RawRecord {
    fn from(row: ScrapedRow) -> Self {
        // The formatted vote text wins; the numeric column is a fallback.
        let votes = match row.votes_numeric {
            Some(n) if row.votes.trim().is_empty() => n,
            _ => row.votes,
        };
        RawRecord {
            title: row.title,
            year: row.year,
            rating: row.rating,
            votes,
            runtime: row.runtime,
            genres: row.genres,
            rank: row.rank,
            url: row.url,
        }
    }
}

/// Raw rows read from an export, plus a count of rows the CSV parser
/// could not read at all.
#[derive(Debug, Default)]
pub struct RawExport {
    pub records: Vec<RawRecord>,
    pub unreadable: usize,
}

/// Read a scraper export. A leading UTF-8 BOM is tolerated, and rows that
/// are not valid UTF-8 are counted as unreadable.
pub fn read_raw_records(path: &Path) -> Result<RawExport, DatasetError> {
    info!("Reading raw export: {}", path.display());

    // Bytes, not a String: a row with invalid UTF-8 is skipped by the
    // deserializer instead of failing the whole file.
    let bytes = std::fs::read(path).map_err(|e| DatasetError::io(path, e))?;
    let content = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(&bytes);

    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(content);

    let mut export = RawExport::default();
    for (i, result) in rdr.deserialize::<ScrapedRow>().enumerate() {
        match result {
            Ok(row) => export.records.push(row.into()),
            Err(e) => {
                warn!("Skipping unreadable row {}: {}", i + 1, e);
                export.unreadable += 1;
            }
        }
    }

    info!(
        "Read {} raw rows ({} unreadable)",
        export.records.len(),
        export.unreadable
    );
    Ok(export)
}
