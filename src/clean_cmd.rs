//! `imdbp clean`: raw scraper export in, dataset file out.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use imdb_pipeline_core::clean::{clean_records, CleanOptions, CleanReport};

use crate::dataset::{write_atomic, write_dataset};
use crate::raw::read_raw_records;

/// The JSON document written by `--report`.
#[derive(Debug, Serialize)]
struct ReportFile<'a> {
    raw: String,
    output: String,
    unreadable: usize,
    malformed: usize,
    duplicates: usize,
    #[serde(flatten)]
    report: &'a CleanReport,
}

/// Clean `raw` into `output`, optionally writing the rejection report as JSON.
pub fn run_clean(
    opts: &CleanOptions,
    raw: &Path,
    output: &Path,
    report_path: Option<&Path>,
) -> Result<CleanReport> {
    let export = read_raw_records(raw)?;
    let outcome = clean_records(export.records, opts);
    let report = outcome.report;

    for r in &report.rejections {
        match &r.rank {
            Some(rank) => warn!("Rejected row {} (rank {}, {}): {}", r.row, rank, r.title, r.reason),
            None => warn!("Rejected row {} ({}): {}", r.row, r.title, r.reason),
        }
    }

    write_dataset(output, &outcome.records)
        .with_context(|| format!("Failed to write dataset: {}", output.display()))?;

    if let Some(path) = report_path {
        let file = ReportFile {
            raw: raw.display().to_string(),
            output: output.display().to_string(),
            unreadable: export.unreadable,
            malformed: report.malformed_count(),
            duplicates: report.duplicate_count(),
            report: &report,
        };
        let mut json = serde_json::to_string_pretty(&file)?;
        json.push('\n');
        write_atomic(path, json.as_bytes())?;
        info!("Rejection report written to {}", path.display());
    }

    println!("clean {}", raw.display());
    println!("  rows read: {}", report.total + export.unreadable);
    if export.unreadable > 0 {
        println!("  unreadable: {}", export.unreadable);
    }
    println!("  accepted: {}", report.accepted);
    println!("  malformed: {}", report.malformed_count());
    println!("  duplicates: {}", report.duplicate_count());
    println!("  dedup policy: {}", opts.dedup);
    println!("  output: {}", output.display());
    println!("ok");

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::read_dataset;
    use std::fs;
    use tempfile::TempDir;

    const RAW: &str = "Rank,Title,Year,Runtime,IMDb Rating,Votes,Genres\n\
        1,The Dark Knight,2008,2h 32m,9.0,(3M),\"Action, Crime\"\n\
        2,Broken Movie,2010,1h 40m,N/A,(1K),Drama\n\
        3,the dark  knight,2008,2h 32m,9.0,(3M),\n\
        4,Inception,2010,2h 28m,8.8,(2.6M),Sci-Fi\n";

    #[test]
    fn test_clean_writes_dataset_and_report() {
        let tmp = TempDir::new().unwrap();
        let raw = tmp.path().join("raw.csv");
        let out = tmp.path().join("clean.csv");
        let report_path = tmp.path().join("report.json");
        fs::write(&raw, RAW).unwrap();

        let report = run_clean(&CleanOptions::default(), &raw, &out, Some(&report_path)).unwrap();
        assert_eq!(report.total, 4);
        assert_eq!(report.accepted, 2);
        assert_eq!(report.malformed_count(), 1);
        assert_eq!(report.duplicate_count(), 1);

        let records = read_dataset(&out).unwrap();
        let titles: Vec<&str> = records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["The Dark Knight", "Inception"]);
        assert_eq!(records[0].votes, 3_000_000);

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
        assert_eq!(json["malformed"], 1);
        assert_eq!(json["duplicates"], 1);
        assert_eq!(json["rejections"][0]["row"], 2);
        assert_eq!(json["rejections"][0]["reason"]["type"], "malformed_field");
        assert_eq!(json["rejections"][0]["reason"]["kind"], "rating");
        assert_eq!(json["rejections"][0]["rank"], "2");
        assert_eq!(json["rejections"][1]["rank"], "3");
        assert_eq!(json["rejections"][1]["reason"]["kept_row"], 1);
    }

    #[test]
    fn test_missing_raw_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("clean.csv");
        let result = run_clean(
            &CleanOptions::default(),
            &tmp.path().join("missing.csv"),
            &out,
            None,
        );
        assert!(result.is_err());
        assert!(!out.exists());
    }
}
