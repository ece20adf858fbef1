//! The cleaned dataset file shared by the clean and load stages.
//!
//! Layout is fixed: `title,year,rating,votes,runtime_minutes,genres`, with
//! genres `|`-joined. Writes go through a temp file in the target directory
//! and are renamed into place, so a reader never sees a partial dataset and
//! an interrupted write leaves the previous file intact.
//!
//! Reading is strict. The header must match exactly and every row must
//! parse back into a valid [`CleanRecord`]; the first bad row fails the
//! whole read with its 1-based row number.

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};

use imdb_pipeline_core::models::{split_genres, CleanRecord};
use imdb_pipeline_core::normalize;

use crate::error::DatasetError;

/// Column names of the dataset file, in order.
pub const HEADER: [&str; 6] = ["title", "year", "rating", "votes", "runtime_minutes", "genres"];

#[derive(Serialize)]
struct DatasetRow<'a> {
    title: &'a str,
    year: u16,
    rating: f64,
    votes: u64,
    runtime_minutes: u32,
    genres: String,
}

impl<'a> From<&'a CleanRecord> for DatasetRow<'a> {
    fn from(r: &'a CleanRecord) -> Self {
        DatasetRow {
            title: &r.title,
            year: r.year,
            rating: r.rating,
            votes: r.votes,
            runtime_minutes: r.runtime_minutes,
            genres: r.genres_joined(),
        }
    }
}

/// Write records to `path` atomically. Returns the number of rows written.
pub fn write_dataset(path: &Path, records: &[CleanRecord]) -> Result<usize, DatasetError> {
    let mut buf = Vec::new();
    {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(&mut buf);
        wtr.write_record(HEADER).map_err(|e| DatasetError::csv(path, e))?;
        for record in records {
            wtr.serialize(DatasetRow::from(record))
                .map_err(|e| DatasetError::csv(path, e))?;
        }
        wtr.flush().map_err(|e| DatasetError::io(path, e))?;
    }

    write_atomic(path, &buf)?;
    info!("Wrote {} rows to {}", records.len(), path.display());
    Ok(records.len())
}

/// Replace `path` with `bytes` via a temp file and rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), DatasetError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| DatasetError::io(dir, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| DatasetError::io(dir, e))?;
    tmp.write_all(bytes).map_err(|e| DatasetError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| DatasetError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| DatasetError::io(path, e.error))?;

    debug!(path = %path.display(), bytes = bytes.len(), "persisted file");
    Ok(())
}

/// Read a dataset written by [`write_dataset`].
pub fn read_dataset(path: &Path) -> Result<Vec<CleanRecord>, DatasetError> {
    let content = std::fs::read_to_string(path).map_err(|e| DatasetError::io(path, e))?;

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(content.as_bytes());

    let headers = rdr.headers().map_err(|e| DatasetError::csv(path, e))?.clone();
    if headers.iter().ne(HEADER.iter().copied()) {
        return Err(DatasetError::Header {
            path: path.to_path_buf(),
            found: headers.iter().collect::<Vec<_>>().join(","),
            expected: HEADER.join(","),
        });
    }

    let mut records = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let row = i + 1;
        let fields = result.map_err(|e| DatasetError::InvalidRow {
            path: path.to_path_buf(),
            row,
            message: e.to_string(),
        })?;
        let record = parse_row(&fields).map_err(|message| DatasetError::InvalidRow {
            path: path.to_path_buf(),
            row,
            message,
        })?;
        records.push(record);
    }

    info!("Read {} rows from {}", records.len(), path.display());
    Ok(records)
}

fn parse_row(fields: &csv::StringRecord) -> Result<CleanRecord, String> {
    if fields.len() != HEADER.len() {
        return Err(format!(
            "expected {} fields, found {}",
            HEADER.len(),
            fields.len()
        ));
    }
    let field = |i: usize| fields.get(i).unwrap_or("");

    let title = normalize::parse_title(field(0)).map_err(|e| e.to_string())?;
    let year: u16 = field(1)
        .parse()
        .map_err(|_| format!("year {:?} is not an integer", field(1)))?;
    let rating: f64 = field(2)
        .parse()
        .map_err(|_| format!("rating {:?} is not a number", field(2)))?;
    if !rating.is_finite() || !(0.0..=10.0).contains(&rating) {
        return Err(format!("rating {} is outside 0-10", rating));
    }
    let votes: u64 = field(3)
        .parse()
        .map_err(|_| format!("votes {:?} is not a non-negative integer", field(3)))?;
    let runtime_minutes: u32 = field(4)
        .parse()
        .map_err(|_| format!("runtime_minutes {:?} is not a non-negative integer", field(4)))?;

    Ok(CleanRecord {
        title,
        year,
        rating,
        votes,
        runtime_minutes,
        genres: split_genres(field(5)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn record(title: &str, genres: &[&str]) -> CleanRecord {
        CleanRecord {
            title: title.to_string(),
            year: 1999,
            rating: 8.7,
            votes: 2_100_000,
            runtime_minutes: 136,
            genres: genres.iter().map(|g| g.to_string()).collect(),
        }
    }

    #[test]
    fn test_write_then_read_preserves_fields() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out").join("clean.csv");
        let records = vec![
            record("The Matrix", &["Action", "Sci-Fi"]),
            record("Crouching Tiger, Hidden Dragon", &[]),
            record("Say \"Anything\"", &["Comedy"]),
        ];

        assert_eq!(write_dataset(&path, &records).unwrap(), 3);
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("title,year,rating,votes,runtime_minutes,genres\n"));
        assert!(text.contains("Action|Sci-Fi"));

        let back = read_dataset(&path).unwrap();
        assert_eq!(back, records);
    }

    #[test]
    fn test_empty_dataset_has_header_only() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("clean.csv");
        write_dataset(&path, &[]).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "title,year,rating,votes,runtime_minutes,genres\n"
        );
        assert!(read_dataset(&path).unwrap().is_empty());
    }

    #[test]
    fn test_rewrite_replaces_previous_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("clean.csv");
        write_dataset(&path, &[record("A", &[]), record("B", &[])]).unwrap();
        write_dataset(&path, &[record("C", &[])]).unwrap();
        let back = read_dataset(&path).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].title, "C");
    }

    #[test]
    fn test_wrong_header_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("clean.csv");
        fs::write(&path, "Title,Year\nHeat,1995\n").unwrap();
        let err = read_dataset(&path).unwrap_err();
        assert!(matches!(err, DatasetError::Header { .. }));
    }

    #[test]
    fn test_invalid_row_reports_row_number() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("clean.csv");
        fs::write(
            &path,
            "title,year,rating,votes,runtime_minutes,genres\n\
             Heat,1995,8.3,700000,170,Crime\n\
             Ronin,1998,11.5,200000,122,Action\n",
        )
        .unwrap();

        match read_dataset(&path).unwrap_err() {
            DatasetError::InvalidRow { row, message, .. } => {
                assert_eq!(row, 2);
                assert!(message.contains("rating"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_negative_votes_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("clean.csv");
        fs::write(
            &path,
            "title,year,rating,votes,runtime_minutes,genres\nHeat,1995,8.3,-5,170,\n",
        )
        .unwrap();
        assert!(matches!(
            read_dataset(&path).unwrap_err(),
            DatasetError::InvalidRow { row: 1, .. }
        ));
    }
}
