//! `imdbp load`: upsert a dataset file into the `movies` table.
//!
//! The dataset is read and validated in full before a connection is
//! opened, so a malformed file never touches the database. The upsert
//! itself runs in a single transaction (see [`MovieStore::upsert_all`]).

use std::path::Path;

use anyhow::Result;
use tracing::info;

use crate::config::Config;
use crate::dataset::read_dataset;
use crate::db;
use crate::error::LoadError;
use crate::migrate::ensure_schema;
use crate::store::{LoadSummary, MovieStore};

/// Outcome of a successful load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    pub summary: LoadSummary,
    /// Rows in the table after the load committed.
    pub table_rows: u64,
}

pub async fn run_load(config: &Config, dataset: &Path) -> Result<LoadReport> {
    let records = read_dataset(dataset).map_err(LoadError::from)?;
    let batch_size = config.load.batch_size;

    let report = db::with_pool(config, |pool| async move {
        ensure_schema(&pool).await?;
        let store = MovieStore::new(pool);
        let summary = store.upsert_all(&records, batch_size).await?;
        let table_rows = store.count().await?;
        Ok(LoadReport {
            summary,
            table_rows,
        })
    })
    .await?;

    info!(
        inserted = report.summary.inserted,
        updated = report.summary.updated,
        "load complete"
    );

    println!("load {}", dataset.display());
    println!("  rows read: {}", report.summary.read);
    println!("  inserted: {}", report.summary.inserted);
    println!("  updated: {}", report.summary.updated);
    println!("  table rows: {}", report.table_rows);
    println!("ok");

    Ok(report)
}
