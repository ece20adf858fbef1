//! # IMDb Pipeline
//!
//! Clean scraped IMDb movie exports, load them into SQLite, and render a
//! dashboard of aggregate statistics.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌────────────┐   ┌────────────┐   ┌───────────┐
//! │  raw.csv   │──▶│  Cleaner   │──▶│ clean.csv  │──▶│  Loader   │
//! │ (scraper)  │   │ normalize  │   │ (dataset)  │   │  upsert   │
//! └────────────┘   └────────────┘   └────────────┘   └─────┬─────┘
//!                                                          ▼
//!                                   ┌────────────┐   ┌───────────┐
//!                                   │ Dashboard  │◀──│  SQLite   │
//!                                   │ text/json  │   │  movies   │
//!                                   └────────────┘   └───────────┘
//! ```
//!
//! Field parsing, cleaning, deduplication and view shapes live in the
//! `imdb-pipeline-core` crate, which has no I/O. This crate adds files,
//! the database, and the CLI.
//!
//! ## Quick Start
//!
//! ```bash
//! imdbp init
//! imdbp clean data/raw.csv data/clean.csv --report data/rejects.json
//! imdbp load data/clean.csv
//! imdbp dashboard --top 20 --scatter
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Stage-level error types |
//! | [`raw`] | Scraper export reader |
//! | [`dataset`] | Cleaned dataset writer and reader |
//! | [`clean_cmd`] | `imdbp clean` |
//! | [`db`] | Database connection |
//! | [`migrate`] | `movies` table schema |
//! | [`store`] | Queries against `movies` |
//! | [`load`] | `imdbp load` |
//! | [`dashboard`] | `imdbp dashboard` |
//! | [`pipeline`] | `imdbp run` |

pub mod clean_cmd;
pub mod config;
pub mod dashboard;
pub mod dataset;
pub mod db;
pub mod error;
pub mod load;
pub mod migrate;
pub mod pipeline;
pub mod raw;
pub mod store;
