//! # IMDb Pipeline CLI (`imdbp`)
//!
//! ## Usage
//!
//! ```bash
//! imdbp --config ./config/imdbp.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `imdbp init` | Create the SQLite database and the `movies` table |
//! | `imdbp clean <raw> <clean>` | Normalize a scraper export into a dataset file |
//! | `imdbp load <clean>` | Upsert a dataset file into the database |
//! | `imdbp dashboard` | Render aggregate statistics |
//! | `imdbp run <raw> <clean>` | Clean, load, and render in one go |
//!
//! Logs go to stderr (`RUST_LOG` controls the level); command output goes
//! to stdout.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use imdb_pipeline::config::{self, Config};
use imdb_pipeline::dashboard::{self, Format};
use imdb_pipeline::{clean_cmd, load, migrate, pipeline};
use imdb_pipeline_core::clean::DedupPolicy;
use imdb_pipeline_core::view::DurationBand;

const DEFAULT_CONFIG: &str = "./config/imdbp.toml";

/// IMDb pipeline: clean scraped movie exports, load them into SQLite, and
/// render a statistics dashboard.
#[derive(Parser)]
#[command(name = "imdbp", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/imdbp.toml`. When that file does not exist the
    /// built-in defaults are used; an explicitly given file must exist.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database connection string, overriding `[db].url`.
    #[arg(long, global = true)]
    db: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and the `movies` table. Idempotent.
    Init,

    /// Clean a raw scraper export into a dataset file.
    ///
    /// Malformed and duplicate rows are excluded and reported; the rest
    /// are written to the output file.
    Clean {
        /// Raw CSV export from the scraper.
        raw: PathBuf,

        /// Where to write the cleaned dataset.
        output: PathBuf,

        /// Write the rejection report as JSON to this path.
        #[arg(long)]
        report: Option<PathBuf>,

        /// Which duplicate survives: `first` or `most-complete`.
        #[arg(long)]
        dedup: Option<DedupPolicy>,

        /// Infer genres from title keywords when the genre list is blank.
        #[arg(long)]
        infer_genres: bool,
    },

    /// Upsert a cleaned dataset into the database.
    ///
    /// All rows are written in one transaction; any bad row aborts the
    /// load and leaves the table unchanged.
    Load {
        /// Cleaned dataset produced by `imdbp clean`.
        dataset: PathBuf,

        /// Log progress every N rows.
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Render aggregate statistics over the loaded movies.
    Dashboard {
        /// Number of movies in the top-by-votes table.
        #[arg(long)]
        top: Option<usize>,

        /// Rating histogram bucket width.
        #[arg(long)]
        bucket_width: Option<f64>,

        /// Include the rating-vs-votes scatter plot.
        #[arg(long)]
        scatter: bool,

        /// Only movies rated at least this.
        #[arg(long)]
        min_rating: Option<f64>,

        /// Only movies with at least this many votes.
        #[arg(long)]
        min_votes: Option<u64>,

        /// Only movies tagged with this genre (case-insensitive).
        #[arg(long)]
        genre: Option<String>,

        /// Only movies in this runtime band: short, medium, long, very-long.
        #[arg(long)]
        duration: Option<DurationBand>,

        /// Output format.
        #[arg(long, value_enum, default_value = "text")]
        format: Format,

        /// Write the dashboard to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Clean, load, and render the dashboard.
    Run {
        /// Raw CSV export from the scraper.
        raw: PathBuf,

        /// Where to write the cleaned dataset.
        output: PathBuf,
    },
}

fn resolve_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) => config::load_config(p),
        None => {
            let default = Path::new(DEFAULT_CONFIG);
            if default.exists() {
                config::load_config(default)
            } else {
                tracing::debug!("no config at {}, using defaults", DEFAULT_CONFIG);
                Ok(Config::minimal())
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut cfg = resolve_config(cli.config.as_deref())?;
    if let Some(url) = cli.db {
        cfg.db.url = url;
    }

    match cli.command {
        Commands::Init => {
            cfg.validate()?;
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Clean {
            raw,
            output,
            report,
            dedup,
            infer_genres,
        } => {
            if let Some(policy) = dedup {
                cfg.clean.dedup = policy;
            }
            cfg.clean.infer_genres |= infer_genres;
            cfg.validate()?;
            clean_cmd::run_clean(&cfg.clean.options(), &raw, &output, report.as_deref())?;
        }
        Commands::Load {
            dataset,
            batch_size,
        } => {
            if let Some(n) = batch_size {
                cfg.load.batch_size = n;
            }
            cfg.validate()?;
            load::run_load(&cfg, &dataset).await?;
        }
        Commands::Dashboard {
            top,
            bucket_width,
            scatter,
            min_rating,
            min_votes,
            genre,
            duration,
            format,
            output,
        } => {
            if let Some(n) = top {
                cfg.dashboard.top_n = n;
            }
            if let Some(w) = bucket_width {
                cfg.dashboard.bucket_width = w;
            }
            cfg.dashboard.scatter |= scatter;
            if min_rating.is_some() {
                cfg.dashboard.min_rating = min_rating;
            }
            if min_votes.is_some() {
                cfg.dashboard.min_votes = min_votes;
            }
            if genre.is_some() {
                cfg.dashboard.genre = genre;
            }
            if duration.is_some() {
                cfg.dashboard.duration = duration;
            }
            cfg.validate()?;
            dashboard::run_dashboard(&cfg, format, output.as_deref()).await?;
        }
        Commands::Run { raw, output } => {
            cfg.validate()?;
            pipeline::run_pipeline(&cfg, &raw, &output, Format::Text).await?;
        }
    }

    Ok(())
}
