//! TOML configuration.
//!
//! Every section is optional. A missing file at the default location means
//! "use the defaults"; a file that exists but fails to parse or validate is
//! an error.
//!
//! ```toml
//! [db]
//! url = "sqlite:data/imdb.sqlite"
//!
//! [clean]
//! min_year = 1870
//! dedup = "first"        # or "most-complete"
//! infer_genres = false
//!
//! [load]
//! batch_size = 500
//!
//! [dashboard]
//! top_n = 10
//! bucket_width = 0.5
//! scatter = false
//! # Optional filters; unset means no restriction.
//! min_rating = 7.0
//! min_votes = 10000
//! genre = "Drama"
//! duration = "medium"    # short, medium, long, very-long
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use imdb_pipeline_core::clean::{CleanOptions, DedupPolicy};
use imdb_pipeline_core::normalize::{NormalizeOptions, YearBounds, DEFAULT_MIN_YEAR};
use imdb_pipeline_core::view::{DurationBand, MovieFilter, DEFAULT_BUCKET_WIDTH, DEFAULT_TOP_N};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub clean: CleanConfig,
    #[serde(default)]
    pub load: LoadConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    /// SQLite connection string (`sqlite:path`, `sqlite://path`) or a bare path.
    #[serde(default = "default_db_url")]
    pub url: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: default_db_url(),
        }
    }
}

fn default_db_url() -> String {
    "sqlite:data/imdb.sqlite".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CleanConfig {
    #[serde(default)]
    pub min_year: Option<u16>,
    #[serde(default)]
    pub max_year: Option<u16>,
    #[serde(default)]
    pub dedup: DedupPolicy,
    #[serde(default)]
    pub infer_genres: bool,
}

impl CleanConfig {
    pub fn year_bounds(&self) -> YearBounds {
        let current = YearBounds::for_current_year();
        YearBounds {
            min: self.min_year.unwrap_or(DEFAULT_MIN_YEAR),
            max: self.max_year.unwrap_or(current.max),
        }
    }

    pub fn options(&self) -> CleanOptions {
        CleanOptions {
            normalize: NormalizeOptions {
                year_bounds: self.year_bounds(),
            },
            dedup: self.dedup,
            infer_genres: self.infer_genres,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoadConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

fn default_batch_size() -> usize {
    500
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_bucket_width")]
    pub bucket_width: f64,
    #[serde(default)]
    pub scatter: bool,
    #[serde(default)]
    pub min_rating: Option<f64>,
    #[serde(default)]
    pub min_votes: Option<u64>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub duration: Option<DurationBand>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            bucket_width: default_bucket_width(),
            scatter: false,
            min_rating: None,
            min_votes: None,
            genre: None,
            duration: None,
        }
    }
}

impl DashboardConfig {
    /// The movie filter the dashboard aggregates under. A blank genre is no filter.
    pub fn filter(&self) -> MovieFilter {
        MovieFilter {
            min_rating: self.min_rating,
            min_votes: self.min_votes,
            genre: self
                .genre
                .as_deref()
                .map(str::trim)
                .filter(|g| !g.is_empty())
                .map(str::to_string),
            duration: self.duration,
        }
    }
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}
fn default_bucket_width() -> f64 {
    DEFAULT_BUCKET_WIDTH
}

impl Config {
    /// Built-in defaults, used when no config file is present.
    pub fn minimal() -> Self {
        Self::default()
    }

    /// Check value ranges. Also used after CLI overrides are applied.
    pub fn validate(&self) -> Result<()> {
        if self.db.url.trim().is_empty() {
            anyhow::bail!("db.url must not be empty");
        }
        if self.load.batch_size == 0 {
            anyhow::bail!("load.batch_size must be >= 1");
        }
        if self.dashboard.top_n == 0 {
            anyhow::bail!("dashboard.top_n must be >= 1");
        }
        let w = self.dashboard.bucket_width;
        if !(w > 0.0 && w <= 10.0) {
            anyhow::bail!("dashboard.bucket_width must be in (0, 10]");
        }
        if let Some(r) = self.dashboard.min_rating {
            if !(0.0..=10.0).contains(&r) {
                anyhow::bail!("dashboard.min_rating must be in [0, 10]");
            }
        }
        let bounds = self.clean.year_bounds();
        if bounds.min > bounds.max {
            anyhow::bail!(
                "clean.min_year ({}) must not exceed clean.max_year ({})",
                bounds.min,
                bounds.max
            );
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, content: &str) -> std::path::PathBuf {
        let path = dir.path().join("imdbp.toml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = load_config(&write(&dir, "")).unwrap();
        assert_eq!(cfg.db.url, "sqlite:data/imdb.sqlite");
        assert_eq!(cfg.load.batch_size, 500);
        assert_eq!(cfg.dashboard.top_n, 10);
        assert_eq!(cfg.dashboard.bucket_width, 0.5);
        assert_eq!(cfg.clean.dedup, DedupPolicy::FirstWins);
        assert_eq!(cfg.clean.year_bounds().min, 1870);
    }

    #[test]
    fn test_full_file() {
        let dir = TempDir::new().unwrap();
        let cfg = load_config(&write(
            &dir,
            r#"
[db]
url = "sqlite:/tmp/movies.sqlite"

[clean]
min_year = 1900
max_year = 2030
dedup = "most-complete"
infer_genres = true

[load]
batch_size = 50

[dashboard]
top_n = 5
bucket_width = 1.0
scatter = true
"#,
        ))
        .unwrap();
        assert_eq!(cfg.db.url, "sqlite:/tmp/movies.sqlite");
        let opts = cfg.clean.options();
        assert_eq!(opts.dedup, DedupPolicy::MostComplete);
        assert!(opts.infer_genres);
        assert_eq!(opts.normalize.year_bounds, YearBounds { min: 1900, max: 2030 });
        assert_eq!(cfg.load.batch_size, 50);
        assert_eq!(cfg.dashboard.top_n, 5);
        assert!(cfg.dashboard.scatter);
    }

    #[test]
    fn test_rejects_invalid_values() {
        let dir = TempDir::new().unwrap();
        assert!(load_config(&write(&dir, "[dashboard]\ntop_n = 0\n")).is_err());
        assert!(load_config(&write(&dir, "[dashboard]\nbucket_width = 0.0\n")).is_err());
        assert!(load_config(&write(&dir, "[dashboard]\nmin_rating = 10.5\n")).is_err());
        assert!(load_config(&write(&dir, "[dashboard]\nduration = \"epic\"\n")).is_err());
        assert!(load_config(&write(&dir, "[load]\nbatch_size = 0\n")).is_err());
        assert!(load_config(&write(&dir, "[clean]\nmin_year = 2000\nmax_year = 1990\n")).is_err());
        assert!(load_config(&write(&dir, "[clean]\ndedup = \"last\"\n")).is_err());
    }

    #[test]
    fn test_dashboard_filters() {
        let dir = TempDir::new().unwrap();
        let cfg = load_config(&write(
            &dir,
            "[dashboard]\nmin_rating = 7.5\nmin_votes = 1000\ngenre = \" Drama \"\nduration = \"very-long\"\n",
        ))
        .unwrap();
        let filter = cfg.dashboard.filter();
        assert_eq!(filter.min_rating, Some(7.5));
        assert_eq!(filter.min_votes, Some(1000));
        assert_eq!(filter.genre.as_deref(), Some("Drama"));
        assert_eq!(filter.duration, Some(DurationBand::VeryLong));

        let blank = load_config(&write(&dir, "[dashboard]\ngenre = \"  \"\n")).unwrap();
        assert!(blank.dashboard.filter().is_empty());
        assert!(Config::minimal().dashboard.filter().is_empty());
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(load_config(&dir.path().join("nope.toml")).is_err());
    }
}
