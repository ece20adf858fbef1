//! SQLite database connection management.
//!
//! The connection string comes from `[db].url` (or `--db` on the command
//! line). Both `sqlite:` URLs and bare file paths are accepted; the database
//! file and its parent directories are created if they don't exist.
//!
//! The pool is the only resource in the pipeline that needs scoped
//! acquisition. [`with_pool`] opens it, hands it to the caller, and closes
//! it on every exit path, including errors.

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::future::Future;
use std::path::PathBuf;
use std::str::FromStr;

use crate::config::Config;

/// Turn a configured connection string into a sqlx SQLite URL.
pub fn sqlite_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.starts_with("sqlite:") {
        raw.to_string()
    } else {
        format!("sqlite:{}", raw)
    }
}

/// File path behind a SQLite URL, if it names a file.
fn file_path(url: &str) -> Option<PathBuf> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or("");
    if path.is_empty() || path.starts_with(":memory:") {
        return None;
    }
    Some(PathBuf::from(path))
}

/// Create a connection pool to the configured SQLite database.
pub async fn connect(config: &Config) -> Result<SqlitePool> {
    let url = sqlite_url(&config.db.url);

    if let Some(path) = file_path(&url) {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }

    let options = SqliteConnectOptions::from_str(&url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    tracing::debug!(url = %url, "connected to database");
    Ok(pool)
}

/// Open a pool on a database that must already exist. Nothing is created.
pub async fn connect_existing(config: &Config) -> Result<SqlitePool> {
    let url = sqlite_url(&config.db.url);
    let options = SqliteConnectOptions::from_str(&url)?.create_if_missing(false);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    tracing::debug!(url = %url, "opened existing database");
    Ok(pool)
}

/// Run `f` with a freshly opened pool and close the pool afterwards,
/// whether `f` succeeded or not.
pub async fn with_pool<F, Fut, T>(config: &Config, f: F) -> Result<T>
where
    F: FnOnce(SqlitePool) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let pool = connect(config).await?;
    let result = f(pool.clone()).await;
    pool.close().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_url() {
        assert_eq!(sqlite_url("data/imdb.sqlite"), "sqlite:data/imdb.sqlite");
        assert_eq!(sqlite_url("sqlite:data/imdb.sqlite"), "sqlite:data/imdb.sqlite");
        assert_eq!(sqlite_url("sqlite::memory:"), "sqlite::memory:");
    }

    #[test]
    fn test_file_path() {
        assert_eq!(
            file_path("sqlite:data/imdb.sqlite"),
            Some(PathBuf::from("data/imdb.sqlite"))
        );
        assert_eq!(
            file_path("sqlite:///tmp/x.db?mode=rwc"),
            Some(PathBuf::from("/tmp/x.db"))
        );
        assert_eq!(file_path("sqlite::memory:"), None);
    }

    #[tokio::test]
    async fn test_connect_existing_does_not_create() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("missing.sqlite");
        let mut config = Config::minimal();
        config.db.url = format!("sqlite:{}", path.display());

        assert!(connect_existing(&config).await.is_err());
        assert!(!path.exists());

        let pool = connect(&config).await.unwrap();
        pool.close().await;
        assert!(path.exists());
        let pool = connect_existing(&config).await.unwrap();
        pool.close().await;
    }
}
