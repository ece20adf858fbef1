use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Create the database file and the `movies` table. Idempotent.
pub async fn run_migrations(config: &Config) -> Result<()> {
    db::with_pool(config, |pool| async move { ensure_schema(&pool).await }).await
}

/// Create the `movies` table and its indexes if they are missing.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS movies (
            movie_id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            year INTEGER NOT NULL,
            rating REAL NOT NULL CHECK (rating >= 0 AND rating <= 10),
            votes INTEGER NOT NULL CHECK (votes >= 0),
            runtime_minutes INTEGER NOT NULL CHECK (runtime_minutes >= 0),
            genres TEXT NOT NULL DEFAULT '',
            loaded_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_movies_votes ON movies(votes DESC)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_movies_rating ON movies(rating DESC)")
        .execute(pool)
        .await?;

    Ok(())
}
