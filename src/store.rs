//! Queries against the `movies` table.
//!
//! [`MovieStore`] wraps a pool handed to it by the caller; it never opens or
//! closes connections itself. Writes happen only in [`MovieStore::upsert_all`],
//! which runs the whole batch inside one transaction.

use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::{debug, info};

use imdb_pipeline_core::models::{split_genres, CleanRecord};
use imdb_pipeline_core::view::{MovieFilter, MovieSummary, Summary};

use crate::error::LoadError;

/// Row counts from one load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub read: usize,
    pub inserted: usize,
    pub updated: usize,
}

pub struct MovieStore {
    pool: SqlitePool,
}

fn decode_err(e: std::num::TryFromIntError) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(e))
}

/// Append a `WHERE` clause for `filter`. Genres are stored `|`-joined, so a
/// genre matches when `|genre|` occurs in `|genres|`.
fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &MovieFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(min) = filter.min_rating {
        qb.push(" AND rating >= ").push_bind(min);
    }
    if let Some(min) = filter.min_votes {
        qb.push(" AND votes >= ")
            .push_bind(i64::try_from(min).unwrap_or(i64::MAX));
    }
    if let Some(genre) = &filter.genre {
        qb.push(" AND instr('|' || lower(genres) || '|', '|' || lower(")
            .push_bind(genre.clone())
            .push(") || '|') > 0");
    }
    if let Some(band) = filter.duration {
        let (lower, upper) = band.minutes();
        qb.push(" AND runtime_minutes >= ")
            .push_bind(i64::from(lower));
        if let Some(upper) = upper {
            qb.push(" AND runtime_minutes < ").push_bind(i64::from(upper));
        }
    }
}

impl MovieStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Upsert every record keyed by its movie id, last write wins.
    ///
    /// Either all records are written or none are: the first failing row
    /// aborts and the transaction is rolled back when it is dropped.
    pub async fn upsert_all(
        &self,
        records: &[CleanRecord],
        batch_size: usize,
    ) -> Result<LoadSummary, LoadError> {
        let batch_size = batch_size.max(1);
        let loaded_at = chrono::Utc::now().timestamp();
        let mut summary = LoadSummary {
            read: records.len(),
            ..Default::default()
        };

        let mut tx = self.pool.begin().await.map_err(LoadError::Transaction)?;

        for (i, record) in records.iter().enumerate() {
            let row = i + 1;
            let votes = i64::try_from(record.votes).map_err(|_| LoadError::OutOfRange {
                row,
                title: record.title.clone(),
                year: record.year,
                votes: record.votes,
            })?;
            let row_err = |source: sqlx::Error| LoadError::Row {
                row,
                title: record.title.clone(),
                year: record.year,
                source,
            };
            let movie_id = record.movie_id();

            let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM movies WHERE movie_id = ?")
                .bind(&movie_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(row_err)?;

            sqlx::query(
                r#"
                INSERT INTO movies (movie_id, title, year, rating, votes,
                                    runtime_minutes, genres, loaded_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(movie_id) DO UPDATE SET
                    title = excluded.title,
                    year = excluded.year,
                    rating = excluded.rating,
                    votes = excluded.votes,
                    runtime_minutes = excluded.runtime_minutes,
                    genres = excluded.genres,
                    loaded_at = excluded.loaded_at
                "#,
            )
            .bind(&movie_id)
            .bind(&record.title)
            .bind(i64::from(record.year))
            .bind(record.rating)
            .bind(votes)
            .bind(i64::from(record.runtime_minutes))
            .bind(record.genres_joined())
            .bind(loaded_at)
            .execute(&mut *tx)
            .await
            .map_err(row_err)?;

            if exists.is_some() {
                summary.updated += 1;
            } else {
                summary.inserted += 1;
            }

            if row % batch_size == 0 {
                info!("Loaded {}/{} rows", row, records.len());
            }
        }

        tx.commit().await.map_err(LoadError::Transaction)?;
        debug!(?summary, "load committed");
        Ok(summary)
    }

    pub async fn count(&self) -> Result<u64, sqlx::Error> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM movies")
            .fetch_one(&self.pool)
            .await?;
        u64::try_from(n).map_err(decode_err)
    }

    /// Every stored movie, in insertion order.
    pub async fn fetch_all(&self) -> Result<Vec<CleanRecord>, sqlx::Error> {
        self.fetch_matching(&MovieFilter::default()).await
    }

    /// Stored movies passing `filter`, in insertion order.
    pub async fn fetch_matching(&self, filter: &MovieFilter) -> Result<Vec<CleanRecord>, sqlx::Error> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT title, year, rating, votes, runtime_minutes, genres FROM movies",
        );
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY rowid");
        let rows = qb.build().fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| {
                let genres: String = row.try_get("genres")?;
                Ok(CleanRecord {
                    title: row.try_get("title")?,
                    year: u16::try_from(row.try_get::<i64, _>("year")?).map_err(decode_err)?,
                    rating: row.try_get("rating")?,
                    votes: u64::try_from(row.try_get::<i64, _>("votes")?).map_err(decode_err)?,
                    runtime_minutes: u32::try_from(row.try_get::<i64, _>("runtime_minutes")?)
                        .map_err(decode_err)?,
                    genres: split_genres(&genres),
                })
            })
            .collect()
    }

    pub async fn summary(&self, filter: &MovieFilter) -> Result<Summary, sqlx::Error> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT
                COUNT(*) AS movie_count,
                AVG(rating) AS average_rating,
                COALESCE(SUM(votes), 0) AS total_votes,
                AVG(runtime_minutes) AS average_runtime
            FROM movies"#,
        );
        push_filter(&mut qb, filter);
        let row = qb.build().fetch_one(&self.pool).await?;

        Ok(Summary {
            movie_count: u64::try_from(row.try_get::<i64, _>("movie_count")?).map_err(decode_err)?,
            average_rating: row.try_get("average_rating")?,
            total_votes: u64::try_from(row.try_get::<i64, _>("total_votes")?).map_err(decode_err)?,
            average_runtime_minutes: row.try_get("average_runtime")?,
        })
    }

    /// `(bucket index, count)` pairs for a rating histogram of the given width.
    pub async fn rating_bucket_counts(
        &self,
        width: f64,
        filter: &MovieFilter,
    ) -> Result<Vec<(usize, u64)>, sqlx::Error> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT CAST(rating / ");
        qb.push_bind(width)
            .push(" + 1e-9 AS INTEGER) AS bucket, COUNT(*) AS n FROM movies");
        push_filter(&mut qb, filter);
        qb.push(" GROUP BY bucket ORDER BY bucket");
        let rows = qb.build().fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| {
                let bucket = usize::try_from(row.try_get::<i64, _>("bucket")?).map_err(decode_err)?;
                let n = u64::try_from(row.try_get::<i64, _>("n")?).map_err(decode_err)?;
                Ok((bucket, n))
            })
            .collect()
    }

    /// Most-voted movies; ties go to the higher rating, then title.
    pub async fn top_by_votes(
        &self,
        n: usize,
        filter: &MovieFilter,
    ) -> Result<Vec<MovieSummary>, sqlx::Error> {
        let limit = i64::try_from(n).unwrap_or(i64::MAX);
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT title, year, rating, votes FROM movies");
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY votes DESC, rating DESC, title ASC LIMIT ")
            .push_bind(limit);
        let rows = qb.build().fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| {
                Ok(MovieSummary {
                    title: row.try_get("title")?,
                    year: u16::try_from(row.try_get::<i64, _>("year")?).map_err(decode_err)?,
                    rating: row.try_get("rating")?,
                    votes: u64::try_from(row.try_get::<i64, _>("votes")?).map_err(decode_err)?,
                })
            })
            .collect()
    }
}
