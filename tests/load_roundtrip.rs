use std::collections::BTreeSet;

use tempfile::TempDir;

use imdb_pipeline::config::Config;
use imdb_pipeline::dashboard::build_view;
use imdb_pipeline::dataset::{read_dataset, write_dataset};
use imdb_pipeline::db;
use imdb_pipeline::error::LoadError;
use imdb_pipeline::migrate::ensure_schema;
use imdb_pipeline::store::MovieStore;
use imdb_pipeline_core::models::CleanRecord;
use imdb_pipeline_core::view::{DurationBand, MovieFilter};

fn test_config(tmp: &TempDir) -> Config {
    let mut cfg = Config::minimal();
    cfg.db.url = format!("sqlite:{}", tmp.path().join("imdb.sqlite").display());
    cfg
}

fn movie(title: &str, year: u16, rating: f64, votes: u64, runtime: u32, genres: &[&str]) -> CleanRecord {
    CleanRecord {
        title: title.to_string(),
        year,
        rating,
        votes,
        runtime_minutes: runtime,
        genres: genres.iter().map(|g| g.to_string()).collect::<BTreeSet<_>>(),
    }
}

fn sample() -> Vec<CleanRecord> {
    vec![
        movie("Parasite", 2019, 8.5, 1_000_000, 132, &["Drama", "Thriller"]),
        movie("Amélie", 2001, 8.3, 800_000, 122, &["Comedy", "Romance"]),
        movie("Coco", 2017, 8.4, 600_000, 105, &["Animation"]),
        movie("Untitled, \"Unknown\"", 1999, 0.0, 0, 0, &[]),
    ]
}

async fn open_store(cfg: &Config) -> MovieStore {
    let pool = db::connect(cfg).await.unwrap();
    ensure_schema(&pool).await.unwrap();
    MovieStore::new(pool)
}

#[tokio::test]
async fn test_export_load_query_preserves_records() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);
    let path = tmp.path().join("clean.csv");

    let records = sample();
    write_dataset(&path, &records).unwrap();
    let from_disk = read_dataset(&path).unwrap();

    let store = open_store(&cfg).await;
    let summary = store.upsert_all(&from_disk, 2).await.unwrap();
    assert_eq!(summary.read, 4);
    assert_eq!(summary.inserted, 4);
    assert_eq!(summary.updated, 0);

    let loaded = store.fetch_all().await.unwrap();
    assert_eq!(loaded, records);
    store.pool().close().await;
}

#[tokio::test]
async fn test_double_load_does_not_duplicate() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);
    let store = open_store(&cfg).await;

    store.upsert_all(&sample(), 500).await.unwrap();
    let second = store.upsert_all(&sample(), 500).await.unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(second.updated, 4);
    assert_eq!(store.count().await.unwrap(), 4);
    store.pool().close().await;
}

#[tokio::test]
async fn test_reload_updates_in_place() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);
    let store = open_store(&cfg).await;

    store.upsert_all(&sample(), 500).await.unwrap();
    let newer = vec![movie("parasite", 2019, 8.6, 1_100_000, 132, &["Drama"])];
    store.upsert_all(&newer, 500).await.unwrap();

    let loaded = store.fetch_all().await.unwrap();
    assert_eq!(loaded.len(), 4);
    assert_eq!(loaded[0].title, "parasite");
    assert_eq!(loaded[0].votes, 1_100_000);
    store.pool().close().await;
}

#[tokio::test]
async fn test_constraint_violation_rolls_back_whole_load() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);
    let store = open_store(&cfg).await;

    store.upsert_all(&sample()[..2], 500).await.unwrap();
    let before = store.fetch_all().await.unwrap();

    let mut batch = sample();
    batch.push(movie("Out Of Range", 2020, 11.0, 10, 90, &[]));
    let err = store.upsert_all(&batch, 500).await.unwrap_err();
    match err {
        LoadError::Row { row, ref title, .. } => {
            assert_eq!(row, 5);
            assert_eq!(title, "Out Of Range");
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(store.fetch_all().await.unwrap(), before);
    store.pool().close().await;
}

#[tokio::test]
async fn test_votes_beyond_column_range_rejected() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);
    let store = open_store(&cfg).await;

    let batch = vec![
        movie("Fine", 2020, 7.0, 10, 90, &[]),
        movie("Too Many", 2020, 7.0, u64::MAX, 90, &[]),
    ];
    let err = store.upsert_all(&batch, 500).await.unwrap_err();
    assert_eq!(err.row(), Some(2));
    assert!(matches!(err, LoadError::OutOfRange { .. }));
    assert_eq!(store.count().await.unwrap(), 0);
    store.pool().close().await;
}

#[tokio::test]
async fn test_view_over_loaded_table() {
    let tmp = TempDir::new().unwrap();
    let mut cfg = test_config(&tmp);
    cfg.dashboard.top_n = 2;
    cfg.dashboard.scatter = true;
    let store = open_store(&cfg).await;
    store.upsert_all(&sample(), 500).await.unwrap();

    let view = build_view(&store, &cfg.dashboard).await.unwrap();
    assert_eq!(view.summary.movie_count, 4);
    assert_eq!(view.summary.total_votes, 2_400_000);

    let top: Vec<&str> = view.top_by_votes.iter().map(|m| m.title.as_str()).collect();
    assert_eq!(top, vec!["Parasite", "Amélie"]);

    // 0.0 through 8.5 at width 0.5: buckets 0..=17.
    assert_eq!(view.rating_histogram.len(), 18);
    assert_eq!(view.rating_histogram[0].count, 1);
    assert_eq!(view.rating_histogram[16].count, 2);
    assert_eq!(view.rating_histogram[17].count, 1);

    assert_eq!(view.genre_leaders.len(), 5);
    assert_eq!(view.scatter.as_ref().map(Vec::len), Some(4));
    store.pool().close().await;
}

#[tokio::test]
async fn test_view_on_empty_table() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);
    let store = open_store(&cfg).await;

    let view = build_view(&store, &cfg.dashboard).await.unwrap();
    assert!(view.is_empty());
    assert!(view.rating_histogram.is_empty());
    store.pool().close().await;
}

#[tokio::test]
async fn test_filtered_queries_agree_with_filter() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);
    let store = open_store(&cfg).await;
    let records = sample();
    store.upsert_all(&records, 500).await.unwrap();

    let filters = [
        MovieFilter {
            min_rating: Some(8.4),
            ..Default::default()
        },
        MovieFilter {
            min_votes: Some(800_000),
            ..Default::default()
        },
        MovieFilter {
            genre: Some("ROMANCE".to_string()),
            ..Default::default()
        },
        // A genre prefix is not a match.
        MovieFilter {
            genre: Some("Dram".to_string()),
            ..Default::default()
        },
        MovieFilter {
            duration: Some(DurationBand::Medium),
            ..Default::default()
        },
        MovieFilter {
            duration: Some(DurationBand::Short),
            ..Default::default()
        },
    ];

    for filter in &filters {
        let expected: Vec<CleanRecord> = records.iter().filter(|r| filter.matches(r)).cloned().collect();
        assert_eq!(store.fetch_matching(filter).await.unwrap(), expected, "{filter}");
        let summary = store.summary(filter).await.unwrap();
        assert_eq!(summary.movie_count, expected.len() as u64, "{filter}");
        assert_eq!(
            summary.total_votes,
            expected.iter().map(|r| r.votes).sum::<u64>(),
            "{filter}"
        );
        let top = store.top_by_votes(10, filter).await.unwrap();
        assert_eq!(top.len(), expected.len(), "{filter}");
    }
    store.pool().close().await;
}

#[tokio::test]
async fn test_view_under_filter() {
    let tmp = TempDir::new().unwrap();
    let mut cfg = test_config(&tmp);
    cfg.dashboard.min_votes = Some(600_000);
    cfg.dashboard.duration = Some(DurationBand::Medium);
    let store = open_store(&cfg).await;
    store.upsert_all(&sample(), 500).await.unwrap();

    let view = build_view(&store, &cfg.dashboard).await.unwrap();
    assert_eq!(view.summary.movie_count, 3);
    assert_eq!(view.filter.min_votes, Some(600_000));

    let shortest: Vec<&str> = view
        .duration_extremes
        .shortest
        .iter()
        .map(|e| e.title.as_str())
        .collect();
    assert_eq!(shortest, vec!["Coco", "Amélie", "Parasite"]);
    assert_eq!(view.duration_extremes.longest[0].title, "Parasite");
    assert_eq!(view.rating_histogram.iter().map(|b| b.count).sum::<u64>(), 3);

    let genres: Vec<&str> = view.genre_stats.iter().map(|g| g.genre.as_str()).collect();
    assert_eq!(genres, vec!["Animation", "Comedy", "Drama", "Romance", "Thriller"]);

    cfg.dashboard.genre = Some("Western".to_string());
    let none = build_view(&store, &cfg.dashboard).await.unwrap();
    assert!(none.is_empty());
    assert_eq!(none.filter.genre.as_deref(), Some("Western"));
    store.pool().close().await;
}
