//! Dashboard of aggregate statistics over the `movies` table.
//!
//! The view is computed fresh on every call and never written back. Any
//! failure to open or query the database degrades to an empty placeholder
//! view plus a warning; `imdbp dashboard` on a missing or empty database
//! still exits 0.

use std::path::Path;

use anyhow::Result;
use tracing::{info, warn};

use imdb_pipeline_core::scatter;
use imdb_pipeline_core::view::{self, AggregateView, ScatterPoint};

use crate::config::{Config, DashboardConfig};
use crate::dataset::write_atomic;
use crate::db;
use crate::error::RenderError;
use crate::store::MovieStore;

/// Output format for `imdbp dashboard`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Format {
    #[default]
    Text,
    Json,
}

/// Compute the aggregate view from an open store.
pub async fn build_view(
    store: &MovieStore,
    opts: &DashboardConfig,
) -> Result<AggregateView, RenderError> {
    let filter = opts.filter();
    let summary = store.summary(&filter).await?;
    if summary.movie_count == 0 {
        return Ok(AggregateView::empty_filtered(filter));
    }

    let records = store.fetch_matching(&filter).await?;
    let buckets = store.rating_bucket_counts(opts.bucket_width, &filter).await?;
    let top_by_votes = store.top_by_votes(opts.top_n, &filter).await?;

    let scatter = opts.scatter.then(|| {
        records
            .iter()
            .map(|r| ScatterPoint {
                rating: r.rating,
                votes: r.votes,
            })
            .collect()
    });

    Ok(AggregateView {
        summary,
        genre_counts: view::genre_counts(&records),
        rating_histogram: view::histogram_from_counts(&buckets, opts.bucket_width),
        top_by_votes,
        rating_categories: view::tally(
            records.iter().map(|r| r.rating),
            view::RATING_CATEGORIES,
            view::rating_category,
        ),
        duration_categories: view::tally(
            records.iter().map(|r| r.runtime_minutes),
            view::DURATION_CATEGORIES,
            view::duration_category,
        ),
        genre_leaders: view::genre_leaders(&records),
        genre_stats: view::genre_stats(&records),
        duration_extremes: view::duration_extremes(&records, view::DURATION_EXTREMES_N),
        filter,
        scatter,
    })
}

async fn fetch_view(config: &Config) -> Result<AggregateView, RenderError> {
    let pool = db::connect_existing(config)
        .await
        .map_err(|e| RenderError::Connect(format!("{:#}", e)))?;
    let store = MovieStore::new(pool.clone());
    let result = build_view(&store, &config.dashboard).await;
    pool.close().await;
    result
}

/// Compute the view, falling back to the empty placeholder on any error.
pub async fn load_view(config: &Config) -> AggregateView {
    match fetch_view(config).await {
        Ok(view) => {
            if view.is_empty() && view.filter.is_empty() {
                warn!("movies table is empty");
            } else if view.is_empty() {
                warn!("No movies match the dashboard filters ({})", view.filter);
            }
            view
        }
        Err(e) => {
            warn!("Rendering empty dashboard: {}", e);
            AggregateView::empty()
        }
    }
}

/// Run the dashboard command: compute the view and print it or write it to `output`.
pub async fn run_dashboard(config: &Config, format: Format, output: Option<&Path>) -> Result<()> {
    let view = load_view(config).await;

    let rendered = match format {
        Format::Text => render_text(&view, &config.dashboard),
        Format::Json => {
            let mut json = serde_json::to_string_pretty(&view)?;
            json.push('\n');
            json
        }
    };

    match output {
        Some(path) => {
            write_atomic(path, rendered.as_bytes())?;
            info!("Dashboard written to {}", path.display());
        }
        None => print!("{}", rendered),
    }
    Ok(())
}

const BAR_WIDTH: usize = 30;

fn bar(count: u64, max: u64) -> String {
    if max == 0 {
        return String::new();
    }
    let len = ((count as f64 / max as f64) * BAR_WIDTH as f64).round() as usize;
    "#".repeat(len.max(usize::from(count > 0)))
}

fn fmt_avg(v: Option<f64>, decimals: usize) -> String {
    match v {
        Some(v) => format!("{:.*}", decimals, v),
        None => "-".to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

/// Render the view as plain text.
pub fn render_text(view: &AggregateView, opts: &DashboardConfig) -> String {
    let mut out: Vec<String> = Vec::new();
    out.push("IMDb Dashboard".to_string());
    out.push("==============".to_string());
    out.push(String::new());

    if !view.filter.is_empty() {
        out.push(format!("  Filters:      {}", view.filter));
    }

    if view.is_empty() {
        if view.filter.is_empty() {
            out.push("  No movies loaded. Run `imdbp load <clean.csv>` first.".to_string());
        } else {
            out.push("  No movies match the filters.".to_string());
        }
        out.push(String::new());
        return out.join("\n");
    }

    let s = &view.summary;
    out.push(format!("  Movies:       {}", s.movie_count));
    out.push(format!("  Avg rating:   {}", fmt_avg(s.average_rating, 2)));
    out.push(format!("  Total votes:  {}", s.total_votes));
    out.push(format!(
        "  Avg runtime:  {} min",
        fmt_avg(s.average_runtime_minutes, 0)
    ));

    if !view.genre_counts.is_empty() {
        out.push(String::new());
        out.push("  By genre:".to_string());
        out.push(format!("  {:<20} {:>6}", "GENRE", "MOVIES"));
        out.push(format!("  {}", "-".repeat(27)));
        for g in &view.genre_counts {
            out.push(format!("  {:<20} {:>6}", truncate(&g.genre, 20), g.count));
        }
    }

    out.push(String::new());
    out.push(format!("  Rating distribution (width {}):", opts.bucket_width));
    let max = view.rating_histogram.iter().map(|b| b.count).max().unwrap_or(0);
    for b in &view.rating_histogram {
        out.push(
            format!(
                "  {:>5.2}-{:<5.2} {:>6} {}",
                b.lower,
                b.upper,
                b.count,
                bar(b.count, max)
            )
            .trim_end()
            .to_string(),
        );
    }

    out.push(String::new());
    out.push(format!("  Top {} by votes:", opts.top_n));
    out.push(format!(
        "  {:>3}  {:<36} {:>4} {:>6} {:>10}",
        "#", "TITLE", "YEAR", "RATING", "VOTES"
    ));
    out.push(format!("  {}", "-".repeat(64)));
    for (i, m) in view.top_by_votes.iter().enumerate() {
        out.push(format!(
            "  {:>3}  {:<36} {:>4} {:>6.1} {:>10}",
            i + 1,
            truncate(&m.title, 36),
            m.year,
            m.rating,
            m.votes
        ));
    }

    for (heading, counts) in [
        ("Rating categories:", &view.rating_categories),
        ("Duration categories:", &view.duration_categories),
    ] {
        out.push(String::new());
        out.push(format!("  {}", heading));
        for c in counts {
            out.push(format!("  {:<22} {:>6}", c.label, c.count));
        }
    }

    if !view.genre_leaders.is_empty() {
        out.push(String::new());
        out.push("  Best rated per genre:".to_string());
        for l in &view.genre_leaders {
            out.push(format!(
                "  {:<14} {:>4.1}  {} ({})",
                truncate(&l.genre, 14),
                l.rating,
                l.title,
                l.year
            ));
        }
    }

    if !view.genre_stats.is_empty() {
        out.push(String::new());
        out.push("  Genre averages:".to_string());
        out.push(format!(
            "  {:<14} {:>6} {:>8} {:>12} {:>12}",
            "GENRE", "MOVIES", "RUNTIME", "AVG VOTES", "TOTAL VOTES"
        ));
        out.push(format!("  {}", "-".repeat(56)));
        for g in &view.genre_stats {
            out.push(format!(
                "  {:<14} {:>6} {:>8} {:>12.0} {:>12}",
                truncate(&g.genre, 14),
                g.movie_count,
                fmt_avg(g.average_runtime_minutes, 0),
                g.average_votes,
                g.total_votes
            ));
        }
    }

    for (heading, entries) in [
        ("Shortest movies:", &view.duration_extremes.shortest),
        ("Longest movies:", &view.duration_extremes.longest),
    ] {
        if entries.is_empty() {
            continue;
        }
        out.push(String::new());
        out.push(format!("  {}", heading));
        for e in entries {
            out.push(
                format!(
                    "  {:>4} min  {:<36} {:>4} {:>4.1}  {}",
                    e.runtime_minutes,
                    truncate(&e.title, 36),
                    e.year,
                    e.rating,
                    e.primary_genre.as_deref().unwrap_or("")
                )
                .trim_end()
                .to_string(),
            );
        }
    }

    if let Some(points) = &view.scatter {
        out.push(String::new());
        out.push("  Rating vs votes:".to_string());
        for line in scatter::render(points, scatter::DEFAULT_WIDTH, scatter::DEFAULT_HEIGHT) {
            out.push(format!("  {}", line));
        }
    }

    out.push(String::new());
    out.join("\n")
}
