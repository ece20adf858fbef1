//! Aggregate views rendered by the dashboard.
//!
//! An [`AggregateView`] is derived on demand from the `movies` table and is
//! never persisted. The storage layer fills it in; this module holds the
//! shapes and the pure bucketing/categorization rules so they can be tested
//! without a database.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::CleanRecord;

/// Default histogram bucket width on the 0–10 rating scale.
pub const DEFAULT_BUCKET_WIDTH: f64 = 0.5;

/// Default number of movies in the top-by-votes table.
pub const DEFAULT_TOP_N: usize = 10;

/// Movies listed at each end of the duration extremes table.
pub const DURATION_EXTREMES_N: usize = 5;

const MAX_RATING: f64 = 10.0;

/// Everything the dashboard shows.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregateView {
    pub summary: Summary,
    pub genre_counts: Vec<GenreCount>,
    pub rating_histogram: Vec<HistogramBucket>,
    pub top_by_votes: Vec<MovieSummary>,
    pub rating_categories: Vec<CategoryCount>,
    pub duration_categories: Vec<CategoryCount>,
    pub genre_leaders: Vec<GenreLeader>,
    pub genre_stats: Vec<GenreStats>,
    pub duration_extremes: DurationExtremes,
    /// Filter the view was computed under; omitted when nothing was filtered.
    #[serde(skip_serializing_if = "MovieFilter::is_empty")]
    pub filter: MovieFilter,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scatter: Option<Vec<ScatterPoint>>,
}

impl AggregateView {
    /// Placeholder shown when the table is empty or cannot be queried.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Empty view that remembers the filter which matched nothing.
    pub fn empty_filtered(filter: MovieFilter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.summary.movie_count == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub movie_count: u64,
    pub average_rating: Option<f64>,
    pub total_votes: u64,
    pub average_runtime_minutes: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenreCount {
    pub genre: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBucket {
    pub lower: f64,
    pub upper: f64,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovieSummary {
    pub title: String,
    pub year: u16,
    pub rating: f64,
    pub votes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub label: String,
    pub count: u64,
}

/// Highest-rated movie within one genre.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenreLeader {
    pub genre: String,
    pub title: String,
    pub year: u16,
    pub rating: f64,
    pub votes: u64,
}

/// Per-genre averages. A movie counts once for each of its genres.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenreStats {
    pub genre: String,
    pub movie_count: u64,
    /// Mean over movies with a known (non-zero) runtime.
    pub average_runtime_minutes: Option<f64>,
    pub average_votes: f64,
    pub total_votes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuntimeEntry {
    pub title: String,
    pub year: u16,
    pub runtime_minutes: u32,
    pub rating: f64,
    pub primary_genre: Option<String>,
}

/// Shortest and longest movies with a known runtime.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DurationExtremes {
    pub shortest: Vec<RuntimeEntry>,
    pub longest: Vec<RuntimeEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub rating: f64,
    pub votes: u64,
}

/// Number of buckets covering `[0, 10]` at the given width.
pub fn bucket_count(width: f64) -> usize {
    ((MAX_RATING / width) - 1e-9).ceil().max(1.0) as usize
}

/// Bucket index for a rating. A rating of exactly 10 lands in the last bucket.
pub fn bucket_index(rating: f64, width: f64) -> usize {
    let raw = (rating / width + 1e-9).floor().max(0.0) as usize;
    raw.min(bucket_count(width) - 1)
}

fn round6(x: f64) -> f64 {
    (x * 1e6).round() / 1e6
}

/// Build histogram buckets from `(bucket index, count)` pairs.
///
/// Indexes beyond the last bucket are folded into it. The result spans the
/// lowest to the highest occupied bucket, including empty buckets between.
pub fn histogram_from_counts(counts: &[(usize, u64)], width: f64) -> Vec<HistogramBucket> {
    let last = bucket_count(width) - 1;
    let mut folded: Vec<(usize, u64)> = counts
        .iter()
        .filter(|(_, c)| *c > 0)
        .map(|(i, c)| ((*i).min(last), *c))
        .collect();
    if folded.is_empty() {
        return Vec::new();
    }
    folded.sort_by_key(|(i, _)| *i);

    let lo = folded[0].0;
    let hi = folded[folded.len() - 1].0;
    (lo..=hi)
        .map(|i| HistogramBucket {
            lower: round6(i as f64 * width),
            upper: round6(((i + 1) as f64 * width).min(MAX_RATING)),
            count: folded.iter().filter(|(j, _)| *j == i).map(|(_, c)| c).sum(),
        })
        .collect()
}

/// Histogram directly from ratings.
pub fn histogram(ratings: &[f64], width: f64) -> Vec<HistogramBucket> {
    let counts: Vec<(usize, u64)> = ratings.iter().map(|r| (bucket_index(*r, width), 1)).collect();
    histogram_from_counts(&counts, width)
}

/// Rating category labels, in display order.
pub const RATING_CATEGORIES: &[&str] = &[
    "Poor (< 6.0)",
    "Average (6.0-7.0)",
    "Good (7.0-8.0)",
    "Excellent (8.0-9.0)",
    "Masterpiece (9.0+)",
];

/// Duration category labels, in display order.
pub const DURATION_CATEGORIES: &[&str] = &[
    "Short (< 1.5h)",
    "Medium (1.5-2.5h)",
    "Long (2.5-3.5h)",
    "Very Long (> 3.5h)",
];

pub fn rating_category(rating: f64) -> &'static str {
    if rating < 6.0 {
        RATING_CATEGORIES[0]
    } else if rating < 7.0 {
        RATING_CATEGORIES[1]
    } else if rating < 8.0 {
        RATING_CATEGORIES[2]
    } else if rating < 9.0 {
        RATING_CATEGORIES[3]
    } else {
        RATING_CATEGORIES[4]
    }
}

pub fn duration_category(minutes: u32) -> &'static str {
    DurationBand::of(minutes).label()
}

/// Runtime band, matching [`DURATION_CATEGORIES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DurationBand {
    Short,
    Medium,
    Long,
    VeryLong,
}

impl DurationBand {
    pub fn of(minutes: u32) -> Self {
        match minutes {
            0..=89 => DurationBand::Short,
            90..=149 => DurationBand::Medium,
            150..=209 => DurationBand::Long,
            _ => DurationBand::VeryLong,
        }
    }

    /// Half-open minute range `[lower, upper)`; the last band is unbounded.
    pub fn minutes(self) -> (u32, Option<u32>) {
        match self {
            DurationBand::Short => (0, Some(90)),
            DurationBand::Medium => (90, Some(150)),
            DurationBand::Long => (150, Some(210)),
            DurationBand::VeryLong => (210, None),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DurationBand::Short => DURATION_CATEGORIES[0],
            DurationBand::Medium => DURATION_CATEGORIES[1],
            DurationBand::Long => DURATION_CATEGORIES[2],
            DurationBand::VeryLong => DURATION_CATEGORIES[3],
        }
    }
}

impl FromStr for DurationBand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "short" => Ok(DurationBand::Short),
            "medium" => Ok(DurationBand::Medium),
            "long" => Ok(DurationBand::Long),
            "very-long" => Ok(DurationBand::VeryLong),
            other => Err(format!(
                "unknown duration '{}': expected 'short', 'medium', 'long' or 'very-long'",
                other
            )),
        }
    }
}

impl fmt::Display for DurationBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DurationBand::Short => "short",
            DurationBand::Medium => "medium",
            DurationBand::Long => "long",
            DurationBand::VeryLong => "very-long",
        })
    }
}

/// Restricts which movies the dashboard aggregates over. Unset fields match
/// everything; set fields must all match.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MovieFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_votes: Option<u64>,
    /// Genre name, compared case-insensitively.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<DurationBand>,
}

impl MovieFilter {
    pub fn is_empty(&self) -> bool {
        self.min_rating.is_none()
            && self.min_votes.is_none()
            && self.genre.is_none()
            && self.duration.is_none()
    }

    pub fn matches(&self, r: &CleanRecord) -> bool {
        self.min_rating.map_or(true, |min| r.rating >= min)
            && self.min_votes.map_or(true, |min| r.votes >= min)
            && self
                .genre
                .as_deref()
                .map_or(true, |g| r.genres.iter().any(|have| have.eq_ignore_ascii_case(g)))
            && self
                .duration
                .map_or(true, |band| DurationBand::of(r.runtime_minutes) == band)
    }
}

impl fmt::Display for MovieFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if let Some(v) = self.min_rating {
            parts.push(format!("rating >= {}", v));
        }
        if let Some(v) = self.min_votes {
            parts.push(format!("votes >= {}", v));
        }
        if let Some(g) = &self.genre {
            parts.push(format!("genre = {}", g));
        }
        if let Some(d) = self.duration {
            parts.push(format!("duration = {}", d.label()));
        }
        if parts.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(&parts.join(", "))
        }
    }
}

/// Count values per category label, keeping `labels` order and dropping
/// empty categories.
pub fn tally<T, F>(values: impl IntoIterator<Item = T>, labels: &[&str], categorize: F) -> Vec<CategoryCount>
where
    F: Fn(T) -> &'static str,
{
    let mut counts = vec![0u64; labels.len()];
    for v in values {
        let label = categorize(v);
        if let Some(i) = labels.iter().position(|l| *l == label) {
            counts[i] += 1;
        }
    }
    labels
        .iter()
        .zip(counts)
        .filter(|(_, c)| *c > 0)
        .map(|(l, c)| CategoryCount {
            label: l.to_string(),
            count: c,
        })
        .collect()
}

/// Movies per genre, by descending count then genre name.
pub fn genre_counts(records: &[CleanRecord]) -> Vec<GenreCount> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for r in records {
        for g in &r.genres {
            *counts.entry(g.as_str()).or_default() += 1;
        }
    }
    let mut out: Vec<GenreCount> = counts
        .into_iter()
        .map(|(genre, count)| GenreCount {
            genre: genre.to_string(),
            count,
        })
        .collect();
    // Stable sort keeps the BTreeMap's name order within equal counts.
    out.sort_by(|a, b| b.count.cmp(&a.count));
    out
}

/// Highest-rated movie per genre, in genre name order. Rating ties go to
/// the movie with more votes, then the earlier title.
pub fn genre_leaders(records: &[CleanRecord]) -> Vec<GenreLeader> {
    let mut best: BTreeMap<&str, &CleanRecord> = BTreeMap::new();
    for r in records {
        for g in &r.genres {
            let replace = match best.get(g.as_str()) {
                None => true,
                Some(cur) => {
                    r.rating > cur.rating
                        || (r.rating == cur.rating
                            && (r.votes > cur.votes
                                || (r.votes == cur.votes && r.title < cur.title)))
                }
            };
            if replace {
                best.insert(g.as_str(), r);
            }
        }
    }
    best.into_iter()
        .map(|(genre, r)| GenreLeader {
            genre: genre.to_string(),
            title: r.title.clone(),
            year: r.year,
            rating: r.rating,
            votes: r.votes,
        })
        .collect()
}

/// Average runtime and votes per genre, in genre name order.
pub fn genre_stats(records: &[CleanRecord]) -> Vec<GenreStats> {
    #[derive(Default)]
    struct Acc {
        movies: u64,
        votes: u64,
        runtime_sum: u64,
        runtime_known: u64,
    }

    let mut acc: BTreeMap<&str, Acc> = BTreeMap::new();
    for r in records {
        for g in &r.genres {
            let a = acc.entry(g.as_str()).or_default();
            a.movies += 1;
            a.votes = a.votes.saturating_add(r.votes);
            if r.runtime_minutes > 0 {
                a.runtime_sum += u64::from(r.runtime_minutes);
                a.runtime_known += 1;
            }
        }
    }

    acc.into_iter()
        .map(|(genre, a)| GenreStats {
            genre: genre.to_string(),
            movie_count: a.movies,
            average_runtime_minutes: (a.runtime_known > 0)
                .then(|| a.runtime_sum as f64 / a.runtime_known as f64),
            average_votes: a.votes as f64 / a.movies as f64,
            total_votes: a.votes,
        })
        .collect()
}

/// The `n` shortest and `n` longest movies. A runtime of 0 means unknown and
/// is left out. Equal runtimes keep input order.
pub fn duration_extremes(records: &[CleanRecord], n: usize) -> DurationExtremes {
    let mut known: Vec<&CleanRecord> = records.iter().filter(|r| r.runtime_minutes > 0).collect();
    let entry = |r: &&CleanRecord| RuntimeEntry {
        title: r.title.clone(),
        year: r.year,
        runtime_minutes: r.runtime_minutes,
        rating: r.rating,
        primary_genre: r.genres.iter().next().cloned(),
    };

    known.sort_by_key(|r| r.runtime_minutes);
    let shortest = known.iter().take(n).map(entry).collect();
    known.sort_by_key(|r| std::cmp::Reverse(r.runtime_minutes));
    let longest = known.iter().take(n).map(entry).collect();

    DurationExtremes { shortest, longest }
}
