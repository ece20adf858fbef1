//! Core data models that flow through the pipeline.
//!
//! A [`RawRecord`] is what the scraper exported, every field still text.
//! The cleaner turns it into a [`CleanRecord`] with typed fields, which is
//! what the dataset artifact and the `movies` table hold.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Raw scraped movie entry. All fields are unparsed text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    pub title: String,
    pub year: String,
    pub rating: String,
    pub votes: String,
    pub runtime: String,
    pub genres: String,
    /// Listing position from the search page, when the export carries it.
    pub rank: Option<String>,
    /// IMDb title URL, when the export carries it.
    pub url: Option<String>,
}

/// Validated movie entry ready for export and storage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanRecord {
    pub title: String,
    pub year: u16,
    pub rating: f64,
    pub votes: u64,
    pub runtime_minutes: u32,
    pub genres: BTreeSet<String>,
}

impl CleanRecord {
    /// Stable identifier used as the primary key of the `movies` table.
    pub fn movie_id(&self) -> String {
        movie_id(&self.title, self.year)
    }

    /// Normalized (title, year) pair used for deduplication.
    pub fn dedup_key(&self) -> (String, u16) {
        (normalize_title_key(&self.title), self.year)
    }

    /// How much optional information this record carries.
    ///
    /// Zero votes and zero runtime count as "unknown" for this purpose.
    pub fn completeness(&self) -> usize {
        self.genres.len() + usize::from(self.votes > 0) + usize::from(self.runtime_minutes > 0)
    }

    /// Genres joined with [`GENRE_DELIMITER`], the on-disk representation.
    pub fn genres_joined(&self) -> String {
        join_genres(&self.genres)
    }
}

/// Separator used for the genre sub-list in the dataset file and the table.
pub const GENRE_DELIMITER: char = '|';

pub fn join_genres(genres: &BTreeSet<String>) -> String {
    let mut out = String::new();
    for (i, g) in genres.iter().enumerate() {
        if i > 0 {
            out.push(GENRE_DELIMITER);
        }
        out.push_str(g);
    }
    out
}

/// Split a stored genre list back into a set. Empty tokens are dropped.
pub fn split_genres(joined: &str) -> BTreeSet<String> {
    joined
        .split(GENRE_DELIMITER)
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .collect()
}

/// Lowercase the title and collapse runs of whitespace.
pub fn normalize_title_key(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Derive the movie identifier from a (title, year) pair.
///
/// SHA-256 over the normalized title and the year, truncated to 16 hex chars.
pub fn movie_id(title: &str, year: u16) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_title_key(title).as_bytes());
    hasher.update([0x1f]);
    hasher.update(year.to_string().as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}

/// The kinds of raw field the normalizer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Title,
    Year,
    Rating,
    Votes,
    Runtime,
    Genres,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Title => "title",
            FieldKind::Year => "year",
            FieldKind::Rating => "rating",
            FieldKind::Votes => "votes",
            FieldKind::Runtime => "runtime",
            FieldKind::Genres => "genres",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
