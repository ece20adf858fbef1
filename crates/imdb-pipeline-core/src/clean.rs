//! Batch cleaning: raw records in, clean records plus a rejection report out.
//!
//! Failures are contained per record. A malformed field or a duplicate key
//! moves that one record into the [`CleanReport`]; the rest of the batch is
//! unaffected.
//!
//! # Duplicates
//!
//! Records are keyed by normalized (title, year). Under
//! [`DedupPolicy::FirstWins`] the first occurrence is kept. Under
//! [`DedupPolicy::MostComplete`] a later occurrence replaces the kept one
//! only when its [`completeness`](CleanRecord::completeness) is strictly
//! higher. Either way the survivor keeps the output position of the first
//! occurrence, and every loser is reported as a duplicate.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DuplicateRecordError, MalformedFieldError, RejectReason};
use crate::genres;
use crate::models::{CleanRecord, RawRecord};
use crate::normalize::{self, NormalizeOptions};

/// Which record survives when two share a (title, year) key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DedupPolicy {
    #[default]
    #[serde(rename = "first")]
    FirstWins,
    #[serde(rename = "most-complete")]
    MostComplete,
}

impl FromStr for DedupPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(DedupPolicy::FirstWins),
            "most-complete" => Ok(DedupPolicy::MostComplete),
            other => Err(format!(
                "unknown dedup policy '{}': expected 'first' or 'most-complete'",
                other
            )),
        }
    }
}

impl fmt::Display for DedupPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DedupPolicy::FirstWins => f.write_str("first"),
            DedupPolicy::MostComplete => f.write_str("most-complete"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CleanOptions {
    pub normalize: NormalizeOptions,
    pub dedup: DedupPolicy,
    /// Fill a blank genre list from title keywords.
    pub infer_genres: bool,
}

/// One record that did not make it into the dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    /// 1-based position of the record in the input batch.
    pub row: usize,
    pub title: String,
    /// Listing rank from the scraper, when the export carried one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub reason: RejectReason,
}

/// Summary of a cleaning run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleanReport {
    pub total: usize,
    pub accepted: usize,
    pub rejections: Vec<Rejection>,
}

impl CleanReport {
    pub fn malformed_count(&self) -> usize {
        self.rejections
            .iter()
            .filter(|r| matches!(r.reason, RejectReason::MalformedField(_)))
            .count()
    }

    pub fn duplicate_count(&self) -> usize {
        self.rejections
            .iter()
            .filter(|r| matches!(r.reason, RejectReason::Duplicate(_)))
            .count()
    }
}

#[derive(Debug, Clone)]
pub struct CleanOutcome {
    pub records: Vec<CleanRecord>,
    pub report: CleanReport,
}

/// Normalize every field of one raw record.
///
/// Fields are checked in a fixed order (title, year, rating, votes,
/// runtime) and the first failure is returned.
pub fn clean_record(raw: &RawRecord, opts: &CleanOptions) -> Result<CleanRecord, MalformedFieldError> {
    let title = normalize::parse_title(&raw.title)?;
    let year = normalize::parse_year(&raw.year, opts.normalize.year_bounds)?;
    let rating = normalize::parse_rating(&raw.rating)?;
    let votes = normalize::parse_votes(&raw.votes)?;
    let runtime_minutes = normalize::parse_runtime(&raw.runtime)?;

    let mut genres = normalize::parse_genres(&raw.genres);
    if genres.is_empty() && opts.infer_genres {
        genres = genres::infer_from_title(&title);
    }

    Ok(CleanRecord {
        title,
        year,
        rating,
        votes,
        runtime_minutes,
        genres,
    })
}

/// Where a kept record came from, for reporting it if it is later displaced.
struct Origin {
    row: usize,
    rank: Option<String>,
    url: Option<String>,
}

impl Origin {
    fn reject(self, title: String, reason: RejectReason) -> Rejection {
        Rejection {
            row: self.row,
            title,
            rank: self.rank,
            url: self.url,
            reason,
        }
    }
}

/// Clean a batch of raw records.
pub fn clean_records<I>(raws: I, opts: &CleanOptions) -> CleanOutcome
where
    I: IntoIterator<Item = RawRecord>,
{
    let mut kept: Vec<(Origin, CleanRecord)> = Vec::new();
    let mut positions: HashMap<(String, u16), usize> = HashMap::new();
    let mut rejections: Vec<Rejection> = Vec::new();
    let mut total = 0usize;

    for (i, raw) in raws.into_iter().enumerate() {
        let row = i + 1;
        total += 1;

        let record = match clean_record(&raw, opts) {
            Ok(r) => r,
            Err(e) => {
                let origin = Origin {
                    row,
                    rank: raw.rank,
                    url: raw.url,
                };
                rejections.push(origin.reject(raw.title.trim().to_string(), e.into()));
                continue;
            }
        };
        let origin = Origin {
            row,
            rank: raw.rank,
            url: raw.url,
        };

        let key = record.dedup_key();
        let Some(pos) = positions.get(&key).copied() else {
            positions.insert(key, kept.len());
            kept.push((origin, record));
            continue;
        };

        let (kept_row, replace) = {
            let (kept_origin, existing) = &kept[pos];
            let replace = opts.dedup == DedupPolicy::MostComplete
                && record.completeness() > existing.completeness();
            (kept_origin.row, replace)
        };

        if replace {
            let (old_origin, old) = std::mem::replace(&mut kept[pos], (origin, record));
            let reason = DuplicateRecordError {
                title: old.title.clone(),
                year: old.year,
                kept_row: row,
            };
            rejections.push(old_origin.reject(old.title, reason.into()));
        } else {
            let reason = DuplicateRecordError {
                title: record.title.clone(),
                year: record.year,
                kept_row,
            };
            rejections.push(origin.reject(record.title, reason.into()));
        }
    }

    rejections.sort_by_key(|r| r.row);

    let records: Vec<CleanRecord> = kept.into_iter().map(|(_, r)| r).collect();
    let report = CleanReport {
        total,
        accepted: records.len(),
        rejections,
    };

    CleanOutcome { records, report }
}
