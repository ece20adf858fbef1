//! Field normalization: raw scraped text into typed values.
//!
//! Every function here is pure. Bounds that depend on the wall clock (the
//! latest plausible release year) are passed in through [`YearBounds`] so
//! the same input always yields the same output.
//!
//! | Kind | Accepts | Example |
//! |------|---------|---------|
//! | votes | digits, `,` separators, `K`/`M`/`B` suffix | `"1.2M"` → `1200000` |
//! | runtime | `2h 15m`, `2h`, `90m`, `95 min`, bare minutes | `"2h 15m"` → `135` |
//! | rating | decimal in `[0, 10]`, optional `/10` | `"7.8/10"` → `7.8` |
//! | year | four digits in bounds, optional parens | `"(2024)"` → `2024` |

use std::collections::BTreeSet;
use std::sync::LazyLock;

use chrono::Datelike;
use regex::Regex;

use crate::error::MalformedFieldError;
use crate::models::FieldKind;

static VOTES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)(?:\.(\d{1,9}))?([kKmMbB]?)$").expect("Invalid regex"));

static RUNTIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:(\d+)\s*(?:hours|hour|hrs|hr|h))?\s*(?:(\d+)\s*(?:minutes|minute|mins|min|m))?$",
    )
    .expect("Invalid regex")
});

static RATING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,2}(?:\.\d+)?$").expect("Invalid regex"));

static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}$").expect("Invalid regex"));

/// Earliest year accepted by default: the first motion pictures.
pub const DEFAULT_MIN_YEAR: u16 = 1870;

/// Inclusive range of plausible release years.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearBounds {
    pub min: u16,
    pub max: u16,
}

impl YearBounds {
    /// `1870 ..= current year + 2`.
    pub fn for_current_year() -> Self {
        let now = chrono::Utc::now().year();
        Self {
            min: DEFAULT_MIN_YEAR,
            max: u16::try_from(now + 2).unwrap_or(u16::MAX),
        }
    }
}

impl Default for YearBounds {
    fn default() -> Self {
        Self::for_current_year()
    }
}

/// Options shared by every normalizer call in a batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeOptions {
    pub year_bounds: YearBounds,
}

/// A typed value produced by [`normalize`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Title(String),
    Year(u16),
    Rating(f64),
    Votes(u64),
    Runtime(u32),
    Genres(BTreeSet<String>),
}

/// Normalize one raw field according to its declared kind.
pub fn normalize(
    kind: FieldKind,
    text: &str,
    opts: &NormalizeOptions,
) -> Result<FieldValue, MalformedFieldError> {
    Ok(match kind {
        FieldKind::Title => FieldValue::Title(parse_title(text)?),
        FieldKind::Year => FieldValue::Year(parse_year(text, opts.year_bounds)?),
        FieldKind::Rating => FieldValue::Rating(parse_rating(text)?),
        FieldKind::Votes => FieldValue::Votes(parse_votes(text)?),
        FieldKind::Runtime => FieldValue::Runtime(parse_runtime(text)?),
        FieldKind::Genres => FieldValue::Genres(parse_genres(text)),
    })
}

/// Marker the scraper writes for a missing field.
fn is_placeholder(s: &str) -> bool {
    s.eq_ignore_ascii_case("n/a") || s == "-"
}

fn strip_parens(s: &str) -> &str {
    s.strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .map(str::trim)
        .unwrap_or(s)
}

/// Trim and collapse whitespace. Empty and `N/A` titles are rejected.
pub fn parse_title(text: &str) -> Result<String, MalformedFieldError> {
    let title = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if title.is_empty() {
        return Err(MalformedFieldError::new(FieldKind::Title, text, "empty title"));
    }
    if is_placeholder(&title) {
        return Err(MalformedFieldError::new(FieldKind::Title, text, "missing title"));
    }
    Ok(title)
}

/// Parse a four-digit release year within `bounds`.
pub fn parse_year(text: &str, bounds: YearBounds) -> Result<u16, MalformedFieldError> {
    let s = strip_parens(text.trim());
    if !YEAR_RE.is_match(s) {
        return Err(MalformedFieldError::new(
            FieldKind::Year,
            text,
            "expected a four-digit year",
        ));
    }
    let year: u16 = s
        .parse()
        .map_err(|_| MalformedFieldError::new(FieldKind::Year, text, "expected a four-digit year"))?;
    if year < bounds.min || year > bounds.max {
        return Err(MalformedFieldError::new(
            FieldKind::Year,
            text,
            format!("year outside {}..={}", bounds.min, bounds.max),
        ));
    }
    Ok(year)
}

/// Parse a rating on the 0–10 scale. A trailing `/10` is accepted.
pub fn parse_rating(text: &str) -> Result<f64, MalformedFieldError> {
    let mut s = text.trim();
    if let Some(rest) = s.strip_suffix("/10") {
        s = rest.trim_end();
    }
    if !RATING_RE.is_match(s) {
        return Err(MalformedFieldError::new(
            FieldKind::Rating,
            text,
            "expected a decimal number",
        ));
    }
    let rating: f64 = s
        .parse()
        .map_err(|_| MalformedFieldError::new(FieldKind::Rating, text, "expected a decimal number"))?;
    if !(0.0..=10.0).contains(&rating) {
        return Err(MalformedFieldError::new(
            FieldKind::Rating,
            text,
            "rating outside 0..=10",
        ));
    }
    Ok(rating)
}

/// Parse a vote count such as `950`, `2,345`, `946K`, or `(1.2M)`.
///
/// Arithmetic is exact: the fractional digits times the multiplier must be
/// a whole number, so `1.2345K` is rejected rather than rounded.
pub fn parse_votes(text: &str) -> Result<u64, MalformedFieldError> {
    let err = |reason: &str| MalformedFieldError::new(FieldKind::Votes, text, reason);

    let s = strip_parens(text.trim());
    let cleaned: String = s
        .chars()
        .filter(|c| !matches!(c, ',' | '_' | ' '))
        .collect();

    let caps = VOTES_RE
        .captures(&cleaned)
        .ok_or_else(|| err("expected digits with an optional K/M/B suffix"))?;

    let multiplier: u64 = match caps.get(3).map(|m| m.as_str()).unwrap_or("") {
        "" => 1,
        "k" | "K" => 1_000,
        "m" | "M" => 1_000_000,
        _ => 1_000_000_000,
    };

    let whole: u64 = caps[1].parse().map_err(|_| err("vote count too large"))?;
    let mut total = whole
        .checked_mul(multiplier)
        .ok_or_else(|| err("vote count too large"))?;

    if let Some(frac) = caps.get(2) {
        let digits = frac.as_str();
        let numerator: u64 = digits.parse().map_err(|_| err("vote count too large"))?;
        let scale = 10u64.pow(digits.len() as u32);
        let scaled = numerator
            .checked_mul(multiplier)
            .ok_or_else(|| err("vote count too large"))?;
        if scaled % scale != 0 {
            return Err(err("not a whole number of votes"));
        }
        total = total
            .checked_add(scaled / scale)
            .ok_or_else(|| err("vote count too large"))?;
    }

    Ok(total)
}

/// Parse a runtime into total minutes.
///
/// Hours and minutes may appear together or alone. A bare integer is read
/// as minutes, except `0`, which carries no unit and no information.
pub fn parse_runtime(text: &str) -> Result<u32, MalformedFieldError> {
    let err = |reason: &str| MalformedFieldError::new(FieldKind::Runtime, text, reason);
    let s = text.trim();
    if s.is_empty() {
        return Err(err("empty runtime"));
    }

    if s.bytes().all(|b| b.is_ascii_digit()) {
        let minutes: u32 = s.parse().map_err(|_| err("runtime too large"))?;
        if minutes == 0 {
            return Err(err("zero runtime without a unit"));
        }
        return Ok(minutes);
    }

    let caps = RUNTIME_RE
        .captures(s)
        .ok_or_else(|| err("expected hours and/or minutes such as \"2h 15m\""))?;
    let hours = caps.get(1);
    let minutes = caps.get(2);
    if hours.is_none() && minutes.is_none() {
        return Err(err("expected hours and/or minutes such as \"2h 15m\""));
    }

    let mut total: u32 = 0;
    if let Some(h) = hours {
        let h: u32 = h.as_str().parse().map_err(|_| err("runtime too large"))?;
        total = h.checked_mul(60).ok_or_else(|| err("runtime too large"))?;
    }
    if let Some(m) = minutes {
        let m: u32 = m.as_str().parse().map_err(|_| err("runtime too large"))?;
        total = total.checked_add(m).ok_or_else(|| err("runtime too large"))?;
    }
    Ok(total)
}

/// Split a genre list on `,`, `|` or `/`. Never fails; blank means no genres.
pub fn parse_genres(text: &str) -> BTreeSet<String> {
    let text = text.trim();
    // `/` is also a separator, so a whole-field `N/A` must be caught before splitting.
    if is_placeholder(text) {
        return BTreeSet::new();
    }
    text.split([',', '|', '/'])
        .map(str::trim)
        .filter(|g| !g.is_empty() && !is_placeholder(g))
        .map(str::to_string)
        .collect()
}
