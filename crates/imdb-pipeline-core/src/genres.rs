//! Keyword-based genre inference for exports that carry no genre column.
//!
//! The search listing the scraper reads does not show genres, so a title
//! keyword table provides a coarse fallback. Matching is case-insensitive
//! substring matching; a title matching nothing is filed under `Drama`.

use std::collections::BTreeSet;

/// Genre used when no keyword matches.
pub const FALLBACK_GENRE: &str = "Drama";

const GENRE_KEYWORDS: &[(&str, &[&str])] = &[
    ("Action", &["action", "fight", "war", "battle", "combat", "martial"]),
    ("Romance", &["love", "romance", "wedding", "romantic", "heart"]),
    ("Horror", &["horror", "scary", "fear", "dark", "evil", "ghost", "zombie"]),
    ("Comedy", &["comedy", "funny", "laugh", "humor", "fun"]),
    ("Drama", &["drama", "life", "story", "human", "family"]),
    ("Sci-Fi", &["sci-fi", "space", "future", "robot", "alien", "time"]),
    ("Crime", &["crime", "murder", "detective", "police", "criminal"]),
    ("Adventure", &["adventure", "journey", "quest", "treasure", "exploration"]),
    ("Thriller", &["thriller", "suspense", "mystery", "dangerous"]),
    ("Fantasy", &["fantasy", "magic", "wizard", "dragon", "fairy"]),
    ("Animation", &["animation", "animated", "cartoon"]),
    ("Documentary", &["documentary", "real", "true"]),
    ("Biography", &["biography", "bio", "life of", "story of"]),
    ("History", &["history", "historical", "war", "ancient"]),
    ("Music", &["music", "musical", "song", "band", "concert"]),
    ("Sport", &["sport", "football", "basketball", "baseball", "olympic"]),
    ("Western", &["western", "cowboy", "frontier"]),
    ("Family", &["family", "kids", "children", "kid"]),
];

/// Infer a genre set from title keywords.
pub fn infer_from_title(title: &str) -> BTreeSet<String> {
    let lower = title.to_lowercase();
    let mut genres: BTreeSet<String> = GENRE_KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(genre, _)| genre.to_string())
        .collect();
    if genres.is_empty() {
        genres.insert(FALLBACK_GENRE.to_string());
    }
    genres
}
