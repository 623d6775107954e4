pub mod adjacency;
pub mod artist;
pub mod enrichment_status;
pub mod item;
pub mod setlist;
pub mod setlist_track;
pub mod track;
pub mod track_artist;

pub use adjacency::*;
pub use artist::*;
pub use enrichment_status::*;
pub use item::*;
pub use setlist::*;
pub use setlist_track::*;
pub use track::*;
pub use track_artist::*;

use regex::Regex;
use std::sync::OnceLock;

/// Reserved placeholder values a normalized name/title must never equal.
/// Citations like `"ID - ID"` collapse to the single-word sentinel and are
/// rejected at the validation boundary rather than inserted as a real artist
/// or track; `"Various Artists"`/`"Unknown Artist"` listings collapse to the
/// multi-word ones.
pub const UNIDENTIFIED_SENTINELS: &[&str] = &[
    "id",
    "unknown",
    "unidentified",
    "n/a",
    "tbd",
    "unknown artist",
    "various artists",
];

fn punctuation_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s]").unwrap())
}

/// Strip punctuation, lowercase, collapse internal whitespace, and trim.
/// Used for every `normalized_*` column so matching is case- and
/// punctuation-insensitive and shares one implementation across models.
pub fn normalize(input: &str) -> String {
    let stripped = punctuation_pattern().replace_all(input, "");
    stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub fn is_unidentified_sentinel(normalized: &str) -> bool {
    UNIDENTIFIED_SENTINELS.contains(&normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_whitespace_and_case() {
        assert_eq!(normalize("  Ilan   Bluestone "), "ilan bluestone");
    }

    #[test]
    fn normalize_strips_punctuation() {
        assert_eq!(normalize("I.D."), "id");
        assert_eq!(normalize("Sun & Moon"), "sun moon");
        assert_eq!(normalize("Sun Moon"), "sun moon");
    }

    #[test]
    fn sentinel_detection() {
        assert!(is_unidentified_sentinel("id"));
        assert!(is_unidentified_sentinel("unknown artist"));
        assert!(is_unidentified_sentinel("various artists"));
        assert!(!is_unidentified_sentinel("ilan bluestone"));
    }

    #[test]
    fn punctuation_stripped_id_citation_is_caught_as_sentinel() {
        assert!(is_unidentified_sentinel(&normalize("I.D.")));
    }
}
