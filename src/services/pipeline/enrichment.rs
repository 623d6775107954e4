//! Enrichment stage (pipeline priority 200).
//!
//! Name/title normalization happens at construction time on the models
//! themselves (`Artist::new`/`Track::new`); this stage layers on fuzzy genre
//! snapping against a controlled vocabulary, timestamp augmentation, and
//! boolean-flag derivation from title text.
//!
//! Genre fuzzy-matching is grounded on `identity_resolver.rs`'s
//! `genre_overlap`/`genres_match`, with the hand-rolled Levenshtein matrix
//! there replaced by the `levenshtein` crate this crate already depends on.

use crate::models::Track;

pub const STAGE_PRIORITY: u32 = 200;

/// A fixed controlled vocabulary genre snaps against. A real deployment
/// would source this from the catalog; a static list keeps this module
/// self-contained and testable.
pub const CONTROLLED_GENRES: &[&str] = &[
    "trance",
    "progressive house",
    "tech house",
    "techno",
    "drum and bass",
    "dubstep",
    "house",
    "deep house",
    "hip hop",
    "r&b",
    "pop",
    "rock",
];

const GENRE_SYNONYMS: &[(&str, &str)] = &[
    ("hip-hop", "hip hop"),
    ("hip-hop", "rap"),
    ("hip hop", "rap"),
    ("r&b", "rnb"),
    ("r&b", "rhythm and blues"),
    ("rock", "rock and roll"),
    ("electronic", "edm"),
    ("electronic", "dance"),
    ("prog house", "progressive house"),
    ("tech-house", "tech house"),
    ("dnb", "drum and bass"),
];

fn synonym_match(a: &str, b: &str) -> bool {
    GENRE_SYNONYMS.iter().any(|(g1, g2)| {
        (a.contains(g1) && b.contains(g2)) || (a.contains(g2) && b.contains(g1))
    })
}

fn string_similarity(a: &str, b: &str) -> f64 {
    let a_lower = a.to_lowercase();
    let b_lower = b.to_lowercase();

    if a_lower == b_lower {
        return 1.0;
    }

    let max_len = a_lower.chars().count().max(b_lower.chars().count());
    if max_len == 0 {
        return 1.0;
    }

    let distance = levenshtein::levenshtein(&a_lower, &b_lower);
    1.0 - (distance as f64 / max_len as f64)
}

/// Finds the controlled-vocabulary genre closest to `raw`, if any candidate
/// clears `threshold`. Synonym matches (e.g. "hip-hop" vs "rap") are scored
/// at 1.0 since they are known-equivalent rather than merely similar.
pub fn snap_genre(raw: &str, threshold: f64) -> Option<(String, f64)> {
    let raw_lower = raw.to_lowercase();

    CONTROLLED_GENRES
        .iter()
        .map(|candidate| {
            let candidate_lower = candidate.to_lowercase();
            let score = if synonym_match(&raw_lower, &candidate_lower) {
                1.0
            } else {
                string_similarity(&raw_lower, &candidate_lower)
            };
            (candidate.to_string(), score)
        })
        .filter(|(_, score)| *score >= threshold)
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
}

/// Snaps `track.genre` against the controlled vocabulary, preserving the
/// original value in `original_genre`. Leaves the track untouched if no
/// candidate clears the threshold.
pub fn enrich_genre(track: &mut Track, threshold: f64) {
    let Some(raw) = track.genre.clone() else { return };

    if let Some((snapped, _score)) = snap_genre(&raw, threshold) {
        track.original_genre = Some(raw);
        track.genre = Some(snapped);
    }
}

/// Derives the boolean flags a title alone implies, without overwriting a
/// flag the citation parser (or an earlier enrichment pass) already set to
/// `true`.
pub fn derive_flags_from_title(track: &mut Track) {
    let title_lower = track.title.to_lowercase();

    track.is_live |= title_lower.contains("(live)") || title_lower.contains("[live]");
    track.is_cover |= title_lower.contains("(cover)") || title_lower.contains("[cover]");
    track.is_instrumental |=
        title_lower.contains("(instrumental)") || title_lower.contains("[instrumental]");
    track.is_explicit |= title_lower.contains("[explicit]") || title_lower.contains("(explicit)");
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn synonym_genres_snap_with_perfect_score() {
        let (snapped, score) = snap_genre("rap", 0.85).unwrap();
        assert_eq!(snapped, "hip hop");
        assert_eq!(score, 1.0);
    }

    #[test]
    fn near_miss_below_threshold_does_not_snap() {
        assert!(snap_genre("xylophone jazz", 0.85).is_none());
    }

    #[test]
    fn enrich_genre_preserves_original() {
        let mut track = Track::new("Frozen Ground", Uuid::new_v4());
        track.genre = Some("prog house".to_string());
        enrich_genre(&mut track, 0.85);
        assert_eq!(track.genre.as_deref(), Some("progressive house"));
        assert_eq!(track.original_genre.as_deref(), Some("prog house"));
    }

    #[test]
    fn title_markers_derive_flags() {
        let mut track = Track::new("Frozen Ground (Live)", Uuid::new_v4());
        derive_flags_from_title(&mut track);
        assert!(track.is_live);
        assert!(!track.is_cover);
    }

    #[test]
    fn existing_true_flag_is_not_cleared() {
        let mut track = Track::new("Frozen Ground", Uuid::new_v4());
        track.is_remix = true;
        derive_flags_from_title(&mut track);
        assert!(track.is_remix);
    }
}
