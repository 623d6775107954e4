//! Track-citation parser.
//!
//! Pure function: same input string always yields the same
//! [`ParsedCitation`], with no I/O and no shared state. This purity is a
//! tested property, not an implementation detail — the parser is the one
//! place in the pipeline safe to fuzz without a harness.

use crate::models::{is_unidentified_sentinel, normalize};
use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCitation {
    pub track_name: String,
    pub primary_artists: Vec<String>,
    pub remixers: Vec<String>,
    pub mashup_components: Vec<String>,
    pub is_remix: bool,
    pub is_mashup: bool,
    pub note: Option<String>,
    /// True when the citation collapses entirely to an unidentified-track
    /// sentinel (e.g. `"ID - ID"`). Callers drop these rather than insert a
    /// row.
    pub is_unidentified: bool,
}

fn bracket_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[([^\]]+)\]\s*$").unwrap())
}

fn parenthetical_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(([^)]+)\)\s*$").unwrap())
}

fn featured_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(.+?)\s+(?:ft\.?|feat\.?|featuring)\s+(.+?)\s*-\s*(.+)$").unwrap())
}

fn remix_marker_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(.*?)\s*remix$").unwrap())
}

fn mashup_marker_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(.*?)\s*mashup$").unwrap())
}

/// Parses a raw setlist-track citation string into its structured parts.
/// Deterministic and side-effect free.
pub fn parse_citation(raw: &str) -> ParsedCitation {
    let raw = raw.trim();

    if let Some((left, right)) = split_mashup(raw) {
        return ParsedCitation {
            track_name: raw.to_string(),
            primary_artists: Vec::new(),
            remixers: Vec::new(),
            mashup_components: vec![left, right],
            is_remix: false,
            is_mashup: true,
            note: None,
            is_unidentified: false,
        };
    }

    let mut working = raw.to_string();
    let mut note = None;

    if let Some(caps) = bracket_pattern().captures(&working) {
        note = Some(caps[1].to_string());
        working = bracket_pattern().replace(&working, "").trim().to_string();
    }

    let mut is_remix = false;
    let mut remixers = Vec::new();

    if let Some(caps) = parenthetical_pattern().captures(&working) {
        let inner = caps[1].to_string();
        if let Some(remix_caps) = remix_marker_pattern().captures(&inner) {
            is_remix = true;
            let remixer = remix_caps[1].trim();
            if !remixer.is_empty() {
                remixers.push(remixer.to_string());
            }
            working = parenthetical_pattern().replace(&working, "").trim().to_string();
        } else if mashup_marker_pattern().is_match(&inner) {
            // Parenthetical mashup marker without " vs. " split: treat the
            // whole citation as an unparsed mashup note rather than guessing
            // component boundaries.
            working = parenthetical_pattern().replace(&working, "").trim().to_string();
        }
    }

    let (primary_artists, track_name) = split_artists_and_track(&working);

    let normalized_artists: Vec<&String> = primary_artists.iter().collect();
    let all_unidentified = !normalized_artists.is_empty()
        && normalized_artists.iter().all(|a| is_unidentified_sentinel(&normalize(a)))
        && is_unidentified_sentinel(&normalize(&track_name));

    ParsedCitation {
        track_name,
        primary_artists,
        remixers,
        mashup_components: Vec::new(),
        is_remix,
        is_mashup: false,
        note,
        is_unidentified: all_unidentified,
    }
}

fn split_mashup(raw: &str) -> Option<(String, String)> {
    raw.split_once(" vs. ")
        .or_else(|| raw.split_once(" vs "))
        .map(|(a, b)| (a.trim().to_string(), b.trim().to_string()))
}

/// Splits `ARTIST(S) - TRACK`, preferring the explicit featured-artist
/// pattern and falling back to an `&`/`,` separated artist list.
fn split_artists_and_track(working: &str) -> (Vec<String>, String) {
    if let Some(caps) = featured_pattern().captures(working) {
        let primary = caps[1].trim().to_string();
        let featured = caps[2].trim().to_string();
        let track = caps[3].trim().to_string();
        return (vec![primary, featured], track);
    }

    match working.split_once(" - ") {
        Some((artists, track)) => {
            let parsed_artists = artists
                .split(['&', ','])
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .collect();
            (parsed_artists, track.trim().to_string())
        }
        None => (Vec::new(), working.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn featured_remix_citation() {
        let parsed = parse_citation(
            "Ilan Bluestone - Frozen Ground (Spencer Brown Remix) [Anjunabeats]",
        );
        assert_eq!(parsed.primary_artists, vec!["Ilan Bluestone"]);
        assert_eq!(parsed.remixers, vec!["Spencer Brown"]);
        assert_eq!(parsed.track_name, "Frozen Ground");
        assert!(parsed.is_remix);
        assert_eq!(parsed.note.as_deref(), Some("Anjunabeats"));
    }

    #[test]
    fn mashup_citation_keeps_original_string_as_track_name() {
        let parsed = parse_citation("MAMI vs. Losing My Mind");
        assert_eq!(
            parsed.mashup_components,
            vec!["MAMI".to_string(), "Losing My Mind".to_string()]
        );
        assert_eq!(parsed.track_name, "MAMI vs. Losing My Mind");
        assert!(parsed.is_mashup);
        assert!(parsed.primary_artists.is_empty());
    }

    #[test]
    fn unidentified_sentinel_is_flagged() {
        let parsed = parse_citation("ID - ID");
        assert!(parsed.is_unidentified);
    }

    #[test]
    fn ampersand_separated_artists() {
        let parsed = parse_citation("Above & Beyond & Spencer Brown - Sun & Moon");
        assert_eq!(parsed.primary_artists, vec!["Above", "Beyond", "Spencer Brown"]);
        assert_eq!(parsed.track_name, "Sun & Moon");
    }

    #[test]
    fn parser_is_pure() {
        let input = "Ilan Bluestone - Frozen Ground (Spencer Brown Remix) [Anjunabeats]";
        assert_eq!(parse_citation(input), parse_citation(input));
    }
}
