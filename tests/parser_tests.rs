//! Black-box coverage of `parse_citation` against the crate's public API,
//! exercising the literal citation scenarios end to end.

use trackgraph_pipeline::services::parser::parse_citation;

#[test]
fn scenario_1_featured_remix_with_label_note() {
    let parsed = parse_citation("Ilan Bluestone - Frozen Ground (Spencer Brown Remix) [Anjunabeats]");
    assert_eq!(parsed.primary_artists, vec!["Ilan Bluestone"]);
    assert_eq!(parsed.remixers, vec!["Spencer Brown"]);
    assert_eq!(parsed.track_name, "Frozen Ground");
    assert!(parsed.is_remix);
    assert!(parsed.note.as_deref().unwrap().contains("Anjunabeats"));
}

#[test]
fn scenario_2_mashup_keeps_original_string_and_splits_components() {
    let parsed = parse_citation("MAMI vs. Losing My Mind");
    assert_eq!(parsed.mashup_components, vec!["MAMI", "Losing My Mind"]);
    assert_eq!(parsed.track_name, "MAMI vs. Losing My Mind");
    assert!(parsed.is_mashup);
    assert!(parsed.primary_artists.is_empty());
}

#[test]
fn scenario_3_unidentified_sentinel_citation_is_flagged() {
    let parsed = parse_citation("ID - ID");
    assert!(parsed.is_unidentified);
}

#[test]
fn citation_with_no_artist_separator_falls_back_to_bare_title() {
    let parsed = parse_citation("Frozen Ground");
    assert!(parsed.primary_artists.is_empty());
    assert_eq!(parsed.track_name, "Frozen Ground");
}

#[test]
fn parser_is_deterministic_across_repeated_calls() {
    let input = "Above & Beyond & Spencer Brown - Sun & Moon (Tinlicker Remix) [Anjunabeats]";
    assert_eq!(parse_citation(input), parse_citation(input));
}
