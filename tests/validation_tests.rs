//! Black-box coverage of the validation stage (pipeline priority 100) via the
//! public API: each model invariant should reject the item that violates it
//! and pass through everything else unchanged.

use trackgraph_pipeline::metrics::MetricsCollector;
use trackgraph_pipeline::models::{Artist, PipelineItem, Setlist, Track, TrackAdjacency};
use trackgraph_pipeline::services::pipeline::validate;
use trackgraph_pipeline::PipelineError;
use uuid::Uuid;

fn metrics() -> MetricsCollector {
    MetricsCollector::new().expect("metrics registration never fails in tests")
}

#[test]
fn scenario_6_zero_count_setlist_without_scrape_error_is_rejected() {
    let setlist = Setlist::new("Anjunabeats Radio 400", "setlistfm");
    let err = validate(PipelineItem::SetlistItem(setlist), &metrics()).unwrap_err();
    assert!(matches!(err, PipelineError::ValidationFailure(ref r) if r == "silent-extraction"));
}

#[test]
fn a_zero_count_setlist_with_a_scrape_error_is_accepted() {
    let mut setlist = Setlist::new("Anjunabeats Radio 400", "setlistfm");
    setlist.scrape_error = Some("no tracklist section found".to_string());
    assert!(validate(PipelineItem::SetlistItem(setlist), &metrics()).is_ok());
}

#[test]
fn unidentified_sentinel_artist_is_rejected() {
    let artist = Artist::new("ID");
    assert!(validate(PipelineItem::ArtistItem(artist), &metrics()).is_err());
}

#[test]
fn bpm_outside_60_to_200_is_rejected() {
    let mut track = Track::new("Frozen Ground", Uuid::new_v4());
    track.bpm = Some(250);
    assert!(validate(PipelineItem::TrackItem(track), &metrics()).is_err());
}

#[test]
fn audio_feature_outside_its_documented_range_is_rejected() {
    let mut track = Track::new("Frozen Ground", Uuid::new_v4());
    track.danceability = Some(1.2);
    assert!(validate(PipelineItem::TrackItem(track), &metrics()).is_err());
}

#[test]
fn adjacency_edge_must_be_canonically_ordered_with_positive_count() {
    let valid = TrackAdjacency::observe(Uuid::new_v4(), Uuid::new_v4(), 2.0).unwrap();
    assert!(validate(PipelineItem::AdjacencyItem(valid), &metrics()).is_ok());

    let mut reversed = TrackAdjacency::observe(Uuid::new_v4(), Uuid::new_v4(), 2.0).unwrap();
    std::mem::swap(&mut reversed.track_a, &mut reversed.track_b);
    assert!(validate(PipelineItem::AdjacencyItem(reversed), &metrics()).is_err());
}
