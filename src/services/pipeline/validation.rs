//! Validation stage (pipeline priority 100).
//!
//! Checks each item against its model invariants before it is allowed
//! further into the pipeline. A failing item is dropped, logged, and
//! counted — never silently discarded and never persisted.

use crate::error::PipelineError;
use crate::metrics::MetricsCollector;
use crate::models::{is_unidentified_sentinel, PipelineItem};

pub const STAGE_PRIORITY: u32 = 100;

/// Validates one item, returning it unchanged on success. On failure this
/// both returns `Err` and increments the caller-supplied metrics, so no call
/// site can forget to count a drop.
pub fn validate(item: PipelineItem, metrics: &MetricsCollector) -> Result<PipelineItem, PipelineError> {
    let result = validate_inner(&item);

    if let Err(ref err) = result {
        let reason = err.kind_label();
        metrics
            .validation_failures_total
            .with_label_values(&[item.type_tag(), reason])
            .inc();
        if matches!(err, PipelineError::ValidationFailure(r) if r == "silent-extraction") {
            metrics.silent_scraping_failures_total.inc();
        }
        tracing::warn!(item_type = item.type_tag(), error = %err, "validation failed, dropping item");
    }

    result.map(|()| item)
}

fn validate_inner(item: &PipelineItem) -> Result<(), PipelineError> {
    match item {
        PipelineItem::ArtistItem(artist) => {
            if is_unidentified_sentinel(&artist.normalized_name) {
                return Err(PipelineError::ValidationFailure(
                    "artist name is an unidentified sentinel".to_string(),
                ));
            }
            Ok(())
        }
        PipelineItem::TrackItem(track) => {
            if is_unidentified_sentinel(&track.normalized_title) {
                return Err(PipelineError::ValidationFailure(
                    "track title is an unidentified sentinel".to_string(),
                ));
            }
            if !track.bpm_in_range() {
                return Err(PipelineError::ValidationFailure(format!(
                    "bpm {:?} out of [60, 200]",
                    track.bpm
                )));
            }
            if !track.audio_features().is_within_documented_ranges() {
                return Err(PipelineError::ValidationFailure(
                    "audio feature out of documented range".to_string(),
                ));
            }
            Ok(())
        }
        PipelineItem::SetlistItem(setlist) => {
            if setlist.violates_silent_failure_invariant() {
                return Err(PipelineError::ValidationFailure("silent-extraction".to_string()));
            }
            if setlist.tracklist_count < 0 {
                return Err(PipelineError::ValidationFailure(
                    "tracklist_count must be >= 0".to_string(),
                ));
            }
            Ok(())
        }
        PipelineItem::SetlistTrackItem(row) => {
            if row.position < 0 {
                return Err(PipelineError::ValidationFailure(
                    "setlist track position must be >= 0".to_string(),
                ));
            }
            Ok(())
        }
        PipelineItem::TrackArtistItem(_) => Ok(()),
        PipelineItem::AdjacencyItem(adjacency) => {
            if adjacency.track_a == adjacency.track_b {
                return Err(PipelineError::ValidationFailure(
                    "adjacency endpoints must be distinct".to_string(),
                ));
            }
            if adjacency.track_a >= adjacency.track_b {
                return Err(PipelineError::ValidationFailure(
                    "adjacency endpoints must be in canonical order".to_string(),
                ));
            }
            if adjacency.occurrence_count < 1 {
                return Err(PipelineError::ValidationFailure(
                    "occurrence_count must be >= 1".to_string(),
                ));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Artist, Setlist, Track, TrackAdjacency};
    use uuid::Uuid;

    fn metrics() -> MetricsCollector {
        MetricsCollector::new().expect("metrics registration never fails in tests")
    }

    #[test]
    fn rejects_unidentified_artist() {
        let artist = Artist::new("ID");
        let err = validate(PipelineItem::ArtistItem(artist), &metrics()).unwrap_err();
        assert!(matches!(err, PipelineError::ValidationFailure(_)));
    }

    #[test]
    fn accepts_identified_artist() {
        let artist = Artist::new("Ilan Bluestone");
        assert!(validate(PipelineItem::ArtistItem(artist), &metrics()).is_ok());
    }

    #[test]
    fn scenario_6_silent_failure_is_rejected_and_counted() {
        let setlist = Setlist::new("Anjunabeats Radio", "setlistfm");
        let m = metrics();
        let err = validate(PipelineItem::SetlistItem(setlist), &m).unwrap_err();
        assert!(matches!(err, PipelineError::ValidationFailure(ref r) if r == "silent-extraction"));
    }

    #[test]
    fn out_of_range_bpm_is_rejected() {
        let mut track = Track::new("Frozen Ground", Uuid::new_v4());
        track.bpm = Some(40);
        let err = validate(PipelineItem::TrackItem(track), &metrics()).unwrap_err();
        assert!(matches!(err, PipelineError::ValidationFailure(_)));
    }

    #[test]
    fn adjacency_must_be_canonically_ordered_and_nonzero_count() {
        let edge = TrackAdjacency::observe(Uuid::new_v4(), Uuid::new_v4(), 1.0).unwrap();
        assert!(validate(PipelineItem::AdjacencyItem(edge), &metrics()).is_ok());
    }
}
