use super::{Artist, ArtistRole, Setlist, Track, TrackAdjacency};
use uuid::Uuid;

/// The polymorphic stream crossing validation -> enrichment -> persistence
/// is a tagged union routed on this explicit variant, never on which fields
/// happen to be populated. Each stage matches on the tag; nothing infers
/// item type from field presence.
#[derive(Debug, Clone)]
pub enum PipelineItem {
    ArtistItem(Artist),
    TrackItem(Track),
    TrackArtistItem(TrackArtistItem),
    SetlistItem(Setlist),
    SetlistTrackItem(SetlistTrackItem),
    AdjacencyItem(TrackAdjacency),
}

/// Pre-flush form of a TrackArtist row: references may still be name-keyed
/// temporary ids resolved at flush time — no true FK cycles, only a DAG
/// with temp refs resolved before commit.
#[derive(Debug, Clone)]
pub struct TrackArtistItem {
    pub track_ref: ItemRef,
    pub artist_ref: ItemRef,
    pub role: ArtistRole,
    pub position: i32,
}

#[derive(Debug, Clone)]
pub struct SetlistTrackItem {
    pub setlist_ref: ItemRef,
    pub track_ref: ItemRef,
    pub position: i32,
    pub timestamp_ms: Option<i64>,
}

/// A reference to another item in the same batch, either by a resolved id
/// (already persisted or already assigned in this batch) or by the
/// normalized name/title key it will be resolved against at flush time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemRef {
    Resolved(Uuid),
    ByNormalizedKey(String),
}

impl PipelineItem {
    pub fn type_tag(&self) -> &'static str {
        match self {
            PipelineItem::ArtistItem(_) => "artist",
            PipelineItem::TrackItem(_) => "track",
            PipelineItem::TrackArtistItem(_) => "track_artist",
            PipelineItem::SetlistItem(_) => "setlist",
            PipelineItem::SetlistTrackItem(_) => "setlist_track",
            PipelineItem::AdjacencyItem(_) => "track_adjacency",
        }
    }

    /// Dependency-order rank used by the persistence stage to sequence a
    /// batch: artists, then tracks, then set-lists, then the join tables,
    /// then adjacency.
    pub fn dependency_rank(&self) -> u8 {
        match self {
            PipelineItem::ArtistItem(_) => 0,
            PipelineItem::TrackItem(_) => 1,
            PipelineItem::SetlistItem(_) => 2,
            PipelineItem::SetlistTrackItem(_) => 3,
            PipelineItem::TrackArtistItem(_) => 4,
            PipelineItem::AdjacencyItem(_) => 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn dependency_rank_orders_artists_before_tracks() {
        let artist = PipelineItem::ArtistItem(Artist::new("Ilan Bluestone"));
        let track = PipelineItem::TrackItem(Track::new("Frozen Ground", Uuid::new_v4()));
        assert!(artist.dependency_rank() < track.dependency_rank());
    }

    #[test]
    fn type_tag_is_explicit_not_inferred() {
        let artist = PipelineItem::ArtistItem(Artist::new("Above & Beyond"));
        assert_eq!(artist.type_tag(), "artist");
    }
}
