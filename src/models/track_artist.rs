use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum ArtistRole {
    Primary,
    Featured,
    Remixer,
    Producer,
    Vocalist,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TrackArtist {
    pub track_id: Uuid,
    pub artist_id: Uuid,
    pub role: ArtistRole,
    /// Ordering position among artists sharing a role (e.g. two featured
    /// artists listed in citation order).
    pub position: i32,
}

impl TrackArtist {
    pub fn new(track_id: Uuid, artist_id: Uuid, role: ArtistRole, position: i32) -> Self {
        Self {
            track_id,
            artist_id,
            role,
            position,
        }
    }
}

/// Checks the invariant that exactly one row in a track's artist list has
/// `role == Primary` and that its artist matches `Track.primary_artist_id`.
pub fn has_exactly_one_matching_primary(rows: &[TrackArtist], primary_artist_id: Uuid) -> bool {
    let primaries: Vec<&TrackArtist> = rows.iter().filter(|r| r.role == ArtistRole::Primary).collect();
    primaries.len() == 1 && primaries[0].artist_id == primary_artist_id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_one_primary_passes() {
        let track_id = Uuid::new_v4();
        let primary_id = Uuid::new_v4();
        let rows = vec![
            TrackArtist::new(track_id, primary_id, ArtistRole::Primary, 0),
            TrackArtist::new(track_id, Uuid::new_v4(), ArtistRole::Remixer, 0),
        ];
        assert!(has_exactly_one_matching_primary(&rows, primary_id));
    }

    #[test]
    fn zero_primaries_fails() {
        let track_id = Uuid::new_v4();
        let rows = vec![TrackArtist::new(track_id, Uuid::new_v4(), ArtistRole::Featured, 0)];
        assert!(!has_exactly_one_matching_primary(&rows, Uuid::new_v4()));
    }

    #[test]
    fn mismatched_primary_fails() {
        let track_id = Uuid::new_v4();
        let rows = vec![TrackArtist::new(track_id, Uuid::new_v4(), ArtistRole::Primary, 0)];
        assert!(!has_exactly_one_matching_primary(&rows, Uuid::new_v4()));
    }
}
