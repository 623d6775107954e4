use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SetlistTrack {
    pub setlist_id: Uuid,
    pub track_id: Uuid,
    /// Unique within a set-list; the order tracks were played in.
    pub position: i32,
    /// Milliseconds into the set, if the source published timestamps.
    pub timestamp_ms: Option<i64>,
}

impl SetlistTrack {
    pub fn new(setlist_id: Uuid, track_id: Uuid, position: i32) -> Self {
        Self {
            setlist_id,
            track_id,
            position,
            timestamp_ms: None,
        }
    }
}

/// Checks the per-set-list uniqueness invariant over an in-memory batch
/// before it reaches the database's own unique constraint.
pub fn positions_are_unique(rows: &[SetlistTrack]) -> bool {
    let mut seen = std::collections::HashSet::new();
    rows.iter().all(|r| seen.insert(r.position))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_positions_pass() {
        let setlist_id = Uuid::new_v4();
        let rows = vec![
            SetlistTrack::new(setlist_id, Uuid::new_v4(), 0),
            SetlistTrack::new(setlist_id, Uuid::new_v4(), 1),
        ];
        assert!(positions_are_unique(&rows));
    }

    #[test]
    fn duplicate_positions_fail() {
        let setlist_id = Uuid::new_v4();
        let rows = vec![
            SetlistTrack::new(setlist_id, Uuid::new_v4(), 0),
            SetlistTrack::new(setlist_id, Uuid::new_v4(), 0),
        ];
        assert!(!positions_are_unique(&rows));
    }
}
