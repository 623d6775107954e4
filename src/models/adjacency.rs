use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Undirected edge between two tracks that co-occurred in a set-list.
/// Endpoints are stored in canonical order (`track_a < track_b`) so there is
/// exactly one row per unordered pair regardless of which track a given
/// set-list mentions first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, FromRow, PartialEq)]
pub struct TrackAdjacency {
    pub track_a: Uuid,
    pub track_b: Uuid,
    pub occurrence_count: i64,
    pub average_distance: f64,
}

impl TrackAdjacency {
    /// Builds a canonically-ordered edge for a single observed co-occurrence.
    pub fn observe(track_x: Uuid, track_y: Uuid, distance: f64) -> Option<Self> {
        if track_x == track_y {
            return None;
        }
        let (track_a, track_b) = canonical_order(track_x, track_y);
        Some(Self {
            track_a,
            track_b,
            occurrence_count: 1,
            average_distance: distance,
        })
    }

    /// Merges an incoming observation (or a batch's partial aggregate) into
    /// this edge using a count-weighted mean recompute. This is the
    /// operation that must be commutative and associative under any batch
    /// partitioning — merging `(a then b)` must equal merging `(b then a)`.
    pub fn merge(&self, other: &TrackAdjacency) -> Self {
        debug_assert_eq!(self.track_a, other.track_a);
        debug_assert_eq!(self.track_b, other.track_b);

        let total_count = self.occurrence_count + other.occurrence_count;
        let weighted_sum = self.average_distance * self.occurrence_count as f64
            + other.average_distance * other.occurrence_count as f64;

        Self {
            track_a: self.track_a,
            track_b: self.track_b,
            occurrence_count: total_count,
            average_distance: weighted_sum / total_count as f64,
        }
    }
}

/// Lexicographically orders two track ids so adjacency rows are always
/// keyed the same way regardless of observation order.
pub fn canonical_order(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Aggregates a sequence of partial observations for the same pair,
/// independent of how the batch happened to be partitioned or ordered.
pub fn aggregate(observations: &[TrackAdjacency]) -> Option<TrackAdjacency> {
    observations
        .iter()
        .copied()
        .reduce(|acc, next| acc.merge(&next))
}
