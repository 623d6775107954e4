//! Black-box coverage of adjacency-edge aggregation via the public model API:
//! canonical ordering, and commutativity/associativity under partitioning.

use trackgraph_pipeline::models::{aggregate, canonical_order, TrackAdjacency};
use uuid::Uuid;

#[test]
fn scenario_5_adjacency_aggregation_merges_counts_and_weighted_distance() {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let (track_a, track_b) = canonical_order(a, b);

    let batches = vec![
        TrackAdjacency { track_a, track_b, occurrence_count: 3, average_distance: 1.0 },
        TrackAdjacency { track_a, track_b, occurrence_count: 2, average_distance: 2.0 },
    ];

    let merged = aggregate(&batches).unwrap();
    assert_eq!(merged.occurrence_count, 5);
    assert!((merged.average_distance - 1.4).abs() < 1e-9);
}

#[test]
fn observed_edges_always_order_endpoints_canonically() {
    let x = Uuid::new_v4();
    let y = Uuid::new_v4();

    let forward = TrackAdjacency::observe(x, y, 3.0).unwrap();
    let backward = TrackAdjacency::observe(y, x, 3.0).unwrap();

    assert_eq!(forward.track_a, backward.track_a);
    assert_eq!(forward.track_b, backward.track_b);
    assert!(forward.track_a < forward.track_b);
}

#[test]
fn aggregation_result_is_independent_of_batch_partitioning() {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let (track_a, track_b) = canonical_order(a, b);

    let parts = vec![
        TrackAdjacency { track_a, track_b, occurrence_count: 4, average_distance: 1.0 },
        TrackAdjacency { track_a, track_b, occurrence_count: 1, average_distance: 5.0 },
        TrackAdjacency { track_a, track_b, occurrence_count: 2, average_distance: 3.0 },
        TrackAdjacency { track_a, track_b, occurrence_count: 3, average_distance: 2.0 },
    ];

    let whole = aggregate(&parts).unwrap();
    let split = aggregate(&parts[..2]).unwrap().merge(&aggregate(&parts[2..]).unwrap());

    assert_eq!(whole.occurrence_count, split.occurrence_count);
    assert!((whole.average_distance - split.average_distance).abs() < 1e-9);
}

#[test]
fn a_track_never_adjoins_itself() {
    let id = Uuid::new_v4();
    assert!(TrackAdjacency::observe(id, id, 1.0).is_none());
}
