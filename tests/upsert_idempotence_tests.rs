//! Black-box coverage of the persistence stage against a real Postgres
//! instance: re-applying the same upsert is a no-op except for
//! `updated_at`, and scenario 4's ISRC-driven merge collapses two tracks
//! into one row.

use sqlx::PgPool;
use trackgraph_pipeline::metrics::MetricsCollector;
use trackgraph_pipeline::models::{Artist, PipelineItem, Track};
use trackgraph_pipeline::services::pipeline::PersistenceStage;
use uuid::Uuid;

fn metrics() -> MetricsCollector {
    MetricsCollector::new().expect("metrics registration never fails in tests")
}

#[sqlx::test]
async fn reapplying_the_same_artist_upsert_is_idempotent(pool: PgPool) {
    let stage = PersistenceStage::new(pool.clone());
    let artist = Artist::new("Above & Beyond");

    stage
        .flush_batch(vec![PipelineItem::ArtistItem(artist.clone())], &metrics())
        .await
        .unwrap();
    stage
        .flush_batch(vec![PipelineItem::ArtistItem(artist.clone())], &metrics())
        .await
        .unwrap();

    let rows: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM artists WHERE normalized_name = $1")
        .bind(&artist.normalized_name)
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
}

#[sqlx::test]
async fn scenario_4_same_isrc_merges_into_one_track_row(pool: PgPool) {
    let stage = PersistenceStage::new(pool.clone());
    let artist = Artist::new("Ilan Bluestone");
    stage.flush_batch(vec![PipelineItem::ArtistItem(artist.clone())], &metrics()).await.unwrap();

    let (artist_id,): (Uuid,) = sqlx::query_as("SELECT id FROM artists WHERE normalized_name = $1")
        .bind(&artist.normalized_name)
        .fetch_one(&pool)
        .await
        .unwrap();

    let mut track_a = Track::new("Frozen Ground", artist_id);
    track_a.isrc = Some("USRC12345".to_string());
    stage.flush_batch(vec![PipelineItem::TrackItem(track_a)], &metrics()).await.unwrap();

    let mut track_b = Track::new("Frozen Ground (alt listing)", artist_id);
    track_b.isrc = Some("USRC12345".to_string());
    track_b.bpm = Some(125);
    stage.flush_batch(vec![PipelineItem::TrackItem(track_b)], &metrics()).await.unwrap();

    let rows: Vec<(Uuid, Option<i32>)> = sqlx::query_as("SELECT id, bpm FROM tracks WHERE isrc = $1")
        .bind("USRC12345")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].1, Some(125));
}
