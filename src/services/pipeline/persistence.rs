//! Persistence stage (pipeline priority 300).
//!
//! Batched upserts, committed in one transaction per batch in fixed
//! dependency order (artists -> tracks -> setlists -> setlist_tracks ->
//! track_artists -> track_adjacency). Conflict resolution tries ISRC, then
//! platform id, then `(normalized_title, primary_artist_id)`, in that
//! priority order, merging with `COALESCE`-style field-by-field preference
//! for non-null incoming values. On failure the batch is rolled back and
//! retried as two halves, bisecting further until the offending item is
//! isolated rather than failing the whole batch.
//!
//! Grounded on `musicbrainz.rs`'s `import_batch`'s runtime `sqlx::query`/
//! `ON CONFLICT ... DO UPDATE` pattern, adapted from a single JSONB-merge
//! upsert to typed-column upserts across the model set this crate persists.

use crate::metrics::MetricsCollector;
use crate::models::{
    Artist, ItemRef, PipelineItem, Setlist, SetlistTrackItem, Track, TrackAdjacency,
    TrackArtistItem,
};
use crate::error::PipelineError;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

pub const STAGE_PRIORITY: u32 = 300;
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Tracks id assignments made earlier in the same batch so later items
/// referencing an `ItemRef::ByNormalizedKey` resolve without a round trip.
#[derive(Default)]
struct BatchKeyTable {
    artists: HashMap<String, Uuid>,
    tracks: HashMap<String, Uuid>,
    setlists: HashMap<String, Uuid>,
}

pub struct PersistenceStage {
    pool: PgPool,
}

impl PersistenceStage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Commits one batch in dependency order inside a single transaction.
    /// On failure, the batch is split in half and each half retried
    /// independently (bisection), isolating the offending item rather than
    /// discarding everything that would otherwise have committed cleanly.
    pub async fn flush_batch(
        &self,
        items: Vec<PipelineItem>,
        metrics: &MetricsCollector,
    ) -> Result<(), PipelineError> {
        let timer = metrics
            .persistence_batch_duration_seconds
            .with_label_values(&["attempt"])
            .start_timer();

        let mut ordered = items;
        ordered.sort_by_key(|item| item.dependency_rank());

        let result = self.commit_batch(&ordered).await;
        timer.observe_duration();

        match result {
            Ok(()) => Ok(()),
            Err(err) if ordered.len() > 1 => {
                tracing::warn!(error = %err, batch_size = ordered.len(), "batch commit failed, bisecting");
                let mid = ordered.len() / 2;
                let (left, right) = ordered.split_at(mid);
                Box::pin(self.flush_batch(left.to_vec(), metrics)).await?;
                Box::pin(self.flush_batch(right.to_vec(), metrics)).await?;
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, item = ?ordered.first().map(PipelineItem::type_tag), "isolated item failed to persist");
                Err(err)
            }
        }
    }

    async fn commit_batch(&self, items: &[PipelineItem]) -> Result<(), PipelineError> {
        let mut tx = self.pool.begin().await?;
        let mut keys = BatchKeyTable::default();

        for item in items {
            match item {
                PipelineItem::ArtistItem(artist) => {
                    let id = upsert_artist(&mut tx, artist).await?;
                    keys.artists.insert(artist.normalized_name.clone(), id);
                }
                PipelineItem::TrackItem(track) => {
                    let id = upsert_track(&mut tx, track).await?;
                    keys.tracks.insert(track.normalized_title.clone(), id);
                }
                PipelineItem::SetlistItem(setlist) => {
                    let id = upsert_setlist(&mut tx, setlist).await?;
                    keys.setlists.insert(setlist.normalized_name.clone(), id);
                }
                PipelineItem::SetlistTrackItem(row) => {
                    upsert_setlist_track(&mut tx, row, &keys).await?;
                }
                PipelineItem::TrackArtistItem(row) => {
                    upsert_track_artist(&mut tx, row, &keys).await?;
                }
                PipelineItem::AdjacencyItem(adjacency) => {
                    upsert_adjacency(&mut tx, adjacency).await?;
                }
            }
        }

        tx.commit().await?;
        Ok(())
    }
}

fn resolve(table: &HashMap<String, Uuid>, item_ref: &ItemRef, table_name: &'static str) -> Result<Uuid, PipelineError> {
    match item_ref {
        ItemRef::Resolved(id) => Ok(*id),
        ItemRef::ByNormalizedKey(key) => table.get(key).copied().ok_or_else(|| {
            PipelineError::PersistenceConflict {
                table: table_name.to_string(),
                detail: format!("no batch-local id for normalized key '{key}'"),
            }
        }),
    }
}

async fn upsert_artist(tx: &mut Transaction<'_, Postgres>, artist: &Artist) -> Result<Uuid, PipelineError> {
    let row: (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO artists (id, display_name, normalized_name, genres, country, platform_ids, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, now())
        ON CONFLICT (normalized_name) DO UPDATE SET
            display_name = COALESCE(EXCLUDED.display_name, artists.display_name),
            genres = CASE WHEN array_length(EXCLUDED.genres, 1) > 0 THEN EXCLUDED.genres ELSE artists.genres END,
            country = COALESCE(EXCLUDED.country, artists.country),
            platform_ids = artists.platform_ids || EXCLUDED.platform_ids,
            updated_at = now()
        RETURNING id
        "#,
    )
    .bind(artist.id)
    .bind(&artist.display_name)
    .bind(&artist.normalized_name)
    .bind(&artist.genres)
    .bind(&artist.country)
    .bind(&artist.platform_ids)
    .bind(artist.created_at)
    .fetch_one(&mut **tx)
    .await?;

    Ok(row.0)
}

/// Resolves a track upsert against the conflict-key priority order: ISRC
/// first, then a platform id, then `(normalized_title, primary_artist_id)`.
/// Matches scenario 4: inserting a second track sharing an ISRC merges into
/// the same row rather than creating a duplicate.
async fn upsert_track(tx: &mut Transaction<'_, Postgres>, track: &Track) -> Result<Uuid, PipelineError> {
    if let Some(isrc) = &track.isrc {
        if let Some(existing) = find_track_by_isrc(tx, isrc).await? {
            return merge_track(tx, existing, track).await;
        }
    }

    if let Some(existing) = find_track_by_platform_ids(tx, track).await? {
        return merge_track(tx, existing, track).await;
    }

    if let Some(existing) = find_track_by_title_and_artist(tx, track).await? {
        return merge_track(tx, existing, track).await;
    }

    let row: (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO tracks (
            id, title, normalized_title, primary_artist_id, bpm, musical_key, duration_ms,
            release_date, genre, original_genre, danceability, energy, valence, loudness_db,
            tempo, is_remix, is_mashup, is_live, is_cover, is_instrumental, is_explicit,
            isrc, musicbrainz_recording_id, platform_ids, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                $18, $19, $20, $21, $22, $23, $24, $25, now())
        RETURNING id
        "#,
    )
    .bind(track.id)
    .bind(&track.title)
    .bind(&track.normalized_title)
    .bind(track.primary_artist_id)
    .bind(track.bpm)
    .bind(&track.musical_key)
    .bind(track.duration_ms)
    .bind(track.release_date)
    .bind(&track.genre)
    .bind(&track.original_genre)
    .bind(track.danceability)
    .bind(track.energy)
    .bind(track.valence)
    .bind(track.loudness_db)
    .bind(track.tempo)
    .bind(track.is_remix)
    .bind(track.is_mashup)
    .bind(track.is_live)
    .bind(track.is_cover)
    .bind(track.is_instrumental)
    .bind(track.is_explicit)
    .bind(&track.isrc)
    .bind(&track.musicbrainz_recording_id)
    .bind(&track.platform_ids)
    .bind(track.created_at)
    .fetch_one(&mut **tx)
    .await?;

    Ok(row.0)
}

async fn find_track_by_isrc(tx: &mut Transaction<'_, Postgres>, isrc: &str) -> Result<Option<Uuid>, PipelineError> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM tracks WHERE isrc = $1")
        .bind(isrc)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row.map(|(id,)| id))
}

async fn find_track_by_platform_ids(tx: &mut Transaction<'_, Postgres>, track: &Track) -> Result<Option<Uuid>, PipelineError> {
    if track.platform_ids.0.is_empty() {
        return Ok(None);
    }
    let row: Option<(Uuid,)> = sqlx::query_as(
        "SELECT id FROM tracks WHERE platform_ids @> $1",
    )
    .bind(&track.platform_ids)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(row.map(|(id,)| id))
}

async fn find_track_by_title_and_artist(tx: &mut Transaction<'_, Postgres>, track: &Track) -> Result<Option<Uuid>, PipelineError> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        "SELECT id FROM tracks WHERE normalized_title = $1 AND primary_artist_id = $2",
    )
    .bind(&track.normalized_title)
    .bind(track.primary_artist_id)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(row.map(|(id,)| id))
}

/// Merges `incoming` into the existing row `existing_id`, preferring
/// non-null incoming values field by field and always bumping `updated_at`.
async fn merge_track(tx: &mut Transaction<'_, Postgres>, existing_id: Uuid, incoming: &Track) -> Result<Uuid, PipelineError> {
    let row: (Uuid,) = sqlx::query_as(
        r#"
        UPDATE tracks SET
            title = COALESCE($2, title),
            bpm = COALESCE($3, bpm),
            musical_key = COALESCE($4, musical_key),
            duration_ms = COALESCE($5, duration_ms),
            release_date = COALESCE($6, release_date),
            genre = COALESCE($7, genre),
            original_genre = COALESCE($8, original_genre),
            danceability = COALESCE($9, danceability),
            energy = COALESCE($10, energy),
            valence = COALESCE($11, valence),
            loudness_db = COALESCE($12, loudness_db),
            tempo = COALESCE($13, tempo),
            is_remix = is_remix OR $14,
            is_mashup = is_mashup OR $15,
            isrc = COALESCE(tracks.isrc, $16),
            musicbrainz_recording_id = COALESCE(tracks.musicbrainz_recording_id, $17),
            platform_ids = tracks.platform_ids || $18,
            updated_at = now()
        WHERE id = $1
        RETURNING id
        "#,
    )
    .bind(existing_id)
    .bind(&incoming.title)
    .bind(incoming.bpm)
    .bind(&incoming.musical_key)
    .bind(incoming.duration_ms)
    .bind(incoming.release_date)
    .bind(&incoming.genre)
    .bind(&incoming.original_genre)
    .bind(incoming.danceability)
    .bind(incoming.energy)
    .bind(incoming.valence)
    .bind(incoming.loudness_db)
    .bind(incoming.tempo)
    .bind(incoming.is_remix)
    .bind(incoming.is_mashup)
    .bind(&incoming.isrc)
    .bind(&incoming.musicbrainz_recording_id)
    .bind(&incoming.platform_ids)
    .fetch_one(&mut **tx)
    .await?;

    Ok(row.0)
}

async fn upsert_setlist(tx: &mut Transaction<'_, Postgres>, setlist: &Setlist) -> Result<Uuid, PipelineError> {
    let row: (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO setlists (
            id, display_name, normalized_name, source_id, event_date, venue,
            parsing_version, tracklist_count, scrape_error, last_scrape_attempt, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, now())
        ON CONFLICT (normalized_name, source_id) DO UPDATE SET
            tracklist_count = EXCLUDED.tracklist_count,
            scrape_error = EXCLUDED.scrape_error,
            last_scrape_attempt = EXCLUDED.last_scrape_attempt,
            venue = COALESCE(EXCLUDED.venue, setlists.venue),
            event_date = COALESCE(EXCLUDED.event_date, setlists.event_date),
            updated_at = now()
        RETURNING id
        "#,
    )
    .bind(setlist.id)
    .bind(&setlist.display_name)
    .bind(&setlist.normalized_name)
    .bind(&setlist.source_id)
    .bind(setlist.event_date)
    .bind(&setlist.venue)
    .bind(setlist.parsing_version)
    .bind(setlist.tracklist_count)
    .bind(&setlist.scrape_error)
    .bind(setlist.last_scrape_attempt)
    .fetch_one(&mut **tx)
    .await?;

    Ok(row.0)
}

async fn upsert_setlist_track(
    tx: &mut Transaction<'_, Postgres>,
    row: &SetlistTrackItem,
    keys: &BatchKeyTable,
) -> Result<(), PipelineError> {
    let setlist_id = resolve(&keys.setlists, &row.setlist_ref, "setlist_tracks")?;
    let track_id = resolve(&keys.tracks, &row.track_ref, "setlist_tracks")?;

    sqlx::query(
        r#"
        INSERT INTO setlist_tracks (setlist_id, track_id, position, timestamp_ms)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (setlist_id, position) DO UPDATE SET
            track_id = EXCLUDED.track_id,
            timestamp_ms = COALESCE(EXCLUDED.timestamp_ms, setlist_tracks.timestamp_ms)
        "#,
    )
    .bind(setlist_id)
    .bind(track_id)
    .bind(row.position)
    .bind(row.timestamp_ms)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn upsert_track_artist(
    tx: &mut Transaction<'_, Postgres>,
    row: &TrackArtistItem,
    keys: &BatchKeyTable,
) -> Result<(), PipelineError> {
    let track_id = resolve(&keys.tracks, &row.track_ref, "track_artists")?;
    let artist_id = resolve(&keys.artists, &row.artist_ref, "track_artists")?;

    sqlx::query(
        r#"
        INSERT INTO track_artists (track_id, artist_id, role, position)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (track_id, artist_id, role) DO UPDATE SET position = EXCLUDED.position
        "#,
    )
    .bind(track_id)
    .bind(artist_id)
    .bind(row.role)
    .bind(row.position)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Aggregates an incoming adjacency observation into the stored row via the
/// same count-weighted-mean recompute as `TrackAdjacency::merge`, matching
/// scenario 5.
async fn upsert_adjacency(tx: &mut Transaction<'_, Postgres>, incoming: &TrackAdjacency) -> Result<(), PipelineError> {
    let existing: Option<(i64, f64)> = sqlx::query_as(
        "SELECT occurrence_count, average_distance FROM track_adjacency WHERE track_a = $1 AND track_b = $2",
    )
    .bind(incoming.track_a)
    .bind(incoming.track_b)
    .fetch_optional(&mut **tx)
    .await?;

    let merged = match existing {
        Some((occurrence_count, average_distance)) => {
            let stored = TrackAdjacency {
                track_a: incoming.track_a,
                track_b: incoming.track_b,
                occurrence_count,
                average_distance,
            };
            stored.merge(incoming)
        }
        None => *incoming,
    };

    sqlx::query(
        r#"
        INSERT INTO track_adjacency (track_a, track_b, occurrence_count, average_distance)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (track_a, track_b) DO UPDATE SET
            occurrence_count = EXCLUDED.occurrence_count,
            average_distance = EXCLUDED.average_distance
        "#,
    )
    .bind(merged.track_a)
    .bind(merged.track_b)
    .bind(merged.occurrence_count)
    .bind(merged.average_distance)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
