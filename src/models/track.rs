use super::normalize;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Audio feature ranges are documented here rather than enforced only in
/// validation, so a caller constructing a `Track` directly sees the contract.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AudioFeatures {
    /// [0, 1]
    pub danceability: Option<f64>,
    /// [0, 1]
    pub energy: Option<f64>,
    /// [0, 1]
    pub valence: Option<f64>,
    /// Typically in [-60, 0] dB.
    pub loudness_db: Option<f64>,
    /// Independently sourced tempo estimate; may disagree with `Track::bpm`.
    pub tempo: Option<f64>,
}

impl AudioFeatures {
    pub fn empty() -> Self {
        Self {
            danceability: None,
            energy: None,
            valence: None,
            loudness_db: None,
            tempo: None,
        }
    }

    /// True if every present field is within its documented range.
    pub fn is_within_documented_ranges(&self) -> bool {
        let in_unit = |v: Option<f64>| v.map_or(true, |v| (0.0..=1.0).contains(&v));
        let loudness_ok = self.loudness_db.map_or(true, |v| (-60.0..=0.0).contains(&v));

        in_unit(self.danceability) && in_unit(self.energy) && in_unit(self.valence) && loudness_ok
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Track {
    pub id: Uuid,
    pub title: String,
    pub normalized_title: String,
    pub primary_artist_id: Uuid,
    /// 60-200 inclusive.
    pub bpm: Option<i32>,
    pub musical_key: Option<String>,
    pub duration_ms: Option<i32>,
    pub release_date: Option<NaiveDate>,
    pub genre: Option<String>,
    pub original_genre: Option<String>,
    pub danceability: Option<f64>,
    pub energy: Option<f64>,
    pub valence: Option<f64>,
    pub loudness_db: Option<f64>,
    pub tempo: Option<f64>,
    pub is_remix: bool,
    pub is_mashup: bool,
    pub is_live: bool,
    pub is_cover: bool,
    pub is_instrumental: bool,
    pub is_explicit: bool,
    pub isrc: Option<String>,
    pub musicbrainz_recording_id: Option<String>,
    pub platform_ids: sqlx::types::Json<std::collections::HashMap<String, String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Track {
    pub fn new(title: impl Into<String>, primary_artist_id: Uuid) -> Self {
        let title = title.into();
        let normalized_title = normalize(&title);
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title,
            normalized_title,
            primary_artist_id,
            bpm: None,
            musical_key: None,
            duration_ms: None,
            release_date: None,
            genre: None,
            original_genre: None,
            danceability: None,
            energy: None,
            valence: None,
            loudness_db: None,
            tempo: None,
            is_remix: false,
            is_mashup: false,
            is_live: false,
            is_cover: false,
            is_instrumental: false,
            is_explicit: false,
            isrc: None,
            musicbrainz_recording_id: None,
            platform_ids: sqlx::types::Json(std::collections::HashMap::new()),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn audio_features(&self) -> AudioFeatures {
        AudioFeatures {
            danceability: self.danceability,
            energy: self.energy,
            valence: self.valence,
            loudness_db: self.loudness_db,
            tempo: self.tempo,
        }
    }

    pub fn set_audio_features(&mut self, features: AudioFeatures) {
        self.danceability = features.danceability;
        self.energy = features.energy;
        self.valence = features.valence;
        self.loudness_db = features.loudness_db;
        self.tempo = features.tempo;
    }

    pub fn bpm_in_range(&self) -> bool {
        self.bpm.map_or(true, |b| (60..=200).contains(&b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_track_normalizes_title() {
        let track = Track::new("Frozen Ground", Uuid::new_v4());
        assert_eq!(track.normalized_title, "frozen ground");
    }

    #[test]
    fn bpm_range_check() {
        let mut track = Track::new("t", Uuid::new_v4());
        track.bpm = Some(128);
        assert!(track.bpm_in_range());
        track.bpm = Some(40);
        assert!(!track.bpm_in_range());
    }

    #[test]
    fn audio_feature_range_check() {
        let mut features = AudioFeatures::empty();
        features.danceability = Some(0.5);
        assert!(features.is_within_documented_ranges());
        features.danceability = Some(1.5);
        assert!(!features.is_within_documented_ranges());
    }
}
