use super::normalize;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashMap;
use uuid::Uuid;

/// Per-platform id slots an artist may carry (Spotify, Apple Music, Tidal...).
pub type PlatformIds = HashMap<String, String>;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Artist {
    pub id: Uuid,
    pub display_name: String,
    pub normalized_name: String,
    pub genres: Vec<String>,
    /// ISO-3166 alpha-2 country code, e.g. "GB".
    pub country: Option<String>,
    pub platform_ids: sqlx::types::Json<PlatformIds>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Artist {
    pub fn new(display_name: impl Into<String>) -> Self {
        let display_name = display_name.into();
        let normalized_name = normalize(&display_name);
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            display_name,
            normalized_name,
            genres: Vec::new(),
            country: None,
            platform_ids: sqlx::types::Json(HashMap::new()),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Artist citations parsed out of a track-citation string come in one of two
/// forms, modeled as a tagged variant rather than an `Option<String>` so the
/// "id"/"id remix" sentinel is rejected structurally rather than by
/// convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtistCitation {
    Identified(String),
    Unidentified,
}

impl ArtistCitation {
    pub fn from_raw(raw: &str) -> Self {
        let normalized = normalize(raw);
        if super::is_unidentified_sentinel(&normalized) {
            ArtistCitation::Unidentified
        } else {
            ArtistCitation::Identified(raw.trim().to_string())
        }
    }

    pub fn is_identified(&self) -> bool {
        matches!(self, ArtistCitation::Identified(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_artist_normalizes_name() {
        let artist = Artist::new("Ilan Bluestone");
        assert_eq!(artist.normalized_name, "ilan bluestone");
    }

    #[test]
    fn citation_detects_sentinel() {
        assert_eq!(ArtistCitation::from_raw("ID"), ArtistCitation::Unidentified);
        assert_eq!(
            ArtistCitation::from_raw("Ilan Bluestone"),
            ArtistCitation::Identified("Ilan Bluestone".to_string())
        );
    }
}
