use super::normalize;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Setlist {
    pub id: Uuid,
    pub display_name: String,
    pub normalized_name: String,
    pub source_id: String,
    pub event_date: Option<NaiveDate>,
    pub venue: Option<String>,
    pub parsing_version: i32,
    pub tracklist_count: i32,
    pub scrape_error: Option<String>,
    pub last_scrape_attempt: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Setlist {
    pub fn new(display_name: impl Into<String>, source_id: impl Into<String>) -> Self {
        let display_name = display_name.into();
        let normalized_name = normalize(&display_name);
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            display_name,
            normalized_name,
            source_id: source_id.into(),
            event_date: None,
            venue: None,
            parsing_version: 1,
            tracklist_count: 0,
            scrape_error: None,
            last_scrape_attempt: now,
            created_at: now,
            updated_at: now,
        }
    }

    /// The silent-failure invariant: a zero-count tracklist must carry a
    /// reason, or it is indistinguishable from a page that legitimately had
    /// no tracks extracted versus one the extractor choked on.
    pub fn violates_silent_failure_invariant(&self) -> bool {
        self.tracklist_count == 0 && self.scrape_error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_count_without_error_is_silent_failure() {
        let setlist = Setlist::new("Anjunabeats Radio", "setlistfm");
        assert!(setlist.violates_silent_failure_invariant());
    }

    #[test]
    fn zero_count_with_error_is_fine() {
        let mut setlist = Setlist::new("Anjunabeats Radio", "setlistfm");
        setlist.scrape_error = Some("extraction failed: no tracklist section found".to_string());
        assert!(!setlist.violates_silent_failure_invariant());
    }

    #[test]
    fn nonzero_count_without_error_is_fine() {
        let mut setlist = Setlist::new("Anjunabeats Radio", "setlistfm");
        setlist.tracklist_count = 12;
        assert!(!setlist.violates_silent_failure_invariant());
    }
}
