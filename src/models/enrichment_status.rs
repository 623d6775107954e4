use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum EnrichmentStatusKind {
    Pending,
    Completed,
    Failed,
    PendingReEnrichment,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum CooldownStrategy {
    Fixed,
    Exponential,
    Adaptive,
}

pub const MAX_RETRY_ATTEMPTS: i32 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EnrichmentStatus {
    pub track_id: Uuid,
    pub status: EnrichmentStatusKind,
    pub retry_after: Option<DateTime<Utc>>,
    pub retry_attempts: i32,
    pub cooldown_strategy: CooldownStrategy,
    pub sources_used: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl EnrichmentStatus {
    pub fn new(track_id: Uuid) -> Self {
        Self {
            track_id,
            status: EnrichmentStatusKind::Pending,
            retry_after: None,
            retry_attempts: 0,
            cooldown_strategy: CooldownStrategy::Adaptive,
            sources_used: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// The invariant that `retry_attempts == MAX_RETRY_ATTEMPTS` implies the
    /// row is in the terminal `Failed` state.
    pub fn attempts_exhausted(&self) -> bool {
        self.retry_attempts >= MAX_RETRY_ATTEMPTS
    }

    pub fn satisfies_retry_cap_invariant(&self) -> bool {
        self.retry_attempts <= MAX_RETRY_ATTEMPTS
            && (!self.attempts_exhausted() || self.status == EnrichmentStatusKind::Failed)
    }
}
