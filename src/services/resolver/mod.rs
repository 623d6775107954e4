pub mod circuit_breaker;
pub mod cooldown;
pub mod tier0_label_hunter;
pub mod tier1_internal_lookup;
pub mod tier2_external_apis;
pub mod tier2plus_cooccurrence;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerState};
pub use cooldown::{base_cooldown_days, next_retry_after, CooldownContext};
pub use tier0_label_hunter::{parse_bracket_hint, LabelHint, LabelHintSource};
pub use tier1_internal_lookup::InternalCatalogSnapshot;
pub use tier2_external_apis::{ExternalApiCache, ExternalMatch, ExternalResolverClient, LookupContext};
pub use tier2plus_cooccurrence::{classify, FeatureVector, FellegiSunterModel, MatchConfidence};

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::PipelineError;
use crate::metrics::MetricsCollector;
use crate::models::{CooldownStrategy, EnrichmentStatus, EnrichmentStatusKind, MAX_RETRY_ATTEMPTS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverTier {
    Tier0LabelHunter,
    Tier1Internal,
    Tier2External,
    Tier2PlusCooccurrence,
}

impl ResolverTier {
    fn label(self) -> &'static str {
        match self {
            Self::Tier0LabelHunter => "tier0",
            Self::Tier1Internal => "tier1",
            Self::Tier2External => "tier2",
            Self::Tier2PlusCooccurrence => "tier2plus",
        }
    }
}

#[derive(Debug, Clone)]
pub enum ResolverOutcome {
    /// Confidence cleared the auto-accept threshold; ready to persist.
    Resolved { artist_id: Option<Uuid>, label: Option<String>, confidence: f64, tier: ResolverTier },
    /// Confidence landed in the review band; tagged for a human, not
    /// written back automatically.
    NeedsReview { confidence: f64, tier: ResolverTier },
    /// No tier produced a usable match; re-queued via the cool-down queue.
    Deferred { retry_after: DateTime<Utc> },
    /// `retry_attempts` has hit the cap; this row will not be retried again.
    PermanentlyFailed,
}

fn record_attempt(metrics: &MetricsCollector, tier: ResolverTier, outcome: &str) {
    metrics
        .resolver_tier_attempts_total
        .with_label_values(&[tier.label(), outcome])
        .inc();
}

/// Drives one enrichment attempt through tiers 0-2+, stopping at the first
/// hit that clears `auto_accept_threshold`. A hit between `review_threshold`
/// and `auto_accept_threshold` is surfaced as `NeedsReview` rather than
/// continuing to cheaper-confidence tiers, since a later tier is not
/// expected to beat an already-plausible match.
pub struct Resolver {
    pub circuit_breaker: CircuitBreaker,
    pub auto_accept_threshold: f64,
    pub review_threshold: f64,
    pub max_retry_attempts: u32,
}

impl Resolver {
    pub fn new(auto_accept_threshold: f64, review_threshold: f64, max_retry_attempts: u32) -> Self {
        Self {
            circuit_breaker: CircuitBreaker::new(),
            auto_accept_threshold,
            review_threshold,
            max_retry_attempts,
        }
    }

    fn classify_hint(&self, tier: ResolverTier, confidence: f64) -> Option<(f64, ResolverTier, bool)> {
        if confidence >= self.auto_accept_threshold {
            Some((confidence, tier, true))
        } else if confidence >= self.review_threshold {
            Some((confidence, tier, false))
        } else {
            None
        }
    }

    /// Attempts tier 0 (bracket parse) then tier 1 (internal lookup); both
    /// are synchronous and local, so they're always tried before any network
    /// call.
    pub fn resolve_local(
        &self,
        metrics: &MetricsCollector,
        title: &str,
        artist_normalized_name: &str,
        snapshot: &InternalCatalogSnapshot,
    ) -> Option<ResolverOutcome> {
        if let Some(hint) = parse_bracket_hint(title) {
            record_attempt(metrics, ResolverTier::Tier0LabelHunter, "hit");
            if let Some((confidence, tier, accepted)) =
                self.classify_hint(ResolverTier::Tier0LabelHunter, hint.confidence)
            {
                return Some(if accepted {
                    ResolverOutcome::Resolved { artist_id: None, label: Some(hint.label), confidence, tier }
                } else {
                    ResolverOutcome::NeedsReview { confidence, tier }
                });
            }
        } else {
            record_attempt(metrics, ResolverTier::Tier0LabelHunter, "miss");
        }

        if let Some(hint) = tier1_internal_lookup::lookup_label(snapshot, artist_normalized_name) {
            record_attempt(metrics, ResolverTier::Tier1Internal, "hit");
            return Some(ResolverOutcome::Resolved {
                artist_id: None,
                label: Some(hint.label),
                confidence: hint.confidence,
                tier: ResolverTier::Tier1Internal,
            });
        }
        record_attempt(metrics, ResolverTier::Tier1Internal, "miss");

        None
    }

    /// Tier 2 external waterfall, guarded by the per-provider circuit
    /// breaker. Run only if `resolve_local` found nothing usable.
    pub async fn resolve_external(
        &self,
        metrics: &MetricsCollector,
        client: &dyn ExternalResolverClient,
        cache: &ExternalApiCache,
        ctx: &LookupContext,
    ) -> Result<Option<ResolverOutcome>, PipelineError> {
        let provider = "tier2_external_apis";
        let result = self
            .circuit_breaker
            .execute(provider, || tier2_external_apis::resolve(client, cache, ctx))
            .await?;

        match result {
            Some(m) => {
                record_attempt(metrics, ResolverTier::Tier2External, "hit");
                Ok(self.classify_hint(ResolverTier::Tier2External, m.confidence).map(
                    |(confidence, tier, accepted)| {
                        if accepted {
                            ResolverOutcome::Resolved { artist_id: m.artist_id, label: m.label, confidence, tier }
                        } else {
                            ResolverOutcome::NeedsReview { confidence, tier }
                        }
                    },
                ))
            }
            None => {
                record_attempt(metrics, ResolverTier::Tier2External, "miss");
                Ok(None)
            }
        }
    }

    /// Tier 2+ co-occurrence scoring, run only once every deterministic tier
    /// has missed.
    pub fn resolve_cooccurrence(
        &self,
        metrics: &MetricsCollector,
        model: &FellegiSunterModel,
        candidate_artist_id: Uuid,
        features: &FeatureVector,
    ) -> ResolverOutcome {
        let confidence = model.posterior(features);
        match classify(confidence) {
            MatchConfidence::Accept => {
                record_attempt(metrics, ResolverTier::Tier2PlusCooccurrence, "hit");
                ResolverOutcome::Resolved {
                    artist_id: Some(candidate_artist_id),
                    label: None,
                    confidence,
                    tier: ResolverTier::Tier2PlusCooccurrence,
                }
            }
            MatchConfidence::Medium => {
                record_attempt(metrics, ResolverTier::Tier2PlusCooccurrence, "review");
                ResolverOutcome::NeedsReview { confidence, tier: ResolverTier::Tier2PlusCooccurrence }
            }
            MatchConfidence::Reject => {
                record_attempt(metrics, ResolverTier::Tier2PlusCooccurrence, "miss");
                ResolverOutcome::Deferred { retry_after: Utc::now() }
            }
        }
    }

    /// Computes the cool-down outcome for a row every tier missed on:
    /// `PermanentlyFailed` once `retry_attempts` hits the cap, else
    /// `Deferred` with the next `retry_after`.
    pub fn defer(
        &self,
        strategy: CooldownStrategy,
        retry_attempts: u32,
        cooldown_ctx: CooldownContext,
    ) -> ResolverOutcome {
        match next_retry_after(strategy, retry_attempts, cooldown_ctx, Utc::now()) {
            Some(retry_after) => ResolverOutcome::Deferred { retry_after },
            None => ResolverOutcome::PermanentlyFailed,
        }
    }
}

async fn upsert_enrichment_status(
    tx: &mut Transaction<'_, Postgres>,
    status: &EnrichmentStatus,
) -> Result<(), PipelineError> {
    sqlx::query(
        r#"
        INSERT INTO enrichment_status
            (track_id, status, retry_after, retry_attempts, cooldown_strategy, sources_used, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, now())
        ON CONFLICT (track_id) DO UPDATE SET
            status = EXCLUDED.status,
            retry_after = EXCLUDED.retry_after,
            retry_attempts = EXCLUDED.retry_attempts,
            cooldown_strategy = EXCLUDED.cooldown_strategy,
            sources_used = EXCLUDED.sources_used,
            updated_at = now()
        "#,
    )
    .bind(status.track_id)
    .bind(status.status)
    .bind(status.retry_after)
    .bind(status.retry_attempts)
    .bind(status.cooldown_strategy)
    .bind(&status.sources_used)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Merges a resolved artist/label back onto the track row. `label` lands in
/// `platform_ids` (the track's only free-form metadata bucket) since tracks
/// carry no dedicated label column; `artist_id` only overwrites
/// `primary_artist_id` when the resolver actually produced one.
async fn update_track_from_resolution(
    tx: &mut Transaction<'_, Postgres>,
    track_id: Uuid,
    artist_id: Option<Uuid>,
    label: Option<&str>,
) -> Result<(), PipelineError> {
    sqlx::query(
        r#"
        UPDATE tracks SET
            primary_artist_id = COALESCE($2, primary_artist_id),
            platform_ids = CASE
                WHEN $3::text IS NOT NULL THEN platform_ids || jsonb_build_object('label', $3::text)
                ELSE platform_ids
            END,
            updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(track_id)
    .bind(artist_id)
    .bind(label)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Persists one resolver pass: writes `enrichment_status` and, when the
/// outcome resolved a label or artist, updates the Track record in the same
/// transaction.
pub async fn apply_outcome(
    pool: &PgPool,
    track_id: Uuid,
    outcome: &ResolverOutcome,
    strategy: CooldownStrategy,
    attempts_before: u32,
    sources_used: Vec<String>,
) -> Result<(), PipelineError> {
    let mut tx = pool.begin().await?;

    let status = match outcome {
        ResolverOutcome::Resolved { artist_id, label, .. } => {
            update_track_from_resolution(&mut tx, track_id, *artist_id, label.as_deref()).await?;
            EnrichmentStatus {
                track_id,
                status: EnrichmentStatusKind::Completed,
                retry_after: None,
                retry_attempts: attempts_before as i32,
                cooldown_strategy: strategy,
                sources_used,
                updated_at: Utc::now(),
            }
        }
        ResolverOutcome::NeedsReview { .. } => EnrichmentStatus {
            track_id,
            status: EnrichmentStatusKind::Pending,
            retry_after: None,
            retry_attempts: attempts_before as i32,
            cooldown_strategy: strategy,
            sources_used,
            updated_at: Utc::now(),
        },
        ResolverOutcome::Deferred { retry_after } => EnrichmentStatus {
            track_id,
            status: EnrichmentStatusKind::PendingReEnrichment,
            retry_after: Some(*retry_after),
            retry_attempts: attempts_before as i32 + 1,
            cooldown_strategy: strategy,
            sources_used,
            updated_at: Utc::now(),
        },
        ResolverOutcome::PermanentlyFailed => EnrichmentStatus {
            track_id,
            status: EnrichmentStatusKind::Failed,
            retry_after: None,
            retry_attempts: MAX_RETRY_ATTEMPTS,
            cooldown_strategy: strategy,
            sources_used,
            updated_at: Utc::now(),
        },
    };

    upsert_enrichment_status(&mut tx, &status).await?;
    tx.commit().await?;
    Ok(())
}

/// Resets rows whose cool-down has elapsed back to `pending` so the next
/// orchestrator pass re-queues them through the resolver. Returns the
/// track ids that were reset.
pub async fn requeue_eligible(pool: &PgPool) -> Result<Vec<Uuid>, PipelineError> {
    let rows: Vec<(Uuid,)> = sqlx::query_as(
        r#"
        UPDATE enrichment_status
        SET status = 'pending', retry_after = NULL, updated_at = now()
        WHERE status = 'pending_re_enrichment' AND retry_after <= now()
        RETURNING track_id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Periodic cool-down requeue worker: on every tick, resets eligible
/// `pending_re_enrichment` rows back to `pending`. Runs until the process
/// is torn down; grounded on the orchestrator's own `tokio::select!`-driven
/// interval loop in `main.rs`.
pub async fn run_requeue_worker(pool: PgPool, poll_interval: std::time::Duration) {
    let mut tick = tokio::time::interval(poll_interval);
    loop {
        tick.tick().await;
        match requeue_eligible(&pool).await {
            Ok(requeued) if !requeued.is_empty() => {
                tracing::info!(count = requeued.len(), "requeued cool-down rows for re-enrichment");
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(error = %err, "cool-down requeue pass failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> MetricsCollector {
        MetricsCollector::new().unwrap()
    }

    #[test]
    fn tier0_bracket_hit_within_review_band_is_needs_review() {
        let resolver = Resolver::new(0.85, 0.70, 5);
        let snapshot = InternalCatalogSnapshot::default();
        let outcome = resolver
            .resolve_local(&metrics(), "Frozen Ground [Anjunabeats]", "above & beyond", &snapshot)
            .unwrap();
        assert!(matches!(outcome, ResolverOutcome::NeedsReview { tier: ResolverTier::Tier0LabelHunter, .. }));
    }

    #[test]
    fn tier1_hit_is_resolved_outright() {
        let resolver = Resolver::new(0.85, 0.70, 5);
        let mut snapshot = InternalCatalogSnapshot::default();
        snapshot.artist_labels.insert("above & beyond".to_string(), "Anjunabeats".to_string());

        let outcome = resolver.resolve_local(&metrics(), "Frozen Ground", "above & beyond", &snapshot).unwrap();
        assert!(matches!(outcome, ResolverOutcome::Resolved { tier: ResolverTier::Tier1Internal, .. }));
    }

    #[test]
    fn no_local_hit_returns_none() {
        let resolver = Resolver::new(0.85, 0.70, 5);
        let snapshot = InternalCatalogSnapshot::default();
        assert!(resolver.resolve_local(&metrics(), "Frozen Ground", "nobody", &snapshot).is_none());
    }

    #[test]
    fn exhausted_retries_are_permanently_failed() {
        let resolver = Resolver::new(0.85, 0.70, 5);
        let ctx = CooldownContext { has_label_hint: false, track_age_days: 100 };
        let outcome = resolver.defer(CooldownStrategy::Adaptive, 5, ctx);
        assert!(matches!(outcome, ResolverOutcome::PermanentlyFailed));
    }

    #[test]
    fn under_cap_retries_get_deferred_with_a_retry_after() {
        let resolver = Resolver::new(0.85, 0.70, 5);
        let ctx = CooldownContext { has_label_hint: false, track_age_days: 100 };
        let outcome = resolver.defer(CooldownStrategy::Fixed, 1, ctx);
        assert!(matches!(outcome, ResolverOutcome::Deferred { .. }));
    }
}
