//! Cool-down queue: computes `retry_after` for an enrichment row that
//! couldn't be resolved this attempt, and the retry-attempt cap.
//!
//! `fixed` = 90 days constant; `exponential` = `90 * 2^(attempts-1)` days;
//! `adaptive` (default) = base 90 days (60 with a label hint, 45 if the
//! track is under 30 days old), multiplied by `(1 + 0.5 * attempts)`, capped
//! at 365 days, then jittered by a uniform `[0.9, 1.1]` factor.

use crate::models::{CooldownStrategy, MAX_RETRY_ATTEMPTS};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::Rng;

pub const BASE_COOLDOWN_DAYS: i64 = 90;
pub const LABEL_HINT_COOLDOWN_DAYS: i64 = 60;
pub const YOUNG_TRACK_COOLDOWN_DAYS: i64 = 45;
pub const YOUNG_TRACK_AGE_DAYS: i64 = 30;
pub const MAX_COOLDOWN_DAYS: i64 = 365;
pub const JITTER_MIN: f64 = 0.9;
pub const JITTER_MAX: f64 = 1.1;

#[derive(Debug, Clone, Copy)]
pub struct CooldownContext {
    pub has_label_hint: bool,
    pub track_age_days: i64,
}

/// Computes the unjittered cool-down duration in days for the given
/// strategy, attempt count, and context.
pub fn base_cooldown_days(strategy: CooldownStrategy, attempts: u32, ctx: CooldownContext) -> f64 {
    match strategy {
        CooldownStrategy::Fixed => BASE_COOLDOWN_DAYS as f64,
        CooldownStrategy::Exponential => {
            BASE_COOLDOWN_DAYS as f64 * 2f64.powi((attempts as i32 - 1).max(0))
        }
        CooldownStrategy::Adaptive => {
            let base = if ctx.has_label_hint {
                LABEL_HINT_COOLDOWN_DAYS
            } else if ctx.track_age_days < YOUNG_TRACK_AGE_DAYS {
                YOUNG_TRACK_COOLDOWN_DAYS
            } else {
                BASE_COOLDOWN_DAYS
            };
            let multiplier = 1.0 + 0.5 * attempts as f64;
            (base as f64 * multiplier).min(MAX_COOLDOWN_DAYS as f64)
        }
    }
}

/// Applies a uniform `[0.9, 1.1]` jitter factor to `days`.
fn jitter(days: f64) -> f64 {
    let factor = rand::thread_rng().gen_range(JITTER_MIN..=JITTER_MAX);
    days * factor
}

/// Computes `retry_after` for the next attempt, or `None` if
/// `attempts >= MAX_RETRY_ATTEMPTS` (the row should be marked permanently
/// failed instead of re-queued).
pub fn next_retry_after(
    strategy: CooldownStrategy,
    attempts: u32,
    ctx: CooldownContext,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    if attempts >= MAX_RETRY_ATTEMPTS as u32 {
        return None;
    }

    let days = jitter(base_cooldown_days(strategy, attempts, ctx));
    Some(now + ChronoDuration::milliseconds((days * 86_400_000.0) as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_7_adaptive_cooldown_window() {
        let ctx = CooldownContext {
            has_label_hint: true,
            track_age_days: 10,
        };
        let base = base_cooldown_days(CooldownStrategy::Adaptive, 2, ctx);
        assert!((base - 120.0).abs() < 1e-9);

        for _ in 0..200 {
            let jittered = jitter(base);
            assert!(jittered >= 108.0 - 1e-6 && jittered <= 132.0 + 1e-6);
        }
    }

    #[test]
    fn fixed_strategy_is_constant() {
        let ctx = CooldownContext { has_label_hint: false, track_age_days: 400 };
        assert_eq!(base_cooldown_days(CooldownStrategy::Fixed, 1, ctx), 90.0);
        assert_eq!(base_cooldown_days(CooldownStrategy::Fixed, 4, ctx), 90.0);
    }

    #[test]
    fn exponential_strategy_doubles_per_attempt() {
        let ctx = CooldownContext { has_label_hint: false, track_age_days: 400 };
        assert_eq!(base_cooldown_days(CooldownStrategy::Exponential, 1, ctx), 90.0);
        assert_eq!(base_cooldown_days(CooldownStrategy::Exponential, 2, ctx), 180.0);
        assert_eq!(base_cooldown_days(CooldownStrategy::Exponential, 3, ctx), 360.0);
    }

    #[test]
    fn adaptive_cooldown_is_capped() {
        let ctx = CooldownContext { has_label_hint: false, track_age_days: 400 };
        let days = base_cooldown_days(CooldownStrategy::Adaptive, 20, ctx);
        assert_eq!(days, MAX_COOLDOWN_DAYS as f64);
    }

    #[test]
    fn attempts_at_cap_yield_no_retry() {
        let ctx = CooldownContext { has_label_hint: false, track_age_days: 400 };
        let result = next_retry_after(CooldownStrategy::Adaptive, 5, ctx, Utc::now());
        assert!(result.is_none());
    }
}
