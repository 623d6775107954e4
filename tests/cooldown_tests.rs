//! Black-box coverage of the cool-down strategies via the public resolver API.

use chrono::Utc;
use trackgraph_pipeline::models::CooldownStrategy;
use trackgraph_pipeline::services::resolver::{base_cooldown_days, next_retry_after, CooldownContext};

#[test]
fn scenario_7_adaptive_cooldown_window_with_label_hint() {
    let ctx = CooldownContext { has_label_hint: true, track_age_days: 10 };
    let base = base_cooldown_days(CooldownStrategy::Adaptive, 2, ctx);
    assert!((base - 120.0).abs() < 1e-9);

    for _ in 0..500 {
        let retry_after = next_retry_after(CooldownStrategy::Adaptive, 2, ctx, Utc::now()).unwrap();
        let days = (retry_after - Utc::now()).num_milliseconds() as f64 / 86_400_000.0;
        assert!(days >= 108.0 * 0.99 && days <= 132.0 * 1.01);
    }
}

#[test]
fn young_untouched_track_gets_the_shortest_adaptive_base() {
    let ctx = CooldownContext { has_label_hint: false, track_age_days: 5 };
    let base = base_cooldown_days(CooldownStrategy::Adaptive, 0, ctx);
    assert!((base - 45.0).abs() < 1e-9);
}

#[test]
fn fixed_strategy_ignores_attempt_count() {
    let ctx = CooldownContext { has_label_hint: false, track_age_days: 365 };
    assert_eq!(base_cooldown_days(CooldownStrategy::Fixed, 0, ctx), 90.0);
    assert_eq!(base_cooldown_days(CooldownStrategy::Fixed, 4, ctx), 90.0);
}

#[test]
fn retries_at_the_cap_are_not_requeued() {
    let ctx = CooldownContext { has_label_hint: false, track_age_days: 365 };
    assert!(next_retry_after(CooldownStrategy::Exponential, 5, ctx, Utc::now()).is_none());
    assert!(next_retry_after(CooldownStrategy::Exponential, 4, ctx, Utc::now()).is_some());
}
