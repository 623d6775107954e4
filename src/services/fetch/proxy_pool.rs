//! Egress pool with health/cooldown bookkeeping.
//!
//! Not grounded on a retrieved teacher file directly (no proxy pool was
//! retrieved); modeled on `rate_limiting.rs`'s mutex-guarded per-key state map
//! and cooldown bookkeeping style.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use std::sync::Arc;

const DIRTY_AFTER_CONSECUTIVE_FAILURES: u32 = 3;
const DEFAULT_COOLDOWN_MINUTES: i64 = 10;

#[derive(Debug, Clone)]
pub struct Egress {
    pub id: String,
    pub address: String,
    pub consecutive_failures: u32,
    pub last_failure_reason: Option<String>,
    pub cooldown_until: Option<DateTime<Utc>>,
    pub successes: u64,
    pub attempts: u64,
}

impl Egress {
    fn new(id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            consecutive_failures: 0,
            last_failure_reason: None,
            cooldown_until: None,
            successes: 0,
            attempts: 0,
        }
    }

    fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            1.0
        } else {
            self.successes as f64 / self.attempts as f64
        }
    }

    fn is_healthy(&self, now: DateTime<Utc>) -> bool {
        self.cooldown_until.map_or(true, |until| now >= until)
    }
}

/// Pool of egress points. Selection weights success rate with an LRU tiebreak
/// among equally-successful candidates; exhaustion (no healthy egress) is a
/// fail-fast condition surfaced to the caller, never a silent stall.
pub struct ProxyPool {
    egresses: Arc<DashMap<String, Egress>>,
    order: std::sync::Mutex<Vec<String>>,
    cooldown: ChronoDuration,
}

#[derive(Debug, thiserror::Error)]
pub enum ProxyPoolError {
    #[error("no healthy egress available")]
    Exhausted,
}

impl ProxyPool {
    pub fn new(addresses: Vec<(String, String)>) -> Self {
        let egresses = Arc::new(DashMap::new());
        let mut order = Vec::with_capacity(addresses.len());
        for (id, address) in addresses {
            order.push(id.clone());
            egresses.insert(id.clone(), Egress::new(id, address));
        }

        Self {
            egresses,
            order: std::sync::Mutex::new(order),
            cooldown: ChronoDuration::minutes(DEFAULT_COOLDOWN_MINUTES),
        }
    }

    /// Selects the healthiest egress, rotating the LRU order on each pick so
    /// equally-successful candidates are round-robined.
    pub fn select(&self) -> Result<Egress, ProxyPoolError> {
        let now = Utc::now();
        let order = self.order.lock().unwrap();

        let mut best: Option<(usize, Egress)> = None;
        for (idx, id) in order.iter().enumerate() {
            let Some(entry) = self.egresses.get(id) else { continue };
            if !entry.is_healthy(now) {
                continue;
            }
            let candidate = entry.clone();
            match &best {
                Some((_, current)) if current.success_rate() >= candidate.success_rate() => {}
                _ => best = Some((idx, candidate)),
            }
        }

        best.map(|(_, egress)| egress).ok_or(ProxyPoolError::Exhausted)
    }

    pub fn record_success(&self, id: &str) {
        if let Some(mut entry) = self.egresses.get_mut(id) {
            entry.attempts += 1;
            entry.successes += 1;
            entry.consecutive_failures = 0;
        }
    }

    /// Records a failure; marks the egress dirty (cooldown applied) once
    /// `consecutive_failures` reaches the threshold, or immediately on a
    /// detected challenge or a 403.
    pub fn record_failure(&self, id: &str, reason: &str, force_dirty: bool) {
        if let Some(mut entry) = self.egresses.get_mut(id) {
            entry.attempts += 1;
            entry.consecutive_failures += 1;
            entry.last_failure_reason = Some(reason.to_string());

            if force_dirty || entry.consecutive_failures >= DIRTY_AFTER_CONSECUTIVE_FAILURES {
                entry.cooldown_until = Some(Utc::now() + self.cooldown);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.egresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.egresses.is_empty()
    }

    /// Background health-check: clears cooldowns that have elapsed. Intended
    /// to run on a periodic interval; a no-op reset does not unset
    /// `last_failure_reason`, only the cooldown gate.
    pub fn sweep_expired_cooldowns(&self) {
        let now = Utc::now();
        for mut entry in self.egresses.iter_mut() {
            if let Some(until) = entry.cooldown_until {
                if now >= until {
                    entry.cooldown_until = None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> ProxyPool {
        ProxyPool::new(vec![
            ("a".into(), "10.0.0.1".into()),
            ("b".into(), "10.0.0.2".into()),
        ])
    }

    #[test]
    fn selects_a_healthy_egress() {
        let pool = pool();
        assert!(pool.select().is_ok());
    }

    #[test]
    fn third_consecutive_failure_marks_dirty() {
        let pool = pool();
        pool.record_failure("a", "timeout", false);
        pool.record_failure("a", "timeout", false);
        pool.record_failure("a", "timeout", false);
        let entry = pool.egresses.get("a").unwrap();
        assert!(entry.cooldown_until.is_some());
    }

    #[test]
    fn exhaustion_is_an_explicit_error_not_a_stall() {
        let pool = ProxyPool::new(vec![("only".into(), "10.0.0.1".into())]);
        pool.record_failure("only", "challenge", true);
        assert!(matches!(pool.select(), Err(ProxyPoolError::Exhausted)));
    }

    #[test]
    fn success_resets_consecutive_failure_count() {
        let pool = pool();
        pool.record_failure("a", "timeout", false);
        pool.record_failure("a", "timeout", false);
        pool.record_success("a");
        let entry = pool.egresses.get("a").unwrap();
        assert_eq!(entry.consecutive_failures, 0);
    }
}
