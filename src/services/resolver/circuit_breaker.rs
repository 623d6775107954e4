//! Circuit breaker for resolver tier-2 external APIs.
//!
//! Ported from the provider-API circuit breaker: same closed/open/half-open
//! state machine, same `can_proceed`/`record_success`/`record_failure`/`execute`
//! shape, but half-open close requires 2 consecutive successes (not 3), and
//! state is reported through this crate's `circuit_breaker_state` gauge
//! instead of registering a second copy of the metric.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::metrics::MetricsCollector;

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub failure_window_seconds: u64,
    pub open_timeout_seconds: u64,
    pub half_open_success_threshold: u32,
    pub half_open_test_interval_seconds: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            failure_window_seconds: 60,
            open_timeout_seconds: 60,
            half_open_success_threshold: 2,
            half_open_test_interval_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitBreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitBreakerState {
    fn gauge_value(self) -> f64 {
        match self {
            Self::Closed => 0.0,
            Self::HalfOpen => 1.0,
            Self::Open => 2.0,
        }
    }
}

#[derive(Debug)]
struct CircuitState {
    state: CircuitBreakerState,
    failure_timestamps: Vec<Instant>,
    opened_at: Option<Instant>,
    last_half_open_test: Option<Instant>,
    half_open_successes: u32,
}

impl Default for CircuitState {
    fn default() -> Self {
        Self {
            state: CircuitBreakerState::Closed,
            failure_timestamps: Vec::new(),
            opened_at: None,
            last_half_open_test: None,
            half_open_successes: 0,
        }
    }
}

/// Per-provider circuit breaker for tier-2 external resolver calls
/// (Spotify, MusicBrainz, label-catalog, popularity/tags).
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    circuits: Arc<RwLock<HashMap<String, CircuitState>>>,
    metrics: Option<MetricsCollector>,
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self {
            config: CircuitBreakerConfig::default(),
            circuits: Arc::new(RwLock::new(HashMap::new())),
            metrics: None,
        }
    }

    pub fn with_config(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            circuits: Arc::new(RwLock::new(HashMap::new())),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: MetricsCollector) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn report_state(&self, provider: &str, state: CircuitBreakerState) {
        if let Some(metrics) = &self.metrics {
            metrics
                .circuit_breaker_state
                .with_label_values(&[provider])
                .set(state.gauge_value());
        }
    }

    pub async fn get_state(&self, provider: &str) -> CircuitBreakerState {
        let circuits = self.circuits.read().await;
        circuits.get(provider).map(|c| c.state).unwrap_or(CircuitBreakerState::Closed)
    }

    pub async fn can_proceed(&self, provider: &str) -> bool {
        let mut circuits = self.circuits.write().await;
        let circuit = circuits.entry(provider.to_string()).or_insert_with(CircuitState::default);
        let now = Instant::now();

        match circuit.state {
            CircuitBreakerState::Closed => true,
            CircuitBreakerState::Open => {
                if let Some(opened_at) = circuit.opened_at {
                    if now.duration_since(opened_at).as_secs() >= self.config.open_timeout_seconds {
                        info!(provider, "circuit breaker transitioning to half-open");
                        circuit.state = CircuitBreakerState::HalfOpen;
                        circuit.half_open_successes = 0;
                        circuit.last_half_open_test = Some(now);
                        self.report_state(provider, CircuitBreakerState::HalfOpen);
                        return true;
                    }
                }
                false
            }
            CircuitBreakerState::HalfOpen => circuit.last_half_open_test.map_or(true, |last| {
                now.duration_since(last).as_secs() >= self.config.half_open_test_interval_seconds
            }),
        }
    }

    pub async fn record_success(&self, provider: &str) {
        let mut circuits = self.circuits.write().await;
        let circuit = circuits.entry(provider.to_string()).or_insert_with(CircuitState::default);

        match circuit.state {
            CircuitBreakerState::Closed => circuit.failure_timestamps.clear(),
            CircuitBreakerState::HalfOpen => {
                circuit.half_open_successes += 1;
                if circuit.half_open_successes >= self.config.half_open_success_threshold {
                    info!(provider, "circuit breaker closing after half-open successes");
                    circuit.state = CircuitBreakerState::Closed;
                    circuit.failure_timestamps.clear();
                    circuit.opened_at = None;
                    circuit.half_open_successes = 0;
                    self.report_state(provider, CircuitBreakerState::Closed);
                }
            }
            CircuitBreakerState::Open => {
                circuit.state = CircuitBreakerState::Closed;
                circuit.failure_timestamps.clear();
                circuit.opened_at = None;
                self.report_state(provider, CircuitBreakerState::Closed);
            }
        }
    }

    pub async fn record_failure(&self, provider: &str) {
        let mut circuits = self.circuits.write().await;
        let circuit = circuits.entry(provider.to_string()).or_insert_with(CircuitState::default);
        let now = Instant::now();

        match circuit.state {
            CircuitBreakerState::Closed => {
                circuit.failure_timestamps.push(now);
                let window = Duration::from_secs(self.config.failure_window_seconds);
                circuit.failure_timestamps.retain(|&ts| now.duration_since(ts) < window);

                if circuit.failure_timestamps.len() >= self.config.failure_threshold as usize {
                    warn!(provider, "circuit breaker tripping to open");
                    circuit.state = CircuitBreakerState::Open;
                    circuit.opened_at = Some(now);
                    self.report_state(provider, CircuitBreakerState::Open);
                }
            }
            CircuitBreakerState::HalfOpen => {
                warn!(provider, "circuit breaker reopening after half-open failure");
                circuit.state = CircuitBreakerState::Open;
                circuit.opened_at = Some(now);
                circuit.half_open_successes = 0;
                self.report_state(provider, CircuitBreakerState::Open);
            }
            CircuitBreakerState::Open => circuit.opened_at = Some(now),
        }
    }

    /// Runs `operation` under the circuit breaker for `provider`. A transient
    /// `PipelineError` counts as a failure; other errors are returned without
    /// affecting circuit state (the call didn't fail because the provider is
    /// unhealthy).
    pub async fn execute<F, Fut, T>(&self, provider: &str, operation: F) -> Result<T, PipelineError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, PipelineError>>,
    {
        if !self.can_proceed(provider).await {
            return Err(PipelineError::UpstreamApiError {
                service: provider.to_string(),
                detail: "circuit breaker open".to_string(),
            });
        }

        match operation().await {
            Ok(result) => {
                self.record_success(provider).await;
                Ok(result)
            }
            Err(err) => {
                if err.is_retryable() {
                    self.record_failure(provider).await;
                }
                Err(err)
            }
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: 2,
            failure_window_seconds: 60,
            open_timeout_seconds: 0,
            half_open_success_threshold: 2,
            half_open_test_interval_seconds: 0,
        }
    }

    #[tokio::test]
    async fn starts_closed() {
        let cb = CircuitBreaker::new();
        assert_eq!(cb.get_state("spotify").await, CircuitBreakerState::Closed);
        assert!(cb.can_proceed("spotify").await);
    }

    #[tokio::test]
    async fn opens_after_threshold_failures() {
        let cb = CircuitBreaker::with_config(test_config());
        cb.record_failure("spotify").await;
        cb.record_failure("spotify").await;
        assert_eq!(cb.get_state("spotify").await, CircuitBreakerState::Open);
        assert!(!cb.can_proceed("spotify").await);
    }

    #[tokio::test]
    async fn closes_after_two_half_open_successes() {
        let cb = CircuitBreaker::with_config(test_config());
        cb.record_failure("spotify").await;
        cb.record_failure("spotify").await;
        assert!(cb.can_proceed("spotify").await);
        assert_eq!(cb.get_state("spotify").await, CircuitBreakerState::HalfOpen);

        cb.record_success("spotify").await;
        assert_eq!(cb.get_state("spotify").await, CircuitBreakerState::HalfOpen);
        cb.record_success("spotify").await;
        assert_eq!(cb.get_state("spotify").await, CircuitBreakerState::Closed);
    }

    #[tokio::test]
    async fn half_open_failure_reopens() {
        let cb = CircuitBreaker::with_config(test_config());
        cb.record_failure("spotify").await;
        cb.record_failure("spotify").await;
        cb.can_proceed("spotify").await;
        cb.record_failure("spotify").await;
        assert_eq!(cb.get_state("spotify").await, CircuitBreakerState::Open);
    }

    #[tokio::test]
    async fn providers_are_independent() {
        let cb = CircuitBreaker::with_config(test_config());
        cb.record_failure("spotify").await;
        cb.record_failure("spotify").await;
        assert_eq!(cb.get_state("spotify").await, CircuitBreakerState::Open);
        assert_eq!(cb.get_state("musicbrainz").await, CircuitBreakerState::Closed);
    }
}
