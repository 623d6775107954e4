//! Prometheus metrics for the scraping/enrichment/persistence pipeline.
//!
//! Named per the external-interfaces contract: every stage boundary gets a
//! counter or histogram so failures are observable even when nothing is
//! wrong enough to log at error level.

use axum::{
    body::Body,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use prometheus::{Counter, CounterVec, Encoder, Gauge, GaugeVec, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

#[derive(Clone)]
pub struct MetricsCollector {
    registry: Arc<Registry>,

    pub silent_scraping_failures_total: Counter,
    pub extraction_attempts_total: CounterVec,
    pub validation_failures_total: CounterVec,
    pub persistence_batch_duration_seconds: HistogramVec,
    pub resolver_tier_attempts_total: CounterVec,
    pub cooldown_backlog_size: Gauge,
    pub circuit_breaker_state: GaugeVec,
    pub rate_limit_waits_total: CounterVec,
    pub fetch_requests_total: CounterVec,
}

impl MetricsCollector {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Arc::new(Registry::new());

        let silent_scraping_failures_total = Counter::with_opts(
            Opts::new(
                "silent_scraping_failures_total",
                "Extractions that reported success with zero items and no scrape_error",
            )
            .namespace("trackgraph"),
        )?;

        let extraction_attempts_total = CounterVec::new(
            Opts::new("extraction_attempts_total", "Extraction attempts by source and outcome")
                .namespace("trackgraph"),
            &["source_id", "outcome"],
        )?;

        let validation_failures_total = CounterVec::new(
            Opts::new("validation_failures_total", "Items dropped at the validation stage")
                .namespace("trackgraph"),
            &["item_type", "reason"],
        )?;

        let persistence_batch_duration_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "persistence_batch_duration_seconds",
                "Time to commit a persistence batch",
            )
            .namespace("trackgraph"),
            &["outcome"],
        )?;

        let resolver_tier_attempts_total = CounterVec::new(
            Opts::new("resolver_tier_attempts_total", "Resolver attempts by tier and outcome")
                .namespace("trackgraph"),
            &["tier", "outcome"],
        )?;

        let cooldown_backlog_size = Gauge::with_opts(
            Opts::new("cooldown_backlog_size", "Rows currently waiting in the cool-down queue")
                .namespace("trackgraph"),
        )?;

        let circuit_breaker_state = GaugeVec::new(
            Opts::new("circuit_breaker_state", "0=closed 1=half-open 2=open")
                .namespace("trackgraph"),
            &["provider"],
        )?;

        let rate_limit_waits_total = CounterVec::new(
            Opts::new("rate_limit_waits_total", "Times a fetch had to wait on the token bucket")
                .namespace("trackgraph"),
            &["host"],
        )?;

        let fetch_requests_total = CounterVec::new(
            Opts::new("fetch_requests_total", "HTTP fetch attempts by host and outcome")
                .namespace("trackgraph"),
            &["host", "outcome"],
        )?;

        registry.register(Box::new(silent_scraping_failures_total.clone()))?;
        registry.register(Box::new(extraction_attempts_total.clone()))?;
        registry.register(Box::new(validation_failures_total.clone()))?;
        registry.register(Box::new(persistence_batch_duration_seconds.clone()))?;
        registry.register(Box::new(resolver_tier_attempts_total.clone()))?;
        registry.register(Box::new(cooldown_backlog_size.clone()))?;
        registry.register(Box::new(circuit_breaker_state.clone()))?;
        registry.register(Box::new(rate_limit_waits_total.clone()))?;
        registry.register(Box::new(fetch_requests_total.clone()))?;

        Ok(Self {
            registry,
            silent_scraping_failures_total,
            extraction_attempts_total,
            validation_failures_total,
            persistence_batch_duration_seconds,
            resolver_tier_attempts_total,
            cooldown_backlog_size,
            circuit_breaker_state,
            rate_limit_waits_total,
            fetch_requests_total,
        })
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }
}

/// Axum handler exposing the registry in the Prometheus text exposition format.
pub async fn metrics_handler(State(metrics): State<MetricsCollector>) -> Response {
    let encoder = TextEncoder::new();
    let metric_families = metrics.registry.gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return (StatusCode::INTERNAL_SERVER_ERROR, "failed to encode metrics").into_response();
    }

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", encoder.format_type())
        .body(Body::from(buffer))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
