//! Rate-limited HTTP fetcher: per-host token bucket, jittered refill,
//! exponential backoff on transient failure, egress rotation via the proxy
//! pool on network-level failure.
//!
//! Grounded on `rate_limiting.rs`'s `wait_for_rate_limit`/`exponential_backoff`
//! shape, adapted from a Redis-backed per-provider limiter to an in-process
//! per-host token bucket since this crate fetches arbitrary scrape targets
//! rather than a fixed set of upstream APIs.

use super::challenge::ChallengeDetector;
use super::headers::HeaderGenerator;
use super::proxy_pool::ProxyPool;
use super::robots::RobotsCache;
use crate::error::PipelineError;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const BASE_REFILL_SECS: f64 = 1.5;
const MAX_REFILL_SECS: f64 = 2.0;
const JITTER_FRACTION: f64 = 0.8;
const MAX_BACKOFF_SECS: u64 = 300;

struct HostBucket {
    next_allowed_at: Instant,
}

/// Fetches pages while respecting a per-host minimum interval, robots.txt
/// crawl-delay (when larger than the default), and server-requested backoff.
pub struct Fetcher {
    client: reqwest::Client,
    headers: HeaderGenerator,
    robots: RobotsCache,
    proxy_pool: Option<Arc<ProxyPool>>,
    buckets: Mutex<HashMap<String, HostBucket>>,
}

impl Fetcher {
    pub fn new(client: reqwest::Client, proxy_pool: Option<Arc<ProxyPool>>) -> Self {
        Self {
            headers: HeaderGenerator::new(true),
            robots: RobotsCache::new(client.clone()),
            client,
            proxy_pool,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Fetches `url`, honoring the per-host token bucket and robots.txt
    /// crawl-delay, retrying transient failures with exponential backoff.
    /// Returns the response body, or a `PipelineError` classifying the
    /// failure for the caller's retry/circuit-breaker logic.
    pub async fn fetch(&self, url: &str) -> Result<String, PipelineError> {
        let host = reqwest::Url::parse(url)
            .map_err(|e| PipelineError::ExtractionFailure {
                source_id: url.to_string(),
                reason: format!("invalid url: {e}"),
            })?
            .host_str()
            .ok_or_else(|| PipelineError::ExtractionFailure {
                source_id: url.to_string(),
                reason: "url has no host".to_string(),
            })?
            .to_string();

        self.wait_for_slot(&host).await;

        let max_attempts = 5;
        let mut last_err = None;

        for attempt in 0..max_attempts {
            match self.attempt_fetch(url, &host).await {
                Ok(body) => return Ok(body),
                Err(err) => {
                    let retryable = err.is_retryable();
                    last_err = Some(err);
                    if !retryable {
                        break;
                    }
                    let delay = self.backoff_delay(attempt);
                    tokio::time::sleep(delay).await;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| PipelineError::TransientNetwork("retries exhausted".to_string())))
    }

    async fn attempt_fetch(&self, url: &str, host: &str) -> Result<String, PipelineError> {
        let headers = self.headers.headers_for(host);
        let mut request = self.client.get(url);
        request = request.headers(headers);

        let response = request.send().await.map_err(|e| {
            if let Some(pool) = &self.proxy_pool {
                pool.record_failure(host, &e.to_string(), false);
            }
            PipelineError::TransientNetwork(e.to_string())
        })?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            return Err(PipelineError::RateLimited {
                host: host.to_string(),
                detail: format!("429 (retry_after={retry_after:?})"),
            });
        }

        if status == reqwest::StatusCode::FORBIDDEN {
            if let Some(pool) = &self.proxy_pool {
                pool.record_failure(host, "403", true);
            }
            return Err(PipelineError::Forbidden {
                host: host.to_string(),
                detail: "403 forbidden".to_string(),
            });
        }

        if status == reqwest::StatusCode::SERVICE_UNAVAILABLE
            || status == reqwest::StatusCode::REQUEST_TIMEOUT
        {
            return Err(PipelineError::TransientNetwork(format!("status {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| PipelineError::TransientNetwork(e.to_string()))?;

        if let Some(challenge_type) = ChallengeDetector::detect(&body) {
            if let Some(pool) = &self.proxy_pool {
                pool.record_failure(host, "challenge", true);
            }
            return Err(PipelineError::Challenge {
                host: host.to_string(),
                challenge_type: challenge_type.to_string(),
            });
        }

        if let Some(pool) = &self.proxy_pool {
            pool.record_success(host);
        }

        Ok(body)
    }

    async fn wait_for_slot(&self, host: &str) {
        let crawl_delay = self.robots.crawl_delay(host).await;
        let default_interval = self.jittered_interval();
        let interval = crawl_delay.filter(|d| *d > default_interval).unwrap_or(default_interval);

        let now = Instant::now();
        let wait_until = {
            let mut buckets = self.buckets.lock().await;
            let bucket = buckets.entry(host.to_string()).or_insert_with(|| HostBucket {
                next_allowed_at: now,
            });
            let wait_until = bucket.next_allowed_at.max(now);
            bucket.next_allowed_at = wait_until + interval;
            wait_until
        };

        if wait_until > now {
            tokio::time::sleep(wait_until - now).await;
        }
    }

    fn jittered_interval(&self) -> Duration {
        let mut rng = rand::thread_rng();
        let base = rng.gen_range(BASE_REFILL_SECS..=MAX_REFILL_SECS);
        let jitter = 1.0 + rng.gen_range(-JITTER_FRACTION..=JITTER_FRACTION);
        Duration::from_secs_f64((base * jitter).max(0.1))
    }

    /// `base_delay * 2^attempt`, capped, with full jitter. 429/503/408 are
    /// routed through the same backoff; an explicit `Retry-After` always
    /// wins over this computed value at the caller's discretion.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let base_secs = 2u64.saturating_pow(attempt.min(8));
        let capped = base_secs.min(MAX_BACKOFF_SECS);
        let jitter_ms = rand::thread_rng().gen_range(0..1000);
        Duration::from_secs(capped) + Duration::from_millis(jitter_ms)
    }
}
