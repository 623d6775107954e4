//! Closed error taxonomy for the pipeline.
//!
//! Every variant here is one of the kinds spec'd out for cross-stage error
//! propagation: each crosses a stage boundary only through an explicit side
//! channel (a counter, a status row, a poison/retry queue entry), never as an
//! unstructured exception.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Network-level failure expected to clear on retry (connection reset,
    /// timeout, DNS failure). Retried with backoff; does not mark the egress
    /// dirty by itself.
    #[error("transient network failure: {0}")]
    TransientNetwork(String),

    /// Server returned 429/503/408 or robots.txt signaled a crawl delay
    /// violation. Retried after the greater of the computed backoff and any
    /// `Retry-After` header.
    #[error("rate limited by {host}: {detail}")]
    RateLimited { host: String, detail: String },

    /// Server returned 403 or otherwise refused the request outright. Marks
    /// the serving egress dirty; not retried on the same egress.
    #[error("forbidden by {host}: {detail}")]
    Forbidden { host: String, detail: String },

    /// A bot-challenge was detected in the response body. Marks the egress
    /// dirty; resubmitted once on a different egress if a solver token is
    /// obtained.
    #[error("challenge detected on {host}: {challenge_type}")]
    Challenge {
        host: String,
        challenge_type: String,
    },

    /// An extractor could not produce a well-formed result from a page it
    /// otherwise fetched successfully. Recorded as `scrape_error` on the
    /// owning Setlist row, never silently dropped.
    #[error("extraction failed for {source_id}: {reason}")]
    ExtractionFailure { source_id: String, reason: String },

    /// An item failed a model invariant check in the validation stage.
    /// Dropped, logged, and counted; never persisted.
    #[error("validation failed: {0}")]
    ValidationFailure(String),

    /// The resolver could not yet resolve an item and is deferring it to the
    /// cool-down queue. Not a failure — an explicit "come back later" signal.
    #[error("resolver deferred: retry after {retry_after}")]
    ResolverNotYet { retry_after: chrono::DateTime<chrono::Utc> },

    /// A configured external API returned an unexpected or error response.
    #[error("upstream API error from {service}: {detail}")]
    UpstreamApiError { service: String, detail: String },

    /// A persistence-stage upsert could not be resolved against the
    /// conflict-key priority order and needs bisection retry or operator
    /// attention.
    #[error("persistence conflict on {table}: {detail}")]
    PersistenceConflict { table: String, detail: String },

    /// Misconfiguration discovered at startup. The one place this taxonomy
    /// allows a panic — secrets and config are validated before any work
    /// starts, never mid-pipeline.
    #[error("configuration error: {0}")]
    Configuration(#[from] crate::config::ConfigError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl PipelineError {
    /// Whether a worker should retry this item, versus routing it to a
    /// terminal failure state.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TransientNetwork(_)
                | Self::RateLimited { .. }
                | Self::UpstreamApiError { .. }
                | Self::Database(_)
                | Self::Cache(_)
                | Self::Http(_)
        )
    }

    /// Short machine-readable tag for metrics labels.
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::TransientNetwork(_) => "transient_network",
            Self::RateLimited { .. } => "rate_limited",
            Self::Forbidden { .. } => "forbidden",
            Self::Challenge { .. } => "challenge",
            Self::ExtractionFailure { .. } => "extraction_failure",
            Self::ValidationFailure(_) => "validation_failure",
            Self::ResolverNotYet { .. } => "resolver_not_yet",
            Self::UpstreamApiError { .. } => "upstream_api_error",
            Self::PersistenceConflict { .. } => "persistence_conflict",
            Self::Configuration(_) => "configuration",
            Self::Database(_) => "database",
            Self::Cache(_) => "cache",
            Self::Http(_) => "http",
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_are_retryable() {
        assert!(PipelineError::TransientNetwork("timeout".into()).is_retryable());
    }

    #[test]
    fn validation_failures_are_not_retryable() {
        assert!(!PipelineError::ValidationFailure("bad bpm".into()).is_retryable());
    }

    #[test]
    fn kind_labels_are_stable() {
        assert_eq!(
            PipelineError::Forbidden {
                host: "example.com".into(),
                detail: "403".into()
            }
            .kind_label(),
            "forbidden"
        );
    }
}
