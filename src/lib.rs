//! DJ-set / live-performance scraping and music-knowledge-graph pipeline.
//!
//! Fetches setlists from tracklist sites, parses the citations they contain,
//! resolves them against a relational artist/track/label graph, and persists
//! the result as batched, dependency-ordered upserts. See `services` for the
//! stage-by-stage breakdown (fetch -> parser/extractors -> orchestrator ->
//! pipeline -> resolver).

pub mod config;
pub mod database;
pub mod error;
pub mod metrics;
pub mod models;
pub mod services;

pub use config::{AppConfig, ConfigError, DatabaseSettings, Environment, RedisSettings, ServerConfig};
pub use database::{create_pool, create_redis_pool, health_check, redis_health_check, run_migrations, DatabasePool};
pub use error::PipelineError;
pub use metrics::{metrics_handler, MetricsCollector};
