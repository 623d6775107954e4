//! 30-day TTL dedup store over redis.
//!
//! Grounded on `rate_limiting.rs`'s `deadpool_redis::Pool` + `set_ex` usage;
//! this store only needs existence checks, not JSON state, so it stores a
//! constant marker value rather than a serialized struct.

use crate::error::PipelineError;
use deadpool_redis::Pool;
use redis::AsyncCommands;
use std::time::Duration;

const KEY_PREFIX: &str = "trackgraph:dedup:";
const MARKER: &str = "1";

pub struct DedupStore {
    pool: Pool,
    ttl: Duration,
}

impl DedupStore {
    pub fn new(pool: Pool, ttl: Duration) -> Self {
        Self { pool, ttl }
    }

    fn key(source_id: &str, url: &str) -> String {
        format!("{KEY_PREFIX}{source_id}:{url}")
    }

    /// Returns `true` if `url` was already scraped for `source_id` within
    /// the TTL window.
    pub async fn was_recently_scraped(&self, source_id: &str, url: &str) -> Result<bool, PipelineError> {
        let mut conn = self.pool.get().await.map_err(|e| {
            PipelineError::Cache(redis::RedisError::from(std::io::Error::new(
                std::io::ErrorKind::Other,
                e.to_string(),
            )))
        })?;
        let exists: bool = conn.exists(Self::key(source_id, url)).await?;
        Ok(exists)
    }

    /// Marks `url` scraped for `source_id`, starting a fresh TTL window.
    pub async fn mark_scraped(&self, source_id: &str, url: &str) -> Result<(), PipelineError> {
        let mut conn = self.pool.get().await.map_err(|e| {
            PipelineError::Cache(redis::RedisError::from(std::io::Error::new(
                std::io::ErrorKind::Other,
                e.to_string(),
            )))
        })?;
        let _: () = conn
            .set_ex(Self::key(source_id, url), MARKER, self.ttl.as_secs())
            .await?;
        Ok(())
    }
}
