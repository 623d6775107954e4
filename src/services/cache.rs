//! Redis-backed response/dedup cache.
//!
//! A thin typed wrapper over `deadpool_redis`: `SETEX`/`GET` with
//! JSON-serialized values, the same pattern `rate_limiting.rs` uses for its
//! rate-limit-state and batch-checkpoint persistence. Available generically
//! to any caller that needs a cached value with a TTL, e.g. a resolver tier
//! persisting a lookup result across process restarts, beyond the
//! in-process `moka` cache tier 2 keeps per run.

use deadpool_redis::Pool;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

use crate::error::PipelineError;

fn pool_error(e: impl std::fmt::Display) -> PipelineError {
    PipelineError::Cache(redis::RedisError::from(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())))
}

pub struct ResponseCache {
    pool: Pool,
    key_prefix: String,
}

impl ResponseCache {
    pub fn new(pool: Pool, key_prefix: impl Into<String>) -> Self {
        Self { pool, key_prefix: key_prefix.into() }
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.key_prefix, key)
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, PipelineError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let raw: Option<String> = conn.get(self.key(key)).await?;
        match raw {
            Some(json) => serde_json::from_str(&json).map(Some).map_err(pool_error),
            None => Ok(None),
        }
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<(), PipelineError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let json = serde_json::to_string(value).map_err(pool_error)?;
        let _: () = conn.set_ex(self.key(key), json, ttl.as_secs()).await?;
        Ok(())
    }

    pub async fn invalidate(&self, key: &str) -> Result<(), PipelineError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let _: () = conn.del(self.key(key)).await?;
        Ok(())
    }
}
