//! Connection pool construction for the relational store and the redis-backed
//! KV layer (URL dedup, rate-limit tokens, response cache, proxy-pool state).

use crate::config::{DatabaseSettings, RedisSettings};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgPool, Pool, Postgres};
use std::str::FromStr;

pub type DatabasePool = Pool<Postgres>;

pub async fn create_pool(settings: &DatabaseSettings) -> anyhow::Result<DatabasePool> {
    let connect_options = PgConnectOptions::from_str(&settings.url)?
        .statement_cache_capacity(100);

    let pool = PgPoolOptions::new()
        .min_connections(settings.min_connections)
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.acquire_timeout)
        .idle_timeout(settings.idle_in_transaction_timeout)
        .max_lifetime(settings.max_lifetime)
        .connect_with(connect_options)
        .await?;

    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn health_check(pool: &PgPool) -> bool {
    sqlx::query("SELECT 1").execute(pool).await.is_ok()
}

pub fn create_redis_pool(settings: &RedisSettings) -> anyhow::Result<deadpool_redis::Pool> {
    let cfg = deadpool_redis::Config::from_url(settings.url.clone());
    let pool = cfg.create_pool(Some(deadpool_redis::Runtime::Tokio1))?;
    Ok(pool)
}

pub async fn redis_health_check(pool: &deadpool_redis::Pool) -> bool {
    use deadpool_redis::redis::AsyncCommands;
    let Ok(mut conn) = pool.get().await else {
        return false;
    };
    conn.set_ex::<_, _, ()>("health:ping", "1", 5).await.is_ok()
}
