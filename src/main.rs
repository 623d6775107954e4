use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use tokio::time::interval;
use tracing_subscriber::{fmt, EnvFilter};
use trackgraph_pipeline::config::AppConfig;
use trackgraph_pipeline::database::{create_pool, create_redis_pool, run_migrations};
use trackgraph_pipeline::metrics::{metrics_handler, MetricsCollector};
use trackgraph_pipeline::services::extractors::{MixesDbExtractor, SetlistFmExtractor, SiteExtractor};
use trackgraph_pipeline::services::fetch::{Fetcher, ProxyPool};
use trackgraph_pipeline::services::orchestrator::{DedupStore, Orchestrator};
use trackgraph_pipeline::services::resolver::run_requeue_worker;

fn init_tracing(environment: trackgraph_pipeline::config::Environment) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter);

    if environment.is_production() {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

fn extractor_for(source_id: &str) -> Option<Arc<dyn SiteExtractor>> {
    match source_id {
        "setlistfm" => Some(Arc::new(SetlistFmExtractor) as Arc<dyn SiteExtractor>),
        "mixesdb" => Some(Arc::new(MixesDbExtractor) as Arc<dyn SiteExtractor>),
        _ => None,
    }
}

/// Scrapes one configured seed URL for `source_id`, extracting and logging
/// the result. Persistence/resolution wiring lives in `services::pipeline`
/// and `services::resolver`; this demonstrates the fetch -> extract leg of
/// the per-source job the orchestrator schedules.
async fn scrape_once(
    fetcher: &Fetcher,
    extractor: &dyn SiteExtractor,
    url: &str,
) -> Result<(), trackgraph_pipeline::PipelineError> {
    let body = fetcher.fetch(url).await?;
    let (setlist, layer) = extractor.extract(url, &body).await;

    tracing::info!(
        source = extractor.source_id(),
        url,
        layer = layer.label(),
        tracklist_count = setlist.tracklist_count(),
        scrape_error = ?setlist.scrape_error,
        "extraction complete"
    );

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    init_tracing(config.environment);

    tracing::info!(environment = ?config.environment, "starting trackgraph pipeline");

    let db_pool = create_pool(&config.database).await?;
    run_migrations(&db_pool).await?;
    let redis_pool = create_redis_pool(&config.redis)?;

    let metrics = MetricsCollector::new()?;
    let metrics_for_server = metrics.clone();

    let metrics_app = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics_for_server);

    let metrics_addr = format!("{}:{}", config.server.host, config.server.port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr).await?;
    tracing::info!(addr = %metrics_addr, "metrics endpoint listening");

    let metrics_server = tokio::spawn(async move {
        if let Err(err) = axum::serve(metrics_listener, metrics_app).await {
            tracing::error!(error = %err, "metrics server exited");
        }
    });

    let requeue_worker = tokio::spawn(run_requeue_worker(
        db_pool.clone(),
        config.resolver.cooldown_poll_interval,
    ));

    let dedup = DedupStore::new(redis_pool.clone(), config.orchestrator.dedup_ttl);
    let orchestrator = Arc::new(Orchestrator::new(
        dedup,
        config.orchestrator.global_concurrency_cap,
        config.orchestrator.daily_quota_per_source,
    ));

    let proxy_addresses = std::env::var("PROXY_ADDRESSES")
        .unwrap_or_default()
        .split(',')
        .filter_map(|entry| entry.split_once('='))
        .map(|(id, addr)| (id.to_string(), addr.to_string()))
        .collect::<Vec<_>>();
    let proxy_pool = ProxyPool::new(proxy_addresses);
    let fetcher = Arc::new(Fetcher::new(
        reqwest::Client::new(),
        if proxy_pool.is_empty() { None } else { Some(Arc::new(proxy_pool)) },
    ));
    let mut tick = interval(Duration::from_secs(config.orchestrator.dedup_ttl.as_secs().min(3600)));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown signal received, draining in-flight jobs");
                break;
            }
            _ = tick.tick() => {
                for source in &config.extractors.sources {
                    if !source.enabled {
                        continue;
                    }
                    let Some(extractor) = extractor_for(&source.source_id) else {
                        tracing::warn!(source = %source.source_id, "no extractor registered for configured source");
                        continue;
                    };
                    let seed_var = format!("{}_SEED_URL", source.source_id.to_uppercase());
                    let Ok(seed_url) = std::env::var(&seed_var) else {
                        continue;
                    };

                    let fetcher = fetcher.clone();
                    let orchestrator = orchestrator.clone();
                    let source_id = source.source_id.clone();

                    tokio::spawn(async move {
                        let result = orchestrator
                            .run_job(&source_id, &seed_url, || scrape_once(&fetcher, extractor.as_ref(), &seed_url))
                            .await;
                        if let Err(err) = result {
                            tracing::warn!(source = %source_id, error = %err, "scrape job did not complete");
                        }
                    });
                }
            }
        }
    }

    metrics_server.abort();
    requeue_worker.abort();
    Ok(())
}
