pub mod dedup;
pub mod state_machine;

pub use dedup::DedupStore;
pub use state_machine::{RunKey, RunState, RunStateMachine, RunStatus, TransitionError};

use crate::error::PipelineError;
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};

#[derive(Debug, Clone)]
struct QuotaCounter {
    day: NaiveDate,
    used: u32,
}

/// Coordinates scheduling across every registered source: dedup, daily
/// per-source quotas, a global concurrency cap, and the per-`(source, url)`
/// run state machine. Grounded on `catalog_sync/orchestrator.rs`'s
/// `CatalogSyncOrchestrator` shape, generalized from a fixed platform-worker
/// registry to an arbitrary scrape job closure.
pub struct Orchestrator {
    state_machine: RunStateMachine,
    dedup: DedupStore,
    concurrency: Arc<Semaphore>,
    daily_quota_per_source: u32,
    quotas: Mutex<HashMap<String, QuotaCounter>>,
}

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("daily quota exhausted for source {0}")]
    QuotaExhausted(String),
    #[error("{0} was scraped within the dedup window")]
    RecentlyScraped(String),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl Orchestrator {
    pub fn new(dedup: DedupStore, global_concurrency_cap: usize, daily_quota_per_source: u32) -> Self {
        Self {
            state_machine: RunStateMachine::new(),
            dedup,
            concurrency: Arc::new(Semaphore::new(global_concurrency_cap)),
            daily_quota_per_source,
            quotas: Mutex::new(HashMap::new()),
        }
    }

    async fn check_and_consume_quota(&self, source_id: &str) -> Result<(), OrchestratorError> {
        let today = Utc::now().date_naive();
        let mut quotas = self.quotas.lock().await;
        let counter = quotas.entry(source_id.to_string()).or_insert(QuotaCounter {
            day: today,
            used: 0,
        });

        if counter.day != today {
            counter.day = today;
            counter.used = 0;
        }

        if counter.used >= self.daily_quota_per_source {
            return Err(OrchestratorError::QuotaExhausted(source_id.to_string()));
        }

        counter.used += 1;
        Ok(())
    }

    /// Runs `job` for `(source_id, url)` if the dedup window, daily quota,
    /// and concurrency cap all permit it. The state machine transitions
    /// scheduled -> running -> {succeeded, failed} around the call; a
    /// `PipelineError::RateLimited`/`ResolverNotYet` outcome from `job`
    /// instead moves the run to `cooldown`.
    pub async fn run_job<F, Fut>(
        &self,
        source_id: &str,
        url: &str,
        job: F,
    ) -> Result<(), OrchestratorError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), PipelineError>>,
    {
        let key = RunKey {
            source_id: source_id.to_string(),
            url: url.to_string(),
        };

        if self.dedup.was_recently_scraped(source_id, url).await? {
            return Err(OrchestratorError::RecentlyScraped(url.to_string()));
        }

        self.check_and_consume_quota(source_id).await?;
        self.state_machine.schedule(key.clone()).await?;

        let _permit = self
            .concurrency
            .acquire()
            .await
            .expect("semaphore is never closed");

        self.state_machine.start(&key).await?;

        match job().await {
            Ok(()) => {
                self.state_machine.succeed(&key).await;
                self.dedup.mark_scraped(source_id, url).await?;
                Ok(())
            }
            Err(err @ (PipelineError::RateLimited { .. } | PipelineError::ResolverNotYet { .. })) => {
                self.state_machine.cooldown(&key, err.to_string()).await;
                Err(OrchestratorError::Pipeline(err))
            }
            Err(err) => {
                self.state_machine.fail(&key, err.to_string()).await;
                Err(OrchestratorError::Pipeline(err))
            }
        }
    }

    pub async fn status_of(&self, source_id: &str, url: &str) -> RunStatus {
        self.state_machine
            .status_of(&RunKey {
                source_id: source_id.to_string(),
                url: url.to_string(),
            })
            .await
    }

    pub async fn running_count(&self) -> usize {
        self.state_machine.running_count().await
    }
}
