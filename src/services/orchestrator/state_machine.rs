//! Per-`(source, url)` run state machine.
//!
//! Grounded on `catalog_sync/orchestrator.rs`'s `active_runs:
//! Arc<RwLock<HashMap<Uuid, SyncRunState>>>` tracking pattern, narrowed to one
//! run per `(source, url)` key rather than per run id — at most one running
//! job may hold a given key at a time.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Idle,
    Scheduled,
    Running,
    Succeeded,
    Failed,
    Cooldown,
}

#[derive(Debug, Clone)]
pub struct RunState {
    pub status: RunStatus,
    pub attempts: u32,
    pub last_transition: DateTime<Utc>,
    pub last_error: Option<String>,
}

impl RunState {
    fn idle() -> Self {
        Self {
            status: RunStatus::Idle,
            attempts: 0,
            last_transition: Utc::now(),
            last_error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunKey {
    pub source_id: String,
    pub url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error("{source_id} {url} already has a run in progress")]
    AlreadyRunning { source_id: String, url: String },
}

/// Tracks the in-flight state for every `(source, url)` pair this process
/// has touched. Transitions are explicit and one-directional per the state
/// diagram: idle -> scheduled -> running -> {succeeded, failed, cooldown}.
pub struct RunStateMachine {
    runs: Arc<RwLock<HashMap<RunKey, RunState>>>,
}

impl RunStateMachine {
    pub fn new() -> Self {
        Self {
            runs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn schedule(&self, key: RunKey) -> Result<(), TransitionError> {
        let mut runs = self.runs.write().await;
        let state = runs.entry(key.clone()).or_insert_with(RunState::idle);

        if state.status == RunStatus::Running {
            return Err(TransitionError::AlreadyRunning {
                source_id: key.source_id,
                url: key.url,
            });
        }

        state.status = RunStatus::Scheduled;
        state.last_transition = Utc::now();
        Ok(())
    }

    pub async fn start(&self, key: &RunKey) -> Result<(), TransitionError> {
        let mut runs = self.runs.write().await;
        let state = runs.entry(key.clone()).or_insert_with(RunState::idle);

        if state.status == RunStatus::Running {
            return Err(TransitionError::AlreadyRunning {
                source_id: key.source_id.clone(),
                url: key.url.clone(),
            });
        }

        state.status = RunStatus::Running;
        state.attempts += 1;
        state.last_transition = Utc::now();
        Ok(())
    }

    pub async fn succeed(&self, key: &RunKey) {
        self.transition_to(key, RunStatus::Succeeded, None).await;
    }

    pub async fn fail(&self, key: &RunKey, reason: impl Into<String>) {
        self.transition_to(key, RunStatus::Failed, Some(reason.into())).await;
    }

    pub async fn cooldown(&self, key: &RunKey, reason: impl Into<String>) {
        self.transition_to(key, RunStatus::Cooldown, Some(reason.into())).await;
    }

    async fn transition_to(&self, key: &RunKey, status: RunStatus, error: Option<String>) {
        let mut runs = self.runs.write().await;
        if let Some(state) = runs.get_mut(key) {
            state.status = status;
            state.last_transition = Utc::now();
            state.last_error = error;
        }
    }

    pub async fn status_of(&self, key: &RunKey) -> RunStatus {
        self.runs
            .read()
            .await
            .get(key)
            .map(|s| s.status)
            .unwrap_or(RunStatus::Idle)
    }

    pub async fn running_count(&self) -> usize {
        self.runs
            .read()
            .await
            .values()
            .filter(|s| s.status == RunStatus::Running)
            .count()
    }
}

impl Default for RunStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> RunKey {
        RunKey {
            source_id: "setlistfm".to_string(),
            url: "https://www.setlist.fm/x".to_string(),
        }
    }

    #[tokio::test]
    async fn only_one_running_job_per_key() {
        let machine = RunStateMachine::new();
        machine.start(&key()).await.unwrap();
        let result = machine.start(&key()).await;
        assert!(matches!(result, Err(TransitionError::AlreadyRunning { .. })));
    }

    #[tokio::test]
    async fn lifecycle_transitions() {
        let machine = RunStateMachine::new();
        let k = key();
        machine.schedule(k.clone()).await.unwrap();
        assert_eq!(machine.status_of(&k).await, RunStatus::Scheduled);
        machine.start(&k).await.unwrap();
        assert_eq!(machine.status_of(&k).await, RunStatus::Running);
        machine.succeed(&k).await;
        assert_eq!(machine.status_of(&k).await, RunStatus::Succeeded);
    }

    #[tokio::test]
    async fn running_count_tracks_active_jobs() {
        let machine = RunStateMachine::new();
        machine.start(&key()).await.unwrap();
        assert_eq!(machine.running_count().await, 1);
        machine.fail(&key(), "boom").await;
        assert_eq!(machine.running_count().await, 0);
    }
}
