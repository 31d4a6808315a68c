//! Run registry - the live state of every pipeline's current run
//!
//! This is the only shared mutable state in the runner. Every read and write
//! goes through one mutex, so no caller can observe a half-written entry.
//! Sequences that span an `.await` (cancel then re-register, cancel then
//! remove) are additionally serialized per pipeline ID with
//! [`RunRegistry::lock_pipeline`].

use crate::core::{RunStatus, RunSummary, RunTicket};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, MutexGuard};
use tokio::sync::{watch, Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

/// Means of stopping a run and observing that it stopped
#[derive(Debug)]
pub struct RunHandle {
    /// Cancels the run's stages
    pub token: CancellationToken,

    /// The supervised task executing the run
    pub task: JoinHandle<RunStatus>,
}

/// State tracked for the current run of a pipeline
#[derive(Debug)]
pub struct RunState {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    /// `None` once the run is terminal or a canceller has taken it
    pub handle: Option<RunHandle>,

    completion: watch::Sender<RunStatus>,
}

impl RunState {
    /// A freshly started run
    pub fn running(run_id: Uuid, handle: Option<RunHandle>) -> Self {
        let (completion, _) = watch::channel(RunStatus::Running);
        Self {
            run_id,
            status: RunStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
            handle,
            completion,
        }
    }

    pub fn summary(&self, pipeline_id: &str) -> RunSummary {
        RunSummary {
            pipeline_id: pipeline_id.to_string(),
            run_id: self.run_id,
            status: self.status,
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }

    fn finish(&mut self, status: RunStatus) {
        self.status = status;
        self.finished_at = Some(Utc::now());
        self.handle = None;
        self.completion.send_replace(status);
    }
}

#[derive(Default)]
struct Inner {
    runs: Mutex<HashMap<String, RunState>>,
    pipeline_locks: std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

/// Concurrency-safe map from pipeline ID to its run state
///
/// Cloning is cheap and every clone shares the same entries.
#[derive(Clone, Default)]
pub struct RunRegistry {
    inner: Arc<Inner>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Summary of the run tracked for `pipeline_id`
    pub async fn get(&self, pipeline_id: &str) -> Option<RunSummary> {
        let runs = self.inner.runs.lock().await;
        runs.get(pipeline_id).map(|state| state.summary(pipeline_id))
    }

    /// Insert or replace the state for `pipeline_id`, returning the old one
    pub async fn put(&self, pipeline_id: &str, state: RunState) -> Option<RunState> {
        let mut runs = self.inner.runs.lock().await;
        runs.insert(pipeline_id.to_string(), state)
    }

    pub async fn remove(&self, pipeline_id: &str) -> Option<RunState> {
        let mut runs = self.inner.runs.lock().await;
        let removed = runs.remove(pipeline_id);
        if removed.is_some() {
            debug!(pipeline = %pipeline_id, "Removed run state");
        }
        removed
    }

    /// Summaries of every tracked run
    pub async fn list(&self) -> Vec<RunSummary> {
        let runs = self.inner.runs.lock().await;
        let mut summaries: Vec<RunSummary> = runs
            .iter()
            .map(|(id, state)| state.summary(id))
            .collect();
        summaries.sort_by(|a, b| a.pipeline_id.cmp(&b.pipeline_id));
        summaries
    }

    /// IDs of pipelines whose current run is still `Running`
    pub async fn running(&self) -> Vec<String> {
        let runs = self.inner.runs.lock().await;
        runs.iter()
            .filter(|(_, state)| state.status == RunStatus::Running)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Register a new `Running` run, spawning it inside the same critical
    /// section.
    ///
    /// `spawn` receives the new run ID. Because the registry lock is held until
    /// the entry is inserted, the spawned task can't record a terminal status
    /// for a run the registry doesn't know about yet.
    pub async fn insert_running<F>(&self, pipeline_id: &str, spawn: F) -> RunTicket
    where
        F: FnOnce(Uuid) -> RunHandle,
    {
        let mut runs = self.inner.runs.lock().await;
        let run_id = Uuid::new_v4();

        if let Some(previous) = runs.get(pipeline_id) {
            if previous.status == RunStatus::Running {
                warn!(pipeline = %pipeline_id, previous = %previous.run_id, "Replacing a run that is still marked running");
            }
        }

        let state = RunState::running(run_id, Some(spawn(run_id)));
        let ticket = RunTicket {
            run_id,
            started_at: state.started_at,
        };
        runs.insert(pipeline_id.to_string(), state);
        debug!(pipeline = %pipeline_id, %run_id, "Registered running run");

        ticket
    }

    /// Take the cancel handle of a `Running` run, if it still has one.
    ///
    /// Whoever takes the handle is responsible for stopping the run; a second
    /// caller gets `None`.
    pub async fn take_handle_if_running(&self, pipeline_id: &str) -> Option<(Uuid, RunHandle)> {
        let mut runs = self.inner.runs.lock().await;
        let state = runs.get_mut(pipeline_id)?;
        if state.status != RunStatus::Running {
            return None;
        }
        let handle = state.handle.take()?;
        Some((state.run_id, handle))
    }

    /// Record the terminal status of run `run_id`.
    ///
    /// Returns `false` without writing if the entry is gone, belongs to a
    /// different run, or is already terminal.
    pub async fn finish(&self, pipeline_id: &str, run_id: Uuid, status: RunStatus) -> bool {
        debug_assert!(status.is_terminal());
        let mut runs = self.inner.runs.lock().await;
        match runs.get_mut(pipeline_id) {
            Some(state) if state.run_id == run_id && state.status == RunStatus::Running => {
                state.finish(status);
                debug!(pipeline = %pipeline_id, %run_id, %status, "Recorded terminal status");
                true
            }
            _ => false,
        }
    }

    /// Receiver that sees the current run's status change
    pub async fn subscribe(&self, pipeline_id: &str) -> Option<watch::Receiver<RunStatus>> {
        let runs = self.inner.runs.lock().await;
        runs.get(pipeline_id).map(|state| state.completion.subscribe())
    }

    /// Serialize multi-step operations on one pipeline ID
    pub async fn lock_pipeline(&self, pipeline_id: &str) -> PipelineLock {
        let lock = {
            let mut locks = self.pipeline_locks();
            locks
                .entry(pipeline_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        PipelineLock {
            pipeline_id: pipeline_id.to_string(),
            guard: Some(lock.lock_owned().await),
            inner: self.inner.clone(),
        }
    }

    fn pipeline_locks(&self) -> MutexGuard<'_, HashMap<String, Arc<Mutex<()>>>> {
        lock_map(&self.inner)
    }
}

fn lock_map(inner: &Inner) -> MutexGuard<'_, HashMap<String, Arc<Mutex<()>>>> {
    inner
        .pipeline_locks
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Exclusive hold on one pipeline ID
///
/// Dropping it releases the ID; the lock entry itself is pruned once nobody
/// else holds or waits on it.
pub struct PipelineLock {
    pipeline_id: String,
    guard: Option<OwnedMutexGuard<()>>,
    inner: Arc<Inner>,
}

impl PipelineLock {
    pub fn pipeline_id(&self) -> &str {
        &self.pipeline_id
    }
}

impl Drop for PipelineLock {
    fn drop(&mut self) {
        // The guard holds a reference to the mutex; release it first
        self.guard.take();

        let mut locks = lock_map(&self.inner);
        if let Some(lock) = locks.get(&self.pipeline_id) {
            if Arc::strong_count(lock) == 1 {
                locks.remove(&self.pipeline_id);
            }
        }
    }
}

impl std::fmt::Debug for PipelineLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineLock")
            .field("pipeline_id", &self.pipeline_id)
            .finish()
    }
}
