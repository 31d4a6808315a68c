//! Main execution engine - triggers, supervises and cancels pipeline runs

use crate::{
    core::{Pipeline, RunStatus, RunSummary, RunTicket},
    execution::{
        EventBus, ExecutionEvent, ExecutionScheduler, PipelineLock, RunHandle, RunRegistry,
        SchedulingStrategy, StageRunner,
    },
    stages::StageExecutor,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Runs pipelines, at most one active run per pipeline ID
pub struct ExecutionEngine<E> {
    runner: Arc<StageRunner<E>>,
    registry: RunRegistry,
    events: EventBus,
}

impl<E: StageExecutor + 'static> ExecutionEngine<E> {
    pub fn new(executor: E, registry: RunRegistry) -> Self {
        Self::with_runner(StageRunner::new(executor), registry)
    }

    pub fn with_runner(runner: StageRunner<E>, registry: RunRegistry) -> Self {
        Self {
            runner: Arc::new(runner),
            registry,
            events: EventBus::new(),
        }
    }

    pub fn registry(&self) -> &RunRegistry {
        &self.registry
    }

    /// Add an event handler
    pub async fn add_event_handler<F>(&self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(handler).await;
    }

    /// Start a run of `pipeline`, replacing any run already in flight.
    ///
    /// Returns once the new run is registered; it does not wait for the stages.
    /// The pipeline is a snapshot: later edits to its definition don't affect
    /// this run.
    pub async fn trigger(&self, pipeline: Pipeline) -> RunTicket {
        let lock = self.lock_pipeline(&pipeline.id).await;
        self.trigger_locked(&lock, pipeline).await
    }

    /// Take the pipeline's lock for a sequence of `*_locked` calls.
    ///
    /// Callers that read the definition from a store should do so while
    /// holding this, so a concurrent delete can't slip in between.
    pub async fn lock_pipeline(&self, pipeline_id: &str) -> PipelineLock {
        self.registry.lock_pipeline(pipeline_id).await
    }

    /// [`trigger`](Self::trigger) for a caller already holding the lock
    pub async fn trigger_locked(&self, lock: &PipelineLock, pipeline: Pipeline) -> RunTicket {
        debug_assert_eq!(lock.pipeline_id(), pipeline.id);
        let pipeline_id = pipeline.id.clone();

        self.cancel_locked(&pipeline_id).await;

        let strategy = SchedulingStrategy::for_pipeline(&pipeline);
        let scheduler = ExecutionScheduler::new(strategy, self.runner.clone(), self.events.clone());
        let registry = self.registry.clone();
        let events = self.events.clone();
        let token = CancellationToken::new();

        let ticket = self
            .registry
            .insert_running(&pipeline_id, |run_id| {
                let cancel = token.clone();
                let task = tokio::spawn(async move {
                    let pipeline_id = pipeline.id.clone();
                    let run_events = events.clone();
                    let run = tokio::spawn(async move {
                        run_events
                            .emit(ExecutionEvent::RunStarted {
                                pipeline_id: pipeline.id.clone(),
                                run_id,
                                strategy,
                                stages: pipeline.stages.len(),
                            })
                            .await;
                        scheduler.run(&pipeline, &cancel).await
                    });

                    let status = match run.await {
                        Ok(status) => status,
                        Err(e) => {
                            error!(pipeline = %pipeline_id, %run_id, "Pipeline run panicked: {}", e);
                            RunStatus::Failed
                        }
                    };

                    if registry.finish(&pipeline_id, run_id, status).await {
                        info!(pipeline = %pipeline_id, %run_id, "Pipeline run finished: {}", status);
                    } else {
                        debug!(pipeline = %pipeline_id, %run_id, "Run state already settled, not recording {}", status);
                    }

                    events
                        .emit(ExecutionEvent::RunFinished {
                            pipeline_id,
                            run_id,
                            status,
                        })
                        .await;

                    status
                });

                RunHandle { token, task }
            })
            .await;

        info!(pipeline = %pipeline_id, run_id = %ticket.run_id, %strategy, "Pipeline triggered");
        ticket
    }

    /// Cancel the pipeline's current run and wait until it has stopped.
    ///
    /// No-op if nothing is running. Safe to call repeatedly.
    pub async fn cancel_if_running(&self, pipeline_id: &str) {
        let _lock = self.lock_pipeline(pipeline_id).await;
        self.cancel_locked(pipeline_id).await;
    }

    /// Cancel the pipeline's run, then drop its registry entry.
    ///
    /// Used when a pipeline definition is deleted. Returns the final state of
    /// the removed run.
    pub async fn forget(&self, pipeline_id: &str) -> Option<RunSummary> {
        let lock = self.lock_pipeline(pipeline_id).await;
        self.forget_locked(&lock).await
    }

    /// [`forget`](Self::forget) for a caller already holding the lock
    pub async fn forget_locked(&self, lock: &PipelineLock) -> Option<RunSummary> {
        let pipeline_id = lock.pipeline_id();
        self.cancel_locked(pipeline_id).await;
        self.registry
            .remove(pipeline_id)
            .await
            .map(|state| state.summary(pipeline_id))
    }

    /// Status of the pipeline's current (or last) run
    pub async fn run_status(&self, pipeline_id: &str) -> Option<RunSummary> {
        self.registry.get(pipeline_id).await
    }

    /// Every tracked run, current or last, ordered by pipeline ID
    pub async fn runs(&self) -> Vec<RunSummary> {
        self.registry.list().await
    }

    /// Wait for the pipeline's current run to reach a terminal status
    pub async fn wait(&self, pipeline_id: &str) -> Option<RunStatus> {
        let mut rx = self.registry.subscribe(pipeline_id).await?;
        let settled = rx.wait_for(|status| status.is_terminal()).await.map(|s| *s);
        // The sender goes away with the registry entry; its last value stands
        Some(settled.unwrap_or_else(|_| *rx.borrow()))
    }

    /// Cancel every running pipeline
    pub async fn shutdown(&self) {
        for pipeline_id in self.registry.running().await {
            self.cancel_if_running(&pipeline_id).await;
        }
    }

    /// Caller must hold the pipeline lock
    async fn cancel_locked(&self, pipeline_id: &str) {
        let Some((run_id, handle)) = self.registry.take_handle_if_running(pipeline_id).await else {
            return;
        };

        warn!(pipeline = %pipeline_id, %run_id, "Pipeline is running. Canceling it.");
        handle.token.cancel();

        // The run normally records its own status; this covers a task that
        // died without recording anything.
        let fallback = match handle.task.await {
            Ok(status) => {
                debug!(pipeline = %pipeline_id, %run_id, "Cancelled run stopped as {}", status);
                RunStatus::Canceled
            }
            Err(e) if e.is_panic() => {
                error!(pipeline = %pipeline_id, %run_id, "Run task panicked: {}", e);
                RunStatus::Failed
            }
            Err(e) => {
                error!(pipeline = %pipeline_id, %run_id, "Run task ended abnormally: {}", e);
                RunStatus::Canceled
            }
        };

        self.registry.finish(pipeline_id, run_id, fallback).await;
    }
}
