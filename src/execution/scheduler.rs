//! Execution scheduler - runs a pipeline's stages in sequence or in parallel

use crate::{
    core::{Pipeline, RunStatus, Stage},
    execution::{EventBus, ExecutionEvent, StageOutcome, StageRunner},
    stages::{StageError, StageExecutor},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Strategy for scheduling stage execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SchedulingStrategy {
    /// Execute stages in declaration order, one at a time
    #[default]
    Sequential,

    /// Execute all stages at once
    Parallel,
}

impl SchedulingStrategy {
    pub fn for_pipeline(pipeline: &Pipeline) -> Self {
        if pipeline.parallel {
            SchedulingStrategy::Parallel
        } else {
            SchedulingStrategy::Sequential
        }
    }
}

impl fmt::Display for SchedulingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulingStrategy::Sequential => f.write_str("sequential"),
            SchedulingStrategy::Parallel => f.write_str("parallel"),
        }
    }
}

/// Runs the stages of one pipeline and decides the run's terminal status
pub struct ExecutionScheduler<E> {
    strategy: SchedulingStrategy,
    runner: Arc<StageRunner<E>>,
    events: EventBus,
}

impl<E: StageExecutor + 'static> ExecutionScheduler<E> {
    pub fn new(strategy: SchedulingStrategy, runner: Arc<StageRunner<E>>, events: EventBus) -> Self {
        Self {
            strategy,
            runner,
            events,
        }
    }

    /// Run every stage and return the terminal status
    pub async fn run(&self, pipeline: &Pipeline, cancel: &CancellationToken) -> RunStatus {
        match self.strategy {
            SchedulingStrategy::Sequential => self.run_sequential(pipeline, cancel).await,
            SchedulingStrategy::Parallel => self.run_parallel(pipeline, cancel).await,
        }
    }

    async fn run_sequential(&self, pipeline: &Pipeline, cancel: &CancellationToken) -> RunStatus {
        info!(pipeline = %pipeline.id, "Running {} stages in sequence", pipeline.stages.len());

        for stage in &pipeline.stages {
            if cancel.is_cancelled() {
                warn!(pipeline = %pipeline.id, "Run cancelled before stage '{}'", stage.name());
                return RunStatus::Canceled;
            }

            match execute_stage(&self.runner, &self.events, &pipeline.id, stage, cancel).await {
                StageOutcome::Succeeded => {}
                StageOutcome::Failed(e) => {
                    error!(
                        pipeline = %pipeline.id,
                        stage = %stage.name(),
                        "Failed to run stage: {}; skipping remaining stages",
                        e
                    );
                    return RunStatus::Failed;
                }
                StageOutcome::Cancelled => return RunStatus::Canceled,
            }
        }

        RunStatus::Completed
    }

    async fn run_parallel(&self, pipeline: &Pipeline, cancel: &CancellationToken) -> RunStatus {
        info!(pipeline = %pipeline.id, "Running {} stages in parallel", pipeline.stages.len());

        // Fail-fast cancels this group without touching the caller's token
        let group = cancel.child_token();
        let mut tasks = JoinSet::new();

        for stage in pipeline.stages.iter().cloned() {
            let runner = self.runner.clone();
            let events = self.events.clone();
            let group = group.clone();
            let pipeline_id = pipeline.id.clone();

            tasks.spawn(async move {
                let outcome = execute_stage(&runner, &events, &pipeline_id, &stage, &group).await;
                (stage.name().to_string(), outcome)
            });
        }

        let mut failed = false;
        while let Some(joined) = tasks.join_next().await {
            let failure = match joined {
                Ok((_, StageOutcome::Succeeded)) | Ok((_, StageOutcome::Cancelled)) => None,
                Ok((stage, StageOutcome::Failed(e))) => Some(format!("stage '{}': {}", stage, e)),
                Err(e) => Some(format!("stage task panicked: {}", e)),
            };

            if let Some(reason) = failure {
                if failed || cancel.is_cancelled() {
                    continue;
                }
                error!(pipeline = %pipeline.id, "Failed to run pipeline ({}); cancelling siblings", reason);
                failed = true;
                group.cancel();
            }
        }

        if failed {
            RunStatus::Failed
        } else if cancel.is_cancelled() {
            RunStatus::Canceled
        } else {
            RunStatus::Completed
        }
    }
}

/// Execute one stage, publishing its lifecycle events
///
/// The stage runs in its own task, so an executor that panics fails the
/// stage instead of taking the whole run down with it.
async fn execute_stage<E: StageExecutor + 'static>(
    runner: &Arc<StageRunner<E>>,
    events: &EventBus,
    pipeline_id: &str,
    stage: &Stage,
    cancel: &CancellationToken,
) -> StageOutcome {
    events
        .emit(ExecutionEvent::StageStarted {
            pipeline_id: pipeline_id.to_string(),
            stage: stage.name().to_string(),
            kind: stage.kind(),
        })
        .await;

    let task = {
        let runner = runner.clone();
        let pipeline_id = pipeline_id.to_string();
        let stage = stage.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { runner.execute(&pipeline_id, &stage, &cancel).await })
    };

    let outcome = match task.await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(pipeline = %pipeline_id, stage = %stage.name(), "Stage task ended abnormally: {}", e);
            StageOutcome::Failed(StageError::Failed(format!("stage task panicked: {}", e)))
        }
    };

    let event = match &outcome {
        StageOutcome::Succeeded => ExecutionEvent::StageCompleted {
            pipeline_id: pipeline_id.to_string(),
            stage: stage.name().to_string(),
        },
        StageOutcome::Failed(e) => ExecutionEvent::StageFailed {
            pipeline_id: pipeline_id.to_string(),
            stage: stage.name().to_string(),
            error: e.to_string(),
        },
        StageOutcome::Cancelled => ExecutionEvent::StageCancelled {
            pipeline_id: pipeline_id.to_string(),
            stage: stage.name().to_string(),
        },
    };
    events.emit(event).await;

    outcome
}
