//! Stage runner - dispatches a stage to its executor under a timeout and a
//! cancellation token

use crate::{
    core::Stage,
    stages::{StageError, StageExecutor},
};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Result of executing a stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// Stage completed successfully
    Succeeded,
    /// Stage failed, timed out or couldn't be dispatched
    Failed(StageError),
    /// Stage was interrupted by cancellation
    Cancelled,
}

/// Runs single stages with an executor
pub struct StageRunner<E> {
    executor: E,
    /// Applied to stages that don't declare their own timeout
    default_timeout: Option<Duration>,
}

impl<E: StageExecutor> StageRunner<E> {
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            default_timeout: None,
        }
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Execute a stage and return the outcome
    ///
    /// Cancellation wins over completion: once `cancel` fires the executor
    /// future is dropped and `Cancelled` is returned.
    pub async fn execute(
        &self,
        pipeline_id: &str,
        stage: &Stage,
        cancel: &CancellationToken,
    ) -> StageOutcome {
        if cancel.is_cancelled() {
            return StageOutcome::Cancelled;
        }

        info!(pipeline = %pipeline_id, stage = %stage.name(), kind = %stage.kind(), "Executing stage");

        let limit = stage.declared_timeout().or(self.default_timeout);
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(pipeline = %pipeline_id, stage = %stage.name(), "Stage cancelled");
                return StageOutcome::Cancelled;
            }
            result = with_limit(limit, self.dispatch(stage)) => result,
        };

        match result {
            Ok(()) => {
                info!(pipeline = %pipeline_id, stage = %stage.name(), "Stage completed successfully");
                StageOutcome::Succeeded
            }
            Err(e) => {
                error!(pipeline = %pipeline_id, stage = %stage.name(), "Stage failed: {}", e);
                StageOutcome::Failed(e)
            }
        }
    }

    async fn dispatch(&self, stage: &Stage) -> Result<(), StageError> {
        match stage {
            Stage::Run(run) => self.executor.run(run).await,
            Stage::Build(build) => self.executor.build(build).await,
            Stage::Deploy(deploy) => self.executor.deploy(deploy).await,
            Stage::Unknown => Err(StageError::UnknownVariant),
        }
    }
}

async fn with_limit<F>(limit: Option<Duration>, work: F) -> Result<(), StageError>
where
    F: Future<Output = Result<(), StageError>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, work)
            .await
            .unwrap_or(Err(StageError::Timeout(limit))),
        None => work.await,
    }
}
