//! Stage executors - the work behind Run, Build and Deploy stages

pub mod shell;
pub mod simulated;

use crate::core::{BuildStage, DeployStage, RunStage};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use shell::ShellExecutor;
pub use simulated::SimulatedExecutor;

/// Why a stage did not succeed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageError {
    /// The stage's `type` tag wasn't recognised
    #[error("Unknown stage type")]
    UnknownVariant,

    #[error("Stage failed: {0}")]
    Failed(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),
}

/// Performs the work of each stage variant
///
/// Implementations don't need to poll for cancellation themselves: the runner
/// drops the returned future as soon as a run is canceled, so anything holding
/// external resources should release them on drop (e.g. `kill_on_drop`).
#[async_trait]
pub trait StageExecutor: Send + Sync {
    /// Run a shell command
    async fn run(&self, stage: &RunStage) -> Result<(), StageError>;

    /// Build an image and push it
    async fn build(&self, stage: &BuildStage) -> Result<(), StageError>;

    /// Apply a deployment manifest
    async fn deploy(&self, stage: &DeployStage) -> Result<(), StageError>;
}

#[async_trait]
impl<T: StageExecutor + ?Sized> StageExecutor for Arc<T> {
    async fn run(&self, stage: &RunStage) -> Result<(), StageError> {
        (**self).run(stage).await
    }

    async fn build(&self, stage: &BuildStage) -> Result<(), StageError> {
        (**self).build(stage).await
    }

    async fn deploy(&self, stage: &DeployStage) -> Result<(), StageError> {
        (**self).deploy(stage).await
    }
}

/// Type-erased executor, as held by the server
pub type SharedExecutor = Arc<dyn StageExecutor>;
