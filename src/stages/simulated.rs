//! Executor that pretends to do the work
//!
//! Stages are assumed to run on remote runner machines; this stand-in just
//! logs what it would do and waits for a while.

use crate::core::{BuildStage, DeployStage, RunStage};
use crate::stages::{StageError, StageExecutor};
use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

/// Simulated stage executor
#[derive(Debug, Clone)]
pub struct SimulatedExecutor {
    run_duration: Duration,
    build_duration: Duration,
    deploy_duration: Duration,
}

impl Default for SimulatedExecutor {
    fn default() -> Self {
        Self {
            run_duration: Duration::from_secs(2),
            build_duration: Duration::from_secs(3),
            deploy_duration: Duration::from_secs(5),
        }
    }
}

impl SimulatedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_durations(run: Duration, build: Duration, deploy: Duration) -> Self {
        Self {
            run_duration: run,
            build_duration: build,
            deploy_duration: deploy,
        }
    }
}

#[async_trait]
impl StageExecutor for SimulatedExecutor {
    async fn run(&self, stage: &RunStage) -> Result<(), StageError> {
        info!(stage = %stage.name, "Running command: {}", stage.command);
        tokio::time::sleep(self.run_duration).await;
        info!(stage = %stage.name, "Stage completed");
        Ok(())
    }

    async fn build(&self, stage: &BuildStage) -> Result<(), StageError> {
        info!(
            stage = %stage.name,
            "Building Docker image from {} and pushing to {}",
            stage.dockerfile,
            stage.ecr_repository
        );
        tokio::time::sleep(self.build_duration).await;
        info!(stage = %stage.name, "Stage completed");
        Ok(())
    }

    async fn deploy(&self, stage: &DeployStage) -> Result<(), StageError> {
        info!(
            stage = %stage.name,
            "Applying Kubernetes manifest {} to cluster {}",
            stage.k8s_manifest,
            stage.cluster
        );
        tokio::time::sleep(self.deploy_duration).await;
        info!(stage = %stage.name, "Stage completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Stage;

    #[tokio::test(start_paused = true)]
    async fn test_simulated_stages_succeed() {
        let executor = SimulatedExecutor::new();
        let start = tokio::time::Instant::now();

        let Stage::Deploy(deploy) = Stage::deploy("app", "k8s/app.yaml", "prod") else {
            unreachable!()
        };
        executor.deploy(&deploy).await.unwrap();

        assert!(start.elapsed() >= Duration::from_secs(5));
    }
}
