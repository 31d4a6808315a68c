//! Test utility functions for pipeline-runner
#![allow(dead_code)]

use async_trait::async_trait;
use pipeline_runner::core::{BuildStage, DeployStage, Pipeline, RunStage, Stage};
use pipeline_runner::execution::{ExecutionEngine, RunRegistry};
use pipeline_runner::stages::{StageError, StageExecutor};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What happened to a stage inside the executor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Started(String),
    Finished(String),
}

/// Executor whose per-stage behaviour is scripted up front
///
/// Every stage succeeds immediately unless given a delay or marked to fail
/// or panic.
/// Calls are recorded in order, shared across clones.
#[derive(Clone, Default)]
pub struct ScriptedExecutor {
    delays: HashMap<String, Duration>,
    failures: HashSet<String>,
    panics: HashSet<String>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, stage: &str, delay: Duration) -> Self {
        self.delays.insert(stage.to_string(), delay);
        self
    }

    pub fn with_failure(mut self, stage: &str) -> Self {
        self.failures.insert(stage.to_string());
        self
    }

    pub fn with_panic(mut self, stage: &str) -> Self {
        self.panics.insert(stage.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Names of stages the executor was asked to run, in order
    pub fn started(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Started(name) => Some(name),
                Call::Finished(_) => None,
            })
            .collect()
    }

    /// Names of stages that ran to the end, in order
    pub fn finished(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Finished(name) => Some(name),
                Call::Started(_) => None,
            })
            .collect()
    }

    async fn perform(&self, name: &str) -> Result<(), StageError> {
        self.calls.lock().unwrap().push(Call::Started(name.to_string()));

        if self.panics.contains(name) {
            panic!("{} was scripted to panic", name);
        }

        if let Some(delay) = self.delays.get(name) {
            tokio::time::sleep(*delay).await;
        }

        self.calls.lock().unwrap().push(Call::Finished(name.to_string()));

        if self.failures.contains(name) {
            Err(StageError::Failed(format!("{} was scripted to fail", name)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StageExecutor for ScriptedExecutor {
    async fn run(&self, stage: &RunStage) -> Result<(), StageError> {
        self.perform(&stage.name).await
    }

    async fn build(&self, stage: &BuildStage) -> Result<(), StageError> {
        self.perform(&stage.name).await
    }

    async fn deploy(&self, stage: &DeployStage) -> Result<(), StageError> {
        self.perform(&stage.name).await
    }
}

/// Build a pipeline with the given stages
pub fn pipeline(id: &str, stages: Vec<Stage>, parallel: bool) -> Pipeline {
    Pipeline {
        id: id.to_string(),
        name: format!("{} pipeline", id),
        repository: "https://example.com/repo.git".to_string(),
        stages,
        parallel,
    }
}

/// The usual test, build, deploy chain
pub fn release_stages() -> Vec<Stage> {
    vec![
        Stage::run("test", "cargo test"),
        Stage::build("img", "Dockerfile", "registry/app"),
        Stage::deploy("app", "k8s/app.yaml", "staging"),
    ]
}

/// Create an engine over a scripted executor, returning both
pub fn engine_with(executor: ScriptedExecutor) -> (ExecutionEngine<ScriptedExecutor>, ScriptedExecutor) {
    let engine = ExecutionEngine::new(executor.clone(), RunRegistry::new());
    (engine, executor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_executor_records_calls() {
        let executor = ScriptedExecutor::new().with_failure("bad");

        let (Stage::Run(ok), Stage::Run(bad)) = (Stage::run("ok", "true"), Stage::run("bad", "false")) else {
            unreachable!()
        };
        assert!(executor.run(&ok).await.is_ok());
        assert!(executor.run(&bad).await.is_err());

        assert_eq!(executor.started(), vec!["ok", "bad"]);
        assert_eq!(executor.finished(), vec!["ok", "bad"]);
    }
}
