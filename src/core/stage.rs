//! Stage domain model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default timeout for Run stages that don't declare one
pub const DEFAULT_RUN_TIMEOUT_SECS: u64 = 300;

fn default_run_timeout() -> u64 {
    DEFAULT_RUN_TIMEOUT_SECS
}

/// A single unit of work in a pipeline
///
/// Stages are tagged on the wire by their `type` field. A tag that isn't one of
/// `Run`, `Build` or `Deploy` lands in [`Stage::Unknown`], which the runner
/// refuses to execute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Stage {
    Run(RunStage),
    Build(BuildStage),
    Deploy(DeployStage),
    #[serde(other)]
    Unknown,
}

/// Run a shell command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStage {
    pub name: String,
    pub command: String,
    /// Upper bound on the command's execution, in seconds
    #[serde(default = "default_run_timeout")]
    pub timeout_secs: u64,
}

/// Build a container image and push it to a registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStage {
    pub name: String,
    pub dockerfile: String,
    pub ecr_repository: String,
}

/// Apply a Kubernetes manifest to a cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployStage {
    pub name: String,
    pub k8s_manifest: String,
    pub cluster: String,
}

/// Discriminant of a [`Stage`], mostly for logs and events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageKind {
    Run,
    Build,
    Deploy,
    Unknown,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StageKind::Run => "run",
            StageKind::Build => "build",
            StageKind::Deploy => "deploy",
            StageKind::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

impl Stage {
    pub fn run(name: impl Into<String>, command: impl Into<String>) -> Self {
        Stage::Run(RunStage {
            name: name.into(),
            command: command.into(),
            timeout_secs: DEFAULT_RUN_TIMEOUT_SECS,
        })
    }

    pub fn build(
        name: impl Into<String>,
        dockerfile: impl Into<String>,
        ecr_repository: impl Into<String>,
    ) -> Self {
        Stage::Build(BuildStage {
            name: name.into(),
            dockerfile: dockerfile.into(),
            ecr_repository: ecr_repository.into(),
        })
    }

    pub fn deploy(
        name: impl Into<String>,
        k8s_manifest: impl Into<String>,
        cluster: impl Into<String>,
    ) -> Self {
        Stage::Deploy(DeployStage {
            name: name.into(),
            k8s_manifest: k8s_manifest.into(),
            cluster: cluster.into(),
        })
    }

    /// Stage name, used for diagnostics only
    pub fn name(&self) -> &str {
        match self {
            Stage::Run(s) => &s.name,
            Stage::Build(s) => &s.name,
            Stage::Deploy(s) => &s.name,
            Stage::Unknown => "<unknown>",
        }
    }

    pub fn kind(&self) -> StageKind {
        match self {
            Stage::Run(_) => StageKind::Run,
            Stage::Build(_) => StageKind::Build,
            Stage::Deploy(_) => StageKind::Deploy,
            Stage::Unknown => StageKind::Unknown,
        }
    }

    /// The timeout the stage declares for itself.
    ///
    /// Only Run stages carry one; Build and Deploy fall back to whatever the
    /// runner is configured with.
    pub fn declared_timeout(&self) -> Option<Duration> {
        match self {
            Stage::Run(s) => Some(Duration::from_secs(s.timeout_secs)),
            _ => None,
        }
    }
}
