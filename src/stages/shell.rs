//! Shell executor - runs Run-stage commands as child processes

use crate::core::{BuildStage, DeployStage, RunStage};
use crate::stages::{SimulatedExecutor, StageError, StageExecutor};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

/// Executes Run stages with `sh -c`; Build and Deploy are simulated
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    /// Path to the shell
    shell: String,

    /// Used for stage types that don't run locally
    fallback: SimulatedExecutor,
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new("sh".to_string())
    }
}

impl ShellExecutor {
    /// Create a new shell executor
    ///
    /// # Arguments
    /// * `shell` - Path to a POSIX shell (e.g., "sh", "/bin/bash")
    pub fn new(shell: String) -> Self {
        Self {
            shell,
            fallback: SimulatedExecutor::default(),
        }
    }

    pub fn with_fallback(mut self, fallback: SimulatedExecutor) -> Self {
        self.fallback = fallback;
        self
    }

    /// Get the shell path
    #[cfg(test)]
    pub fn shell(&self) -> &str {
        &self.shell
    }
}

#[async_trait]
impl StageExecutor for ShellExecutor {
    /// Run the stage command and wait for it to exit
    ///
    /// The child is killed if this future is dropped, which is how timeouts
    /// and cancellation reach the process.
    ///
    /// # Errors
    /// Returns `StageError::Failed` if:
    /// - The shell cannot be spawned
    /// - The command exits with a non-zero status
    async fn run(&self, stage: &RunStage) -> Result<(), StageError> {
        debug!(stage = %stage.name, "Spawning {} -c {:?}", self.shell, stage.command);

        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(&stage.command)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| StageError::Failed(format!("Failed to spawn {}: {}", self.shell, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let exit_code = output.status.code().unwrap_or(-1);
            warn!(stage = %stage.name, "Command exited with code {}: {}", exit_code, stderr.trim());
            return Err(StageError::Failed(format!(
                "command exited with code {}: {}",
                exit_code,
                stderr.trim()
            )));
        }

        debug!(
            stage = %stage.name,
            "Command returned {} bytes of output",
            output.stdout.len()
        );

        Ok(())
    }

    async fn build(&self, stage: &BuildStage) -> Result<(), StageError> {
        self.fallback.build(stage).await
    }

    async fn deploy(&self, stage: &DeployStage) -> Result<(), StageError> {
        self.fallback.deploy(stage).await
    }
}
