//! Run state models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Status of a pipeline run
///
/// A run is created already `Running`; there is no pending state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Stages are executing
    Running,
    /// Every stage succeeded
    Completed,
    /// A stage failed, timed out or couldn't be dispatched
    Failed,
    /// The run was interrupted by an explicit cancellation
    Canceled,
}

impl RunStatus {
    /// Check if the status is final
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Canceled => "canceled",
        };
        f.write_str(s)
    }
}

/// Read-only view of the run currently tracked for a pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Pipeline the run belongs to
    pub pipeline_id: String,

    /// Unique ID of this run attempt
    pub run_id: Uuid,

    /// Current status
    pub status: RunStatus,

    /// When the run was triggered
    pub started_at: DateTime<Utc>,

    /// When the run reached a terminal status
    pub finished_at: Option<DateTime<Utc>>,
}

/// Acknowledgement returned by a trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTicket {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
}
