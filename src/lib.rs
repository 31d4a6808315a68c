//! pipeline-runner - schedules and supervises multi-stage pipelines

pub mod api;
pub mod cli;
pub mod client;
pub mod core;
pub mod execution;
pub mod persistence;
pub mod stages;

// Re-export commonly used types
pub use client::PipelineClient;
pub use core::{Pipeline, PipelineConfig, RunStatus, RunSummary, RunTicket, Stage, StageKind};
pub use execution::{ExecutionEngine, ExecutionEvent, RunRegistry, SchedulingStrategy, StageRunner};
pub use persistence::{InMemoryPipelineStore, PipelineStore};
pub use stages::{SharedExecutor, ShellExecutor, SimulatedExecutor, StageError, StageExecutor};
