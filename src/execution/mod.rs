//! Pipeline execution engine

pub mod engine;
pub mod events;
pub mod executor;
pub mod registry;
pub mod scheduler;

pub use engine::ExecutionEngine;
pub use events::{EventBus, EventHandler, ExecutionEvent};
pub use executor::{StageOutcome, StageRunner};
pub use registry::{PipelineLock, RunHandle, RunRegistry, RunState};
pub use scheduler::{ExecutionScheduler, SchedulingStrategy};
