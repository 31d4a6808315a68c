//! Core domain models
//!
//! Pipelines, their stages, and the status of a run.

pub mod config;
pub mod pipeline;
pub mod stage;
pub mod state;

pub use config::PipelineConfig;
pub use pipeline::*;
pub use stage::*;
pub use state::*;
