//! Pipeline domain model

use crate::core::{config::PipelineConfig, stage::Stage};
use serde::{Deserialize, Serialize};

/// A stored pipeline definition
///
/// The runner only ever sees a snapshot of this: edits to the stored definition
/// don't reach a run that has already been triggered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipeline {
    /// Unique pipeline identifier
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// Source repository the pipeline builds
    pub repository: String,

    /// Ordered stages
    pub stages: Vec<Stage>,

    /// Run all stages concurrently instead of one after another
    #[serde(default)]
    pub parallel: bool,
}

impl Pipeline {
    /// Create a pipeline from configuration
    pub fn from_config(id: impl Into<String>, config: &PipelineConfig) -> Self {
        Pipeline {
            id: id.into(),
            name: config.name.clone(),
            repository: config.repository.clone(),
            stages: config.stages.clone(),
            parallel: config.parallel,
        }
    }
}
