//! Storage of pipeline definitions

use crate::core::{Pipeline, PipelineConfig};
use anyhow::Result;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Trait for definition storage backends
#[async_trait::async_trait]
pub trait PipelineStore: Send + Sync {
    /// Store a new pipeline under a freshly generated ID
    async fn create(&self, config: PipelineConfig) -> Result<Pipeline>;

    /// Load a pipeline by ID
    async fn get(&self, id: &str) -> Result<Option<Pipeline>>;

    /// Replace an existing pipeline's definition
    ///
    /// Returns `None` if there is no pipeline with this ID.
    async fn update(&self, id: &str, config: PipelineConfig) -> Result<Option<Pipeline>>;

    /// Delete a pipeline, returning whether it existed
    async fn delete(&self, id: &str) -> Result<bool>;

    /// List all pipelines
    async fn list(&self) -> Result<Vec<Pipeline>>;
}

/// In-memory definition store
pub struct InMemoryPipelineStore {
    pipelines: RwLock<HashMap<String, Pipeline>>,
}

impl InMemoryPipelineStore {
    pub fn new() -> Self {
        Self {
            pipelines: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryPipelineStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PipelineStore for InMemoryPipelineStore {
    async fn create(&self, config: PipelineConfig) -> Result<Pipeline> {
        let pipeline = config.to_pipeline(Uuid::new_v4().to_string());
        let mut pipelines = self.pipelines.write().await;
        pipelines.insert(pipeline.id.clone(), pipeline.clone());
        Ok(pipeline)
    }

    async fn get(&self, id: &str) -> Result<Option<Pipeline>> {
        let pipelines = self.pipelines.read().await;
        Ok(pipelines.get(id).cloned())
    }

    async fn update(&self, id: &str, config: PipelineConfig) -> Result<Option<Pipeline>> {
        let mut pipelines = self.pipelines.write().await;
        match pipelines.get_mut(id) {
            Some(existing) => {
                *existing = config.to_pipeline(id);
                Ok(Some(existing.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut pipelines = self.pipelines.write().await;
        Ok(pipelines.remove(id).is_some())
    }

    async fn list(&self) -> Result<Vec<Pipeline>> {
        let pipelines = self.pipelines.read().await;
        let mut all: Vec<Pipeline> = pipelines.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(all)
    }
}
