//! Pipeline definition payloads, from files or request bodies

use crate::core::{stage::Stage, Pipeline};
use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;

/// Pipeline definition as supplied by a user, before it is given an ID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name
    pub name: String,

    /// Source repository
    #[serde(default)]
    pub repository: String,

    /// Pipeline stages, in declaration order
    pub stages: Vec<Stage>,

    /// Run stages concurrently
    #[serde(default)]
    pub parallel: bool,
}

fn stage_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").expect("stage name pattern is valid")
    })
}

impl PipelineConfig {
    /// Load pipeline configuration from a YAML (or JSON) file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse pipeline configuration from a YAML string
    ///
    /// JSON is a subset of YAML, so JSON definitions parse too.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the pipeline configuration
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("Pipeline name must not be empty");
        }

        if self.stages.is_empty() {
            anyhow::bail!("Pipeline '{}' has no stages", self.name);
        }

        let mut seen_names = HashSet::new();
        for (index, stage) in self.stages.iter().enumerate() {
            if matches!(stage, Stage::Unknown) {
                anyhow::bail!(
                    "Stage #{} has an unsupported type. Supported types are 'Run', 'Build', 'Deploy'",
                    index + 1
                );
            }

            let name = stage.name();
            if !stage_name_pattern().is_match(name) {
                anyhow::bail!("Invalid stage name: '{}'", name);
            }
            if !seen_names.insert(name) {
                anyhow::bail!("Duplicate stage name: {}", name);
            }

            match stage {
                Stage::Run(run) => {
                    require(name, "command", &run.command)?;
                    if run.timeout_secs == 0 {
                        anyhow::bail!("Stage '{}' timeout_secs must be greater than zero", name);
                    }
                }
                Stage::Build(build) => {
                    require(name, "dockerfile", &build.dockerfile)?;
                    require(name, "ecr_repository", &build.ecr_repository)?;
                }
                Stage::Deploy(deploy) => {
                    require(name, "k8s_manifest", &deploy.k8s_manifest)?;
                    require(name, "cluster", &deploy.cluster)?;
                }
                Stage::Unknown => {}
            }
        }

        Ok(())
    }

    /// Convert config to a Pipeline domain model
    pub fn to_pipeline(&self, id: impl Into<String>) -> Pipeline {
        Pipeline::from_config(id, self)
    }
}

fn require(stage: &str, field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("Stage '{}' is missing '{}'", stage, field);
    }
    Ok(())
}
