//! Pipeline configuration from YAML

use crate::core::Pipeline;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Top-level pipeline configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name
    pub name: String,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    /// Working directory all steps run in (defaults to the current directory)
    #[serde(default)]
    pub working_dir: Option<String>,

    /// Environment variables applied to every step (e.g. an interpreter
    /// version pin like PYTHON_VERSION=3.10.5)
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Pipeline steps, in execution order
    pub steps: Vec<StepConfig>,

    /// Default timeout for steps in seconds (no timeout if unset)
    #[serde(default)]
    pub default_timeout_secs: Option<u64>,
}

/// Step configuration as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    /// Unique step identifier
    pub id: String,

    /// Human-readable step name, used in reporting
    pub name: String,

    /// Optional step description
    #[serde(default)]
    pub description: Option<String>,

    /// The shell command line this step executes
    pub run: String,

    /// Environment variable overrides for this step (win over pipeline env)
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Timeout for this step in seconds (overrides the pipeline default)
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Shell to run the command with (defaults to "sh")
    #[serde(default)]
    pub shell: Option<String>,
}

impl PipelineConfig {
    /// Load pipeline configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse pipeline configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the pipeline configuration
    pub fn validate(&self) -> Result<()> {
        if self.steps.is_empty() {
            anyhow::bail!("Pipeline '{}' has no steps", self.name);
        }

        // A zero default would flow into every step and time it out
        // immediately
        if self.default_timeout_secs == Some(0) {
            anyhow::bail!("Pipeline '{}' has a zero default timeout", self.name);
        }

        // Check that all step IDs are unique
        let mut seen_ids = std::collections::HashSet::new();
        for step in &self.steps {
            if !seen_ids.insert(&step.id) {
                anyhow::bail!("Duplicate step ID: {}", step.id);
            }

            if step.run.trim().is_empty() {
                anyhow::bail!("Step '{}' has an empty run command", step.id);
            }

            if let Some(secs) = step.timeout_secs {
                if secs == 0 {
                    anyhow::bail!("Step '{}' has a zero timeout", step.id);
                }
            }
        }

        // The working directory must exist before any step runs in it
        if let Some(ref dir) = self.working_dir {
            if !Path::new(dir).is_dir() {
                anyhow::bail!("Working directory does not exist: {}", dir);
            }
        }

        Ok(())
    }

    /// Convert config to a Pipeline domain model
    pub fn to_pipeline(&self) -> Pipeline {
        Pipeline::from_config(self)
    }
}
