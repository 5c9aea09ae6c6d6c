//! Step domain model

use crate::core::{config::StepConfig, state::StepState};
use std::collections::HashMap;

/// A single step in a pipeline
///
/// A step maps to exactly one external command invocation. Steps are
/// immutable once built from config; only `state` changes during a run.
#[derive(Debug, Clone)]
pub struct Step {
    /// Unique step identifier
    pub id: String,

    /// Human-readable name, used in reporting
    pub name: String,

    /// The shell command line to execute
    pub command: String,

    /// Environment overrides, already merged with the pipeline env
    /// (step entries win over pipeline entries)
    pub env: HashMap<String, String>,

    /// Shell the command runs under
    pub shell: String,

    /// Optional per-step timeout in seconds
    pub timeout_secs: Option<u64>,

    /// Runtime state (not part of the definition)
    pub state: StepState,
}

/// Pipeline-level defaults applied when a step omits a setting
#[derive(Debug, Clone)]
pub struct StepDefaults {
    pub timeout_secs: Option<u64>,
    pub shell: String,
}

impl Default for StepDefaults {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            shell: "sh".to_string(),
        }
    }
}

impl Step {
    /// Create a step from a step config, merging the pipeline env under
    /// the step's own overrides
    pub fn from_config(
        config: &StepConfig,
        pipeline_env: &HashMap<String, String>,
        defaults: &StepDefaults,
    ) -> Self {
        let mut env = pipeline_env.clone();
        env.extend(config.env.clone());

        Step {
            id: config.id.clone(),
            name: config.name.clone(),
            command: config.run.clone(),
            env,
            shell: config
                .shell
                .clone()
                .unwrap_or_else(|| defaults.shell.clone()),
            timeout_secs: config.timeout_secs.or(defaults.timeout_secs),
            state: StepState::Pending,
        }
    }
}
