//! Pipeline domain model

use crate::core::{
    config::PipelineConfig,
    state::{ExecutionStatus, PipelineState, StepState},
    step::{Step, StepDefaults},
};
use std::path::PathBuf;

/// A pipeline definition
///
/// Steps execute strictly in declaration order; there is no dependency
/// graph. The ordered sequence is fixed once built from config.
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// Pipeline name
    pub name: String,

    /// Working directory all steps run in
    pub working_dir: PathBuf,

    /// Pipeline steps in execution order
    pub steps: Vec<Step>,

    /// Execution state
    pub state: PipelineState,
}

impl Pipeline {
    /// Create a pipeline from configuration
    pub fn from_config(config: &PipelineConfig) -> Self {
        let defaults = StepDefaults {
            timeout_secs: config.default_timeout_secs,
            shell: "sh".to_string(),
        };

        let steps = config
            .steps
            .iter()
            .map(|step_config| Step::from_config(step_config, &config.env, &defaults))
            .collect();

        Pipeline {
            name: config.name.clone(),
            working_dir: config
                .working_dir
                .as_ref()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            steps,
            state: PipelineState::new(),
        }
    }

    /// Get a step by ID
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Get a mutable step by ID
    pub fn step_mut(&mut self, id: &str) -> Option<&mut Step> {
        self.steps.iter_mut().find(|s| s.id == id)
    }

    /// Check if every step is in a terminal state
    pub fn is_complete(&self) -> bool {
        self.steps.iter().all(|s| s.state.is_terminal())
    }

    /// Check if the run has failed
    pub fn has_failed(&self) -> bool {
        self.state.status == ExecutionStatus::Failed
    }

    /// Get the failed step, if any (at most one under fail-fast)
    pub fn failed_step(&self) -> Option<&Step> {
        self.steps
            .iter()
            .find(|s| matches!(s.state, StepState::Failed { .. }))
    }

    /// Refresh the state counters from the step states
    pub fn update_state_counts(&mut self) {
        let mut completed = 0;
        let mut failed = 0;
        let mut skipped = 0;

        for step in &self.steps {
            match &step.state {
                StepState::Completed { .. } => completed += 1,
                StepState::Failed { .. } => failed += 1,
                StepState::Skipped => skipped += 1,
                _ => {}
            }
        }

        self.state.total_steps = self.steps.len();
        self.state.completed_steps = completed;
        self.state.failed_steps = failed;
        self.state.skipped_steps = skipped;
    }
}
