//! gantry - a fail-fast runner for CI quality-gate pipelines

pub mod cli;
pub mod core;
pub mod runner;

// Re-export commonly used types
pub use self::core::{ExecutionStatus, Pipeline, PipelineState, Step, StepState};
pub use self::runner::{
    CommandRunner, ExecutionEvent, PipelineEngine, RunOutcome, RunnerError, ShellRunner,
    StepFailure, StepOutput,
};
