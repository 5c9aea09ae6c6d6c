//! Pipeline execution

pub mod engine;
pub mod process;

pub use engine::{
    EventHandler, ExecutionEvent, PipelineEngine, RunOutcome, StepFailure,
    SPAWN_FAILURE_EXIT_CODE, TIMEOUT_EXIT_CODE,
};
pub use process::{CommandRunner, RunnerError, ShellRunner, StepOutput};
