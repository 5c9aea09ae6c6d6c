//! Fail-fast execution engine - runs steps strictly in order

use crate::{
    core::{ExecutionStatus, Pipeline, StepState},
    runner::{CommandRunner, RunnerError},
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Exit code reported when a step's command could not be spawned
/// (shell convention for "command not found")
pub const SPAWN_FAILURE_EXIT_CODE: i32 = 127;

/// Exit code reported when a step times out (timeout(1) convention)
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Events emitted during a pipeline run
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    PipelineStarted {
        run_id: Uuid,
        pipeline_name: String,
        total_steps: usize,
    },
    StepStarted {
        step_id: String,
        step_name: String,
        index: usize,
        total: usize,
    },
    StepOutput {
        step_id: String,
        output: String,
    },
    StepCompleted {
        step_id: String,
        duration: Duration,
    },
    StepFailed {
        step_id: String,
        step_name: String,
        exit_code: i32,
        message: String,
    },
    StepSkipped {
        step_id: String,
    },
    PipelineCompleted {
        run_id: Uuid,
        status: ExecutionStatus,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

/// Details of the step that halted the run
#[derive(Debug, Clone)]
pub struct StepFailure {
    pub step_id: String,
    pub step_name: String,
    pub exit_code: i32,
    /// Last lines of the command's stderr (or the spawn/timeout message)
    pub stderr_tail: String,
}

/// Final result of one pipeline run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub status: ExecutionStatus,
    pub failed: Option<StepFailure>,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Completed
    }

    /// Process exit code for this run: 0 on success, otherwise the
    /// failing step's exit code
    pub fn exit_code(&self) -> i32 {
        self.failed.as_ref().map(|f| f.exit_code).unwrap_or(0)
    }
}

/// Sequential fail-fast pipeline engine
///
/// Each step starts only after the previous step completed. The first
/// non-zero exit (or spawn failure) halts the run; all later steps are
/// marked skipped and never execute.
pub struct PipelineEngine<R> {
    runner: R,
    event_handlers: Vec<EventHandler>,
}

impl<R: CommandRunner> PipelineEngine<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            event_handlers: Vec::new(),
        }
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
    }

    /// Emit an event to all handlers
    fn emit(&self, event: ExecutionEvent) {
        for handler in &self.event_handlers {
            handler(event.clone());
        }
    }

    /// Execute the pipeline and return its outcome
    pub async fn execute(&self, pipeline: &mut Pipeline) -> RunOutcome {
        let run_id = pipeline.state.run_id;
        let total = pipeline.steps.len();
        let working_dir = pipeline.working_dir.clone();

        info!("Starting pipeline run: {} ({})", pipeline.name, run_id);
        self.emit(ExecutionEvent::PipelineStarted {
            run_id,
            pipeline_name: pipeline.name.clone(),
            total_steps: total,
        });

        pipeline.state.start(total);

        let mut failure: Option<StepFailure> = None;

        for index in 0..total {
            if failure.is_some() {
                // Fail-fast: everything after the failed step is skipped
                let step_id = pipeline.steps[index].id.clone();
                pipeline.steps[index].state = StepState::Skipped;
                self.emit(ExecutionEvent::StepSkipped { step_id });
                continue;
            }

            let step = pipeline.steps[index].clone();
            let started_at = Utc::now();
            pipeline.steps[index].state = StepState::Running { started_at };

            info!("Executing step {} ({}/{})", step.id, index + 1, total);
            self.emit(ExecutionEvent::StepStarted {
                step_id: step.id.clone(),
                step_name: step.name.clone(),
                index: index + 1,
                total,
            });

            match self.runner.run(&step, &working_dir).await {
                Ok(output) if output.success() => {
                    info!(
                        "Step {} completed in {:?}",
                        step.id, output.duration
                    );
                    pipeline.steps[index].state = StepState::Completed {
                        started_at,
                        completed_at: Utc::now(),
                        duration_ms: output.duration.as_millis() as u64,
                    };
                    if !output.stdout.is_empty() {
                        self.emit(ExecutionEvent::StepOutput {
                            step_id: step.id.clone(),
                            output: output.stdout,
                        });
                    }
                    self.emit(ExecutionEvent::StepCompleted {
                        step_id: step.id.clone(),
                        duration: output.duration,
                    });
                }
                Ok(output) => {
                    warn!(
                        "Step {} exited with code {}",
                        step.id, output.exit_code
                    );
                    let message = format!("exited with code {}", output.exit_code);
                    pipeline.steps[index].state = StepState::Failed {
                        exit_code: output.exit_code,
                        message: message.clone(),
                        failed_at: Utc::now(),
                    };
                    if !output.stdout.is_empty() {
                        self.emit(ExecutionEvent::StepOutput {
                            step_id: step.id.clone(),
                            output: output.stdout,
                        });
                    }
                    self.emit(ExecutionEvent::StepFailed {
                        step_id: step.id.clone(),
                        step_name: step.name.clone(),
                        exit_code: output.exit_code,
                        message: message.clone(),
                    });
                    failure = Some(StepFailure {
                        step_id: step.id.clone(),
                        step_name: step.name.clone(),
                        exit_code: output.exit_code,
                        stderr_tail: tail(&output.stderr, 20),
                    });
                }
                Err(e) => {
                    error!("Step {} could not complete: {}", step.id, e);
                    let exit_code = match &e {
                        RunnerError::Spawn { .. } => SPAWN_FAILURE_EXIT_CODE,
                        RunnerError::Timeout(_) => TIMEOUT_EXIT_CODE,
                    };
                    let message = e.to_string();
                    pipeline.steps[index].state = StepState::Failed {
                        exit_code,
                        message: message.clone(),
                        failed_at: Utc::now(),
                    };
                    self.emit(ExecutionEvent::StepFailed {
                        step_id: step.id.clone(),
                        step_name: step.name.clone(),
                        exit_code,
                        message: message.clone(),
                    });
                    failure = Some(StepFailure {
                        step_id: step.id.clone(),
                        step_name: step.name.clone(),
                        exit_code,
                        stderr_tail: message,
                    });
                }
            }

            pipeline.update_state_counts();
        }

        let status = if failure.is_some() {
            pipeline.state.fail();
            ExecutionStatus::Failed
        } else {
            pipeline.state.complete();
            ExecutionStatus::Completed
        };
        pipeline.update_state_counts();

        info!(
            "Pipeline run finished: {} - {:?}",
            pipeline.name, status
        );
        self.emit(ExecutionEvent::PipelineCompleted { run_id, status });

        RunOutcome { status, failed: failure }
    }
}

/// Last `max_lines` lines of a command's output
fn tail(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output.lines().collect();
    if lines.len() <= max_lines {
        output.trim_end().to_string()
    } else {
        lines[lines.len() - max_lines..].join("\n")
    }
}
