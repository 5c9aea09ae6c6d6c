//! Scenario tests: fail-fast semantics and exit code propagation
//!
//! The pipeline under test mirrors a Python project's quality gate:
//! environment setup, dependency install, four quality checks, tests.

use async_trait::async_trait;
use gantry::core::config::PipelineConfig;
use gantry::core::{Pipeline, Step, StepState};
use gantry::runner::{
    CommandRunner, ExecutionEvent, PipelineEngine, RunnerError, StepOutput,
    SPAWN_FAILURE_EXIT_CODE,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Runner scripted by step id: records what ran, in order, and returns
/// the configured exit code (0 for unscripted steps)
struct ScriptedRunner {
    exit_codes: HashMap<String, i32>,
    spawn_failures: Vec<String>,
    executed: Arc<Mutex<Vec<String>>>,
}

impl ScriptedRunner {
    fn new(exit_codes: &[(&str, i32)]) -> Self {
        Self {
            exit_codes: exit_codes
                .iter()
                .map(|(id, code)| (id.to_string(), *code))
                .collect(),
            spawn_failures: Vec::new(),
            executed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn with_spawn_failure(mut self, step_id: &str) -> Self {
        self.spawn_failures.push(step_id.to_string());
        self
    }

    fn executed(&self) -> Arc<Mutex<Vec<String>>> {
        self.executed.clone()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, step: &Step, _working_dir: &Path) -> Result<StepOutput, RunnerError> {
        self.executed.lock().unwrap().push(step.id.clone());

        if self.spawn_failures.contains(&step.id) {
            return Err(RunnerError::Spawn {
                command: step.command.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            });
        }

        let exit_code = *self.exit_codes.get(&step.id).unwrap_or(&0);
        Ok(StepOutput {
            exit_code,
            stdout: format!("ran {}", step.id),
            stderr: if exit_code == 0 {
                String::new()
            } else {
                format!("{} failed", step.id)
            },
            duration: Duration::from_millis(1),
        })
    }
}

/// The full ten-step gate from the canonical pipeline
fn quality_gate() -> Pipeline {
    let yaml = r#"
name: "quality"
env:
  PYTHON_VERSION: "3.10.5"
steps:
  - id: "checkout"
    name: "Verify work tree"
    run: "git rev-parse --is-inside-work-tree"
  - id: "interpreter"
    name: "Install pinned interpreter"
    run: "pyenv install -s \"$PYTHON_VERSION\""
  - id: "poetry-env"
    name: "Set up poetry environment"
    run: "poetry env use \"$PYTHON_VERSION\""
  - id: "env-file"
    name: "Copy environment file"
    run: "cp .env.dev.local .env"
  - id: "install"
    name: "Install dependencies"
    run: "poetry install"
  - id: "typecheck"
    name: "Static type check"
    run: "poetry run mypy iso15118 tests"
  - id: "format"
    name: "Format check"
    run: "poetry run black --check --diff ."
  - id: "lint"
    name: "Lint check"
    run: "poetry run flake8 iso15118 tests"
  - id: "imports"
    name: "Import order check"
    run: "poetry run isort --check-only ."
  - id: "tests"
    name: "Test suite"
    run: "poetry run pytest -vv tests"
"#;
    PipelineConfig::from_yaml(yaml).unwrap().to_pipeline()
}

const GATE_ORDER: [&str; 10] = [
    "checkout",
    "interpreter",
    "poetry-env",
    "env-file",
    "install",
    "typecheck",
    "format",
    "lint",
    "imports",
    "tests",
];

/// Scenario A: all ten steps succeed, overall exit 0
#[tokio::test]
async fn test_all_steps_succeed() {
    let mut pipeline = quality_gate();
    let runner = ScriptedRunner::new(&[]);
    let executed = runner.executed();
    let engine = PipelineEngine::new(runner);

    let outcome = engine.execute(&mut pipeline).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.exit_code(), 0);
    assert!(outcome.failed.is_none());
    assert_eq!(*executed.lock().unwrap(), GATE_ORDER.to_vec());
    assert!(pipeline.is_complete());
}

/// Scenario B: dependency install fails with exit 1, checks and tests
/// never run, overall exit 1
#[tokio::test]
async fn test_install_failure_skips_checks() {
    let mut pipeline = quality_gate();
    let runner = ScriptedRunner::new(&[("install", 1)]);
    let executed = runner.executed();
    let engine = PipelineEngine::new(runner);

    let outcome = engine.execute(&mut pipeline).await;

    assert_eq!(outcome.exit_code(), 1);
    let failed = outcome.failed.unwrap();
    assert_eq!(failed.step_id, "install");
    assert_eq!(failed.step_name, "Install dependencies");

    // Steps 6-10 never executed
    assert_eq!(*executed.lock().unwrap(), GATE_ORDER[..5].to_vec());
    for id in &GATE_ORDER[5..] {
        assert!(
            matches!(pipeline.step(id).unwrap().state, StepState::Skipped),
            "step {} should be skipped",
            id
        );
    }
    assert!(pipeline.has_failed());
    assert_eq!(pipeline.state.completed_steps, 4);
    assert_eq!(pipeline.state.failed_steps, 1);
    assert_eq!(pipeline.state.skipped_steps, 5);
}

/// Scenario C: format check fails after the type check passed; lint,
/// import order and tests are skipped
#[tokio::test]
async fn test_format_failure_after_typecheck_passed() {
    let mut pipeline = quality_gate();
    let runner = ScriptedRunner::new(&[("format", 1)]);
    let executed = runner.executed();
    let engine = PipelineEngine::new(runner);

    let outcome = engine.execute(&mut pipeline).await;

    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(outcome.failed.unwrap().step_id, "format");

    assert!(matches!(
        pipeline.step("typecheck").unwrap().state,
        StepState::Completed { .. }
    ));
    assert_eq!(*executed.lock().unwrap(), GATE_ORDER[..7].to_vec());
    for id in ["lint", "imports", "tests"] {
        assert!(matches!(
            pipeline.step(id).unwrap().state,
            StepState::Skipped
        ));
    }
}

/// Scenario D: the environment file copy fails (template missing); the
/// pipeline's exit code equals the copy command's failure code
#[tokio::test]
async fn test_env_file_copy_failure() {
    let mut pipeline = quality_gate();
    let runner = ScriptedRunner::new(&[("env-file", 1)]);
    let executed = runner.executed();
    let engine = PipelineEngine::new(runner);

    let outcome = engine.execute(&mut pipeline).await;

    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(outcome.failed.unwrap().step_id, "env-file");
    assert_eq!(*executed.lock().unwrap(), GATE_ORDER[..4].to_vec());
}

/// The pipeline's exit code is the failing step's exit code, verbatim
#[tokio::test]
async fn test_exit_code_propagates_verbatim() {
    for code in [2, 77, 125] {
        let mut pipeline = quality_gate();
        let engine = PipelineEngine::new(ScriptedRunner::new(&[("lint", code)]));

        let outcome = engine.execute(&mut pipeline).await;
        assert_eq!(outcome.exit_code(), code);
    }
}

/// A command that cannot be started is a step failure (exit 127), not a
/// crash, and still halts the pipeline
#[tokio::test]
async fn test_unstartable_command_is_step_failure() {
    let mut pipeline = quality_gate();
    let runner = ScriptedRunner::new(&[]).with_spawn_failure("typecheck");
    let executed = runner.executed();
    let engine = PipelineEngine::new(runner);

    let outcome = engine.execute(&mut pipeline).await;

    assert_eq!(outcome.exit_code(), SPAWN_FAILURE_EXIT_CODE);
    let failed = outcome.failed.unwrap();
    assert_eq!(failed.step_id, "typecheck");
    assert!(failed.stderr_tail.contains("failed to spawn"));
    assert_eq!(*executed.lock().unwrap(), GATE_ORDER[..6].to_vec());
}

/// Event stream reflects the run: started, per-step events, completed
#[tokio::test]
async fn test_event_stream_order() {
    let mut pipeline = quality_gate();
    let mut engine = PipelineEngine::new(ScriptedRunner::new(&[("install", 1)]));

    let events: Arc<Mutex<Vec<ExecutionEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    engine.add_event_handler(move |event| {
        sink.lock().unwrap().push(event);
    });

    engine.execute(&mut pipeline).await;

    let events = events.lock().unwrap();
    assert!(matches!(
        events.first(),
        Some(ExecutionEvent::PipelineStarted { total_steps: 10, .. })
    ));
    assert!(matches!(
        events.last(),
        Some(ExecutionEvent::PipelineCompleted { .. })
    ));

    let failed_count = events
        .iter()
        .filter(|e| matches!(e, ExecutionEvent::StepFailed { .. }))
        .count();
    let skipped_count = events
        .iter()
        .filter(|e| matches!(e, ExecutionEvent::StepSkipped { .. }))
        .count();
    assert_eq!(failed_count, 1);
    assert_eq!(skipped_count, 5);
}

/// Idempotence: two runs over the same (scripted) world agree
#[tokio::test]
async fn test_rerun_same_outcome() {
    for _ in 0..2 {
        let mut pipeline = quality_gate();
        let engine = PipelineEngine::new(ScriptedRunner::new(&[("imports", 1)]));
        let outcome = engine.execute(&mut pipeline).await;
        assert_eq!(outcome.exit_code(), 1);
        assert_eq!(outcome.failed.unwrap().step_id, "imports");
    }
}
