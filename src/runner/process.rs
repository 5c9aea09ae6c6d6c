//! Shell subprocess runner - executes a step's command and captures output

use crate::core::Step;
use async_trait::async_trait;
use std::path::Path;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// Errors from starting or supervising a step's command
///
/// A command that runs and exits non-zero is NOT an error here; it is a
/// normal `StepOutput` carrying that exit code.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The command could not be started at all
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The command exceeded its configured timeout
    #[error("timed out after {0}s")]
    Timeout(u64),
}

/// Captured result of one step's command
#[derive(Debug, Clone)]
pub struct StepOutput {
    /// Process exit code (-1 if killed by a signal)
    pub exit_code: i32,

    /// Captured stdout
    pub stdout: String,

    /// Captured stderr
    pub stderr: String,

    /// Wall-clock duration of the command
    pub duration: Duration,
}

impl StepOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Executes a step's command, blocking until it completes
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, step: &Step, working_dir: &Path) -> Result<StepOutput, RunnerError>;
}

/// Real runner: spawns `<shell> -c <command>` in the working directory,
/// inheriting the parent environment merged with the step's env map
#[derive(Debug, Clone, Default)]
pub struct ShellRunner;

impl ShellRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, step: &Step, working_dir: &Path) -> Result<StepOutput, RunnerError> {
        debug!(
            "Spawning `{} -c` for step {} in {}",
            step.shell,
            step.id,
            working_dir.display()
        );

        let mut cmd = Command::new(&step.shell);
        cmd.arg("-c")
            .arg(&step.command)
            .current_dir(working_dir)
            .envs(&step.env)
            .kill_on_drop(true);

        let start = Instant::now();

        let output = match step.timeout_secs {
            Some(secs) => timeout(Duration::from_secs(secs), cmd.output())
                .await
                .map_err(|_| RunnerError::Timeout(secs))?,
            None => cmd.output().await,
        };

        let output = output.map_err(|e| RunnerError::Spawn {
            command: step.command.clone(),
            source: e,
        })?;

        let exit_code = output.status.code().unwrap_or(-1);
        debug!(
            "Step {} exited with code {} after {:?}",
            step.id,
            exit_code,
            start.elapsed()
        );

        Ok(StepOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            duration: start.elapsed(),
        })
    }
}
