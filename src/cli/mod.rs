//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{RunCommand, StepsCommand, ValidateCommand};
use std::ffi::OsString;

/// Fail-fast runner for CI quality-gate pipelines
#[derive(Debug, Parser, Clone)]
#[command(name = "gantry")]
#[command(author = "Gantry Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Fail-fast runner for CI quality-gate pipelines", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress per-step command output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run a pipeline
    Run(RunCommand),

    /// Validate a pipeline configuration
    Validate(ValidateCommand),

    /// List the resolved step sequence
    Steps(StepsCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_command_parses_env_overrides() {
        let cli = Cli::try_parse_from([
            "gantry",
            "run",
            "-f",
            "pipelines/quality.yml",
            "--env",
            "PYTHON_VERSION=3.10.5",
        ])
        .unwrap();

        match cli.command {
            Command::Run(cmd) => {
                assert_eq!(cmd.file, "pipelines/quality.yml");
                assert_eq!(
                    cmd.env,
                    vec![("PYTHON_VERSION".to_string(), "3.10.5".to_string())]
                );
            }
            other => panic!("Expected run command, got {:?}", other),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli =
            Cli::try_parse_from(["gantry", "--verbose", "validate", "-f", "p.yml"]).unwrap();
        assert!(cli.verbose);
        assert!(!cli.quiet);
    }
}
