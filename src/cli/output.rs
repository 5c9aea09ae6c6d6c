//! CLI output formatting

use crate::{
    core::{ExecutionStatus, StepState},
    runner::ExecutionEvent,
};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");
pub static SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "- ");

/// Create a progress bar over the step count
pub fn create_progress_bar(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Format a step state for display
pub fn format_step_state(state: &StepState) -> String {
    match state {
        StepState::Pending => style("PENDING").dim().to_string(),
        StepState::Running { .. } => style("RUNNING").yellow().to_string(),
        StepState::Completed { .. } => style("COMPLETED").green().to_string(),
        StepState::Failed { exit_code, .. } => {
            style(format!("FAILED (exit {})", exit_code)).red().to_string()
        }
        StepState::Skipped => style("SKIPPED").dim().to_string(),
    }
}

/// Format an execution status for display
pub fn format_status(status: ExecutionStatus) -> String {
    match status {
        ExecutionStatus::Pending => style("PENDING").dim().to_string(),
        ExecutionStatus::Running => style("RUNNING").yellow().to_string(),
        ExecutionStatus::Completed => style("COMPLETED").green().to_string(),
        ExecutionStatus::Failed => style("FAILED").red().to_string(),
    }
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::PipelineStarted {
            run_id,
            pipeline_name,
            total_steps,
        } => format!(
            "{} Starting pipeline {} ({} steps, run {})",
            ROCKET,
            style(pipeline_name).bold(),
            total_steps,
            style(&run_id.to_string()[..8]).dim()
        ),
        ExecutionEvent::StepStarted {
            step_name,
            index,
            total,
            ..
        } => format!(
            "{} [{}/{}] {}",
            SPINNER,
            index,
            total,
            style(step_name).cyan()
        ),
        ExecutionEvent::StepOutput { step_id, output } => {
            format!("{} Output from {}:\n{}", INFO, style(step_id).dim(), output)
        }
        ExecutionEvent::StepCompleted { step_id, duration } => format!(
            "{} {} ({})",
            CHECK,
            style(step_id).green(),
            style(format_duration(*duration)).dim()
        ),
        ExecutionEvent::StepFailed {
            step_name,
            exit_code,
            message,
            ..
        } => format!(
            "{} {}: {} (exit {})",
            CROSS,
            style(step_name).red(),
            style(message).dim(),
            exit_code
        ),
        ExecutionEvent::StepSkipped { step_id } => {
            format!("{} {} (skipped)", SKIP, style(step_id).dim())
        }
        ExecutionEvent::PipelineCompleted { run_id, status } => {
            let status_str = match status {
                ExecutionStatus::Completed => {
                    format!("completed {}", style("successfully").green())
                }
                ExecutionStatus::Failed => style("failed").red().to_string(),
                _ => format!("{:?}", status),
            };
            format!(
                "{} Pipeline ({}) {}",
                INFO,
                style(&run_id.to_string()[..8]).dim(),
                status_str
            )
        }
    }
}

/// Format command output with truncation
pub fn format_output(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output.lines().collect();

    if lines.len() <= max_lines {
        output.to_string()
    } else {
        let truncated = lines[..max_lines].join("\n");
        format!(
            "{}\n{}... ({} more lines)",
            truncated,
            style("[truncated]").dim(),
            lines.len() - max_lines
        )
    }
}

/// Format a duration for display
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 1 {
        format!("{}ms", duration.as_millis())
    } else if secs < 60 {
        format!("{}.{}s", secs, duration.subsec_millis() / 100)
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_output_truncation() {
        let output = "a\nb\nc\nd\ne";
        let formatted = format_output(output, 3);
        assert!(formatted.contains("2 more lines"));

        let short = format_output("a\nb", 3);
        assert_eq!(short, "a\nb");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(2500)), "2.5s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
    }

    #[test]
    fn test_format_step_state_failed_shows_exit_code() {
        let state = StepState::Failed {
            exit_code: 2,
            message: "exited with code 2".to_string(),
            failed_at: chrono::Utc::now(),
        };
        assert!(format_step_state(&state).contains("exit 2"));
    }
}
