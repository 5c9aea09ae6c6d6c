use anyhow::{Context, Result};
use gantry::cli::commands::{RunCommand, StepsCommand, ValidateCommand};
use gantry::cli::output::*;
use gantry::cli::{Cli, Command};
use gantry::core::config::PipelineConfig;
use gantry::runner::{ExecutionEvent, PipelineEngine, ShellRunner};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    // Execute command
    match &cli.command {
        Command::Run(cmd) => run_pipeline(cmd, cli.clone()).await?,
        Command::Validate(cmd) => validate_pipeline(cmd)?,
        Command::Steps(cmd) => list_steps(cmd)?,
    }

    Ok(())
}

async fn run_pipeline(cmd: &RunCommand, cli: Cli) -> Result<()> {
    // Load pipeline config
    let mut config =
        PipelineConfig::from_file(&cmd.file).context("Failed to load pipeline config")?;

    println!("{} Loaded pipeline: {}", INFO, style(&config.name).bold());

    // Apply environment overrides
    for (key, value) in &cmd.env {
        config.env.insert(key.clone(), value.clone());
        println!(
            "{} Environment override: {} = {}",
            INFO,
            style(key).cyan(),
            style(value).dim()
        );
    }

    // Apply working directory override
    if let Some(ref workdir) = cmd.workdir {
        if !std::path::Path::new(workdir).is_dir() {
            anyhow::bail!("Working directory does not exist: {}", workdir);
        }
        config.working_dir = Some(workdir.clone());
    }

    let mut pipeline = config.to_pipeline();

    // Create execution engine
    let mut engine = PipelineEngine::new(ShellRunner::new());

    // Set up event handler for console output
    let progress = create_progress_bar(pipeline.steps.len());
    let quiet = cli.quiet;
    let bar = progress.clone();
    engine.add_event_handler(move |event| {
        // Suppress command output echo in quiet mode
        if quiet && matches!(event, ExecutionEvent::StepOutput { .. }) {
            return;
        }
        if let ExecutionEvent::StepOutput { output, .. } = &event {
            bar.println(format_output(output, 40));
            return;
        }

        bar.println(format_execution_event(&event));

        match &event {
            ExecutionEvent::StepStarted { step_name, .. } => {
                bar.set_message(step_name.clone());
            }
            ExecutionEvent::StepCompleted { .. }
            | ExecutionEvent::StepFailed { .. }
            | ExecutionEvent::StepSkipped { .. } => {
                bar.inc(1);
            }
            _ => {}
        }
    });

    // Execute pipeline
    println!();
    let outcome = engine.execute(&mut pipeline).await;
    progress.finish_and_clear();

    print_run_summary(&pipeline);

    // Print final status
    if let Some(failure) = &outcome.failed {
        println!(
            "\n{} {} {} at step {} (exit {})",
            CROSS,
            style(&pipeline.name).bold(),
            style("failed").red(),
            style(&failure.step_name).bold(),
            failure.exit_code
        );
        if !failure.stderr_tail.is_empty() {
            eprintln!("{}", failure.stderr_tail);
        }
        // The pipeline's exit code is the failing step's exit code
        std::process::exit(outcome.exit_code());
    }

    println!(
        "\n{} {} completed {}",
        CHECK,
        style(&pipeline.name).bold(),
        style("successfully").green()
    );

    Ok(())
}

fn print_run_summary(pipeline: &gantry::core::Pipeline) {
    println!("\n{} Run summary", INFO);
    for step in &pipeline.steps {
        println!(
            "  {} - {}",
            style(&step.name).bold(),
            format_step_state(&step.state)
        );
    }
    println!("  Status: {}", format_status(pipeline.state.status));
}

fn validate_pipeline(cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating pipeline...", INFO);

    let result = PipelineConfig::from_file(&cmd.file);

    match result {
        Ok(config) => {
            println!("{} Pipeline configuration is valid!", CHECK);
            println!("  Name: {}", style(&config.name).bold());
            println!("  Steps: {}", style(config.steps.len()).cyan());
            println!("  Env entries: {}", style(config.env.len()).cyan());

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(e).red());
            std::process::exit(1);
        }
    }
}

fn list_steps(cmd: &StepsCommand) -> Result<()> {
    let config = PipelineConfig::from_file(&cmd.file).context("Failed to load pipeline config")?;
    let pipeline = config.to_pipeline();

    if cmd.json {
        let steps: Vec<_> = pipeline
            .steps
            .iter()
            .map(|s| {
                serde_json::json!({
                    "id": s.id,
                    "name": s.name,
                    "run": s.command,
                    "env": s.env,
                    "timeout_secs": s.timeout_secs,
                })
            })
            .collect();
        let data = serde_json::json!({ "name": pipeline.name, "steps": steps });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    println!(
        "{} {} ({} steps)",
        INFO,
        style(&pipeline.name).bold(),
        pipeline.steps.len()
    );
    for (index, step) in pipeline.steps.iter().enumerate() {
        println!(
            "  {}. {} {}",
            index + 1,
            style(&step.name).cyan(),
            style(&step.command).dim()
        );
    }

    Ok(())
}
